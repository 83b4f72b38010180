use soroban_sdk::{contractevent, Address};

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MarketListed {
    #[topic]
    pub market: Address,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewCollateralFactor {
    #[topic]
    pub market: Address,
    pub old_collateral_factor: u128,
    pub new_collateral_factor: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewLiquidationIncentive {
    #[topic]
    pub market: Address,
    pub old_liquidation_incentive: u128,
    pub new_liquidation_incentive: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewCloseFactor {
    pub old_close_factor: u128,
    pub new_close_factor: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewOracle {
    #[topic]
    pub oracle: Address,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MarketEntered {
    #[topic]
    pub account: Address,
    #[topic]
    pub market: Address,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MarketExited {
    #[topic]
    pub account: Address,
    #[topic]
    pub market: Address,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LiquidateBorrow {
    #[topic]
    pub liquidator: Address,
    #[topic]
    pub borrower: Address,
    pub repay_market: Address,
    pub collateral_market: Address,
    pub repay_amount: u128,
    pub seize_tokens: u128,
}
