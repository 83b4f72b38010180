use soroban_sdk::{contractevent, Address};

/// Emitted on deposit when claim tokens are minted.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Mint {
    #[topic]
    pub minter: Address,
    pub mint_amount: u128,
    pub mint_tokens: u128,
    pub total_supply: u128,
}

/// Emitted on withdrawal when claim tokens are burned.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Redeem {
    #[topic]
    pub redeemer: Address,
    pub redeem_amount: u128,
    pub redeem_tokens: u128,
    pub total_supply: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BorrowEvent {
    #[topic]
    pub borrower: Address,
    pub borrow_amount: u128,
    pub account_borrows: u128,
    pub total_borrows: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RepayBorrow {
    #[topic]
    pub payer: Address,
    #[topic]
    pub borrower: Address,
    pub repay_amount: u128,
    pub account_borrows: u128,
    pub total_borrows: u128,
}

/// Emitted once per accrual with the post-accrual aggregates.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AccrueInterest {
    pub cash_prior: u128,
    pub interest_accumulated: u128,
    pub borrow_index: u128,
    pub total_borrows: u128,
}

/// Claim tokens moved from a borrower to a liquidator by the risk engine.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Seize {
    #[topic]
    pub borrower: Address,
    #[topic]
    pub liquidator: Address,
    pub seize_tokens: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReservesAdded {
    #[topic]
    pub payer: Address,
    pub add_amount: u128,
    pub total_reserves: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReservesReduced {
    pub reduce_amount: u128,
    pub total_reserves: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewReserveFactor {
    pub old_reserve_factor: u128,
    pub new_reserve_factor: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewInterestRateModel {
    #[topic]
    pub model: Address,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewAdmin {
    #[topic]
    pub admin: Address,
}
