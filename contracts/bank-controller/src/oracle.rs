use soroban_sdk::{Address, Env};

// Price-feed interface. Prices are mantissa-scaled (1e18) in the unit of
// account, keyed by market. A missing or zero quote makes the liquidity
// computation fail closed rather than value the asset at nothing.
#[soroban_sdk::contractclient(name = "PriceOracleClient")]
pub trait PriceOracle {
    fn get_underlying_price(env: Env, market: Address) -> Option<u128>;
}
