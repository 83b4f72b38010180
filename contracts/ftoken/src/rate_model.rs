use soroban_sdk::Env;

// Interest-rate model interface consumed by the ledger. Rates are
// per-second mantissas; the ledger multiplies by elapsed seconds.
#[soroban_sdk::contractclient(name = "RateModelClient")]
pub trait RateModel {
    fn get_borrow_rate(env: Env, cash: u128, borrows: u128, reserves: u128) -> u128;
    fn get_supply_rate(
        env: Env,
        cash: u128,
        borrows: u128,
        reserves: u128,
        reserve_factor: u128,
    ) -> u128;
}
