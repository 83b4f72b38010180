use soroban_sdk::{Address, Env};

// The slice of the ledger surface the risk engine consumes. Snapshots are
// read as stored; the liquidation path accrues explicitly first.
#[soroban_sdk::contractclient(name = "MarketClient")]
pub trait MarketContract {
    fn get_account_snapshot(env: Env, account: Address) -> (u128, u128, u128);
    fn borrow_balance_stored(env: Env, account: Address) -> u128;
    fn accrue_interest(env: Env);
    fn repay(env: Env, payer: Address, borrower: Address, amount: u128) -> u128;
    fn seize(env: Env, borrower: Address, liquidator: Address, seize_tokens: u128);
}
