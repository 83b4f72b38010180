use soroban_sdk::{Address, Env};

use crate::storage::MarketSnapshot;

// Risk-engine interface consumed by the ledger. The acting account's
// snapshot travels with the call; checks always precede effects, and the
// engine never calls back into the market performing the action.
#[soroban_sdk::contractclient(name = "ControllerClient")]
pub trait Controller {
    fn mint_allowed(env: Env, market: Address, minter: Address);
    fn redeem_allowed(
        env: Env,
        market: Address,
        redeemer: Address,
        redeem_tokens: u128,
        snapshot: MarketSnapshot,
    ) -> (u128, u128);
    fn borrow_allowed(
        env: Env,
        market: Address,
        borrower: Address,
        borrow_amount: u128,
        snapshot: MarketSnapshot,
    ) -> (u128, u128);
}
