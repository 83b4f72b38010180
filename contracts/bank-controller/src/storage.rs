use soroban_sdk::{contracttype, Address, Env, Vec};

use exp_math::EXP_SCALE;

// Storage key types for the contract
#[contracttype]
pub enum DataKey {
    AuthGate,                // Address of the authorization gate
    Oracle,                  // Address of the price oracle
    Markets(Address),        // Market per listed ftoken
    AllMarkets,              // Vec<Address>
    AccountMarkets(Address), // Vec<Address> entered per account
    CloseFactor,             // u128 mantissa, max borrow share repayable per liquidation
}

const TTL_THRESHOLD: u32 = 100_000;
const TTL_EXTEND_TO: u32 = 200_000;

/// Listing state for one market. Markets are never deleted once listed;
/// delisting is done economically by zeroing the collateral factor.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Market {
    pub is_listed: bool,
    pub collateral_factor: u128,
    pub liquidation_incentive: u128,
}

/// The acting account's position in the market requesting a check, passed
/// by value so the engine never calls back into that market mid-operation.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MarketSnapshot {
    pub token_balance: u128,
    pub borrow_balance: u128,
    pub exchange_rate: u128,
}

pub fn require_initialized(env: &Env) -> Address {
    bump_core_ttl(env);
    env.storage()
        .persistent()
        .get(&DataKey::AuthGate)
        .expect("not initialized")
}

pub fn bump_core_ttl(env: &Env) {
    let persistent = env.storage().persistent();
    if persistent.has(&DataKey::AuthGate) {
        persistent.extend_ttl(&DataKey::AuthGate, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::Oracle) {
        persistent.extend_ttl(&DataKey::Oracle, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::AllMarkets) {
        persistent.extend_ttl(&DataKey::AllMarkets, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
}

pub fn oracle(env: &Env) -> Address {
    env.storage()
        .persistent()
        .get(&DataKey::Oracle)
        .expect("not initialized")
}

pub fn market(env: &Env, ftoken: &Address) -> Option<Market> {
    env.storage()
        .persistent()
        .get(&DataKey::Markets(ftoken.clone()))
}

pub fn require_listed(env: &Env, ftoken: &Address) -> Market {
    match market(env, ftoken) {
        Some(m) if m.is_listed => m,
        _ => panic!("market not listed"),
    }
}

pub fn set_market(env: &Env, ftoken: &Address, market: &Market) {
    env.storage()
        .persistent()
        .set(&DataKey::Markets(ftoken.clone()), market);
}

pub fn all_markets(env: &Env) -> Vec<Address> {
    env.storage()
        .persistent()
        .get(&DataKey::AllMarkets)
        .unwrap_or(Vec::new(env))
}

pub fn set_all_markets(env: &Env, markets: &Vec<Address>) {
    env.storage().persistent().set(&DataKey::AllMarkets, markets);
}

pub fn account_markets(env: &Env, account: &Address) -> Vec<Address> {
    env.storage()
        .persistent()
        .get(&DataKey::AccountMarkets(account.clone()))
        .unwrap_or(Vec::new(env))
}

pub fn set_account_markets(env: &Env, account: &Address, markets: &Vec<Address>) {
    env.storage()
        .persistent()
        .set(&DataKey::AccountMarkets(account.clone()), markets);
}

pub fn is_member(env: &Env, account: &Address, ftoken: &Address) -> bool {
    account_markets(env, account).contains(ftoken.clone())
}

pub fn close_factor(env: &Env) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::CloseFactor)
        .unwrap_or(EXP_SCALE / 2)
}
