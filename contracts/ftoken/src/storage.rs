use soroban_sdk::{contracttype, Address, Env};

use exp_math::EXP_SCALE;

// Storage key types for the contract
#[contracttype]
pub enum DataKey {
    Underlying,               // Address of the underlying asset contract
    Controller,               // Address of the risk engine
    InterestModel,            // Address of the interest rate model
    Admin,                    // Address
    InitialExchangeRate,      // u128 mantissa, used only while supply is zero
    TotalSupply,              // u128 claim tokens outstanding
    AccountTokens(Address),   // u128 claim tokens per account
    TotalBorrows,             // u128 underlying owed across all accounts
    TotalReserves,            // u128 underlying set aside for the protocol
    ReserveFactor,            // u128 mantissa, slice of interest kept as reserves
    BorrowIndex,              // u128 mantissa, cumulative interest multiplier
    AccrualTime,              // u64 ledger timestamp of the last accrual
    BorrowSnapshots(Address), // BorrowSnapshot per account
    EntryGuard,               // bool busy flag, instance storage
}

const TTL_THRESHOLD: u32 = 100_000;
const TTL_EXTEND_TO: u32 = 200_000;

/// Per-account borrow state: the principal at the time of the last
/// interaction and the borrow index it was recorded under. Current owed
/// amount is `principal * borrow_index / interest_index`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BorrowSnapshot {
    pub principal: u128,
    pub interest_index: u128,
}

/// The acting account's position, passed by value to the risk engine so it
/// never has to call back into a market that is mid-operation.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MarketSnapshot {
    pub token_balance: u128,
    pub borrow_balance: u128,
    pub exchange_rate: u128,
}

/// Denomination of a redeem request: a claim-token count or an underlying
/// amount. Both directions truncate toward zero, so rounding dust always
/// stays in the pool.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RedeemAmount {
    Tokens(u128),
    Underlying(u128),
}

pub fn require_initialized(env: &Env) -> Address {
    bump_core_ttl(env);
    env.storage()
        .persistent()
        .get(&DataKey::Underlying)
        .expect("market not initialized")
}

pub fn bump_core_ttl(env: &Env) {
    let persistent = env.storage().persistent();
    if persistent.has(&DataKey::Underlying) {
        persistent.extend_ttl(&DataKey::Underlying, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::Admin) {
        persistent.extend_ttl(&DataKey::Admin, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::TotalSupply) {
        persistent.extend_ttl(&DataKey::TotalSupply, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::TotalBorrows) {
        persistent.extend_ttl(&DataKey::TotalBorrows, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::BorrowIndex) {
        persistent.extend_ttl(&DataKey::BorrowIndex, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    if persistent.has(&DataKey::AccrualTime) {
        persistent.extend_ttl(&DataKey::AccrualTime, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
}

pub fn bump_account_ttl(env: &Env, account: &Address) {
    let persistent = env.storage().persistent();
    let tokens_key = DataKey::AccountTokens(account.clone());
    if persistent.has(&tokens_key) {
        persistent.extend_ttl(&tokens_key, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
    let snapshot_key = DataKey::BorrowSnapshots(account.clone());
    if persistent.has(&snapshot_key) {
        persistent.extend_ttl(&snapshot_key, TTL_THRESHOLD, TTL_EXTEND_TO);
    }
}

// Reentrancy guard: an explicit busy flag taken by every public mutator.
// A nested re-entry into the market while a mutation is in flight aborts.

pub fn take_entry_guard(env: &Env) {
    let busy: bool = env
        .storage()
        .instance()
        .get(&DataKey::EntryGuard)
        .unwrap_or(false);
    if busy {
        panic!("reentrant call");
    }
    env.storage().instance().set(&DataKey::EntryGuard, &true);
}

pub fn release_entry_guard(env: &Env) {
    env.storage().instance().set(&DataKey::EntryGuard, &false);
}

// Plain getters and setters over the persistent keys.

pub fn controller(env: &Env) -> Address {
    env.storage()
        .persistent()
        .get(&DataKey::Controller)
        .expect("market not initialized")
}

pub fn interest_model(env: &Env) -> Address {
    env.storage()
        .persistent()
        .get(&DataKey::InterestModel)
        .expect("market not initialized")
}

pub fn admin(env: &Env) -> Address {
    env.storage()
        .persistent()
        .get(&DataKey::Admin)
        .expect("admin not set")
}

pub fn initial_exchange_rate(env: &Env) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::InitialExchangeRate)
        .unwrap_or(EXP_SCALE)
}

pub fn total_supply(env: &Env) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::TotalSupply)
        .unwrap_or(0u128)
}

pub fn set_total_supply(env: &Env, amount: u128) {
    env.storage().persistent().set(&DataKey::TotalSupply, &amount);
}

pub fn account_tokens(env: &Env, account: &Address) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::AccountTokens(account.clone()))
        .unwrap_or(0u128)
}

pub fn set_account_tokens(env: &Env, account: &Address, amount: u128) {
    env.storage()
        .persistent()
        .set(&DataKey::AccountTokens(account.clone()), &amount);
    bump_account_ttl(env, account);
}

pub fn total_borrows(env: &Env) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::TotalBorrows)
        .unwrap_or(0u128)
}

pub fn set_total_borrows(env: &Env, amount: u128) {
    env.storage()
        .persistent()
        .set(&DataKey::TotalBorrows, &amount);
}

pub fn total_reserves(env: &Env) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::TotalReserves)
        .unwrap_or(0u128)
}

pub fn set_total_reserves(env: &Env, amount: u128) {
    env.storage()
        .persistent()
        .set(&DataKey::TotalReserves, &amount);
}

pub fn reserve_factor(env: &Env) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::ReserveFactor)
        .unwrap_or(0u128)
}

pub fn set_reserve_factor(env: &Env, factor: u128) {
    env.storage()
        .persistent()
        .set(&DataKey::ReserveFactor, &factor);
}

pub fn borrow_index(env: &Env) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::BorrowIndex)
        .unwrap_or(EXP_SCALE)
}

pub fn set_borrow_index(env: &Env, index: u128) {
    env.storage().persistent().set(&DataKey::BorrowIndex, &index);
}

pub fn accrual_time(env: &Env) -> u64 {
    env.storage()
        .persistent()
        .get(&DataKey::AccrualTime)
        .expect("market not initialized")
}

pub fn set_accrual_time(env: &Env, timestamp: u64) {
    env.storage()
        .persistent()
        .set(&DataKey::AccrualTime, &timestamp);
}

pub fn borrow_snapshot(env: &Env, account: &Address) -> Option<BorrowSnapshot> {
    env.storage()
        .persistent()
        .get(&DataKey::BorrowSnapshots(account.clone()))
}

/// Writes the account borrow snapshot against the current borrow index,
/// removing it entirely once the principal reaches zero.
pub fn write_borrow_snapshot(env: &Env, account: &Address, principal: u128) {
    let key = DataKey::BorrowSnapshots(account.clone());
    if principal == 0 {
        env.storage().persistent().remove(&key);
        return;
    }
    let snapshot = BorrowSnapshot {
        principal,
        interest_index: borrow_index(env),
    };
    env.storage().persistent().set(&key, &snapshot);
    bump_account_ttl(env, account);
}
