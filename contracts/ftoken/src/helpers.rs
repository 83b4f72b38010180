use soroban_sdk::{token, Address, Env};

use exp_math::{MathError, MathResult};

pub fn unwrap_math<T>(res: MathResult<T>) -> T {
    match res {
        Ok(v) => v,
        Err(MathError::DivisionByZero) => panic!("division by zero"),
        Err(MathError::Overflow) => panic!("arithmetic overflow"),
        Err(MathError::Underflow) => panic!("arithmetic underflow"),
    }
}

pub fn to_i128(amount: u128) -> i128 {
    if amount > i128::MAX as u128 {
        panic!("amount exceeds i128");
    }
    amount as i128
}

/// Custody balance of this market in the underlying asset.
pub fn cash(env: &Env, underlying: &Address) -> u128 {
    let balance = token::Client::new(env, underlying).balance(&env.current_contract_address());
    if balance < 0 {
        panic!("invalid cash state");
    }
    balance as u128
}

/// Pulls `amount` of the underlying from `from` into custody and verifies
/// the balance grew by exactly that amount. A fee-on-transfer asset or a
/// short native payment fails here instead of corrupting the ledger.
pub fn transfer_in(env: &Env, underlying: &Address, from: &Address, amount: u128) {
    let client = token::Client::new(env, underlying);
    let balance_before = cash(env, underlying);
    client.transfer(from, &env.current_contract_address(), &to_i128(amount));
    let balance_after = cash(env, underlying);
    if balance_after.saturating_sub(balance_before) != amount {
        panic!("transfer amount mismatch");
    }
}

/// Pays `amount` of the underlying out of custody to `to`, verifying the
/// exact balance delta. Callers must have committed all internal state
/// before reaching this point.
pub fn transfer_out(env: &Env, underlying: &Address, to: &Address, amount: u128) {
    let client = token::Client::new(env, underlying);
    let balance_before = cash(env, underlying);
    client.transfer(&env.current_contract_address(), to, &to_i128(amount));
    let balance_after = cash(env, underlying);
    if balance_before.saturating_sub(balance_after) != amount {
        panic!("transfer amount mismatch");
    }
}
