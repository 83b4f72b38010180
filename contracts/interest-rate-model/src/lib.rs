#![no_std]
use soroban_sdk::{contract, contractevent, contractimpl, contracttype, Env};

use exp_math::{Exp, MathError, MathResult, EXP_SCALE};

#[contracttype]
pub enum DataKey {
    BaseRate,   // u128 mantissa, per second
    Multiplier, // u128 mantissa, per second
}

/// Rates above one whole unit per second are nonsensical and would only
/// serve to overflow the ledger's accrual math.
pub const MAX_RATE_PARAM: u128 = EXP_SCALE;

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModelInitialized {
    pub base_rate: u128,
    pub multiplier: u128,
}

/// Linear interest-rate model: borrow rate grows from a fixed base with
/// utilization. Parameters are fixed at initialization and immutable; a
/// market that wants different parameters deploys a new model.
#[contract]
pub struct InterestRateModel;

#[contractimpl]
impl InterestRateModel {
    pub fn initialize(env: Env, base_rate: u128, multiplier: u128) {
        if env.storage().persistent().has(&DataKey::BaseRate) {
            panic!("already initialized");
        }
        if base_rate > MAX_RATE_PARAM || multiplier > MAX_RATE_PARAM {
            panic!("invalid rate parameter");
        }
        env.storage().persistent().set(&DataKey::BaseRate, &base_rate);
        env.storage()
            .persistent()
            .set(&DataKey::Multiplier, &multiplier);
        ModelInitialized {
            base_rate,
            multiplier,
        }
        .publish(&env);
    }

    /// Fraction of available funds currently out on loan, as a mantissa.
    /// Zero borrows short-circuit to zero so an empty market never divides
    /// by its own emptiness.
    pub fn utilization_rate(env: Env, cash: u128, borrows: u128, reserves: u128) -> u128 {
        ensure_initialized(&env);
        Self::utilization(cash, borrows, reserves).mantissa
    }

    /// `base_rate + utilization * multiplier`, per second.
    pub fn get_borrow_rate(env: Env, cash: u128, borrows: u128, reserves: u128) -> u128 {
        ensure_initialized(&env);
        let base: u128 = env
            .storage()
            .persistent()
            .get(&DataKey::BaseRate)
            .expect("not initialized");
        let multiplier: u128 = env
            .storage()
            .persistent()
            .get(&DataKey::Multiplier)
            .expect("not initialized");
        let util = Self::utilization(cash, borrows, reserves);
        let slope = unwrap_math(util.mul(Exp::new(multiplier)));
        unwrap_math(Exp::new(base).add(slope)).mantissa
    }

    /// `borrow_rate * (1 - reserve_factor) * utilization`, per second. The
    /// reserve factor slice never reaches suppliers.
    pub fn get_supply_rate(
        env: Env,
        cash: u128,
        borrows: u128,
        reserves: u128,
        reserve_factor: u128,
    ) -> u128 {
        if reserve_factor > EXP_SCALE {
            panic!("invalid reserve factor");
        }
        let borrow_rate = Self::get_borrow_rate(env.clone(), cash, borrows, reserves);
        let one_minus_reserve = unwrap_math(Exp::one().sub(Exp::new(reserve_factor)));
        let rate_to_pool = unwrap_math(Exp::new(borrow_rate).mul(one_minus_reserve));
        let util = Self::utilization(cash, borrows, reserves);
        unwrap_math(util.mul(rate_to_pool)).mantissa
    }

    pub fn get_model_parameters(env: Env) -> (u128, u128) {
        ensure_initialized(&env);
        let base: u128 = env
            .storage()
            .persistent()
            .get(&DataKey::BaseRate)
            .expect("not initialized");
        let multiplier: u128 = env
            .storage()
            .persistent()
            .get(&DataKey::Multiplier)
            .expect("not initialized");
        (base, multiplier)
    }

    fn utilization(cash: u128, borrows: u128, reserves: u128) -> Exp {
        if borrows == 0 {
            return Exp::zero();
        }
        // Reserves exceeding cash + borrows would mean the protocol owes
        // itself more than it holds; fail loudly rather than produce a
        // negative denominator.
        let available = match cash
            .checked_add(borrows)
            .and_then(|total| total.checked_sub(reserves))
        {
            Some(v) => v,
            None => panic!("invalid utilization"),
        };
        unwrap_math(Exp::from_fraction(borrows, available))
    }
}

fn ensure_initialized(env: &Env) {
    if !env.storage().persistent().has(&DataKey::BaseRate) {
        panic!("not initialized");
    }
}

fn unwrap_math<T>(res: MathResult<T>) -> T {
    match res {
        Ok(v) => v,
        Err(MathError::DivisionByZero) => panic!("division by zero"),
        Err(MathError::Overflow) => panic!("arithmetic overflow"),
        Err(MathError::Underflow) => panic!("arithmetic underflow"),
    }
}
