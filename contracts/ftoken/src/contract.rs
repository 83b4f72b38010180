use soroban_sdk::{contract, contractimpl, Address, Env};

use exp_math::{div_scalar_by_exp_truncate, Exp};

use crate::constants::*;
use crate::controller::ControllerClient;
use crate::events::*;
use crate::helpers::*;
use crate::rate_model::RateModelClient;
use crate::storage::{self, MarketSnapshot, RedeemAmount};

/// The interest-bearing claim token ledger. One deployed instance per
/// market: it owns exchange-rate computation, interest accrual, and the
/// mint/redeem/borrow/repay bookkeeping, delegating rate math to the
/// interest-rate model and liquidity authorization to the risk engine.
#[contract]
pub struct FToken;

#[contractimpl]
impl FToken {
    pub fn initialize(
        env: Env,
        underlying: Address,
        controller: Address,
        interest_model: Address,
        initial_exchange_rate: u128,
        admin: Address,
    ) {
        if env
            .storage()
            .persistent()
            .has(&storage::DataKey::Underlying)
        {
            panic!("already initialized");
        }
        admin.require_auth();
        if initial_exchange_rate == 0 {
            panic!("invalid initial exchange rate");
        }
        // Probe the model interface so a mis-wired market fails at setup,
        // not at the first accrual.
        let _ = RateModelClient::new(&env, &interest_model).get_borrow_rate(&0u128, &0u128, &0u128);

        let store = env.storage().persistent();
        store.set(&storage::DataKey::Underlying, &underlying);
        store.set(&storage::DataKey::Controller, &controller);
        store.set(&storage::DataKey::InterestModel, &interest_model);
        store.set(&storage::DataKey::Admin, &admin);
        store.set(
            &storage::DataKey::InitialExchangeRate,
            &initial_exchange_rate,
        );
        store.set(&storage::DataKey::TotalSupply, &0u128);
        store.set(&storage::DataKey::TotalBorrows, &0u128);
        store.set(&storage::DataKey::TotalReserves, &0u128);
        store.set(&storage::DataKey::ReserveFactor, &0u128);
        store.set(&storage::DataKey::BorrowIndex, &exp_math::EXP_SCALE);
        store.set(&storage::DataKey::AccrualTime, &env.ledger().timestamp());
    }

    /// Accrues borrow interest up to the current ledger timestamp. A no-op
    /// when already current, so every mutator can call it unconditionally.
    pub fn accrue_interest(env: Env) {
        storage::require_initialized(&env);
        Self::accrue(&env);
    }

    /// Deposits `amount` underlying and mints claim tokens at the current
    /// exchange rate. Returns the minted token count.
    pub fn mint(env: Env, minter: Address, amount: u128) -> u128 {
        let underlying = storage::require_initialized(&env);
        storage::take_entry_guard(&env);
        Self::accrue(&env);
        Self::require_fresh(&env);
        minter.require_auth();
        if amount == 0 {
            panic!("zero amount");
        }

        let controller = storage::controller(&env);
        ControllerClient::new(&env, &controller)
            .mint_allowed(&env.current_contract_address(), &minter);

        // Exchange rate is read before cash moves so the deposit cannot
        // distort its own conversion.
        let rate = Self::exchange_rate(&env);
        let mint_tokens = unwrap_math(div_scalar_by_exp_truncate(amount, rate));
        if mint_tokens == 0 {
            panic!("amount below minimum");
        }

        transfer_in(&env, &underlying, &minter, amount);

        let total_supply = match storage::total_supply(&env).checked_add(mint_tokens) {
            Some(v) => v,
            None => panic!("arithmetic overflow"),
        };
        storage::set_total_supply(&env, total_supply);
        let account_tokens = match storage::account_tokens(&env, &minter).checked_add(mint_tokens) {
            Some(v) => v,
            None => panic!("arithmetic overflow"),
        };
        storage::set_account_tokens(&env, &minter, account_tokens);

        Mint {
            minter,
            mint_amount: amount,
            mint_tokens,
            total_supply,
        }
        .publish(&env);

        storage::release_entry_guard(&env);
        mint_tokens
    }

    /// Burns claim tokens for underlying. The request may be denominated in
    /// either unit; the risk engine must confirm the account stays solvent
    /// after the withdrawal. Returns the underlying paid out.
    pub fn redeem(env: Env, redeemer: Address, amount: RedeemAmount) -> u128 {
        let underlying = storage::require_initialized(&env);
        storage::take_entry_guard(&env);
        Self::accrue(&env);
        Self::require_fresh(&env);
        redeemer.require_auth();

        let rate = Self::exchange_rate(&env);
        let (redeem_tokens, redeem_amount) = match amount {
            RedeemAmount::Tokens(tokens) => {
                (tokens, unwrap_math(rate.mul_scalar_truncate(tokens)))
            }
            RedeemAmount::Underlying(underlying_amount) => (
                unwrap_math(div_scalar_by_exp_truncate(underlying_amount, rate)),
                underlying_amount,
            ),
        };
        if redeem_tokens == 0 || redeem_amount == 0 {
            panic!("zero amount");
        }

        let balance = storage::account_tokens(&env, &redeemer);
        if balance < redeem_tokens {
            panic!("insufficient token balance");
        }

        let snapshot = MarketSnapshot {
            token_balance: balance,
            borrow_balance: Self::owed(&env, &redeemer),
            exchange_rate: rate.mantissa,
        };
        let controller = storage::controller(&env);
        let (_liquidity, shortfall) = ControllerClient::new(&env, &controller).redeem_allowed(
            &env.current_contract_address(),
            &redeemer,
            &redeem_tokens,
            &snapshot,
        );
        if shortfall > 0 {
            panic!("insufficient liquidity");
        }

        if cash(&env, &underlying) < redeem_amount {
            panic!("redeem transfer out not possible");
        }

        // Effects are committed in full before the outbound transfer.
        let total_supply = match storage::total_supply(&env).checked_sub(redeem_tokens) {
            Some(v) => v,
            None => panic!("arithmetic underflow"),
        };
        storage::set_total_supply(&env, total_supply);
        storage::set_account_tokens(&env, &redeemer, balance - redeem_tokens);

        transfer_out(&env, &underlying, &redeemer, redeem_amount);

        Redeem {
            redeemer,
            redeem_amount,
            redeem_tokens,
            total_supply,
        }
        .publish(&env);

        storage::release_entry_guard(&env);
        redeem_amount
    }

    /// Takes out a loan against collateral posted across the borrower's
    /// entered markets. The risk engine folds the requested amount into the
    /// liquidity computation before any state changes.
    pub fn borrow(env: Env, borrower: Address, amount: u128) {
        let underlying = storage::require_initialized(&env);
        storage::take_entry_guard(&env);
        Self::accrue(&env);
        Self::require_fresh(&env);
        borrower.require_auth();
        if amount == 0 {
            panic!("zero amount");
        }

        let owed_prior = Self::owed(&env, &borrower);
        let snapshot = MarketSnapshot {
            token_balance: storage::account_tokens(&env, &borrower),
            borrow_balance: owed_prior,
            exchange_rate: Self::exchange_rate(&env).mantissa,
        };
        let controller = storage::controller(&env);
        let (_liquidity, shortfall) = ControllerClient::new(&env, &controller).borrow_allowed(
            &env.current_contract_address(),
            &borrower,
            &amount,
            &snapshot,
        );
        if shortfall > 0 {
            panic!("insufficient liquidity");
        }

        if cash(&env, &underlying) < amount {
            panic!("borrow cash not available");
        }

        let account_borrows = match owed_prior.checked_add(amount) {
            Some(v) => v,
            None => panic!("arithmetic overflow"),
        };
        storage::write_borrow_snapshot(&env, &borrower, account_borrows);
        let total_borrows = match storage::total_borrows(&env).checked_add(amount) {
            Some(v) => v,
            None => panic!("arithmetic overflow"),
        };
        storage::set_total_borrows(&env, total_borrows);

        transfer_out(&env, &underlying, &borrower, amount);

        BorrowEvent {
            borrower,
            borrow_amount: amount,
            account_borrows,
            total_borrows,
        }
        .publish(&env);

        storage::release_entry_guard(&env);
    }

    /// Repays a borrow on behalf of `borrower`. `REPAY_FULL` (u128::MAX)
    /// settles the entire owed amount; any explicit amount above the owed
    /// balance is rejected so principal can never go negative. Returns the
    /// amount actually repaid.
    pub fn repay(env: Env, payer: Address, borrower: Address, amount: u128) -> u128 {
        let underlying = storage::require_initialized(&env);
        storage::take_entry_guard(&env);
        Self::accrue(&env);
        Self::require_fresh(&env);
        payer.require_auth();
        if amount == 0 {
            panic!("zero amount");
        }

        let owed = Self::owed(&env, &borrower);
        let repay_amount = if amount == REPAY_FULL {
            owed
        } else {
            if amount > owed {
                panic!("repay more than borrowed");
            }
            amount
        };
        if repay_amount == 0 {
            storage::release_entry_guard(&env);
            return 0;
        }

        transfer_in(&env, &underlying, &payer, repay_amount);

        let account_borrows = owed - repay_amount;
        storage::write_borrow_snapshot(&env, &borrower, account_borrows);
        let total_borrows = storage::total_borrows(&env).saturating_sub(repay_amount);
        storage::set_total_borrows(&env, total_borrows);

        RepayBorrow {
            payer,
            borrower,
            repay_amount,
            account_borrows,
            total_borrows,
        }
        .publish(&env);

        storage::release_entry_guard(&env);
        repay_amount
    }

    /// Moves claim tokens from a borrower to a liquidator during a
    /// liquidation. Only the risk engine may invoke this; total supply is
    /// untouched.
    pub fn seize(env: Env, borrower: Address, liquidator: Address, seize_tokens: u128) {
        storage::require_initialized(&env);
        storage::controller(&env).require_auth();
        storage::take_entry_guard(&env);
        if seize_tokens == 0 {
            panic!("zero amount");
        }
        let borrower_balance = storage::account_tokens(&env, &borrower);
        if borrower_balance < seize_tokens {
            panic!("insufficient token balance");
        }
        storage::set_account_tokens(&env, &borrower, borrower_balance - seize_tokens);
        let liquidator_balance =
            match storage::account_tokens(&env, &liquidator).checked_add(seize_tokens) {
                Some(v) => v,
                None => panic!("arithmetic overflow"),
            };
        storage::set_account_tokens(&env, &liquidator, liquidator_balance);

        Seize {
            borrower,
            liquidator,
            seize_tokens,
        }
        .publish(&env);

        storage::release_entry_guard(&env);
    }

    /// Donates underlying into the reserve pot. Does not move the exchange
    /// rate: reserves are excluded from the pool suppliers own.
    pub fn add_reserves(env: Env, payer: Address, amount: u128) {
        let underlying = storage::require_initialized(&env);
        storage::take_entry_guard(&env);
        Self::accrue(&env);
        Self::require_fresh(&env);
        payer.require_auth();
        if amount == 0 {
            panic!("zero amount");
        }

        transfer_in(&env, &underlying, &payer, amount);
        let total_reserves = match storage::total_reserves(&env).checked_add(amount) {
            Some(v) => v,
            None => panic!("arithmetic overflow"),
        };
        storage::set_total_reserves(&env, total_reserves);

        ReservesAdded {
            payer,
            add_amount: amount,
            total_reserves,
        }
        .publish(&env);

        storage::release_entry_guard(&env);
    }

    /// Pays accumulated reserves out to the admin.
    pub fn reduce_reserves(env: Env, amount: u128) {
        let underlying = storage::require_initialized(&env);
        let admin = storage::admin(&env);
        admin.require_auth();
        storage::take_entry_guard(&env);
        Self::accrue(&env);
        Self::require_fresh(&env);
        if amount == 0 {
            panic!("zero amount");
        }
        let reserves = storage::total_reserves(&env);
        if amount > reserves {
            panic!("insufficient reserves");
        }
        if cash(&env, &underlying) < amount {
            panic!("insufficient cash");
        }
        let total_reserves = reserves - amount;
        storage::set_total_reserves(&env, total_reserves);

        transfer_out(&env, &underlying, &admin, amount);

        ReservesReduced {
            reduce_amount: amount,
            total_reserves,
        }
        .publish(&env);

        storage::release_entry_guard(&env);
    }

    /// Admin: sets the slice of accrued interest kept as reserves.
    pub fn set_reserve_factor(env: Env, new_reserve_factor: u128) {
        storage::require_initialized(&env);
        storage::admin(&env).require_auth();
        storage::take_entry_guard(&env);
        Self::accrue(&env);
        Self::require_fresh(&env);
        if new_reserve_factor > exp_math::EXP_SCALE {
            panic!("invalid reserve factor");
        }
        let old_reserve_factor = storage::reserve_factor(&env);
        storage::set_reserve_factor(&env, new_reserve_factor);

        NewReserveFactor {
            old_reserve_factor,
            new_reserve_factor,
        }
        .publish(&env);

        storage::release_entry_guard(&env);
    }

    /// Admin: swaps the interest-rate model. Interest accrues under the old
    /// model first so no elapsed time is repriced retroactively.
    pub fn set_interest_rate_model(env: Env, model: Address) {
        storage::require_initialized(&env);
        storage::admin(&env).require_auth();
        storage::take_entry_guard(&env);
        Self::accrue(&env);
        Self::require_fresh(&env);
        let _ = RateModelClient::new(&env, &model).get_borrow_rate(&0u128, &0u128, &0u128);
        env.storage()
            .persistent()
            .set(&storage::DataKey::InterestModel, &model);

        NewInterestRateModel { model }.publish(&env);

        storage::release_entry_guard(&env);
    }

    /// Admin: hands the admin role to a new address.
    pub fn set_admin(env: Env, new_admin: Address) {
        storage::require_initialized(&env);
        storage::admin(&env).require_auth();
        env.storage()
            .persistent()
            .set(&storage::DataKey::Admin, &new_admin);
        NewAdmin { admin: new_admin }.publish(&env);
    }

    // Views

    /// Exchange rate between underlying and claim tokens as of the last
    /// accrual. The initial rate applies only while no tokens circulate.
    pub fn exchange_rate_stored(env: Env) -> u128 {
        storage::require_initialized(&env);
        Self::exchange_rate(&env).mantissa
    }

    /// `(token_balance, borrow_balance, exchange_rate)` in one shot, the
    /// exact inputs the risk engine needs per market.
    pub fn get_account_snapshot(env: Env, account: Address) -> (u128, u128, u128) {
        storage::require_initialized(&env);
        (
            storage::account_tokens(&env, &account),
            Self::owed(&env, &account),
            Self::exchange_rate(&env).mantissa,
        )
    }

    /// Owed amount as of the last accrual: principal scaled by the growth
    /// of the borrow index since the account's snapshot.
    pub fn borrow_balance_stored(env: Env, account: Address) -> u128 {
        storage::require_initialized(&env);
        Self::owed(&env, &account)
    }

    pub fn get_cash(env: Env) -> u128 {
        let underlying = storage::require_initialized(&env);
        cash(&env, &underlying)
    }

    pub fn get_token_balance(env: Env, account: Address) -> u128 {
        storage::require_initialized(&env);
        storage::account_tokens(&env, &account)
    }

    pub fn get_total_supply(env: Env) -> u128 {
        storage::require_initialized(&env);
        storage::total_supply(&env)
    }

    pub fn get_total_borrows(env: Env) -> u128 {
        storage::require_initialized(&env);
        storage::total_borrows(&env)
    }

    pub fn get_total_reserves(env: Env) -> u128 {
        storage::require_initialized(&env);
        storage::total_reserves(&env)
    }

    pub fn get_borrow_index(env: Env) -> u128 {
        storage::require_initialized(&env);
        storage::borrow_index(&env)
    }

    pub fn get_reserve_factor(env: Env) -> u128 {
        storage::require_initialized(&env);
        storage::reserve_factor(&env)
    }

    pub fn get_accrual_timestamp(env: Env) -> u64 {
        storage::require_initialized(&env);
        storage::accrual_time(&env)
    }

    pub fn get_underlying(env: Env) -> Address {
        storage::require_initialized(&env)
    }

    pub fn get_controller(env: Env) -> Address {
        storage::require_initialized(&env);
        storage::controller(&env)
    }

    pub fn get_interest_model(env: Env) -> Address {
        storage::require_initialized(&env);
        storage::interest_model(&env)
    }

    pub fn get_admin(env: Env) -> Address {
        storage::require_initialized(&env);
        storage::admin(&env)
    }

    // Internals

    /// One Euler step of the market dynamics. Everything is computed before
    /// anything is stored: an arithmetic failure aborts with no partial
    /// accrual committed.
    fn accrue(env: &Env) {
        let now = env.ledger().timestamp();
        let accrual_time = storage::accrual_time(env);
        if now == accrual_time {
            return;
        }
        let dt = now - accrual_time;

        let underlying = storage::require_initialized(env);
        let cash_prior = cash(env, &underlying);
        let borrows_prior = storage::total_borrows(env);
        let reserves_prior = storage::total_reserves(env);
        let index_prior = storage::borrow_index(env);

        let model = storage::interest_model(env);
        let borrow_rate = RateModelClient::new(env, &model).get_borrow_rate(
            &cash_prior,
            &borrows_prior,
            &reserves_prior,
        );
        if borrow_rate > BORROW_RATE_MAX {
            panic!("interest rate out of bounds");
        }

        let simple_interest_factor = unwrap_math(Exp::new(borrow_rate).mul_scalar(dt as u128));
        let interest_accumulated =
            unwrap_math(simple_interest_factor.mul_scalar_truncate(borrows_prior));
        let total_borrows = match borrows_prior.checked_add(interest_accumulated) {
            Some(v) => v,
            None => panic!("arithmetic overflow"),
        };
        let reserves_delta = unwrap_math(
            Exp::new(storage::reserve_factor(env)).mul_scalar_truncate(interest_accumulated),
        );
        let total_reserves = match reserves_prior.checked_add(reserves_delta) {
            Some(v) => v,
            None => panic!("arithmetic overflow"),
        };
        let borrow_index =
            unwrap_math(simple_interest_factor.mul_scalar_truncate_add(index_prior, index_prior));

        storage::set_total_borrows(env, total_borrows);
        storage::set_total_reserves(env, total_reserves);
        storage::set_borrow_index(env, borrow_index);
        storage::set_accrual_time(env, now);

        AccrueInterest {
            cash_prior,
            interest_accumulated,
            borrow_index,
            total_borrows,
        }
        .publish(env);
    }

    /// Balance-affecting paths must run against the current timestamp.
    /// `accrue` always satisfies this; the check guards against any future
    /// path that forgets to.
    fn require_fresh(env: &Env) {
        if storage::accrual_time(env) != env.ledger().timestamp() {
            panic!("market not fresh");
        }
    }

    fn exchange_rate(env: &Env) -> Exp {
        let total_supply = storage::total_supply(env);
        if total_supply == 0 {
            return Exp::new(storage::initial_exchange_rate(env));
        }
        let underlying = storage::require_initialized(env);
        let liquidity = match cash(env, &underlying)
            .checked_add(storage::total_borrows(env))
            .and_then(|pool| pool.checked_sub(storage::total_reserves(env)))
        {
            Some(v) => v,
            None => panic!("arithmetic underflow"),
        };
        unwrap_math(Exp::from_fraction(liquidity, total_supply))
    }

    fn owed(env: &Env, account: &Address) -> u128 {
        let snapshot = match storage::borrow_snapshot(env, account) {
            None => return 0,
            Some(s) => s,
        };
        if snapshot.principal == 0 {
            return 0;
        }
        let scaled = match snapshot.principal.checked_mul(storage::borrow_index(env)) {
            Some(v) => v,
            None => panic!("arithmetic overflow"),
        };
        scaled / snapshot.interest_index
    }
}
