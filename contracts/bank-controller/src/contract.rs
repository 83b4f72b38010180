use soroban_sdk::{contract, contractimpl, Address, Env, Symbol, Vec};

use exp_math::{Exp, MathError, MathResult, EXP_SCALE};

use crate::events::*;
use crate::gate::AuthGateClient;
use crate::market::MarketClient;
use crate::oracle::PriceOracleClient;
use crate::storage::{self, Market, MarketSnapshot};

/// The market registry and risk engine. Owns the set of listed markets and
/// their collateral parameters, tracks which markets each account has
/// entered, and turns ledger snapshots plus oracle prices into the
/// account-liquidity verdicts that authorize or reject every withdrawal
/// and borrow.
#[contract]
pub struct BankController;

#[contractimpl]
impl BankController {
    pub fn initialize(env: Env, auth_gate: Address, oracle: Address) {
        if env.storage().persistent().has(&storage::DataKey::AuthGate) {
            panic!("already initialized");
        }
        env.storage()
            .persistent()
            .set(&storage::DataKey::AuthGate, &auth_gate);
        env.storage()
            .persistent()
            .set(&storage::DataKey::Oracle, &oracle);
        env.storage()
            .persistent()
            .set(&storage::DataKey::CloseFactor, &(EXP_SCALE / 2));
    }

    // Structural actions, all behind the authorization gate.

    /// Lists a market. Listing is permanent; a freshly listed market starts
    /// with zero collateral factor so it grants no borrowing power until
    /// governance raises it.
    pub fn support_market(env: Env, market: Address, signatures: Vec<Address>) {
        storage::require_initialized(&env);
        Self::require_authorized(&env, "support_market", &signatures);
        if let Some(existing) = storage::market(&env, &market) {
            if existing.is_listed {
                panic!("market already listed");
            }
        }
        storage::set_market(
            &env,
            &market,
            &Market {
                is_listed: true,
                collateral_factor: 0,
                liquidation_incentive: EXP_SCALE,
            },
        );
        let mut all = storage::all_markets(&env);
        all.push_back(market.clone());
        storage::set_all_markets(&env, &all);

        MarketListed { market }.publish(&env);
    }

    pub fn set_collateral_factor(
        env: Env,
        market: Address,
        new_collateral_factor: u128,
        signatures: Vec<Address>,
    ) {
        storage::require_initialized(&env);
        Self::require_authorized(&env, "set_collateral_factor", &signatures);
        let mut info = storage::require_listed(&env, &market);
        if new_collateral_factor >= EXP_SCALE {
            panic!("invalid collateral factor");
        }
        let old_collateral_factor = info.collateral_factor;
        info.collateral_factor = new_collateral_factor;
        storage::set_market(&env, &market, &info);

        NewCollateralFactor {
            market,
            old_collateral_factor,
            new_collateral_factor,
        }
        .publish(&env);
    }

    pub fn set_liquidation_incentive(
        env: Env,
        market: Address,
        new_liquidation_incentive: u128,
        signatures: Vec<Address>,
    ) {
        storage::require_initialized(&env);
        Self::require_authorized(&env, "set_liquidation_incentive", &signatures);
        let mut info = storage::require_listed(&env, &market);
        if new_liquidation_incentive < EXP_SCALE {
            panic!("invalid liquidation incentive");
        }
        let old_liquidation_incentive = info.liquidation_incentive;
        info.liquidation_incentive = new_liquidation_incentive;
        storage::set_market(&env, &market, &info);

        NewLiquidationIncentive {
            market,
            old_liquidation_incentive,
            new_liquidation_incentive,
        }
        .publish(&env);
    }

    pub fn set_close_factor(env: Env, new_close_factor: u128, signatures: Vec<Address>) {
        storage::require_initialized(&env);
        Self::require_authorized(&env, "set_close_factor", &signatures);
        if new_close_factor == 0 || new_close_factor > EXP_SCALE {
            panic!("invalid close factor");
        }
        let old_close_factor = storage::close_factor(&env);
        env.storage()
            .persistent()
            .set(&storage::DataKey::CloseFactor, &new_close_factor);

        NewCloseFactor {
            old_close_factor,
            new_close_factor,
        }
        .publish(&env);
    }

    pub fn set_oracle(env: Env, oracle: Address, signatures: Vec<Address>) {
        storage::require_initialized(&env);
        Self::require_authorized(&env, "set_oracle", &signatures);
        env.storage()
            .persistent()
            .set(&storage::DataKey::Oracle, &oracle);

        NewOracle { oracle }.publish(&env);
    }

    // Membership

    /// Opts an account into a market, scoping it into every future
    /// liquidity computation.
    pub fn enter_market(env: Env, account: Address, market: Address) {
        storage::require_initialized(&env);
        account.require_auth();
        storage::require_listed(&env, &market);
        let mut entered = storage::account_markets(&env, &account);
        if !entered.contains(market.clone()) {
            entered.push_back(market.clone());
            storage::set_account_markets(&env, &account, &entered);
        }
        MarketEntered { account, market }.publish(&env);
    }

    /// Opts an account out of a market. Refused while the account still has
    /// claim tokens or debt there, since the engine would stop scanning a
    /// position it must keep seeing.
    pub fn exit_market(env: Env, account: Address, market: Address) {
        storage::require_initialized(&env);
        account.require_auth();
        let (token_balance, borrow_balance, _) =
            MarketClient::new(&env, &market).get_account_snapshot(&account);
        if token_balance > 0 || borrow_balance > 0 {
            panic!("cannot exit market with outstanding position");
        }
        let entered = storage::account_markets(&env, &account);
        let mut remaining = Vec::new(&env);
        for i in 0..entered.len() {
            let m = entered.get(i).unwrap();
            if m != market {
                remaining.push_back(m);
            }
        }
        storage::set_account_markets(&env, &account, &remaining);

        MarketExited { account, market }.publish(&env);
    }

    // Liquidity

    /// `(liquidity, shortfall)` for an account across its entered markets.
    /// At most one of the two is nonzero.
    pub fn get_account_liquidity(env: Env, account: Address) -> (u128, u128) {
        storage::require_initialized(&env);
        let (collateral_value, borrow_value) = Self::account_position(&env, &account, None);
        Self::liquidity_pair(collateral_value, borrow_value)
    }

    // Hooks consumed by the ledger. Checks precede effects: each hook folds
    // the pending action into the liquidity computation before the market
    // commits anything.

    pub fn mint_allowed(env: Env, market: Address, _minter: Address) {
        storage::require_initialized(&env);
        storage::require_listed(&env, &market);
    }

    pub fn redeem_allowed(
        env: Env,
        market: Address,
        redeemer: Address,
        redeem_tokens: u128,
        snapshot: MarketSnapshot,
    ) -> (u128, u128) {
        storage::require_initialized(&env);
        storage::require_listed(&env, &market);
        if !storage::is_member(&env, &redeemer, &market) {
            // A market the account never entered grants no borrowing
            // power, so withdrawing from it cannot create a shortfall.
            return (0, 0);
        }
        let (collateral_value, borrow_value) = Self::account_position(
            &env,
            &redeemer,
            Some((market, snapshot, redeem_tokens, 0)),
        );
        Self::liquidity_pair(collateral_value, borrow_value)
    }

    pub fn borrow_allowed(
        env: Env,
        market: Address,
        borrower: Address,
        borrow_amount: u128,
        snapshot: MarketSnapshot,
    ) -> (u128, u128) {
        storage::require_initialized(&env);
        storage::require_listed(&env, &market);
        if !storage::is_member(&env, &borrower, &market) {
            panic!("market not entered");
        }
        let (collateral_value, borrow_value) = Self::account_position(
            &env,
            &borrower,
            Some((market, snapshot, 0, borrow_amount)),
        );
        Self::liquidity_pair(collateral_value, borrow_value)
    }

    // Liquidation

    /// Repays part of an underwater borrower's debt from the liquidator's
    /// funds and seizes claim tokens in a second market at the listed
    /// incentive. The repay leg is capped by the close factor.
    pub fn liquidate_borrow(
        env: Env,
        liquidator: Address,
        borrower: Address,
        repay_market: Address,
        collateral_market: Address,
        repay_amount: u128,
    ) {
        storage::require_initialized(&env);
        liquidator.require_auth();
        if repay_market == collateral_market {
            panic!("invalid liquidation markets");
        }
        storage::require_listed(&env, &repay_market);
        let collateral_info = storage::require_listed(&env, &collateral_market);

        MarketClient::new(&env, &repay_market).accrue_interest();
        MarketClient::new(&env, &collateral_market).accrue_interest();

        let (_liquidity, shortfall) = {
            let (collateral_value, borrow_value) =
                Self::account_position(&env, &borrower, None);
            Self::liquidity_pair(collateral_value, borrow_value)
        };
        if shortfall == 0 {
            panic!("insufficient shortfall");
        }

        let owed = MarketClient::new(&env, &repay_market).borrow_balance_stored(&borrower);
        if owed == 0 {
            panic!("no outstanding borrow");
        }
        let max_close =
            unwrap_math(Exp::new(storage::close_factor(&env)).mul_scalar_truncate(owed));
        let repay = if repay_amount > max_close {
            max_close
        } else {
            repay_amount
        };
        if repay == 0 {
            panic!("zero amount");
        }

        let price_borrowed = Self::require_price(&env, &repay_market);
        let price_collateral = Self::require_price(&env, &collateral_market);
        let (borrower_tokens, _, collateral_rate) =
            MarketClient::new(&env, &collateral_market).get_account_snapshot(&borrower);

        // seize = repay * incentive * price_borrowed
        //         / (price_collateral * exchange_rate)
        let numerator = unwrap_math(
            Exp::new(collateral_info.liquidation_incentive).mul(Exp::new(price_borrowed)),
        );
        let denominator =
            unwrap_math(Exp::new(price_collateral).mul(Exp::new(collateral_rate)));
        let ratio = unwrap_math(numerator.div(denominator));
        let mut seize_tokens = unwrap_math(ratio.mul_scalar_truncate(repay));
        if seize_tokens > borrower_tokens {
            seize_tokens = borrower_tokens;
        }

        let actual_repay =
            MarketClient::new(&env, &repay_market).repay(&liquidator, &borrower, &repay);
        MarketClient::new(&env, &collateral_market).seize(&borrower, &liquidator, &seize_tokens);

        LiquidateBorrow {
            liquidator,
            borrower,
            repay_market,
            collateral_market,
            repay_amount: actual_repay,
            seize_tokens,
        }
        .publish(&env);
    }

    // Views

    pub fn get_market(env: Env, market: Address) -> Market {
        storage::require_initialized(&env);
        storage::market(&env, &market).expect("market not listed")
    }

    pub fn get_all_markets(env: Env) -> Vec<Address> {
        storage::require_initialized(&env);
        storage::all_markets(&env)
    }

    pub fn get_account_markets(env: Env, account: Address) -> Vec<Address> {
        storage::require_initialized(&env);
        storage::account_markets(&env, &account)
    }

    pub fn get_close_factor(env: Env) -> u128 {
        storage::require_initialized(&env);
        storage::close_factor(&env)
    }

    pub fn get_oracle(env: Env) -> Address {
        storage::require_initialized(&env);
        storage::oracle(&env)
    }

    pub fn get_auth_gate(env: Env) -> Address {
        storage::require_initialized(&env)
    }

    // Internals

    fn require_authorized(env: &Env, action: &str, signatures: &Vec<Address>) {
        let gate = storage::require_initialized(env);
        let authorized = AuthGateClient::new(env, &gate)
            .is_authorized(&Symbol::new(env, action), signatures);
        if !authorized {
            panic!("unauthorized");
        }
    }

    /// Accumulates collateral and borrow value across the account's entered
    /// markets, optionally replacing one market's snapshot with
    /// caller-supplied values and folding a hypothetical redeem/borrow into
    /// the borrow side. Per-market term:
    /// collateral += tokens * (cf * exchange_rate * price),
    /// borrows    += borrow_balance * price.
    fn account_position(
        env: &Env,
        account: &Address,
        modify: Option<(Address, MarketSnapshot, u128, u128)>,
    ) -> (u128, u128) {
        let mut collateral_value: u128 = 0;
        let mut borrow_value: u128 = 0;

        let entered = storage::account_markets(env, account);
        for i in 0..entered.len() {
            let m = entered.get(i).unwrap();
            let (token_balance, borrow_balance, exchange_rate) = match &modify {
                Some((market, snapshot, _, _)) if *market == m => (
                    snapshot.token_balance,
                    snapshot.borrow_balance,
                    snapshot.exchange_rate,
                ),
                _ => MarketClient::new(env, &m).get_account_snapshot(account),
            };

            let info = storage::require_listed(env, &m);
            let price = Self::require_price(env, &m);
            let tokens_to_value = unwrap_math(Exp::new(info.collateral_factor).mul3(
                Exp::new(exchange_rate),
                Exp::new(price),
            ));

            collateral_value = unwrap_math(
                tokens_to_value.mul_scalar_truncate_add(token_balance, collateral_value),
            );
            borrow_value = unwrap_math(
                Exp::new(price).mul_scalar_truncate_add(borrow_balance, borrow_value),
            );

            if let Some((market, _, redeem_tokens, borrow_amount)) = &modify {
                if *market == m {
                    // The pending action counts against the account as if
                    // it had already happened.
                    borrow_value = unwrap_math(
                        tokens_to_value.mul_scalar_truncate_add(*redeem_tokens, borrow_value),
                    );
                    borrow_value = unwrap_math(
                        Exp::new(price).mul_scalar_truncate_add(*borrow_amount, borrow_value),
                    );
                }
            }
        }

        (collateral_value, borrow_value)
    }

    /// A stale, missing, or zero price must reject the action rather than
    /// value the asset at zero or infinity.
    fn require_price(env: &Env, market: &Address) -> u128 {
        let oracle = storage::oracle(env);
        let quote: Option<u128> =
            PriceOracleClient::new(env, &oracle).get_underlying_price(market);
        match quote {
            Some(price) if price > 0 => price,
            _ => panic!("price unavailable"),
        }
    }

    fn liquidity_pair(collateral_value: u128, borrow_value: u128) -> (u128, u128) {
        if collateral_value >= borrow_value {
            (collateral_value - borrow_value, 0)
        } else {
            (0, borrow_value - collateral_value)
        }
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
