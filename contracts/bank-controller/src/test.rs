#![cfg(test)]

use super::*;
use crate::contract::{BankController, BankControllerClient};
use exp_math::EXP_SCALE;
use ftoken::{FToken, FTokenClient, RedeemAmount};
use interest_rate_model as irm;
use msign::{MSign, MSignClient};
use soroban_sdk::testutils::Address as _;
use soroban_sdk::{contract, contractimpl, contracttype, token, vec, Address, Env, Vec};

// Mock price feed keyed by market, quoting mantissa-scaled prices.
#[contract]
struct MockOracle;

#[contracttype]
enum OracleKey {
    Price(Address),
}

#[contractimpl]
impl MockOracle {
    pub fn set_price(env: Env, market: Address, price: u128) {
        env.storage()
            .persistent()
            .set(&OracleKey::Price(market), &price);
    }

    pub fn get_underlying_price(env: Env, market: Address) -> Option<u128> {
        env.storage().persistent().get(&OracleKey::Price(market))
    }
}

struct Protocol {
    controller: Address,
    oracle: Address,
    signer_a: Address,
    signer_b: Address,
}

fn setup_protocol(env: &Env) -> Protocol {
    let signer_a = Address::generate(env);
    let signer_b = Address::generate(env);
    let gate_id = env.register(MSign, ());
    MSignClient::new(env, &gate_id).initialize(
        &vec![env, signer_a.clone(), signer_b.clone()],
        &2u32,
    );

    let oracle_id = env.register(MockOracle, ());
    let controller_id = env.register(BankController, ());
    BankControllerClient::new(env, &controller_id).initialize(&gate_id, &oracle_id);

    Protocol {
        controller: controller_id,
        oracle: oracle_id,
        signer_a,
        signer_b,
    }
}

fn signatures(env: &Env, protocol: &Protocol) -> Vec<Address> {
    vec![
        env,
        protocol.signer_a.clone(),
        protocol.signer_b.clone(),
    ]
}

/// Deploys a zero-rate market wired to the protocol controller.
fn register_market(env: &Env, protocol: &Protocol, admin: &Address) -> (Address, Address) {
    let token_address = env
        .register_stellar_asset_contract_v2(admin.clone())
        .address();
    let model_id = env.register(irm::InterestRateModel, ());
    irm::InterestRateModelClient::new(env, &model_id).initialize(&0u128, &0u128);
    let market_id = env.register(FToken, ());
    FTokenClient::new(env, &market_id).initialize(
        &token_address,
        &protocol.controller,
        &model_id,
        &EXP_SCALE,
        admin,
    );
    (token_address, market_id)
}

#[test]
fn test_support_market_lists_with_safe_defaults() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let (_token, market_id) = register_market(&env, &protocol, &admin);

    controller.support_market(&market_id, &signatures(&env, &protocol));

    let market = controller.get_market(&market_id);
    assert!(market.is_listed);
    // A fresh listing grants no borrowing power until governance raises it.
    assert_eq!(market.collateral_factor, 0);
    assert_eq!(market.liquidation_incentive, EXP_SCALE);
    assert_eq!(controller.get_all_markets().len(), 1);
}

#[test]
#[should_panic(expected = "market already listed")]
fn test_support_market_twice_rejected() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let (_token, market_id) = register_market(&env, &protocol, &admin);

    controller.support_market(&market_id, &signatures(&env, &protocol));
    controller.support_market(&market_id, &signatures(&env, &protocol));
}

#[test]
#[should_panic(expected = "unauthorized")]
fn test_support_market_below_threshold_rejected() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let (_token, market_id) = register_market(&env, &protocol, &admin);

    // One signature of the required two.
    controller.support_market(&market_id, &vec![&env, protocol.signer_a.clone()]);
}

#[test]
#[should_panic(expected = "unauthorized")]
fn test_support_market_stranger_signatures_rejected() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let (_token, market_id) = register_market(&env, &protocol, &admin);

    let stranger_a = Address::generate(&env);
    let stranger_b = Address::generate(&env);
    controller.support_market(&market_id, &vec![&env, stranger_a, stranger_b]);
}

#[test]
fn test_set_collateral_factor_updates_market() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let (_token, market_id) = register_market(&env, &protocol, &admin);

    controller.support_market(&market_id, &signatures(&env, &protocol));
    controller.set_collateral_factor(
        &market_id,
        &310_000_000_000_000_000u128,
        &signatures(&env, &protocol),
    );
    assert_eq!(
        controller.get_market(&market_id).collateral_factor,
        310_000_000_000_000_000u128
    );
}

#[test]
#[should_panic(expected = "invalid collateral factor")]
fn test_collateral_factor_of_one_rejected() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let (_token, market_id) = register_market(&env, &protocol, &admin);

    controller.support_market(&market_id, &signatures(&env, &protocol));
    controller.set_collateral_factor(&market_id, &EXP_SCALE, &signatures(&env, &protocol));
}

#[test]
#[should_panic(expected = "market not listed")]
fn test_collateral_factor_on_unlisted_market_rejected() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let (_token, market_id) = register_market(&env, &protocol, &admin);

    controller.set_collateral_factor(
        &market_id,
        &500_000_000_000_000_000u128,
        &signatures(&env, &protocol),
    );
}

#[test]
#[should_panic(expected = "invalid liquidation incentive")]
fn test_liquidation_incentive_below_one_rejected() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let (_token, market_id) = register_market(&env, &protocol, &admin);

    controller.support_market(&market_id, &signatures(&env, &protocol));
    controller.set_liquidation_incentive(
        &market_id,
        &(EXP_SCALE - 1),
        &signatures(&env, &protocol),
    );
}

#[test]
#[should_panic(expected = "invalid close factor")]
fn test_zero_close_factor_rejected() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    controller.set_close_factor(&0u128, &signatures(&env, &protocol));
}

#[test]
fn test_enter_and_exit_market() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let user = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let (_token, market_id) = register_market(&env, &protocol, &admin);

    controller.support_market(&market_id, &signatures(&env, &protocol));
    controller.enter_market(&user, &market_id);
    let entered = controller.get_account_markets(&user);
    assert_eq!(entered.len(), 1);
    assert_eq!(entered.get(0), Some(market_id.clone()));

    // Entering again is idempotent.
    controller.enter_market(&user, &market_id);
    assert_eq!(controller.get_account_markets(&user).len(), 1);

    controller.exit_market(&user, &market_id);
    assert_eq!(controller.get_account_markets(&user).len(), 0);
}

#[test]
#[should_panic(expected = "cannot exit market with outstanding position")]
fn test_exit_with_position_rejected() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let user = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let (token_address, market_id) = register_market(&env, &protocol, &admin);

    controller.support_market(&market_id, &signatures(&env, &protocol));
    controller.enter_market(&user, &market_id);

    token::StellarAssetClient::new(&env, &token_address).mint(&user, &1_000i128);
    FTokenClient::new(&env, &market_id).mint(&user, &100u128);

    controller.exit_market(&user, &market_id);
}

#[test]
fn test_account_liquidity_applies_collateral_factor() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let user = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let oracle = MockOracleClient::new(&env, &protocol.oracle);
    let (token_address, market_id) = register_market(&env, &protocol, &admin);

    controller.support_market(&market_id, &signatures(&env, &protocol));
    controller.set_collateral_factor(
        &market_id,
        &800_000_000_000_000_000u128, // 0.8
        &signatures(&env, &protocol),
    );
    oracle.set_price(&market_id, &EXP_SCALE);
    controller.enter_market(&user, &market_id);

    token::StellarAssetClient::new(&env, &token_address).mint(&user, &10_000i128);
    FTokenClient::new(&env, &market_id).mint(&user, &1_000u128);

    let (liquidity, shortfall) = controller.get_account_liquidity(&user);
    assert_eq!(liquidity, 800);
    assert_eq!(shortfall, 0);
}

#[test]
fn test_borrow_at_exact_boundary_succeeds() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let user = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let oracle = MockOracleClient::new(&env, &protocol.oracle);
    let (token_address, market_id) = register_market(&env, &protocol, &admin);
    let market = FTokenClient::new(&env, &market_id);

    controller.support_market(&market_id, &signatures(&env, &protocol));
    controller.set_collateral_factor(
        &market_id,
        &800_000_000_000_000_000u128,
        &signatures(&env, &protocol),
    );
    oracle.set_price(&market_id, &EXP_SCALE);
    controller.enter_market(&user, &market_id);

    token::StellarAssetClient::new(&env, &token_address).mint(&user, &10_000i128);
    market.mint(&user, &1_000u128);

    // 1000 deposited at factor 0.8 backs exactly 800 of borrowing.
    market.borrow(&user, &800u128);
    assert_eq!(market.borrow_balance_stored(&user), 800);
    let (liquidity, shortfall) = controller.get_account_liquidity(&user);
    assert_eq!(liquidity, 0);
    assert_eq!(shortfall, 0);
}

#[test]
#[should_panic(expected = "insufficient liquidity")]
fn test_borrow_beyond_boundary_rejected() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let user = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let oracle = MockOracleClient::new(&env, &protocol.oracle);
    let (token_address, market_id) = register_market(&env, &protocol, &admin);
    let market = FTokenClient::new(&env, &market_id);

    controller.support_market(&market_id, &signatures(&env, &protocol));
    controller.set_collateral_factor(
        &market_id,
        &800_000_000_000_000_000u128,
        &signatures(&env, &protocol),
    );
    oracle.set_price(&market_id, &EXP_SCALE);
    controller.enter_market(&user, &market_id);

    token::StellarAssetClient::new(&env, &token_address).mint(&user, &10_000i128);
    market.mint(&user, &1_000u128);

    market.borrow(&user, &801u128);
}

#[test]
#[should_panic]
fn test_borrow_requires_market_membership() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let user = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let oracle = MockOracleClient::new(&env, &protocol.oracle);
    let (token_address, market_id) = register_market(&env, &protocol, &admin);
    let market = FTokenClient::new(&env, &market_id);

    controller.support_market(&market_id, &signatures(&env, &protocol));
    oracle.set_price(&market_id, &EXP_SCALE);

    token::StellarAssetClient::new(&env, &token_address).mint(&user, &10_000i128);
    market.mint(&user, &1_000u128);

    // Never entered the market: the engine refuses to authorize.
    market.borrow(&user, &1u128);
}

#[test]
#[should_panic]
fn test_mint_on_unlisted_market_rejected() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let user = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let (token_address, market_id) = register_market(&env, &protocol, &admin);

    token::StellarAssetClient::new(&env, &token_address).mint(&user, &1_000i128);
    FTokenClient::new(&env, &market_id).mint(&user, &100u128);
}

#[test]
#[should_panic(expected = "price unavailable")]
fn test_missing_price_fails_closed() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let user = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let (token_address, market_id) = register_market(&env, &protocol, &admin);

    controller.support_market(&market_id, &signatures(&env, &protocol));
    controller.enter_market(&user, &market_id);

    token::StellarAssetClient::new(&env, &token_address).mint(&user, &1_000i128);
    FTokenClient::new(&env, &market_id).mint(&user, &100u128);

    // No quote was ever published for this market.
    controller.get_account_liquidity(&user);
}

#[test]
#[should_panic(expected = "price unavailable")]
fn test_zero_price_fails_closed() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let user = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let oracle = MockOracleClient::new(&env, &protocol.oracle);
    let (token_address, market_id) = register_market(&env, &protocol, &admin);

    controller.support_market(&market_id, &signatures(&env, &protocol));
    controller.enter_market(&user, &market_id);
    oracle.set_price(&market_id, &0u128);

    token::StellarAssetClient::new(&env, &token_address).mint(&user, &1_000i128);
    FTokenClient::new(&env, &market_id).mint(&user, &100u128);

    controller.get_account_liquidity(&user);
}

#[test]
fn test_redeem_gated_by_remaining_liquidity() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let user = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let oracle = MockOracleClient::new(&env, &protocol.oracle);
    let (token_address, market_id) = register_market(&env, &protocol, &admin);
    let market = FTokenClient::new(&env, &market_id);

    controller.support_market(&market_id, &signatures(&env, &protocol));
    controller.set_collateral_factor(
        &market_id,
        &800_000_000_000_000_000u128,
        &signatures(&env, &protocol),
    );
    oracle.set_price(&market_id, &EXP_SCALE);
    controller.enter_market(&user, &market_id);

    token::StellarAssetClient::new(&env, &token_address).mint(&user, &10_000i128);
    market.mint(&user, &1_000u128);
    market.borrow(&user, &600u128);

    // Withdrawing 100 tokens still leaves 720 of borrowing power for a
    // 600 debt.
    let returned = market.redeem(&user, &RedeemAmount::Tokens(100));
    assert_eq!(returned, 100);
    assert_eq!(market.get_token_balance(&user), 900);
}

#[test]
#[should_panic(expected = "insufficient liquidity")]
fn test_redeem_that_strands_debt_rejected() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let user = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let oracle = MockOracleClient::new(&env, &protocol.oracle);
    let (token_address, market_id) = register_market(&env, &protocol, &admin);
    let market = FTokenClient::new(&env, &market_id);

    controller.support_market(&market_id, &signatures(&env, &protocol));
    controller.set_collateral_factor(
        &market_id,
        &800_000_000_000_000_000u128,
        &signatures(&env, &protocol),
    );
    oracle.set_price(&market_id, &EXP_SCALE);
    controller.enter_market(&user, &market_id);

    token::StellarAssetClient::new(&env, &token_address).mint(&user, &10_000i128);
    market.mint(&user, &1_000u128);
    market.borrow(&user, &600u128);

    // 400 tokens out would cut borrowing power to 480 against a 600 debt.
    market.redeem(&user, &RedeemAmount::Tokens(400));
}

#[test]
fn test_cross_market_borrow_against_other_collateral() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let user = Address::generate(&env);
    let lender = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let oracle = MockOracleClient::new(&env, &protocol.oracle);

    let (token_a, market_a_id) = register_market(&env, &protocol, &admin);
    let (token_b, market_b_id) = register_market(&env, &protocol, &admin);
    let market_a = FTokenClient::new(&env, &market_a_id);
    let market_b = FTokenClient::new(&env, &market_b_id);

    controller.support_market(&market_a_id, &signatures(&env, &protocol));
    controller.support_market(&market_b_id, &signatures(&env, &protocol));
    controller.set_collateral_factor(
        &market_b_id,
        &500_000_000_000_000_000u128, // 0.5
        &signatures(&env, &protocol),
    );
    oracle.set_price(&market_a_id, &EXP_SCALE);
    oracle.set_price(&market_b_id, &(2 * EXP_SCALE));

    controller.enter_market(&user, &market_a_id);
    controller.enter_market(&user, &market_b_id);

    token::StellarAssetClient::new(&env, &token_a).mint(&lender, &1_000i128);
    token::StellarAssetClient::new(&env, &token_b).mint(&user, &1_000i128);

    market_a.mint(&lender, &500u128);
    market_b.mint(&user, &1_000u128);

    // 1000 units of B at price 2.0 and factor 0.5 back 1000 of value.
    let (liquidity, shortfall) = controller.get_account_liquidity(&user);
    assert_eq!(liquidity, 1_000);
    assert_eq!(shortfall, 0);

    market_a.borrow(&user, &450u128);
    let (liquidity, shortfall) = controller.get_account_liquidity(&user);
    assert_eq!(liquidity, 550);
    assert_eq!(shortfall, 0);
}

#[test]
fn test_liquidation_seizes_discounted_collateral() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let user = Address::generate(&env);
    let lender = Address::generate(&env);
    let liquidator = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let oracle = MockOracleClient::new(&env, &protocol.oracle);

    let (token_a, market_a_id) = register_market(&env, &protocol, &admin);
    let (token_b, market_b_id) = register_market(&env, &protocol, &admin);
    let market_a = FTokenClient::new(&env, &market_a_id);
    let market_b = FTokenClient::new(&env, &market_b_id);

    controller.support_market(&market_a_id, &signatures(&env, &protocol));
    controller.support_market(&market_b_id, &signatures(&env, &protocol));
    controller.set_collateral_factor(
        &market_b_id,
        &500_000_000_000_000_000u128,
        &signatures(&env, &protocol),
    );
    controller.set_liquidation_incentive(
        &market_b_id,
        &1_080_000_000_000_000_000u128, // 1.08
        &signatures(&env, &protocol),
    );
    oracle.set_price(&market_a_id, &EXP_SCALE);
    oracle.set_price(&market_b_id, &(2 * EXP_SCALE));

    controller.enter_market(&user, &market_a_id);
    controller.enter_market(&user, &market_b_id);

    token::StellarAssetClient::new(&env, &token_a).mint(&lender, &1_000i128);
    token::StellarAssetClient::new(&env, &token_a).mint(&liquidator, &1_000i128);
    token::StellarAssetClient::new(&env, &token_b).mint(&user, &1_000i128);

    market_a.mint(&lender, &1_000u128);
    market_b.mint(&user, &1_000u128);
    market_a.borrow(&user, &800u128);

    // Collateral halves: 500 of backing against an 800 debt.
    oracle.set_price(&market_b_id, &EXP_SCALE);
    let (liquidity, shortfall) = controller.get_account_liquidity(&user);
    assert_eq!(liquidity, 0);
    assert_eq!(shortfall, 300);

    controller.liquidate_borrow(&liquidator, &user, &market_a_id, &market_b_id, &400u128);

    // Close factor caps the repay at 400; the seize is worth
    // 400 * 1.08 / (price 1.0 * rate 1.0) = 432 claim tokens.
    assert_eq!(market_a.borrow_balance_stored(&user), 400);
    assert_eq!(market_a.get_total_borrows(), 400);
    assert_eq!(market_b.get_token_balance(&user), 568);
    assert_eq!(market_b.get_token_balance(&liquidator), 432);
    assert_eq!(market_b.get_total_supply(), 1_000);
}

#[test]
#[should_panic(expected = "insufficient shortfall")]
fn test_liquidation_of_healthy_account_rejected() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let user = Address::generate(&env);
    let lender = Address::generate(&env);
    let liquidator = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let oracle = MockOracleClient::new(&env, &protocol.oracle);

    let (token_a, market_a_id) = register_market(&env, &protocol, &admin);
    let (token_b, market_b_id) = register_market(&env, &protocol, &admin);
    let market_a = FTokenClient::new(&env, &market_a_id);
    let market_b = FTokenClient::new(&env, &market_b_id);

    controller.support_market(&market_a_id, &signatures(&env, &protocol));
    controller.support_market(&market_b_id, &signatures(&env, &protocol));
    controller.set_collateral_factor(
        &market_b_id,
        &500_000_000_000_000_000u128,
        &signatures(&env, &protocol),
    );
    oracle.set_price(&market_a_id, &EXP_SCALE);
    oracle.set_price(&market_b_id, &(2 * EXP_SCALE));

    controller.enter_market(&user, &market_a_id);
    controller.enter_market(&user, &market_b_id);

    token::StellarAssetClient::new(&env, &token_a).mint(&lender, &1_000i128);
    token::StellarAssetClient::new(&env, &token_a).mint(&liquidator, &1_000i128);
    token::StellarAssetClient::new(&env, &token_b).mint(&user, &1_000i128);

    market_a.mint(&lender, &1_000u128);
    market_b.mint(&user, &1_000u128);
    market_a.borrow(&user, &500u128);

    controller.liquidate_borrow(&liquidator, &user, &market_a_id, &market_b_id, &100u128);
}

#[test]
fn test_pool_invariant_holds_across_flows() {
    let env = Env::default();
    env.mock_all_auths_allowing_non_root_auth();
    let admin = Address::generate(&env);
    let user = Address::generate(&env);
    let protocol = setup_protocol(&env);
    let controller = BankControllerClient::new(&env, &protocol.controller);
    let oracle = MockOracleClient::new(&env, &protocol.oracle);
    let (token_address, market_id) = register_market(&env, &protocol, &admin);
    let market = FTokenClient::new(&env, &market_id);

    controller.support_market(&market_id, &signatures(&env, &protocol));
    controller.set_collateral_factor(
        &market_id,
        &900_000_000_000_000_000u128,
        &signatures(&env, &protocol),
    );
    oracle.set_price(&market_id, &EXP_SCALE);
    controller.enter_market(&user, &market_id);

    token::StellarAssetClient::new(&env, &token_address).mint(&user, &10_000i128);

    let check = |market: &FTokenClient| {
        let total_supply = market.get_total_supply();
        if total_supply == 0 {
            return;
        }
        let liquidity =
            market.get_cash() + market.get_total_borrows() - market.get_total_reserves();
        assert_eq!(
            total_supply * market.exchange_rate_stored() / EXP_SCALE,
            liquidity
        );
    };

    market.mint(&user, &1_000u128);
    check(&market);
    market.borrow(&user, &500u128);
    check(&market);
    market.repay(&user, &user, &200u128);
    check(&market);
    market.redeem(&user, &RedeemAmount::Tokens(100));
    check(&market);

    assert_eq!(controller.get_close_factor(), EXP_SCALE / 2);
    assert_eq!(controller.get_oracle(), protocol.oracle);
}
