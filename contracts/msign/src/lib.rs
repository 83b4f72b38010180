#![no_std]
use soroban_sdk::{contract, contractevent, contractimpl, contracttype, Address, Env, Symbol, Vec};

#[contracttype]
pub enum DataKey {
    Signers,   // Vec<Address>, fixed at initialization
    Threshold, // u32
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuthorizationCheck {
    #[topic]
    pub action: Symbol,
    pub approvals: u32,
    pub threshold: u32,
    pub authorized: bool,
}

/// Threshold authorization gate over a fixed signer set. Structural actions
/// on the market registry pass through `is_authorized` instead of a single
/// owner key: the caller presents the signing addresses, each one must have
/// authorized the invocation, and distinct members must meet the threshold.
#[contract]
pub struct MSign;

#[contractimpl]
impl MSign {
    pub fn initialize(env: Env, signers: Vec<Address>, threshold: u32) {
        if env.storage().persistent().has(&DataKey::Signers) {
            panic!("already initialized");
        }
        if signers.is_empty() {
            panic!("empty signer set");
        }
        if threshold == 0 || threshold > signers.len() {
            panic!("invalid threshold");
        }
        for i in 0..signers.len() {
            let signer = signers.get(i).unwrap();
            for j in (i + 1)..signers.len() {
                if signer == signers.get(j).unwrap() {
                    panic!("duplicate signer");
                }
            }
        }
        env.storage().persistent().set(&DataKey::Signers, &signers);
        env.storage()
            .persistent()
            .set(&DataKey::Threshold, &threshold);
    }

    /// Counts distinct presented addresses that belong to the signer set,
    /// requiring authorization from each, and compares against the
    /// threshold. Unknown or repeated addresses are ignored rather than
    /// rejected so a caller cannot be griefed by padding.
    pub fn is_authorized(env: Env, action: Symbol, signatures: Vec<Address>) -> bool {
        let signers: Vec<Address> = env
            .storage()
            .persistent()
            .get(&DataKey::Signers)
            .expect("not initialized");
        let threshold: u32 = env
            .storage()
            .persistent()
            .get(&DataKey::Threshold)
            .expect("not initialized");

        let mut approvals: u32 = 0;
        let mut seen: Vec<Address> = Vec::new(&env);
        for i in 0..signatures.len() {
            let candidate = signatures.get(i).unwrap();
            if seen.contains(candidate.clone()) {
                continue;
            }
            if signers.contains(candidate.clone()) {
                candidate.require_auth();
                approvals += 1;
            }
            seen.push_back(candidate);
        }

        let authorized = approvals >= threshold;
        AuthorizationCheck {
            action,
            approvals,
            threshold,
            authorized,
        }
        .publish(&env);
        authorized
    }

    pub fn get_signers(env: Env) -> Vec<Address> {
        env.storage()
            .persistent()
            .get(&DataKey::Signers)
            .expect("not initialized")
    }

    pub fn get_threshold(env: Env) -> u32 {
        env.storage()
            .persistent()
            .get(&DataKey::Threshold)
            .expect("not initialized")
    }
}
