use soroban_sdk::{Address, Env, Symbol, Vec};

// Authorization gate consumed for structural registry actions: a fixed
// signer set with a minimum-signature threshold replaces a single owner
// key. The registry only ever asks yes/no.
#[soroban_sdk::contractclient(name = "AuthGateClient")]
pub trait AuthGate {
    fn is_authorized(env: Env, action: Symbol, signatures: Vec<Address>) -> bool;
}
