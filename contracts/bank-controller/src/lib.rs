#![no_std]

mod contract;
mod events;
mod gate;
mod market;
mod oracle;
mod storage;

mod test;

pub use crate::contract::{BankController, BankControllerClient};
pub use crate::storage::{Market, MarketSnapshot};
