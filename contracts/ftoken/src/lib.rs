#![no_std]

mod constants;
mod contract;
mod controller;
mod events;
mod helpers;
mod rate_model;
mod storage;


pub use crate::contract::{FToken, FTokenClient};
pub use crate::storage::{BorrowSnapshot, MarketSnapshot, RedeemAmount};
