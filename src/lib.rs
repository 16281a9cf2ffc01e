pub mod account;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod storage;
