pub mod cli;
pub mod client;
pub mod collector;
pub mod config;
pub mod storage;
