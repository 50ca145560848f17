//! Small local log of phone unlocks and sleep times. Everything lives in an
//! [EventLogStore](store::EventLogStore) that mirrors itself into key-value storage, and can be
//! driven from the terminal or from app lifecycle notifications.
//!

pub mod cli;
pub mod lifecycle;
pub mod persistence;
pub mod storage;
pub mod store;
pub mod utils;
