//! Backup pruner library exports

pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod models;
pub mod policy;
pub mod safety;
pub mod storage;
pub mod tasks;
