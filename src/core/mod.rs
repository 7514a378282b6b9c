//! Core building blocks shared by every command
//!
//! - **config**: shipyard.toml parsing and validation
//! - **context**: project context built once in main.rs
//! - **error**: error types with exit codes and contextual help

pub mod config;
pub mod context;
pub mod error;
