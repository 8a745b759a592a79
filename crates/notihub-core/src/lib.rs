//! # notihub-core
//!
//! Core crate for NotiHub. Contains the notification and connection data
//! model, the token provider and durable storage seams, configuration
//! schemas, and the unified error system.
//!
//! This crate has **no** internal dependencies on other NotiHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
