//! Core traits the client plugs its collaborators in through.

pub mod storage;
pub mod token;

pub use storage::DurableStorage;
pub use token::TokenProvider;
