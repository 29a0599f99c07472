//! Credential store layer

pub mod user_store;

pub use user_store::*;
