// src/lib.rs
pub mod error;
pub mod fetch;
pub mod logging;
pub mod repair;

pub use error::{FetchError, RepairError};
