#[cfg(test)]
pub mod memory;
pub mod repo;
pub mod repo_types;

pub use repo::{AccountStore, PgAccountStore};
pub use repo_types::{ResetRequest, User};
