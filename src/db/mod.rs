//! Local SQLite post store: entity models and SQL repositories.
//!
//! - `model`: row structs returned by repositories.
//! - `repo`: SQL-only functions that map rows into entities.
//!
//! The `HostStore` implementation built on top of these lives in `crate::store`.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::{StoredAttachment, StoredPost};
