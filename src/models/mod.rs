//! Core data models for the catalog and its image assets.
//!
//! These entities map to database tables via `sqlx::FromRow` and serialize
//! as camelCase JSON via `serde`.

pub mod asset;
pub mod item;
pub mod seller;
