//! Core data models for the document store.
//!
//! These entities map to the `documents` table via `sqlx::FromRow` and
//! serialize as camelCase JSON via `serde`.

pub mod document;
