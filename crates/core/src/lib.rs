//! `taskboard-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod page;
pub mod patch;
pub mod status;

pub use error::{DomainError, DomainResult};
pub use id::{ProjectId, TaskId, UserId};
pub use page::Page;
pub use patch::{ProjectPatch, TaskField, TaskPatch};
pub use status::TaskStatus;
