//! Infrastructure layer: persistence, configuration, start-up seeding.

pub mod bootstrap;
pub mod config;
pub mod records;
pub mod store;

pub use config::{AppConfig, ConfigError, RateLimitConfig, SeedAdmin, StorageConfig};
pub use records::{NewProject, NewTask, NewUser, Project, Task, User};
pub use store::{
    InMemoryStore, ProjectRepository, Store, StoreError, StoreResult, TaskRepository,
    UserRepository,
};
#[cfg(feature = "postgres")]
pub use store::PostgresStore;
