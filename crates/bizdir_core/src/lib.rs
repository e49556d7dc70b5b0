//! Business directory core: listing model, SQLite persistence and search.
//! This crate is the single source of truth for listing invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{Config, ConfigError, DatabaseConfig, LogConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingError};
pub use model::business::{Business, BusinessValidationError, Coordinates, Location};
pub use model::category::Category;
pub use repo::business_repo::{BusinessRepository, SqliteBusinessRepository};
pub use repo::error::{RepoError, RepoResult};
pub use repo::search::{
    normalize_search_limit, OpenAt, SearchPredicate, SearchQuery, SEARCH_DEFAULT_LIMIT,
    SEARCH_LIMIT_MAX,
};
pub use service::business_service::{
    generate_public_id, parse_list_param, BusinessService, SearchParams, ServiceError,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
