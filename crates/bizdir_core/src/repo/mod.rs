//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for listings.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Multi-step writes run inside one transaction and are all-or-nothing.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to storage transport errors.

pub mod business_repo;
pub mod category_repo;
pub mod error;
pub mod search;

/// Returns `n` comma-separated positional markers, e.g. `?, ?, ?`.
pub(crate) fn sql_placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
