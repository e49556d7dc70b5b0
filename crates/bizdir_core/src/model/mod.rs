//! Directory domain model.
//!
//! # Responsibility
//! - Define the business/category records shared by repository and service.
//! - Own the text encoding of list-valued columns.
//!
//! # Invariants
//! - Every business is addressed externally by its public `id`, never by the
//!   internal storage key.
//! - Deletion is represented by a soft-delete tombstone, not hard delete.

pub mod business;
pub mod category;
pub mod string_list;
