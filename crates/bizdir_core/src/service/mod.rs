//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into caller-facing listing operations.
//! - Keep CLI and other outer layers decoupled from storage details.

pub mod business_service;
