//! Business use-case service.
//!
//! # Responsibility
//! - Assign public ids and validate write input before persistence.
//! - Convert caller search parameters into a repository `SearchQuery`.
//! - Emit one outcome log event per use-case call.
//!
//! # Invariants
//! - Public ids are 32 lowercase hex characters, generated here only.
//! - Search page size never exceeds `SEARCH_LIMIT_MAX`.

use crate::model::business::{Business, BusinessValidationError};
use crate::repo::business_repo::BusinessRepository;
use crate::repo::error::RepoError;
use crate::repo::search::{normalize_search_limit, OpenAt, SearchQuery};
use log::{error, info};
use std::fmt::Display;
use std::time::Instant;
use uuid::Uuid;

/// Service error for listing use-cases.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid business: {0}")]
    Validation(#[from] BusinessValidationError),
    /// `open_at` epoch seconds cannot be represented as a local instant.
    #[error("invalid open_at timestamp: {0}")]
    InvalidOpenAt(u64),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Caller-facing search parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub limit: u32,
    pub offset: u32,
    pub categories: Vec<String>,
    pub attributes: Vec<String>,
    pub price: u32,
    /// Epoch seconds; zero means unset.
    pub open_at: u64,
    /// Takes precedence over `open_at`.
    pub open_now: bool,
}

/// Listing service facade over repository implementations.
pub struct BusinessService<R: BusinessRepository> {
    repo: R,
}

impl<R: BusinessRepository> BusinessService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a listing under a freshly generated public id and returns the
    /// stored record.
    pub fn create(&self, mut business: Business) -> Result<Business, ServiceError> {
        let started_at = Instant::now();
        business.id = generate_public_id();
        let result = business
            .validate()
            .map_err(ServiceError::from)
            .and_then(|()| self.repo.create(&business).map_err(ServiceError::from))
            .and_then(|()| self.repo.read_by_id(&business.id).map_err(ServiceError::from));
        log_outcome("business_create", &business.id, started_at, &result);
        result
    }

    pub fn read(&self, id: &str) -> Result<Business, ServiceError> {
        let started_at = Instant::now();
        let result = self.repo.read_by_id(id).map_err(ServiceError::from);
        log_outcome("business_read", id, started_at, &result);
        result
    }

    /// Updates a listing. Zero-valued scalar fields keep their stored value;
    /// categories and list fields are replaced.
    pub fn update(&self, id: &str, business: Business) -> Result<(), ServiceError> {
        let started_at = Instant::now();
        let result = business
            .validate_update()
            .map_err(ServiceError::from)
            .and_then(|()| self.repo.update_by_id(id, &business).map_err(ServiceError::from));
        log_outcome("business_update", id, started_at, &result);
        result
    }

    pub fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let started_at = Instant::now();
        let result = self.repo.delete_by_id(id).map_err(ServiceError::from);
        log_outcome("business_delete", id, started_at, &result);
        result
    }

    pub fn search(&self, params: &SearchParams) -> Result<Vec<Business>, ServiceError> {
        let started_at = Instant::now();
        let result = search_query(params)
            .and_then(|query| self.repo.search(&query).map_err(ServiceError::from));
        match &result {
            Ok(items) => info!(
                "event=business_search module=service status=ok duration_ms={} count={}",
                started_at.elapsed().as_millis(),
                items.len()
            ),
            Err(err) => error!(
                "event=business_search module=service status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}

/// Builds the repository query: clamps the page size and reduces
/// `open_now`/`open_at` to a clock time.
pub fn search_query(params: &SearchParams) -> Result<SearchQuery, ServiceError> {
    let open_at = if params.open_now {
        Some(OpenAt::Now.time_of_day())
    } else if params.open_at > 0 {
        let seconds = i64::try_from(params.open_at)
            .map_err(|_| ServiceError::InvalidOpenAt(params.open_at))?;
        let reference = OpenAt::from_unix_seconds(seconds)
            .ok_or(ServiceError::InvalidOpenAt(params.open_at))?;
        Some(reference.time_of_day())
    } else {
        None
    };

    Ok(SearchQuery {
        limit: normalize_search_limit(params.limit),
        offset: params.offset,
        price: params.price,
        attributes: params.attributes.clone(),
        categories: params.categories.clone(),
        open_at,
    })
}

/// Splits a comma-separated query value, dropping blank entries.
pub fn parse_list_param(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Public id: 16 random bytes rendered as lowercase hex.
pub fn generate_public_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn log_outcome<T, E: Display>(
    event: &str,
    id: &str,
    started_at: Instant,
    result: &Result<T, E>,
) {
    match result {
        Ok(_) => info!(
            "event={event} module=service status=ok duration_ms={} id={id}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event={event} module=service status=error duration_ms={} id={id} error={err}",
            started_at.elapsed().as_millis()
        ),
    }
}
