//! Business search query composition.
//!
//! # Responsibility
//! - Turn optional search inputs into an explicit list of predicates.
//! - Fold predicates conjunctively into one parameterized SELECT.
//!
//! # Invariants
//! - Soft-deleted rows are always excluded.
//! - Every caller-supplied value is bound, never spliced into SQL text.
//! - Effective limit never exceeds `SEARCH_LIMIT_MAX`.

use chrono::{DateTime, Local, NaiveTime, TimeZone, Timelike};
use rusqlite::types::Value;

use crate::repo::sql_placeholders;

pub const SEARCH_DEFAULT_LIMIT: u32 = 20;
pub const SEARCH_LIMIT_MAX: u32 = 100;

/// Stored/compared text form of open and close times.
pub(crate) const TIME_OF_DAY_FORMAT: &str = "%H:%M:%S";

/// Search inputs. Zero/empty/`None` fields are inactive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Page size. Zero selects the default; larger values clamp to the max.
    pub limit: u32,
    pub offset: u32,
    /// Exact price tier (character count of `price`).
    pub price: u32,
    /// Listings must carry every one of these attributes.
    pub attributes: Vec<String>,
    /// Listings must be linked to at least one of these category aliases.
    pub categories: Vec<String>,
    /// Listings must be open at this clock time.
    pub open_at: Option<NaiveTime>,
}

/// Reference point for the open-window filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAt {
    Now,
    Instant(DateTime<Local>),
}

impl OpenAt {
    /// Converts epoch seconds; out-of-range values yield `None`.
    pub fn from_unix_seconds(seconds: i64) -> Option<Self> {
        Local.timestamp_opt(seconds, 0).single().map(Self::Instant)
    }

    /// Reduces the reference point to a whole-second local clock time.
    pub fn time_of_day(&self) -> NaiveTime {
        let instant = match self {
            Self::Now => Local::now(),
            Self::Instant(instant) => *instant,
        };
        truncate_to_second(instant.time())
    }
}

/// One conjunct of the search WHERE clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPredicate {
    PriceTier(u32),
    HasAllAttributes(Vec<String>),
    InAnyCategory(Vec<String>),
    OpenAt(NaiveTime),
}

impl SearchPredicate {
    /// Renders this predicate as SQL with positional `?` markers and the
    /// values to bind, in order.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        match self {
            Self::PriceTier(tier) => (
                "LENGTH(businesses.price) = ?".to_string(),
                vec![Value::Integer(i64::from(*tier))],
            ),
            Self::HasAllAttributes(attributes) => {
                let clauses: Vec<&str> = attributes
                    .iter()
                    .map(|_| {
                        "EXISTS (
                    SELECT 1 FROM json_each(businesses.attributes)
                    WHERE json_each.value = ?
                )"
                    })
                    .collect();
                let values = attributes.iter().cloned().map(Value::Text).collect();
                (clauses.join(" AND "), values)
            }
            Self::InAnyCategory(aliases) => (
                format!(
                    "businesses.id IN (
                    SELECT bc.business_id
                    FROM business_categories bc
                    LEFT JOIN categories c ON bc.category_id = c.id
                    WHERE c.alias IN ({})
                )",
                    sql_placeholders(aliases.len())
                ),
                aliases.iter().cloned().map(Value::Text).collect(),
            ),
            Self::OpenAt(time_of_day) => {
                let text = time_of_day.format(TIME_OF_DAY_FORMAT).to_string();
                (
                    "businesses.open_time < ? AND businesses.close_time > ?".to_string(),
                    vec![Value::Text(text.clone()), Value::Text(text)],
                )
            }
        }
    }
}

/// Final SELECT text plus bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedQuery {
    pub sql: String,
    pub values: Vec<Value>,
    pub applied_limit: u32,
}

impl SearchQuery {
    /// Active predicates in a fixed order.
    pub fn predicates(&self) -> Vec<SearchPredicate> {
        let mut predicates = Vec::new();
        if self.price != 0 {
            predicates.push(SearchPredicate::PriceTier(self.price));
        }
        if !self.attributes.is_empty() {
            predicates.push(SearchPredicate::HasAllAttributes(self.attributes.clone()));
        }
        if !self.categories.is_empty() {
            predicates.push(SearchPredicate::InAnyCategory(self.categories.clone()));
        }
        if let Some(time_of_day) = self.open_at {
            predicates.push(SearchPredicate::OpenAt(time_of_day));
        }
        predicates
    }

    /// Builds the SELECT over `select_sql`, which must read from `businesses`.
    pub fn compose(&self, select_sql: &str) -> ComposedQuery {
        let mut sql = format!("{select_sql} WHERE businesses.deleted_at IS NULL");
        let mut values = Vec::new();

        for predicate in self.predicates() {
            let (clause, bound) = predicate.to_sql();
            sql.push_str(" AND (");
            sql.push_str(&clause);
            sql.push(')');
            values.extend(bound);
        }

        let applied_limit = normalize_search_limit(self.limit);
        sql.push_str(" ORDER BY businesses.id ASC LIMIT ? OFFSET ?");
        values.push(Value::Integer(i64::from(applied_limit)));
        values.push(Value::Integer(i64::from(self.offset)));

        ComposedQuery {
            sql,
            values,
            applied_limit,
        }
    }
}

/// Normalizes a requested page size: zero selects the default, values above
/// the max are reduced to it.
pub fn normalize_search_limit(limit: u32) -> u32 {
    match limit {
        0 => SEARCH_DEFAULT_LIMIT,
        value if value > SEARCH_LIMIT_MAX => SEARCH_LIMIT_MAX,
        value => value,
    }
}

fn truncate_to_second(time: NaiveTime) -> NaiveTime {
    time.with_nanosecond(0).unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::{normalize_search_limit, OpenAt, SearchPredicate, SearchQuery};
    use chrono::{Local, NaiveTime, TimeZone};
    use rusqlite::types::Value;

    #[test]
    fn empty_query_has_no_predicates_and_default_page() {
        let composed = SearchQuery::default().compose("SELECT * FROM businesses");
        assert!(SearchQuery::default().predicates().is_empty());
        assert_eq!(
            composed.sql,
            "SELECT * FROM businesses WHERE businesses.deleted_at IS NULL \
             ORDER BY businesses.id ASC LIMIT ? OFFSET ?"
        );
        assert_eq!(composed.values, vec![Value::Integer(20), Value::Integer(0)]);
    }

    #[test]
    fn limit_clamps_to_max() {
        assert_eq!(normalize_search_limit(500), 100);
        assert_eq!(normalize_search_limit(100), 100);
        assert_eq!(normalize_search_limit(10), 10);
        assert_eq!(normalize_search_limit(0), 20);
    }

    #[test]
    fn predicates_follow_active_inputs_only() {
        let query = SearchQuery {
            price: 2,
            categories: vec!["fnb".to_string()],
            ..SearchQuery::default()
        };
        assert_eq!(
            query.predicates(),
            vec![
                SearchPredicate::PriceTier(2),
                SearchPredicate::InAnyCategory(vec!["fnb".to_string()]),
            ]
        );
    }

    #[test]
    fn attribute_predicate_binds_one_value_per_attribute() {
        let predicate =
            SearchPredicate::HasAllAttributes(vec!["wifi".to_string(), "parking".to_string()]);
        let (sql, values) = predicate.to_sql();
        assert_eq!(sql.matches("json_each.value = ?").count(), 2);
        assert_eq!(
            values,
            vec![
                Value::Text("wifi".to_string()),
                Value::Text("parking".to_string())
            ]
        );
    }

    #[test]
    fn category_predicate_joins_by_alias() {
        let (sql, values) =
            SearchPredicate::InAnyCategory(vec!["fnb".to_string(), "office".to_string()]).to_sql();
        assert!(sql.contains("c.alias IN (?, ?)"));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn open_at_binds_clock_time_twice() {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        let (sql, values) = SearchPredicate::OpenAt(noon).to_sql();
        assert!(sql.contains("open_time < ?"));
        assert_eq!(
            values,
            vec![
                Value::Text("12:00:00".to_string()),
                Value::Text("12:00:00".to_string())
            ]
        );
    }

    #[test]
    fn values_are_never_spliced_into_sql() {
        let query = SearchQuery {
            attributes: vec!["x' OR 1=1 --".to_string()],
            categories: vec!["fnb'; DROP TABLE businesses; --".to_string()],
            ..SearchQuery::default()
        };
        let composed = query.compose("SELECT * FROM businesses");
        assert!(!composed.sql.contains("OR 1=1"));
        assert!(!composed.sql.contains("DROP TABLE"));
    }

    #[test]
    fn open_at_instant_ignores_calendar_date() {
        let instant = Local.with_ymd_and_hms(2020, 2, 29, 12, 30, 15).unwrap();
        assert_eq!(
            OpenAt::Instant(instant).time_of_day(),
            NaiveTime::from_hms_opt(12, 30, 15).unwrap()
        );
    }
}
