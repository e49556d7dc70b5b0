//! Category association resolver and replacer.
//!
//! # Responsibility
//! - Resolve requested category aliases against seeded categories.
//! - Attach, detach and replace the `business_categories` link set.
//! - Load link sets for read models in one batched query.
//!
//! # Invariants
//! - Unknown aliases are dropped silently; categories are never created here.
//! - `replace_categories` leaves exactly the given set linked.
//! - Write helpers run on the caller's transaction; they never commit.

use crate::model::category::Category;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::sql_placeholders;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::{BTreeSet, HashMap};

/// Returns the existing categories whose alias is in `aliases`.
///
/// Duplicate and unknown aliases are ignored. Output is ordered by alias.
pub fn resolve_categories(conn: &Connection, aliases: &[String]) -> RepoResult<Vec<Category>> {
    let unique: BTreeSet<&str> = aliases.iter().map(String::as_str).collect();
    if unique.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT id, alias, name
         FROM categories
         WHERE alias IN ({})
         ORDER BY alias ASC;",
        sql_placeholders(unique.len())
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(RepoError::association("resolve_categories"))?;
    let rows = stmt
        .query_map(params_from_iter(unique.iter()), |row| {
            Ok(Category {
                id: row.get("id")?,
                alias: row.get("alias")?,
                name: row.get("name")?,
            })
        })
        .map_err(RepoError::association("resolve_categories"))?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(RepoError::association("resolve_categories"))
}

/// Links `categories` to the business, ignoring links that already exist.
pub fn attach_categories(
    conn: &Connection,
    business_key: i64,
    categories: &[Category],
) -> RepoResult<()> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT OR IGNORE INTO business_categories (business_id, category_id)
             VALUES (?1, ?2);",
        )
        .map_err(RepoError::association("attach_categories"))?;
    for category in categories {
        stmt.execute(params![business_key, category.id])
            .map_err(RepoError::association("attach_categories"))?;
    }
    Ok(())
}

/// Unlinks the given category ids from the business.
pub fn detach_categories(
    conn: &Connection,
    business_key: i64,
    category_ids: &[i64],
) -> RepoResult<()> {
    let mut stmt = conn
        .prepare_cached(
            "DELETE FROM business_categories
             WHERE business_id = ?1 AND category_id = ?2;",
        )
        .map_err(RepoError::association("detach_categories"))?;
    for category_id in category_ids {
        stmt.execute(params![business_key, category_id])
            .map_err(RepoError::association("detach_categories"))?;
    }
    Ok(())
}

/// Replaces the business link set with exactly `categories`.
pub fn replace_categories(
    conn: &Connection,
    business_key: i64,
    categories: &[Category],
) -> RepoResult<()> {
    let current = linked_category_ids(conn, business_key)?;
    let wanted: BTreeSet<i64> = categories.iter().map(|category| category.id).collect();

    let stale: Vec<i64> = current.difference(&wanted).copied().collect();
    let fresh: Vec<Category> = categories
        .iter()
        .filter(|category| !current.contains(&category.id))
        .cloned()
        .collect();

    detach_categories(conn, business_key, &stale)?;
    attach_categories(conn, business_key, &fresh)
}

/// Loads linked categories for each business key, ordered by alias.
///
/// Keys without links are absent from the returned map.
pub fn load_categories_for(
    conn: &Connection,
    business_keys: &[i64],
) -> RepoResult<HashMap<i64, Vec<Category>>> {
    let mut linked: HashMap<i64, Vec<Category>> = HashMap::new();
    if business_keys.is_empty() {
        return Ok(linked);
    }

    let sql = format!(
        "SELECT bc.business_id, c.id, c.alias, c.name
         FROM business_categories bc
         INNER JOIN categories c ON c.id = bc.category_id
         WHERE bc.business_id IN ({})
         ORDER BY bc.business_id ASC, c.alias ASC;",
        sql_placeholders(business_keys.len())
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(RepoError::query("load_categories"))?;
    let mut rows = stmt
        .query(params_from_iter(business_keys.iter()))
        .map_err(RepoError::query("load_categories"))?;
    while let Some(row) = rows.next().map_err(RepoError::query("load_categories"))? {
        let business_key: i64 = row.get(0).map_err(RepoError::query("load_categories"))?;
        let category = Category {
            id: row.get(1).map_err(RepoError::query("load_categories"))?,
            alias: row.get(2).map_err(RepoError::query("load_categories"))?,
            name: row.get(3).map_err(RepoError::query("load_categories"))?,
        };
        linked.entry(business_key).or_default().push(category);
    }

    Ok(linked)
}

fn linked_category_ids(conn: &Connection, business_key: i64) -> RepoResult<BTreeSet<i64>> {
    let mut stmt = conn
        .prepare_cached("SELECT category_id FROM business_categories WHERE business_id = ?1;")
        .map_err(RepoError::association("replace_categories"))?;
    let ids = stmt
        .query_map([business_key], |row| row.get::<_, i64>(0))
        .map_err(RepoError::association("replace_categories"))?;
    ids.collect::<rusqlite::Result<BTreeSet<_>>>()
        .map_err(RepoError::association("replace_categories"))
}
