//! Business repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/read/update/delete/search over `businesses`.
//! - Coordinate category association changes with scalar writes.
//!
//! # Invariants
//! - All reads are constrained to `deleted_at IS NULL`.
//! - Create and update run in one `IMMEDIATE` transaction each; on failure
//!   the transaction is rolled back before the error is returned.
//! - The public id is written once at create and never updated.

use crate::db::migrations::{current_version, latest_version};
use crate::model::business::{Business, Coordinates, Location};
use crate::model::string_list;
use crate::repo::category_repo::{
    attach_categories, load_categories_for, replace_categories, resolve_categories,
};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::search::{OpenAt, SearchQuery, TIME_OF_DAY_FORMAT};
use chrono::NaiveTime;
use log::debug;
use rusqlite::{
    named_params, params_from_iter, Connection, InterruptHandle, OptionalExtension, Row,
    Transaction, TransactionBehavior,
};

const BUSINESS_SELECT_SQL: &str = "SELECT
    businesses.id AS business_key,
    businesses.public_id,
    businesses.alias,
    businesses.cord_latitude,
    businesses.cord_longitude,
    businesses.display_phone,
    businesses.image_url,
    businesses.open_time,
    businesses.close_time,
    businesses.loc_address1,
    businesses.loc_address2,
    businesses.loc_address3,
    businesses.loc_city,
    businesses.loc_country,
    businesses.loc_display_address,
    businesses.loc_state,
    businesses.loc_zip_code,
    businesses.name,
    businesses.phone,
    businesses.price,
    businesses.rating,
    businesses.review_count,
    businesses.transactions,
    businesses.attributes,
    businesses.url,
    businesses.created_at,
    businesses.updated_at
FROM businesses";

const REQUIRED_TABLES: [&str; 3] = ["businesses", "categories", "business_categories"];

/// Repository interface for listing persistence.
pub trait BusinessRepository {
    /// Persists a new listing and links its resolvable categories.
    fn create(&self, business: &Business) -> RepoResult<()>;
    /// Loads one active listing by public id, categories populated.
    fn read_by_id(&self, id: &str) -> RepoResult<Business>;
    /// Replaces categories and updates non-zero scalar fields atomically.
    fn update_by_id(&self, id: &str, business: &Business) -> RepoResult<()>;
    /// Tombstones one active listing.
    fn delete_by_id(&self, id: &str) -> RepoResult<()>;
    /// Runs a filtered, paginated read over active listings.
    fn search(&self, query: &SearchQuery) -> RepoResult<Vec<Business>>;
}

/// SQLite-backed listing repository over a borrowed connection.
pub struct SqliteBusinessRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBusinessRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let actual_version = current_version(conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        for table in REQUIRED_TABLES {
            if !table_exists(conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }

        Ok(Self { conn })
    }

    /// Handle a caller can use to abort an in-flight statement, e.g. when its
    /// request deadline expires.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.conn.get_interrupt_handle()
    }

    fn begin(&self, op: &'static str) -> RepoResult<Transaction<'conn>> {
        Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::transaction(op))
    }
}

impl BusinessRepository for SqliteBusinessRepository<'_> {
    fn create(&self, business: &Business) -> RepoResult<()> {
        let tx = self.begin("create")?;
        let outcome = create_in_tx(&tx, business);
        finish_tx(tx, "create", outcome)
    }

    fn read_by_id(&self, id: &str) -> RepoResult<Business> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "{BUSINESS_SELECT_SQL}
                 WHERE businesses.public_id = ?1
                   AND businesses.deleted_at IS NULL;"
            ))
            .map_err(RepoError::query("read_by_id"))?;
        let mut rows = stmt.query([id]).map_err(RepoError::query("read_by_id"))?;
        let Some(row) = rows.next().map_err(RepoError::query("read_by_id"))? else {
            return Err(RepoError::NotFound(id.to_string()));
        };

        let business = parse_business_row(row)?;
        let mut loaded = with_categories(self.conn, vec![business])?;
        loaded
            .pop()
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    fn update_by_id(&self, id: &str, business: &Business) -> RepoResult<()> {
        let tx = self.begin("update_by_id")?;
        let outcome = update_in_tx(&tx, id, business);
        finish_tx(tx, "update_by_id", outcome)
    }

    fn delete_by_id(&self, id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE businesses
                 SET
                    deleted_at = (strftime('%s', 'now') * 1000),
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE public_id = ?1
                   AND deleted_at IS NULL;",
                [id],
            )
            .map_err(RepoError::query("delete_by_id"))?;

        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }

        Ok(())
    }

    fn search(&self, query: &SearchQuery) -> RepoResult<Vec<Business>> {
        let composed = query.compose(BUSINESS_SELECT_SQL);
        debug!(
            "event=business_search module=repo predicates={} limit={} offset={}",
            query.predicates().len(),
            composed.applied_limit,
            query.offset
        );

        let mut stmt = self
            .conn
            .prepare(&composed.sql)
            .map_err(RepoError::query("search"))?;
        let mut rows = stmt
            .query(params_from_iter(composed.values))
            .map_err(RepoError::query("search"))?;
        let mut businesses = Vec::new();
        while let Some(row) = rows.next().map_err(RepoError::query("search"))? {
            businesses.push(parse_business_row(row)?);
        }

        with_categories(self.conn, businesses)
    }
}

/// Commits on success, rolls back on failure. Rollback/commit failures are
/// reported as `TransactionFailure`.
fn finish_tx<T>(tx: Transaction<'_>, op: &'static str, outcome: RepoResult<T>) -> RepoResult<T> {
    match outcome {
        Ok(value) => {
            tx.commit().map_err(RepoError::transaction(op))?;
            Ok(value)
        }
        Err(err) => {
            tx.rollback().map_err(RepoError::transaction(op))?;
            Err(err)
        }
    }
}

fn create_in_tx(tx: &Transaction<'_>, business: &Business) -> RepoResult<()> {
    let categories = resolve_categories(tx, &business.category_aliases())?;
    let attributes = encode_list("attributes", &business.attributes)?;
    let transactions = encode_list("transactions", &business.transactions)?;
    let display_address = encode_list("loc_display_address", &business.location.display_address)?;

    tx.execute(
        "INSERT INTO businesses (
            public_id,
            alias,
            cord_latitude,
            cord_longitude,
            display_phone,
            image_url,
            open_time,
            close_time,
            loc_address1,
            loc_address2,
            loc_address3,
            loc_city,
            loc_country,
            loc_display_address,
            loc_state,
            loc_zip_code,
            name,
            phone,
            price,
            rating,
            review_count,
            transactions,
            attributes,
            url
        ) VALUES (
            :public_id,
            :alias,
            :latitude,
            :longitude,
            :display_phone,
            :image_url,
            :open_time,
            :close_time,
            :address1,
            :address2,
            :address3,
            :city,
            :country,
            :display_address,
            :state,
            :zip_code,
            :name,
            :phone,
            :price,
            :rating,
            :review_count,
            :transactions,
            :attributes,
            :url
        );",
        named_params! {
            ":public_id": business.id,
            ":alias": business.alias,
            ":latitude": business.coordinates.latitude,
            ":longitude": business.coordinates.longitude,
            ":display_phone": business.display_phone,
            ":image_url": business.image_url,
            ":open_time": time_to_db(business.open_time),
            ":close_time": time_to_db(business.close_time),
            ":address1": business.location.address1,
            ":address2": business.location.address2,
            ":address3": business.location.address3,
            ":city": business.location.city,
            ":country": business.location.country,
            ":display_address": display_address,
            ":state": business.location.state,
            ":zip_code": business.location.zip_code,
            ":name": business.name,
            ":phone": business.phone,
            ":price": business.price,
            ":rating": business.rating,
            ":review_count": business.review_count,
            ":transactions": transactions,
            ":attributes": attributes,
            ":url": business.url,
        },
    )
    .map_err(|err| RepoError::from_write("create", err, |column| conflict_value(business, column)))?;

    let business_key = tx.last_insert_rowid();
    attach_categories(tx, business_key, &categories)
}

/// Steps: replace associations, then update scalars. Any error aborts the
/// remaining steps and `finish_tx` rolls back everything done so far.
fn update_in_tx(tx: &Transaction<'_>, id: &str, business: &Business) -> RepoResult<()> {
    let business_key =
        active_business_key(tx, id)?.ok_or_else(|| RepoError::NotFound(id.to_string()))?;

    let categories = resolve_categories(tx, &business.category_aliases())?;
    replace_categories(tx, business_key, &categories)?;

    let attributes = encode_list("attributes", &business.attributes)?;
    let transactions = encode_list("transactions", &business.transactions)?;
    let display_address = encode_list("loc_display_address", &business.location.display_address)?;

    // Zero-valued scalars keep the stored value; list columns are replaced.
    let changed = tx
        .execute(
            "UPDATE businesses
             SET
                alias = COALESCE(NULLIF(:alias, ''), alias),
                cord_latitude = COALESCE(NULLIF(:latitude, 0.0), cord_latitude),
                cord_longitude = COALESCE(NULLIF(:longitude, 0.0), cord_longitude),
                display_phone = COALESCE(NULLIF(:display_phone, ''), display_phone),
                image_url = COALESCE(NULLIF(:image_url, ''), image_url),
                open_time = COALESCE(NULLIF(:open_time, '00:00:00'), open_time),
                close_time = COALESCE(NULLIF(:close_time, '00:00:00'), close_time),
                loc_address1 = COALESCE(NULLIF(:address1, ''), loc_address1),
                loc_address2 = COALESCE(NULLIF(:address2, ''), loc_address2),
                loc_address3 = COALESCE(NULLIF(:address3, ''), loc_address3),
                loc_city = COALESCE(NULLIF(:city, ''), loc_city),
                loc_country = COALESCE(NULLIF(:country, ''), loc_country),
                loc_display_address = COALESCE(NULLIF(:display_address, '[]'), loc_display_address),
                loc_state = COALESCE(NULLIF(:state, ''), loc_state),
                loc_zip_code = COALESCE(NULLIF(:zip_code, ''), loc_zip_code),
                name = COALESCE(NULLIF(:name, ''), name),
                phone = COALESCE(NULLIF(:phone, ''), phone),
                price = COALESCE(NULLIF(:price, ''), price),
                rating = COALESCE(NULLIF(:rating, 0), rating),
                review_count = COALESCE(NULLIF(:review_count, 0), review_count),
                transactions = :transactions,
                attributes = :attributes,
                url = COALESCE(NULLIF(:url, ''), url),
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = :business_key;",
            named_params! {
                ":alias": business.alias,
                ":latitude": business.coordinates.latitude,
                ":longitude": business.coordinates.longitude,
                ":display_phone": business.display_phone,
                ":image_url": business.image_url,
                ":open_time": time_to_db(business.open_time),
                ":close_time": time_to_db(business.close_time),
                ":address1": business.location.address1,
                ":address2": business.location.address2,
                ":address3": business.location.address3,
                ":city": business.location.city,
                ":country": business.location.country,
                ":display_address": display_address,
                ":state": business.location.state,
                ":zip_code": business.location.zip_code,
                ":name": business.name,
                ":phone": business.phone,
                ":price": business.price,
                ":rating": business.rating,
                ":review_count": business.review_count,
                ":transactions": transactions,
                ":attributes": attributes,
                ":url": business.url,
                ":business_key": business_key,
            },
        )
        .map_err(|err| {
            RepoError::from_write("update_by_id", err, |column| conflict_value(business, column))
        })?;

    if changed == 0 {
        return Err(RepoError::NotFound(id.to_string()));
    }

    Ok(())
}

fn active_business_key(conn: &Connection, id: &str) -> RepoResult<Option<i64>> {
    conn.query_row(
        "SELECT id FROM businesses WHERE public_id = ?1 AND deleted_at IS NULL;",
        [id],
        |row| row.get(0),
    )
    .optional()
    .map_err(RepoError::query("lookup_business"))
}

/// Populates categories with one batched query and computes `is_open`.
fn with_categories(conn: &Connection, mut businesses: Vec<Business>) -> RepoResult<Vec<Business>> {
    let keys: Vec<i64> = businesses.iter().filter_map(|b| b.key).collect();
    let mut linked = load_categories_for(conn, &keys)?;
    let now = OpenAt::Now.time_of_day();

    for business in &mut businesses {
        if let Some(key) = business.key {
            business.categories = linked.remove(&key).unwrap_or_default();
        }
        business.is_open = business.is_open_at(now);
    }

    Ok(businesses)
}

fn parse_business_row(row: &Row<'_>) -> RepoResult<Business> {
    Ok(Business {
        key: Some(column(row, "business_key")?),
        alias: column(row, "alias")?,
        categories: Vec::new(),
        coordinates: Coordinates {
            latitude: column(row, "cord_latitude")?,
            longitude: column(row, "cord_longitude")?,
        },
        display_phone: column(row, "display_phone")?,
        distance: 0.0,
        id: column(row, "public_id")?,
        image_url: column(row, "image_url")?,
        open_time: parse_time(&column::<String>(row, "open_time")?, "open_time")?,
        close_time: parse_time(&column::<String>(row, "close_time")?, "close_time")?,
        is_open: false,
        location: Location {
            address1: column(row, "loc_address1")?,
            address2: column(row, "loc_address2")?,
            address3: column(row, "loc_address3")?,
            city: column(row, "loc_city")?,
            country: column(row, "loc_country")?,
            display_address: decode_list(row, "loc_display_address")?,
            state: column(row, "loc_state")?,
            zip_code: column(row, "loc_zip_code")?,
        },
        name: column(row, "name")?,
        phone: column(row, "phone")?,
        price: column(row, "price")?,
        rating: column(row, "rating")?,
        review_count: column(row, "review_count")?,
        transactions: decode_list(row, "transactions")?,
        attributes: decode_list(row, "attributes")?,
        url: column(row, "url")?,
        created_at: Some(column(row, "created_at")?),
        updated_at: Some(column(row, "updated_at")?),
    })
}

fn column<T: rusqlite::types::FromSql>(row: &Row<'_>, name: &str) -> RepoResult<T> {
    row.get(name).map_err(RepoError::query("read_row"))
}

fn decode_list(row: &Row<'_>, name: &'static str) -> RepoResult<Vec<String>> {
    let text: String = column(row, name)?;
    string_list::decode(&text).map_err(|err| {
        RepoError::InvalidData(format!("invalid list value `{text}` in businesses.{name}: {err}"))
    })
}

fn encode_list(name: &'static str, values: &[String]) -> RepoResult<String> {
    string_list::encode(values)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode businesses.{name}: {err}")))
}

fn time_to_db(time: NaiveTime) -> String {
    time.format(TIME_OF_DAY_FORMAT).to_string()
}

fn parse_time(text: &str, name: &'static str) -> RepoResult<NaiveTime> {
    NaiveTime::parse_from_str(text, TIME_OF_DAY_FORMAT).map_err(|_| {
        RepoError::InvalidData(format!("invalid time value `{text}` in businesses.{name}"))
    })
}

fn conflict_value(business: &Business, column: &str) -> Option<String> {
    match column {
        "public_id" => Some(business.id.clone()),
        "alias" => Some(business.alias.clone()),
        _ => None,
    }
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )
        .map_err(RepoError::query("table_exists"))?;
    Ok(exists == 1)
}
