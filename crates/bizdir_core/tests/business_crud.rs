use bizdir_core::db::open_db_in_memory;
use bizdir_core::{
    Business, BusinessRepository, Category, Coordinates, RepoError, SearchQuery,
    SqliteBusinessRepository,
};
use chrono::NaiveTime;
use rusqlite::Connection;

fn listing(id: &str, alias: &str, categories: &[&str]) -> Business {
    let mut business = Business::new(alias);
    business.id = id.to_string();
    business.name = format!("{alias} name");
    business.price = "$$".to_string();
    business.rating = 4;
    business.categories = categories.iter().map(|c| Category::with_alias(*c)).collect();
    business
}

fn aliases(business: &Business) -> Vec<String> {
    business
        .categories
        .iter()
        .map(|category| category.alias.clone())
        .collect()
}

fn link_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM business_categories;", [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn create_then_read_round_trips_all_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBusinessRepository::try_new(&conn).unwrap();

    let mut business = listing("id-1", "cafe1", &["fnb", "office"]);
    business.coordinates = Coordinates {
        latitude: -6.2,
        longitude: 106.8,
    };
    business.open_time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
    business.close_time = NaiveTime::from_hms_opt(17, 30, 0).unwrap();
    business.location.city = "Jakarta".to_string();
    business.location.display_address = vec!["Jl. Sudirman 1".to_string(), "Jakarta".to_string()];
    business.transactions = vec!["pickup".to_string(), "delivery".to_string()];
    business.attributes = vec!["wifi".to_string(), "parking".to_string()];
    repo.create(&business).unwrap();

    let loaded = repo.read_by_id("id-1").unwrap();
    assert_eq!(loaded.id, "id-1");
    assert_eq!(loaded.alias, "cafe1");
    assert_eq!(loaded.name, "cafe1 name");
    assert_eq!(loaded.coordinates, business.coordinates);
    assert_eq!(loaded.open_time, business.open_time);
    assert_eq!(loaded.close_time, business.close_time);
    assert_eq!(loaded.location, business.location);
    assert_eq!(loaded.transactions, vec!["pickup", "delivery"]);
    assert_eq!(loaded.attributes, vec!["wifi", "parking"]);
    assert_eq!(aliases(&loaded), vec!["fnb", "office"]);
    assert!(loaded.key.is_some());
    assert!(loaded.created_at.is_some());
}

#[test]
fn create_drops_unknown_category_aliases() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBusinessRepository::try_new(&conn).unwrap();

    repo.create(&listing("id-1", "cafe1", &["fnb", "ghost", "fnb"]))
        .unwrap();

    let loaded = repo.read_by_id("id-1").unwrap();
    assert_eq!(aliases(&loaded), vec!["fnb"]);
    assert_eq!(link_count(&conn), 1);
}

#[test]
fn create_reports_conflict_on_duplicate_alias_and_public_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBusinessRepository::try_new(&conn).unwrap();
    repo.create(&listing("id-1", "cafe1", &["fnb"])).unwrap();

    match repo.create(&listing("id-2", "cafe1", &["office"])) {
        Err(RepoError::Conflict { field, value }) => {
            assert_eq!(field, "alias");
            assert_eq!(value, "cafe1");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    match repo.create(&listing("id-1", "cafe2", &[])) {
        Err(RepoError::Conflict { field, value }) => {
            assert_eq!(field, "id");
            assert_eq!(value, "id-1");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    // Failed creates leave no rows or links behind.
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM businesses;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(link_count(&conn), 1);
}

#[test]
fn read_missing_business_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBusinessRepository::try_new(&conn).unwrap();

    assert!(matches!(
        repo.read_by_id("missing"),
        Err(RepoError::NotFound(id)) if id == "missing"
    ));
}

#[test]
fn update_replaces_categories_and_keeps_zero_valued_scalars() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBusinessRepository::try_new(&conn).unwrap();
    let mut original = listing("id-1", "cafe1", &["fnb", "office"]);
    original.phone = "+62-21-555".to_string();
    original.attributes = vec!["wifi".to_string()];
    repo.create(&original).unwrap();

    let mut patch = Business::new("");
    patch.name = "Cafe One".to_string();
    patch.categories = vec![Category::with_alias("factory"), Category::with_alias("fnb")];
    patch.attributes = vec!["parking".to_string()];
    repo.update_by_id("id-1", &patch).unwrap();

    let loaded = repo.read_by_id("id-1").unwrap();
    assert_eq!(loaded.id, "id-1");
    assert_eq!(loaded.alias, "cafe1");
    assert_eq!(loaded.name, "Cafe One");
    assert_eq!(loaded.phone, "+62-21-555");
    assert_eq!(loaded.price, "$$");
    assert_eq!(loaded.rating, 4);
    assert_eq!(loaded.attributes, vec!["parking"]);
    assert_eq!(aliases(&loaded), vec!["factory", "fnb"]);
}

#[test]
fn repeating_an_update_leaves_the_same_state() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBusinessRepository::try_new(&conn).unwrap();
    repo.create(&listing("id-1", "cafe1", &["fnb"])).unwrap();

    let patch = listing("", "cafe1", &["office", "fnb"]);
    repo.update_by_id("id-1", &patch).unwrap();
    let first = repo.read_by_id("id-1").unwrap();
    repo.update_by_id("id-1", &patch).unwrap();
    let second = repo.read_by_id("id-1").unwrap();

    assert_eq!(aliases(&first), aliases(&second));
    assert_eq!(first.alias, second.alias);
    assert_eq!(first.name, second.name);
    assert_eq!(first.price, second.price);
    assert_eq!(link_count(&conn), 2);
}

#[test]
fn update_with_empty_categories_clears_links() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBusinessRepository::try_new(&conn).unwrap();
    repo.create(&listing("id-1", "cafe1", &["fnb"])).unwrap();

    repo.update_by_id("id-1", &listing("ignored", "cafe1", &[]))
        .unwrap();

    let loaded = repo.read_by_id("id-1").unwrap();
    assert!(loaded.categories.is_empty());
    assert_eq!(link_count(&conn), 0);
}

#[test]
fn update_never_changes_public_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBusinessRepository::try_new(&conn).unwrap();
    repo.create(&listing("id-1", "cafe1", &[])).unwrap();

    repo.update_by_id("id-1", &listing("id-other", "cafe9", &[]))
        .unwrap();

    assert_eq!(repo.read_by_id("id-1").unwrap().alias, "cafe9");
    assert!(matches!(
        repo.read_by_id("id-other"),
        Err(RepoError::NotFound(_))
    ));
}

#[test]
fn failed_update_rolls_back_category_replacement() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBusinessRepository::try_new(&conn).unwrap();
    repo.create(&listing("id-a", "cafe-a", &["fnb"])).unwrap();
    repo.create(&listing("id-b", "cafe-b", &["fnb"])).unwrap();

    // Category replacement runs before the alias collision is detected.
    let colliding = listing("ignored", "cafe-a", &["office"]);
    assert!(matches!(
        repo.update_by_id("id-b", &colliding),
        Err(RepoError::Conflict { ref field, .. }) if field == "alias"
    ));

    let b = repo.read_by_id("id-b").unwrap();
    assert_eq!(b.alias, "cafe-b");
    assert_eq!(aliases(&b), vec!["fnb"]);
    assert_eq!(link_count(&conn), 2);
}

#[test]
fn update_missing_business_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBusinessRepository::try_new(&conn).unwrap();

    assert!(matches!(
        repo.update_by_id("missing", &listing("", "cafe1", &["fnb"])),
        Err(RepoError::NotFound(_))
    ));
    assert_eq!(link_count(&conn), 0);
}

#[test]
fn delete_hides_business_and_second_delete_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBusinessRepository::try_new(&conn).unwrap();
    repo.create(&listing("id-1", "cafe1", &["fnb"])).unwrap();

    repo.delete_by_id("id-1").unwrap();

    assert!(matches!(
        repo.read_by_id("id-1"),
        Err(RepoError::NotFound(_))
    ));
    assert!(matches!(
        repo.delete_by_id("id-1"),
        Err(RepoError::NotFound(_))
    ));
    assert!(matches!(
        repo.update_by_id("id-1", &listing("", "cafe1", &[])),
        Err(RepoError::NotFound(_))
    ));

    // Soft delete keeps the row as a tombstone.
    let deleted_at: Option<i64> = conn
        .query_row(
            "SELECT deleted_at FROM businesses WHERE public_id = 'id-1';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(deleted_at.is_some());
}

#[test]
fn blank_list_column_is_rejected_on_read_and_search_alike() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBusinessRepository::try_new(&conn).unwrap();
    repo.create(&listing("id-1", "cafe1", &[])).unwrap();
    conn.execute(
        "UPDATE businesses SET attributes = '' WHERE public_id = 'id-1';",
        [],
    )
    .unwrap();

    assert!(matches!(
        repo.read_by_id("id-1"),
        Err(RepoError::InvalidData(_))
    ));
    assert!(repo
        .search(&SearchQuery {
            attributes: vec!["wifi".to_string()],
            ..SearchQuery::default()
        })
        .is_err());
}
