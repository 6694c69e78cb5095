#![cfg(feature = "sqlite")]

use chrono::{Local, NaiveDate};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Row;

use keyforge::errors::{LicenseError, LicenseResult};
use keyforge::store::{LicenseStore, NewLicense, SortOrder};

/// Helper: in-memory SQLite store. One connection, so every query sees the
/// same database.
async fn setup_in_memory_store() -> LicenseResult<LicenseStore> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .map_err(|e| LicenseError::DatabaseError(format!("db connect failed: {e}")))?;

    let store = LicenseStore::from_pool(pool);
    store.init().await?;
    Ok(store)
}

fn new_license(client: &str, product: &str, hwid: &str) -> NewLicense {
    NewLicense {
        client_name: client.to_string(),
        product: product.to_string(),
        license_key: format!("KEY-{client}-{hwid}"),
        expiry_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        max_users: 5,
        hwid: hwid.to_string(),
    }
}

#[tokio::test]
async fn save_license_returns_stored_row() -> LicenseResult<()> {
    let store = setup_in_memory_store().await?;

    let record = store
        .save_license(new_license("Acme", "ChronoTime", "HWID_001"))
        .await?;

    assert_eq!(record.client_name, "Acme");
    assert_eq!(record.product, "ChronoTime");
    assert_eq!(record.expiry_date, "2026-03-01");
    assert_eq!(record.max_users, 5);
    assert_eq!(record.hwid, "HWID_001");
    assert_eq!(
        record.date_generated,
        Local::now().date_naive().to_string()
    );

    let fetched = store.get(record.id).await?;
    assert_eq!(fetched, Some(record));
    Ok(())
}

#[tokio::test]
async fn get_unknown_id_returns_none() -> LicenseResult<()> {
    let store = setup_in_memory_store().await?;
    assert!(store.get(999).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn fetch_all_respects_sort_order() -> LicenseResult<()> {
    let store = setup_in_memory_store().await?;
    let first = store.save_license(new_license("A", "P", "H1")).await?;
    let second = store.save_license(new_license("B", "P", "H2")).await?;
    let third = store.save_license(new_license("C", "P", "H3")).await?;

    let desc: Vec<i64> = store
        .fetch_all(SortOrder::Desc)
        .await?
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(desc, vec![third.id, second.id, first.id]);

    let asc: Vec<i64> = store
        .fetch_all(SortOrder::Asc)
        .await?
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(asc, vec![first.id, second.id, third.id]);
    Ok(())
}

#[tokio::test]
async fn search_matches_any_text_column() -> LicenseResult<()> {
    let store = setup_in_memory_store().await?;
    store
        .save_license(new_license("Acme Corp", "ChronoTime", "HWID_001"))
        .await?;
    store
        .save_license(new_license("Globex", "Ledger", "72318E764B4D4508"))
        .await?;

    // client name, case-insensitive
    assert_eq!(store.search("acme").await?.len(), 1);
    // product
    assert_eq!(store.search("ledger").await?[0].client_name, "Globex");
    // hwid
    assert_eq!(store.search("7231").await?.len(), 1);
    // license key
    assert_eq!(store.search("KEY-Globex").await?.len(), 1);
    // no match
    assert!(store.search("initech").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn search_treats_wildcards_literally() -> LicenseResult<()> {
    let store = setup_in_memory_store().await?;
    store.save_license(new_license("A", "P", "HWID_001")).await?;
    store.save_license(new_license("B", "P", "HWIDX001")).await?;

    let hits = store.search("HWID_").await?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].hwid, "HWID_001");
    Ok(())
}

#[tokio::test]
async fn blank_search_returns_everything_newest_first() -> LicenseResult<()> {
    let store = setup_in_memory_store().await?;
    store.save_license(new_license("A", "P", "H1")).await?;
    let newest = store.save_license(new_license("B", "P", "H2")).await?;

    let all = store.search("   ").await?;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, newest.id);
    Ok(())
}

#[tokio::test]
async fn init_is_idempotent() -> LicenseResult<()> {
    let store = setup_in_memory_store().await?;
    store.save_license(new_license("A", "P", "H1")).await?;

    store.init().await?;
    store.init().await?;

    assert_eq!(store.fetch_all(SortOrder::Desc).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn init_adds_missing_columns_to_legacy_table() -> LicenseResult<()> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .map_err(|e| LicenseError::DatabaseError(e.to_string()))?;

    // Older layout without max_users / date_generated
    sqlx::query(
        r#"
        CREATE TABLE licenses (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            client_name TEXT,
            product     TEXT,
            license_key TEXT,
            expiry_date TEXT,
            hwid        TEXT
        );
        "#,
    )
    .execute(&pool)
    .await
    .map_err(|e| LicenseError::DatabaseError(e.to_string()))?;

    sqlx::query(
        "INSERT INTO licenses (client_name, product, license_key, expiry_date, hwid) \
         VALUES ('Old Co', 'Legacy', 'OLDKEY', '2024-01-01', 'HWID_OLD')",
    )
    .execute(&pool)
    .await
    .map_err(|e| LicenseError::DatabaseError(e.to_string()))?;

    let store = LicenseStore::from_pool(pool);
    store.init().await?;

    let columns: Vec<String> = sqlx::query("PRAGMA table_info(licenses)")
        .fetch_all(store.pool())
        .await
        .map_err(|e| LicenseError::DatabaseError(e.to_string()))?
        .iter()
        .map(|row| row.get::<String, _>("name"))
        .collect();
    assert!(columns.contains(&"max_users".to_string()));
    assert!(columns.contains(&"date_generated".to_string()));

    // Legacy row loads with defaults for the new columns
    let rows = store.fetch_all(SortOrder::Asc).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].client_name, "Old Co");
    assert_eq!(rows[0].max_users, 0);
    assert_eq!(rows[0].date_generated, "");

    // And new rows can be written alongside it
    store.save_license(new_license("New Co", "P", "H1")).await?;
    assert_eq!(store.fetch_all(SortOrder::Asc).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn connect_creates_database_file() -> LicenseResult<()> {
    let path = std::env::temp_dir().join(format!("keyforge_{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}", path.display());

    {
        let store = LicenseStore::connect(&url).await?;
        store.init().await?;
        store.save_license(new_license("A", "P", "H1")).await?;
        store.pool().close().await;
    }

    assert!(path.exists());

    let reopened = LicenseStore::connect(&url).await?;
    assert_eq!(reopened.fetch_all(SortOrder::Desc).await?.len(), 1);
    reopened.pool().close().await;

    let _ = std::fs::remove_file(&path);
    Ok(())
}

#[tokio::test]
async fn save_licenses_returns_rows_in_input_order() -> LicenseResult<()> {
    let store = setup_in_memory_store().await?;
    let saved = store
        .save_licenses(&[
            new_license("A", "P", "H1"),
            new_license("B", "P", "H2"),
            new_license("C", "P", "H3"),
        ])
        .await?;

    let hwids: Vec<&str> = saved.iter().map(|r| r.hwid.as_str()).collect();
    assert_eq!(hwids, ["H1", "H2", "H3"]);
    assert!(saved.windows(2).all(|w| w[0].id < w[1].id));

    assert!(store.save_licenses(&[]).await?.is_empty());
    Ok(())
}
