//! SQLite ledger of issued licenses.
//!
//! One flat `licenses` table; every issue or renewal appends a row. Older
//! databases missing a column are upgraded in place by [`LicenseStore::init`].

use std::str::FromStr;

use chrono::{Local, NaiveDate};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{query, query_as, FromRow, Row, Sqlite};
use tracing::{debug, error, info};

use crate::errors::{LicenseError, LicenseResult};

/// Columns every ledger table must have, beyond `id`.
const EXPECTED_COLUMNS: &[(&str, &str)] = &[
    ("client_name", "TEXT"),
    ("product", "TEXT"),
    ("license_key", "TEXT"),
    ("expiry_date", "TEXT"),
    ("max_users", "INTEGER"),
    ("hwid", "TEXT"),
    ("date_generated", "TEXT"),
];

// NULLs (from columns added by migration) read back as '' / 0.
const SELECT_COLUMNS: &str = "id, \
     COALESCE(client_name, '') AS client_name, \
     COALESCE(product, '') AS product, \
     COALESCE(license_key, '') AS license_key, \
     COALESCE(expiry_date, '') AS expiry_date, \
     COALESCE(max_users, 0) AS max_users, \
     COALESCE(hwid, '') AS hwid, \
     COALESCE(date_generated, '') AS date_generated";

/// A stored license row.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct LicenseRecord {
    pub id: i64,
    pub client_name: String,
    pub product: String,
    pub license_key: String,
    /// `YYYY-MM-DD`, kept as text so legacy rows always load
    pub expiry_date: String,
    pub max_users: u32,
    pub hwid: String,
    pub date_generated: String,
}

/// Fields for a new ledger row. `date_generated` is filled in on save.
#[derive(Debug, Clone)]
pub struct NewLicense {
    pub client_name: String,
    pub product: String,
    pub license_key: String,
    pub expiry_date: NaiveDate,
    pub max_users: u32,
    pub hwid: String,
}

/// Row order by id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    /// Newest first
    #[default]
    Desc,
}

impl SortOrder {
    fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

fn insert_license<'q>(
    license: &'q NewLicense,
    date_generated: &'q str,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query(
        r#"
        INSERT INTO licenses (
            client_name,
            product,
            license_key,
            expiry_date,
            max_users,
            hwid,
            date_generated
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&license.client_name)
    .bind(&license.product)
    .bind(&license.license_key)
    .bind(license.expiry_date.to_string())
    .bind(license.max_users)
    .bind(&license.hwid)
    .bind(date_generated)
}

fn db_error(op: &str, e: sqlx::Error) -> LicenseError {
    error!("SQLite {op} failed: {e}");
    LicenseError::DatabaseError(format!("{op}: {e}"))
}

/// Escape LIKE wildcards so a search term matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[derive(Debug, Clone)]
pub struct LicenseStore {
    pool: SqlitePool,
}

impl LicenseStore {
    /// Connect to a SQLite database, creating the file if needed.
    ///
    /// Does not create the table; call [`LicenseStore::init`].
    pub async fn connect(url: &str) -> LicenseResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| LicenseError::ConfigError(format!("invalid sqlite url '{url}': {e}")))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| db_error("connect", e))?;

        Ok(Self { pool })
    }

    /// Connect using `database.sqlite_url` and initialize the schema.
    pub async fn from_config(config: &crate::config::DatabaseConfig) -> LicenseResult<Self> {
        let store = Self::connect(&config.sqlite_url).await?;
        store.init().await?;
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the `licenses` table if missing and add any missing columns.
    ///
    /// Safe to call on every start.
    pub async fn init(&self) -> LicenseResult<()> {
        query(
            r#"
            CREATE TABLE IF NOT EXISTS licenses (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                client_name     TEXT,
                product         TEXT,
                license_key     TEXT,
                expiry_date     TEXT,
                max_users       INTEGER,
                hwid            TEXT,
                date_generated  TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("create table", e))?;

        let existing: Vec<String> = query("PRAGMA table_info(licenses)")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("table_info", e))?
            .iter()
            .map(|row| row.try_get::<String, _>("name"))
            .collect::<Result<_, _>>()
            .map_err(|e| db_error("table_info", e))?;

        for (column, column_type) in EXPECTED_COLUMNS {
            if !existing.iter().any(|c| c == column) {
                info!("Adding missing column licenses.{column}");
                query(&format!(
                    "ALTER TABLE licenses ADD COLUMN {column} {column_type}"
                ))
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("add column", e))?;
            }
        }

        debug!("License ledger ready");
        Ok(())
    }

    /// Append a license row, stamped with today's date, and return it.
    pub async fn save_license(&self, license: NewLicense) -> LicenseResult<LicenseRecord> {
        self.save_licenses(std::slice::from_ref(&license))
            .await?
            .pop()
            .ok_or_else(|| LicenseError::NotFound("license vanished after insert".to_string()))
    }

    /// Append several rows in one transaction. Either every row is stored or
    /// none is. Returns the stored rows in input order.
    pub async fn save_licenses(&self, licenses: &[NewLicense]) -> LicenseResult<Vec<LicenseRecord>> {
        let today = Local::now().date_naive().to_string();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        let mut ids = Vec::with_capacity(licenses.len());
        for license in licenses {
            let id = insert_license(license, &today)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("insert license", e))?
                .last_insert_rowid();
            ids.push(id);
        }

        tx.commit()
            .await
            .map_err(|e| db_error("commit transaction", e))?;

        let mut saved = Vec::with_capacity(ids.len());
        for id in ids {
            let record = self
                .get(id)
                .await?
                .ok_or_else(|| LicenseError::NotFound(format!("license {id} vanished after insert")))?;
            saved.push(record);
        }
        Ok(saved)
    }

    /// Fetch a license by id.
    pub async fn get(&self, id: i64) -> LicenseResult<Option<LicenseRecord>> {
        query_as::<_, LicenseRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM licenses WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get license", e))
    }

    /// All licenses ordered by id.
    pub async fn fetch_all(&self, order: SortOrder) -> LicenseResult<Vec<LicenseRecord>> {
        query_as::<_, LicenseRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM licenses ORDER BY id {}",
            order.as_sql()
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("fetch licenses", e))
    }

    /// Substring search over client, product, hwid and key, newest first.
    ///
    /// A blank term returns everything.
    pub async fn search(&self, term: &str) -> LicenseResult<Vec<LicenseRecord>> {
        let term = term.trim();
        if term.is_empty() {
            return self.fetch_all(SortOrder::Desc).await;
        }

        let pattern = like_pattern(term);
        query_as::<_, LicenseRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM licenses \
             WHERE client_name LIKE ? ESCAPE '\\' \
                OR product LIKE ? ESCAPE '\\' \
                OR hwid LIKE ? ESCAPE '\\' \
                OR license_key LIKE ? ESCAPE '\\' \
             ORDER BY id DESC"
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("search licenses", e))
    }
}
