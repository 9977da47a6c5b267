//! The tabular warehouse the enriched rows land in.
//!
//! Mirrors the shape of a cloud warehouse's streaming insert: a batch of
//! rows goes in, and each rejected row comes back as its own [`RowError`]
//! instead of failing the batch. [`SqliteWarehouse`] is the shipped sink,
//! pooled with r2d2 and driven through `spawn_blocking`;
//! [`MemoryWarehouse`] backs tests and can be primed to reject chosen SKUs.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde::{Deserialize, Serialize};
use skuforge_core::{Error, Product, Result};

/// Type alias for the warehouse connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// One product projected into the warehouse schema.
///
/// Collections are JSON-encoded strings so the row maps one-to-one onto
/// flat TEXT columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    pub sku: String,
    pub name: String,
    pub description: String,
    pub brand: Option<String>,
    /// Category path joined with `>>`.
    pub category_path: String,
    /// JSON object of the attribute map.
    pub attributes: String,
    /// Re-hosted primary image URL.
    pub image_url: String,
    /// JSON array of the image embedding vector.
    pub image_embedding: String,
    /// JSON array of the text embedding vector.
    pub text_embedding: String,
}

impl ProductRow {
    /// Project a fully-enriched product into its warehouse row.
    ///
    /// The caller is responsible for only projecting records that carry
    /// both embedding vectors and a hosted image; absent fields are encoded
    /// as JSON `null` / empty strings rather than rejected here.
    pub fn from_product(product: &Product) -> Result<Self> {
        let attributes = serde_json::to_string(&product.attributes)
            .map_err(|e| Error::internal(format!("attribute encoding failed: {e}")))?;
        let image_embedding = serde_json::to_string(&product.image_embedding)
            .map_err(|e| Error::internal(format!("embedding encoding failed: {e}")))?;
        let text_embedding = serde_json::to_string(&product.text_embedding)
            .map_err(|e| Error::internal(format!("embedding encoding failed: {e}")))?;

        let image_url = product
            .primary_image()
            .and_then(|image| image.hosted_url.clone())
            .unwrap_or_default();

        Ok(Self {
            sku: product.sku.clone(),
            name: product.header.name.clone(),
            description: product.header.description.clone(),
            brand: product.header.brand.clone(),
            category_path: product.header.categories.join(" >> "),
            attributes,
            image_url,
            image_embedding,
            text_embedding,
        })
    }
}

/// One rejected row from a batch insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub sku: String,
    pub reason: String,
}

/// A sink accepting batches of enriched product rows.
///
/// `insert_rows` reports per-row rejections in its `Ok` value; the outer
/// `Err` is reserved for sink-level failures (connection loss, I/O).
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Create the product table if it does not exist. Idempotent.
    async fn ensure_table(&self) -> Result<()>;

    /// Insert a batch of rows, returning one [`RowError`] per rejected row.
    async fn insert_rows(&self, rows: &[ProductRow]) -> Result<Vec<RowError>>;
}

// ---------------------------------------------------------------------------
// SQLite warehouse
// ---------------------------------------------------------------------------

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS products (
    sku             TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    description     TEXT NOT NULL,
    brand           TEXT,
    category_path   TEXT NOT NULL,
    attributes      TEXT NOT NULL,
    image_url       TEXT NOT NULL,
    image_embedding TEXT NOT NULL,
    text_embedding  TEXT NOT NULL,
    loaded_at       TEXT NOT NULL
);
";

/// SQLite-backed warehouse behind an r2d2 pool.
pub struct SqliteWarehouse {
    pool: DbPool,
}

impl SqliteWarehouse {
    /// Open (or create) the warehouse database at `path`.
    pub fn open(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(|e| Error::warehouse(format!("failed to create connection pool: {e}")))?;
        Ok(Self { pool })
    }

    /// In-memory warehouse for tests.
    ///
    /// The pool is capped at one connection: each in-memory SQLite
    /// connection is its own database, so a wider pool would split the
    /// data.
    pub fn in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| Error::warehouse(format!("failed to create in-memory pool: {e}")))?;
        Ok(Self { pool })
    }

    fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| Error::warehouse(format!("failed to get connection from pool: {e}")))
    }

    /// Number of rows in the product table.
    pub async fn count(&self) -> Result<i64> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| Error::warehouse(format!("failed to get connection: {e}")))?;
            conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
                .map_err(|e| Error::warehouse(e.to_string()))
        })
        .await
        .map_err(|e| Error::internal(format!("warehouse task panicked: {e}")))?
    }

    /// Fetch one row by SKU.
    pub async fn get(&self, sku: &str) -> Result<Option<ProductRow>> {
        let pool = self.pool.clone();
        let sku = sku.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| Error::warehouse(format!("failed to get connection: {e}")))?;
            let result = conn.query_row(
                "SELECT sku, name, description, brand, category_path, attributes,
                        image_url, image_embedding, text_embedding
                 FROM products WHERE sku = :sku",
                rusqlite::named_params! { ":sku": sku },
                parse_product_row,
            );
            match result {
                Ok(row) => Ok(Some(row)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(Error::warehouse(e.to_string())),
            }
        })
        .await
        .map_err(|e| Error::internal(format!("warehouse task panicked: {e}")))?
    }
}

fn parse_product_row(row: &rusqlite::Row) -> rusqlite::Result<ProductRow> {
    Ok(ProductRow {
        sku: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        brand: row.get(3)?,
        category_path: row.get(4)?,
        attributes: row.get(5)?,
        image_url: row.get(6)?,
        image_embedding: row.get(7)?,
        text_embedding: row.get(8)?,
    })
}

#[async_trait]
impl Warehouse for SqliteWarehouse {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn ensure_table(&self) -> Result<()> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| Error::warehouse(format!("failed to get connection: {e}")))?;
            conn.execute_batch(SCHEMA)
                .map_err(|e| Error::warehouse(format!("failed to ensure schema: {e}")))
        })
        .await
        .map_err(|e| Error::internal(format!("warehouse task panicked: {e}")))?
    }

    async fn insert_rows(&self, rows: &[ProductRow]) -> Result<Vec<RowError>> {
        // Touch the pool on the caller's thread so connection failures
        // surface as the sink-level error they are.
        drop(self.get_conn()?);

        let pool = self.pool.clone();
        let rows = rows.to_vec();
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| Error::warehouse(format!("failed to get connection: {e}")))?;

            let mut errors = Vec::new();
            for row in &rows {
                let result = conn.execute(
                    "INSERT INTO products (sku, name, description, brand, category_path,
                                           attributes, image_url, image_embedding,
                                           text_embedding, loaded_at)
                     VALUES (:sku, :name, :description, :brand, :category_path,
                             :attributes, :image_url, :image_embedding,
                             :text_embedding, :loaded_at)",
                    rusqlite::named_params! {
                        ":sku": &row.sku,
                        ":name": &row.name,
                        ":description": &row.description,
                        ":brand": &row.brand,
                        ":category_path": &row.category_path,
                        ":attributes": &row.attributes,
                        ":image_url": &row.image_url,
                        ":image_embedding": &row.image_embedding,
                        ":text_embedding": &row.text_embedding,
                        ":loaded_at": Utc::now().to_rfc3339(),
                    },
                );
                if let Err(e) = result {
                    errors.push(RowError {
                        sku: row.sku.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            Ok(errors)
        })
        .await
        .map_err(|e| Error::internal(format!("warehouse task panicked: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// In-memory warehouse
// ---------------------------------------------------------------------------

/// Vec-backed warehouse for tests.
///
/// Prime rejections with [`MemoryWarehouse::reject_sku`] to exercise the
/// per-row error path.
#[derive(Default)]
pub struct MemoryWarehouse {
    rows: Mutex<Vec<ProductRow>>,
    rejects: Mutex<HashSet<String>>,
    table_ensured: Mutex<bool>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make future inserts of `sku` fail with a row error.
    pub fn reject_sku<S: Into<String>>(&self, sku: S) {
        self.rejects.lock().insert(sku.into());
    }

    /// Rows accepted so far, in insertion order.
    pub fn rows(&self) -> Vec<ProductRow> {
        self.rows.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    /// True once `ensure_table` has been called.
    pub fn table_ensured(&self) -> bool {
        *self.table_ensured.lock()
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ensure_table(&self) -> Result<()> {
        *self.table_ensured.lock() = true;
        Ok(())
    }

    async fn insert_rows(&self, rows: &[ProductRow]) -> Result<Vec<RowError>> {
        let rejects = self.rejects.lock();
        let mut accepted = self.rows.lock();
        let mut errors = Vec::new();
        for row in rows {
            if rejects.contains(&row.sku) {
                errors.push(RowError {
                    sku: row.sku.clone(),
                    reason: "rejected by test warehouse".to_string(),
                });
            } else {
                accepted.push(row.clone());
            }
        }
        Ok(errors)
    }
}
