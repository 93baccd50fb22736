//! Listing persistence on Postgres.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgPool;
use tracing::info;

/// A persisted listing.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Listing {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: Option<f64>,
    pub neighborhood: String,
    pub street: String,
    pub room_count: String,
    pub area: Option<f64>,
    pub drive_link: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for a listing about to be persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub price: Option<f64>,
    pub neighborhood: String,
    pub street: String,
    pub room_count: String,
    pub area: Option<f64>,
    pub drive_link: String,
}

/// Contract for the listing store.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Persist a new listing and return the stored record.
    async fn create(&self, listing: NewListing) -> Result<Listing>;

    /// All persisted listings, newest first.
    async fn list_all(&self) -> Result<Vec<Listing>>;

    /// Delete the listing matching `title` exactly. Reports the outcome
    /// instead of erroring so the deletion orchestrator can aggregate it with
    /// the storage side.
    async fn delete_by_title(&self, title: &str) -> (bool, String);
}

/// Initialize the database schema.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS listings (
            id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            price DOUBLE PRECISION,
            neighborhood TEXT NOT NULL DEFAULT '',
            street TEXT NOT NULL DEFAULT '',
            room_count TEXT NOT NULL DEFAULT '',
            area DOUBLE PRECISION,
            drive_link TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create listings table")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// Postgres-backed listing store.
pub struct PgListingStore {
    pool: PgPool,
}

impl PgListingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListingStore for PgListingStore {
    async fn create(&self, listing: NewListing) -> Result<Listing> {
        info!(title = %listing.title, "Creating new listing");

        let stored = sqlx::query_as::<_, Listing>(
            "INSERT INTO listings
                (title, description, price, neighborhood, street, room_count, area, drive_link)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id, title, description, price, neighborhood, street, room_count, area,
                       drive_link, created_at",
        )
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(listing.price)
        .bind(&listing.neighborhood)
        .bind(&listing.street)
        .bind(&listing.room_count)
        .bind(listing.area)
        .bind(&listing.drive_link)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert new listing")?;

        info!(id = stored.id, "Listing created");
        Ok(stored)
    }

    async fn list_all(&self) -> Result<Vec<Listing>> {
        sqlx::query_as::<_, Listing>(
            "SELECT id, title, description, price, neighborhood, street, room_count, area,
                    drive_link, created_at
             FROM listings
             ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch listings")
    }

    async fn delete_by_title(&self, title: &str) -> (bool, String) {
        let result = sqlx::query("DELETE FROM listings WHERE title = $1")
            .bind(title)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) if done.rows_affected() > 0 => {
                info!(title = %title, "Listing deleted");
                (true, "deleted".to_string())
            }
            Ok(_) => (false, format!("no listing found with title '{title}'")),
            Err(e) => (false, format!("delete query failed: {e}")),
        }
    }
}
