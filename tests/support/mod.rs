//! Shared setup for the storage-backed integration tests.
//!
//! Every test gets its own freshly migrated database on the server named by
//! `DATABASE_URL`. Without that variable the tests print a skip marker and
//! return early, so the suite still passes on machines with no Postgres.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use foodgram_sdk::{
    jwt::SessionData,
    schema::{Id, RecipePayload, UserRole},
    ImageStore, MediaDirectory,
};
use serde_json::json;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    Pool, Postgres,
};
use tempfile::TempDir;

static NEXT_DATABASE: AtomicUsize = AtomicUsize::new(0);

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

pub struct TestDb {
    pub pool: Pool<Postgres>,
    pub images: Arc<dyn ImageStore>,
    pub media: TempDir,
}

impl TestDb {
    /// Creates and migrates a private database, or `None` when no server is configured.
    pub async fn start(test_name: &str) -> Option<Self> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("SKIP-TEST-DATABASE: {test_name} skipped, DATABASE_URL is not set");
            return None;
        };

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .unwrap_or_else(|e| panic!("Could not connect to {url}: {e}"));

        let name = format!(
            "foodgram_test_{}_{}",
            std::process::id(),
            NEXT_DATABASE.fetch_add(1, Ordering::SeqCst)
        );
        sqlx::query(&format!("DROP DATABASE IF EXISTS {name}"))
            .execute(&admin)
            .await
            .unwrap();
        sqlx::query(&format!("CREATE DATABASE {name}"))
            .execute(&admin)
            .await
            .unwrap();
        admin.close().await;

        let options = url.parse::<PgConnectOptions>().unwrap().database(&name);
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .unwrap();
        sqlx::migrate!().run(&pool).await.unwrap();

        let media = tempfile::tempdir().unwrap();
        let images: Arc<dyn ImageStore> = Arc::new(MediaDirectory::new(media.path()));

        Some(Self {
            pool,
            images,
            media,
        })
    }

    pub async fn user(&self, username: &str) -> SessionData {
        let (user_id,): (Id,) = sqlx::query_as(
            "INSERT INTO users (email, username, first_name, last_name) VALUES ($1, $2, $3, 'Tester') RETURNING id",
        )
        .bind(format!("{username}@example.com"))
        .bind(username)
        .bind(username.to_uppercase())
        .fetch_one(&self.pool)
        .await
        .unwrap();

        SessionData {
            user_id,
            username: username.to_owned(),
            role: UserRole::User,
        }
    }

    pub async fn ingredient(&self, name: &str, unit: &str) -> Id {
        let (id,): (Id,) = sqlx::query_as(
            "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(unit)
        .fetch_one(&self.pool)
        .await
        .unwrap();

        id
    }

    pub async fn tag(&self, slug: &str, color: &str) -> Id {
        let (id,): (Id,) =
            sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING id")
                .bind(slug.to_uppercase())
                .bind(color)
                .bind(slug)
                .fetch_one(&self.pool)
                .await
                .unwrap();

        id
    }

    pub async fn count(&self, table: &str) -> i64 {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .unwrap();

        count
    }

    pub fn stored_images(&self) -> usize {
        std::fs::read_dir(self.media.path().join("recipes"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

fn png_data_uri() -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(PNG_BYTES))
}

/// A complete write payload; `ingredients` are (id, amount) pairs.
pub fn recipe_payload(name: &str, tags: &[Id], ingredients: &[(Id, i64)]) -> RecipePayload {
    serde_json::from_value(json!({
        "name": name,
        "text": "Mix everything and bake.",
        "cooking_time": 25,
        "image": png_data_uri(),
        "tags": tags,
        "ingredients": ingredients
            .iter()
            .map(|(id, amount)| json!({ "id": id, "amount": amount }))
            .collect::<Vec<_>>(),
    }))
    .unwrap()
}
