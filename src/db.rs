use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

const CREATE_AUTHORS: &str = r#"
CREATE TABLE IF NOT EXISTS authors (
    id BIGSERIAL PRIMARY KEY,
    created_at TIMESTAMP NOT NULL DEFAULT now(),
    updated_at TIMESTAMP,
    first_name TEXT,
    last_name TEXT NOT NULL
)
"#;

const CREATE_BOOKS: &str = r#"
CREATE TABLE IF NOT EXISTS books (
    id BIGSERIAL PRIMARY KEY,
    created_at TIMESTAMP NOT NULL DEFAULT now(),
    updated_at TIMESTAMP,
    title TEXT NOT NULL,
    cover_text TEXT,
    comment TEXT,
    author_id BIGINT REFERENCES authors(id) ON DELETE SET NULL
)
"#;

pub async fn init_db(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("Failed to connect to Postgres")?;

    sqlx::query(CREATE_AUTHORS)
        .execute(&pool)
        .await
        .context("Failed to ensure authors table")?;
    sqlx::query(CREATE_BOOKS)
        .execute(&pool)
        .await
        .context("Failed to ensure books table")?;

    tracing::info!("Database schema ready");

    Ok(pool)
}
