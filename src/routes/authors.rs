use std::collections::HashMap;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::auth::require_admin;
use crate::errors::AppError;
use crate::routes::{page_offset, timeout_query, MessageResponse, Pagination, PaginationParams};
use crate::views::AuthorView;
use crate::InnerState;

const QUERY_TIMEOUT: Duration = Duration::from_millis(10_000);

#[derive(Debug, Clone, FromRow)]
pub struct AuthorRecord {
    pub id: i64,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub first_name: Option<String>,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthorsResponse {
    pub authors: Vec<AuthorView>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct AuthorResponse {
    pub author: AuthorView,
}

#[derive(Debug, Serialize)]
pub struct AuthorMessageResponse {
    pub message: String,
    pub author: AuthorView,
}

fn validate_author(payload: &AuthorPayload) -> Result<String, AppError> {
    let mut errors: HashMap<String, Vec<String>> = HashMap::new();

    let last_name = payload.last_name.as_deref().unwrap_or("").trim().to_string();
    if last_name.is_empty() {
        errors
            .entry("lastName".to_string())
            .or_default()
            .push("Last name is required.".to_string());
    } else if last_name.chars().count() > 255 {
        errors
            .entry("lastName".to_string())
            .or_default()
            .push("Last name must be at most 255 characters.".to_string());
    }

    if errors.is_empty() {
        Ok(last_name)
    } else {
        Err(AppError::ValidationErrors(errors))
    }
}

async fn fetch_author(db: &PgPool, id: i64) -> Result<AuthorRecord, AppError> {
    sqlx::query_as::<_, AuthorRecord>(r#"SELECT * FROM authors WHERE id = $1"#)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Author {} not found", id)))
}

#[tracing::instrument(name = "Get all authors", skip(inner))]
pub async fn all_authors(
    State(inner): State<InnerState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<AuthorsResponse>, AppError> {
    let InnerState { db, settings, .. } = inner;

    let (page, limit) = params.normalize();
    let offset = page_offset(page, limit);

    let total_items = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM authors"#).fetch_one(&db),
    )
    .await?;

    let records = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, AuthorRecord>(
            r#"SELECT * FROM authors ORDER BY id LIMIT $1 OFFSET $2"#,
        )
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&db),
    )
    .await?;

    Ok(Json(AuthorsResponse {
        authors: records.iter().map(AuthorView::from_record).collect(),
        pagination: Pagination::build(
            &settings.public_base_url,
            "/api/authors",
            page,
            limit,
            total_items,
        ),
    }))
}

#[tracing::instrument(name = "Get author detail", skip(inner))]
pub async fn detail_author(
    State(inner): State<InnerState>,
    Path(id): Path<i64>,
) -> Result<Json<AuthorResponse>, AppError> {
    let InnerState { db, .. } = inner;

    let record = fetch_author(&db, id).await?;

    Ok(Json(AuthorResponse {
        author: AuthorView::from_record(&record),
    }))
}

#[tracing::instrument(name = "Create author", skip(inner, headers, payload))]
pub async fn create_author(
    State(inner): State<InnerState>,
    headers: HeaderMap,
    Json(payload): Json<AuthorPayload>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let InnerState { db, settings, .. } = inner;

    require_admin(&headers, &settings.token_secret)?;

    let last_name = validate_author(&payload)?;

    let record = sqlx::query_as::<_, AuthorRecord>(
        r#"INSERT INTO authors (first_name, last_name) VALUES ($1, $2) RETURNING *"#,
    )
    .bind(&payload.first_name)
    .bind(&last_name)
    .fetch_one(&db)
    .await?;

    let location = format!("{}/api/authors/{}", settings.public_base_url, record.id);
    tracing::info!(author_id = record.id, "Author created");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(AuthorMessageResponse {
            message: "Author created successfully".to_string(),
            author: AuthorView::from_record(&record),
        }),
    ))
}

#[tracing::instrument(name = "Update author", skip(inner, payload))]
pub async fn update_author(
    State(inner): State<InnerState>,
    Path(id): Path<i64>,
    Json(payload): Json<AuthorPayload>,
) -> Result<Json<AuthorMessageResponse>, AppError> {
    let InnerState { db, cache, .. } = inner;

    let last_name = validate_author(&payload)?;

    let record = sqlx::query_as::<_, AuthorRecord>(
        r#"UPDATE authors SET first_name = $2, last_name = $3, updated_at = now() WHERE id = $1 RETURNING *"#,
    )
    .bind(id)
    .bind(&payload.first_name)
    .bind(&last_name)
    .fetch_optional(&db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Author {} not found", id)))?;

    // Author names are embedded in cached book payloads.
    let _ = cache.invalidate("books:*").await;

    Ok(Json(AuthorMessageResponse {
        message: "Author updated successfully".to_string(),
        author: AuthorView::from_record(&record),
    }))
}

#[tracing::instrument(name = "Delete author", skip(inner, headers))]
pub async fn delete_author(
    State(inner): State<InnerState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    let InnerState {
        db, cache, settings, ..
    } = inner;

    require_admin(&headers, &settings.token_secret)?;

    // Books referencing this author fall back to NULL via ON DELETE SET NULL.
    let deleted = sqlx::query_scalar::<_, i64>(r#"DELETE FROM authors WHERE id = $1 RETURNING id"#)
        .bind(id)
        .fetch_optional(&db)
        .await?;

    if deleted.is_none() {
        return Err(AppError::NotFound(format!("Author {} not found", id)));
    }

    let _ = cache.invalidate("books:*").await;

    tracing::info!(author_id = id, "Author deleted");

    Ok(Json(MessageResponse {
        message: "Author deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_last_name_is_rejected() {
        let payload = AuthorPayload {
            first_name: Some("Victor".to_string()),
            last_name: None,
        };
        let err = validate_author(&payload).unwrap_err();
        match err {
            AppError::ValidationErrors(errors) => {
                assert_eq!(errors["lastName"], vec!["Last name is required.".to_string()]);
            }
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn valid_last_name_is_accepted() {
        let payload = AuthorPayload {
            first_name: None,
            last_name: Some(" Hugo ".to_string()),
        };
        assert_eq!(validate_author(&payload).unwrap(), "Hugo");
    }
}
