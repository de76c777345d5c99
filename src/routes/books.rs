use std::collections::HashMap;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::auth::{is_admin, require_admin};
use crate::errors::AppError;
use crate::routes::{page_offset, timeout_query, MessageResponse, Pagination, PaginationParams};
use crate::views::BookView;
use crate::InnerState;

const BOOKS_CACHE_TTL_SECS: u64 = 3600;
const BOOKS_CACHE_PATTERN: &str = "books:*";
const QUERY_TIMEOUT: Duration = Duration::from_millis(10_000);

const SELECT_BOOK: &str = r#"
SELECT b.id, b.created_at, b.updated_at, b.title, b.cover_text, b.comment, b.author_id,
       a.first_name AS author_first_name, a.last_name AS author_last_name
FROM books b
LEFT JOIN authors a ON a.id = b.author_id
"#;

/// A book row joined with its author, as stored.
#[derive(Debug, Clone, FromRow)]
pub struct BookRecord {
    pub id: i64,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub title: String,
    pub cover_text: Option<String>,
    pub comment: Option<String>,
    pub author_id: Option<i64>,
    pub author_first_name: Option<String>,
    pub author_last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPayload {
    pub title: Option<String>,
    pub cover_text: Option<String>,
    pub comment: Option<String>,
    pub author: Option<AuthorRef>,
}

#[derive(Debug, Deserialize)]
pub struct AuthorRef {
    pub id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BooksResponse {
    pub books: Vec<BookView>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub book: BookView,
}

#[derive(Debug, Serialize)]
pub struct BookMessageResponse {
    pub message: String,
    pub book: BookView,
}

fn validate_book(payload: &BookPayload) -> Result<String, AppError> {
    let mut errors: HashMap<String, Vec<String>> = HashMap::new();

    let title = payload.title.as_deref().unwrap_or("").trim().to_string();
    if title.is_empty() {
        errors
            .entry("title".to_string())
            .or_default()
            .push("Title is required.".to_string());
    } else if title.chars().count() > 255 {
        errors
            .entry("title".to_string())
            .or_default()
            .push("Title must be at most 255 characters.".to_string());
    }

    if errors.is_empty() {
        Ok(title)
    } else {
        Err(AppError::ValidationErrors(errors))
    }
}

async fn fetch_book(db: &PgPool, id: i64) -> Result<BookRecord, AppError> {
    sqlx::query_as::<_, BookRecord>(&format!("{} WHERE b.id = $1", SELECT_BOOK))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
}

/// Looks up the author referenced by the payload. Returns `None` when no id
/// was sent or when the id does not exist; linking never fails the request.
async fn resolve_author_id(db: &PgPool, author: Option<&AuthorRef>) -> Result<Option<i64>, AppError> {
    let Some(id) = author.and_then(|a| a.id) else {
        return Ok(None);
    };

    let found = sqlx::query_scalar::<_, i64>(r#"SELECT id FROM authors WHERE id = $1"#)
        .bind(id)
        .fetch_optional(db)
        .await?;

    Ok(found)
}

#[tracing::instrument(name = "Get all books", skip(inner, headers))]
pub async fn all_books(
    State(inner): State<InnerState>,
    headers: HeaderMap,
    Query(params): Query<PaginationParams>,
) -> Result<Json<BooksResponse>, AppError> {
    let InnerState {
        db,
        cache,
        versioning,
        settings,
        ..
    } = inner;

    let (page, limit) = params.normalize();
    let offset = page_offset(page, limit);

    let version = versioning.resolve(Some(&headers));
    let admin = is_admin(&headers, &settings.token_secret);

    let cache_key = format!(
        "books:page:{}:limit:{}:v:{}:admin:{}",
        page,
        limit,
        version.as_deref().unwrap_or("none"),
        admin
    );

    if let Ok(Some(cached)) = cache.get_json::<BooksResponse>(&cache_key).await {
        tracing::debug!(cache_key, "Books list served from cache");
        return Ok(Json(cached));
    }

    let total_items = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM books"#).fetch_one(&db),
    )
    .await?;

    let records = timeout_query(
        QUERY_TIMEOUT,
        sqlx::query_as::<_, BookRecord>(&format!(
            "{} ORDER BY b.id LIMIT $1 OFFSET $2",
            SELECT_BOOK
        ))
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&db),
    )
    .await?;

    let books = records
        .iter()
        .map(|r| BookView::from_record(r, version.as_deref(), admin, &settings.public_base_url))
        .collect();

    let response = BooksResponse {
        books,
        pagination: Pagination::build(
            &settings.public_base_url,
            "/api/books",
            page,
            limit,
            total_items,
        ),
    };

    let _ = cache
        .set_json(&cache_key, &response, BOOKS_CACHE_TTL_SECS)
        .await;

    Ok(Json(response))
}

#[tracing::instrument(name = "Get book detail", skip(inner, headers))]
pub async fn detail_book(
    State(inner): State<InnerState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<BookResponse>, AppError> {
    let InnerState {
        db,
        versioning,
        settings,
        ..
    } = inner;

    let record = fetch_book(&db, id).await?;

    let version = versioning.resolve(Some(&headers));
    let admin = is_admin(&headers, &settings.token_secret);

    Ok(Json(BookResponse {
        book: BookView::from_record(&record, version.as_deref(), admin, &settings.public_base_url),
    }))
}

#[tracing::instrument(name = "Create book", skip(inner, headers, payload))]
pub async fn create_book(
    State(inner): State<InnerState>,
    headers: HeaderMap,
    Json(payload): Json<BookPayload>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let InnerState {
        db,
        cache,
        versioning,
        settings,
        ..
    } = inner;

    require_admin(&headers, &settings.token_secret)?;

    let title = validate_book(&payload)?;
    let author_id = resolve_author_id(&db, payload.author.as_ref()).await?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"INSERT INTO books (title, cover_text, comment, author_id) VALUES ($1, $2, $3, $4) RETURNING id"#,
    )
    .bind(&title)
    .bind(&payload.cover_text)
    .bind(&payload.comment)
    .bind(author_id)
    .fetch_one(&db)
    .await?;

    let _ = cache.invalidate(BOOKS_CACHE_PATTERN).await;

    let record = fetch_book(&db, id).await?;
    let version = versioning.resolve(Some(&headers));

    let location = format!("{}/api/books/{}", settings.public_base_url, id);
    tracing::info!(book_id = id, "Book created");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(BookMessageResponse {
            message: "Book created successfully".to_string(),
            book: BookView::from_record(&record, version.as_deref(), true, &settings.public_base_url),
        }),
    ))
}

#[tracing::instrument(name = "Update book", skip(inner, headers, payload))]
pub async fn update_book(
    State(inner): State<InnerState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(payload): Json<BookPayload>,
) -> Result<Json<BookMessageResponse>, AppError> {
    let InnerState {
        db,
        cache,
        versioning,
        settings,
        ..
    } = inner;

    let title = validate_book(&payload)?;

    // Absent or unknown author ids clear the relation rather than failing.
    let author_id = resolve_author_id(&db, payload.author.as_ref()).await?;

    let updated = sqlx::query_scalar::<_, i64>(
        r#"UPDATE books SET title = $2, cover_text = $3, comment = $4, author_id = $5, updated_at = now() WHERE id = $1 RETURNING id"#,
    )
    .bind(id)
    .bind(&title)
    .bind(&payload.cover_text)
    .bind(&payload.comment)
    .bind(author_id)
    .fetch_optional(&db)
    .await?;

    if updated.is_none() {
        return Err(AppError::NotFound(format!("Book {} not found", id)));
    }

    let _ = cache.invalidate(BOOKS_CACHE_PATTERN).await;

    let record = fetch_book(&db, id).await?;
    let version = versioning.resolve(Some(&headers));
    let admin = is_admin(&headers, &settings.token_secret);

    Ok(Json(BookMessageResponse {
        message: "Book updated successfully".to_string(),
        book: BookView::from_record(&record, version.as_deref(), admin, &settings.public_base_url),
    }))
}

#[tracing::instrument(name = "Delete book", skip(inner, headers))]
pub async fn delete_book(
    State(inner): State<InnerState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    let InnerState {
        db, cache, settings, ..
    } = inner;

    require_admin(&headers, &settings.token_secret)?;

    let _ = cache.invalidate(BOOKS_CACHE_PATTERN).await;

    let deleted = sqlx::query_scalar::<_, i64>(r#"DELETE FROM books WHERE id = $1 RETURNING id"#)
        .bind(id)
        .fetch_optional(&db)
        .await?;

    if deleted.is_none() {
        return Err(AppError::NotFound(format!("Book {} not found", id)));
    }

    tracing::info!(book_id = id, "Book deleted");

    Ok(Json(MessageResponse {
        message: "Book deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(title: Option<&str>) -> BookPayload {
        BookPayload {
            title: title.map(String::from),
            cover_text: None,
            comment: None,
            author: None,
        }
    }

    #[test]
    fn missing_title_is_rejected() {
        let err = validate_book(&payload(None)).unwrap_err();
        match err {
            AppError::ValidationErrors(errors) => {
                assert_eq!(errors["title"], vec!["Title is required.".to_string()]);
            }
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn blank_title_is_rejected() {
        assert!(matches!(
            validate_book(&payload(Some("   "))),
            Err(AppError::ValidationErrors(_))
        ));
    }

    #[test]
    fn overlong_title_is_rejected() {
        let long = "x".repeat(256);
        assert!(matches!(
            validate_book(&payload(Some(&long))),
            Err(AppError::ValidationErrors(_))
        ));
    }

    #[test]
    fn valid_title_is_trimmed_and_accepted() {
        let title = validate_book(&payload(Some("  Germinal  "))).unwrap();
        assert_eq!(title, "Germinal");
    }
}
