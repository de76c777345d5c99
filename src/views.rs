//! Response shapes for the catalog payloads.
//!
//! These mirror the serialization groups of the API: a record never goes
//! straight onto the wire, it is projected into a view first. The view is
//! where the resolved API version and the caller's role decide which fields
//! and which `_links` show up.

use serde::{Deserialize, Serialize};

use crate::routes::{AuthorRecord, BookRecord};

/// Fields introduced in later API versions and the version they appeared in.
const COMMENT_SINCE: (u64, u64) = (2, 0);

/// True when `version` parses as `major.minor` and is at least `since`.
/// An absent or unparseable version never unlocks gated fields.
pub fn version_at_least(version: Option<&str>, since: (u64, u64)) -> bool {
    let Some(v) = version else { return false };
    let mut parts = v.split('.');
    let (Some(major), Some(minor)) = (parts.next(), parts.next()) else {
        return false;
    };
    match (major.parse::<u64>(), minor.parse::<u64>()) {
        (Ok(major), Ok(minor)) => (major, minor) >= since,
        _ => false,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Href {
    pub href: String,
}

impl Href {
    fn new(href: String) -> Self {
        Self { href }
    }
}

/// Hypermedia links attached to every book payload. `delete` and `create`
/// are only exposed to admins, matching the operations they may call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookLinks {
    #[serde(rename = "self")]
    pub self_link: Href,
    pub update: Href,
    pub all: Href,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Href>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create: Option<Href>,
}

impl BookLinks {
    pub fn build(base_url: &str, book_id: i64, is_admin: bool) -> Self {
        let detail = format!("{}/api/books/{}", base_url, book_id);
        Self {
            self_link: Href::new(detail.clone()),
            update: Href::new(detail.clone()),
            all: Href::new(format!("{}/api/books", base_url)),
            delete: is_admin.then(|| Href::new(detail)),
            create: is_admin.then(|| Href::new(format!("{}/api/books", base_url))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorView {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    pub last_name: String,
}

impl AuthorView {
    pub fn from_record(record: &AuthorRecord) -> Self {
        Self {
            id: record.id,
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookView {
    pub id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_text: Option<String>,
    /// Available from API version 2.0 onwards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorView>,
    #[serde(rename = "_links")]
    pub links: BookLinks,
}

impl BookView {
    pub fn from_record(
        record: &BookRecord,
        version: Option<&str>,
        is_admin: bool,
        base_url: &str,
    ) -> Self {
        let author = match (record.author_id, &record.author_last_name) {
            (Some(id), Some(last_name)) => Some(AuthorView {
                id,
                first_name: record.author_first_name.clone(),
                last_name: last_name.clone(),
            }),
            _ => None,
        };

        let comment = if version_at_least(version, COMMENT_SINCE) {
            record.comment.clone()
        } else {
            None
        };

        Self {
            id: record.id,
            title: record.title.clone(),
            cover_text: record.cover_text.clone(),
            comment,
            author,
            links: BookLinks::build(base_url, record.id, is_admin),
        }
    }
}
