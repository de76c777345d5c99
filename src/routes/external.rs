use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;

use crate::errors::AppError;
use crate::InnerState;

const SYMFONY_DOCS_REPO_URL: &str = "https://api.github.com/repos/symfony/symfony-docs";

/// Proxies the GitHub metadata of the Symfony documentation repository,
/// relaying the upstream status code along with the JSON body.
#[tracing::instrument(name = "Fetch Symfony docs repository", skip(inner))]
pub async fn get_sf_doc(
    State(inner): State<InnerState>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let InnerState { http_client, .. } = inner;

    let response = http_client
        .get(SYMFONY_DOCS_REPO_URL)
        .header("User-Agent", "api-bookshelf")
        .header("Accept", "application/vnd.github+json")
        .send()
        .await?;

    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await?;

    tracing::debug!(%status, "Upstream GitHub response relayed");

    Ok((status, Json(body)))
}
