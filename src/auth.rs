use axum::http::{header, HeaderMap};
use cookie::Cookie;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: usize,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Extracts the JWT from either the `Authorization` header or the
/// `auth-token` cookie.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = headers.get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Ok(parsed) = Cookie::parse(cookie.trim()) {
                    if parsed.name() == "auth-token" {
                        return Some(parsed.value().to_string());
                    }
                }
            }
        }
    }

    None
}

pub fn claims_from_headers(headers: &HeaderMap, secret: &str) -> Result<Claims, AppError> {
    let token = extract_token(headers)
        .ok_or_else(|| AppError::Authentication(anyhow::anyhow!("Missing token")))?;

    let validation = Validation::new(Algorithm::HS256);
    let token_data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )
    .map_err(|e| AppError::Authentication(anyhow::Error::new(e).context("JWT validation failed")))?;

    Ok(token_data.claims)
}

/// Non-fatal role probe, used to decide which hypermedia links a caller
/// may see. Anonymous and invalid tokens read as non-admin.
pub fn is_admin(headers: &HeaderMap, secret: &str) -> bool {
    claims_from_headers(headers, secret)
        .map(|claims| claims.has_role(ROLE_ADMIN))
        .unwrap_or(false)
}

pub fn require_admin(headers: &HeaderMap, secret: &str) -> Result<Claims, AppError> {
    let claims = claims_from_headers(headers, secret)?;

    if !claims.has_role(ROLE_ADMIN) {
        return Err(AppError::Permission(anyhow::anyhow!(
            "Only admins can perform this operation"
        )));
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token_for(roles: Vec<&str>) -> String {
        let claims = Claims {
            sub: "alice@example.com".to_string(),
            roles: roles.into_iter().map(String::from).collect(),
            exp: usize::MAX,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_ref()),
        )
        .unwrap()
    }

    fn headers_with_bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {}", token).parse().unwrap(),
        );
        headers
    }

    #[test]
    fn bearer_token_roundtrips() {
        let headers = headers_with_bearer(&token_for(vec![ROLE_ADMIN]));
        let claims = claims_from_headers(&headers, SECRET).unwrap();
        assert_eq!(claims.sub, "alice@example.com");
        assert!(claims.has_role(ROLE_ADMIN));
    }

    #[test]
    fn cookie_token_is_accepted() {
        let token = token_for(vec!["ROLE_USER"]);
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            format!("theme=dark; auth-token={}", token).parse().unwrap(),
        );
        let claims = claims_from_headers(&headers, SECRET).unwrap();
        assert!(claims.has_role("ROLE_USER"));
    }

    #[test]
    fn missing_token_is_unauthenticated() {
        let headers = HeaderMap::new();
        assert!(matches!(
            claims_from_headers(&headers, SECRET),
            Err(AppError::Authentication(_))
        ));
        assert!(!is_admin(&headers, SECRET));
    }

    #[test]
    fn non_admin_is_rejected_by_require_admin() {
        let headers = headers_with_bearer(&token_for(vec!["ROLE_USER"]));
        assert!(!is_admin(&headers, SECRET));
        assert!(matches!(
            require_admin(&headers, SECRET),
            Err(AppError::Permission(_))
        ));
    }

    #[test]
    fn garbage_token_is_unauthenticated() {
        let headers = headers_with_bearer("not-a-jwt");
        assert!(matches!(
            claims_from_headers(&headers, SECRET),
            Err(AppError::Authentication(_))
        ));
    }
}
