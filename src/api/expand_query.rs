use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{request::Parts, StatusCode},
    Json,
};
use std::collections::HashMap;

use crate::api::handlers::ErrorResponse;

/// Depth requested through the `$expand` query parameter.
///
/// Accepted forms are `.`, `*` or `~`, each optionally followed by
/// `($levels=N)`. A bare expand asks for one level; no `$expand` at all
/// means references only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpandParams {
    pub levels: u8,
}

impl ExpandParams {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        let (kind, options) = match raw.find('(') {
            Some(open) => (&raw[..open], Some(&raw[open..])),
            None => (raw, None),
        };
        if !matches!(kind, "." | "*" | "~") {
            return Err(format!("unsupported $expand value '{}'", raw));
        }

        let levels = match options {
            None => 1,
            Some(options) => {
                let inner = options
                    .strip_prefix('(')
                    .and_then(|s| s.strip_suffix(')'))
                    .ok_or_else(|| format!("malformed $expand options '{}'", options))?;
                let value = inner
                    .trim()
                    .strip_prefix("$levels=")
                    .ok_or_else(|| format!("unsupported $expand option '{}'", inner))?;
                let requested = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| format!("invalid $levels value '{}'", value))?;
                // Saturates here; `clamped` applies the configured maximum.
                u8::try_from(requested).unwrap_or(u8::MAX)
            }
        };
        Ok(Self { levels })
    }

    /// Caps the requested depth, logging when it had to.
    pub fn clamped(self, max_levels: u8) -> Self {
        if self.levels > max_levels {
            log::warn!(
                "$expand levels {} exceeds the configured maximum, clamping to {}",
                self.levels,
                max_levels
            );
            return Self { levels: max_levels };
        }
        self
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ExpandParams
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(&e.to_string()))))?;

        match query.get("$expand") {
            None => Ok(Self::default()),
            Some(raw) => Self::parse(raw)
                .map_err(|message| (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(&message)))),
        }
    }
}
