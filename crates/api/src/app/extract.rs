//! Extractors whose rejections use the API error shape.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::{HeaderMap, header, request::Parts};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::app::errors::ApiError;

/// `axum::Json` answering malformed bodies with 400 `validation_error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

/// A JSON body read but not yet decoded, so the handler can authorize the
/// request before the payload's shape is judged.
#[derive(Debug, Clone)]
pub struct DeferredJson {
    bytes: Bytes,
    is_json: bool,
}

impl DeferredJson {
    /// Decode into `T`, answering malformed bodies with 400.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        self.check_content_type()?;
        serde_json::from_slice(&self.bytes)
            .map_err(|e| ApiError::validation(format!("invalid JSON body: {e}")))
    }

    /// Decode into `T` after dropping every top-level key not in `keys`.
    pub fn decode_keeping<T: DeserializeOwned>(&self, keys: &[&str]) -> Result<T, ApiError> {
        let mut value: Value = self.decode()?;
        if let Value::Object(map) = &mut value {
            map.retain(|key, _| keys.contains(&key.as_str()));
        }
        serde_json::from_value(value)
            .map_err(|e| ApiError::validation(format!("invalid JSON body: {e}")))
    }

    fn check_content_type(&self) -> Result<(), ApiError> {
        if self.is_json {
            Ok(())
        } else {
            Err(ApiError::validation(
                "expected a JSON body with content-type application/json",
            ))
        }
    }
}

#[async_trait]
impl<S> FromRequest<S> for DeferredJson
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = json_content_type(req.headers());
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?;
        Ok(Self { bytes, is_json })
    }
}

fn json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// `axum::extract::Query` answering malformed query strings with 400.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rejection: QueryRejection| ApiError::validation(rejection.body_text()))
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::validation("expected a JSON body with content-type application/json")
        }
        other => ApiError::validation(other.body_text()),
    }
}
