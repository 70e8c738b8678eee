//! JSON:API content negotiation middleware.
//!
//! Enforces the media-type rules clients expect from a conforming
//! server, before any request reaches the dispatch engine:
//!
//! - POST and PATCH requests must declare
//!   `Content-Type: application/vnd.api+json` with no media type
//!   parameters → **415** otherwise.
//! - An `Accept` header that mentions `application/vnd.api+json` only
//!   with media type parameters → **406**.
//!
//! # Example
//!
//! ```ignore
//! use apiary_web::media::media_type_layer;
//!
//! let app = apiary_web::router::mount(&registry)
//!     .layer(media_type_layer());
//! ```

use apiary_core::endpoint::MEDIA_TYPE;
use apiary_core::error::JsonApiError;
use axum::extract::Request;
use axum::response::Response;
use http::{Method, header};
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Create a layer enforcing the JSON:API media-type rules.
#[must_use]
pub fn media_type_layer() -> MediaTypeLayer {
    MediaTypeLayer
}

/// Layer for JSON:API content negotiation.
#[derive(Clone, Debug)]
pub struct MediaTypeLayer;

impl<S> Layer<S> for MediaTypeLayer {
    type Service = MediaTypeMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MediaTypeMiddleware { inner }
    }
}

/// Middleware service enforcing the JSON:API media-type rules.
#[derive(Clone, Debug)]
pub struct MediaTypeMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for MediaTypeMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        if let Some(rejection) = negotiate(&req) {
            let response = crate::router::envelope_response(&rejection);
            return Box::pin(async move { Ok(response) });
        }
        let fut = self.inner.call(req);
        Box::pin(fut)
    }
}

fn negotiate(req: &Request) -> Option<JsonApiError> {
    if req.method() == Method::POST || req.method() == Method::PATCH {
        let declared = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        if declared.is_none_or(|value| value.trim() != MEDIA_TYPE) {
            return Some(JsonApiError::unsupported_media_type(format!(
                "Content-Type header must be {MEDIA_TYPE}"
            )));
        }
    }

    let accept = req
        .headers()
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())?;
    let jsonapi_ranges: Vec<&str> = accept
        .split(',')
        .map(str::trim)
        .filter(|range| range.split(';').next().map(str::trim) == Some(MEDIA_TYPE))
        .collect();
    if !jsonapi_ranges.is_empty() && jsonapi_ranges.iter().all(|range| range.contains(';')) {
        return Some(JsonApiError::not_acceptable(format!(
            "Accept header must include {MEDIA_TYPE} without media type parameters"
        )));
    }
    None
}
