//! Error taxonomy and the JSON:API error envelope.
//!
//! This module defines the two failure channels of the dispatch engine:
//!
//! - [`JsonApiError`]: recoverable request failures. Every value carries a
//!   kind drawn from a fixed status/title table ([`ErrorKind`]) and becomes
//!   a JSON:API error envelope at the handler boundary.
//! - [`EngineFault`]: non-recoverable programmer or configuration defects
//!   (an unbound verb, an unresolvable link template). These abort the
//!   request path and are translated by the hosting layer, never by the
//!   engine, into a 500-class response.
//!
//! Keeping the channels as distinct types means a fault can never be
//! accidentally downgraded into a client-facing 4xx.

use http::{Method, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use thiserror::Error;

/// Error kinds with their fixed status/title table.
///
/// Every call site constructing the same kind produces identical wording,
/// so envelopes stay byte-comparable across handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request: missing/mismatched `id`, malformed relationship
    /// document shape, malformed body or query parameter.
    BadRequest,
    /// Unknown name in the sparse fieldset for the endpoint's own type.
    InvalidField,
    /// Include path naming no declared relationship.
    InvalidInclude,
    /// Relationship item `type` not matching the resource's declared type.
    InvalidType,
    /// Document `type` not matching the schema's declared type.
    IncorrectType,
    /// One or more fields failed schema validation.
    Validation,
    /// Object lookup miss. Status may be overridden by the raiser.
    ObjectNotFound,
    /// Relation lookup miss.
    RelationNotFound,
    /// Verb disabled by endpoint options.
    MethodNotAllowed,
    /// Request body media type violation.
    UnsupportedMediaType,
    /// Accept header violation.
    NotAcceptable,
}

impl ErrorKind {
    /// Default HTTP status for this kind.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::BadRequest | Self::InvalidField | Self::InvalidInclude | Self::InvalidType => {
                StatusCode::BAD_REQUEST
            }
            Self::IncorrectType => StatusCode::CONFLICT,
            Self::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ObjectNotFound | Self::RelationNotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
        }
    }

    /// Fixed, client-facing title for this kind.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::BadRequest => "Bad request",
            Self::InvalidField => "Invalid fields querystring parameter",
            Self::InvalidInclude => "Invalid include querystring parameter",
            Self::InvalidType => "Invalid type",
            Self::IncorrectType => "Incorrect type",
            Self::Validation => "Validation error",
            Self::ObjectNotFound => "Object not found",
            Self::RelationNotFound => "Relation not found",
            Self::MethodNotAllowed => "Method not allowed",
            Self::UnsupportedMediaType => "Unsupported media type",
            Self::NotAcceptable => "Not acceptable",
        }
    }
}

/// One failing location inside a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSource {
    /// JSON pointer into the request document, when one applies.
    pub pointer: Option<String>,
    /// Human-readable detail for this location.
    pub detail: String,
}

/// A recoverable request failure.
///
/// Carries a kind, the response status (the kind's table entry unless the
/// raiser overrides it, as object-lookup misses may), and one failing
/// source per error object the envelope will contain. Multiple validation
/// failures aggregate into a single value so one request yields exactly
/// one envelope.
#[derive(Debug, Clone)]
pub struct JsonApiError {
    kind: ErrorKind,
    status: StatusCode,
    sources: Vec<ErrorSource>,
}

impl fmt::Display for JsonApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.title(), self.primary_detail())
    }
}

impl std::error::Error for JsonApiError {}

impl JsonApiError {
    fn new(kind: ErrorKind, sources: Vec<ErrorSource>) -> Self {
        Self {
            kind,
            status: kind.status(),
            sources,
        }
    }

    fn single(kind: ErrorKind, pointer: Option<&str>, detail: impl Into<String>) -> Self {
        Self::new(
            kind,
            vec![ErrorSource {
                pointer: pointer.map(str::to_owned),
                detail: detail.into(),
            }],
        )
    }

    /// Malformed request, 400, with a JSON-pointer source.
    #[must_use]
    pub fn bad_request(pointer: &str, detail: impl Into<String>) -> Self {
        Self::single(ErrorKind::BadRequest, Some(pointer), detail)
    }

    /// Unknown sparse-fieldset name, 400.
    #[must_use]
    pub fn invalid_field(detail: impl Into<String>) -> Self {
        Self::single(ErrorKind::InvalidField, None, detail)
    }

    /// Unknown include path, 400.
    #[must_use]
    pub fn invalid_include(detail: impl Into<String>) -> Self {
        Self::single(ErrorKind::InvalidInclude, None, detail)
    }

    /// Relationship item type mismatch, 400, distinct from `bad_request`.
    #[must_use]
    pub fn invalid_type(pointer: &str, detail: impl Into<String>) -> Self {
        Self::single(ErrorKind::InvalidType, Some(pointer), detail)
    }

    /// Document type mismatch against the schema's declared type, 409.
    #[must_use]
    pub fn incorrect_type(pointer: &str, detail: impl Into<String>) -> Self {
        Self::single(ErrorKind::IncorrectType, Some(pointer), detail)
    }

    /// Aggregated document type mismatches, 409, one error per mismatch.
    #[must_use]
    pub fn incorrect_type_many(mismatches: Vec<ErrorSource>) -> Self {
        Self::new(ErrorKind::IncorrectType, mismatches)
    }

    /// Aggregated field validation failures, 422.
    ///
    /// Every failing field becomes its own error object in the envelope.
    #[must_use]
    pub fn validation(failures: Vec<ErrorSource>) -> Self {
        Self::new(ErrorKind::Validation, failures)
    }

    /// Object lookup miss at the default 404.
    #[must_use]
    pub fn object_not_found(detail: impl Into<String>) -> Self {
        Self::single(ErrorKind::ObjectNotFound, None, detail)
    }

    /// Object lookup miss at a caller-specified status.
    #[must_use]
    pub fn object_not_found_with_status(status: StatusCode, detail: impl Into<String>) -> Self {
        let mut err = Self::single(ErrorKind::ObjectNotFound, None, detail);
        err.status = status;
        err
    }

    /// Relation lookup miss, 404.
    #[must_use]
    pub fn relation_not_found(detail: impl Into<String>) -> Self {
        Self::single(ErrorKind::RelationNotFound, None, detail)
    }

    /// Verb disabled by endpoint options, 405.
    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::single(
            ErrorKind::MethodNotAllowed,
            None,
            "This method is not allowed on this endpoint",
        )
    }

    /// Request body media type violation, 415.
    #[must_use]
    pub fn unsupported_media_type(detail: impl Into<String>) -> Self {
        Self::single(ErrorKind::UnsupportedMediaType, None, detail)
    }

    /// Accept header violation, 406.
    #[must_use]
    pub fn not_acceptable(detail: impl Into<String>) -> Self {
        Self::single(ErrorKind::NotAcceptable, None, detail)
    }

    /// Kind of this failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Response status of this failure.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Failing sources, one per error object.
    #[must_use]
    pub fn sources(&self) -> &[ErrorSource] {
        &self.sources
    }

    fn primary_detail(&self) -> &str {
        self.sources.first().map_or("", |s| s.detail.as_str())
    }

    /// One JSON:API error object per failing source.
    #[must_use]
    pub fn error_objects(&self) -> Vec<ErrorObject> {
        self.sources
            .iter()
            .map(|source| ErrorObject {
                status: self.status.as_u16().to_string(),
                title: self.kind.title().to_owned(),
                detail: Some(source.detail.clone()),
                source: source
                    .pointer
                    .as_ref()
                    .map(|pointer| SourcePointer { pointer: pointer.clone() }),
            })
            .collect()
    }

    /// The complete error envelope for this failure.
    #[must_use]
    pub fn document(&self) -> Value {
        error_document(&self.error_objects())
    }
}

/// A JSON:API error object: `{status, title, detail?, source?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorObject {
    /// HTTP status, serialized as a string per the JSON:API format.
    pub status: String,
    /// Short, kind-fixed summary.
    pub title: String,
    /// Occurrence-specific detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Location of the failure inside the request document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourcePointer>,
}

/// JSON-pointer source member of an error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcePointer {
    /// JSON pointer into the request document.
    pub pointer: String,
}

/// Wrap error objects in the JSON:API error envelope.
#[must_use]
pub fn error_document(errors: &[ErrorObject]) -> Value {
    json!({
        "errors": errors,
        "jsonapi": {"version": "1.0"},
    })
}

/// A non-recoverable dispatch-path failure.
///
/// Faults signal configuration or programmer defects. They are carried on
/// the `Err` channel of dispatch, never converted into an error envelope
/// by the engine; the hosting layer decides how to surface them (the Axum
/// integration logs and answers 500).
#[derive(Debug, Clone, Error)]
pub enum EngineFault {
    /// A verb reached dispatch with no bound handler.
    #[error("unimplemented method {method} on endpoint {endpoint}")]
    UnimplementedMethod {
        /// Endpoint name as registered.
        endpoint: String,
        /// The unresolvable verb.
        method: Method,
    },

    /// A URL template required a parameter the request did not supply.
    #[error("missing parameter {param} for link template {template}")]
    MissingRouteParam {
        /// The template being rendered.
        template: String,
        /// The absent parameter.
        param: String,
    },

    /// A dotted attribute path did not resolve against an instance.
    #[error("attribute path {path} failed at segment {segment}")]
    AttributePath {
        /// The full configured path.
        path: String,
        /// The segment that did not resolve.
        segment: String,
    },

    /// Endpoint configuration violated an invariant at request time.
    #[error("endpoint {endpoint} misconfigured: {detail}")]
    Misconfigured {
        /// Endpoint name as registered.
        endpoint: String,
        /// What was violated.
        detail: String,
    },

    /// A condition the verb's state machine has no branch for.
    #[error("uncaught condition: {0}")]
    UncaughtCondition(#[source] JsonApiError),
}

/// A registration-time configuration failure.
///
/// Raised while building endpoint types, before any request is served;
/// never producible at request time.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Data-layer constructor kwargs were not a JSON mapping.
    #[error("data layer kwargs for endpoint {endpoint} must be a mapping")]
    DataLayerKwargs {
        /// Endpoint being configured.
        endpoint: String,
    },

    /// A data-layer factory rejected its kwargs.
    #[error("invalid data layer configuration: {0}")]
    DataLayer(String),

    /// Two endpoints registered under one name.
    #[error("endpoint {0} is already registered")]
    DuplicateEndpoint(String),

    /// A relationship endpoint was built without a relationship binding.
    #[error("relationship endpoint {0} requires a relationship binding")]
    MissingRelationship(String),

    /// A non-relationship endpoint was given a relationship binding.
    #[error("endpoint {0} does not take a relationship binding")]
    UnexpectedRelationship(String),

    /// A verb was disabled or given middleware on a kind that lacks it.
    #[error("endpoint {endpoint} has no {method} handler to configure")]
    UnsupportedMethod {
        /// Endpoint being configured.
        endpoint: String,
        /// The unsupported verb.
        method: Method,
    },
}
