//! Request-document helpers shared by the endpoint state machines.
//!
//! The three relationship mutators (POST, PATCH, DELETE) share one
//! identifier-validation shape — every linkage item must carry `type`
//! (matching the resource's declared type) and `id` — but differ in the
//! accepted cardinality of the `data` node. [`validate_linkage`] encodes
//! that difference explicitly so each verb states its shape at the call
//! site.

use crate::error::JsonApiError;
use serde_json::Value;

/// Accepted cardinality of a relationship document's `data` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkageShape {
    /// `data` must be a list (relationship POST and DELETE).
    List,
    /// `data` may be a single identifier object or a list (PATCH).
    ListOrOne,
}

/// Validate a relationship document against the declared resource type.
///
/// Checks run in document order and stop at the first violation: the
/// `data` node must exist and match the shape; each identifier must be an
/// object carrying `type` then `id`; each `type` must equal `declared`.
/// No persistence call may happen before this returns `Ok`.
///
/// # Errors
///
/// `BadRequest` (400) for a missing node, wrong shape, or missing
/// member; `InvalidType` (400, distinct title) for a type mismatch.
pub fn validate_linkage(
    body: &Value,
    declared: &str,
    shape: LinkageShape,
) -> Result<(), JsonApiError> {
    let Some(data) = body.get("data") else {
        return Err(JsonApiError::bad_request(
            "/data",
            "You must provide data with a \"data\" node",
        ));
    };

    match (shape, data) {
        (_, Value::Array(items)) => {
            for item in items {
                validate_identifier(item, declared)?;
            }
            Ok(())
        }
        (LinkageShape::ListOrOne, Value::Object(_)) => validate_identifier(data, declared),
        (LinkageShape::List, _) => {
            Err(JsonApiError::bad_request("/data", "You must provide data as list"))
        }
        (LinkageShape::ListOrOne, _) => Err(JsonApiError::bad_request(
            "/data",
            "You must provide data as object or list",
        )),
    }
}

fn validate_identifier(item: &Value, declared: &str) -> Result<(), JsonApiError> {
    if !item.is_object() {
        return Err(JsonApiError::bad_request(
            "/data",
            "Linkage items must be objects",
        ));
    }
    let Some(item_type) = item.get("type").and_then(Value::as_str) else {
        return Err(JsonApiError::bad_request(
            "/data/type",
            "Missing type in \"data\" node",
        ));
    };
    if item.get("id").is_none() {
        return Err(JsonApiError::bad_request(
            "/data/id",
            "Missing id in \"data\" node",
        ));
    }
    if item_type != declared {
        return Err(JsonApiError::invalid_type(
            "/data/type",
            "The type provided does not match the resource type",
        ));
    }
    Ok(())
}

/// The `id` member of a document's `data` node, when present.
#[must_use]
pub fn document_id(body: &Value) -> Option<String> {
    match body.get("data")?.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
