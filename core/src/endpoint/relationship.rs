//! Relationship endpoint: GET, POST, PATCH, DELETE one named linkage.
//!
//! The three mutators share the identifier-validation shape from
//! [`crate::document`] but differ in the accepted cardinality of `data`:
//! POST and DELETE require a list, PATCH also accepts a single identifier
//! object. Validation always completes before any persistence call.

use super::collection::required_body;
use super::dispatch::HandlerError;
use super::{EndpointType, Reply, Request};
use crate::RouteParams;
use crate::document::{LinkageShape, validate_linkage};
use crate::error::{EngineFault, ErrorKind};
use crate::links::resolve_path_param;
use crate::schema::{SchemaParams, SchemaView};
use http::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;

/// GET: fetch the owning instance and linkage, build `self`/`related`
/// links, and copy the `included` section when includes were requested.
pub(crate) async fn get(
    endpoint: Arc<EndpointType>,
    request: Request,
) -> Result<Reply, HandlerError> {
    let binding = endpoint.relationship_binding()?;
    let (owner, linkage) = endpoint
        .data_layer()
        .get_relation(&binding.related_type, &binding.related_id_field, &request.route_params)
        .await?;

    let self_link = endpoint.path().render(&request.route_params)?;
    // Related-link parameters come from the route, or from configured
    // attribute paths resolved against the owner into a fresh map.
    let related_params: RouteParams = match &binding.endpoint_kwargs {
        Some(kwargs) => {
            let mut params = RouteParams::new();
            for (param, path) in kwargs {
                params.insert(param.clone(), resolve_path_param(&owner, path)?);
            }
            params
        }
        None => request.route_params.clone(),
    };
    let related_link = binding.related_link.render(&related_params)?;

    let mut document = json!({
        "links": {"self": self_link, "related": related_link},
        "data": linkage,
    });

    if !request.query.include().is_empty() {
        let view = SchemaView::compute(
            endpoint.schema(),
            SchemaParams::default(),
            &request.query,
            Some(request.query.include()),
        )?;
        let serialized = view.serialize_one(&owner);
        document["included"] = serialized
            .get("included")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
    }

    Ok(Reply::Document(document))
}

/// POST: add linkage members; `data` must be a list.
pub(crate) async fn post(
    endpoint: Arc<EndpointType>,
    request: Request,
) -> Result<Reply, HandlerError> {
    let binding = endpoint.relationship_binding()?;
    let body = required_body(&request)?;
    validate_linkage(body, endpoint.schema().type_name(), LinkageShape::List)?;

    endpoint
        .data_layer()
        .create_relation(body, &binding.related_id_field, &request.route_params)
        .await?;
    Ok(Reply::Empty(StatusCode::OK))
}

/// PATCH: replace the linkage; `data` may be a single identifier object
/// or a list.
pub(crate) async fn patch(
    endpoint: Arc<EndpointType>,
    request: Request,
) -> Result<Reply, HandlerError> {
    let binding = endpoint.relationship_binding()?;
    let body = required_body(&request)?;
    validate_linkage(body, endpoint.schema().type_name(), LinkageShape::ListOrOne)?;

    endpoint
        .data_layer()
        .update_relation(body, &binding.related_id_field, &request.route_params)
        .await?;
    Ok(Reply::Empty(StatusCode::OK))
}

/// DELETE: remove linkage members; `data` must be a list.
///
/// Only a relation-not-found condition maps to an envelope here; an
/// object-not-found from the layer has no branch on this verb and
/// escalates as a fault.
pub(crate) async fn delete(
    endpoint: Arc<EndpointType>,
    request: Request,
) -> Result<Reply, HandlerError> {
    let binding = endpoint.relationship_binding()?;
    let body = required_body(&request)?;
    validate_linkage(body, endpoint.schema().type_name(), LinkageShape::List)?;

    endpoint
        .data_layer()
        .delete_relation(body, &binding.related_id_field, &request.route_params)
        .await
        .map_err(|err| {
            if err.kind() == ErrorKind::RelationNotFound {
                HandlerError::Request(err)
            } else {
                HandlerError::Fault(EngineFault::UncaughtCondition(err))
            }
        })?;
    Ok(Reply::Empty(StatusCode::OK))
}
