//! Collection endpoint: GET a collection, POST a new resource.

use super::dispatch::HandlerError;
use super::{EndpointType, Reply, Request};
use crate::RouteParams;
use crate::pagination::add_pagination_links;
use crate::schema::{SchemaParams, SchemaView};
use http::StatusCode;
use serde_json::Value;
use std::sync::Arc;

/// GET: fetch, serialize, and paginate the collection.
///
/// The schema view is computed before the persistence call so a bad
/// sparse fieldset costs no fetch. Pagination policy lives in the data
/// layer; only the count and links are derived here. Includes are not
/// honored on collection GET.
pub(crate) async fn get(
    endpoint: Arc<EndpointType>,
    request: Request,
) -> Result<Reply, HandlerError> {
    let view = SchemaView::compute(
        endpoint.schema(),
        SchemaParams { many: true, partial: false },
        &request.query,
        None,
    )?;

    let (count, items) = endpoint
        .data_layer()
        .get_collection(&request.query, &request.route_params)
        .await?;

    let mut document = view.serialize_many(&items);
    let base_url = if endpoint.include_endpoint_kwargs() {
        endpoint.path().render(&request.route_params)?
    } else {
        endpoint.path().render(&RouteParams::new())?
    };
    add_pagination_links(&mut document, count, &request.query, &base_url);
    Ok(Reply::Document(document))
}

/// POST: validate a resource document and create the resource.
///
/// Full, non-partial validation; 409 on declared-type mismatch, 422
/// aggregating every failing field. The 201 reply serializes the created
/// instance through the plain schema (no sparse fieldsets).
pub(crate) async fn post(
    endpoint: Arc<EndpointType>,
    request: Request,
) -> Result<Reply, HandlerError> {
    let body = required_body(&request)?;
    let view = SchemaView::plain(endpoint.schema(), SchemaParams::default());
    let data = view.deserialize(body)?;

    let created = endpoint
        .data_layer()
        .create_object(&data, &request.route_params)
        .await?;

    Ok(Reply::DocumentWithStatus(view.serialize_one(&created), StatusCode::CREATED))
}

pub(super) fn required_body(request: &Request) -> Result<&Value, HandlerError> {
    request.body.as_ref().ok_or_else(|| {
        HandlerError::Request(crate::error::JsonApiError::bad_request(
            "/",
            "Request body must be a JSON document",
        ))
    })
}
