//! Single-resource endpoint: GET, PATCH, DELETE one resource.

use super::collection::required_body;
use super::dispatch::HandlerError;
use super::{EndpointType, Reply, Request};
use crate::document::document_id;
use crate::error::{EngineFault, JsonApiError};
use crate::schema::{SchemaParams, SchemaView};
use http::StatusCode;
use std::sync::Arc;

/// GET: fetch by route identifier, then serialize with sparse fieldsets
/// and compound-document includes honored.
pub(crate) async fn get(
    endpoint: Arc<EndpointType>,
    request: Request,
) -> Result<Reply, HandlerError> {
    let instance = endpoint.data_layer().get_object(&request.route_params).await?;

    let view = SchemaView::compute(
        endpoint.schema(),
        SchemaParams::default(),
        &request.query,
        Some(request.query.include()),
    )?;
    Ok(Reply::Document(view.serialize_one(&instance)))
}

/// PATCH: partially validate, enforce the identifier match, update.
///
/// Validation order is load-bearing: schema validation first (409/422),
/// then the `/data/id` checks (400), then the fetch (404), then the
/// update. The 200 reply serializes the instance the layer returned.
pub(crate) async fn patch(
    endpoint: Arc<EndpointType>,
    request: Request,
) -> Result<Reply, HandlerError> {
    let body = required_body(&request)?;
    let view = SchemaView::plain(
        endpoint.schema(),
        SchemaParams { many: false, partial: true },
    );
    let data = view.deserialize(body)?;

    let Some(body_id) = document_id(body) else {
        return Err(JsonApiError::bad_request("/data/id", "Missing id in \"data\" node").into());
    };
    let route_id = request
        .route_params
        .get(endpoint.id_route_param())
        .ok_or_else(|| EngineFault::MissingRouteParam {
            template: endpoint.path().as_str().to_owned(),
            param: endpoint.id_route_param().to_owned(),
        })?;
    if body_id != *route_id {
        return Err(JsonApiError::bad_request(
            "/data/id",
            "Value of id does not match the resource identifier in url",
        )
        .into());
    }

    let instance = endpoint.data_layer().get_object(&request.route_params).await?;
    let updated = endpoint
        .data_layer()
        .update_object(&instance, &data, &request.route_params)
        .await?;

    Ok(Reply::Document(view.serialize_one(&updated)))
}

/// DELETE: fetch (404 on miss), delete, reply 204 with no body.
pub(crate) async fn delete(
    endpoint: Arc<EndpointType>,
    request: Request,
) -> Result<Reply, HandlerError> {
    let instance = endpoint.data_layer().get_object(&request.route_params).await?;
    endpoint
        .data_layer()
        .delete_object(&instance, &request.route_params)
        .await?;
    Ok(Reply::Empty(StatusCode::NO_CONTENT))
}
