//! Mounting an endpoint registry onto an Axum router.
//!
//! One route is mounted per registered endpoint, with every verb bound to
//! a dispatch adapter that assembles the engine request (route
//! parameters, parsed query context, optional JSON body), invokes
//! [`EndpointType::dispatch`], and renders the outcome:
//!
//! - an engine response becomes an HTTP response verbatim,
//! - a recoverable parse failure becomes its error envelope,
//! - an [`EngineFault`] is logged and answered with a 500 envelope — the
//!   engine never downgrades a fault itself.

use apiary_core::RouteParams;
use apiary_core::endpoint::{
    EndpointType, MEDIA_TYPE, Request as EngineRequest, Response as EngineResponse,
};
use apiary_core::endpoint::config::EndpointRegistry;
use apiary_core::error::{EngineFault, ErrorObject, JsonApiError, error_document};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{RawPathParams, RawQuery};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use http::{HeaderValue, Method, StatusCode, header};
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build a router exposing every endpoint in the registry.
///
/// The returned router carries the JSON:API media-type layer and HTTP
/// tracing; URL templates are translated from `{param}` to Axum's
/// `:param` captures.
#[must_use]
pub fn mount(registry: &EndpointRegistry) -> Router {
    let mut router = Router::new();
    for endpoint in registry.iter() {
        let path = axum_path(endpoint.path().as_str());
        let endpoint = Arc::clone(endpoint);
        let handler = move |method: Method,
                            params: RawPathParams,
                            RawQuery(raw_query): RawQuery,
                            body: Bytes| {
            let endpoint = Arc::clone(&endpoint);
            async move { serve(endpoint, method, &params, raw_query.as_deref(), &body).await }
        };
        router = router.route(&path, any(handler));
    }
    router
        .layer(crate::media::media_type_layer())
        .layer(TraceLayer::new_for_http())
}

async fn serve(
    endpoint: Arc<EndpointType>,
    method: Method,
    params: &RawPathParams,
    raw_query: Option<&str>,
    body: &Bytes,
) -> Response {
    let query = match crate::query::parse(raw_query) {
        Ok(query) => query,
        Err(err) => return envelope_response(&err),
    };

    let parsed_body = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Some(value),
            Err(_) => {
                return envelope_response(&JsonApiError::bad_request(
                    "/",
                    "Request body is not valid JSON",
                ));
            }
        }
    };

    let mut route_params = RouteParams::new();
    for (key, value) in params {
        route_params.insert(key.to_owned(), value.to_owned());
    }

    let mut request = EngineRequest::new(method)
        .with_route_params(route_params)
        .with_query(query);
    if let Some(parsed) = parsed_body {
        request = request.with_body(parsed);
    }

    match endpoint.dispatch(request).await {
        Ok(response) => into_http(response),
        Err(fault) => fault_response(&fault),
    }
}

/// Render a recoverable condition as its JSON:API error envelope.
pub(crate) fn envelope_response(err: &JsonApiError) -> Response {
    json_response(err.status(), &err.document())
}

fn fault_response(fault: &EngineFault) -> Response {
    tracing::error!(error = %fault, "engine fault while dispatching");
    let document = error_document(&[ErrorObject {
        status: "500".to_owned(),
        title: "Internal server error".to_owned(),
        detail: None,
        source: None,
    }]);
    json_response(StatusCode::INTERNAL_SERVER_ERROR, &document)
}

fn json_response(status: StatusCode, document: &Value) -> Response {
    let bytes = serde_json::to_vec(document).unwrap_or_default();
    let mut response = (status, bytes).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE));
    response
}

fn into_http(response: EngineResponse) -> Response {
    let mut http_response = match response.body {
        Some(document) => {
            let bytes = serde_json::to_vec(&document).unwrap_or_default();
            (response.status, bytes).into_response()
        }
        None => response.status.into_response(),
    };
    for (name, value) in &response.headers {
        http_response.headers_mut().insert(name, value.clone());
    }
    http_response
}

fn axum_path(template: &str) -> String {
    template.replace('{', ":").replace('}', "")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use apiary_core::data_layer::DataLayer;
    use apiary_core::data_layer::memory::InMemoryDataLayer;
    use apiary_core::endpoint::config::EndpointOptions;
    use apiary_core::schema::{FieldKind, SchemaDescriptor};
    use apiary_testing::builders::{linkage_list, resource_doc};
    use axum::body::Body;
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    fn schema() -> Arc<SchemaDescriptor> {
        Arc::new(
            SchemaDescriptor::builder("articles")
                .required_attribute("title", FieldKind::String)
                .attribute("pages", FieldKind::Integer)
                .relationship_many("comments", "comments")
                .build(),
        )
    }

    fn build_app(seed: &[Value]) -> Router {
        let layer = Arc::new(
            InMemoryDataLayer::new("articles").with_relationship_field("comments"),
        );
        for instance in seed {
            layer.insert(instance.clone());
        }
        let shared: Arc<dyn DataLayer> = layer;

        let mut registry = EndpointRegistry::new();
        registry
            .register(
                EndpointOptions::collection("articles_list", schema(), "/articles")
                    .data_layer(Arc::clone(&shared))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .register(
                EndpointOptions::detail("articles_detail", schema(), "/articles/{id}")
                    .data_layer(Arc::clone(&shared))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .register(
                EndpointOptions::relationship(
                    "article_comments",
                    schema(),
                    "/articles/{id}/relationships/comments",
                )
                .related("comments", "comments", "/articles/{id}/comments")
                .data_layer(shared)
                .build()
                .unwrap(),
            )
            .unwrap();
        mount(&registry)
    }

    fn json_request(method: Method, uri: &str, body: &Value) -> http::Request<Body> {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, MEDIA_TYPE)
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn read_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn post_then_get_round_trips_every_attribute() {
        let app = build_app(&[]);

        let create = json_request(
            Method::POST,
            "/articles",
            &resource_doc("articles", json!({"title": "Typee", "pages": 325})),
        );
        let response = app.clone().oneshot(create).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            MEDIA_TYPE
        );
        let created = read_json(response).await;
        let id = created["data"]["id"].as_str().unwrap().to_owned();

        let fetch = http::Request::builder()
            .uri(format!("/articles/{id}"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(fetch).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = read_json(response).await;
        assert_eq!(fetched["data"]["attributes"], created["data"]["attributes"]);
    }

    #[tokio::test]
    async fn collection_get_paginates() {
        let seed: Vec<Value> = (1..=7)
            .map(|i| json!({"title": format!("article {i}"), "pages": i}))
            .collect();
        let app = build_app(&seed);

        let request = http::Request::builder()
            .uri("/articles?page%5Bnumber%5D=1&page%5Bsize%5D=3")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
        assert_eq!(body["meta"]["count"], 7);
        assert!(body["links"]["next"].as_str().unwrap().contains("page[number]=2"));
    }

    #[tokio::test]
    async fn relationship_post_links_members() {
        let app = build_app(&[json!({"id": "1", "title": "Typee", "comments": []})]);

        let link = json_request(
            Method::POST,
            "/articles/1/relationships/comments",
            &linkage_list("articles", &["10"]),
        );
        let response = app.clone().oneshot(link).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let fetch = http::Request::builder()
            .uri("/articles/1/relationships/comments")
            .body(Body::empty())
            .unwrap();
        let body = read_json(app.oneshot(fetch).await.unwrap()).await;
        assert_eq!(body["data"], json!([{"type": "comments", "id": "10"}]));
        assert_eq!(body["links"]["self"], "/articles/1/relationships/comments");
    }

    #[tokio::test]
    async fn malformed_json_body_is_a_400_envelope() {
        let app = build_app(&[]);
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("/articles")
            .header(header::CONTENT_TYPE, MEDIA_TYPE)
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["errors"][0]["status"], "400");
    }

    #[tokio::test]
    async fn unbound_verb_surfaces_as_a_500_envelope() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("apiary_web=debug")
            .try_init();
        let app = build_app(&[]);
        let request = http::Request::builder()
            .method(Method::PUT)
            .uri("/articles")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert_eq!(body["errors"][0]["status"], "500");
        assert_eq!(body["errors"][0]["title"], "Internal server error");
    }

    #[tokio::test]
    async fn head_is_served_through_the_get_handler() {
        let app = build_app(&[]);
        let request = http::Request::builder()
            .method(Method::HEAD)
            .uri("/articles")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn delete_round_trip_yields_204_then_404() {
        let app = build_app(&[json!({"id": "1", "title": "Typee"})]);

        let delete = http::Request::builder()
            .method(Method::DELETE)
            .uri("/articles/1")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.is_empty());

        let again = http::Request::builder()
            .method(Method::DELETE)
            .uri("/articles/1")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(again).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
