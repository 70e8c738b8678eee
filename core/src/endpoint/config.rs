//! Endpoint configuration: the options builder and the registry.
//!
//! [`EndpointOptions`] is the declarative record consumed exactly once at
//! service startup. `build()` resolves the persistence-contract instance
//! (explicit instance, factory + kwargs, or the in-memory default),
//! composes the per-verb middleware chains, replaces disabled verbs with
//! the always-405 handler, and produces an immutable [`EndpointType`].
//! Everything that can go wrong here is a [`ConfigError`] — fail-fast,
//! never a request-time condition.

use super::dispatch::{adapt, not_allowed};
use super::{
    EndpointKind, EndpointType, Handler, Middleware, RelationshipBinding, collection, detail,
    relationship,
};
use crate::data_layer::memory::InMemoryDataLayer;
use crate::data_layer::{DataLayer, DataLayerFactory};
use crate::error::ConfigError;
use crate::links::LinkTemplate;
use crate::schema::SchemaDescriptor;
use http::Method;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

enum LayerSource {
    Instance(Arc<dyn DataLayer>),
    Factory(Arc<dyn DataLayerFactory>, Value),
}

struct RelatedOptions {
    name: String,
    related_type: String,
    related_id_field: String,
    related_path: String,
    endpoint_kwargs: Option<BTreeMap<String, String>>,
}

/// Declarative options for one endpoint, consumed by [`build`].
///
/// [`build`]: EndpointOptions::build
pub struct EndpointOptions {
    name: String,
    kind: EndpointKind,
    schema: Arc<SchemaDescriptor>,
    path: String,
    layer: Option<LayerSource>,
    id_route_param: String,
    include_endpoint_kwargs: bool,
    related: Option<RelatedOptions>,
    disabled: Vec<Method>,
    middleware: Vec<(Method, Middleware)>,
}

impl EndpointOptions {
    fn new(
        name: impl Into<String>,
        kind: EndpointKind,
        schema: Arc<SchemaDescriptor>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            schema,
            path: path.into(),
            layer: None,
            id_route_param: "id".to_owned(),
            include_endpoint_kwargs: false,
            related: None,
            disabled: Vec::new(),
            middleware: Vec::new(),
        }
    }

    /// Options for a collection endpoint (GET, POST).
    #[must_use]
    pub fn collection(
        name: impl Into<String>,
        schema: Arc<SchemaDescriptor>,
        path: impl Into<String>,
    ) -> Self {
        Self::new(name, EndpointKind::Collection, schema, path)
    }

    /// Options for a single-resource endpoint (GET, PATCH, DELETE).
    #[must_use]
    pub fn detail(
        name: impl Into<String>,
        schema: Arc<SchemaDescriptor>,
        path: impl Into<String>,
    ) -> Self {
        Self::new(name, EndpointKind::Detail, schema, path)
    }

    /// Options for a relationship endpoint (GET, POST, PATCH, DELETE).
    ///
    /// Requires [`related`](Self::related) before `build`.
    #[must_use]
    pub fn relationship(
        name: impl Into<String>,
        schema: Arc<SchemaDescriptor>,
        path: impl Into<String>,
    ) -> Self {
        Self::new(name, EndpointKind::Relationship, schema, path)
    }

    /// Use an explicit persistence-contract instance.
    #[must_use]
    pub fn data_layer(mut self, layer: Arc<dyn DataLayer>) -> Self {
        self.layer = Some(LayerSource::Instance(layer));
        self
    }

    /// Construct the persistence contract from a factory and a
    /// constructor-kwargs record. The record must be a JSON mapping;
    /// `build` fails fast otherwise.
    #[must_use]
    pub fn data_layer_factory(
        mut self,
        factory: Arc<dyn DataLayerFactory>,
        kwargs: Value,
    ) -> Self {
        self.layer = Some(LayerSource::Factory(factory, kwargs));
        self
    }

    /// Route parameter naming the resource identifier (default `id`).
    #[must_use]
    pub fn id_route_param(mut self, param: impl Into<String>) -> Self {
        self.id_route_param = param.into();
        self
    }

    /// Substitute route parameters into collection pagination links.
    #[must_use]
    pub const fn include_endpoint_kwargs(mut self, include: bool) -> Self {
        self.include_endpoint_kwargs = include;
        self
    }

    /// Bind the relationship of a relationship endpoint: its name, the
    /// related JSON:API type, and the related endpoint's URL template.
    #[must_use]
    pub fn related(
        mut self,
        name: impl Into<String>,
        related_type: impl Into<String>,
        related_path: impl Into<String>,
    ) -> Self {
        self.related = Some(RelatedOptions {
            name: name.into(),
            related_type: related_type.into(),
            related_id_field: "id".to_owned(),
            related_path: related_path.into(),
            endpoint_kwargs: None,
        });
        self
    }

    /// Identifier field of related instances (default `id`).
    #[must_use]
    pub fn related_id_field(mut self, field: impl Into<String>) -> Self {
        if let Some(related) = self.related.as_mut() {
            related.related_id_field = field.into();
        }
        self
    }

    /// Map one related-link parameter to a dotted attribute path on the
    /// owning instance.
    #[must_use]
    pub fn endpoint_kwarg(mut self, param: impl Into<String>, path: impl Into<String>) -> Self {
        if let Some(related) = self.related.as_mut() {
            related
                .endpoint_kwargs
                .get_or_insert_with(BTreeMap::new)
                .insert(param.into(), path.into());
        }
        self
    }

    /// Disable a verb: its handler is replaced with one that always
    /// produces a 405 envelope, discarding any middleware for the verb.
    #[must_use]
    pub fn disable(mut self, method: Method) -> Self {
        self.disabled.push(method);
        self
    }

    /// Append a middleware wrapper for one verb.
    ///
    /// Wrappers apply in registration order, each wrapping the handler
    /// built so far; the last registered runs outermost.
    #[must_use]
    pub fn middleware(mut self, method: Method, middleware: Middleware) -> Self {
        self.middleware.push((method, middleware));
        self
    }

    /// Assemble the immutable endpoint type.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`]: non-mapping data-layer kwargs, a factory
    /// rejection, a missing or unexpected relationship binding, or a
    /// disabled/middleware verb the kind does not support.
    pub fn build(self) -> Result<Arc<EndpointType>, ConfigError> {
        let supported = self.kind.supported_methods();
        let unsupported = self
            .disabled
            .iter()
            .chain(self.middleware.iter().map(|(method, _)| method))
            .find(|method| !supported.contains(method))
            .cloned();
        if let Some(method) = unsupported {
            return Err(ConfigError::UnsupportedMethod { endpoint: self.name, method });
        }

        let relationship = match (self.kind, self.related) {
            (EndpointKind::Relationship, Some(related)) => Some(RelationshipBinding {
                name: related.name,
                related_type: related.related_type,
                related_id_field: related.related_id_field,
                related_link: LinkTemplate::new(related.related_path),
                endpoint_kwargs: related.endpoint_kwargs,
            }),
            (EndpointKind::Relationship, None) => {
                return Err(ConfigError::MissingRelationship(self.name));
            }
            (_, Some(_)) => return Err(ConfigError::UnexpectedRelationship(self.name)),
            (_, None) => None,
        };

        let data_layer: Arc<dyn DataLayer> = match self.layer {
            Some(LayerSource::Instance(layer)) => layer,
            Some(LayerSource::Factory(factory, kwargs)) => {
                let Value::Object(kwargs) = kwargs else {
                    return Err(ConfigError::DataLayerKwargs { endpoint: self.name });
                };
                factory.create(&kwargs)?
            }
            None => Arc::new(default_layer(
                &self.schema,
                &self.id_route_param,
                relationship.as_ref(),
            )),
        };

        let mut handlers: HashMap<Method, Handler> = HashMap::new();
        for method in supported {
            let mut handler = base_handler(self.kind, method);
            for (_, middleware) in
                self.middleware.iter().filter(|(m, _)| m == method)
            {
                handler = middleware(handler);
            }
            if self.disabled.contains(method) {
                handler = not_allowed();
            }
            handlers.insert(method.clone(), handler);
        }

        Ok(Arc::new(EndpointType {
            name: self.name,
            kind: self.kind,
            schema: self.schema,
            data_layer,
            path: LinkTemplate::new(self.path),
            id_route_param: self.id_route_param,
            include_endpoint_kwargs: self.include_endpoint_kwargs,
            relationship,
            handlers,
        }))
    }
}

fn default_layer(
    schema: &Arc<SchemaDescriptor>,
    id_route_param: &str,
    relationship: Option<&RelationshipBinding>,
) -> InMemoryDataLayer {
    let mut layer = InMemoryDataLayer::new(schema.type_name())
        .with_id_field(schema.id_field())
        .with_url_param(id_route_param);
    if let Some(binding) = relationship {
        layer = layer.with_relationship_field(binding.name.clone());
    }
    layer
}

fn base_handler(kind: EndpointKind, method: &Method) -> Handler {
    match kind {
        EndpointKind::Collection => {
            if *method == Method::GET {
                adapt(collection::get)
            } else {
                adapt(collection::post)
            }
        }
        EndpointKind::Detail => {
            if *method == Method::GET {
                adapt(detail::get)
            } else if *method == Method::PATCH {
                adapt(detail::patch)
            } else {
                adapt(detail::delete)
            }
        }
        EndpointKind::Relationship => {
            if *method == Method::GET {
                adapt(relationship::get)
            } else if *method == Method::POST {
                adapt(relationship::post)
            } else if *method == Method::PATCH {
                adapt(relationship::patch)
            } else {
                adapt(relationship::delete)
            }
        }
    }
}

/// Registry of endpoint types, keyed by endpoint name.
///
/// Populated once at startup; hosting layers iterate it to mount routes.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    endpoints: BTreeMap<String, Arc<EndpointType>>,
}

impl EndpointRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint type under its name.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicateEndpoint`] when the name is taken.
    pub fn register(&mut self, endpoint: Arc<EndpointType>) -> Result<(), ConfigError> {
        let name = endpoint.name().to_owned();
        if self.endpoints.contains_key(&name) {
            return Err(ConfigError::DuplicateEndpoint(name));
        }
        self.endpoints.insert(name, endpoint);
        Ok(())
    }

    /// Look up an endpoint by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<EndpointType>> {
        self.endpoints.get(name)
    }

    /// Iterate all registered endpoints in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<EndpointType>> {
        self.endpoints.values()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::data_layer::memory::InMemoryFactory;
    use crate::endpoint::{Reply, Request};
    use crate::schema::{FieldKind, SchemaDescriptor};
    use http::StatusCode;
    use serde_json::json;
    use std::sync::Mutex;

    fn schema() -> Arc<SchemaDescriptor> {
        Arc::new(
            SchemaDescriptor::builder("articles")
                .required_attribute("title", FieldKind::String)
                .build(),
        )
    }

    #[tokio::test]
    async fn unimplemented_verbs_are_faults_on_every_kind() {
        let collection = EndpointOptions::collection("articles_list", schema(), "/articles")
            .build()
            .unwrap();
        let detail = EndpointOptions::detail("articles_detail", schema(), "/articles/{id}")
            .build()
            .unwrap();
        let relationship = EndpointOptions::relationship(
            "article_comments",
            schema(),
            "/articles/{id}/relationships/comments",
        )
        .related("comments", "comments", "/articles/{id}/comments")
        .build()
        .unwrap();

        for (endpoint, method) in [
            (&collection, Method::PATCH),
            (&collection, Method::DELETE),
            (&detail, Method::POST),
            (&collection, Method::PUT),
            (&detail, Method::PUT),
            (&relationship, Method::PUT),
        ] {
            let fault = Arc::clone(endpoint)
                .dispatch(Request::new(method.clone()))
                .await
                .unwrap_err();
            assert!(
                matches!(
                    fault,
                    crate::error::EngineFault::UnimplementedMethod { method: m, .. } if m == &method
                ),
                "expected an unimplemented-method fault for {method}"
            );
        }
    }

    #[tokio::test]
    async fn head_aliases_get() {
        let endpoint = EndpointOptions::collection("articles_list", schema(), "/articles")
            .build()
            .unwrap();
        let response = endpoint.dispatch(Request::new(Method::HEAD)).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn disabled_verb_answers_405_regardless_of_arguments() {
        let endpoint = EndpointOptions::collection("articles_list", schema(), "/articles")
            .disable(Method::POST)
            .build()
            .unwrap();
        let request = Request::new(Method::POST)
            .with_body(json!({"data": {"type": "articles", "attributes": {"title": "x"}}}));
        let response = endpoint.dispatch(request).await.unwrap();
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
        let body = response.body.unwrap();
        assert_eq!(body["errors"][0]["status"], "405");
    }

    #[tokio::test]
    async fn middleware_composes_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let tracer = |label: &'static str, order: Arc<Mutex<Vec<&'static str>>>| -> Middleware {
            Arc::new(move |inner: Handler| {
                let order = Arc::clone(&order);
                Arc::new(move |endpoint, request| {
                    order.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(label);
                    inner(endpoint, request)
                })
            })
        };

        let endpoint = EndpointOptions::collection("articles_list", schema(), "/articles")
            .middleware(Method::GET, tracer("first", Arc::clone(&order)))
            .middleware(Method::GET, tracer("second", Arc::clone(&order)))
            .build()
            .unwrap();
        endpoint.dispatch(Request::new(Method::GET)).await.unwrap();

        // The last registered wrapper runs outermost.
        let seen = order.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone();
        assert_eq!(seen, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn middleware_can_short_circuit() {
        let gate: Middleware = Arc::new(|_inner: Handler| {
            Arc::new(|_endpoint, _request| -> crate::endpoint::HandlerFuture {
                Box::pin(async { Ok(Reply::Empty(StatusCode::FORBIDDEN)) })
            }) as Handler
        });
        let endpoint = EndpointOptions::collection("articles_list", schema(), "/articles")
            .middleware(Method::GET, gate)
            .build()
            .unwrap();
        let response = endpoint.dispatch(Request::new(Method::GET)).await.unwrap();
        assert_eq!(response.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn non_mapping_kwargs_fail_fast() {
        let err = EndpointOptions::collection("articles_list", schema(), "/articles")
            .data_layer_factory(Arc::new(InMemoryFactory), json!(["not", "a", "mapping"]))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::DataLayerKwargs { .. }));
    }

    #[test]
    fn factory_kwargs_build_a_layer() {
        let endpoint = EndpointOptions::collection("articles_list", schema(), "/articles")
            .data_layer_factory(Arc::new(InMemoryFactory), json!({"type": "articles"}))
            .build();
        assert!(endpoint.is_ok());
    }

    #[test]
    fn relationship_endpoint_requires_binding() {
        let err = EndpointOptions::relationship(
            "article_comments",
            schema(),
            "/articles/{id}/relationships/comments",
        )
        .build()
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingRelationship(_)));
    }

    #[test]
    fn disabling_an_unsupported_verb_fails_fast() {
        let err = EndpointOptions::collection("articles_list", schema(), "/articles")
            .disable(Method::DELETE)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedMethod { .. }));
    }

    #[test]
    fn registry_rejects_duplicate_names() {
        let mut registry = EndpointRegistry::new();
        let endpoint = EndpointOptions::collection("articles_list", schema(), "/articles")
            .build()
            .unwrap();
        registry.register(Arc::clone(&endpoint)).unwrap();
        let err = registry.register(endpoint).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEndpoint(_)));
        assert!(registry.get("articles_list").is_some());
    }
}
