//! Endpoint types and the three verb-specific state machines.
//!
//! An [`EndpointType`] is the immutable, process-wide configuration of one
//! exposed endpoint: its schema descriptor, persistence-contract instance,
//! URL template, and the per-verb handler table composed once by the
//! [`config`] builder. The three endpoint kinds share the dispatcher and
//! reply normalization by composition — each handler receives the endpoint
//! value and the request, nothing is inherited.
//!
//! Requests flow through [`EndpointType::dispatch`] (in [`dispatch`]) into
//! the kind's handlers ([`collection`], [`detail`], [`relationship`]).

pub mod collection;
pub mod config;
pub mod detail;
pub mod dispatch;
pub mod relationship;

use crate::RouteParams;
use crate::data_layer::DataLayer;
use crate::error::EngineFault;
use crate::links::LinkTemplate;
use crate::query::QueryContext;
use crate::schema::SchemaDescriptor;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// The JSON:API media type, set on every body-bearing response.
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

/// The three endpoint kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// Collection endpoint: GET, POST.
    Collection,
    /// Single-resource endpoint: GET, PATCH, DELETE.
    Detail,
    /// Relationship endpoint: GET, POST, PATCH, DELETE.
    Relationship,
}

const COLLECTION_METHODS: &[Method] = &[Method::GET, Method::POST];
const DETAIL_METHODS: &[Method] = &[Method::GET, Method::PATCH, Method::DELETE];
const RELATIONSHIP_METHODS: &[Method] =
    &[Method::GET, Method::POST, Method::PATCH, Method::DELETE];

impl EndpointKind {
    /// Verbs this kind binds handlers for.
    #[must_use]
    pub fn supported_methods(self) -> &'static [Method] {
        match self {
            Self::Collection => COLLECTION_METHODS,
            Self::Detail => DETAIL_METHODS,
            Self::Relationship => RELATIONSHIP_METHODS,
        }
    }
}

/// An engine-level request: everything the dispatcher needs, already
/// extracted from the transport.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP verb.
    pub method: Method,
    /// Route parameters from the matched URL.
    pub route_params: RouteParams,
    /// Parsed query context.
    pub query: QueryContext,
    /// Parsed JSON body, when the request carried one.
    pub body: Option<Value>,
}

impl Request {
    /// A request with empty route parameters, query, and body.
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            route_params: RouteParams::new(),
            query: QueryContext::new(),
            body: None,
        }
    }

    /// Replace the route parameters.
    #[must_use]
    pub fn with_route_params(mut self, route_params: RouteParams) -> Self {
        self.route_params = route_params;
        self
    }

    /// Replace the query context.
    #[must_use]
    pub fn with_query(mut self, query: QueryContext) -> Self {
        self.query = query;
        self
    }

    /// Attach a parsed JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A canonical engine response: `(body, status, headers)`.
#[derive(Debug, Clone)]
pub struct Response {
    /// JSON body, absent for 204 and empty-body replies.
    pub body: Option<Value>,
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
}

/// A handler's return shape, normalized by the dispatcher.
///
/// The enumeration replaces the ambiguous tuple unpacking of older
/// JSON:API servers: a bare document means 200 with empty headers, and no
/// other shape is representable.
#[derive(Debug, Clone)]
pub enum Reply {
    /// A document at status 200 with no extra headers.
    Document(Value),
    /// A document at an explicit status.
    DocumentWithStatus(Value, StatusCode),
    /// A document with explicit status and headers.
    Full(Value, StatusCode, HeaderMap),
    /// No body at the given status.
    Empty(StatusCode),
}

impl Reply {
    /// Normalize into the canonical `(body, status, headers)` response.
    ///
    /// Body-bearing replies get the JSON:API content type; an empty reply
    /// never carries a body or a content type.
    #[must_use]
    pub fn into_response(self) -> Response {
        let (body, status, mut headers) = match self {
            Self::Document(document) => (Some(document), StatusCode::OK, HeaderMap::new()),
            Self::DocumentWithStatus(document, status) => {
                (Some(document), status, HeaderMap::new())
            }
            Self::Full(document, status, headers) => (Some(document), status, headers),
            Self::Empty(status) => (None, status, HeaderMap::new()),
        };
        if body.is_some() {
            headers.insert(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static(MEDIA_TYPE),
            );
        }
        Response { body, status, headers }
    }
}

/// Boxed future produced by a composed handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Reply, EngineFault>> + Send>>;

/// A composed verb handler bound into an endpoint's handler table.
pub type Handler = Arc<dyn Fn(Arc<EndpointType>, Request) -> HandlerFuture + Send + Sync>;

/// A middleware wrapper around a verb handler.
///
/// Middleware compose at endpoint construction: each wrapper receives the
/// handler built so far and returns the wrapped handler.
pub type Middleware = Arc<dyn Fn(Handler) -> Handler + Send + Sync>;

/// Relationship configuration of a relationship endpoint.
#[derive(Clone)]
pub struct RelationshipBinding {
    /// Relationship name, as exposed in URLs and messages.
    pub name: String,
    /// JSON:API type of the related resource.
    pub related_type: String,
    /// Identifier field of related instances (default `id`).
    pub related_id_field: String,
    /// URL template of the related endpoint.
    pub related_link: LinkTemplate,
    /// Optional mapping of related-link parameters to dotted attribute
    /// paths resolved against the owning instance.
    pub endpoint_kwargs: Option<BTreeMap<String, String>>,
}

/// Immutable configuration of one endpoint.
///
/// Built once by [`config::EndpointOptions::build`], then shared read-only
/// across all concurrent requests; nothing here is mutated after startup.
pub struct EndpointType {
    pub(crate) name: String,
    pub(crate) kind: EndpointKind,
    pub(crate) schema: Arc<SchemaDescriptor>,
    pub(crate) data_layer: Arc<dyn DataLayer>,
    pub(crate) path: LinkTemplate,
    pub(crate) id_route_param: String,
    pub(crate) include_endpoint_kwargs: bool,
    pub(crate) relationship: Option<RelationshipBinding>,
    pub(crate) handlers: HashMap<Method, Handler>,
}

impl EndpointType {
    /// Registered endpoint name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Endpoint kind.
    #[must_use]
    pub const fn kind(&self) -> EndpointKind {
        self.kind
    }

    /// Schema descriptor of the exposed resource type.
    #[must_use]
    pub const fn schema(&self) -> &Arc<SchemaDescriptor> {
        &self.schema
    }

    /// Persistence-contract instance.
    #[must_use]
    pub const fn data_layer(&self) -> &Arc<dyn DataLayer> {
        &self.data_layer
    }

    /// URL template the endpoint is mounted at.
    #[must_use]
    pub const fn path(&self) -> &LinkTemplate {
        &self.path
    }

    /// Route parameter naming the resource identifier.
    #[must_use]
    pub fn id_route_param(&self) -> &str {
        &self.id_route_param
    }

    /// Whether collection links substitute route parameters.
    #[must_use]
    pub const fn include_endpoint_kwargs(&self) -> bool {
        self.include_endpoint_kwargs
    }

    /// The relationship binding of a relationship endpoint.
    ///
    /// # Errors
    ///
    /// [`EngineFault::Misconfigured`] when called on an endpoint built
    /// without one (the configurator prevents this).
    pub fn relationship_binding(&self) -> Result<&RelationshipBinding, EngineFault> {
        self.relationship.as_ref().ok_or_else(|| EngineFault::Misconfigured {
            endpoint: self.name.clone(),
            detail: "missing relationship binding".to_owned(),
        })
    }
}

impl std::fmt::Debug for EndpointType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointType")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("methods", &self.handlers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
