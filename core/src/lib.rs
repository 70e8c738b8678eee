//! JSON:API resource and relationship dispatch engine.
//!
//! This crate turns incoming HTTP requests into calls against an abstract
//! persistence contract and turns the results — or raised conditions —
//! into canonical JSON:API responses: collections, single resources, and
//! relationships, with sparse fieldsets, compound-document inclusion,
//! pagination metadata, and structured error objects.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            Hosting layer (apiary-web)        │  ← routing, media types
//! │  - Request assembly (query, body, params)    │  ← fault → 500 translation
//! ├──────────────────────────────────────────────┤
//! │            Dispatch engine (this crate)      │
//! │  - Verb resolution + reply normalization     │  ← HEAD aliases GET
//! │  - Collection / Detail / Relationship        │  ← the three state machines
//! │  - Schema transform (fieldsets, includes)    │  ← 400/409/422 taxonomy
//! ├──────────────────────────────────────────────┤
//! │            Persistence contract              │
//! │  - `DataLayer` trait (`Arc<dyn DataLayer>`)  │  ← the only shared
//! │  - In-memory default implementation          │    mutable resource
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Request flow
//!
//! 1. The host assembles an [`endpoint::Request`] (route params, parsed
//!    query context, optional JSON body).
//! 2. [`endpoint::EndpointType::dispatch`] resolves the verb handler and
//!    runs the endpoint kind's state machine.
//! 3. The handler calls the [`data_layer::DataLayer`] contract and the
//!    schema transform adapter.
//! 4. A raised [`error::JsonApiError`] is mapped — once, immediately —
//!    into an error envelope; an [`error::EngineFault`] aborts the request
//!    path for the host to translate.
//!
//! # Example
//!
//! ```ignore
//! use apiary_core::endpoint::config::{EndpointOptions, EndpointRegistry};
//! use apiary_core::schema::{FieldKind, SchemaDescriptor};
//! use std::sync::Arc;
//!
//! let schema = Arc::new(
//!     SchemaDescriptor::builder("articles")
//!         .required_attribute("title", FieldKind::String)
//!         .build(),
//! );
//!
//! let mut registry = EndpointRegistry::new();
//! registry.register(
//!     EndpointOptions::collection("articles_list", Arc::clone(&schema), "/articles")
//!         .build()?,
//! )?;
//! registry.register(
//!     EndpointOptions::detail("articles_detail", schema, "/articles/{id}")
//!         .build()?,
//! )?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod data_layer;
pub mod document;
pub mod endpoint;
pub mod error;
pub mod links;
pub mod pagination;
pub mod query;
pub mod schema;

/// Route parameters extracted from the matched URL, keyed by parameter
/// name.
pub type RouteParams = std::collections::BTreeMap<String, String>;

// Re-export key types for convenience
pub use data_layer::{DataLayer, DataLayerFactory};
pub use endpoint::config::{EndpointOptions, EndpointRegistry};
pub use endpoint::{EndpointKind, EndpointType, Reply, Request, Response};
pub use error::{ConfigError, EngineFault, ErrorKind, JsonApiError};
pub use query::QueryContext;
pub use schema::{FieldKind, SchemaDescriptor};
