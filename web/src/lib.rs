//! Axum integration for the Apiary JSON:API dispatch engine.
//!
//! This crate is the hosting layer the engine expects: it owns transport
//! concerns and keeps the engine free of any web framework dependency.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          Hosting layer (this crate)         │  ← routing, media types
//! │  - Query-string → QueryContext              │  ← HTTP tracing
//! │  - Body bytes → JSON document               │
//! │  - Engine fault → logged 500 envelope       │
//! ├─────────────────────────────────────────────┤
//! │          Dispatch engine (apiary-core)      │
//! │  - Endpoint state machines                  │  ← framework-free
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use apiary_core::{EndpointOptions, EndpointRegistry};
//! use apiary_web::router::mount;
//!
//! let mut registry = EndpointRegistry::new();
//! registry.register(
//!     EndpointOptions::collection("articles_list", schema, "/articles").build()?,
//! )?;
//!
//! let app = mount(&registry);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod media;
pub mod query;
pub mod router;

// Re-export key entry points for convenience
pub use media::{MediaTypeLayer, media_type_layer};
pub use query::parse as parse_query;
pub use router::mount;
