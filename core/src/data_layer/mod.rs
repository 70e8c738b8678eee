//! The persistence contract consumed by the dispatch engine.
//!
//! A [`DataLayer`] is the abstract CRUD/relationship interface every
//! endpoint calls into. The engine owns no storage: it hands the layer a
//! query context and route parameters and maps whatever comes back — a
//! result or a raised [`JsonApiError`] condition — into a response,
//! exactly once, with no retries.
//!
//! # Thread safety
//!
//! A layer instance is the only shared mutable resource that crosses
//! request boundaries. Implementations must be `Send + Sync` and
//! internally synchronized; the engine takes no locks on their behalf.
//!
//! # Dyn compatibility
//!
//! Methods return explicit `Pin<Box<dyn Future>>` instead of `async fn`
//! so endpoint types can hold `Arc<dyn DataLayer>` assembled once at
//! registration time.
//!
//! # Implementations
//!
//! - [`memory::InMemoryDataLayer`]: the default layer, used when endpoint
//!   options name no other implementation and by round-trip tests.
//! - `MockDataLayer` (in `apiary-testing`): scripted responses and call
//!   recording for the endpoint state-machine tests.

pub mod memory;

use crate::RouteParams;
use crate::error::{ConfigError, JsonApiError};
use crate::query::QueryContext;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by every contract operation.
pub type LayerFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, JsonApiError>> + Send + 'a>>;

/// Abstract persistence interface behind every endpoint.
///
/// Resource instances are opaque `serde_json::Value`s; the engine only
/// performs attribute-path lookups on them for link templating and
/// schema-driven serialization.
pub trait DataLayer: Send + Sync {
    /// Fetch a collection: total item count plus the already paginated,
    /// filtered, and sorted items for the supplied query context.
    fn get_collection<'a>(
        &'a self,
        query: &'a QueryContext,
        route: &'a RouteParams,
    ) -> LayerFuture<'a, (u64, Vec<Value>)>;

    /// Fetch one instance by route identifier.
    ///
    /// A miss raises `ObjectNotFound`, optionally at a caller-specified
    /// status.
    fn get_object<'a>(&'a self, route: &'a RouteParams) -> LayerFuture<'a, Value>;

    /// Create an instance from validated data; returns the stored
    /// instance.
    fn create_object<'a>(
        &'a self,
        data: &'a Value,
        route: &'a RouteParams,
    ) -> LayerFuture<'a, Value>;

    /// Apply validated data to a fetched instance; returns the updated
    /// instance.
    fn update_object<'a>(
        &'a self,
        instance: &'a Value,
        data: &'a Value,
        route: &'a RouteParams,
    ) -> LayerFuture<'a, Value>;

    /// Delete a fetched instance.
    fn delete_object<'a>(
        &'a self,
        instance: &'a Value,
        route: &'a RouteParams,
    ) -> LayerFuture<'a, ()>;

    /// Fetch a relationship: the owning instance and its linkage data (a
    /// single identifier, a list, or null depending on cardinality).
    fn get_relation<'a>(
        &'a self,
        related_type: &'a str,
        related_id_field: &'a str,
        route: &'a RouteParams,
    ) -> LayerFuture<'a, (Value, Value)>;

    /// Add members to a to-many relationship from a linkage document.
    fn create_relation<'a>(
        &'a self,
        document: &'a Value,
        related_id_field: &'a str,
        route: &'a RouteParams,
    ) -> LayerFuture<'a, ()>;

    /// Replace a relationship's linkage from a linkage document.
    fn update_relation<'a>(
        &'a self,
        document: &'a Value,
        related_id_field: &'a str,
        route: &'a RouteParams,
    ) -> LayerFuture<'a, ()>;

    /// Remove members of a to-many relationship named in a linkage
    /// document.
    fn delete_relation<'a>(
        &'a self,
        document: &'a Value,
        related_id_field: &'a str,
        route: &'a RouteParams,
    ) -> LayerFuture<'a, ()>;
}

/// Constructs a [`DataLayer`] from a constructor-kwargs record.
///
/// Named in endpoint options when the default layer does not apply; the
/// configurator validates the kwargs record is a mapping before calling
/// [`DataLayerFactory::create`], and any failure here is fail-fast
/// configuration breakage, not a request-time condition.
pub trait DataLayerFactory: Send + Sync {
    /// Build a layer instance from validated kwargs.
    ///
    /// # Errors
    ///
    /// `ConfigError::DataLayer` when the kwargs are unusable.
    fn create(
        &self,
        kwargs: &serde_json::Map<String, Value>,
    ) -> Result<Arc<dyn DataLayer>, ConfigError>;
}
