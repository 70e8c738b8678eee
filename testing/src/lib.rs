//! # Apiary Testing
//!
//! Testing utilities for the Apiary dispatch engine:
//!
//! - [`mocks::MockDataLayer`]: a scripted persistence layer that records
//!   every contract call, for asserting both responses and the *absence*
//!   of persistence calls after validation failures.
//! - [`builders`]: small JSON:API document builders for request bodies.
//!
//! ## Example
//!
//! ```ignore
//! use apiary_testing::mocks::{LayerCall, MockDataLayer};
//!
//! let layer = MockDataLayer::new().on_collection(7, items);
//! let endpoint = EndpointOptions::collection("articles_list", schema, "/articles")
//!     .data_layer(layer.clone().into_arc())
//!     .build()?;
//!
//! // ... dispatch ...
//! assert_eq!(layer.calls(), vec![LayerCall::GetCollection]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Mock implementations of the persistence contract.
pub mod mocks {
    use apiary_core::data_layer::{DataLayer, LayerFuture};
    use apiary_core::error::JsonApiError;
    use apiary_core::query::QueryContext;
    use apiary_core::RouteParams;
    use serde_json::{Map, Value};
    use std::sync::{Arc, Mutex, PoisonError};

    /// One recorded persistence-contract invocation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LayerCall {
        /// `get_collection` was invoked.
        GetCollection,
        /// `get_object` was invoked.
        GetObject,
        /// `create_object` was invoked.
        CreateObject,
        /// `update_object` was invoked.
        UpdateObject,
        /// `delete_object` was invoked.
        DeleteObject,
        /// `get_relation` was invoked.
        GetRelation,
        /// `create_relation` was invoked.
        CreateRelation,
        /// `update_relation` was invoked.
        UpdateRelation,
        /// `delete_relation` was invoked.
        DeleteRelation,
    }

    #[derive(Default)]
    struct Script {
        collection: Option<(u64, Vec<Value>)>,
        object: Option<Result<Value, JsonApiError>>,
        created: Option<Result<Value, JsonApiError>>,
        updated: Option<Result<Value, JsonApiError>>,
        relation: Option<Result<(Value, Value), JsonApiError>>,
        create_relation: Option<Result<(), JsonApiError>>,
        update_relation: Option<Result<(), JsonApiError>>,
        delete_relation: Option<Result<(), JsonApiError>>,
    }

    /// A scripted [`DataLayer`] that records every call.
    ///
    /// Unscripted operations fall back to simple defaults: an empty
    /// collection, a 404 object miss, a 404 relation miss, echoing
    /// creation (with `id` `"1"` assigned when absent), field-merging
    /// update, and successful mutations.
    #[derive(Clone, Default)]
    pub struct MockDataLayer {
        script: Arc<Mutex<Script>>,
        calls: Arc<Mutex<Vec<LayerCall>>>,
    }

    impl MockDataLayer {
        /// A mock with default behavior and an empty call log.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Wrap into the `Arc<dyn DataLayer>` endpoints hold.
        #[must_use]
        pub fn into_arc(self) -> Arc<dyn DataLayer> {
            Arc::new(self)
        }

        /// Script `get_collection`: total count plus page items.
        #[must_use]
        pub fn on_collection(self, count: u64, items: Vec<Value>) -> Self {
            self.script().collection = Some((count, items));
            self
        }

        /// Script `get_object` to succeed with `instance`.
        #[must_use]
        pub fn on_object(self, instance: Value) -> Self {
            self.script().object = Some(Ok(instance));
            self
        }

        /// Script `get_object` to fail with `error`.
        #[must_use]
        pub fn on_object_error(self, error: JsonApiError) -> Self {
            self.script().object = Some(Err(error));
            self
        }

        /// Script `create_object` to succeed with `instance`.
        #[must_use]
        pub fn on_created(self, instance: Value) -> Self {
            self.script().created = Some(Ok(instance));
            self
        }

        /// Script `update_object` to succeed with `instance`.
        #[must_use]
        pub fn on_updated(self, instance: Value) -> Self {
            self.script().updated = Some(Ok(instance));
            self
        }

        /// Script `get_relation`: the owning instance and linkage data.
        #[must_use]
        pub fn on_relation(self, owner: Value, linkage: Value) -> Self {
            self.script().relation = Some(Ok((owner, linkage)));
            self
        }

        /// Script `get_relation` to fail with `error`.
        #[must_use]
        pub fn on_relation_error(self, error: JsonApiError) -> Self {
            self.script().relation = Some(Err(error));
            self
        }

        /// Script `create_relation`'s outcome.
        #[must_use]
        pub fn on_create_relation(self, result: Result<(), JsonApiError>) -> Self {
            self.script().create_relation = Some(result);
            self
        }

        /// Script `update_relation`'s outcome.
        #[must_use]
        pub fn on_update_relation(self, result: Result<(), JsonApiError>) -> Self {
            self.script().update_relation = Some(result);
            self
        }

        /// Script `delete_relation`'s outcome.
        #[must_use]
        pub fn on_delete_relation(self, result: Result<(), JsonApiError>) -> Self {
            self.script().delete_relation = Some(result);
            self
        }

        /// Every contract call made so far, in order.
        #[must_use]
        pub fn calls(&self) -> Vec<LayerCall> {
            self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }

        fn script(&self) -> std::sync::MutexGuard<'_, Script> {
            self.script.lock().unwrap_or_else(PoisonError::into_inner)
        }

        fn record(&self, call: LayerCall) {
            self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
        }
    }

    impl DataLayer for MockDataLayer {
        fn get_collection<'a>(
            &'a self,
            _query: &'a QueryContext,
            _route: &'a RouteParams,
        ) -> LayerFuture<'a, (u64, Vec<Value>)> {
            self.record(LayerCall::GetCollection);
            let result = self.script().collection.clone().unwrap_or((0, Vec::new()));
            Box::pin(async move { Ok(result) })
        }

        fn get_object<'a>(&'a self, _route: &'a RouteParams) -> LayerFuture<'a, Value> {
            self.record(LayerCall::GetObject);
            let result = self
                .script()
                .object
                .clone()
                .unwrap_or_else(|| Err(JsonApiError::object_not_found("no object scripted")));
            Box::pin(async move { result })
        }

        fn create_object<'a>(
            &'a self,
            data: &'a Value,
            _route: &'a RouteParams,
        ) -> LayerFuture<'a, Value> {
            self.record(LayerCall::CreateObject);
            let result = self.script().created.clone().unwrap_or_else(|| {
                let mut created = data.as_object().cloned().unwrap_or_else(Map::new);
                created
                    .entry("id".to_owned())
                    .or_insert_with(|| Value::String("1".to_owned()));
                Ok(Value::Object(created))
            });
            Box::pin(async move { result })
        }

        fn update_object<'a>(
            &'a self,
            instance: &'a Value,
            data: &'a Value,
            _route: &'a RouteParams,
        ) -> LayerFuture<'a, Value> {
            self.record(LayerCall::UpdateObject);
            let result = self.script().updated.clone().unwrap_or_else(|| {
                let mut merged = instance.as_object().cloned().unwrap_or_else(Map::new);
                if let Some(updates) = data.as_object() {
                    for (key, value) in updates {
                        merged.insert(key.clone(), value.clone());
                    }
                }
                Ok(Value::Object(merged))
            });
            Box::pin(async move { result })
        }

        fn delete_object<'a>(
            &'a self,
            _instance: &'a Value,
            _route: &'a RouteParams,
        ) -> LayerFuture<'a, ()> {
            self.record(LayerCall::DeleteObject);
            Box::pin(async { Ok(()) })
        }

        fn get_relation<'a>(
            &'a self,
            _related_type: &'a str,
            _related_id_field: &'a str,
            _route: &'a RouteParams,
        ) -> LayerFuture<'a, (Value, Value)> {
            self.record(LayerCall::GetRelation);
            let result = self
                .script()
                .relation
                .clone()
                .unwrap_or_else(|| Err(JsonApiError::relation_not_found("no relation scripted")));
            Box::pin(async move { result })
        }

        fn create_relation<'a>(
            &'a self,
            _document: &'a Value,
            _related_id_field: &'a str,
            _route: &'a RouteParams,
        ) -> LayerFuture<'a, ()> {
            self.record(LayerCall::CreateRelation);
            let result = self.script().create_relation.clone().unwrap_or(Ok(()));
            Box::pin(async move { result })
        }

        fn update_relation<'a>(
            &'a self,
            _document: &'a Value,
            _related_id_field: &'a str,
            _route: &'a RouteParams,
        ) -> LayerFuture<'a, ()> {
            self.record(LayerCall::UpdateRelation);
            let result = self.script().update_relation.clone().unwrap_or(Ok(()));
            Box::pin(async move { result })
        }

        fn delete_relation<'a>(
            &'a self,
            _document: &'a Value,
            _related_id_field: &'a str,
            _route: &'a RouteParams,
        ) -> LayerFuture<'a, ()> {
            self.record(LayerCall::DeleteRelation);
            let result = self.script().delete_relation.clone().unwrap_or(Ok(()));
            Box::pin(async move { result })
        }
    }
}

/// JSON:API document builders for request bodies.
pub mod builders {
    use serde_json::{Value, json};

    /// A resource document: `{"data": {"type", "attributes"}}`.
    #[must_use]
    pub fn resource_doc(type_name: &str, attributes: Value) -> Value {
        json!({"data": {"type": type_name, "attributes": attributes}})
    }

    /// A resource document carrying an `id`.
    #[must_use]
    pub fn resource_doc_with_id(type_name: &str, id: &str, attributes: Value) -> Value {
        json!({"data": {"type": type_name, "id": id, "attributes": attributes}})
    }

    /// A single resource identifier object.
    #[must_use]
    pub fn identifier(type_name: &str, id: &str) -> Value {
        json!({"type": type_name, "id": id})
    }

    /// A to-many linkage document: `{"data": [{type, id}, ...]}`.
    #[must_use]
    pub fn linkage_list(type_name: &str, ids: &[&str]) -> Value {
        let items: Vec<Value> = ids.iter().map(|id| identifier(type_name, id)).collect();
        json!({"data": items})
    }

    /// A to-one linkage document: `{"data": {type, id}}`.
    #[must_use]
    pub fn linkage_one(type_name: &str, id: &str) -> Value {
        json!({"data": identifier(type_name, id)})
    }
}
