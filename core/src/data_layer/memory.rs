//! In-memory persistence layer.
//!
//! The default [`DataLayer`] implementation: a thread-safe map of
//! identifier → instance per layer. It implements the full contract —
//! filtering, sorting, and pagination for collection fetches, and
//! embedded-linkage relationship operations — which makes it the layer of
//! choice for tests and for endpoints registered without an explicit
//! layer.
//!
//! Relationship linkage is stored inside the owning instance: a to-many
//! relationship field holds an array of related identifiers (or embedded
//! objects), a to-one field holds a single identifier or object.

use super::{DataLayer, DataLayerFactory, LayerFuture};
use crate::RouteParams;
use crate::error::{ConfigError, JsonApiError};
use crate::query::{FilterOp, QueryContext, SortOrder};
use serde_json::{Map, Value, json};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, PoisonError, RwLock};

/// Thread-safe in-memory data layer for one resource type.
pub struct InMemoryDataLayer {
    type_name: String,
    id_field: String,
    url_param: String,
    relationship_field: Option<String>,
    store: RwLock<BTreeMap<String, Value>>,
    next_id: AtomicU64,
}

impl InMemoryDataLayer {
    /// Create an empty layer for `type_name`, keyed by `id`, reading the
    /// route parameter `id`.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id_field: "id".to_owned(),
            url_param: "id".to_owned(),
            relationship_field: None,
            store: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Override the instance identifier field.
    #[must_use]
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Override the route parameter naming the identifier.
    #[must_use]
    pub fn with_url_param(mut self, url_param: impl Into<String>) -> Self {
        self.url_param = url_param.into();
        self
    }

    /// Set the instance field holding relationship linkage.
    #[must_use]
    pub fn with_relationship_field(mut self, field: impl Into<String>) -> Self {
        self.relationship_field = Some(field.into());
        self
    }

    /// Insert an instance, assigning an identifier when it has none.
    /// Returns the identifier.
    pub fn insert(&self, mut instance: Value) -> String {
        let id = instance
            .get(&self.id_field)
            .and_then(scalar_string)
            .unwrap_or_else(|| self.next_id.fetch_add(1, AtomicOrdering::SeqCst).to_string());
        if let Some(object) = instance.as_object_mut() {
            object.insert(self.id_field.clone(), Value::String(id.clone()));
        }
        self.write().insert(id.clone(), instance);
        id
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Value>> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Value>> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn route_id(&self, route: &RouteParams) -> Result<String, JsonApiError> {
        route.get(&self.url_param).cloned().ok_or_else(|| {
            JsonApiError::object_not_found(format!(
                "no {} route parameter for {}",
                self.url_param, self.type_name
            ))
        })
    }

    fn fetch(&self, route: &RouteParams) -> Result<Value, JsonApiError> {
        let id = self.route_id(route)?;
        self.read().get(&id).cloned().ok_or_else(|| {
            JsonApiError::object_not_found(format!(
                "{}: {id} could not be found",
                self.type_name
            ))
        })
    }

    fn relation_field(&self, related_type: &str) -> String {
        self.relationship_field
            .clone()
            .unwrap_or_else(|| related_type.to_owned())
    }

    fn instance_id(&self, instance: &Value) -> Option<String> {
        instance.get(&self.id_field).and_then(scalar_string)
    }
}

impl DataLayer for InMemoryDataLayer {
    fn get_collection<'a>(
        &'a self,
        query: &'a QueryContext,
        _route: &'a RouteParams,
    ) -> LayerFuture<'a, (u64, Vec<Value>)> {
        Box::pin(async move {
            let mut items: Vec<Value> = self.read().values().cloned().collect();

            items.retain(|item| {
                query.filters().iter().all(|clause| {
                    item.get(&clause.name)
                        .is_some_and(|value| matches_filter(value, clause.op, &clause.val))
                })
            });

            for sort in query.sort().iter().rev() {
                items.sort_by(|a, b| {
                    let ordering = compare_values(a.get(&sort.field), b.get(&sort.field));
                    match sort.order {
                        SortOrder::Asc => ordering,
                        SortOrder::Desc => ordering.reverse(),
                    }
                });
            }

            let count = items.len() as u64;
            let page = query.page();
            let paged = if page.size() == 0 {
                items
            } else {
                let size = usize::try_from(page.size()).unwrap_or(usize::MAX);
                let start = usize::try_from((page.number() - 1).saturating_mul(page.size()))
                    .unwrap_or(usize::MAX);
                items.into_iter().skip(start).take(size).collect()
            };
            Ok((count, paged))
        })
    }

    fn get_object<'a>(&'a self, route: &'a RouteParams) -> LayerFuture<'a, Value> {
        Box::pin(async move { self.fetch(route) })
    }

    fn create_object<'a>(
        &'a self,
        data: &'a Value,
        _route: &'a RouteParams,
    ) -> LayerFuture<'a, Value> {
        Box::pin(async move {
            let id = self.insert(data.clone());
            self.read().get(&id).cloned().ok_or_else(|| {
                JsonApiError::object_not_found(format!(
                    "{}: {id} could not be found",
                    self.type_name
                ))
            })
        })
    }

    fn update_object<'a>(
        &'a self,
        instance: &'a Value,
        data: &'a Value,
        _route: &'a RouteParams,
    ) -> LayerFuture<'a, Value> {
        Box::pin(async move {
            let id = self.instance_id(instance).ok_or_else(|| {
                JsonApiError::object_not_found(format!(
                    "{} instance has no identifier",
                    self.type_name
                ))
            })?;
            let mut store = self.write();
            let stored = store.get_mut(&id).ok_or_else(|| {
                JsonApiError::object_not_found(format!(
                    "{}: {id} could not be found",
                    self.type_name
                ))
            })?;
            if let (Some(target), Some(updates)) = (stored.as_object_mut(), data.as_object()) {
                for (key, value) in updates {
                    if key != &self.id_field {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
            Ok(stored.clone())
        })
    }

    fn delete_object<'a>(
        &'a self,
        instance: &'a Value,
        _route: &'a RouteParams,
    ) -> LayerFuture<'a, ()> {
        Box::pin(async move {
            if let Some(id) = self.instance_id(instance) {
                self.write().remove(&id);
            }
            Ok(())
        })
    }

    fn get_relation<'a>(
        &'a self,
        related_type: &'a str,
        related_id_field: &'a str,
        route: &'a RouteParams,
    ) -> LayerFuture<'a, (Value, Value)> {
        Box::pin(async move {
            let owner = self.fetch(route)?;
            let field = self.relation_field(related_type);
            let embedded = owner.get(&field).ok_or_else(|| {
                JsonApiError::relation_not_found(format!(
                    "{} has no relation {field}",
                    self.type_name
                ))
            })?;
            let linkage = match embedded {
                Value::Array(items) => Value::Array(
                    items
                        .iter()
                        .map(|item| identifier_for(related_type, related_id_field, item))
                        .collect(),
                ),
                Value::Null => Value::Null,
                single => identifier_for(related_type, related_id_field, single),
            };
            Ok((owner.clone(), linkage))
        })
    }

    fn create_relation<'a>(
        &'a self,
        document: &'a Value,
        _related_id_field: &'a str,
        route: &'a RouteParams,
    ) -> LayerFuture<'a, ()> {
        Box::pin(async move {
            let id = self.route_id(route)?;
            let field = self.document_relation_field(document)?;
            let new_ids = linkage_ids(document);
            let mut store = self.write();
            let owner = store.get_mut(&id).ok_or_else(|| {
                JsonApiError::object_not_found(format!(
                    "{}: {id} could not be found",
                    self.type_name
                ))
            })?;
            let members = owner
                .get_mut(&field)
                .and_then(Value::as_array_mut)
                .ok_or_else(|| {
                    JsonApiError::relation_not_found(format!(
                        "{} has no relation {field}",
                        self.type_name
                    ))
                })?;
            for new_id in new_ids {
                if !members.iter().any(|m| member_id(m).as_deref() == Some(new_id.as_str())) {
                    members.push(Value::String(new_id));
                }
            }
            Ok(())
        })
    }

    fn update_relation<'a>(
        &'a self,
        document: &'a Value,
        _related_id_field: &'a str,
        route: &'a RouteParams,
    ) -> LayerFuture<'a, ()> {
        Box::pin(async move {
            let id = self.route_id(route)?;
            let field = self.document_relation_field(document)?;
            let replacement = match document.get("data") {
                Some(Value::Array(items)) => Value::Array(
                    items
                        .iter()
                        .filter_map(|item| item.get("id").and_then(scalar_string))
                        .map(Value::String)
                        .collect(),
                ),
                Some(Value::Object(item)) => item
                    .get("id")
                    .and_then(scalar_string)
                    .map_or(Value::Null, Value::String),
                _ => Value::Null,
            };
            let mut store = self.write();
            let owner = store.get_mut(&id).ok_or_else(|| {
                JsonApiError::object_not_found(format!(
                    "{}: {id} could not be found",
                    self.type_name
                ))
            })?;
            match owner.get_mut(&field) {
                Some(slot) => {
                    *slot = replacement;
                    Ok(())
                }
                None => Err(JsonApiError::relation_not_found(format!(
                    "{} has no relation {field}",
                    self.type_name
                ))),
            }
        })
    }

    fn delete_relation<'a>(
        &'a self,
        document: &'a Value,
        _related_id_field: &'a str,
        route: &'a RouteParams,
    ) -> LayerFuture<'a, ()> {
        Box::pin(async move {
            let id = self.route_id(route)?;
            let field = self.document_relation_field(document)?;
            let removed: Vec<String> = linkage_ids(document);
            let mut store = self.write();
            let owner = store.get_mut(&id).ok_or_else(|| {
                JsonApiError::relation_not_found(format!(
                    "{}: {id} could not be found",
                    self.type_name
                ))
            })?;
            let members = owner
                .get_mut(&field)
                .and_then(Value::as_array_mut)
                .ok_or_else(|| {
                    JsonApiError::relation_not_found(format!(
                        "{} has no relation {field}",
                        self.type_name
                    ))
                })?;
            members.retain(|m| {
                member_id(m)
                    .as_deref()
                    .is_none_or(|id| !removed.iter().any(|r| r.as_str() == id))
            });
            Ok(())
        })
    }
}

impl InMemoryDataLayer {
    fn document_relation_field(&self, document: &Value) -> Result<String, JsonApiError> {
        self.relationship_field
            .clone()
            .or_else(|| {
                document
                    .get("data")
                    .and_then(|data| match data {
                        Value::Array(items) => items.first(),
                        single => Some(single),
                    })
                    .and_then(|item| item.get("type"))
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            })
            .ok_or_else(|| {
                JsonApiError::relation_not_found(format!(
                    "{} has no configured relation",
                    self.type_name
                ))
            })
    }
}

/// Factory for [`InMemoryDataLayer`], consuming the kwargs grammar
/// `{"type": ..., "id_field"?, "url_param"?, "relationship_field"?}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryFactory;

impl DataLayerFactory for InMemoryFactory {
    fn create(
        &self,
        kwargs: &Map<String, Value>,
    ) -> Result<Arc<dyn DataLayer>, ConfigError> {
        let type_name = kwargs
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ConfigError::DataLayer("missing `type` kwarg".to_owned()))?;
        let mut layer = InMemoryDataLayer::new(type_name);
        if let Some(id_field) = kwargs.get("id_field").and_then(Value::as_str) {
            layer = layer.with_id_field(id_field);
        }
        if let Some(url_param) = kwargs.get("url_param").and_then(Value::as_str) {
            layer = layer.with_url_param(url_param);
        }
        if let Some(field) = kwargs.get("relationship_field").and_then(Value::as_str) {
            layer = layer.with_relationship_field(field);
        }
        Ok(Arc::new(layer))
    }
}

fn identifier_for(related_type: &str, related_id_field: &str, member: &Value) -> Value {
    let id = member_id_with(related_id_field, member);
    json!({"type": related_type, "id": id.map_or(Value::Null, Value::String)})
}

fn member_id(member: &Value) -> Option<String> {
    member_id_with("id", member)
}

fn member_id_with(id_field: &str, member: &Value) -> Option<String> {
    match member {
        Value::Object(_) => member.get(id_field).and_then(scalar_string),
        other => scalar_string(other),
    }
}

fn linkage_ids(document: &Value) -> Vec<String> {
    match document.get("data") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.get("id").and_then(scalar_string))
            .collect(),
        Some(Value::Object(item)) => item
            .get("id")
            .and_then(scalar_string)
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn matches_filter(value: &Value, op: FilterOp, operand: &Value) -> bool {
    match op {
        FilterOp::Eq => value == operand,
        FilterOp::Ne => value != operand,
        FilterOp::Lt => compare_values(Some(value), Some(operand)) == Ordering::Less,
        FilterOp::Le => compare_values(Some(value), Some(operand)) != Ordering::Greater,
        FilterOp::Gt => compare_values(Some(value), Some(operand)) == Ordering::Greater,
        FilterOp::Ge => compare_values(Some(value), Some(operand)) != Ordering::Less,
        FilterOp::Contains => match (value, operand) {
            (Value::String(haystack), Value::String(needle)) => haystack.contains(needle),
            (Value::Array(items), needle) => items.contains(needle),
            _ => false,
        },
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::query::{FilterClause, PageParams, SortField};

    fn layer() -> InMemoryDataLayer {
        let layer = InMemoryDataLayer::new("articles");
        for (title, pages) in [("Typee", 325), ("Omoo", 340), ("Moby-Dick", 635)] {
            layer.insert(json!({"title": title, "pages": pages, "comments": []}));
        }
        layer
    }

    fn route(id: &str) -> RouteParams {
        RouteParams::from([("id".to_owned(), id.to_owned())])
    }

    #[tokio::test]
    async fn collection_reports_total_count_before_paging() {
        let layer = layer();
        let query = QueryContext::new()
            .with_page(PageParams { number: Some(1), size: Some(2) });
        let (count, items) = layer.get_collection(&query, &RouteParams::new()).await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn collection_filters_and_sorts() {
        let layer = layer();
        let query = QueryContext::new()
            .with_filters(vec![FilterClause {
                name: "pages".to_owned(),
                op: FilterOp::Gt,
                val: json!(330),
            }])
            .with_sort(vec![SortField {
                field: "pages".to_owned(),
                order: SortOrder::Desc,
            }]);
        let (count, items) = layer.get_collection(&query, &RouteParams::new()).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(items[0]["title"], "Moby-Dick");
        assert_eq!(items[1]["title"], "Omoo");
    }

    #[tokio::test]
    async fn object_round_trip() {
        let layer = layer();
        let created = layer
            .create_object(&json!({"title": "Pierre", "pages": 500}), &RouteParams::new())
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap().to_owned();
        let fetched = layer.get_object(&route(&id)).await.unwrap();
        assert_eq!(fetched["title"], "Pierre");

        let updated = layer
            .update_object(&fetched, &json!({"pages": 501}), &route(&id))
            .await
            .unwrap();
        assert_eq!(updated["pages"], 501);
        assert_eq!(updated["title"], "Pierre");

        layer.delete_object(&updated, &route(&id)).await.unwrap();
        let err = layer.get_object(&route(&id)).await.unwrap_err();
        assert_eq!(err.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let err = layer().get_object(&route("999")).await.unwrap_err();
        assert_eq!(err.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn relation_lifecycle() {
        let layer = InMemoryDataLayer::new("articles").with_relationship_field("comments");
        let id = layer.insert(json!({"title": "Typee", "comments": []}));
        let route = route(&id);

        let add = json!({"data": [{"type": "comments", "id": "10"}]});
        layer.create_relation(&add, "id", &route).await.unwrap();
        let (_, linkage) = layer.get_relation("comments", "id", &route).await.unwrap();
        assert_eq!(linkage, json!([{"type": "comments", "id": "10"}]));

        let replace = json!({"data": [{"type": "comments", "id": "11"}]});
        layer.update_relation(&replace, "id", &route).await.unwrap();
        let (_, linkage) = layer.get_relation("comments", "id", &route).await.unwrap();
        assert_eq!(linkage, json!([{"type": "comments", "id": "11"}]));

        layer.delete_relation(&replace, "id", &route).await.unwrap();
        let (_, linkage) = layer.get_relation("comments", "id", &route).await.unwrap();
        assert_eq!(linkage, json!([]));
    }

    #[tokio::test]
    async fn unknown_relation_is_relation_not_found() {
        let layer = InMemoryDataLayer::new("articles").with_relationship_field("tags");
        let id = layer.insert(json!({"title": "Typee"}));
        let err = layer.get_relation("tags", "id", &route(&id)).await.unwrap_err();
        assert_eq!(err.status().as_u16(), 404);
        assert_eq!(err.kind(), crate::error::ErrorKind::RelationNotFound);
    }

    #[test]
    fn factory_requires_type_kwarg() {
        let factory = InMemoryFactory;
        assert!(factory.create(&Map::new()).is_err());
        let mut kwargs = Map::new();
        kwargs.insert("type".to_owned(), json!("articles"));
        assert!(factory.create(&kwargs).is_ok());
    }
}
