//! Schema descriptors and the schema transform adapter.
//!
//! A [`SchemaDescriptor`] declares what one resource type looks like on
//! the wire: its JSON:API type name, identifier field, attributes (with
//! kinds and required flags), and relationships. Descriptors are built
//! once at registration time and shared read-only.
//!
//! A [`SchemaView`] is the per-request projection of a descriptor: it
//! honors the query context's sparse fieldsets and include paths, and it
//! owns both directions of the transform —
//!
//! - serialization of opaque resource instances into resource objects,
//!   linkage, and compound-document `included` sections, and
//! - deserialization of request documents into validated attribute maps,
//!   with a Result-shaped outcome: either the validated data or a single
//!   [`JsonApiError`] aggregating every field-level failure.

use crate::error::{ErrorSource, JsonApiError};
use crate::query::QueryContext;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Wire kind of an attribute, checked during deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Accept any JSON value, including null.
    Any,
    /// JSON string.
    String,
    /// JSON integer.
    Integer,
    /// Any JSON number.
    Number,
    /// JSON boolean.
    Boolean,
    /// JSON array.
    Array,
    /// JSON object.
    Object,
}

impl FieldKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    fn expectation(self) -> &'static str {
        match self {
            Self::Any => "Not a valid value.",
            Self::String => "Not a valid string.",
            Self::Integer => "Not a valid integer.",
            Self::Number => "Not a valid number.",
            Self::Boolean => "Not a valid boolean.",
            Self::Array => "Not a valid list.",
            Self::Object => "Not a valid mapping.",
        }
    }
}

/// One declared attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Attribute name.
    pub name: String,
    /// Wire kind.
    pub kind: FieldKind,
    /// Whether full (non-partial) validation requires the attribute.
    pub required: bool,
}

/// One declared relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDescriptor {
    /// Relationship name.
    pub name: String,
    /// JSON:API type of the related resource.
    pub related_type: String,
    /// Identifier field on embedded related instances.
    pub related_id_field: String,
    /// Whether the relationship is to-many.
    pub many: bool,
}

/// Declarative description of one resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    type_name: String,
    id_field: String,
    fields: Vec<FieldDescriptor>,
    relationships: Vec<RelationshipDescriptor>,
}

impl SchemaDescriptor {
    /// Start a descriptor for the given JSON:API type name.
    #[must_use]
    pub fn builder(type_name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            type_name: type_name.into(),
            id_field: "id".to_owned(),
            fields: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// The declared JSON:API type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The identifier field name.
    #[must_use]
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Declared attributes.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Declared relationships.
    #[must_use]
    pub fn relationships(&self) -> &[RelationshipDescriptor] {
        &self.relationships
    }

    /// Look up a declared attribute.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a declared relationship.
    #[must_use]
    pub fn relationship(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Whether `name` names a declared attribute or relationship.
    #[must_use]
    pub fn has_member(&self, name: &str) -> bool {
        self.field(name).is_some() || self.relationship(name).is_some()
    }
}

/// Builder for [`SchemaDescriptor`].
#[derive(Debug)]
pub struct SchemaBuilder {
    type_name: String,
    id_field: String,
    fields: Vec<FieldDescriptor>,
    relationships: Vec<RelationshipDescriptor>,
}

impl SchemaBuilder {
    /// Override the identifier field (default `id`).
    #[must_use]
    pub fn id_field(mut self, name: impl Into<String>) -> Self {
        self.id_field = name.into();
        self
    }

    /// Declare an optional attribute.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDescriptor { name: name.into(), kind, required: false });
        self
    }

    /// Declare a required attribute.
    #[must_use]
    pub fn required_attribute(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDescriptor { name: name.into(), kind, required: true });
        self
    }

    /// Declare a to-one relationship.
    #[must_use]
    pub fn relationship(mut self, name: impl Into<String>, related_type: impl Into<String>) -> Self {
        self.relationships.push(RelationshipDescriptor {
            name: name.into(),
            related_type: related_type.into(),
            related_id_field: "id".to_owned(),
            many: false,
        });
        self
    }

    /// Declare a to-many relationship.
    #[must_use]
    pub fn relationship_many(
        mut self,
        name: impl Into<String>,
        related_type: impl Into<String>,
    ) -> Self {
        self.relationships.push(RelationshipDescriptor {
            name: name.into(),
            related_type: related_type.into(),
            related_id_field: "id".to_owned(),
            many: true,
        });
        self
    }

    /// Finish the descriptor.
    #[must_use]
    pub fn build(self) -> SchemaDescriptor {
        SchemaDescriptor {
            type_name: self.type_name,
            id_field: self.id_field,
            fields: self.fields,
            relationships: self.relationships,
        }
    }
}

/// Serialization mode of a [`SchemaView`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaParams {
    /// List serialization (collection GET).
    pub many: bool,
    /// Partial validation: unspecified fields are not required (PATCH).
    pub partial: bool,
}

/// A per-request projection of a schema descriptor.
#[derive(Debug, Clone)]
pub struct SchemaView {
    schema: Arc<SchemaDescriptor>,
    params: SchemaParams,
    own_fields: Option<Vec<String>>,
    fields_by_type: std::collections::BTreeMap<String, Vec<String>>,
    include: Vec<String>,
}

impl SchemaView {
    /// Compute a view from the query context.
    ///
    /// Sparse fieldsets for the descriptor's own type are validated
    /// against its declared members; include paths (when supplied) must
    /// start at a declared relationship. Fieldsets for other types are
    /// retained unvalidated for included-resource filtering.
    ///
    /// # Errors
    ///
    /// `InvalidField` (400) for an unknown own-type fieldset entry;
    /// `InvalidInclude` (400) for an include path naming no declared
    /// relationship.
    pub fn compute(
        schema: &Arc<SchemaDescriptor>,
        params: SchemaParams,
        query: &QueryContext,
        include: Option<&[String]>,
    ) -> Result<Self, JsonApiError> {
        let own_fields = match query.fields_for(schema.type_name()) {
            Some(requested) => {
                for name in requested {
                    if !schema.has_member(name) {
                        return Err(JsonApiError::invalid_field(format!(
                            "{} has no attribute {name}",
                            schema.type_name()
                        )));
                    }
                }
                Some(requested.to_vec())
            }
            None => None,
        };

        let include = match include {
            Some(paths) => {
                for path in paths {
                    let head = path.split('.').next().unwrap_or(path);
                    if schema.relationship(head).is_none() {
                        return Err(JsonApiError::invalid_include(format!(
                            "{} has no relationship attribute {head}",
                            schema.type_name()
                        )));
                    }
                }
                paths.to_vec()
            }
            None => Vec::new(),
        };

        Ok(Self {
            schema: Arc::clone(schema),
            params,
            own_fields,
            fields_by_type: query.fields().clone(),
            include,
        })
    }

    /// A view with no sparse fieldsets and no includes.
    #[must_use]
    pub fn plain(schema: &Arc<SchemaDescriptor>, params: SchemaParams) -> Self {
        Self {
            schema: Arc::clone(schema),
            params,
            own_fields: None,
            fields_by_type: std::collections::BTreeMap::new(),
            include: Vec::new(),
        }
    }

    fn selected(&self, name: &str) -> bool {
        self.own_fields.as_ref().is_none_or(|fields| fields.iter().any(|f| f == name))
    }

    /// Serialize one instance into a `{data, included?}` document.
    #[must_use]
    pub fn serialize_one(&self, instance: &Value) -> Value {
        let mut document = json!({"data": self.resource_object(instance)});
        if !self.include.is_empty() {
            document["included"] = Value::Array(self.collect_included(std::slice::from_ref(instance)));
        }
        document
    }

    /// Serialize a collection into a `{data: [...]}` document.
    #[must_use]
    pub fn serialize_many(&self, instances: &[Value]) -> Value {
        let data: Vec<Value> = instances.iter().map(|i| self.resource_object(i)).collect();
        let mut document = json!({"data": data});
        if !self.include.is_empty() {
            document["included"] = Value::Array(self.collect_included(instances));
        }
        document
    }

    /// Serialize one instance as a JSON:API resource object.
    #[must_use]
    pub fn resource_object(&self, instance: &Value) -> Value {
        let id = instance
            .get(self.schema.id_field())
            .and_then(scalar_string)
            .map_or(Value::Null, Value::String);

        let mut attributes = Map::new();
        for field in self.schema.fields() {
            if field.name == self.schema.id_field() || !self.selected(&field.name) {
                continue;
            }
            if let Some(value) = instance.get(&field.name) {
                attributes.insert(field.name.clone(), value.clone());
            }
        }

        let mut object = json!({
            "type": self.schema.type_name(),
            "id": id,
            "attributes": Value::Object(attributes),
        });

        let mut relationships = Map::new();
        for rel in self.schema.relationships() {
            if !self.selected(&rel.name) {
                continue;
            }
            if let Some(embedded) = instance.get(&rel.name) {
                relationships.insert(rel.name.clone(), json!({"data": linkage(rel, embedded)}));
            }
        }
        if !relationships.is_empty() {
            object["relationships"] = Value::Object(relationships);
        }
        object
    }

    /// Whether this view serializes collections.
    #[must_use]
    pub const fn many(&self) -> bool {
        self.params.many
    }

    fn collect_included(&self, instances: &[Value]) -> Vec<Value> {
        let mut seen = std::collections::BTreeSet::new();
        let mut included = Vec::new();
        for path in &self.include {
            for instance in instances {
                self.walk_include(instance, path, &mut seen, &mut included);
            }
        }
        included
    }

    fn walk_include(
        &self,
        instance: &Value,
        path: &str,
        seen: &mut std::collections::BTreeSet<(String, String)>,
        included: &mut Vec<Value>,
    ) {
        let mut frontier: Vec<(&Value, Option<&RelationshipDescriptor>)> = vec![(instance, None)];
        for segment in path.split('.') {
            let mut next = Vec::new();
            let rel = self.schema.relationship(segment);
            for &(node, _) in &frontier {
                if let Some(embedded) = node.get(segment) {
                    match embedded {
                        Value::Array(items) => next.extend(items.iter().map(|i| (i, rel))),
                        Value::Object(_) => next.push((embedded, rel)),
                        _ => {}
                    }
                }
            }
            for &(node, rel) in &next {
                let type_name = node
                    .get("type")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .or_else(|| rel.map(|r| r.related_type.clone()))
                    .unwrap_or_else(|| segment.to_owned());
                let id_field = rel.map_or("id", |r| r.related_id_field.as_str());
                if let Some(entry) = included_entry(&type_name, id_field, node, &self.fields_by_type)
                {
                    let key = (
                        type_name,
                        entry["id"].as_str().unwrap_or_default().to_owned(),
                    );
                    if seen.insert(key) {
                        included.push(entry);
                    }
                }
            }
            frontier = next;
        }
    }

    /// Deserialize and validate a request document.
    ///
    /// Returns the validated data map: the supplied attributes, the
    /// identifier when the document carried one, and relationship linkage
    /// for declared relationships.
    ///
    /// # Errors
    ///
    /// - 422 `Validation` aggregating every failing field (missing `data`
    ///   node, missing `type`, unknown attribute, kind mismatch, missing
    ///   required attribute),
    /// - 409 `IncorrectType` when a declared type does not match, one
    ///   error per mismatching location.
    pub fn deserialize(&self, body: &Value) -> Result<Value, JsonApiError> {
        let Some(data) = body.get("data") else {
            return Err(JsonApiError::validation(vec![ErrorSource {
                pointer: Some("/".to_owned()),
                detail: "Object must include `data` key.".to_owned(),
            }]));
        };
        let Some(data) = data.as_object() else {
            return Err(JsonApiError::validation(vec![ErrorSource {
                pointer: Some("/data".to_owned()),
                detail: "`data` must be an object.".to_owned(),
            }]));
        };

        let Some(declared) = data.get("type").and_then(Value::as_str) else {
            return Err(JsonApiError::validation(vec![ErrorSource {
                pointer: Some("/data".to_owned()),
                detail: "`data` object must include `type` key.".to_owned(),
            }]));
        };

        let mut type_mismatches = Vec::new();
        if declared != self.schema.type_name() {
            type_mismatches.push(ErrorSource {
                pointer: Some("/data/type".to_owned()),
                detail: "Invalid `type` specified".to_owned(),
            });
        }

        let attributes = match data.get("attributes") {
            None => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(JsonApiError::validation(vec![ErrorSource {
                    pointer: Some("/data/attributes".to_owned()),
                    detail: "`attributes` must be an object.".to_owned(),
                }]));
            }
        };

        let mut failures = Vec::new();
        for (name, value) in &attributes {
            match self.schema.field(name) {
                None => failures.push(ErrorSource {
                    pointer: Some(format!("/data/attributes/{name}")),
                    detail: "Unknown field.".to_owned(),
                }),
                Some(field) => {
                    if value.is_null() {
                        if field.kind != FieldKind::Any {
                            failures.push(ErrorSource {
                                pointer: Some(format!("/data/attributes/{name}")),
                                detail: "Field may not be null.".to_owned(),
                            });
                        }
                    } else if !field.kind.accepts(value) {
                        failures.push(ErrorSource {
                            pointer: Some(format!("/data/attributes/{name}")),
                            detail: field.kind.expectation().to_owned(),
                        });
                    }
                }
            }
        }

        if !self.params.partial {
            for field in self.schema.fields() {
                if field.required
                    && field.name != self.schema.id_field()
                    && !attributes.contains_key(&field.name)
                {
                    failures.push(ErrorSource {
                        pointer: Some(format!("/data/attributes/{}", field.name)),
                        detail: "Missing data for required field.".to_owned(),
                    });
                }
            }
        }

        // Relationship linkage travels under data.relationships; declared
        // types must match per identifier.
        let mut linkage_out = Map::new();
        if let Some(Value::Object(relationships)) = data.get("relationships") {
            for (name, node) in relationships {
                let Some(rel) = self.schema.relationship(name) else {
                    failures.push(ErrorSource {
                        pointer: Some(format!("/data/relationships/{name}")),
                        detail: "Unknown field.".to_owned(),
                    });
                    continue;
                };
                let linkage = node.get("data").cloned().unwrap_or(Value::Null);
                let identifiers: Vec<&Value> = match &linkage {
                    Value::Array(items) => items.iter().collect(),
                    Value::Null => Vec::new(),
                    single => vec![single],
                };
                for identifier in identifiers {
                    let item_type = identifier.get("type").and_then(Value::as_str);
                    if item_type.is_some_and(|t| t != rel.related_type) {
                        type_mismatches.push(ErrorSource {
                            pointer: Some(format!("/data/relationships/{name}/data/type")),
                            detail: "Invalid `type` specified".to_owned(),
                        });
                    }
                }
                linkage_out.insert(name.clone(), linkage);
            }
        }

        if !type_mismatches.is_empty() {
            return Err(JsonApiError::incorrect_type_many(type_mismatches));
        }
        if !failures.is_empty() {
            return Err(JsonApiError::validation(failures));
        }

        let mut validated = attributes;
        if let Some(id) = data.get("id") {
            validated.insert(self.schema.id_field().to_owned(), id.clone());
        }
        for (name, value) in linkage_out {
            validated.insert(name, value);
        }
        Ok(Value::Object(validated))
    }
}

fn linkage(rel: &RelationshipDescriptor, embedded: &Value) -> Value {
    match embedded {
        Value::Array(items) => {
            Value::Array(items.iter().map(|i| identifier(rel, i)).collect())
        }
        Value::Null => Value::Null,
        other if rel.many => Value::Array(vec![identifier(rel, other)]),
        other => identifier(rel, other),
    }
}

fn identifier(rel: &RelationshipDescriptor, embedded: &Value) -> Value {
    let id = match embedded {
        Value::Object(_) => embedded.get(&rel.related_id_field).and_then(scalar_string),
        other => scalar_string(other),
    };
    json!({
        "type": rel.related_type,
        "id": id.map_or(Value::Null, Value::String),
    })
}

fn included_entry(
    type_name: &str,
    id_field: &str,
    instance: &Value,
    fields_by_type: &std::collections::BTreeMap<String, Vec<String>>,
) -> Option<Value> {
    let object = instance.as_object()?;
    let id = object.get(id_field).and_then(scalar_string)?;
    let allowed = fields_by_type.get(type_name);
    let mut attributes = Map::new();
    for (key, value) in object {
        if key == id_field || key == "type" {
            continue;
        }
        if allowed.is_some_and(|fields| !fields.iter().any(|f| f == key)) {
            continue;
        }
        attributes.insert(key.clone(), value.clone());
    }
    Some(json!({"type": type_name, "id": id, "attributes": Value::Object(attributes)}))
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn articles() -> Arc<SchemaDescriptor> {
        Arc::new(
            SchemaDescriptor::builder("articles")
                .required_attribute("title", FieldKind::String)
                .attribute("pages", FieldKind::Integer)
                .attribute("draft", FieldKind::Boolean)
                .relationship("author", "people")
                .relationship_many("comments", "comments")
                .build(),
        )
    }

    fn instance() -> Value {
        json!({
            "id": 1,
            "title": "Moby-Dick",
            "pages": 635,
            "draft": false,
            "author": {"id": 7, "name": "Ishmael"},
            "comments": [
                {"id": 10, "body": "call me"},
                {"id": 11, "body": "maybe"},
            ],
        })
    }

    #[test]
    fn resource_object_carries_type_id_attributes() {
        let schema = articles();
        let view = SchemaView::plain(&schema, SchemaParams::default());
        let object = view.resource_object(&instance());
        assert_eq!(object["type"], "articles");
        assert_eq!(object["id"], "1");
        assert_eq!(object["attributes"]["title"], "Moby-Dick");
        assert_eq!(object["relationships"]["author"]["data"]["id"], "7");
        assert_eq!(
            object["relationships"]["comments"]["data"].as_array().unwrap().len(),
            2
        );
    }

    #[test]
    fn sparse_fieldset_filters_attributes() {
        let schema = articles();
        let query = QueryContext::new().with_fields("articles", vec!["title".to_owned()]);
        let view =
            SchemaView::compute(&schema, SchemaParams::default(), &query, None).unwrap();
        let object = view.resource_object(&instance());
        assert_eq!(object["attributes"]["title"], "Moby-Dick");
        assert!(object["attributes"].get("pages").is_none());
        assert!(object.get("relationships").is_none());
    }

    #[test]
    fn unknown_sparse_field_is_invalid_field() {
        let schema = articles();
        let query = QueryContext::new().with_fields("articles", vec!["publisher".to_owned()]);
        let err =
            SchemaView::compute(&schema, SchemaParams::default(), &query, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidField);
        assert_eq!(err.status().as_u16(), 400);
    }

    #[test]
    fn unknown_include_is_invalid_include() {
        let schema = articles();
        let query = QueryContext::new();
        let include = vec!["publisher".to_owned()];
        let err = SchemaView::compute(&schema, SchemaParams::default(), &query, Some(&include))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInclude);
    }

    #[test]
    fn include_lifts_embedded_resources() {
        let schema = articles();
        let query = QueryContext::new();
        let include = vec!["author".to_owned(), "comments".to_owned()];
        let view = SchemaView::compute(&schema, SchemaParams::default(), &query, Some(&include))
            .unwrap();
        let document = view.serialize_one(&instance());
        let included = document["included"].as_array().unwrap();
        assert_eq!(included.len(), 3);
        assert!(included.iter().any(|e| e["type"] == "people" && e["id"] == "7"));
        assert!(included.iter().any(|e| e["type"] == "comments" && e["id"] == "10"));
    }

    #[test]
    fn included_deduplicates_by_type_and_id() {
        let schema = articles();
        let query = QueryContext::new();
        let include = vec!["author".to_owned()];
        let view = SchemaView::compute(
            &schema,
            SchemaParams { many: true, partial: false },
            &query,
            Some(&include),
        )
        .unwrap();
        let shared = instance();
        let document = view.serialize_many(&[shared.clone(), shared]);
        assert_eq!(document["included"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn deserialize_accepts_valid_document() {
        let schema = articles();
        let view = SchemaView::plain(&schema, SchemaParams::default());
        let body = json!({"data": {
            "type": "articles",
            "attributes": {"title": "Typee", "pages": 325},
        }});
        let data = view.deserialize(&body).unwrap();
        assert_eq!(data["title"], "Typee");
        assert_eq!(data["pages"], 325);
    }

    #[test]
    fn deserialize_missing_data_node() {
        let schema = articles();
        let view = SchemaView::plain(&schema, SchemaParams::default());
        let err = view.deserialize(&json!({})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.sources()[0].pointer.as_deref(), Some("/"));
    }

    #[test]
    fn deserialize_type_mismatch_is_conflict() {
        let schema = articles();
        let view = SchemaView::plain(&schema, SchemaParams::default());
        let body = json!({"data": {"type": "people", "attributes": {"title": "x"}}});
        let err = view.deserialize(&body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncorrectType);
        assert_eq!(err.status().as_u16(), 409);
        assert_eq!(err.sources()[0].pointer.as_deref(), Some("/data/type"));
    }

    #[test]
    fn deserialize_aggregates_field_failures() {
        let schema = articles();
        let view = SchemaView::plain(&schema, SchemaParams::default());
        let body = json!({"data": {
            "type": "articles",
            "attributes": {"pages": "many", "publisher": "x"},
        }});
        let err = view.deserialize(&body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let pointers: Vec<_> =
            err.sources().iter().filter_map(|s| s.pointer.as_deref()).collect();
        assert!(pointers.contains(&"/data/attributes/pages"));
        assert!(pointers.contains(&"/data/attributes/publisher"));
        // title is required and absent
        assert!(pointers.contains(&"/data/attributes/title"));
    }

    #[test]
    fn partial_deserialize_skips_required_checks() {
        let schema = articles();
        let view = SchemaView::plain(&schema, SchemaParams { many: false, partial: true });
        let body = json!({"data": {
            "type": "articles",
            "id": "1",
            "attributes": {"pages": 700},
        }});
        let data = view.deserialize(&body).unwrap();
        assert_eq!(data["pages"], 700);
        assert_eq!(data["id"], "1");
    }

    #[test]
    fn relationship_linkage_type_mismatch_is_conflict() {
        let schema = articles();
        let view = SchemaView::plain(&schema, SchemaParams { many: false, partial: true });
        let body = json!({"data": {
            "type": "articles",
            "relationships": {"author": {"data": {"type": "articles", "id": "7"}}},
        }});
        let err = view.deserialize(&body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncorrectType);
        assert_eq!(
            err.sources()[0].pointer.as_deref(),
            Some("/data/relationships/author/data/type")
        );
    }

    #[test]
    fn relationship_linkage_lands_in_validated_data() {
        let schema = articles();
        let view = SchemaView::plain(&schema, SchemaParams::default());
        let body = json!({"data": {
            "type": "articles",
            "attributes": {"title": "Omoo"},
            "relationships": {"author": {"data": {"type": "people", "id": "7"}}},
        }});
        let data = view.deserialize(&body).unwrap();
        assert_eq!(data["author"]["id"], "7");
    }
}
