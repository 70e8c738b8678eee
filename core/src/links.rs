//! Link templates and attribute-path resolution.
//!
//! Endpoints render their `self` and `related` links from URL templates of
//! the form `/articles/{id}/relationships/comments`. Parameters come from
//! the request's route parameters, or — for relationship `related` links —
//! from dotted attribute paths resolved against the owning instance.
//!
//! Both operations fail through [`EngineFault`]: an unresolvable template
//! or path is a configuration defect, not a client error.

use crate::RouteParams;
use crate::error::EngineFault;
use serde_json::Value;

/// A URL template with `{param}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTemplate {
    template: String,
}

impl LinkTemplate {
    /// Wrap a template string such as `/articles/{id}`.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into() }
    }

    /// The raw template text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Placeholder names, in template order.
    #[must_use]
    pub fn params(&self) -> Vec<&str> {
        let mut params = Vec::new();
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else { break };
            params.push(&rest[start + 1..start + len]);
            rest = &rest[start + len + 1..];
        }
        params
    }

    /// Substitute every placeholder from `params`.
    ///
    /// # Errors
    ///
    /// [`EngineFault::MissingRouteParam`] when a placeholder has no entry.
    pub fn render(&self, params: &RouteParams) -> Result<String, EngineFault> {
        let mut rendered = self.template.clone();
        for name in self.params() {
            let value = params.get(name).ok_or_else(|| EngineFault::MissingRouteParam {
                template: self.template.clone(),
                param: name.to_owned(),
            })?;
            rendered = rendered.replace(&format!("{{{name}}}"), value);
        }
        Ok(rendered)
    }
}

/// Resolve a dotted attribute path against a resource instance.
///
/// `"author.id"` looks up `instance["author"]["id"]`. Each intermediate
/// segment must resolve to an object.
///
/// # Errors
///
/// [`EngineFault::AttributePath`] naming the first segment that does not
/// resolve.
pub fn resolve_attribute_path(instance: &Value, path: &str) -> Result<Value, EngineFault> {
    let mut current = instance;
    for segment in path.split('.') {
        current = current
            .get(segment)
            .ok_or_else(|| EngineFault::AttributePath {
                path: path.to_owned(),
                segment: segment.to_owned(),
            })?;
    }
    Ok(current.clone())
}

/// Resolve a dotted path to a URL-parameter string.
///
/// # Errors
///
/// [`EngineFault::AttributePath`] when the path does not resolve or
/// resolves to a non-scalar value.
pub fn resolve_path_param(instance: &Value, path: &str) -> Result<String, EngineFault> {
    let value = resolve_attribute_path(instance, path)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(EngineFault::AttributePath {
            path: path.to_owned(),
            segment: path.rsplit('.').next().unwrap_or(path).to_owned(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn params(pairs: &[(&str, &str)]) -> RouteParams {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<BTreeMap<_, _>>()
    }

    #[test]
    fn render_substitutes_every_placeholder() {
        let template = LinkTemplate::new("/authors/{author_id}/articles/{id}");
        let url = template.render(&params(&[("author_id", "7"), ("id", "42")])).unwrap();
        assert_eq!(url, "/authors/7/articles/42");
    }

    #[test]
    fn render_without_placeholders_ignores_params() {
        let template = LinkTemplate::new("/articles");
        assert_eq!(template.render(&params(&[("id", "1")])).unwrap(), "/articles");
    }

    #[test]
    fn missing_param_is_a_fault() {
        let template = LinkTemplate::new("/articles/{id}");
        let fault = template.render(&RouteParams::new()).unwrap_err();
        assert!(matches!(fault, EngineFault::MissingRouteParam { param, .. } if param == "id"));
    }

    #[test]
    fn dotted_path_resolves_nested_objects() {
        let instance = json!({"author": {"id": 7, "name": "Ishmael"}});
        assert_eq!(resolve_attribute_path(&instance, "author.id").unwrap(), json!(7));
        assert_eq!(resolve_path_param(&instance, "author.id").unwrap(), "7");
    }

    #[test]
    fn absent_segment_fails_cleanly() {
        let instance = json!({"author": {"id": 7}});
        let fault = resolve_attribute_path(&instance, "author.publisher.id").unwrap_err();
        assert!(
            matches!(fault, EngineFault::AttributePath { segment, .. } if segment == "publisher")
        );
    }

    #[test]
    fn non_scalar_param_fails_cleanly() {
        let instance = json!({"author": {"id": 7}});
        assert!(resolve_path_param(&instance, "author").is_err());
    }
}
