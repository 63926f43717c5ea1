//! Resolution context: the [`Manager`] holding per-pass configuration and the
//! [`Scope`] tracking where in the tree a resource is being validated.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::ResolveError;
use crate::resolver::resolve_included_resources;
use crate::resource::Resource;
use crate::types::{json_type_name, ParamBag, SCOPE_SEPARATOR};
use crate::validator::Validator;

/// Per-pass configuration: include parameters and an optional recursion limit.
#[derive(Debug, Clone, Default)]
pub struct Manager {
    recursion_limit: Option<usize>,
    include_params: BTreeMap<String, ParamBag>,
}

impl Manager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the pass when a scope at depth `limit` or deeper has includes to resolve.
    ///
    /// Unlimited by default.
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = Some(limit);
        self
    }

    /// Set the parameters handed to the include at `identifier` (e.g. `"comments.author"`).
    pub fn with_include_params(mut self, identifier: impl Into<String>, params: ParamBag) -> Self {
        self.include_params.insert(identifier.into(), params);
        self
    }

    pub fn recursion_limit(&self) -> Option<usize> {
        self.recursion_limit
    }

    /// Parameters for a scope identifier; empty if none were set.
    pub fn include_params(&self, identifier: &str) -> ParamBag {
        self.include_params
            .get(identifier)
            .cloned()
            .unwrap_or_default()
    }

    /// Create the root scope for a resource.
    pub fn create_data(&self, resource: impl Into<Resource>) -> Scope<'_> {
        Scope {
            manager: self,
            resource: resource.into(),
            identifier: None,
            parent_scopes: Vec::new(),
        }
    }
}

/// One position in the resolution tree, bound to the resource found there.
///
/// Scopes are created per pass and never shared.
#[derive(Debug)]
pub struct Scope<'m> {
    manager: &'m Manager,
    resource: Resource,
    identifier: Option<String>,
    parent_scopes: Vec<String>,
}

impl<'m> Scope<'m> {
    pub fn manager(&self) -> &'m Manager {
        self.manager
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn resource_key(&self) -> Option<&str> {
        self.resource.resource_key()
    }

    /// The validator driving this scope.
    pub fn current_validator(&self) -> &Arc<dyn Validator> {
        self.resource.validator()
    }

    /// Include name this scope was embedded under; `None` for the root.
    pub fn scope_identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn parent_scopes(&self) -> &[String] {
        &self.parent_scopes
    }

    /// Number of includes between the root and this scope.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Fully qualified identifier for `include` below this scope.
    pub fn identifier(&self, include: &str) -> String {
        let mut identifier = String::new();
        for segment in self.segments().chain(std::iter::once(include)) {
            if !identifier.is_empty() {
                identifier.push(SCOPE_SEPARATOR);
            }
            identifier.push_str(segment);
        }
        identifier
    }

    /// Location of this scope for error messages: `$` for the root,
    /// `$.comments.author` below it.
    pub fn path(&self) -> String {
        let mut path = String::from("$");
        for segment in self.segments() {
            path.push(SCOPE_SEPARATOR);
            path.push_str(segment);
        }
        path
    }

    /// Create a scope for `resource` embedded under `include`.
    pub fn embed_child_scope(&self, include: &str, resource: impl Into<Resource>) -> Scope<'m> {
        Scope {
            manager: self.manager,
            resource: resource.into(),
            identifier: Some(include.to_string()),
            parent_scopes: self.segments().map(String::from).collect(),
        }
    }

    /// Validate the bound resource, resolving includes recursively.
    ///
    /// Items produce the shaped node with its includes merged in. Collections
    /// produce an array with every element shaped by the same validator.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` from the validator, from include resolution, or
    /// `UnexpectedShape` if a collection's data is not an array.
    pub fn validate(&self) -> Result<Value, ResolveError> {
        let validator = self.resource.validator();
        debug!(
            path = %self.path(),
            validator = validator.name(),
            resource_key = self.resource_key(),
            "validating scope"
        );

        match &self.resource {
            Resource::Item(item) => self.validate_node(validator.as_ref(), item.data()),
            Resource::Collection(collection) => {
                let Value::Array(nodes) = collection.data() else {
                    return Err(ResolveError::UnexpectedShape {
                        path: self.path(),
                        expected: "array",
                        actual: json_type_name(collection.data()).to_string(),
                    });
                };
                nodes
                    .iter()
                    .map(|node| self.validate_node(validator.as_ref(), node))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
        }
    }

    fn validate_node(&self, validator: &dyn Validator, data: &Value) -> Result<Value, ResolveError> {
        let output = validator.validate(data, self)?;

        let Some(included) = resolve_included_resources(validator, self, data)? else {
            return Ok(output);
        };

        match output {
            Value::Object(mut node) => {
                node.extend(included);
                Ok(Value::Object(node))
            }
            other => Err(ResolveError::UnexpectedShape {
                path: self.path(),
                expected: "object",
                actual: json_type_name(&other).to_string(),
            }),
        }
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.parent_scopes
            .iter()
            .map(String::as_str)
            .chain(self.identifier.as_deref())
    }
}
