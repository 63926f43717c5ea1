//! The validator policy object.

use std::fmt;

use serde_json::Value;

use crate::error::ResolveError;
use crate::includes::Includes;
use crate::scope::Scope;

/// Shapes one kind of data node and declares the includes it can attach.
///
/// Validators are shared through `Arc` and may be reused across concurrent
/// passes: everything pass-specific arrives through the `scope` argument.
pub trait Validator: Send + Sync {
    /// Shape a single raw node.
    ///
    /// Include resolution is run separately by the scope and merged into the
    /// returned value, so implementations only produce the node's own fields.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` if the node cannot be shaped.
    fn validate(&self, data: &Value, scope: &Scope<'_>) -> Result<Value, ResolveError>;

    /// Include configuration for this validator.
    fn includes(&self) -> &Includes;

    /// Name used in error messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn available_includes(&self) -> &[String] {
        self.includes().available_includes()
    }

    fn default_includes(&self) -> &[String] {
        self.includes().default_includes()
    }
}

/// A validator backed by a closure.
pub struct FnValidator<F> {
    f: F,
    includes: Includes,
    name: String,
}

/// Wrap a closure as a validator with no includes.
pub fn from_fn<F>(f: F) -> FnValidator<F>
where
    F: Fn(&Value) -> Result<Value, ResolveError> + Send + Sync,
{
    FnValidator {
        f,
        includes: Includes::new(),
        name: "FnValidator".to_string(),
    }
}

impl<F> FnValidator<F> {
    pub fn with_includes(mut self, includes: Includes) -> Self {
        self.includes = includes;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<F> Validator for FnValidator<F>
where
    F: Fn(&Value) -> Result<Value, ResolveError> + Send + Sync,
{
    fn validate(&self, data: &Value, _scope: &Scope<'_>) -> Result<Value, ResolveError> {
        (self.f)(data)
    }

    fn includes(&self) -> &Includes {
        &self.includes
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnValidator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnValidator")
            .field("name", &self.name)
            .field("includes", &self.includes)
            .finish()
    }
}
