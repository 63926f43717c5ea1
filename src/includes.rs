//! Include configuration for a validator: which relations it exposes,
//! which are always attached, and the handler registered for each.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::error::ResolveError;
use crate::resource::{Included, IntoIncluded};
use crate::types::{handler_name, ParamBag};

type RequiredFn =
    dyn Fn(&Value, &ParamBag, &str, &str) -> Result<Included, ResolveError> + Send + Sync;
type OptionalFn =
    dyn Fn(Option<&Value>, &ParamBag, &str, &str) -> Result<Included, ResolveError> + Send + Sync;

#[derive(Clone)]
enum Call {
    /// Receives the data slot; a missing slot never reaches the handler.
    Required(Arc<RequiredFn>),
    /// Receives `None` when the data node has no slot for the include.
    Optional(Arc<OptionalFn>),
}

/// A registered include handler.
#[derive(Clone)]
pub struct Handler {
    name: String,
    call: Call,
}

impl Handler {
    /// Canonical handler name, e.g. `includeComments`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the include needs a data slot to be present.
    pub fn requires_data(&self) -> bool {
        matches!(self.call, Call::Required(_))
    }

    /// Run the handler against a data slot.
    ///
    /// # Errors
    ///
    /// Returns `MissingIncludeData` if the handler requires data and `data` is
    /// `None`, or whatever the handler itself fails with.
    pub fn invoke(
        &self,
        validator: &str,
        include: &str,
        identifier: &str,
        data: Option<&Value>,
        params: &ParamBag,
    ) -> Result<Included, ResolveError> {
        match &self.call {
            Call::Required(f) => {
                let data = data.ok_or_else(|| ResolveError::MissingIncludeData {
                    include: include.to_string(),
                    identifier: identifier.to_string(),
                })?;
                f(data, params, validator, &self.name)
            }
            Call::Optional(f) => f(data, params, validator, &self.name),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("requires_data", &self.requires_data())
            .finish()
    }
}

/// Available and default includes plus their handlers.
///
/// Setters are fluent and do not check anything; [`Includes::verify`] does.
#[derive(Debug, Clone, Default)]
pub struct Includes {
    available: Vec<String>,
    default: Vec<String>,
    handlers: BTreeMap<String, Handler>,
    /// First declared include without a handler, computed on the first `verify`.
    unhandled: OnceLock<Option<String>>,
}

impl Includes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Includes that are resolved when the data node has a slot for them.
    pub fn available_includes(&self) -> &[String] {
        &self.available
    }

    /// Includes that are always attempted.
    pub fn default_includes(&self) -> &[String] {
        &self.default
    }

    pub fn handler_for(&self, include: &str) -> Option<&Handler> {
        self.handlers.get(include)
    }

    pub fn set_available_includes<I, S>(mut self, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.available = includes.into_iter().map(Into::into).collect();
        self.unhandled = OnceLock::new();
        self
    }

    pub fn set_default_includes<I, S>(mut self, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default = includes.into_iter().map(Into::into).collect();
        self.unhandled = OnceLock::new();
        self
    }

    /// Register a handler that needs the include's data slot.
    ///
    /// Replaces any handler already registered for `include`.
    pub fn handler<F, R>(mut self, include: &str, f: F) -> Self
    where
        F: Fn(&Value, &ParamBag) -> R + Send + Sync + 'static,
        R: IntoIncluded,
    {
        let call = move |data: &Value, params: &ParamBag, validator: &str, handler: &str| {
            f(data, params).into_included(validator, handler)
        };
        self.insert(include, Call::Required(Arc::new(call)));
        self
    }

    /// Register a handler that tolerates a missing data slot.
    pub fn optional_handler<F, R>(mut self, include: &str, f: F) -> Self
    where
        F: Fn(Option<&Value>, &ParamBag) -> R + Send + Sync + 'static,
        R: IntoIncluded,
    {
        let call =
            move |data: Option<&Value>, params: &ParamBag, validator: &str, handler: &str| {
                f(data, params).into_included(validator, handler)
            };
        self.insert(include, Call::Optional(Arc::new(call)));
        self
    }

    /// Check that every declared include has a handler.
    ///
    /// The table is only scanned once; later calls reuse the outcome until a
    /// setter changes the configuration.
    ///
    /// # Errors
    ///
    /// Returns `MissingHandler` for the first declared include without one.
    pub fn verify(&self, validator: &str) -> Result<(), ResolveError> {
        let unhandled = self.unhandled.get_or_init(|| {
            self.default
                .iter()
                .chain(&self.available)
                .find(|include| !self.handlers.contains_key(include.as_str()))
                .cloned()
        });

        match unhandled {
            Some(include) => Err(ResolveError::MissingHandler {
                validator: validator.to_string(),
                include: include.clone(),
                handler: handler_name(include),
            }),
            None => Ok(()),
        }
    }

    /// True when the include is declared as available or default.
    pub fn is_declared(&self, include: &str) -> bool {
        self.default.iter().chain(&self.available).any(|i| i == include)
    }

    fn insert(&mut self, include: &str, call: Call) {
        self.unhandled = OnceLock::new();
        self.handlers.insert(
            include.to_string(),
            Handler {
                name: handler_name(include),
                call,
            },
        );
    }
}
