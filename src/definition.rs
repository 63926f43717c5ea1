//! Declarative validators built from JSON definitions.
//!
//! A definitions document names a set of validators that reference each other
//! for their includes:
//!
//! ```json
//! {
//!   "validators": {
//!     "post": {
//!       "fields": ["id", "title"],
//!       "available_includes": ["comments"],
//!       "default_includes": ["author"],
//!       "handlers": {
//!         "comments": { "collection": "comment" },
//!         "author": { "item": "user", "optional": true }
//!       }
//!     },
//!     "comment": {},
//!     "user": { "schema": { "type": "object", "required": ["name"] } }
//!   },
//!   "params": { "comments": { "limit": 2 } }
//! }
//! ```
//!
//! References may be cyclic (a user's posts, each with its author). The
//! built [`ValidatorSet`] owns every validator; handlers only hold weak links
//! back to it. Validators handed out by [`ValidatorSet::get`] keep their set
//! alive, so they stay usable after the caller's set handle is dropped.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{LoadError, ResolveError, SchemaError};
use crate::includes::Includes;
use crate::resource::{collection, item, Included};
use crate::scope::{Manager, Scope};
use crate::types::{json_type_name, ParamBag};
use crate::validator::Validator;

/// Parameter honoured by collection handlers to truncate their data.
pub const LIMIT_PARAM: &str = "limit";

/// Top-level definitions document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Definitions {
    pub validators: BTreeMap<String, ValidatorDefinition>,
    /// Include parameters keyed by scope identifier (e.g. `"comments.author"`).
    #[serde(default)]
    pub params: BTreeMap<String, ParamBag>,
    #[serde(default)]
    pub recursion_limit: Option<usize>,
}

/// A single declarative validator.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorDefinition {
    /// Fields copied to the output, in this order. All non-include fields when absent.
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    /// JSON Schema the raw node must satisfy before it is shaped.
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub available_includes: Vec<String>,
    #[serde(default)]
    pub default_includes: Vec<String>,
    #[serde(default)]
    pub handlers: BTreeMap<String, HandlerDefinition>,
}

/// How an include wraps its data slot.
///
/// Exactly one of `item` or `collection` names the validator for the slot.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerDefinition {
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub resource_key: Option<String>,
    /// Skip instead of failing when the data slot is missing or null.
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmbedKind {
    Item,
    Collection,
}

impl HandlerDefinition {
    fn target(&self, validator: &str, include: &str) -> Result<(EmbedKind, &str), LoadError> {
        match (&self.item, &self.collection) {
            (Some(target), None) => Ok((EmbedKind::Item, target.as_str())),
            (None, Some(target)) => Ok((EmbedKind::Collection, target.as_str())),
            _ => Err(LoadError::AmbiguousHandler {
                validator: validator.to_string(),
                include: include.to_string(),
            }),
        }
    }
}

impl Definitions {
    /// Build every validator, checking references, handler coverage and schemas.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` for an include without a handler, a handler that
    /// names an unknown validator or both/neither of `item` and `collection`,
    /// or a schema that does not compile.
    pub fn build(&self) -> Result<Arc<ValidatorSet>, LoadError> {
        let mut schemas = BTreeMap::new();

        for (name, definition) in &self.validators {
            for include in definition
                .default_includes
                .iter()
                .chain(&definition.available_includes)
            {
                if !definition.handlers.contains_key(include) {
                    return Err(LoadError::MissingHandler {
                        validator: name.clone(),
                        include: include.clone(),
                    });
                }
            }

            for (include, handler) in &definition.handlers {
                let (_, target) = handler.target(name, include)?;
                if !self.validators.contains_key(target) {
                    return Err(LoadError::UnknownValidator {
                        validator: name.clone(),
                        target: target.to_string(),
                    });
                }
            }

            let schema = definition
                .schema
                .as_ref()
                .map(|schema| {
                    jsonschema::validator_for(schema).map_err(|e| LoadError::InvalidSchema {
                        validator: name.clone(),
                        message: e.to_string(),
                    })
                })
                .transpose()?;
            schemas.insert(name.clone(), schema);
        }

        debug!(validators = self.validators.len(), "building validator set");

        Ok(Arc::new_cyclic(|set: &Weak<ValidatorSet>| {
            let validators = self
                .validators
                .iter()
                .map(|(name, definition)| {
                    let schema = schemas.remove(name).flatten();
                    let validator = DeclarativeValidator {
                        name: name.clone(),
                        fields: definition.fields.clone(),
                        schema,
                        includes: build_includes(name, definition, set),
                    };
                    (name.clone(), Arc::new(validator))
                })
                .collect();
            ValidatorSet { validators }
        }))
    }

    /// A manager carrying the document's params and recursion limit.
    pub fn manager(&self) -> Manager {
        let mut manager = Manager::new();
        if let Some(limit) = self.recursion_limit {
            manager = manager.with_recursion_limit(limit);
        }
        for (identifier, params) in &self.params {
            manager = manager.with_include_params(identifier.clone(), params.clone());
        }
        manager
    }
}

fn build_includes(
    name: &str,
    definition: &ValidatorDefinition,
    set: &Weak<ValidatorSet>,
) -> Includes {
    let mut includes = Includes::new()
        .set_available_includes(definition.available_includes.iter().cloned())
        .set_default_includes(definition.default_includes.iter().cloned());

    for (include, handler) in &definition.handlers {
        // Targets were checked before the set was built
        let Ok((kind, target)) = handler.target(name, include) else {
            continue;
        };
        let embed = Embed {
            include: include.clone(),
            target: target.to_string(),
            kind,
            resource_key: handler.resource_key.clone(),
            set: set.clone(),
        };

        includes = if handler.optional {
            includes.optional_handler(include, move |data: Option<&Value>, params: &ParamBag| {
                match data {
                    None | Some(Value::Null) => Ok(Included::Skip),
                    Some(data) => embed.wrap(data, params),
                }
            })
        } else {
            includes.handler(include, move |data: &Value, params: &ParamBag| {
                embed.wrap(data, params)
            })
        };
    }

    includes
}

/// What a declarative handler wraps its data slot in.
struct Embed {
    include: String,
    target: String,
    kind: EmbedKind,
    resource_key: Option<String>,
    set: Weak<ValidatorSet>,
}

impl Embed {
    fn wrap(&self, data: &Value, params: &ParamBag) -> Result<Included, ResolveError> {
        let set = self
            .set
            .upgrade()
            .ok_or_else(|| ResolveError::handler(&self.include, "validator set was dropped"))?;
        let validator = set.get(&self.target).ok_or_else(|| {
            ResolveError::handler(&self.include, format!("unknown validator \"{}\"", self.target))
        })?;
        let key = self.resource_key.as_deref();

        Ok(match self.kind {
            EmbedKind::Item => Included::Item(item(data.clone(), validator, key)),
            EmbedKind::Collection => {
                let data = match (params.get_u64(LIMIT_PARAM), data) {
                    (Some(limit), Value::Array(nodes)) => {
                        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
                        Value::Array(nodes.iter().take(limit).cloned().collect())
                    }
                    _ => data.clone(),
                };
                Included::Collection(collection(data, validator, key))
            }
        })
    }
}

/// Validators built from one definitions document, looked up by name.
pub struct ValidatorSet {
    validators: BTreeMap<String, Arc<DeclarativeValidator>>,
}

impl ValidatorSet {
    /// Look up a validator by name.
    ///
    /// The returned validator holds a strong reference to the set.
    pub fn get(self: &Arc<Self>, name: &str) -> Option<Arc<dyn Validator>> {
        let validator = Arc::clone(self.validators.get(name)?);
        Some(Arc::new(SetMember {
            set: Arc::clone(self),
            validator,
        }))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validators.keys().map(String::as_str)
    }
}

impl fmt::Debug for ValidatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.validators.keys()).finish()
    }
}

/// A set's validator together with the set it resolves includes against.
struct SetMember {
    // Only held to keep the handlers' weak links upgradable
    #[allow(dead_code)]
    set: Arc<ValidatorSet>,
    validator: Arc<DeclarativeValidator>,
}

impl Validator for SetMember {
    fn validate(&self, data: &Value, scope: &Scope<'_>) -> Result<Value, ResolveError> {
        self.validator.validate(data, scope)
    }

    fn includes(&self) -> &Includes {
        self.validator.includes()
    }

    fn name(&self) -> &str {
        self.validator.name()
    }
}

/// A validator configured from a [`ValidatorDefinition`].
pub struct DeclarativeValidator {
    name: String,
    fields: Option<Vec<String>>,
    schema: Option<jsonschema::Validator>,
    includes: Includes,
}

impl Validator for DeclarativeValidator {
    fn validate(&self, data: &Value, scope: &Scope<'_>) -> Result<Value, ResolveError> {
        let Some(node) = data.as_object() else {
            return Err(ResolveError::UnexpectedShape {
                path: scope.path(),
                expected: "object",
                actual: json_type_name(data).to_string(),
            });
        };

        if let Some(schema) = &self.schema {
            let errors: Vec<SchemaError> = schema
                .iter_errors(data)
                .map(|e| SchemaError {
                    path: e.instance_path.to_string(),
                    message: e.to_string(),
                })
                .collect();
            if !errors.is_empty() {
                return Err(ResolveError::SchemaViolation {
                    path: scope.path(),
                    errors,
                });
            }
        }

        // Include slots are re-attached by the scope once resolved
        let mut output = Map::new();
        match &self.fields {
            Some(fields) => {
                for field in fields {
                    if let Some(value) = node.get(field) {
                        if !self.includes.is_declared(field) {
                            output.insert(field.clone(), value.clone());
                        }
                    }
                }
            }
            None => {
                for (field, value) in node {
                    if !self.includes.is_declared(field) {
                        output.insert(field.clone(), value.clone());
                    }
                }
            }
        }

        Ok(Value::Object(output))
    }

    fn includes(&self) -> &Includes {
        &self.includes
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for DeclarativeValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclarativeValidator")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("has_schema", &self.schema.is_some())
            .field("includes", &self.includes)
            .finish()
    }
}
