//! Resource containers pairing raw data with the validator that shapes it.
//!
//! Containers are plain carriers: nothing is validated when they are built.
//! A [`Scope`](crate::Scope) bound to a container does the actual walk.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ResolveError;
use crate::types::json_type_name;
use crate::validator::Validator;

/// What a handler may return besides a resource.
const EXPECTED_RETURN: &str = "Item, Collection or null";

/// A single node to be validated.
#[derive(Clone)]
pub struct Item {
    data: Value,
    validator: Arc<dyn Validator>,
    resource_key: Option<String>,
}

/// An ordered sequence of nodes, each validated independently by the same validator.
#[derive(Clone)]
pub struct Collection {
    data: Value,
    validator: Arc<dyn Validator>,
    resource_key: Option<String>,
}

macro_rules! container_accessors {
    ($ty:ident) => {
        impl $ty {
            pub fn new(
                data: impl Into<Value>,
                validator: Arc<dyn Validator>,
                resource_key: Option<&str>,
            ) -> Self {
                Self {
                    data: data.into(),
                    validator,
                    resource_key: resource_key.map(String::from),
                }
            }

            pub fn data(&self) -> &Value {
                &self.data
            }

            pub fn validator(&self) -> &Arc<dyn Validator> {
                &self.validator
            }

            /// Naming hint for downstream serialization. Never interpreted here.
            pub fn resource_key(&self) -> Option<&str> {
                self.resource_key.as_deref()
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($ty))
                    .field("data", &self.data)
                    .field("validator", &self.validator.name())
                    .field("resource_key", &self.resource_key)
                    .finish()
            }
        }
    };
}

container_accessors!(Item);
container_accessors!(Collection);

/// Create a new item resource.
pub fn item(
    data: impl Into<Value>,
    validator: Arc<dyn Validator>,
    resource_key: Option<&str>,
) -> Item {
    Item::new(data, validator, resource_key)
}

/// Create a new collection resource.
pub fn collection(
    data: impl Into<Value>,
    validator: Arc<dyn Validator>,
    resource_key: Option<&str>,
) -> Collection {
    Collection::new(data, validator, resource_key)
}

/// A resource a scope can be bound to.
#[derive(Debug, Clone)]
pub enum Resource {
    Item(Item),
    Collection(Collection),
}

impl Resource {
    pub fn data(&self) -> &Value {
        match self {
            Resource::Item(item) => item.data(),
            Resource::Collection(collection) => collection.data(),
        }
    }

    pub fn validator(&self) -> &Arc<dyn Validator> {
        match self {
            Resource::Item(item) => item.validator(),
            Resource::Collection(collection) => collection.validator(),
        }
    }

    pub fn resource_key(&self) -> Option<&str> {
        match self {
            Resource::Item(item) => item.resource_key(),
            Resource::Collection(collection) => collection.resource_key(),
        }
    }
}

impl From<Item> for Resource {
    fn from(item: Item) -> Self {
        Resource::Item(item)
    }
}

impl From<Collection> for Resource {
    fn from(collection: Collection) -> Self {
        Resource::Collection(collection)
    }
}

/// Outcome of a single include handler.
#[derive(Debug, Clone, Default)]
pub enum Included {
    /// Omit the include entirely. Not an error.
    #[default]
    Skip,
    Item(Item),
    Collection(Collection),
}

impl Included {
    /// The resource to embed, or `None` for a skip.
    pub fn into_resource(self) -> Option<Resource> {
        match self {
            Included::Skip => None,
            Included::Item(item) => Some(Resource::Item(item)),
            Included::Collection(collection) => Some(Resource::Collection(collection)),
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Included::Skip)
    }
}

/// Conversion from a handler's return value into an [`Included`].
///
/// Typed returns (`Item`, `Collection`, `Option<_>`) always convert. A raw
/// `serde_json::Value` only converts when it is `null`; any other value is a
/// type contract violation reported against `validator::handler()`.
pub trait IntoIncluded {
    fn into_included(self, validator: &str, handler: &str) -> Result<Included, ResolveError>;
}

impl IntoIncluded for Included {
    fn into_included(self, _validator: &str, _handler: &str) -> Result<Included, ResolveError> {
        Ok(self)
    }
}

impl IntoIncluded for Item {
    fn into_included(self, _validator: &str, _handler: &str) -> Result<Included, ResolveError> {
        Ok(Included::Item(self))
    }
}

impl IntoIncluded for Collection {
    fn into_included(self, _validator: &str, _handler: &str) -> Result<Included, ResolveError> {
        Ok(Included::Collection(self))
    }
}

impl IntoIncluded for Resource {
    fn into_included(self, _validator: &str, _handler: &str) -> Result<Included, ResolveError> {
        Ok(match self {
            Resource::Item(item) => Included::Item(item),
            Resource::Collection(collection) => Included::Collection(collection),
        })
    }
}

impl<T: IntoIncluded> IntoIncluded for Option<T> {
    fn into_included(self, validator: &str, handler: &str) -> Result<Included, ResolveError> {
        match self {
            Some(inner) => inner.into_included(validator, handler),
            None => Ok(Included::Skip),
        }
    }
}

impl IntoIncluded for Value {
    fn into_included(self, validator: &str, handler: &str) -> Result<Included, ResolveError> {
        match self {
            Value::Null => Ok(Included::Skip),
            other => Err(ResolveError::InvalidHandlerReturn {
                validator: validator.to_string(),
                handler: handler.to_string(),
                expected: EXPECTED_RETURN,
                actual: json_type_name(&other).to_string(),
            }),
        }
    }
}

impl<T, E> IntoIncluded for Result<T, E>
where
    T: IntoIncluded,
    E: Into<ResolveError>,
{
    fn into_included(self, validator: &str, handler: &str) -> Result<Included, ResolveError> {
        match self {
            Ok(inner) => inner.into_included(validator, handler),
            Err(e) => Err(e.into()),
        }
    }
}
