//! Moderare
//!
//! Recursive include resolution for shaping nested JSON data.
//!
//! A [`Validator`] shapes one kind of data node and declares the related
//! resources ("includes") it can attach. Resolution walks the data tree
//! through [`Scope`]s, attaching an include only when the data node carries a
//! slot for it, or always for default includes.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use moderare::{collection, from_fn, Includes, Manager, Validator, item};
//! use serde_json::{json, Value};
//!
//! let comment: Arc<dyn Validator> =
//!     Arc::new(from_fn(|data: &Value| Ok(json!({ "body": data["body"] }))));
//!
//! let includes = Includes::new()
//!     .set_available_includes(["comments"])
//!     .handler("comments", move |data, _params| {
//!         collection(data.clone(), comment.clone(), None)
//!     });
//! let post: Arc<dyn Validator> = Arc::new(
//!     from_fn(|data: &Value| Ok(json!({ "title": data["title"] }))).with_includes(includes),
//! );
//!
//! let manager = Manager::new();
//!
//! // No "comments" slot: nothing to include
//! let scope = manager.create_data(item(json!({ "title": "x" }), post.clone(), None));
//! assert_eq!(scope.validate().unwrap(), json!({ "title": "x" }));
//!
//! // With a slot the include is resolved through the comment validator
//! let data = json!({ "title": "x", "comments": [{ "body": "hi", "spam": true }] });
//! let scope = manager.create_data(item(data, post, None));
//! assert_eq!(
//!     scope.validate().unwrap(),
//!     json!({ "title": "x", "comments": [{ "body": "hi" }] })
//! );
//! ```
//!
//! # Handler Outcomes
//!
//! | Handler returns | Effect |
//! |-----------------|--------|
//! | `Item` / `Collection` | Validated in a child scope, stored under the include name |
//! | `Included::Skip`, `None`, `null` | Include omitted |
//! | Any other JSON value | `ResolveError::InvalidHandlerReturn` |
//! | `Err(_)` | Resolution aborted |
//!
//! # Include Order
//!
//! Default includes come first in declared order, then available includes in
//! declared order. A name declared in both is resolved once.

mod definition;
mod error;
mod includes;
mod loader;
mod resolver;
mod resource;
mod scope;
mod types;
mod validator;

pub use definition::{
    DeclarativeValidator, Definitions, HandlerDefinition, ValidatorDefinition, ValidatorSet,
    LIMIT_PARAM,
};
pub use error::{ErrorKind, LoadError, ResolveError, SchemaError};
pub use includes::{Handler, Includes};
pub use loader::{load_data, load_data_str, load_definitions, load_definitions_str};
pub use resolver::{figure_out_includes, resolve_included_resources};
pub use resource::{collection, item, Collection, Included, IntoIncluded, Item, Resource};
pub use scope::{Manager, Scope};
pub use types::{handler_name, json_type_name, ParamBag};
pub use validator::{from_fn, FnValidator, Validator};
