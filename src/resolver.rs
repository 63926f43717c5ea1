//! Include resolution: decide which includes apply to a node, dispatch to
//! their handlers and validate whatever they return in a child scope.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::ResolveError;
use crate::includes::Includes;
use crate::resource::Resource;
use crate::scope::Scope;
use crate::types::handler_name;
use crate::validator::Validator;

/// Includes to attempt for a data node, in resolution order.
///
/// Default includes come first and are always attempted. Available includes
/// follow in declaration order, but only when `data` is an object with a key
/// of the same name. A name is attempted at most once.
pub fn figure_out_includes<'a>(includes: &'a Includes, data: &Value) -> Vec<&'a str> {
    let mut names: Vec<&str> = Vec::new();

    for include in includes.default_includes() {
        if !names.contains(&include.as_str()) {
            names.push(include);
        }
    }

    let Some(node) = data.as_object() else {
        return names;
    };

    for include in includes.available_includes() {
        // A relation is only resolvable when the data carries a slot for it
        if node.contains_key(include) && !names.contains(&include.as_str()) {
            names.push(include);
        }
    }

    names
}

/// Resolve every applicable include of `data` through `validator`.
///
/// Returns `None` when no include produced output, so callers can leave the
/// includes out entirely instead of emitting an empty object.
///
/// # Errors
///
/// Returns `ResolveError` if the validator is misconfigured, a handler fails
/// or returns an invalid value, a child scope fails to validate, or the node
/// sits at the manager's recursion limit with includes left to resolve.
/// Nothing partial is returned on error.
pub fn resolve_included_resources(
    validator: &dyn Validator,
    scope: &Scope<'_>,
    data: &Value,
) -> Result<Option<Map<String, Value>>, ResolveError> {
    let includes = validator.includes();
    includes.verify(validator.name())?;

    let candidates = figure_out_includes(includes, data);
    if let Some(limit) = scope.manager().recursion_limit() {
        if !candidates.is_empty() && scope.depth() >= limit {
            debug!(
                validator = validator.name(),
                depth = scope.depth(),
                limit,
                "recursion limit reached with includes left to resolve"
            );
            return Err(ResolveError::RecursionLimitExceeded {
                path: scope.path(),
                limit,
            });
        }
    }

    let mut included = Map::new();

    for include in candidates {
        if let Some(resource) = call_include_handler(validator, scope, include, data)? {
            let child = scope.embed_child_scope(include, resource);
            let resolved = child.validate()?;
            included.insert(include.to_string(), resolved);
        }
    }

    if included.is_empty() {
        Ok(None)
    } else {
        Ok(Some(included))
    }
}

/// Run the handler for one include and return the resource to embed.
fn call_include_handler(
    validator: &dyn Validator,
    scope: &Scope<'_>,
    include: &str,
    data: &Value,
) -> Result<Option<Resource>, ResolveError> {
    let handler = validator
        .includes()
        .handler_for(include)
        .ok_or_else(|| ResolveError::MissingHandler {
            validator: validator.name().to_string(),
            include: include.to_string(),
            handler: handler_name(include),
        })?;

    let identifier = scope.identifier(include);
    let params = scope.manager().include_params(&identifier);
    let slot = data.as_object().and_then(|node| node.get(include));

    trace!(
        validator = validator.name(),
        handler = handler.name(),
        %identifier,
        has_data = slot.is_some(),
        "calling include handler"
    );

    let outcome = handler.invoke(validator.name(), include, &identifier, slot, &params)?;
    if outcome.is_skip() {
        debug!(%identifier, "include skipped by handler");
    }

    Ok(outcome.into_resource())
}
