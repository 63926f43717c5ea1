//! Integration tests for include resolution.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use moderare::{
    collection, from_fn, item, resolve_included_resources, ErrorKind, Included, Includes, Manager,
    ParamBag, ResolveError, Scope, Validator,
};
use serde_json::{json, Value};

fn passthrough() -> Arc<dyn Validator> {
    Arc::new(from_fn(|data: &Value| Ok(data.clone())).with_name("Passthrough"))
}

/// Post validator keeping only the title.
struct PostValidator {
    includes: Includes,
}

impl PostValidator {
    fn new(includes: Includes) -> Arc<dyn Validator> {
        Arc::new(Self { includes })
    }
}

impl Validator for PostValidator {
    fn validate(&self, data: &Value, _scope: &Scope<'_>) -> Result<Value, ResolveError> {
        Ok(json!({ "title": data["title"] }))
    }

    fn includes(&self) -> &Includes {
        &self.includes
    }

    fn name(&self) -> &str {
        "PostValidator"
    }
}

fn resolve(validator: &Arc<dyn Validator>, data: &Value) -> Result<Option<Value>, ResolveError> {
    let manager = Manager::new();
    let scope = manager.create_data(item(data.clone(), validator.clone(), None));
    resolve_included_resources(validator.as_ref(), &scope, data).map(|m| m.map(Value::Object))
}

// === Scenario Tests ===

mod scenarios {
    use super::*;

    #[test]
    fn available_include_without_slot_is_absent() {
        let post = PostValidator::new(
            Includes::new()
                .set_available_includes(["comments"])
                .handler("comments", |data, _| collection(data.clone(), passthrough(), None)),
        );

        let result = resolve(&post, &json!({ "title": "x" })).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn available_include_with_slot_resolves_collection() {
        let post = PostValidator::new(
            Includes::new()
                .set_available_includes(["comments"])
                .handler("comments", |data, _| collection(data.clone(), passthrough(), None)),
        );

        let data = json!({ "title": "x", "comments": [{ "body": "a" }] });
        let result = resolve(&post, &data).unwrap();
        assert_eq!(result, Some(json!({ "comments": [{ "body": "a" }] })));
    }

    #[test]
    fn default_include_skipped_by_tolerant_handler() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let post = PostValidator::new(
            Includes::new()
                .set_default_includes(["author"])
                .optional_handler("author", move |data: Option<&Value>, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    data.map(|author| item(author.clone(), passthrough(), None))
                }),
        );

        let result = resolve(&post, &json!({ "title": "x" })).unwrap();
        assert!(result.is_none());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn raw_value_from_handler_is_type_contract_error() {
        let post = PostValidator::new(
            Includes::new()
                .set_available_includes(["author"])
                .handler("author", |data, _| data.clone()),
        );

        let err = resolve(&post, &json!({ "title": "x", "author": { "name": "ada" } })).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeContract);
        assert!(matches!(
            err,
            ResolveError::InvalidHandlerReturn { ref validator, ref handler, ref actual, .. }
                if validator == "PostValidator" && handler == "includeAuthor" && actual == "object"
        ));
    }
}

// === Property Tests ===

mod properties {
    use super::*;

    fn blog_post() -> Arc<dyn Validator> {
        PostValidator::new(
            Includes::new()
                .set_available_includes(["comments", "tags", "author"])
                .set_default_includes(["author", "meta"])
                .handler("comments", |data, _| collection(data.clone(), passthrough(), None))
                .handler("tags", |data, _| collection(data.clone(), passthrough(), None))
                .optional_handler("author", |data: Option<&Value>, _| {
                    data.cloned().map(|author| item(author, passthrough(), None))
                })
                .optional_handler("meta", |_, _| {
                    Some(item(json!({ "version": 1 }), passthrough(), None))
                }),
        )
    }

    #[test]
    fn keys_limited_to_declared_includes() {
        let data = json!({
            "title": "x",
            "comments": [],
            "tags": ["rust"],
            "author": { "name": "ada" },
            "unrelated": { "nested": true }
        });
        let result = resolve(&blog_post(), &data).unwrap().unwrap();
        let declared = ["comments", "tags", "author", "meta"];
        for key in result.as_object().unwrap().keys() {
            assert!(declared.contains(&key.as_str()), "unexpected key {key}");
        }
    }

    #[test]
    fn order_is_defaults_then_available() {
        let data = json!({
            "tags": ["rust"],
            "author": { "name": "ada" },
            "comments": [],
            "title": "x"
        });
        let result = resolve(&blog_post(), &data).unwrap().unwrap();
        let keys: Vec<&String> = result.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["author", "meta", "comments", "tags"]);
    }

    #[test]
    fn order_is_deterministic() {
        let data = json!({ "tags": [], "comments": [], "author": {} });
        let validator = blog_post();
        let first = resolve(&validator, &data).unwrap().unwrap();
        for _ in 0..5 {
            let again = resolve(&validator, &data).unwrap().unwrap();
            let a: Vec<&String> = first.as_object().unwrap().keys().collect();
            let b: Vec<&String> = again.as_object().unwrap().keys().collect();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn overlapping_include_evaluated_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let post = PostValidator::new(
            Includes::new()
                .set_available_includes(["author"])
                .set_default_includes(["author"])
                .optional_handler("author", move |data: Option<&Value>, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    data.cloned().map(|author| item(author, passthrough(), None))
                }),
        );

        let result = resolve(&post, &json!({ "author": { "name": "ada" } })).unwrap();
        assert_eq!(result, Some(json!({ "author": { "name": "ada" } })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn skipped_include_never_appears() {
        let post = PostValidator::new(
            Includes::new()
                .set_available_includes(["comments", "tags"])
                .handler("comments", |_, _| Included::Skip)
                .handler("tags", |data, _| collection(data.clone(), passthrough(), None)),
        );

        let result = resolve(&post, &json!({ "comments": [1], "tags": ["a"] }))
            .unwrap()
            .unwrap();
        assert!(result.get("comments").is_none());
        assert_eq!(result["tags"], json!(["a"]));
    }

    #[test]
    fn null_return_is_skip() {
        let post = PostValidator::new(
            Includes::new()
                .set_available_includes(["author"])
                .handler("author", |_, _| Value::Null),
        );
        assert!(resolve(&post, &json!({ "author": {} })).unwrap().is_none());
    }
}

// === Error Handling Tests ===

mod error_handling {
    use super::*;

    #[test]
    fn required_default_include_without_slot() {
        let post = PostValidator::new(
            Includes::new()
                .set_default_includes(["author"])
                .handler("author", |data, _| item(data.clone(), passthrough(), None)),
        );

        let err = resolve(&post, &json!({ "title": "x" })).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataShape);
        assert!(matches!(
            err,
            ResolveError::MissingIncludeData { ref include, .. } if include == "author"
        ));
    }

    #[test]
    fn undeclared_handler_is_configuration_error_even_if_not_attempted() {
        let post = PostValidator::new(
            Includes::new()
                .set_available_includes(["comments", "tags"])
                .handler("comments", |_, _| Included::Skip),
        );

        let err = resolve(&post, &json!({ "comments": [] })).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("includeTags"));
    }

    #[test]
    fn handler_failure_aborts_pass() {
        let post = PostValidator::new(
            Includes::new()
                .set_available_includes(["comments", "author"])
                .handler("comments", |data, _| collection(data.clone(), passthrough(), None))
                .handler("author", |_, _| -> Result<Included, ResolveError> {
                    Err(ResolveError::handler("author", "connection refused"))
                }),
        );

        let err = resolve(&post, &json!({ "comments": [], "author": 7 })).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Handler);
        assert_eq!(err.to_string(), "include \"author\" failed: connection refused");
    }

    #[test]
    fn nested_error_aborts_root() {
        let broken: Arc<dyn Validator> = Arc::new(
            from_fn(|data: &Value| Ok(data.clone())).with_includes(
                Includes::new()
                    .set_available_includes(["owner"])
                    .handler("owner", |data, _| data.clone()),
            ),
        );
        let post = PostValidator::new(
            Includes::new()
                .set_available_includes(["comments"])
                .handler("comments", move |data, _| {
                    collection(data.clone(), broken.clone(), None)
                }),
        );

        let data = json!({ "comments": [{ "owner": "ada" }] });
        let manager = Manager::new();
        let scope = manager.create_data(item(data, post, None));
        assert!(matches!(
            scope.validate(),
            Err(ResolveError::InvalidHandlerReturn { actual, .. }) if actual == "string"
        ));
    }

    #[test]
    fn collection_slot_of_wrong_shape() {
        let post = PostValidator::new(
            Includes::new()
                .set_available_includes(["comments"])
                .handler("comments", |data, _| collection(data.clone(), passthrough(), None)),
        );

        let err = resolve(&post, &json!({ "comments": { "body": "single" } })).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::UnexpectedShape { ref path, expected: "array", .. } if path == "$.comments"
        ));
    }
}

// === Nesting Tests ===

mod nesting {
    use super::*;

    /// Comment validator with an optional nested author.
    fn comment() -> Arc<dyn Validator> {
        Arc::new(
            from_fn(|data: &Value| Ok(json!({ "body": data["body"] })))
                .with_name("CommentValidator")
                .with_includes(
                    Includes::new()
                        .set_available_includes(["author"])
                        .handler("author", |data, params: &ParamBag| {
                            let key = params.get_str("key").map(String::from);
                            item(data.clone(), passthrough(), key.as_deref())
                        }),
                ),
        )
    }

    fn post() -> Arc<dyn Validator> {
        let comment = comment();
        PostValidator::new(
            Includes::new()
                .set_available_includes(["comments"])
                .handler("comments", move |data, params: &ParamBag| {
                    let nodes: Value = match (params.get_u64("limit"), data) {
                        (Some(limit), Value::Array(nodes)) => {
                            nodes.iter().take(limit as usize).cloned().collect()
                        }
                        _ => data.clone(),
                    };
                    collection(nodes, comment.clone(), Some("comments"))
                }),
        )
    }

    #[test]
    fn nested_includes_resolved_depth_first() {
        let data = json!({
            "title": "x",
            "comments": [
                { "body": "a", "author": { "name": "ada" } },
                { "body": "b" }
            ]
        });
        let manager = Manager::new();
        let scope = manager.create_data(item(data, post(), Some("post")));

        assert_eq!(
            scope.validate().unwrap(),
            json!({
                "title": "x",
                "comments": [
                    { "body": "a", "author": { "name": "ada" } },
                    { "body": "b" }
                ]
            })
        );
    }

    #[test]
    fn params_looked_up_by_nested_identifier() {
        let data = json!({
            "title": "x",
            "comments": [{ "body": "a" }, { "body": "b" }, { "body": "c" }]
        });
        let manager = Manager::new()
            .with_include_params("comments", ParamBag::new().with("limit", 2))
            .with_include_params("author", ParamBag::new().with("limit", 0));
        let scope = manager.create_data(item(data, post(), None));

        let output = scope.validate().unwrap();
        assert_eq!(output["comments"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn recursion_limit_fails_instead_of_dropping_includes() {
        let data = json!({
            "title": "x",
            "comments": [{ "body": "a", "author": { "name": "ada" } }]
        });
        let manager = Manager::new().with_recursion_limit(1);
        let scope = manager.create_data(item(data, post(), None));

        let err = scope.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataShape);
        assert!(matches!(
            err,
            ResolveError::RecursionLimitExceeded { ref path, limit: 1 } if path == "$.comments"
        ));
    }

    #[test]
    fn recursion_limit_allows_shallower_includes() {
        let data = json!({
            "title": "x",
            "comments": [{ "body": "a", "author": { "name": "ada" } }]
        });
        let manager = Manager::new().with_recursion_limit(2);
        let scope = manager.create_data(item(data.clone(), post(), None));

        assert_eq!(scope.validate().unwrap(), data);
    }

    /// Validator that embeds its `child` slot with another instance of itself.
    fn node() -> Arc<dyn Validator> {
        Arc::new(
            from_fn(|data: &Value| Ok(json!({ "id": data["id"] })))
                .with_name("NodeValidator")
                .with_includes(
                    Includes::new()
                        .set_available_includes(["child"])
                        .handler("child", |data, _| item(data.clone(), node(), None)),
                ),
        )
    }

    /// Nodes `1..=levels`, each holding the next under `child`.
    fn chain(levels: u64) -> Value {
        let mut data = json!({ "id": levels });
        for id in (1..levels).rev() {
            data = json!({ "id": id, "child": data });
        }
        data
    }

    #[test]
    fn deep_nesting_is_unlimited_by_default() {
        let data = chain(12);
        let manager = Manager::new();
        let scope = manager.create_data(item(data.clone(), node(), None));

        assert_eq!(scope.validate().unwrap(), data);
    }

    #[test]
    fn deep_nesting_past_limit_is_an_error() {
        let manager = Manager::new().with_recursion_limit(10);
        let scope = manager.create_data(item(chain(12), node(), None));

        let expected_path = format!("${}", ".child".repeat(10));
        assert!(matches!(
            scope.validate(),
            Err(ResolveError::RecursionLimitExceeded { ref path, limit: 10 }) if *path == expected_path
        ));
    }

    #[test]
    fn shared_validator_across_threads() {
        let validator = post();
        let manager = Manager::new();

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let validator = validator.clone();
                    let manager = &manager;
                    s.spawn(move || {
                        let data = json!({
                            "title": format!("post {i}"),
                            "comments": [{ "body": i }]
                        });
                        manager.create_data(item(data, validator, None)).validate()
                    })
                })
                .collect();

            for (i, handle) in handles.into_iter().enumerate() {
                let output = handle.join().unwrap().unwrap();
                assert_eq!(
                    output,
                    json!({ "title": format!("post {i}"), "comments": [{ "body": i }] })
                );
            }
        });
    }
}
