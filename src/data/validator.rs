//! Normalization and validation of document values.
//!
//! Normalization makes a document conform to the shape its schema
//! describes without touching user data: missing fields with defaults are
//! filled in, object keys are reordered to schema declaration order
//! (unknown keys keep their document order at the end), and, when
//! requested, keys the schema does not declare are purged. Running
//! normalization twice yields the same result as running it once.
//!
//! Validation never mutates; it reports problems as a list of messages so
//! the UI can show them next to the field being edited.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::data::schema::{
    Resolved, ScalarKind, SchemaError, SchemaNode, SchemaRule, join_path,
};

/// Normalize `value` against `node`.
///
/// With `purge_unknown` set, keys not declared by the schema are dropped
/// from fixed objects. Dynamic mappings never purge; every key is legal
/// there.
///
/// # Errors
///
/// Fails only when a selector inside `value` cannot be resolved.
pub fn normalize(node: &SchemaNode, value: &Value, purge_unknown: bool) -> Result<Value, SchemaError> {
    normalize_at(node, value, purge_unknown, "")
}

fn normalize_at(
    node: &SchemaNode,
    value: &Value,
    purge_unknown: bool,
    path: &str,
) -> Result<Value, SchemaError> {
    match &node.rule {
        SchemaRule::Scalar(_) | SchemaRule::Untyped => Ok(if value.is_null() {
            node.default.clone().unwrap_or(Value::Null)
        } else {
            value.clone()
        }),
        SchemaRule::List(elem) => match value {
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    out.push(normalize_at(
                        elem,
                        item,
                        purge_unknown,
                        &join_path(path, &format!("[{idx}]")),
                    )?);
                }
                Ok(Value::Array(out))
            }
            Value::Null => match &node.default {
                Some(default) => normalize_at(node, default, purge_unknown, path),
                None => Ok(Value::Null),
            },
            // Type errors are validation's concern; keep the value as-is.
            other => Ok(other.clone()),
        },
        SchemaRule::Fields(fields) => Ok(Value::Object(normalize_fields(
            fields,
            value,
            purge_unknown,
            path,
        )?)),
        SchemaRule::Selector { key, variants: _ } => {
            let Resolved::Fields(fields) = node.resolve(value, path)? else {
                return Ok(value.clone());
            };
            let mut out = normalize_fields(fields, value, purge_unknown, path)?;
            // The discriminator must survive purging even when a variant
            // forgets to declare it, or the document becomes unresolvable.
            if !out.contains_key(key)
                && let Some(found) = value.as_object().and_then(|m| m.get(key))
            {
                out.insert(key.clone(), found.clone());
            }
            Ok(Value::Object(out))
        }
        SchemaRule::ValuesRules { value: rule, .. } => {
            let empty = Map::new();
            let src = value.as_object().unwrap_or(&empty);
            let mut out = Map::new();
            for (name, v) in src {
                out.insert(
                    name.clone(),
                    normalize_at(rule, v, purge_unknown, &join_path(path, name))?,
                );
            }
            Ok(Value::Object(out))
        }
    }
}

fn normalize_fields(
    fields: &IndexMap<String, SchemaNode>,
    value: &Value,
    purge_unknown: bool,
    path: &str,
) -> Result<Map<String, Value>, SchemaError> {
    let empty = Map::new();
    // Null or mismatched values are treated as an empty object so a bare
    // document can be enriched progressively.
    let src = value.as_object().unwrap_or(&empty);

    let mut out = Map::new();
    for (name, sub) in fields {
        if let Some(v) = src.get(name) {
            out.insert(
                name.clone(),
                normalize_at(sub, v, purge_unknown, &join_path(path, name))?,
            );
        } else if let Some(default) = &sub.default {
            out.insert(
                name.clone(),
                normalize_at(sub, default, purge_unknown, &join_path(path, name))?,
            );
        }
    }
    if !purge_unknown {
        for (name, v) in src {
            if !fields.contains_key(name) {
                out.insert(name.clone(), v.clone());
            }
        }
    }
    Ok(out)
}

/// Build the value a freshly added field starts out with.
///
/// Scalars without a default start as null; object shapes start as their
/// defaults-filled empty instance. A selector without a stored default is
/// seeded with its first declared variant so the new value stays
/// resolvable.
pub fn default_instance(node: &SchemaNode) -> Result<Value, SchemaError> {
    if let SchemaRule::Selector { key, variants } = &node.rule
        && node.default.is_none()
        && let Some(first) = variants.keys().next()
    {
        let mut doc = Map::new();
        doc.insert(key.clone(), Value::String(first.clone()));
        return normalize(node, &Value::Object(doc), false);
    }
    normalize(node, &Value::Null, false)
}

/// Build the zero element appended by the add operation on list pages.
pub fn seed_value(node: &SchemaNode) -> Result<Value, SchemaError> {
    match &node.rule {
        SchemaRule::Scalar(ScalarKind::String) | SchemaRule::Untyped => {
            Ok(Value::String(String::new()))
        }
        SchemaRule::Scalar(ScalarKind::Integer) => Ok(Value::from(0)),
        SchemaRule::Scalar(ScalarKind::Number) => Ok(Value::from(0.0)),
        SchemaRule::Scalar(ScalarKind::Boolean) => Ok(Value::Bool(false)),
        SchemaRule::List(_) => Ok(Value::Array(Vec::new())),
        _ => default_instance(node),
    }
}

/// Validate `value` against `node`, reporting problems as messages.
///
/// An empty result means the value is acceptable. Messages for nested
/// values carry their dot-separated path.
pub fn validate(node: &SchemaNode, value: &Value) -> Vec<String> {
    let mut errors = Vec::new();
    validate_at(node, value, "", &mut errors);
    errors
}

fn validate_at(node: &SchemaNode, value: &Value, path: &str, errors: &mut Vec<String>) {
    match &node.rule {
        SchemaRule::Scalar(kind) => {
            if value.is_null() {
                return;
            }
            match kind {
                ScalarKind::String => match value.as_str() {
                    Some(s) => {
                        if let Some(re) = &node.regex
                            && !re.is_match(s)
                        {
                            push_error(
                                errors,
                                path,
                                format!("value does not match regex '{}'", re.pattern),
                            );
                        }
                    }
                    None => push_error(errors, path, "must be of string type".into()),
                },
                ScalarKind::Integer => match value.as_i64() {
                    Some(n) => check_bounds(node, n as f64, path, errors),
                    None => push_error(errors, path, "must be of integer type".into()),
                },
                ScalarKind::Number => match value.as_f64() {
                    Some(f) => check_bounds(node, f, path, errors),
                    None => push_error(errors, path, "must be of number type".into()),
                },
                ScalarKind::Boolean => {
                    if !value.is_boolean() {
                        push_error(errors, path, "must be of boolean type".into());
                    }
                }
            }
        }
        SchemaRule::List(elem) => match value.as_array() {
            Some(items) => {
                for (idx, item) in items.iter().enumerate() {
                    validate_at(elem, item, &join_path(path, &format!("[{idx}]")), errors);
                }
            }
            None => {
                if !value.is_null() {
                    push_error(errors, path, "must be of list type".into());
                }
            }
        },
        SchemaRule::Fields(fields) => {
            validate_fields(fields, value, path, errors);
        }
        SchemaRule::Selector { .. } => match node.resolve(value, path) {
            Ok(Resolved::Fields(fields)) => validate_fields(fields, value, path, errors),
            Ok(_) => {}
            Err(e) => errors.push(e.to_string()),
        },
        SchemaRule::ValuesRules { value: rule, key } => {
            if let Some(map) = value.as_object() {
                for (name, v) in map {
                    if let Some(key_rule) = key {
                        validate_at(
                            key_rule,
                            &Value::String(name.clone()),
                            &join_path(path, name),
                            errors,
                        );
                    }
                    validate_at(rule, v, &join_path(path, name), errors);
                }
            }
        }
        SchemaRule::Untyped => {}
    }
}

fn validate_fields(
    fields: &IndexMap<String, SchemaNode>,
    value: &Value,
    path: &str,
    errors: &mut Vec<String>,
) {
    let empty = Map::new();
    let src = value.as_object().unwrap_or(&empty);
    for (name, sub) in fields {
        match src.get(name) {
            Some(v) => validate_at(sub, v, &join_path(path, name), errors),
            None => {
                if sub.required {
                    push_error(errors, &join_path(path, name), "required field".into());
                }
            }
        }
    }
}

fn check_bounds(node: &SchemaNode, value: f64, path: &str, errors: &mut Vec<String>) {
    if let Some(min) = node.min
        && value < min
    {
        push_error(errors, path, format!("min value is {min}"));
    }
    if let Some(max) = node.max
        && value > max
    {
        push_error(errors, path, format!("max value is {max}"));
    }
}

fn push_error(errors: &mut Vec<String>, path: &str, msg: String) {
    if path.is_empty() {
        errors.push(msg);
    } else {
        errors.push(format!("{path}: {msg}"));
    }
}

/// Validate raw editor text against a scalar rule.
///
/// The text is first parsed according to the rule's scalar kind, then the
/// parsed value is validated. Non-scalar rules treat the text as a string,
/// which is what key rules for dynamic mappings expect.
pub fn validate_text(node: &SchemaNode, text: &str) -> Vec<String> {
    let kind = match &node.rule {
        SchemaRule::Scalar(kind) => *kind,
        _ => ScalarKind::String,
    };
    match parse_scalar(kind, text) {
        Ok(value) => validate(node, &value),
        Err(msg) => vec![msg],
    }
}

/// Parse editor text into a typed scalar value.
///
/// Incomplete numeric input (empty, a lone sign or dot) parses as zero so
/// a field being retyped does not flood the user with warnings.
pub fn parse_scalar(kind: ScalarKind, text: &str) -> Result<Value, String> {
    match kind {
        ScalarKind::String => Ok(Value::String(text.to_string())),
        ScalarKind::Integer => {
            let t = text.trim();
            if t.is_empty() || t == "-" {
                return Ok(Value::from(0));
            }
            t.parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("{text:?} is not a valid integer"))
        }
        ScalarKind::Number => {
            let t = text.trim();
            if t.is_empty() || t == "-" || t == "." || t == "-." {
                return Ok(Value::from(0.0));
            }
            match t.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Value::from(f)),
                _ => Err(format!("{text:?} is not a valid number")),
            }
        }
        ScalarKind::Boolean => match text.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            other => Err(format!("{other:?} is not a valid boolean")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::SchemaRoot;
    use serde_json::json;

    fn node(rule: serde_json::Value) -> SchemaNode {
        SchemaNode::parse(&rule, "test").unwrap()
    }

    #[test]
    fn test_normalize_fills_defaults() {
        let n = node(json!({
            "type": "dict",
            "schema": {
                "name": { "type": "string" },
                "port": { "type": "integer", "default": 8080 },
                "log": {
                    "type": "dict",
                    "schema": { "level": { "type": "string", "default": "info" } },
                    "default": {},
                },
            }
        }));
        let out = normalize(&n, &json!({ "name": "svc" }), false).unwrap();
        assert_eq!(
            out,
            json!({ "name": "svc", "port": 8080, "log": { "level": "info" } })
        );
    }

    #[test]
    fn test_normalize_orders_keys_schema_first() {
        let n = node(json!({
            "type": "dict",
            "schema": {
                "a": { "type": "integer" },
                "b": { "type": "integer" },
            }
        }));
        let out = normalize(&n, &json!({ "z": 9, "b": 2, "a": 1 }), false).unwrap();
        let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
        // 未知键保持文档顺序，排在已声明键之后
        assert_eq!(keys, ["a", "b", "z"]);
    }

    #[test]
    fn test_normalize_purges_unknown_keys() {
        let n = node(json!({
            "type": "dict",
            "schema": { "a": { "type": "integer" } }
        }));
        let out = normalize(&n, &json!({ "a": 1, "z": 9 }), true).unwrap();
        assert_eq!(out, json!({ "a": 1 }));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let schema = json!({
            "machine": {
                "selector": {
                    "qemu": {
                        "kind": { "type": "string", "default": "qemu" },
                        "smp": { "type": "integer", "default": 1 },
                    },
                }
            },
            "tags": { "type": "list", "schema": { "type": "string" } },
        });
        let root = SchemaRoot::try_from(&schema).unwrap();
        let doc = json!({
            "extra": true,
            "machine": { "kind": "qemu" },
            "tags": ["a", "b"],
        });
        let once = normalize(&root.node, &doc, false).unwrap();
        let twice = normalize(&root.node, &once, false).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_keeps_discriminator_when_purging() {
        // 变体未声明kind字段时净化也不能丢弃它
        let n = node(json!({
            "selector": {
                "a": { "x": { "type": "integer", "default": 1 } },
            }
        }));
        let out = normalize(&n, &json!({ "kind": "a", "junk": true }), true).unwrap();
        assert_eq!(out, json!({ "x": 1, "kind": "a" }));
    }

    #[test]
    fn test_normalize_unresolved_selector_is_an_error() {
        let n = node(json!({ "selector": { "a": {} } }));
        let err = normalize(&n, &json!({}), false).unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedSelector { .. }));
    }

    #[test]
    fn test_default_instance_for_objects_and_selectors() {
        let dict = node(json!({
            "type": "dict",
            "schema": { "level": { "type": "string", "default": "info" } }
        }));
        assert_eq!(default_instance(&dict).unwrap(), json!({ "level": "info" }));

        let scalar = node(json!({ "type": "string" }));
        assert_eq!(default_instance(&scalar).unwrap(), Value::Null);

        let selector = node(json!({
            "selector": {
                "tcp": { "kind": { "type": "string" }, "port": { "type": "integer", "default": 80 } },
                "udp": { "kind": { "type": "string" } },
            }
        }));
        assert_eq!(
            default_instance(&selector).unwrap(),
            json!({ "kind": "tcp", "port": 80 })
        );
    }

    #[test]
    fn test_seed_values_by_kind() {
        assert_eq!(seed_value(&node(json!({ "type": "string" }))).unwrap(), json!(""));
        assert_eq!(seed_value(&node(json!({ "type": "integer" }))).unwrap(), json!(0));
        assert_eq!(seed_value(&node(json!({ "type": "float" }))).unwrap(), json!(0.0));
        assert_eq!(seed_value(&node(json!({ "type": "boolean" }))).unwrap(), json!(false));
        assert_eq!(
            seed_value(&node(json!({ "type": "list", "schema": { "type": "string" } }))).unwrap(),
            json!([])
        );
        assert_eq!(
            seed_value(&node(json!({
                "type": "dict",
                "schema": { "x": { "type": "integer", "default": 3 } }
            })))
            .unwrap(),
            json!({ "x": 3 })
        );
    }

    #[test]
    fn test_validate_regex() {
        let n = node(json!({ "type": "string", "regex": "[a-z]+" }));
        assert!(validate(&n, &json!("abc")).is_empty());
        let errors = validate(&n, &json!("9abc"));
        assert_eq!(errors, ["value does not match regex '[a-z]+'"]);
    }

    #[test]
    fn test_validate_bounds_and_types() {
        let n = node(json!({ "type": "integer", "min": 1, "max": 10 }));
        assert!(validate(&n, &json!(5)).is_empty());
        assert_eq!(validate(&n, &json!(0)), ["min value is 1"]);
        assert_eq!(validate(&n, &json!(11)), ["max value is 10"]);
        assert_eq!(validate(&n, &json!("five")), ["must be of integer type"]);
    }

    #[test]
    fn test_validate_required_fields() {
        let n = node(json!({
            "type": "dict",
            "schema": {
                "name": { "type": "string", "required": true },
                "port": { "type": "integer" },
            }
        }));
        assert_eq!(validate(&n, &json!({})), ["name: required field"]);
        assert!(validate(&n, &json!({ "name": "x" })).is_empty());
    }

    #[test]
    fn test_validate_text_parses_by_kind() {
        let int_rule = node(json!({ "type": "integer", "min": 1 }));
        assert!(validate_text(&int_rule, "12").is_empty());
        assert_eq!(validate_text(&int_rule, "12a"), ["\"12a\" is not a valid integer"]);
        // 空输入按0处理，再由min规则拦下
        assert_eq!(validate_text(&int_rule, ""), ["min value is 1"]);

        let key_rule = node(json!({ "type": "string", "regex": "[a-z]+" }));
        assert!(validate_text(&key_rule, "abc").is_empty());
        assert!(!validate_text(&key_rule, "ABC").is_empty());
    }
}
