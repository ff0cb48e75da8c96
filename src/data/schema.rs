//! Schema rule parsing and resolution.
//!
//! A schema is a mapping of field names to rule mappings, in the style of
//! Cerberus. Rules are parsed once into [`SchemaNode`] trees and classified
//! into the shapes the editor knows how to render:
//!
//! - Scalars (`string`, `integer`, `number`/`float`, `boolean`)
//! - Lists with a single element rule (`type: list` + `schema`)
//! - Fixed objects with named fields (`type: dict` + `schema`)
//! - Polymorphic objects picked by a discriminator field (`selector`)
//! - Dynamic mappings with uniform value rules (`valuesrules` + `keysrules`)
//!
//! Polymorphic nodes cannot be classified from the schema alone; the
//! effective field set depends on the discriminator value stored in the
//! document, so classification is split into parse ([`SchemaNode::parse`])
//! and resolve ([`SchemaNode::resolve`]).

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Key that wraps the whole document in a single rule, allowing list or
/// dynamic-mapping documents at the top level.
pub const ROOT_KEY: &str = "__root__";

/// Discriminator field name used when a selector rule does not name one.
pub const DEFAULT_SELECTOR_KEY: &str = "kind";

/// Errors raised while parsing a schema or resolving it against a document.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A rule entry has an unusable shape.
    #[error("{path}: invalid rule: {reason}")]
    InvalidRule { path: String, reason: String },

    /// The `type` rule names a type the editor does not know.
    #[error("{path}: unknown type {name:?}")]
    UnknownType { path: String, name: String },

    /// A `regex` rule failed to compile.
    #[error("{path}: invalid regex {pattern:?}: {source}")]
    BadRegex {
        path: String,
        pattern: String,
        source: regex::Error,
    },

    /// A selector node could not pick a variant from the document.
    #[error("{path}: selector field {key:?} cannot resolve a variant (found: {found})")]
    UnresolvedSelector {
        path: String,
        key: String,
        found: String,
    },
}

/// Scalar value types supported by leaf rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ScalarKind {
    /// Type name as used in rule mappings.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "integer",
            ScalarKind::Number => "number",
            ScalarKind::Boolean => "boolean",
        }
    }
}

/// A compiled `regex` rule.
///
/// Patterns match from the start of the value, so `[a-z]+` accepts
/// `"abc"` and `"abc9"` but not `"9abc"`.
#[derive(Debug, Clone)]
pub struct FieldRegex {
    /// Pattern as written in the schema, used in messages.
    pub pattern: String,
    compiled: Regex,
}

impl FieldRegex {
    fn new(pattern: &str, path: &str) -> Result<Self, SchemaError> {
        let compiled =
            Regex::new(&format!("^(?:{pattern})")).map_err(|source| SchemaError::BadRegex {
                path: path.to_string(),
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(FieldRegex {
            pattern: pattern.to_string(),
            compiled,
        })
    }

    /// Test a candidate value against the pattern.
    pub fn is_match(&self, text: &str) -> bool {
        self.compiled.is_match(text)
    }
}

/// One parsed schema rule.
#[derive(Debug, Clone, Default)]
pub struct SchemaNode {
    /// Human-readable description shown above the field.
    pub description: Option<String>,
    /// Whether the field must be present.
    pub required: bool,
    /// Default value filled in during normalization.
    pub default: Option<Value>,
    /// Pattern a string value must match.
    pub regex: Option<FieldRegex>,
    /// Whether string values are edited in a multi-line editor.
    pub multiline: bool,
    /// Lower bound for numeric values.
    pub min: Option<f64>,
    /// Upper bound for numeric values.
    pub max: Option<f64>,
    /// Shape classification of the rule.
    pub rule: SchemaRule,
}

/// Shape classification of a rule.
#[derive(Debug, Clone, Default)]
pub enum SchemaRule {
    /// Leaf value of a single scalar type.
    Scalar(ScalarKind),
    /// Homogeneous sequence; every element follows the same rule.
    List(Box<SchemaNode>),
    /// Object with a fixed set of named fields.
    Fields(IndexMap<String, SchemaNode>),
    /// Object whose field set is picked by a discriminator value.
    ///
    /// Variant keys are stored lower-cased; lookups lower-case the
    /// document value, so `kind: QemuArm` matches the variant `qemuarm`.
    Selector {
        key: String,
        variants: IndexMap<String, SchemaNode>,
    },
    /// Mapping with arbitrary keys and a uniform value rule.
    ValuesRules {
        value: Box<SchemaNode>,
        key: Option<Box<SchemaNode>>,
    },
    /// No usable type information; rendered from the value shape.
    #[default]
    Untyped,
}

/// Raw rule mapping as written in the schema file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRule {
    #[serde(rename = "type")]
    type_: Option<Value>,
    required: Option<bool>,
    default: Option<Value>,
    regex: Option<String>,
    description: Option<String>,
    multiline: Option<bool>,
    min: Option<Value>,
    max: Option<Value>,
    schema: Option<Value>,
    valuesrules: Option<Value>,
    keysrules: Option<Value>,
    selector: Option<Value>,
    selector_key: Option<String>,
}

impl SchemaNode {
    /// Parse a single rule mapping into a node.
    ///
    /// `path` is the dot-separated location of the rule inside the schema,
    /// used only in error messages.
    pub fn parse(rule: &Value, path: &str) -> Result<Self, SchemaError> {
        let raw: RawRule =
            serde_json::from_value(rule.clone()).map_err(|e| SchemaError::InvalidRule {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let regex = match &raw.regex {
            Some(pattern) => Some(FieldRegex::new(pattern, path)?),
            None => None,
        };

        let rule = classify(&raw, path)?;

        Ok(SchemaNode {
            description: raw.description,
            required: raw.required.unwrap_or(false),
            default: raw.default,
            regex,
            multiline: raw.multiline.unwrap_or(false),
            min: raw.min.as_ref().and_then(Value::as_f64),
            max: raw.max.as_ref().and_then(Value::as_f64),
            rule,
        })
    }

    /// Resolve the effective shape of this node for a concrete document.
    ///
    /// For most rules this is a direct projection. Selector nodes read the
    /// discriminator field out of `document` and resolve to the matching
    /// variant's field set.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnresolvedSelector`] when the discriminator is
    /// missing, not a string, or matches no declared variant.
    pub fn resolve<'a>(&'a self, document: &Value, path: &str) -> Result<Resolved<'a>, SchemaError> {
        match &self.rule {
            SchemaRule::Scalar(kind) => Ok(Resolved::Scalar(*kind)),
            SchemaRule::List(elem) => Ok(Resolved::List(elem)),
            SchemaRule::Fields(fields) => Ok(Resolved::Fields(fields)),
            SchemaRule::ValuesRules { value, key } => Ok(Resolved::ValuesRules {
                value,
                key: key.as_deref(),
            }),
            SchemaRule::Untyped => Ok(Resolved::Untyped),
            SchemaRule::Selector { key, variants } => {
                let found = document.as_object().and_then(|m| m.get(key.as_str()));
                if let Some(name) = found.and_then(Value::as_str)
                    && let Some(variant) = variants.get(&name.to_lowercase())
                {
                    return variant.resolve(document, path);
                }
                Err(SchemaError::UnresolvedSelector {
                    path: path.to_string(),
                    key: key.clone(),
                    found: found.map(|v| v.to_string()).unwrap_or_else(|| "missing".into()),
                })
            }
        }
    }
}

/// Effective shape of a node once selectors have been resolved.
#[derive(Debug)]
pub enum Resolved<'a> {
    Scalar(ScalarKind),
    List(&'a SchemaNode),
    Fields(&'a IndexMap<String, SchemaNode>),
    ValuesRules {
        value: &'a SchemaNode,
        key: Option<&'a SchemaNode>,
    },
    Untyped,
}

fn classify(raw: &RawRule, path: &str) -> Result<SchemaRule, SchemaError> {
    if let Some(selector) = &raw.selector {
        let map = selector
            .as_object()
            .ok_or_else(|| invalid(path, "'selector' must be a mapping of variants"))?;
        let mut variants = IndexMap::new();
        for (name, fields) in map {
            let variant_path = join_path(path, name);
            let node = SchemaNode {
                rule: SchemaRule::Fields(parse_fields(fields, &variant_path)?),
                ..Default::default()
            };
            variants.insert(name.to_lowercase(), node);
        }
        let key = raw
            .selector_key
            .clone()
            .unwrap_or_else(|| DEFAULT_SELECTOR_KEY.to_string());
        return Ok(SchemaRule::Selector { key, variants });
    }

    if let Some(value_rule) = &raw.valuesrules {
        let value = SchemaNode::parse(value_rule, &join_path(path, "valuesrules"))?;
        let key = match &raw.keysrules {
            Some(key_rule) => Some(Box::new(SchemaNode::parse(
                key_rule,
                &join_path(path, "keysrules"),
            )?)),
            None => None,
        };
        return Ok(SchemaRule::ValuesRules {
            value: Box::new(value),
            key,
        });
    }

    let type_name = match &raw.type_ {
        None => None,
        Some(Value::String(s)) => Some(s.as_str()),
        // Multiple candidate types are allowed; the editor follows the
        // first entry.
        Some(Value::Array(candidates)) => Some(
            candidates
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| invalid(path, "'type' list must start with a type name"))?,
        ),
        Some(_) => {
            return Err(invalid(path, "'type' must be a string or list of strings"));
        }
    };

    match type_name {
        Some("list") => {
            let elem = match &raw.schema {
                Some(rule) => SchemaNode::parse(rule, &join_path(path, "schema"))?,
                None => SchemaNode::default(),
            };
            Ok(SchemaRule::List(Box::new(elem)))
        }
        Some("dict") => match &raw.schema {
            Some(fields) => Ok(SchemaRule::Fields(parse_fields(fields, path)?)),
            None => Ok(SchemaRule::Untyped),
        },
        Some("string") => Ok(SchemaRule::Scalar(ScalarKind::String)),
        Some("integer") => Ok(SchemaRule::Scalar(ScalarKind::Integer)),
        Some("number") | Some("float") => Ok(SchemaRule::Scalar(ScalarKind::Number)),
        Some("boolean") => Ok(SchemaRule::Scalar(ScalarKind::Boolean)),
        Some(other) => Err(SchemaError::UnknownType {
            path: path.to_string(),
            name: other.to_string(),
        }),
        None => match &raw.schema {
            // A bare `schema` mapping implies a dict rule.
            Some(fields) => Ok(SchemaRule::Fields(parse_fields(fields, path)?)),
            None => Ok(SchemaRule::Scalar(ScalarKind::String)),
        },
    }
}

/// Parse a mapping of field names to rules, preserving declaration order.
pub fn parse_fields(value: &Value, path: &str) -> Result<IndexMap<String, SchemaNode>, SchemaError> {
    let map = value
        .as_object()
        .ok_or_else(|| invalid(path, "expected a mapping of field rules"))?;
    let mut fields = IndexMap::new();
    for (name, rule) in map {
        let node = SchemaNode::parse(rule, &join_path(path, name))?;
        fields.insert(name.clone(), node);
    }
    Ok(fields)
}

/// Parsed schema for a whole document.
#[derive(Debug, Clone)]
pub struct SchemaRoot {
    /// Rule covering the document root.
    pub node: SchemaNode,
}

impl TryFrom<&Value> for SchemaRoot {
    type Error = SchemaError;

    /// Parse a schema document.
    ///
    /// When the mapping contains a `__root__` entry, that single rule
    /// covers the whole document. Otherwise the mapping itself is the
    /// field set of a fixed top-level object.
    fn try_from(schema: &Value) -> Result<Self, SchemaError> {
        let map = schema
            .as_object()
            .ok_or_else(|| invalid("", "schema root must be a mapping"))?;

        let node = if let Some(rule) = map.get(ROOT_KEY) {
            SchemaNode::parse(rule, ROOT_KEY)?
        } else {
            SchemaNode {
                rule: SchemaRule::Fields(parse_fields(schema, "")?),
                ..Default::default()
            }
        };
        Ok(SchemaRoot { node })
    }
}

impl SchemaRoot {
    /// Check that every selector reachable through `document` resolves.
    ///
    /// The editor requires resolvable selectors before a page over them is
    /// opened; running this once up front turns malformed input into a
    /// load-time error instead of a mid-session one.
    pub fn check_document(&self, document: &Value) -> Result<(), SchemaError> {
        check_node(&self.node, document, "")
    }
}

fn check_node(node: &SchemaNode, value: &Value, path: &str) -> Result<(), SchemaError> {
    match node.resolve(value, path)? {
        Resolved::Fields(fields) => {
            for (name, sub) in fields {
                if let Some(v) = value.as_object().and_then(|m| m.get(name)) {
                    check_node(sub, v, &join_path(path, name))?;
                }
            }
        }
        Resolved::List(elem) => {
            if let Some(items) = value.as_array() {
                for (idx, v) in items.iter().enumerate() {
                    check_node(elem, v, &join_path(path, &format!("[{idx}]")))?;
                }
            }
        }
        Resolved::ValuesRules { value: rule, .. } => {
            if let Some(map) = value.as_object() {
                for (name, v) in map {
                    check_node(rule, v, &join_path(path, name))?;
                }
            }
        }
        Resolved::Scalar(_) | Resolved::Untyped => {}
    }
    Ok(())
}

/// Join a dot-separated schema path with one more segment.
pub fn join_path(base: &str, segment: &str) -> String {
    if base.is_empty() {
        segment.to_string()
    } else {
        format!("{base}.{segment}")
    }
}

fn invalid(path: &str, reason: &str) -> SchemaError {
    SchemaError::InvalidRule {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_fixed_object() {
        let schema = json!({
            "name": { "type": "string", "required": true, "regex": "[a-z][a-z0-9_]*" },
            "port": { "type": "integer", "default": 8080, "min": 1, "max": 65535 },
            "notes": { "type": "string", "multiline": true, "description": "Free text" },
        });
        let root = SchemaRoot::try_from(&schema).unwrap();

        let SchemaRule::Fields(fields) = &root.node.rule else {
            panic!("expected fields, got {:?}", root.node.rule);
        };
        let keys: Vec<_> = fields.keys().cloned().collect();
        assert_eq!(keys, ["name", "port", "notes"]);

        let name = &fields["name"];
        assert!(name.required);
        let regex = name.regex.as_ref().unwrap();
        assert!(regex.is_match("db_main"));
        assert!(!regex.is_match("9db"));

        let port = &fields["port"];
        assert_eq!(port.default, Some(json!(8080)));
        assert_eq!(port.min, Some(1.0));
        assert_eq!(port.max, Some(65535.0));

        let notes = &fields["notes"];
        assert!(notes.multiline);
        assert_eq!(notes.description.as_deref(), Some("Free text"));
    }

    #[test]
    fn test_type_list_uses_first_candidate() {
        let node = SchemaNode::parse(&json!({ "type": ["integer", "string"] }), "n").unwrap();
        assert!(matches!(node.rule, SchemaRule::Scalar(ScalarKind::Integer)));
    }

    #[test]
    fn test_parse_list_rule() {
        let schema = json!({
            "__root__": {
                "type": "list",
                "schema": { "type": "string", "regex": "v[0-9]+" },
            }
        });
        let root = SchemaRoot::try_from(&schema).unwrap();
        let SchemaRule::List(elem) = &root.node.rule else {
            panic!("expected list, got {:?}", root.node.rule);
        };
        assert!(matches!(elem.rule, SchemaRule::Scalar(ScalarKind::String)));
        assert!(elem.regex.as_ref().unwrap().is_match("v12"));
    }

    #[test]
    fn test_selector_resolution() {
        let schema = json!({
            "machine": {
                "selector": {
                    "qemu": {
                        "kind": { "type": "string", "default": "qemu" },
                        "cpu": { "type": "string" },
                    },
                    "board": {
                        "kind": { "type": "string", "default": "board" },
                        "serial": { "type": "string" },
                    },
                }
            }
        });
        let root = SchemaRoot::try_from(&schema).unwrap();
        let SchemaRule::Fields(fields) = &root.node.rule else {
            panic!("expected fields");
        };
        let machine = &fields["machine"];
        assert!(matches!(machine.rule, SchemaRule::Selector { .. }));

        // 文档中的大小写不影响变体匹配
        let doc = json!({ "kind": "Qemu", "cpu": "cortex-a53" });
        let resolved = machine.resolve(&doc, "machine").unwrap();
        let Resolved::Fields(variant) = resolved else {
            panic!("expected variant fields, got {resolved:?}");
        };
        assert!(variant.contains_key("cpu"));
        assert!(!variant.contains_key("serial"));

        let err = machine.resolve(&json!({}), "machine").unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedSelector { .. }));

        let err = machine
            .resolve(&json!({ "kind": "x86" }), "machine")
            .unwrap_err();
        assert!(err.to_string().contains("x86"));
    }

    #[test]
    fn test_parse_valuesrules() {
        let node = SchemaNode::parse(
            &json!({
                "valuesrules": { "type": "integer", "min": 0 },
                "keysrules": { "type": "string", "regex": "[a-z]+" },
            }),
            "env",
        )
        .unwrap();
        let SchemaRule::ValuesRules { value, key } = &node.rule else {
            panic!("expected valuesrules, got {:?}", node.rule);
        };
        assert!(matches!(value.rule, SchemaRule::Scalar(ScalarKind::Integer)));
        let key = key.as_ref().unwrap();
        assert!(key.regex.as_ref().unwrap().is_match("abc"));
    }

    #[test]
    fn test_implied_dict_without_type() {
        let node = SchemaNode::parse(
            &json!({ "schema": { "x": { "type": "integer" } } }),
            "sub",
        )
        .unwrap();
        assert!(matches!(node.rule, SchemaRule::Fields(_)));
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let err = SchemaNode::parse(&json!({ "type": "datetime" }), "when").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType { .. }));
        assert!(err.to_string().contains("datetime"));
    }

    #[test]
    fn test_bad_regex_is_an_error() {
        let err = SchemaNode::parse(&json!({ "type": "string", "regex": "(" }), "x").unwrap_err();
        assert!(matches!(err, SchemaError::BadRegex { .. }));
    }

    #[test]
    fn test_check_document_walks_nested_selectors() {
        let schema = json!({
            "jobs": {
                "type": "list",
                "schema": {
                    "selector": {
                        "shell": {
                            "kind": { "type": "string" },
                            "cmd": { "type": "string" },
                        },
                    }
                },
            }
        });
        let root = SchemaRoot::try_from(&schema).unwrap();

        root.check_document(&json!({ "jobs": [ { "kind": "shell", "cmd": "ls" } ] }))
            .unwrap();

        let err = root
            .check_document(&json!({ "jobs": [ { "cmd": "ls" } ] }))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedSelector { .. }));
        assert!(err.to_string().contains("jobs.[0]"));
    }
}
