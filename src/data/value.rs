//! Small helpers for rendering and classifying document values.

use serde_json::Value;

/// Render a short YAML preview of a nested value.
///
/// Used on drill-down rows so the user can see what is behind a field
/// without entering it.
pub fn preview(value: &Value) -> String {
    let text = serde_yaml::to_string(value).unwrap_or_else(|_| value.to_string());
    ellipsis(text.trim_end(), 60, 10)
}

/// Clip text to `max_w` columns and `max_h` rows, marking cuts with `...`.
pub fn ellipsis(text: &str, max_w: usize, max_h: usize) -> String {
    let mut rows: Vec<String> = text
        .trim_matches('\n')
        .split('\n')
        .map(str::to_string)
        .collect();
    if rows.len() > max_h {
        rows.truncate(max_h.saturating_sub(1));
        rows.push("...".to_string());
    }
    for row in &mut rows {
        if row.chars().count() > max_w {
            let cut: String = row.chars().take(max_w.saturating_sub(3)).collect();
            *row = format!("{cut}...");
        }
    }
    rows.join("\n")
}

/// Text shown in an edit view for a scalar value.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Whether a folded element counts as empty.
///
/// Empty elements are dropped from lists and nulls from mappings when a
/// child page's document is folded back into its parent. Numeric zero and
/// `false` are real values and never dropped.
pub fn is_empty_element(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Python-style title casing, used for selector option labels.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ellipsis_clips_wide_rows() {
        let text = "a".repeat(70);
        let out = ellipsis(&text, 60, 10);
        assert_eq!(out.chars().count(), 60);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_ellipsis_clips_tall_text() {
        let text = (0..15).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let out = ellipsis(&text, 60, 10);
        let rows: Vec<_> = out.split('\n').collect();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[8], "8");
        assert_eq!(rows[9], "...");
    }

    #[test]
    fn test_ellipsis_keeps_short_text() {
        assert_eq!(ellipsis("hello", 60, 10), "hello");
    }

    #[test]
    fn test_preview_is_yaml() {
        let out = preview(&json!({ "a": 1, "b": ["x"] }));
        assert!(out.contains("a: 1"));
        assert!(out.contains("- x"));
    }

    #[test]
    fn test_is_empty_element() {
        assert!(is_empty_element(&Value::Null));
        assert!(is_empty_element(&json!("")));
        assert!(is_empty_element(&json!([])));
        assert!(is_empty_element(&json!({})));
        // 0和false是有效值，不能按空处理
        assert!(!is_empty_element(&json!(0)));
        assert!(!is_empty_element(&json!(false)));
        assert!(!is_empty_element(&json!("x")));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("qemu"), "Qemu");
        assert_eq!(title_case("qemu-virt"), "Qemu-Virt");
        assert_eq!(title_case("x86"), "X86");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&json!("abc")), "abc");
        assert_eq!(scalar_text(&json!(42)), "42");
        assert_eq!(scalar_text(&json!(2.5)), "2.5");
        assert_eq!(scalar_text(&json!(true)), "true");
        assert_eq!(scalar_text(&Value::Null), "");
    }
}
