//! Schema-driven validation of submitted block values
//!
//! Rules come from the field's `required` flag and from
//! `details.validation.rule`, either a pipe string (`"required|max:120"`)
//! or a list of rule strings.

use std::collections::HashMap;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::template::{FieldDescriptor, TemplateSchema};
use crate::errors::ValidationErrors;
use crate::files::UploadedFile;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("valid url pattern"));

#[derive(Debug, Clone, PartialEq)]
enum Rule {
    Required,
    Max(f64),
    Min(f64),
    Numeric,
    Integer,
    Email,
    Url,
    In(Vec<String>),
}

fn parse_rule(raw: &str) -> Option<Rule> {
    let (name, arg) = match raw.split_once(':') {
        Some((name, arg)) => (name.trim(), Some(arg.trim())),
        None => (raw.trim(), None),
    };
    match (name, arg) {
        ("required", _) => Some(Rule::Required),
        ("max", Some(n)) => n.parse().ok().map(Rule::Max),
        ("min", Some(n)) => n.parse().ok().map(Rule::Min),
        ("numeric", _) => Some(Rule::Numeric),
        ("integer", _) => Some(Rule::Integer),
        ("email", _) => Some(Rule::Email),
        ("url", _) => Some(Rule::Url),
        ("in", Some(options)) => Some(Rule::In(
            options.split(',').map(|o| o.trim().to_string()).collect(),
        )),
        _ => None,
    }
}

fn field_rules(field: &FieldDescriptor) -> Vec<Rule> {
    let mut rules = Vec::new();
    if field.required {
        rules.push(Rule::Required);
    }
    let configured = field.details.get("validation").and_then(|v| v.get("rule"));
    let raw: Vec<String> = match configured {
        Some(Value::String(s)) => s.split('|').map(str::to_string).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|i| i.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    for rule in raw.iter().filter_map(|r| parse_rule(r)) {
        if !rules.contains(&rule) {
            rules.push(rule);
        }
    }
    rules
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        _ => false,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        other => other.to_string(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn size_of(value: &Value, numeric: bool) -> f64 {
    match value {
        Value::Array(items) => items.len() as f64,
        _ if numeric => as_number(value).unwrap_or(0.0),
        _ => as_text(value).chars().count() as f64,
    }
}

fn is_boolish(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Number(n) => matches!(n.as_i64(), Some(0) | Some(1)),
        Value::String(s) => matches!(s.as_str(), "0" | "1" | "true" | "false" | "on" | "off"),
        _ => false,
    }
}

/// Validate `values` (plus pending `uploads`) against `schema`.
///
/// Upload fields count as present when they either carry a new upload or
/// already hold a stored reference in `values`.
pub fn validate_block(
    schema: &TemplateSchema,
    values: &Map<String, Value>,
    uploads: &HashMap<String, Vec<UploadedFile>>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    for field in schema.data_fields() {
        let name = &field.field;
        let label = &field.display_name;
        let rules = field_rules(field);
        let value = values.get(name);
        let field_uploads = uploads.get(name).map(Vec::as_slice).unwrap_or_default();
        let present = !field_uploads.is_empty() || !is_blank(value);

        if !present {
            if rules.contains(&Rule::Required) {
                errors.add(name, format!("The {} field is required.", label));
            }
            continue;
        }

        if field.expects_image() && field_uploads.iter().any(|u| !u.is_image()) {
            errors.add(name, format!("The {} must be an image.", label));
        }

        let Some(value) = value.filter(|_| field_uploads.is_empty()) else {
            continue;
        };

        let numeric = field.field_type == "number"
            || rules.iter().any(|r| matches!(r, Rule::Numeric | Rule::Integer));

        match field.field_type.as_str() {
            "number" if as_number(value).is_none() => {
                errors.add(name, format!("The {} must be a number.", label));
            }
            "date" if NaiveDate::parse_from_str(&as_text(value), "%Y-%m-%d").is_err() => {
                errors.add(name, format!("The {} is not a valid date.", label));
            }
            "checkbox" if !is_boolish(value) => {
                errors.add(name, format!("The {} field must be true or false.", label));
            }
            _ => {}
        }

        for rule in &rules {
            match rule {
                Rule::Required => {}
                Rule::Max(max) if size_of(value, numeric) > *max => {
                    let message = if numeric {
                        format!("The {} may not be greater than {}.", label, max)
                    } else {
                        format!("The {} may not be greater than {} characters.", label, max)
                    };
                    errors.add(name, message);
                }
                Rule::Min(min) if size_of(value, numeric) < *min => {
                    let message = if numeric {
                        format!("The {} must be at least {}.", label, min)
                    } else {
                        format!("The {} must be at least {} characters.", label, min)
                    };
                    errors.add(name, message);
                }
                Rule::Numeric if as_number(value).is_none() => {
                    errors.add(name, format!("The {} must be a number.", label));
                }
                Rule::Integer if as_text(value).trim().parse::<i64>().is_err() => {
                    errors.add(name, format!("The {} must be an integer.", label));
                }
                Rule::Email if !EMAIL.is_match(as_text(value).trim()) => {
                    errors.add(name, format!("The {} must be a valid email address.", label));
                }
                Rule::Url if !URL.is_match(as_text(value).trim()) => {
                    errors.add(name, format!("The {} format is invalid.", label));
                }
                Rule::In(options) if !options.contains(&as_text(value)) => {
                    errors.add(name, format!("The selected {} is invalid.", label));
                }
                _ => {}
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::template::TemplateResolver;
    use crate::config::AppConfig;
    use serde_json::json;
    use std::sync::Arc;

    fn schema() -> TemplateSchema {
        let config = AppConfig::from_yaml_str(
            r#"
page_blocks:
  contact:
    fields:
      title:
        display_name: Title
        type: text
        required: 1
        details:
          validation:
            rule: "max:10"
      email:
        display_name: Email
        type: text
        details:
          validation:
            rule: [email]
      count:
        display_name: Count
        type: number
        details:
          validation:
            rule: "min:2|max:5"
      style:
        display_name: Style
        type: select_dropdown
        details:
          validation:
            rule: "in:light,dark"
      starts:
        display_name: Starts
        type: date
      photo:
        display_name: Photo
        type: image
        required: true
"#,
        )
        .unwrap();
        TemplateResolver::new(Arc::new(config.page_blocks))
            .resolve("contact")
            .unwrap()
    }

    fn values(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_submission_passes() {
        let result = validate_block(
            &schema(),
            &values(json!({
                "title": "Hello",
                "email": "a@b.io",
                "count": "3",
                "style": "dark",
                "starts": "2024-02-29",
                "photo": "blocks/1/existing.png"
            })),
            &HashMap::new(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_required_fields_reported() {
        let errors = validate_block(&schema(), &values(json!({"title": ""})), &HashMap::new())
            .unwrap_err();
        assert_eq!(
            errors.get("title").unwrap(),
            &["The Title field is required.".to_string()]
        );
        assert!(errors.get("photo").is_some());
        assert!(errors.get("email").is_none());
    }

    #[test]
    fn test_rule_violations_reported() {
        let errors = validate_block(
            &schema(),
            &values(json!({
                "title": "Far too long a title",
                "email": "nope",
                "count": 9,
                "style": "neon",
                "starts": "29/02/2024",
                "photo": "x.png"
            })),
            &HashMap::new(),
        )
        .unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["title", "email", "count", "style", "starts"]
        );
        assert_eq!(
            errors.get("count").unwrap(),
            &["The Count may not be greater than 5.".to_string()]
        );
    }

    #[test]
    fn test_uploads_satisfy_required_and_must_be_images() {
        let mut uploads = HashMap::new();
        uploads.insert(
            "photo".to_string(),
            vec![UploadedFile::new("doc.pdf", Some("application/pdf"), vec![1])],
        );
        let errors = validate_block(&schema(), &values(json!({"title": "Hi"})), &uploads)
            .unwrap_err();
        assert_eq!(
            errors.get("photo").unwrap(),
            &["The Photo must be an image.".to_string()]
        );

        uploads.insert(
            "photo".to_string(),
            vec![UploadedFile::new("a.png", Some("image/png"), vec![1])],
        );
        assert!(validate_block(&schema(), &values(json!({"title": "Hi"})), &uploads).is_ok());
    }
}
