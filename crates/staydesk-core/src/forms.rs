// Form pipeline: declarative validation, payload flattening, submission
//
// validate → build mutation → mutate → toast. Nothing is kept between
// submissions; a failed validation never reaches the network.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Number, Value};
use staydesk_api::FormPart;

use crate::{endpoints::Mutation, slice::ApiSlice, toast::Notifier};

/// One field's value as entered
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    Number(f64),
    Bool(bool),
    List(Vec<FormValue>),
    Group(BTreeMap<String, FormValue>),
    File {
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

impl FormValue {
    pub fn text(value: impl Into<String>) -> Self {
        FormValue::Text(value.into())
    }

    fn is_blank(&self) -> bool {
        match self {
            FormValue::Text(s) => s.trim().is_empty(),
            FormValue::List(items) => items.is_empty(),
            FormValue::Group(map) => map.is_empty(),
            FormValue::File { bytes, .. } => bytes.is_empty(),
            FormValue::Number(_) | FormValue::Bool(_) => false,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            FormValue::Number(n) => Some(*n),
            FormValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn is_file(&self) -> bool {
        matches!(self, FormValue::File { .. })
    }

    /// JSON view; files collapse to their file name
    pub fn to_json(&self) -> Value {
        match self {
            FormValue::Text(s) => Value::String(s.clone()),
            FormValue::Number(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
            FormValue::Bool(b) => Value::Bool(*b),
            FormValue::List(items) => Value::Array(items.iter().map(FormValue::to_json).collect()),
            FormValue::Group(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
            FormValue::File { file_name, .. } => Value::String(file_name.clone()),
        }
    }
}

pub type FormValues = BTreeMap<String, FormValue>;

/// Validation rule for one field
///
/// Every rule except `Required` ignores blank values.
#[derive(Debug, Clone)]
pub enum Rule {
    Required,
    MinLength(usize),
    MaxLength(usize),
    Email,
    Min(f64),
    Max(f64),
    Pattern { regex: Regex, message: String },
    OneOf(Vec<String>),
}

impl Rule {
    pub fn pattern(pattern: &str, message: &str) -> Result<Self, regex::Error> {
        Ok(Rule::Pattern {
            regex: Regex::new(pattern)?,
            message: message.to_string(),
        })
    }

    pub fn one_of(options: &[&str]) -> Self {
        Rule::OneOf(options.iter().map(|s| s.to_string()).collect())
    }

    fn check(&self, field: &str, value: Option<&FormValue>) -> Option<String> {
        let label = humanize(field);

        let value = match value {
            Some(v) if !v.is_blank() => v,
            _ => {
                return matches!(self, Rule::Required).then(|| format!("{} is required", label));
            }
        };

        match self {
            Rule::Required => None,
            Rule::MinLength(min) => (length(value) < *min)
                .then(|| format!("{} must be at least {} characters", label, min)),
            Rule::MaxLength(max) => (length(value) > *max)
                .then(|| format!("{} must be at most {} characters", label, max)),
            Rule::Email => match value {
                FormValue::Text(s) if email_regex().is_match(s.trim()) => None,
                _ => Some(format!("{} must be a valid email", label)),
            },
            Rule::Min(min) => match value.as_number() {
                None => Some(format!("{} must be a number", label)),
                Some(n) => (n < *min).then(|| format!("{} must be at least {}", label, min)),
            },
            Rule::Max(max) => match value.as_number() {
                None => Some(format!("{} must be a number", label)),
                Some(n) => (n > *max).then(|| format!("{} must be at most {}", label, max)),
            },
            Rule::Pattern { regex, message } => match value {
                FormValue::Text(s) if regex.is_match(s) => None,
                _ => Some(message.clone()),
            },
            Rule::OneOf(options) => match value {
                FormValue::Text(s) if options.iter().any(|o| o == s) => None,
                _ => Some(format!("{} must be one of: {}", label, options.join(", "))),
            },
        }
    }
}

fn length(value: &FormValue) -> usize {
    match value {
        FormValue::Text(s) => s.trim().chars().count(),
        FormValue::List(items) => items.len(),
        _ => 0,
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid"))
}

/// `maxGuests` → `Max guests`, `base_price` → `Base price`
fn humanize(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    for (i, c) in field.chars().enumerate() {
        if c == '_' || c == '-' {
            out.push(' ');
        } else if c.is_uppercase() && i > 0 {
            out.push(' ');
            out.extend(c.to_lowercase());
        } else if i == 0 {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Field-keyed messages, rendered next to each input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    fn push(&mut self, field: &str, message: String) {
        self.fields.entry(field.to_string()).or_default().push(message);
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .flat_map(|(field, msgs)| msgs.iter().map(move |m| format!("{}: {}", field, m)))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(String, Vec<Rule>)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, rules: Vec<Rule>) -> Self {
        self.fields.push((name.to_string(), rules));
        self
    }

    pub fn validate(&self, values: &FormValues) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        for (name, rules) in &self.fields {
            let value = values.get(name);
            for rule in rules {
                if let Some(message) = rule.check(name, value) {
                    errors.push(name, message);
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn property() -> Self {
        Schema::new()
            .field("title", vec![Rule::Required, Rule::MaxLength(120)])
            .field("description", vec![Rule::Required, Rule::MinLength(20)])
            .field("location", vec![Rule::Required])
            .field("category", vec![Rule::Required])
            .field("price", vec![Rule::Required, Rule::Min(0.0)])
            .field("maxGuests", vec![Rule::Min(1.0), Rule::Max(50.0)])
            .field("status", vec![Rule::one_of(&["active", "inactive"])])
    }

    pub fn content() -> Self {
        let slug = Rule::Pattern {
            regex: slug_regex().clone(),
            message: "Slug may only contain lowercase letters, digits and dashes".to_string(),
        };
        Schema::new()
            .field("title", vec![Rule::Required, Rule::MaxLength(160)])
            .field("slug", vec![Rule::Required, slug])
            .field("body", vec![Rule::Required])
    }

    pub fn category() -> Self {
        Schema::new().field("name", vec![Rule::Required, Rule::MaxLength(60)])
    }

    pub fn user() -> Self {
        Schema::new()
            .field("name", vec![Rule::Required])
            .field("email", vec![Rule::Required, Rule::Email])
            .field("role", vec![Rule::one_of(&["admin", "manager", "staff"])])
    }
}

fn slug_regex() -> &'static Regex {
    static SLUG: OnceLock<Regex> = OnceLock::new();
    SLUG.get_or_init(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("slug regex is valid"))
}

/// Flatten form values into multipart parts
///
/// Scalars become text fields, files become file fields (a list of files
/// becomes repeated file fields), and nested groups or lists are sent as a
/// single JSON string.
pub fn to_multipart(values: &FormValues) -> Vec<FormPart> {
    let mut parts = Vec::new();
    for (name, value) in values {
        match value {
            FormValue::Text(s) => parts.push(FormPart::text(name, s.clone())),
            FormValue::Number(n) => parts.push(FormPart::text(name, n.to_string())),
            FormValue::Bool(b) => parts.push(FormPart::text(name, b.to_string())),
            FormValue::File { .. } => parts.extend(file_part(name, value)),
            FormValue::List(items) if !items.is_empty() && items.iter().all(FormValue::is_file) => {
                parts.extend(items.iter().filter_map(|item| file_part(name, item)));
            }
            FormValue::List(_) | FormValue::Group(_) => {
                parts.push(FormPart::text(name, value.to_json().to_string()));
            }
        }
    }
    parts
}

fn file_part(name: &str, value: &FormValue) -> Option<FormPart> {
    match value {
        FormValue::File {
            file_name,
            mime,
            bytes,
        } => Some(FormPart::File {
            name: name.to_string(),
            file_name: file_name.clone(),
            mime: mime.clone(),
            bytes: bytes.clone(),
        }),
        _ => None,
    }
}

/// JSON body for endpoints that do not take multipart
pub fn to_json(values: &FormValues) -> Value {
    Value::Object(
        values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Blocked before any request; show these next to the fields
    Invalid(ValidationErrors),
    /// The server said no; the toast already showed this message
    Failed(String),
    Done(Value),
}

/// Validate, send, and toast
pub async fn submit<F>(
    slice: &ApiSlice,
    notifier: &dyn Notifier,
    schema: &Schema,
    values: &FormValues,
    success_message: &str,
    build: F,
) -> SubmitOutcome
where
    F: FnOnce(&FormValues) -> Mutation,
{
    if let Err(errors) = schema.validate(values) {
        return SubmitOutcome::Invalid(errors);
    }

    match slice
        .mutate_with_toast(build(values), notifier, success_message)
        .await
    {
        Ok(value) => SubmitOutcome::Done(value),
        Err(err) => SubmitOutcome::Failed(err.user_message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, FormValue)]) -> FormValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn valid_property() -> FormValues {
        values(&[
            ("title", FormValue::text("Cliff House")),
            (
                "description",
                FormValue::text("Three bedrooms above the bay, sleeps six."),
            ),
            ("location", FormValue::text("Cornwall")),
            ("category", FormValue::text("c1")),
            ("price", FormValue::Number(240.0)),
            ("maxGuests", FormValue::text("6")),
            ("status", FormValue::text("active")),
        ])
    }

    #[test]
    fn test_valid_property_passes() {
        assert!(Schema::property().validate(&valid_property()).is_ok());
    }

    #[test]
    fn test_missing_and_bad_fields_are_reported_per_field() {
        let mut form = valid_property();
        form.remove("title");
        form.insert("price".into(), FormValue::text("cheap"));
        form.insert("maxGuests".into(), FormValue::Number(0.0));

        let errors = Schema::property().validate(&form).unwrap_err();
        assert_eq!(errors.get("title"), ["Title is required"]);
        assert_eq!(errors.get("price"), ["Price must be a number"]);
        assert_eq!(errors.get("maxGuests"), ["Max guests must be at least 1"]);
        assert!(errors.get("location").is_empty());
    }

    #[test]
    fn test_optional_fields_skip_rules_when_blank() {
        let mut form = valid_property();
        form.insert("status".into(), FormValue::text(""));
        form.remove("maxGuests");
        assert!(Schema::property().validate(&form).is_ok());
    }

    #[test]
    fn test_user_email_and_role() {
        let form = values(&[
            ("name", FormValue::text("Ana")),
            ("email", FormValue::text("ana@")),
            ("role", FormValue::text("owner")),
        ]);
        let errors = Schema::user().validate(&form).unwrap_err();
        assert_eq!(errors.get("email"), ["Email must be a valid email"]);
        assert_eq!(
            errors.get("role"),
            ["Role must be one of: admin, manager, staff"]
        );
    }

    #[test]
    fn test_content_slug_pattern() {
        let mut form = values(&[
            ("title", FormValue::text("House rules")),
            ("slug", FormValue::text("House Rules")),
            ("body", FormValue::text("No parties.")),
        ]);
        assert!(Schema::content().validate(&form).is_err());

        form.insert("slug".into(), FormValue::text("house-rules"));
        assert!(Schema::content().validate(&form).is_ok());
    }

    #[test]
    fn test_multipart_flattens_nested_groups() {
        let mut amenities = BTreeMap::new();
        amenities.insert("wifi".to_string(), FormValue::Bool(true));
        amenities.insert("parking".to_string(), FormValue::Number(2.0));

        let form = values(&[
            ("title", FormValue::text("Loft")),
            ("price", FormValue::Number(99.5)),
            ("amenities", FormValue::Group(amenities)),
            (
                "tags",
                FormValue::List(vec![FormValue::text("city"), FormValue::text("quiet")]),
            ),
            (
                "images",
                FormValue::List(vec![
                    FormValue::File {
                        file_name: "a.jpg".into(),
                        mime: "image/jpeg".into(),
                        bytes: vec![1],
                    },
                    FormValue::File {
                        file_name: "b.jpg".into(),
                        mime: "image/jpeg".into(),
                        bytes: vec![2],
                    },
                ]),
            ),
        ]);

        let parts = to_multipart(&form);
        assert!(parts.contains(&FormPart::text("amenities", r#"{"parking":2.0,"wifi":true}"#)));
        assert!(parts.contains(&FormPart::text("tags", r#"["city","quiet"]"#)));
        assert!(parts.contains(&FormPart::text("price", "99.5")));
        assert!(parts.contains(&FormPart::text("title", "Loft")));
        assert_eq!(parts.iter().filter(|p| p.name() == "images").count(), 2);
    }

    #[test]
    fn test_to_json() {
        let form = values(&[
            ("name", FormValue::text("Villas")),
            ("featured", FormValue::Bool(false)),
        ]);
        assert_eq!(
            to_json(&form),
            serde_json::json!({"name": "Villas", "featured": false})
        );
    }

    #[test]
    fn test_custom_pattern_rule() {
        let schema = Schema::new().field(
            "phone",
            vec![Rule::pattern(r"^\+?[0-9 ]{7,}$", "Enter a phone number").unwrap()],
        );
        let bad = values(&[("phone", FormValue::text("call me"))]);
        let errors = schema.validate(&bad).unwrap_err();
        assert_eq!(errors.get("phone"), ["Enter a phone number".to_string()]);

        let good = values(&[("phone", FormValue::text("+44 1234 567890"))]);
        assert!(schema.validate(&good).is_ok());
        assert!(Rule::pattern("(", "broken").is_err());
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("maxGuests"), "Max guests");
        assert_eq!(humanize("base_price"), "Base price");
        assert_eq!(humanize("title"), "Title");
    }
}
