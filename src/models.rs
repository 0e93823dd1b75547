use serde::{Serialize, Serializer};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// Marker written in place of any absent or unusable value.
pub const MISSING: &str = "unknown";

/// Silver column order. Header rows and table columns follow it.
pub const COLUMNS: [&str; 15] = [
    "slug_title",
    "job_id",
    "company_name",
    "title",
    "description",
    "description_length",
    "remote",
    "url",
    "city",
    "region",
    "country",
    "created_at",
    "created_date",
    "created_year",
    "created_month",
];

/// One listing as it arrives from the job board. Unknown keys are dropped.
#[derive(Debug, Clone, Default)]
pub struct RawJob {
    pub slug: Option<Value>,
    pub company_name: Option<Value>,
    pub title: Option<Value>,
    pub description: Option<Value>,
    pub remote: Option<Value>,
    pub url: Option<Value>,
    pub location: Option<Value>,
    pub created_at: Option<Value>, // epoch seconds, string or number
}

impl RawJob {
    /// Reads the recognized keys; a non-object yields a record with every key absent.
    pub fn from_value(value: &Value) -> Self {
        let field = |key: &str| value.get(key).filter(|v| !v.is_null()).cloned();
        Self {
            slug: field("slug"),
            company_name: field("company_name"),
            title: field("title"),
            description: field("description"),
            remote: field("remote"),
            url: field("url"),
            location: field("location"),
            created_at: field("created_at"),
        }
    }
}

/// Textual view of a raw scalar. Strings borrow, numbers and booleans render
/// as JSON text, containers count as absent.
pub fn value_text(value: Option<&Value>) -> Option<Cow<'_, str>> {
    match value? {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// A silver cell: text, an integer, or the missing marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Missing,
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Missing => f.write_str(MISSING),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Integer(n) => serializer.serialize_i64(*n),
            FieldValue::Missing => serializer.serialize_str(MISSING),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Integer(value.into())
    }
}

/// One cleaned listing. Field order matches [`COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanedJob {
    pub slug_title: FieldValue,
    pub job_id: FieldValue, // digits kept as text, never parsed
    pub company_name: FieldValue,
    pub title: FieldValue,
    pub description: FieldValue,
    pub description_length: usize,
    pub remote: u8, // always 0 or 1
    pub url: FieldValue,
    pub city: FieldValue,
    pub region: FieldValue,
    pub country: FieldValue,
    pub created_at: FieldValue,
    pub created_date: FieldValue,
    pub created_year: FieldValue,
    pub created_month: FieldValue,
}

impl CleanedJob {
    /// Cells in column order, rendered the way the silver CSV stores them.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.slug_title.to_string(),
            self.job_id.to_string(),
            self.company_name.to_string(),
            self.title.to_string(),
            self.description.to_string(),
            self.description_length.to_string(),
            self.remote.to_string(),
            self.url.to_string(),
            self.city.to_string(),
            self.region.to_string(),
            self.country.to_string(),
            self.created_at.to_string(),
            self.created_date.to_string(),
            self.created_year.to_string(),
            self.created_month.to_string(),
        ]
    }
}

/// A row read back from the store.
#[derive(Debug, Clone, Serialize)]
pub struct StoredJob {
    pub job_id: String,
    pub slug_title: String,
    pub company_name: String,
    pub title: String,
    pub description: String,
    pub description_length: i64,
    pub remote: i64,
    pub url: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub created_at: String,
    pub loaded_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_job_from_value_reads_known_keys() {
        let raw = RawJob::from_value(&json!({
            "slug": "dev-1",
            "remote": true,
            "url": null,
            "tags": ["ignored"]
        }));
        assert_eq!(raw.slug, Some(json!("dev-1")));
        assert_eq!(raw.remote, Some(json!(true)));
        assert!(raw.url.is_none());
        assert!(raw.title.is_none());
    }

    #[test]
    fn test_raw_job_from_non_object() {
        let raw = RawJob::from_value(&json!("not a record"));
        assert!(raw.slug.is_none());
        assert!(raw.created_at.is_none());
    }

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(Some(&json!("abc"))).as_deref(), Some("abc"));
        assert_eq!(value_text(Some(&json!(42))).as_deref(), Some("42"));
        assert_eq!(value_text(Some(&json!(false))).as_deref(), Some("false"));
        assert_eq!(value_text(Some(&json!([1, 2]))), None);
        assert_eq!(value_text(None), None);
    }

    #[test]
    fn test_field_value_rendering() {
        assert_eq!(FieldValue::Missing.to_string(), "unknown");
        assert_eq!(FieldValue::from(2026_i64).to_string(), "2026");
        assert_eq!(
            serde_json::to_value(FieldValue::Missing).unwrap(),
            json!("unknown")
        );
        assert_eq!(serde_json::to_value(FieldValue::from(7_i64)).unwrap(), json!(7));
    }
}
