//! Result and schema types shared by every [`super::GenerationClient`].

use schemars::JsonSchema;
use serde_json::Value;
use thiserror::Error;

/// Outcome of one call to the generation service.
///
/// Callers match on the variant instead of probing a loosely-typed
/// response object.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation<T> {
    /// A result that conforms to the requested schema.
    Structured(T),
    /// Free-form text, returned by plain completions.
    PlainText(String),
    /// The call failed.
    Error(ErrorKind),
}

impl<T> Generation<T> {
    /// Expect a plain-text result.
    pub fn into_text(self) -> Result<String, ErrorKind> {
        match self {
            Self::PlainText(text) => Ok(text),
            Self::Structured(_) => Err(ErrorKind::UnexpectedShape {
                expected: "plain text",
                actual: "structured",
            }),
            Self::Error(kind) => Err(kind),
        }
    }

    /// Expect a structured result.
    pub fn into_structured(self) -> Result<T, ErrorKind> {
        match self {
            Self::Structured(value) => Ok(value),
            Self::PlainText(_) => Err(ErrorKind::UnexpectedShape {
                expected: "structured",
                actual: "plain text",
            }),
            Self::Error(kind) => Err(kind),
        }
    }
}

impl<T> From<Result<T, ErrorKind>> for Generation<T> {
    fn from(result: Result<T, ErrorKind>) -> Self {
        match result {
            Ok(value) => Self::Structured(value),
            Err(kind) => Self::Error(kind),
        }
    }
}

/// Why a generation call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("response does not conform to schema {schema:?}: {detail}")]
    SchemaViolation { schema: String, detail: String },

    #[error("response contained no content")]
    EmptyResponse,

    #[error("expected a {expected} response, got {actual}")]
    UnexpectedShape {
        expected: &'static str,
        actual: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Schema descriptor
// ---------------------------------------------------------------------------

/// A named JSON schema describing the fields a structured call must return.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    pub name: String,
    pub schema: Value,
}

impl SchemaDescriptor {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Derive the descriptor from a type's `JsonSchema` implementation.
    pub fn for_type<T: JsonSchema>() -> Self {
        let root = schemars::schema_for!(T);
        Self::new(
            T::schema_name(),
            serde_json::to_value(&root).unwrap_or_default(),
        )
    }

    /// Names listed under the schema's top-level `required` key.
    pub fn required_fields(&self) -> Vec<&str> {
        self.schema
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Check that `value` is an object carrying every required field with
    /// the declared top-level JSON type.
    pub fn check(&self, value: &Value) -> Result<(), ErrorKind> {
        let object = value
            .as_object()
            .ok_or_else(|| self.violation("expected a JSON object"))?;

        for field in self.required_fields() {
            let Some(field_value) = object.get(field) else {
                return Err(self.violation(format!("missing required field `{field}`")));
            };
            let declared = self
                .schema
                .pointer(&format!("/properties/{field}/type"))
                .and_then(Value::as_str);
            if let Some(declared) = declared {
                if !json_type_matches(declared, field_value) {
                    return Err(
                        self.violation(format!("field `{field}` should be of type {declared}"))
                    );
                }
            }
        }
        Ok(())
    }

    pub(crate) fn violation(&self, detail: impl Into<String>) -> ErrorKind {
        ErrorKind::SchemaViolation {
            schema: self.name.clone(),
            detail: detail.into(),
        }
    }
}

fn json_type_matches(declared: &str, value: &Value) -> bool {
    match declared {
        "string" => value.is_string(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "boolean" => value.is_boolean(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "null" => value.is_null(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Sample {
        /// A title.
        title: String,
        tags: Vec<String>,
        note: Option<String>,
    }

    #[test]
    fn into_text_and_structured() {
        let text: Generation<Value> = Generation::PlainText("hi".to_string());
        assert_eq!(text.into_text().unwrap(), "hi");

        let structured = Generation::Structured(json!({"a": 1}));
        assert_eq!(structured.into_structured().unwrap(), json!({"a": 1}));
    }

    #[test]
    fn wrong_variant_is_unexpected_shape() {
        let text: Generation<Value> = Generation::PlainText("hi".to_string());
        assert!(matches!(
            text.into_structured(),
            Err(ErrorKind::UnexpectedShape { expected: "structured", .. })
        ));

        let structured = Generation::Structured(json!({}));
        assert!(matches!(
            structured.into_text(),
            Err(ErrorKind::UnexpectedShape { expected: "plain text", .. })
        ));
    }

    #[test]
    fn error_variant_passes_through() {
        let failed: Generation<Value> = Generation::Error(ErrorKind::EmptyResponse);
        assert_eq!(failed.into_text(), Err(ErrorKind::EmptyResponse));
    }

    #[test]
    fn descriptor_from_type_lists_required_fields() {
        let descriptor = SchemaDescriptor::for_type::<Sample>();
        assert_eq!(descriptor.name, "Sample");
        let required = descriptor.required_fields();
        assert!(required.contains(&"title"));
        assert!(required.contains(&"tags"));
        assert!(!required.contains(&"note"));
    }

    #[test]
    fn check_accepts_conforming_value() {
        let descriptor = SchemaDescriptor::for_type::<Sample>();
        let value = json!({"title": "x", "tags": ["a"]});
        assert!(descriptor.check(&value).is_ok());
    }

    #[test]
    fn check_rejects_missing_field() {
        let descriptor = SchemaDescriptor::for_type::<Sample>();
        let err = descriptor.check(&json!({"title": "x"})).unwrap_err();
        match err {
            ErrorKind::SchemaViolation { schema, detail } => {
                assert_eq!(schema, "Sample");
                assert!(detail.contains("tags"), "detail: {detail}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn check_rejects_wrong_type_and_non_object() {
        let descriptor = SchemaDescriptor::for_type::<Sample>();
        assert!(descriptor
            .check(&json!({"title": "x", "tags": "not-a-list"}))
            .is_err());
        assert!(descriptor.check(&json!(["title"])).is_err());
    }
}
