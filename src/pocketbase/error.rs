use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// Error body returned by the backend for any non-2xx response.
///
/// Shape: `{"code": 400, "message": "...", "data": {"email": {"code": "...", "message": "..."}}}`.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub data: HashMap<String, FieldError>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize)]
struct RawApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: HashMap<String, serde_json::Value>,
}

const NOT_UNIQUE_CODE: &str = "validation_not_unique";

impl ApiError {
    /// Decodes a backend error body; anything unparsable becomes the message verbatim.
    pub fn from_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<RawApiError>(body) {
            Ok(raw) => {
                let data = raw
                    .data
                    .into_iter()
                    .filter_map(|(field, value)| {
                        serde_json::from_value::<FieldError>(value)
                            .ok()
                            .map(|e| (field, e))
                    })
                    .collect();
                let message = if raw.message.is_empty() {
                    format!("backend returned status {status}")
                } else {
                    raw.message
                };
                Self {
                    status,
                    message,
                    data,
                }
            }
            Err(_) => Self {
                status,
                message: if body.trim().is_empty() {
                    format!("backend returned status {status}")
                } else {
                    body.trim().to_string()
                },
                data: HashMap::new(),
            },
        }
    }

    pub fn field_message(&self, field: &str) -> Option<&str> {
        self.data
            .get(field)
            .map(|e| e.message.as_str())
            .filter(|m| !m.is_empty())
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.data.contains_key(field)
    }

    /// True when the backend rejected a write because of a unique index.
    pub fn is_not_unique(&self) -> bool {
        self.data.values().any(|e| e.code == NOT_UNIQUE_CODE)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "backend error {}: {}", self.status, self.message)?;
        if !self.data.is_empty() {
            let mut fields: Vec<&str> = self.data.keys().map(String::as_str).collect();
            fields.sort_unstable();
            write!(f, " (fields: {})", fields.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_field_errors() {
        let body = r#"{"code":400,"message":"Failed to create record.","data":{"email":{"code":"validation_not_unique","message":"Value must be unique."}}}"#;
        let err = ApiError::from_body(400, body);
        assert_eq!(err.message, "Failed to create record.");
        assert_eq!(err.field_message("email"), Some("Value must be unique."));
        assert!(err.is_not_unique());
        assert!(!err.is_not_found());
    }

    #[test]
    fn keeps_raw_body_when_not_json() {
        let err = ApiError::from_body(502, "Bad Gateway");
        assert_eq!(err.message, "Bad Gateway");
        assert!(err.data.is_empty());
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn ignores_malformed_field_entries() {
        let body = r#"{"message":"nope","data":{"password":"oops","username":{"code":"x","message":"taken"}}}"#;
        let err = ApiError::from_body(400, body);
        assert!(!err.has_field("password"));
        assert_eq!(err.field_message("username"), Some("taken"));
    }
}
