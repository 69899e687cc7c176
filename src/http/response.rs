//! Success envelope.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Wraps a payload as `{"status": "success", ...payload}`.
///
/// Non-object payloads land under `data`.
#[derive(Debug)]
pub struct Success<T>(pub T);

impl<T: Serialize> Success<T> {
    fn into_value(self) -> Result<Value, serde_json::Error> {
        let mut body = match serde_json::to_value(self.0)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        body.insert("status".to_string(), Value::String("success".to_string()));
        Ok(Value::Object(body))
    }
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        match self.into_value() {
            Ok(body) => Json(body).into_response(),
            Err(e) => ApiError::Internal(format!("Failed to encode response: {e}")).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merges_status_into_objects() {
        let body = Success(json!({"title": "Neon Koi"})).into_value().unwrap();
        assert_eq!(body, json!({"status": "success", "title": "Neon Koi"}));
    }

    #[test]
    fn wraps_other_values() {
        assert_eq!(
            Success(vec![1, 2]).into_value().unwrap(),
            json!({"status": "success", "data": [1, 2]})
        );
        assert_eq!(Success(()).into_value().unwrap(), json!({"status": "success"}));
    }
}
