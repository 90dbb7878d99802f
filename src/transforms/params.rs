use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::{Result, TransformError};

/// Deserializes a parameter object; `null` counts as `{}`.
pub(crate) fn parse_params<T: DeserializeOwned>(params: &Value) -> Result<T> {
    let object = match params {
        Value::Null => Value::Object(Map::new()),
        Value::Object(_) => params.clone(),
        other => {
            return Err(TransformError::InvalidParams(format!(
                "parameters must be a JSON object, found {other}"
            )));
        }
    };
    serde_json::from_value(object).map_err(|error| TransformError::InvalidParams(error.to_string()))
}

pub(crate) fn require_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TransformError::InvalidParams(format!(
            "`{name}` must be a positive number, got {value}"
        )));
    }
    Ok(())
}

pub(crate) fn require_at_least(name: &str, value: usize, minimum: usize) -> Result<()> {
    if value < minimum {
        return Err(TransformError::InvalidParams(format!(
            "`{name}` must be at least {minimum}, got {value}"
        )));
    }
    Ok(())
}

pub(crate) fn require_at_most(name: &str, value: usize, maximum: usize) -> Result<()> {
    if value > maximum {
        return Err(TransformError::InvalidParams(format!(
            "`{name}` must be at most {maximum}, got {value}"
        )));
    }
    Ok(())
}
