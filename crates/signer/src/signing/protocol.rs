use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response body shared by every oracle endpoint.
///
/// `success` is always present; exactly one of the other fields is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Envelope {
    pub fn certificate(pem: impl Into<String>) -> Self {
        Self {
            success: true,
            certificate: Some(pem.into()),
            signature: None,
            message: None,
        }
    }

    pub fn signature(base64: impl Into<String>) -> Self {
        Self {
            success: true,
            certificate: None,
            signature: Some(base64.into()),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            certificate: None,
            signature: None,
            message: Some(message.into()),
        }
    }
}

/// Why a sign request body was refused. Messages never quote the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("The request body must be a JSON object.")]
    NotAnObject,
    #[error("The data field is required.")]
    Missing,
    #[error("The data field must be a string.")]
    NotAString,
}

/// A validated `POST sign` body: a present, non-empty `data` string.
#[derive(Debug)]
pub struct SignRequest {
    data: String,
}

impl SignRequest {
    pub fn from_json(body: Value) -> Result<Self, ValidationError> {
        let Value::Object(mut fields) = body else {
            return Err(ValidationError::NotAnObject);
        };

        match fields.remove("data") {
            None | Some(Value::Null) => Err(ValidationError::Missing),
            Some(Value::String(data)) if data.is_empty() => Err(ValidationError::Missing),
            Some(Value::String(data)) => Ok(Self { data }),
            Some(_) => Err(ValidationError::NotAString),
        }
    }

    pub fn data(&self) -> &str {
        &self.data
    }
}
