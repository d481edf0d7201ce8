pub mod forgot_password;
pub mod health;
pub mod login;
pub mod oauth;
pub mod photos;
pub mod profile;
pub mod register;
pub mod reset_password;
pub mod users;
pub mod verify_email;

use serde_json::{Map, Value};
use validator::ValidationErrors;

use joss_shared::errors::{AppError, ErrorCode};

/// 400 with one list of messages per offending field.
pub(crate) fn invalid_request(errors: ValidationErrors) -> AppError {
    let details: Map<String, Value> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages: Vec<Value> = errs
                .iter()
                .map(|e| Value::from(e.message.as_deref().unwrap_or(&*e.code).to_string()))
                .collect();
            (field.to_string(), Value::Array(messages))
        })
        .collect();
    AppError::with_details(ErrorCode::ValidationError, "invalid request", Value::Object(details))
}
