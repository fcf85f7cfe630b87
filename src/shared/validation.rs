//! Validation Utilities

use validator::{Validate, ValidationErrors};

use super::error::AppError;

/// Convert validation errors to AppError, reporting the first failing field
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let message = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let detail = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{}: {}", field, detail)
            })
        })
        .next()
        .unwrap_or_else(|| "Validation failed".into());

    AppError::Validation(message)
}

/// Validate a request body, mapping failures into `AppError::Validation`
pub fn validate_request<T: Validate>(body: &T) -> Result<(), AppError> {
    body.validate().map_err(validation_error)
}
