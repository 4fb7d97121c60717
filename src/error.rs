use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Application-wide error type. Every handler failure ends up here and is
/// rendered as `{ "success": false, "error": <message> }`.
#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("{0}")]
    Internal(String),
}

const DUPLICATE_KEY: i32 = 11000;

impl AppError {
    pub fn not_authorized() -> Self {
        AppError::Unauthorized("Not authorized to access this route".into())
    }

    pub fn duplicate() -> Self {
        AppError::Conflict("Duplicate field value entered".into())
    }

    /// Message safe to hand back to the client.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) => "Database error".to_string(),
            AppError::Upstream(_) => "Upstream service error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
        }
        HttpResponse::build(status).json(json!({
            "success": false,
            "error": self.public_message(),
        }))
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure};

        let code = match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_error)) => Some(write_error.code),
            ErrorKind::Command(command_error) => Some(command_error.code),
            _ => None,
        };
        if code == Some(DUPLICATE_KEY) {
            return AppError::duplicate();
        }
        AppError::Database(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for AppError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AppError::Internal(format!("Failed to encode record: {err}"))
    }
}

impl From<mongodb::bson::de::Error> for AppError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        AppError::Internal(format!("Failed to decode record: {err}"))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("Password hashing failed: {err}"))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Unauthorized("Please log in again".into())
            }
            _ => AppError::not_authorized(),
        }
    }
}

/// Joins every field message into a single sentence, ordered by field name.
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let message = fields
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| match &error.message {
                    Some(message) => message.to_string(),
                    None => format!("Invalid value for {field}"),
                })
            })
            .collect::<Vec<_>>()
            .join(", ");

        AppError::Validation(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "Name is required."))]
        name: String,
        #[validate(email(message = "Please enter a valid email."))]
        email: String,
    }

    #[test]
    fn validation_errors_are_joined_in_field_order() {
        let payload = Payload {
            name: String::new(),
            email: "nope".into(),
        };
        let err = AppError::from(payload.validate().unwrap_err());
        match err {
            AppError::Validation(message) => {
                assert_eq!(message, "Please enter a valid email., Name is required.")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn database_details_stay_out_of_the_response() {
        let err = AppError::Database("connection reset by 10.0.0.3".into());
        assert_eq!(err.public_message(), "Database error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(AppError::duplicate().status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::not_authorized().status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
    }
}
