use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Reasons a loan application record cannot be turned into a feature vector.
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidInputError {
    /// A field used as a denominator is zero.
    ZeroDenominator { field: &'static str },
    /// A required field is absent (e.g. legacy records without gender).
    MissingField { field: &'static str },
    /// A numeric field is outside its accepted range or not finite.
    OutOfRange { field: &'static str, value: f64 },
    /// A categorical field carries a value with no known encoding.
    UnrecognizedCategory { field: &'static str, value: String },
    /// A free-form field does not match its expected format.
    Malformed { field: &'static str, reason: String },
}

impl fmt::Display for InvalidInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidInputError::ZeroDenominator { field } => {
                write!(f, "{} must be nonzero (division by zero)", field)
            }
            InvalidInputError::MissingField { field } => write!(f, "{} is required", field),
            InvalidInputError::OutOfRange { field, value } => {
                write!(f, "{} is out of range: {}", field, value)
            }
            InvalidInputError::UnrecognizedCategory { field, value } => {
                write!(f, "{} has unrecognized value '{}'", field, value)
            }
            InvalidInputError::Malformed { field, reason } => {
                write!(f, "{} is malformed: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for InvalidInputError {}

/// Failures raised while loading or invoking the classifier.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// The feature vector does not have the arity the model was trained on.
    ShapeMismatch { expected: usize, actual: usize },
    /// The model produced something that is not a probability.
    InvalidProbability(f64),
    /// The model artifact could not be read, parsed or verified.
    Artifact(String),
    /// The model structure is inconsistent at evaluation time.
    Evaluation(String),
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierError::ShapeMismatch { expected, actual } => write!(
                f,
                "feature vector has {} elements, model expects {}",
                actual, expected
            ),
            ClassifierError::InvalidProbability(p) => {
                write!(f, "classifier returned invalid probability {}", p)
            }
            ClassifierError::Artifact(msg) => write!(f, "model artifact error: {}", msg),
            ClassifierError::Evaluation(msg) => write!(f, "model evaluation error: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// Database-related errors.
    DatabaseError(sqlx::Error),
    /// Resource not found error.
    NotFound(String),
    /// The submitted record failed validation.
    InvalidInput(InvalidInputError),
    /// The classifier could not produce a score.
    Classifier(ClassifierError),
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Returns the innermost error, skipping any context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(e) => write!(f, "Database error: {}", e),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InvalidInput(e) => write!(f, "Invalid input: {}", e),
            AppError::Classifier(e) => write!(f, "Classifier error: {}", e),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Maps each error variant to an appropriate HTTP status code and JSON body.
    /// Logs errors appropriately based on their severity.
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(e) => {
                tracing::warn!("Rejected input: {}", e);
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            AppError::Classifier(e) => {
                tracing::error!("Classifier error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Model inference failed".to_string(),
                )
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                // Log full context chain, respond as the underlying error
                tracing::error!("Error with context: {} -> {}", context, source);
                return (*source).into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    /// Converts a `sqlx::Error` into an `AppError`.
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }
}

impl From<InvalidInputError> for AppError {
    fn from(err: InvalidInputError) -> Self {
        AppError::InvalidInput(err)
    }
}

impl From<ClassifierError> for AppError {
    fn from(err: ClassifierError) -> Self {
        AppError::Classifier(err)
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    ///
    /// # Arguments
    ///
    /// * `f` - A closure that produces the context message.
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Extension for sqlx::Error to add context
impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::DatabaseError(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::DatabaseError(e)),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_maps_to_bad_request() {
        let err = AppError::from(InvalidInputError::ZeroDenominator {
            field: "annual_income",
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_keeps_status_through_context() {
        let err: Result<(), AppError> = Err(AppError::NotFound("Customer C0456".to_string()));
        let wrapped = err.context("customer lookup").unwrap_err();

        assert!(matches!(wrapped.root(), AppError::NotFound(_)));
        assert_eq!(wrapped.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_classifier_error_hides_details() {
        let err = AppError::from(ClassifierError::InvalidProbability(f64::NAN));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display_messages() {
        let err = InvalidInputError::UnrecognizedCategory {
            field: "gender",
            value: "Other".to_string(),
        };
        assert_eq!(err.to_string(), "gender has unrecognized value 'Other'");

        let err = ClassifierError::ShapeMismatch {
            expected: 13,
            actual: 9,
        };
        assert_eq!(
            err.to_string(),
            "feature vector has 9 elements, model expects 13"
        );
    }
}
