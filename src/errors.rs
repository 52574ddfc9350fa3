use actix_web::HttpResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Unsupported file type '{0}'. Only JPEG, PNG and GIF images are allowed")]
    UnsupportedMediaType(String),

    #[error("File of {0} bytes exceeds the 30 MiB upload limit")]
    PayloadTooLarge(u64),

    #[error("{0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<diesel::result::Error> for AppError {
    fn from(e: diesel::result::Error) -> Self {
        AppError::Persistence(e.to_string())
    }
}

impl From<r2d2::Error> for AppError {
    fn from(e: r2d2::Error) -> Self {
        AppError::Persistence(e.to_string())
    }
}

/// Validation failures are client errors; everything else, including upload
/// rejections, maps to 500. The body always carries the error text, so
/// persistence messages reach the client verbatim.
impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string()
        });
        match self {
            AppError::Validation(_) => HttpResponse::BadRequest().json(body),
            _ => HttpResponse::InternalServerError().json(body),
        }
    }
}
