use actix_web::{
    HttpResponse,
    http::{StatusCode, header},
};
use thiserror::Error;

use crate::http::no_store;

pub type Res<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    // === CONVERSION ERRORS ===
    #[error("Stripe error: {0}")]
    Stripe(#[from] stripe::StripeError),

    // === APPLICATION ERRORS ===
    #[error("Invalid request body")]
    InvalidRequestBody,

    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Payment processor error: {0}")]
    Processor(String),

    #[error("Request timeout")]
    Timeout,
}

/// Body returned for processor failures outside of debug builds.
const PROCESSOR_FAILURE: &str = "Error creating payment intent";

impl AppError {
    pub fn to_http_response(&self) -> HttpResponse {
        let is_dev = cfg!(debug_assertions);

        let to_internal_json = |err_msg: &str| {
            if is_dev {
                serde_json::json!({ "error": err_msg })
            } else {
                serde_json::json!({ "error": PROCESSOR_FAILURE })
            }
        };

        match self {
            // === CONVERSION ERRORS ===
            AppError::Stripe(error) => {
                log::error!("Stripe error: {}", error);
                no_store(&mut HttpResponse::InternalServerError())
                    .json(to_internal_json(&error.to_string()))
            }

            // === APPLICATION ERRORS ===
            AppError::InvalidRequestBody | AppError::InvalidAmount => {
                no_store(&mut HttpResponse::BadRequest())
                    .json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::PayloadTooLarge => no_store(&mut HttpResponse::PayloadTooLarge())
                .json(serde_json::json!({ "error": self.to_string() })),
            AppError::MethodNotAllowed => no_store(&mut HttpResponse::MethodNotAllowed())
                .insert_header((header::ALLOW, "POST, OPTIONS"))
                .json(serde_json::json!({ "error": self.to_string() })),
            AppError::Processor(error) => {
                log::error!("Payment processor error: {}", error);
                no_store(&mut HttpResponse::InternalServerError()).json(to_internal_json(error))
            }
            AppError::Timeout => {
                log::warn!("Payment processor call timed out, outcome unknown");
                no_store(&mut HttpResponse::GatewayTimeout())
                    .json(serde_json::json!({ "error": self.to_string() }))
            }
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequestBody | AppError::InvalidAmount => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::Stripe(_) | AppError::Processor(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.to_http_response()
    }
}
