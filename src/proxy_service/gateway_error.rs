use std::time::Duration;

use actix_web::error::PayloadError;
use actix_web::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::proxy_service::header_policy::ALLOW_ORIGIN;

/// Label shared by every envelope. The `message` field tells failures apart.
pub const ERROR_LABEL: &str = "API proxy error";

/// Failures raised inside the gateway. Upstream error statuses are not among them:
/// those are relayed to the caller as ordinary responses.
#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("invalid upstream url '{url}': {reason}")]
  InvalidUrl { url: String, reason: String },
  #[error("failed to read request body: {0}")]
  Payload(#[from] PayloadError),
  #[error("upstream did not respond within {0:?}")]
  Timeout(Duration),
  #[error("upstream request failed: {0}")]
  Transport(#[source] reqwest::Error),
  #[error("failed to read upstream response body: {0}")]
  ResponseBody(#[source] reqwest::Error),
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct ErrorEnvelope {
  pub error: String,
  pub message: String,
  pub timestamp: String,
}

impl ErrorEnvelope {
  pub fn new(message: impl Into<String>) -> ErrorEnvelope {
    ErrorEnvelope {
      error: ERROR_LABEL.to_string(),
      message: message.into(),
      timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
  }
}

impl ResponseError for GatewayError {
  fn status_code(&self) -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
  }

  fn error_response(&self) -> HttpResponse {
    HttpResponse::build(self.status_code())
      .insert_header((ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ORIGIN))
      .json(ErrorEnvelope::new(self.to_string()))
  }
}
