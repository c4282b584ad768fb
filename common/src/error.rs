use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// 配置未通过 schema 校验，启动必须中止
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("config source error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("schema '{name}' error: {reason}")]
    Schema { name: String, reason: String },

    #[error("invalid route: {0}")]
    InvalidRoute(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Internal(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Internal(err.to_string())
    }
}

// 从Error转换为axum::http::StatusCode，用于HTTP响应
impl From<&Error> for StatusCode {
    fn from(error: &Error) -> Self {
        match error {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::BadRequest(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        let message = match &self {
            Error::NotFound(_) | Error::BadRequest(_) | Error::Json(_) => self.to_string(),
            _ => "internal server error".to_string(),
        };

        let json = Json(json!({
            "error": status.as_u16(),
            "message": message,
        }));

        (status, json).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
