use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    cache::{RenderError, SsiError},
    config::LoadError,
    domain::error::DomainError,
    infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<RenderError> for HttpError {
    fn from(error: RenderError) -> Self {
        const SOURCE: &str = "application::error::render_error_to_http_error";

        match &error {
            RenderError::Forbidden => {
                HttpError::from_error(SOURCE, StatusCode::FORBIDDEN, "Forbidden", &error)
            }
            RenderError::NotFound(_) => {
                HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "Block not found", &error)
            }
            RenderError::InvalidKeys(_) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Invalid fragment request",
                &error,
            ),
            RenderError::Loader(_) | RenderError::Context(_) | RenderError::Render(_) => {
                HttpError::from_error(
                    SOURCE,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    &error,
                )
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Ssi(#[from] SsiError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::blocks::{BlockRenderError, BlockStoreError, ContextError};
    use crate::cache::CacheKeyError;

    #[test]
    fn render_errors_map_to_expected_statuses() {
        let cases = [
            (RenderError::Forbidden, StatusCode::FORBIDDEN),
            (
                RenderError::NotFound("/not/found".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                RenderError::InvalidKeys(CacheKeyError::Missing("updated_at")),
                StatusCode::BAD_REQUEST,
            ),
            (
                RenderError::Loader(BlockStoreError::unavailable("connection reset")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                RenderError::Context(ContextError::InvalidSetting {
                    name: "css_class".to_string(),
                    reason: "contains control characters".to_string(),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                RenderError::Render(BlockRenderError::Template {
                    block_id: "/cms/footer".to_string(),
                    message: "template failed".to_string(),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(HttpError::from(error).status(), expected);
        }
    }

    #[test]
    fn http_error_attaches_report() {
        let response = HttpError::from(RenderError::Forbidden).into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.status, StatusCode::FORBIDDEN);
        assert_eq!(report.messages, vec!["fragment token does not match"]);
    }

    #[test]
    fn include_errors_surface_at_the_binary() {
        let error = AppError::from(SsiError::from(CacheKeyError::Empty));

        assert!(matches!(error, AppError::Ssi(SsiError::InvalidKeys(_))));
    }

    #[test]
    fn error_report_collects_source_chain() {
        let error = AppError::from(InfraError::from(std::io::Error::other("disk gone")));
        let report = ErrorReport::from_error("test", StatusCode::INTERNAL_SERVER_ERROR, &error);

        assert_eq!(report.messages.first().map(String::as_str), Some("io error: disk gone"));
    }
}
