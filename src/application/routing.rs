//! URL generation seam used to build include targets.

use std::collections::BTreeMap;

use thiserror::Error;

/// Route name of the deferred render endpoint.
pub const SSI_RENDER_ROUTE: &str = "edgeblock_ssi_render";

/// Route parameter carrying the signed token.
pub const TOKEN_PARAM: &str = "_token";

pub type RouteParams = BTreeMap<String, String>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route `{0}` is not registered")]
    UnknownRoute(String),
    #[error("route `{route}` requires parameter `{param}`")]
    MissingParameter { route: String, param: String },
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

pub trait UrlGenerator: Send + Sync {
    /// Build the path (plus query string) of a named route.
    fn generate(&self, route: &str, params: &RouteParams) -> Result<String, RouteError>;
}
