mod middleware;
mod ssi;

pub use middleware::RequestContext;
pub use ssi::{SsiHttpState, build_router};
