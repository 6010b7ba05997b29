//! Edgeblock fragment cache
//!
//! Block lookups are answered with SSI include directives instead of markup:
//!
//! - **Keys**: every lookup carries `block_id` and `updated_at`
//! - **Token**: the keys are signed with HMAC-SHA256 under the configured secret
//! - **Include**: the token and keys are embedded in the render route URL
//! - **Render**: the edge calls the route back, the token is re-checked, and
//!   the block is loaded and rendered
//!
//! ## Configuration
//!
//! ```toml
//! [ssi]
//! secret = "change-me"
//! route_prefix = "/_fragments/ssi"
//! ```

mod adapter;
mod element;
mod keys;
mod ssi;
mod token;

pub use adapter::FragmentCache;
pub use element::{CacheElement, CachedContent};
pub use keys::{BLOCK_ID_KEY, CacheKeyError, CacheKeySet, UPDATED_AT_KEY};
pub use ssi::{RenderError, RenderRequest, SsiError, SsiFragmentCache, include_directive};
pub use token::{SignerError, TokenSigner};
