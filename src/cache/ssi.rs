//! SSI-backed fragment cache.
//!
//! Lookups never return rendered block markup. They return an include
//! directive pointing at the signed render endpoint, and the edge resolves it
//! by calling back into [`SsiFragmentCache::cache_action`].

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::application::blocks::{
    BlockContextManager, BlockLoader, BlockRenderError, BlockRenderer, BlockStoreError,
    ContextError, RenderedFragment,
};
use crate::application::routing::{
    RouteError, RouteParams, SSI_RENDER_ROUTE, TOKEN_PARAM, UrlGenerator,
};
use crate::domain::blocks::{Block, BlockId, BlockSettings};

use super::adapter::FragmentCache;
use super::element::{CacheElement, CachedContent};
use super::keys::{BLOCK_ID_KEY, CacheKeyError, CacheKeySet, UPDATED_AT_KEY};
use super::token::TokenSigner;

#[derive(Debug, Error)]
pub enum SsiError {
    #[error(transparent)]
    InvalidKeys(#[from] CacheKeyError),
    #[error(transparent)]
    Route(#[from] RouteError),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("fragment token does not match")]
    Forbidden,
    #[error("block `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    InvalidKeys(#[from] CacheKeyError),
    #[error(transparent)]
    Loader(#[from] BlockStoreError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Render(#[from] BlockRenderError),
}

/// Parameters the edge sends back when resolving an include.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub token: String,
    pub block_id: String,
    pub updated_at: String,
    pub settings: BlockSettings,
}

impl RenderRequest {
    pub fn new(
        token: impl Into<String>,
        block_id: impl Into<String>,
        updated_at: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            block_id: block_id.into(),
            updated_at: updated_at.into(),
            settings: BlockSettings::new(),
        }
    }

    pub fn with_settings(mut self, settings: BlockSettings) -> Self {
        self.settings = settings;
        self
    }

    fn keys(&self) -> CacheKeySet {
        CacheKeySet::for_block(self.block_id.as_str(), self.updated_at.as_str())
    }
}

/// Wrap a URL in an SSI include directive.
pub fn include_directive(url: &str) -> String {
    format!("<!--# include virtual=\"{url}\" -->")
}

#[derive(Clone)]
pub struct SsiFragmentCache {
    signer: TokenSigner,
    router: Arc<dyn UrlGenerator>,
    renderer: Arc<dyn BlockRenderer>,
    loader: Arc<dyn BlockLoader>,
    context_manager: Arc<dyn BlockContextManager>,
}

impl SsiFragmentCache {
    pub fn new(
        signer: TokenSigner,
        router: Arc<dyn UrlGenerator>,
        renderer: Arc<dyn BlockRenderer>,
        loader: Arc<dyn BlockLoader>,
        context_manager: Arc<dyn BlockContextManager>,
    ) -> Self {
        Self {
            signer,
            router,
            renderer,
            loader,
            context_manager,
        }
    }

    pub(crate) fn compute_hash(&self, keys: &CacheKeySet) -> Result<String, CacheKeyError> {
        self.signer.sign(keys)
    }

    fn include_element(&self, keys: &CacheKeySet) -> Result<CacheElement, SsiError> {
        let token = self.compute_hash(keys)?;

        let mut params = RouteParams::new();
        params.insert(TOKEN_PARAM.to_string(), token);
        for key in [BLOCK_ID_KEY, UPDATED_AT_KEY] {
            if let Some(value) = keys.get(key) {
                params.insert(key.to_string(), value.to_string());
            }
        }

        let url = self.router.generate(SSI_RENDER_ROUTE, &params)?;
        counter!("edgeblock_include_generated_total").increment(1);
        debug!(
            target = "edgeblock::ssi",
            block_id = keys.block_id().unwrap_or_default(),
            url = %url,
            "generated include directive"
        );

        Ok(CacheElement::new(
            keys.clone(),
            CachedContent::new(include_directive(&url)),
        ))
    }

    /// Check the request token, then resolve the block it names.
    ///
    /// A mismatching token is reported before the block store is consulted.
    #[instrument(skip_all, fields(block_id = %request.block_id))]
    pub async fn authorize(&self, request: &RenderRequest) -> Result<Block, RenderError> {
        if !self.signer.verify(&request.keys(), &request.token)? {
            counter!("edgeblock_render_denied_total").increment(1);
            warn!(target = "edgeblock::ssi", "rejected fragment token");
            return Err(RenderError::Forbidden);
        }

        let not_found = || {
            counter!("edgeblock_render_not_found_total").increment(1);
            RenderError::NotFound(request.block_id.clone())
        };

        let id = BlockId::new(request.block_id.as_str()).map_err(|_| not_found())?;
        self.loader.load(&id).await?.ok_or_else(not_found)
    }

    /// Render endpoint body: authorize, build the block context, render.
    pub async fn cache_action(
        &self,
        request: &RenderRequest,
    ) -> Result<RenderedFragment, RenderError> {
        let block = self.authorize(request).await?;
        let context = self.context_manager.context(block, &request.settings)?;
        let fragment = self.renderer.render(&context)?;
        counter!("edgeblock_render_total").increment(1);
        Ok(fragment)
    }
}

impl FragmentCache for SsiFragmentCache {
    type Error = SsiError;

    fn get(&self, keys: &CacheKeySet) -> Result<CacheElement, SsiError> {
        self.include_element(keys)
    }

    fn set(
        &self,
        keys: &CacheKeySet,
        data: CachedContent,
        ttl: Duration,
        contextual_keys: &CacheKeySet,
    ) -> Result<CacheElement, SsiError> {
        debug!(
            target = "edgeblock::ssi",
            bytes = data.content().len(),
            "discarding fragment data, storage belongs to the edge"
        );
        Ok(self
            .include_element(keys)?
            .with_ttl(ttl)
            .with_contextual_keys(contextual_keys.clone()))
    }

    fn has(&self, _keys: &CacheKeySet) -> bool {
        true
    }

    fn flush(&self, _keys: &CacheKeySet) -> bool {
        true
    }

    fn flush_all(&self) -> bool {
        true
    }

    fn is_contextual(&self, _keys: &CacheKeySet, _contextual_keys: &CacheKeySet) -> bool {
        false
    }
}
