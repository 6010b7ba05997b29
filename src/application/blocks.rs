//! Collaborator traits used by the fragment cache to resolve and render blocks.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::blocks::{Block, BlockId, BlockSettings};

#[derive(Debug, Error)]
pub enum BlockStoreError {
    #[error("block store unavailable: {0}")]
    Unavailable(String),
}

impl BlockStoreError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Resolves block identifiers to stored blocks.
#[async_trait]
pub trait BlockLoader: Send + Sync {
    async fn load(&self, id: &BlockId) -> Result<Option<Block>, BlockStoreError>;

    async fn exists(&self, id: &BlockId) -> Result<bool, BlockStoreError> {
        Ok(self.load(id).await?.is_some())
    }
}

/// A block paired with the settings it should be rendered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockContext {
    pub block: Block,
    pub settings: BlockSettings,
}

impl BlockContext {
    pub fn setting(&self, name: &str) -> Option<&str> {
        self.settings.get(name).map(String::as_str)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("invalid value for setting `{name}`: {reason}")]
    InvalidSetting { name: String, reason: String },
}

/// Builds the rendering context of a block from request-supplied overrides.
pub trait BlockContextManager: Send + Sync {
    fn context(&self, block: Block, overrides: &BlockSettings)
    -> Result<BlockContext, ContextError>;
}

/// Rendered markup for a single block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFragment {
    pub block_id: BlockId,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum BlockRenderError {
    #[error("failed to render block `{block_id}`: {message}")]
    Template { block_id: String, message: String },
}

pub trait BlockRenderer: Send + Sync {
    fn render(&self, context: &BlockContext) -> Result<RenderedFragment, BlockRenderError>;
}
