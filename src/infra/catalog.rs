//! File-backed block store.
//!
//! Blocks are read once from a TOML document of the form
//!
//! ```toml
//! [[blocks]]
//! id = "/cms/content/home/additionalInfoBlock"
//! kind = "html"
//! title = "Additional info"
//! body = "<p>Opening hours</p>"
//! updated_at = "2024-05-01T10:00:00Z"
//! settings = { css_class = "info" }
//! ```

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::application::blocks::{BlockLoader, BlockStoreError};
use crate::domain::blocks::{Block, BlockId};
use crate::domain::error::DomainError;

use super::error::InfraError;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CatalogFile {
    blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default)]
pub struct BlockCatalog {
    blocks: HashMap<BlockId, Block>,
}

impl BlockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, block: Block) -> Result<(), DomainError> {
        if self.blocks.contains_key(&block.id) {
            return Err(DomainError::invariant(format!(
                "block `{}` is defined more than once",
                block.id
            )));
        }
        self.blocks.insert(block.id.clone(), block);
        Ok(())
    }

    pub fn from_blocks(blocks: impl IntoIterator<Item = Block>) -> Result<Self, DomainError> {
        let mut catalog = Self::new();
        for block in blocks {
            catalog.insert(block)?;
        }
        Ok(catalog)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, InfraError> {
        let file: CatalogFile = toml::from_str(raw)
            .map_err(|err| InfraError::catalog(format!("failed to parse catalog: {err}")))?;
        Self::from_blocks(file.blocks).map_err(|err| InfraError::catalog(err.to_string()))
    }

    pub async fn from_path(path: &Path) -> Result<Self, InfraError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let catalog = Self::from_toml_str(&raw)?;
        info!(
            target = "edgeblock::catalog",
            path = %path.display(),
            blocks = catalog.len(),
            "Loaded block catalog"
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[async_trait]
impl BlockLoader for BlockCatalog {
    async fn load(&self, id: &BlockId) -> Result<Option<Block>, BlockStoreError> {
        Ok(self.blocks.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::domain::blocks::BlockKind;

    const CATALOG: &str = r#"
        [[blocks]]
        id = "/cms/content/home/additionalInfoBlock"
        kind = "html"
        title = "Additional info"
        body = "<p>Opening hours</p>"
        updated_at = "2024-05-01T10:00:00Z"
        settings = { css_class = "info" }

        [[blocks]]
        id = "/cms/footer"
        updated_at = "2024-05-02"
        body = "Footer"
    "#;

    #[test]
    fn parses_blocks_with_defaults() {
        let catalog = BlockCatalog::from_toml_str(CATALOG).expect("catalog");
        assert_eq!(catalog.len(), 2);

        let footer = catalog
            .blocks
            .get(&BlockId::new("/cms/footer").expect("id"))
            .expect("footer");
        assert_eq!(footer.kind, BlockKind::Text);
        assert!(footer.settings.is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let raw = r#"
            [[blocks]]
            id = "/cms/a"
            updated_at = "1"

            [[blocks]]
            id = "/cms/a"
            updated_at = "2"
        "#;

        let err = BlockCatalog::from_toml_str(raw).expect_err("duplicate");
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn blank_ids_are_rejected() {
        let raw = r#"
            [[blocks]]
            id = " "
            updated_at = "1"
        "#;

        assert!(BlockCatalog::from_toml_str(raw).is_err());
    }

    #[tokio::test]
    async fn loader_resolves_known_blocks_only() {
        let catalog = BlockCatalog::from_toml_str(CATALOG).expect("catalog");

        let known = BlockId::new("/cms/content/home/additionalInfoBlock").expect("id");
        let unknown = BlockId::new("/not/found").expect("id");

        assert!(catalog.exists(&known).await.expect("lookup"));
        assert!(!catalog.exists(&unknown).await.expect("lookup"));
        let block = catalog
            .load(&known)
            .await
            .expect("lookup")
            .expect("block");
        assert_eq!(block.title.as_deref(), Some("Additional info"));
    }

    #[tokio::test]
    async fn load_reads_catalog_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(CATALOG.as_bytes()).expect("write catalog");

        let catalog = BlockCatalog::from_path(file.path()).await.expect("catalog");
        assert_eq!(catalog.len(), 2);
    }

    #[tokio::test]
    async fn load_reports_missing_file() {
        let err = BlockCatalog::from_path(Path::new("/definitely/not/here.toml"))
            .await
            .expect_err("missing");
        assert!(matches!(err, InfraError::Io(_)));
    }
}
