use tracing::debug;

use crate::domain::blocks::{Block, BlockSettings};

use super::blocks::{BlockContext, BlockContextManager, ContextError};

const MAX_SETTING_VALUE_LEN: usize = 512;

/// Merges request overrides into the block's declared settings.
///
/// Only settings the block declares can be overridden; anything else in the
/// request is dropped.
#[derive(Debug, Clone, Default)]
pub struct DefaultContextManager;

impl DefaultContextManager {
    pub fn new() -> Self {
        Self
    }
}

impl BlockContextManager for DefaultContextManager {
    fn context(
        &self,
        block: Block,
        overrides: &BlockSettings,
    ) -> Result<BlockContext, ContextError> {
        let mut settings = block.settings.clone();

        for (name, value) in overrides {
            let Some(slot) = settings.get_mut(name) else {
                debug!(
                    target = "edgeblock::context",
                    block_id = %block.id,
                    setting = %name,
                    "ignoring undeclared block setting"
                );
                continue;
            };

            validate_setting(name, value)?;
            *slot = value.clone();
        }

        Ok(BlockContext { block, settings })
    }
}

fn validate_setting(name: &str, value: &str) -> Result<(), ContextError> {
    if value.len() > MAX_SETTING_VALUE_LEN {
        return Err(ContextError::InvalidSetting {
            name: name.to_string(),
            reason: format!("value exceeds {MAX_SETTING_VALUE_LEN} bytes"),
        });
    }
    if value.chars().any(char::is_control) {
        return Err(ContextError::InvalidSetting {
            name: name.to_string(),
            reason: "value contains control characters".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::blocks::{BlockId, BlockKind};

    fn sidebar() -> Block {
        Block::new(
            BlockId::new("/cms/sidebar").expect("valid id"),
            BlockKind::Text,
            "hello",
        )
        .with_setting("css_class", "sidebar")
    }

    #[test]
    fn overrides_replace_declared_settings() {
        let overrides = BlockSettings::from([("css_class".to_string(), "wide".to_string())]);

        let context = DefaultContextManager::new()
            .context(sidebar(), &overrides)
            .expect("context");

        assert_eq!(context.setting("css_class"), Some("wide"));
    }

    #[test]
    fn undeclared_settings_are_dropped() {
        let overrides = BlockSettings::from([("template".to_string(), "evil".to_string())]);

        let context = DefaultContextManager::new()
            .context(sidebar(), &overrides)
            .expect("context");

        assert_eq!(context.setting("template"), None);
        assert_eq!(context.setting("css_class"), Some("sidebar"));
    }

    #[test]
    fn control_characters_are_rejected() {
        let overrides = BlockSettings::from([("css_class".to_string(), "a\u{0}b".to_string())]);

        let err = DefaultContextManager::new()
            .context(sidebar(), &overrides)
            .expect_err("invalid value");

        assert!(matches!(err, ContextError::InvalidSetting { name, .. } if name == "css_class"));
    }

    #[test]
    fn oversized_values_are_rejected() {
        let overrides = BlockSettings::from([(
            "css_class".to_string(),
            "x".repeat(MAX_SETTING_VALUE_LEN + 1),
        )]);

        assert!(
            DefaultContextManager::new()
                .context(sidebar(), &overrides)
                .is_err()
        );
    }
}
