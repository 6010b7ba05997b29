//! HTML rendering of content blocks.

use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use askama::Template;

use crate::application::blocks::{
    BlockContext, BlockRenderError, BlockRenderer, RenderedFragment,
};
use crate::domain::blocks::BlockKind;

const CSS_CLASS_SETTING: &str = "css_class";

#[derive(Template)]
#[template(
    source = r#"<div class="{{ classes }}" data-block-id="{{ block_id }}">{% if let Some(title) = title %}<h2 class="cmf-block-title">{{ title }}</h2>{% endif %}{{ body|safe }}</div>"#,
    ext = "html"
)]
struct BlockFragmentTemplate<'a> {
    classes: String,
    block_id: &'a str,
    title: Option<&'a str>,
    body: String,
}

/// Renders blocks into a wrapping `div`; HTML bodies are sanitized, text is escaped.
pub struct HtmlBlockRenderer {
    sanitizer: AmmoniaBuilder<'static>,
}

impl HtmlBlockRenderer {
    pub fn new() -> Self {
        Self {
            sanitizer: build_block_sanitizer(),
        }
    }

    fn body(&self, context: &BlockContext) -> String {
        match context.block.kind {
            BlockKind::Html => self.sanitizer.clean(&context.block.body).to_string(),
            BlockKind::Text => ammonia::clean_text(&context.block.body),
        }
    }
}

impl Default for HtmlBlockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockRenderer for HtmlBlockRenderer {
    fn render(&self, context: &BlockContext) -> Result<RenderedFragment, BlockRenderError> {
        let block = &context.block;

        let mut classes = format!("cmf-block cmf-block-{}", block.kind);
        if let Some(extra) = context
            .setting(CSS_CLASS_SETTING)
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            classes.push(' ');
            classes.push_str(extra);
        }

        let template = BlockFragmentTemplate {
            classes,
            block_id: block.id.as_str(),
            title: block.title.as_deref(),
            body: self.body(context),
        };

        let html = template
            .render()
            .map_err(|err| BlockRenderError::Template {
                block_id: block.id.to_string(),
                message: err.to_string(),
            })?;

        Ok(RenderedFragment {
            block_id: block.id.clone(),
            html,
        })
    }
}

fn build_block_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "blockquote",
        "br",
        "code",
        "div",
        "em",
        "figcaption",
        "figure",
        "h3",
        "h4",
        "hr",
        "i",
        "img",
        "li",
        "ol",
        "p",
        "pre",
        "section",
        "span",
        "strong",
        "ul",
    ]);
    builder.tags(tags);
    builder.add_generic_attributes(&["class"]);
    builder.add_generic_attribute_prefixes(&["data-"]);
    builder.link_rel(Some("noopener noreferrer"));

    builder
}
