// ABOUTME: Server-side rendering of a resolved page tree into HTML for one breakpoint.
// ABOUTME: Walks sections, nested columns, and blocks, wrapping each in a template carrying its layout CSS.

pub mod blocks;

use askama::Template;
use pagewright_core::tree::{ColumnChild, ResolvedBlock, ResolvedColumn, ResolvedSection};
use pagewright_core::{BlockContent, Categorized, ResolvedPage};

use crate::render::blocks::{BlockFallback, render_content, safe_color};

#[derive(Template)]
#[template(path = "tree/section.html")]
struct SectionTemplate<'a> {
    id: String,
    mode: &'static str,
    style: String,
    columns: &'a [String],
}

#[derive(Template)]
#[template(path = "tree/column.html")]
struct ColumnTemplate<'a> {
    id: String,
    depth: usize,
    style: String,
    children: &'a [String],
}

#[derive(Template)]
#[template(path = "tree/block.html")]
struct BlockTemplate {
    id: String,
    kind: &'static str,
    style: String,
    inner: String,
}

/// Render every visible section of a resolved page, in order.
pub fn render_sections(page: &ResolvedPage, site_slug: &str) -> askama::Result<String> {
    let mut html = String::new();
    for section in &page.sections {
        html.push_str(&render_section(section, site_slug)?);
    }
    Ok(html)
}

fn render_section(resolved: &ResolvedSection, site_slug: &str) -> askama::Result<String> {
    let columns = resolved
        .columns
        .iter()
        .map(|column| render_column(column, site_slug))
        .collect::<askama::Result<Vec<_>>>()?;

    let mut style = resolved.layout.to_css();
    if let Some(background) = resolved.section.background.as_deref().and_then(safe_color) {
        if !style.is_empty() {
            style.push(';');
        }
        style.push_str("background-color:");
        style.push_str(background);
    }

    SectionTemplate {
        id: resolved.section.section_id.to_string(),
        mode: resolved.section.layout_mode.as_str(),
        style,
        columns: &columns,
    }
    .render()
}

// Recursion depth is bounded by the resolver's column depth cap
fn render_column(resolved: &ResolvedColumn, site_slug: &str) -> askama::Result<String> {
    let children = resolved
        .children
        .iter()
        .map(|child| match child {
            ColumnChild::Block(block) => render_block(block, site_slug),
            ColumnChild::Column(column) => render_column(column, site_slug),
        })
        .collect::<askama::Result<Vec<_>>>()?;

    ColumnTemplate {
        id: resolved.column.column_id.to_string(),
        depth: resolved.depth,
        style: resolved.layout.to_css(),
        children: &children,
    }
    .render()
}

fn render_block(resolved: &ResolvedBlock, site_slug: &str) -> askama::Result<String> {
    let block = &resolved.block;
    let inner = match BlockContent::from_block(block) {
        Ok(content) => render_content(&content, site_slug, block.block_id)?,
        Err(e) => {
            tracing::warn!(block_id = %block.block_id, "rendering fallback for block: {}", e);
            BlockFallback {
                message: e.category().user_message(),
            }
            .render()?
        }
    };

    BlockTemplate {
        id: block.block_id.to_string(),
        kind: block.block_type.as_str(),
        style: resolved.layout.to_css(),
        inner,
    }
    .render()
}
