// ABOUTME: Lazy resolution of Page -> Section -> Column (nested) -> Block for one breakpoint.
// ABOUTME: Fetches each node independently, drops hidden nodes, and caps column nesting depth.

use std::collections::HashMap;

use futures::future::{BoxFuture, FutureExt, join_all};
use serde::Serialize;
use ulid::Ulid;

use crate::model::{Block, Column, Page, Section};
use crate::responsive::{Breakpoint, LayoutSettings, layout_visible};
use crate::store::{DocumentStore, StoreError};

/// Deepest column nesting that is rendered. Top-level columns sit at depth 0;
/// anything deeper than this resolves to nothing.
pub const MAX_COLUMN_DEPTH: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPage {
    pub page: Page,
    pub breakpoint: Breakpoint,
    pub sections: Vec<ResolvedSection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSection {
    pub section: Section,
    pub layout: LayoutSettings,
    pub columns: Vec<ResolvedColumn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedColumn {
    pub column: Column,
    pub layout: LayoutSettings,
    pub depth: usize,
    pub children: Vec<ColumnChild>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ColumnChild {
    Block(ResolvedBlock),
    Column(ResolvedColumn),
}

impl ColumnChild {
    fn order(&self) -> i32 {
        match self {
            ColumnChild::Block(b) => b.layout.order,
            ColumnChild::Column(c) => c.layout.order,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedBlock {
    pub block: Block,
    pub layout: LayoutSettings,
}

impl ResolvedPage {
    /// Number of blocks that made it into the layout.
    pub fn block_count(&self) -> usize {
        fn count(column: &ResolvedColumn) -> usize {
            column
                .children
                .iter()
                .map(|child| match child {
                    ColumnChild::Block(_) => 1,
                    ColumnChild::Column(c) => count(c),
                })
                .sum()
        }
        self.sections
            .iter()
            .flat_map(|s| s.columns.iter())
            .map(count)
            .sum()
    }
}

/// Resolves a page tree against a store for a single breakpoint.
pub struct TreeResolver<'a, S: DocumentStore> {
    store: &'a S,
    breakpoint: Breakpoint,
    overlay: Overlay,
}

/// Session state served in place of the store: block contents by id, and the
/// ordered block ids of every column the session owns.
#[derive(Default)]
struct Overlay {
    blocks: HashMap<Ulid, Block>,
    placement: HashMap<Ulid, Vec<Ulid>>,
}

impl<'a, S: DocumentStore> TreeResolver<'a, S> {
    pub fn new(store: &'a S, breakpoint: Breakpoint) -> Self {
        Self {
            store,
            breakpoint,
            overlay: Overlay::default(),
        }
    }

    /// Serve an editing session's current entry instead of the stored blocks.
    /// Each of `columns` holds exactly the overlay blocks whose `column_id`
    /// names it, in the order given; other columns keep their stored
    /// `block_ids`.
    pub fn with_overlay(
        mut self,
        columns: impl IntoIterator<Item = Ulid>,
        blocks: impl IntoIterator<Item = Block>,
    ) -> Self {
        for column_id in columns {
            self.overlay.placement.entry(column_id).or_default();
        }
        for block in blocks {
            if let Some(placed) = block
                .column_id
                .and_then(|id| self.overlay.placement.get_mut(&id))
            {
                placed.push(block.block_id);
            }
            self.overlay.blocks.insert(block.block_id, block);
        }
        self
    }

    /// Look a page up by slug and resolve it. Returns None when no page has
    /// that slug.
    pub async fn resolve_slug(&self, slug: &str) -> Result<Option<ResolvedPage>, StoreError> {
        match self.store.page_by_slug(slug).await? {
            Some(page) => Ok(Some(self.resolve_page(page).await?)),
            None => Ok(None),
        }
    }

    pub async fn resolve_page(&self, page: Page) -> Result<ResolvedPage, StoreError> {
        let fetched = join_all(page.section_ids.iter().map(|id| self.store.get::<Section>(*id)))
            .await;

        let mut sections = Vec::new();
        for (id, result) in page.section_ids.iter().zip(fetched) {
            match result? {
                Some(section) => sections.push(section),
                None => tracing::warn!(section_id = %id, "section not found, skipping"),
            }
        }

        let mut resolved = Vec::new();
        for (section, layout) in layout_visible(sections, self.breakpoint) {
            let columns = self.resolve_columns(&section.column_ids, 0).await?;
            resolved.push(ResolvedSection {
                section,
                layout,
                columns,
            });
        }

        Ok(ResolvedPage {
            page,
            breakpoint: self.breakpoint,
            sections: resolved,
        })
    }

    fn resolve_columns<'s>(
        &'s self,
        ids: &'s [Ulid],
        depth: usize,
    ) -> BoxFuture<'s, Result<Vec<ResolvedColumn>, StoreError>> {
        async move {
            if depth > MAX_COLUMN_DEPTH {
                if !ids.is_empty() {
                    tracing::debug!(depth, "column nesting too deep, not rendering");
                }
                return Ok(Vec::new());
            }

            let mut columns = Vec::new();
            for id in ids {
                match self.store.get::<Column>(*id).await? {
                    Some(column) => columns.push(column),
                    None => tracing::warn!(column_id = %id, "column not found, skipping"),
                }
            }

            let mut resolved = Vec::new();
            for (column, layout) in layout_visible(columns, self.breakpoint) {
                let children = self.resolve_children(&column, depth).await?;
                resolved.push(ResolvedColumn {
                    column,
                    layout,
                    depth,
                    children,
                });
            }
            Ok(resolved)
        }
        .boxed()
    }

    async fn resolve_children(
        &self,
        column: &Column,
        depth: usize,
    ) -> Result<Vec<ColumnChild>, StoreError> {
        let ids = self
            .overlay
            .placement
            .get(&column.column_id)
            .unwrap_or(&column.block_ids);

        let mut blocks = Vec::new();
        for id in ids {
            match self.fetch_block(*id).await? {
                Some(block) => blocks.push(block),
                None => tracing::warn!(block_id = %id, "block not found, skipping"),
            }
        }

        let mut children: Vec<ColumnChild> = layout_visible(blocks, self.breakpoint)
            .into_iter()
            .map(|(block, layout)| ColumnChild::Block(ResolvedBlock { block, layout }))
            .collect();

        let nested = self.resolve_columns(&column.column_ids, depth + 1).await?;
        children.extend(nested.into_iter().map(ColumnChild::Column));

        // Stable: blocks precede nested columns of the same order
        children.sort_by_key(ColumnChild::order);
        Ok(children)
    }

    async fn fetch_block(&self, id: Ulid) -> Result<Option<Block>, StoreError> {
        if let Some(block) = self.overlay.blocks.get(&id) {
            return Ok(Some(block.clone()));
        }
        self.store.get::<Block>(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockType, LayoutMode};
    use crate::responsive::{LayoutOverride, ResponsiveOverrides, Width};
    use crate::store::MemoryStore;
    use serde_json::json;

    fn text(markdown: &str) -> Block {
        Block::new(BlockType::Text, json!({ "markdown": markdown }))
    }

    /// Page with one section, one column, and the given blocks.
    async fn single_column_page(store: &MemoryStore, blocks: Vec<Block>) -> (Page, Column) {
        let mut column = Column::new(Width::Percent(100.0));
        for block in &blocks {
            store.put(block).await.unwrap();
            column.block_ids.push(block.block_id);
        }
        store.put(&column).await.unwrap();

        let mut section = Section::new(LayoutMode::Grid);
        section.column_ids.push(column.column_id);
        store.put(&section).await.unwrap();

        let mut page = Page::new("home".to_string(), "Home".to_string());
        page.section_ids.push(section.section_id);
        store.put(&page).await.unwrap();
        (page, column)
    }

    fn block_texts(column: &ResolvedColumn) -> Vec<String> {
        column
            .children
            .iter()
            .filter_map(|c| match c {
                ColumnChild::Block(b) => Some(b.block.props["markdown"].as_str()?.to_string()),
                ColumnChild::Column(_) => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn resolves_full_tree_by_slug() {
        let store = MemoryStore::new();
        single_column_page(&store, vec![text("one"), text("two")]).await;

        let resolved = TreeResolver::new(&store, Breakpoint::Desktop)
            .resolve_slug("home")
            .await
            .unwrap()
            .expect("page should resolve");

        assert_eq!(resolved.sections.len(), 1);
        assert_eq!(resolved.sections[0].columns.len(), 1);
        assert_eq!(block_texts(&resolved.sections[0].columns[0]), vec!["one", "two"]);
        assert_eq!(resolved.block_count(), 2);
    }

    #[tokio::test]
    async fn unknown_slug_resolves_to_none() {
        let store = MemoryStore::new();
        let resolved = TreeResolver::new(&store, Breakpoint::Mobile)
            .resolve_slug("missing")
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn hidden_block_is_excluded_at_that_breakpoint_only() {
        let store = MemoryStore::new();
        let mut hidden = text("desktop only");
        hidden.responsive =
            ResponsiveOverrides::new().with(Breakpoint::Mobile, LayoutOverride::hidden());
        single_column_page(&store, vec![text("always"), hidden]).await;

        let mobile = TreeResolver::new(&store, Breakpoint::Mobile)
            .resolve_slug("home")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(block_texts(&mobile.sections[0].columns[0]), vec!["always"]);

        let desktop = TreeResolver::new(&store, Breakpoint::Desktop)
            .resolve_slug("home")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            block_texts(&desktop.sections[0].columns[0]),
            vec!["always", "desktop only"]
        );
    }

    #[tokio::test]
    async fn breakpoint_order_override_reorders_blocks() {
        let store = MemoryStore::new();
        let mut last_on_mobile = text("first");
        last_on_mobile.responsive = ResponsiveOverrides::new().with(
            Breakpoint::Mobile,
            LayoutOverride {
                order: Some(10),
                ..Default::default()
            },
        );
        single_column_page(&store, vec![last_on_mobile, text("second")]).await;

        let mobile = TreeResolver::new(&store, Breakpoint::Mobile)
            .resolve_slug("home")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(block_texts(&mobile.sections[0].columns[0]), vec!["second", "first"]);
    }

    #[tokio::test]
    async fn missing_nodes_are_skipped() {
        let store = MemoryStore::new();
        let (mut page, mut column) = single_column_page(&store, vec![text("kept")]).await;
        column.block_ids.push(Ulid::new());
        store.put(&column).await.unwrap();
        page.section_ids.insert(0, Ulid::new());
        store.put(&page).await.unwrap();

        let resolved = TreeResolver::new(&store, Breakpoint::Desktop)
            .resolve_page(page)
            .await
            .unwrap();
        assert_eq!(resolved.sections.len(), 1);
        assert_eq!(block_texts(&resolved.sections[0].columns[0]), vec!["kept"]);
    }

    #[tokio::test]
    async fn nesting_beyond_max_depth_renders_nothing() {
        let store = MemoryStore::new();

        // Chain of columns 0..=7 deep, each holding one block
        let mut child: Option<Ulid> = None;
        for depth in (0..=7).rev() {
            let block = text(&format!("depth {}", depth));
            store.put(&block).await.unwrap();
            let mut column = Column::new(Width::Auto);
            column.block_ids.push(block.block_id);
            if let Some(id) = child {
                column.column_ids.push(id);
            }
            store.put(&column).await.unwrap();
            child = Some(column.column_id);
        }
        let mut section = Section::new(LayoutMode::Stacked);
        section.column_ids.push(child.unwrap());
        store.put(&section).await.unwrap();
        let mut page = Page::new("deep".to_string(), "Deep".to_string());
        page.section_ids.push(section.section_id);

        let resolved = TreeResolver::new(&store, Breakpoint::Desktop)
            .resolve_page(page)
            .await
            .unwrap();

        let mut column = &resolved.sections[0].columns[0];
        let mut deepest = 0;
        loop {
            assert_eq!(column.depth, deepest);
            match column.children.iter().find_map(|c| match c {
                ColumnChild::Column(nested) => Some(nested),
                ColumnChild::Block(_) => None,
            }) {
                Some(nested) => {
                    column = nested;
                    deepest += 1;
                }
                None => break,
            }
        }
        assert_eq!(deepest, MAX_COLUMN_DEPTH);
        assert_eq!(resolved.block_count(), MAX_COLUMN_DEPTH + 1);
    }

    #[tokio::test]
    async fn self_referencing_column_terminates() {
        let store = MemoryStore::new();
        let (page, mut column) = single_column_page(&store, vec![text("loop")]).await;
        column.column_ids.push(column.column_id);
        store.put(&column).await.unwrap();

        let resolved = TreeResolver::new(&store, Breakpoint::Desktop)
            .resolve_page(page.clone())
            .await
            .unwrap();
        assert_eq!(resolved.block_count(), MAX_COLUMN_DEPTH + 1);
    }

    #[tokio::test]
    async fn overlay_replaces_stored_blocks() {
        let store = MemoryStore::new();
        let original = text("stored");
        let (_, column) = single_column_page(&store, vec![original.clone()]).await;
        let mut edited = original.in_column(column.column_id);
        edited.props = json!({ "markdown": "edited" });

        let resolved = TreeResolver::new(&store, Breakpoint::Desktop)
            .with_overlay([column.column_id], vec![edited])
            .resolve_slug("home")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(block_texts(&resolved.sections[0].columns[0]), vec!["edited"]);
    }

    #[tokio::test]
    async fn overlay_membership_drops_removed_and_places_new_blocks() {
        let store = MemoryStore::new();
        let (_, column) = single_column_page(&store, vec![text("removed"), text("kept")]).await;
        let stored = store.get::<Column>(column.column_id).await.unwrap().unwrap();
        let kept = store
            .get::<Block>(stored.block_ids[1])
            .await
            .unwrap()
            .unwrap()
            .in_column(column.column_id);
        let added = text("added").in_column(column.column_id);

        let resolved = TreeResolver::new(&store, Breakpoint::Desktop)
            .with_overlay([column.column_id], vec![added, kept])
            .resolve_slug("home")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            block_texts(&resolved.sections[0].columns[0]),
            vec!["added", "kept"]
        );
    }

    #[tokio::test]
    async fn columns_outside_the_overlay_keep_stored_blocks() {
        let store = MemoryStore::new();
        let (_, column) = single_column_page(&store, vec![text("stored")]).await;

        let resolved = TreeResolver::new(&store, Breakpoint::Desktop)
            .with_overlay([Ulid::new()], vec![text("elsewhere").in_column(Ulid::new())])
            .resolve_slug("home")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.sections[0].columns[0].column.column_id, column.column_id);
        assert_eq!(block_texts(&resolved.sections[0].columns[0]), vec!["stored"]);
    }
}
