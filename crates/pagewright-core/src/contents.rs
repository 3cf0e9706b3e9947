// ABOUTME: Gathers the columns and blocks an editing session owns, and writes a saved session back.
// ABOUTME: Saving rewrites each owned column's block membership from the blocks' column_id.

use std::collections::HashSet;

use ulid::Ulid;

use crate::model::{Block, Column, Page, Section};
use crate::store::{DocumentStore, StoreError};
use crate::tree::MAX_COLUMN_DEPTH;

/// Every column reachable from a page and the blocks they hold, each tagged
/// with its column. Visibility is ignored.
#[derive(Debug, Clone, Default)]
pub struct PageContents {
    pub columns: Vec<Column>,
    pub blocks: Vec<Block>,
}

impl PageContents {
    pub fn column_ids(&self) -> Vec<Ulid> {
        self.columns.iter().map(|c| c.column_id).collect()
    }
}

/// Walk a page in tree order. Each column and block is taken at most once,
/// and nesting beyond [`MAX_COLUMN_DEPTH`] is not walked.
pub async fn collect_contents<S: DocumentStore>(
    store: &S,
    page: &Page,
) -> Result<PageContents, StoreError> {
    let mut contents = PageContents::default();
    let mut seen_columns = HashSet::new();
    let mut seen_blocks = HashSet::new();
    let mut stack: Vec<(Ulid, usize)> = Vec::new();

    for section_id in &page.section_ids {
        let Some(section) = store.get::<Section>(*section_id).await? else {
            continue;
        };
        stack.extend(section.column_ids.iter().rev().map(|id| (*id, 0)));
        while let Some((column_id, depth)) = stack.pop() {
            if depth > MAX_COLUMN_DEPTH || !seen_columns.insert(column_id) {
                continue;
            }
            let Some(column) = store.get::<Column>(column_id).await? else {
                continue;
            };
            for block_id in &column.block_ids {
                if seen_blocks.insert(*block_id)
                    && let Some(block) = store.get::<Block>(*block_id).await?
                {
                    contents.blocks.push(block.in_column(column_id));
                }
            }
            stack.extend(column.column_ids.iter().rev().map(|id| (*id, depth + 1)));
            contents.columns.push(column);
        }
    }

    Ok(contents)
}

/// What a save changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentsWrite {
    pub blocks_written: usize,
    pub blocks_unlinked: usize,
}

/// Persist a session's blocks and make each of `columns` hold exactly the
/// blocks placed in it, in order. Blocks dropped from a column are unlinked;
/// their documents stay in the store.
pub async fn write_contents<S: DocumentStore>(
    store: &S,
    columns: &[Ulid],
    blocks: &[Block],
) -> Result<ContentsWrite, StoreError> {
    for block in blocks {
        store.put(block).await?;
    }

    let mut unlinked = 0;
    for column_id in columns {
        let Some(mut column) = store.get::<Column>(*column_id).await? else {
            tracing::warn!(column_id = %column_id, "column vanished before save, skipping");
            continue;
        };
        let placed: Vec<Ulid> = blocks
            .iter()
            .filter(|b| b.column_id == Some(*column_id))
            .map(|b| b.block_id)
            .collect();
        if column.block_ids == placed {
            continue;
        }
        unlinked += column
            .block_ids
            .iter()
            .filter(|id| !placed.contains(id))
            .count();
        column.block_ids = placed;
        store.put(&column).await?;
    }

    Ok(ContentsWrite {
        blocks_written: blocks.len(),
        blocks_unlinked: unlinked,
    })
}
