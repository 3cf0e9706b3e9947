// ABOUTME: YAML export of a resolved page tree for backup and review.
// ABOUTME: Emits the page, its visible sections/columns/blocks, and their effective layouts.

use serde::Serialize;

use crate::tree::ResolvedPage;

#[derive(Serialize)]
struct ExportDocument<'a> {
    format: &'static str,
    version: u32,
    #[serde(flatten)]
    page: &'a ResolvedPage,
}

/// Serialize a resolved page tree to YAML.
pub fn export_yaml(page: &ResolvedPage) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&ExportDocument {
        format: "pagewright-page",
        version: 1,
        page,
    })
}
