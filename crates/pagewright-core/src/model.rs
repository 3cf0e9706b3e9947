// ABOUTME: Page tree document types: Page, Section, Column, Block, and per-site settings.
// ABOUTME: Sections, columns, and blocks carry a base layout plus per-breakpoint overrides.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::responsive::{LayoutSettings, Responsive, ResponsiveOverrides, Width};

/// Maximum length of a page or site slug.
pub const MAX_SLUG_LEN: usize = 64;

/// Slugs are non-empty, lowercase ASCII alphanumerics and hyphens, and never
/// start or end with a hyphen.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    #[default]
    Draft,
    Published,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeoSettings {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub no_index: bool,
}

/// Page-wide settings: SEO metadata, custom code, and layout tokens.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageSettings {
    #[serde(default)]
    pub seo: SeoSettings,
    #[serde(default)]
    pub custom_css: Option<String>,
    #[serde(default)]
    pub custom_js: Option<String>,
    /// Emitted as CSS custom properties (`--name: value`) on the page root.
    #[serde(default)]
    pub layout_tokens: BTreeMap<String, String>,
}

impl PageSettings {
    /// Render layout tokens as a `:root` rule. Tokens whose name or value
    /// could break out of the declaration are skipped.
    pub fn tokens_css(&self) -> String {
        let decls: Vec<String> = self
            .layout_tokens
            .iter()
            .filter(|(name, value)| {
                name.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
                    && !value.contains([';', '{', '}', '<'])
            })
            .map(|(name, value)| format!("--{}:{}", name, value))
            .collect();
        if decls.is_empty() {
            String::new()
        } else {
            format!(":root{{{}}}", decls.join(";"))
        }
    }
}

/// A page: the root of the rendered tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub page_id: Ulid,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub status: PageStatus,
    #[serde(default)]
    pub section_ids: Vec<Ulid>,
    #[serde(default)]
    pub settings: PageSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// Create a draft page with no sections.
    pub fn new(slug: String, title: String) -> Self {
        let now = Utc::now();
        Self {
            page_id: Ulid::new(),
            slug,
            title,
            status: PageStatus::Draft,
            section_ids: Vec::new(),
            settings: PageSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == PageStatus::Published
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Grid,
    Stacked,
}

impl LayoutMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LayoutMode::Grid => "grid",
            LayoutMode::Stacked => "stacked",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub section_id: Ulid,
    #[serde(default)]
    pub column_ids: Vec<Ulid>,
    #[serde(default)]
    pub layout_mode: LayoutMode,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default)]
    pub responsive: ResponsiveOverrides,
}

impl Section {
    pub fn new(layout_mode: LayoutMode) -> Self {
        Self {
            section_id: Ulid::new(),
            column_ids: Vec::new(),
            layout_mode,
            background: None,
            layout: LayoutSettings::default(),
            responsive: ResponsiveOverrides::new(),
        }
    }
}

/// A column holds blocks and, optionally, further nested columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub column_id: Ulid,
    #[serde(default)]
    pub block_ids: Vec<Ulid>,
    #[serde(default)]
    pub column_ids: Vec<Ulid>,
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default)]
    pub responsive: ResponsiveOverrides,
}

impl Column {
    pub fn new(width: Width) -> Self {
        Self {
            column_id: Ulid::new(),
            block_ids: Vec::new(),
            column_ids: Vec::new(),
            layout: LayoutSettings {
                width,
                ..Default::default()
            },
            responsive: ResponsiveOverrides::new(),
        }
    }
}

/// The block-type tag. Determines how the property bag is decoded and which
/// component renders the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Text,
    Heading,
    Image,
    Video,
    Button,
    Spacer,
    Divider,
    Form,
    Map,
    Html,
    Slider,
}

impl BlockType {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Text => "text",
            BlockType::Heading => "heading",
            BlockType::Image => "image",
            BlockType::Video => "video",
            BlockType::Button => "button",
            BlockType::Spacer => "spacer",
            BlockType::Divider => "divider",
            BlockType::Form => "form",
            BlockType::Map => "map",
            BlockType::Html => "html",
            BlockType::Slider => "slider",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A leaf content unit. `props` is the type-specific property bag; see
/// [`crate::content::BlockContent`] for the typed view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub block_id: Ulid,
    pub block_type: BlockType,
    #[serde(default = "empty_props")]
    pub props: serde_json::Value,
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default)]
    pub responsive: ResponsiveOverrides,
    /// The column holding this block within an editing session's snapshot.
    /// Saving a session rewrites column membership from this field; outside
    /// a session the column's `block_ids` is authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<Ulid>,
    pub updated_at: DateTime<Utc>,
}

fn empty_props() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Block {
    pub fn new(block_type: BlockType, props: serde_json::Value) -> Self {
        Self {
            block_id: Ulid::new(),
            block_type,
            props,
            layout: LayoutSettings::default(),
            responsive: ResponsiveOverrides::new(),
            column_id: None,
            updated_at: Utc::now(),
        }
    }

    /// Place the block in `column_id`.
    pub fn in_column(mut self, column_id: Ulid) -> Self {
        self.column_id = Some(column_id);
        self
    }
}

impl Responsive for Section {
    fn base_layout(&self) -> &LayoutSettings {
        &self.layout
    }
    fn overrides(&self) -> &ResponsiveOverrides {
        &self.responsive
    }
}

impl Responsive for Column {
    fn base_layout(&self) -> &LayoutSettings {
        &self.layout
    }
    fn overrides(&self) -> &ResponsiveOverrides {
        &self.responsive
    }
}

impl Responsive for Block {
    fn base_layout(&self) -> &LayoutSettings {
        &self.layout
    }
    fn overrides(&self) -> &ResponsiveOverrides {
        &self.responsive
    }
}

/// Per-site settings, one record per tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub name: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default = "default_theme_color")]
    pub theme_color: String,
    #[serde(default = "default_home_slug")]
    pub home_slug: String,
}

fn default_theme_color() -> String {
    "#3366ff".to_string()
}

fn default_home_slug() -> String {
    "home".to_string()
}

impl SiteSettings {
    pub fn new(name: String) -> Self {
        Self {
            name,
            tagline: None,
            theme_color: default_theme_color(),
            home_slug: default_home_slug(),
        }
    }

    /// The theme colour if it is a `#rgb` or `#rrggbb` hex literal.
    pub fn valid_theme_color(&self) -> Option<&str> {
        let hex = self.theme_color.strip_prefix('#')?;
        let ok = matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit());
        ok.then_some(self.theme_color.as_str())
    }
}
