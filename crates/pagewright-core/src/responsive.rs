// ABOUTME: Breakpoints, layout settings, and the override-over-base responsive resolver.
// ABOUTME: Resolves effective visibility, width, order, and spacing per breakpoint and derives inline CSS.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Viewport widths at or above which tablet and desktop layouts apply.
pub const TABLET_MIN_WIDTH: u32 = 768;
pub const DESKTOP_MIN_WIDTH: u32 = 1024;

/// One of the three viewport classes that responsive overrides are keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Mobile,
    Tablet,
    #[default]
    Desktop,
}

impl Breakpoint {
    pub const ALL: [Breakpoint; 3] = [Breakpoint::Mobile, Breakpoint::Tablet, Breakpoint::Desktop];

    /// Classify a viewport width in CSS pixels.
    pub fn from_width(width: u32) -> Self {
        if width < TABLET_MIN_WIDTH {
            Breakpoint::Mobile
        } else if width < DESKTOP_MIN_WIDTH {
            Breakpoint::Tablet
        } else {
            Breakpoint::Desktop
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Breakpoint::Mobile => "mobile",
            Breakpoint::Tablet => "tablet",
            Breakpoint::Desktop => "desktop",
        }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown breakpoint: {0}")]
pub struct UnknownBreakpoint(pub String);

impl FromStr for Breakpoint {
    type Err = UnknownBreakpoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mobile" => Ok(Breakpoint::Mobile),
            "tablet" => Ok(Breakpoint::Tablet),
            "desktop" => Ok(Breakpoint::Desktop),
            other => Err(UnknownBreakpoint(other.to_string())),
        }
    }
}

/// Element width: a percentage of the parent, a fixed pixel size, or auto.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "lowercase")]
pub enum Width {
    Percent(f32),
    Pixels(u32),
    #[default]
    Auto,
}

impl Width {
    /// CSS value for the `width` property.
    pub fn css_value(&self) -> String {
        match self {
            Width::Percent(p) => format!("{}%", p),
            Width::Pixels(px) => format!("{}px", px),
            Width::Auto => "auto".to_string(),
        }
    }
}

/// Four-sided box measurement in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Edges {
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
    pub left: u16,
}

impl Edges {
    pub fn all(px: u16) -> Self {
        Self {
            top: px,
            right: px,
            bottom: px,
            left: px,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Edges::default()
    }

    fn css_value(&self) -> String {
        format!(
            "{}px {}px {}px {}px",
            self.top, self.right, self.bottom, self.left
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Spacing {
    #[serde(default)]
    pub padding: Edges,
    #[serde(default)]
    pub margin: Edges,
}

/// Base layout of a section, column, or block. Also the shape of the
/// effective layout produced by [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutSettings {
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub width: Width,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub spacing: Spacing,
}

fn default_visible() -> bool {
    true
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            visible: true,
            width: Width::Auto,
            order: 0,
            spacing: Spacing::default(),
        }
    }
}

impl LayoutSettings {
    /// Derive an inline style declaration list for this layout. Zero spacing
    /// and auto width are omitted.
    pub fn to_css(&self) -> String {
        let mut decls = Vec::new();
        if self.width != Width::Auto {
            decls.push(format!("width:{}", self.width.css_value()));
        }
        if self.order != 0 {
            decls.push(format!("order:{}", self.order));
        }
        if !self.spacing.padding.is_zero() {
            decls.push(format!("padding:{}", self.spacing.padding.css_value()));
        }
        if !self.spacing.margin.is_zero() {
            decls.push(format!("margin:{}", self.spacing.margin.css_value()));
        }
        decls.join(";")
    }
}

/// Partial layout for one breakpoint. Unset fields inherit the base value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Width>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<Spacing>,
}

impl LayoutOverride {
    /// A hide-only override.
    pub fn hidden() -> Self {
        Self {
            visible: Some(false),
            ..Default::default()
        }
    }

    fn apply(&self, base: &LayoutSettings) -> LayoutSettings {
        LayoutSettings {
            visible: self.visible.unwrap_or(base.visible),
            width: self.width.unwrap_or(base.width),
            order: self.order.unwrap_or(base.order),
            spacing: self.spacing.unwrap_or(base.spacing),
        }
    }
}

/// Overrides keyed by breakpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponsiveOverrides(BTreeMap<Breakpoint, LayoutOverride>);

impl ResponsiveOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bp: Breakpoint) -> Option<&LayoutOverride> {
        self.0.get(&bp)
    }

    pub fn set(&mut self, bp: Breakpoint, layout: LayoutOverride) {
        self.0.insert(bp, layout);
    }

    /// Builder-style variant of [`ResponsiveOverrides::set`].
    pub fn with(mut self, bp: Breakpoint, layout: LayoutOverride) -> Self {
        self.set(bp, layout);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Merge the override for `bp` over `base`. Breakpoints do not cascade into
/// one another: a missing override yields the base unchanged.
pub fn resolve(
    base: &LayoutSettings,
    overrides: &ResponsiveOverrides,
    bp: Breakpoint,
) -> LayoutSettings {
    match overrides.get(bp) {
        Some(o) => o.apply(base),
        None => *base,
    }
}

/// Anything in the page tree that carries a base layout and overrides.
pub trait Responsive {
    fn base_layout(&self) -> &LayoutSettings;
    fn overrides(&self) -> &ResponsiveOverrides;

    fn effective_layout(&self, bp: Breakpoint) -> LayoutSettings {
        resolve(self.base_layout(), self.overrides(), bp)
    }
}

/// Drop items that are invisible at `bp` and stably sort the remainder by
/// effective order, pairing each with its effective layout.
pub fn layout_visible<T: Responsive>(items: Vec<T>, bp: Breakpoint) -> Vec<(T, LayoutSettings)> {
    let mut laid_out: Vec<(T, LayoutSettings)> = items
        .into_iter()
        .map(|item| {
            let layout = item.effective_layout(bp);
            (item, layout)
        })
        .filter(|(_, layout)| layout.visible)
        .collect();
    laid_out.sort_by_key(|(_, layout)| layout.order);
    laid_out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Element {
        name: &'static str,
        base: LayoutSettings,
        overrides: ResponsiveOverrides,
    }

    impl Responsive for Element {
        fn base_layout(&self) -> &LayoutSettings {
            &self.base
        }
        fn overrides(&self) -> &ResponsiveOverrides {
            &self.overrides
        }
    }

    fn base() -> LayoutSettings {
        LayoutSettings {
            visible: true,
            width: Width::Percent(50.0),
            order: 2,
            spacing: Spacing {
                padding: Edges::all(8),
                margin: Edges::default(),
            },
        }
    }

    #[test]
    fn no_override_equals_base_at_every_breakpoint() {
        let overrides = ResponsiveOverrides::new();
        for bp in Breakpoint::ALL {
            assert_eq!(resolve(&base(), &overrides, bp), base());
        }
    }

    #[test]
    fn override_fields_replace_only_what_is_set() {
        let overrides = ResponsiveOverrides::new().with(
            Breakpoint::Mobile,
            LayoutOverride {
                width: Some(Width::Percent(100.0)),
                ..Default::default()
            },
        );

        let mobile = resolve(&base(), &overrides, Breakpoint::Mobile);
        assert_eq!(mobile.width, Width::Percent(100.0));
        assert_eq!(mobile.order, 2);
        assert_eq!(mobile.spacing.padding, Edges::all(8));
        assert!(mobile.visible);

        // Other breakpoints do not inherit the mobile override
        let tablet = resolve(&base(), &overrides, Breakpoint::Tablet);
        assert_eq!(tablet, base());
    }

    #[test]
    fn hidden_elements_are_excluded_and_rest_sorted_by_order() {
        let items = vec![
            Element {
                name: "a",
                base: LayoutSettings {
                    order: 3,
                    ..Default::default()
                },
                overrides: ResponsiveOverrides::new(),
            },
            Element {
                name: "b",
                base: LayoutSettings::default(),
                overrides: ResponsiveOverrides::new()
                    .with(Breakpoint::Mobile, LayoutOverride::hidden()),
            },
            Element {
                name: "c",
                base: LayoutSettings {
                    order: 1,
                    ..Default::default()
                },
                overrides: ResponsiveOverrides::new(),
            },
        ];

        let laid_out = layout_visible(items, Breakpoint::Mobile);
        let names: Vec<_> = laid_out.iter().map(|(e, _)| e.name).collect();
        assert_eq!(names, vec!["c", "a"]);
    }

    #[test]
    fn equal_orders_keep_source_position() {
        let items: Vec<Element> = ["x", "y", "z"]
            .into_iter()
            .map(|name| Element {
                name,
                base: LayoutSettings::default(),
                overrides: ResponsiveOverrides::new(),
            })
            .collect();

        let names: Vec<_> = layout_visible(items, Breakpoint::Desktop)
            .iter()
            .map(|(e, _)| e.name)
            .collect();
        assert_eq!(names, vec!["x", "y", "z"]);
    }

    #[test]
    fn breakpoint_from_width_boundaries() {
        assert_eq!(Breakpoint::from_width(0), Breakpoint::Mobile);
        assert_eq!(Breakpoint::from_width(767), Breakpoint::Mobile);
        assert_eq!(Breakpoint::from_width(768), Breakpoint::Tablet);
        assert_eq!(Breakpoint::from_width(1023), Breakpoint::Tablet);
        assert_eq!(Breakpoint::from_width(1024), Breakpoint::Desktop);
    }

    #[test]
    fn breakpoint_parses_case_insensitively() {
        assert_eq!("Mobile".parse::<Breakpoint>().unwrap(), Breakpoint::Mobile);
        assert!("watch".parse::<Breakpoint>().is_err());
    }

    #[test]
    fn css_omits_defaults() {
        assert_eq!(LayoutSettings::default().to_css(), "");
        assert_eq!(
            base().to_css(),
            "width:50%;order:2;padding:8px 8px 8px 8px"
        );
        let px = LayoutSettings {
            width: Width::Pixels(320),
            ..Default::default()
        };
        assert_eq!(px.to_css(), "width:320px");
    }

    #[test]
    fn overrides_serialize_keyed_by_breakpoint_name() {
        let overrides = ResponsiveOverrides::new()
            .with(Breakpoint::Tablet, LayoutOverride::hidden());
        let json = serde_json::to_value(&overrides).unwrap();
        assert_eq!(json, serde_json::json!({ "tablet": { "visible": false } }));
    }
}
