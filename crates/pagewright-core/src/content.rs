// ABOUTME: Typed views over a block's property bag, one props struct per block-type tag.
// ABOUTME: Also validates form submissions against a form block's declared fields.

use std::collections::{BTreeMap, HashSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Block, BlockType};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("invalid {block_type} block properties: {source}")]
    InvalidProps {
        block_type: BlockType,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {block_type} block: {reason}")]
    Invalid {
        block_type: BlockType,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextProps {
    /// Markdown source.
    pub markdown: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingProps {
    pub text: String,
    #[serde(default = "default_heading_level")]
    pub level: u8,
}

fn default_heading_level() -> u8 {
    2
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageProps {
    pub src: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoProps {
    pub src: String,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub autoplay: bool,
    #[serde(default = "default_true")]
    pub controls: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    #[default]
    Primary,
    Secondary,
    Link,
}

impl ButtonStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            ButtonStyle::Primary => "primary",
            ButtonStyle::Secondary => "secondary",
            ButtonStyle::Link => "link",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonProps {
    pub label: String,
    pub href: String,
    #[serde(default)]
    pub style: ButtonStyle,
    #[serde(default)]
    pub new_tab: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacerProps {
    #[serde(default = "default_spacer_height")]
    pub height: u16,
}

fn default_spacer_height() -> u16 {
    32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividerProps {
    #[serde(default = "default_thickness")]
    pub thickness: u8,
    #[serde(default)]
    pub color: Option<String>,
}

fn default_thickness() -> u8 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Email,
    Tel,
    Number,
    Textarea,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Email => "email",
            FieldKind::Tel => "tel",
            FieldKind::Number => "number",
            FieldKind::Textarea => "textarea",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormProps {
    #[serde(default)]
    pub title: Option<String>,
    pub fields: Vec<FormField>,
    #[serde(default = "default_submit_label")]
    pub submit_label: String,
    #[serde(default)]
    pub success_message: Option<String>,
}

fn default_submit_label() -> String {
    "Send".to_string()
}

/// A problem with one submitted form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FormProps {
    /// Check submitted values against the declared fields. Unknown keys are
    /// ignored; every problem is reported, not just the first.
    pub fn validate_submission(
        &self,
        values: &BTreeMap<String, String>,
    ) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        for field in &self.fields {
            let value = values.get(&field.name).map(|v| v.trim()).unwrap_or("");
            if value.is_empty() {
                if field.required {
                    errors.push(FieldError {
                        field: field.name.clone(),
                        message: format!("{} is required", field.label),
                    });
                }
                continue;
            }
            let valid = match field.kind {
                FieldKind::Email => looks_like_email(value),
                FieldKind::Number => value.parse::<f64>().is_ok(),
                FieldKind::Tel => value
                    .chars()
                    .all(|c| c.is_ascii_digit() || " +-().".contains(c)),
                FieldKind::Text | FieldKind::Textarea => true,
            };
            if !valid {
                errors.push(FieldError {
                    field: field.name.clone(),
                    message: format!("{} is not a valid {}", field.label, field.kind.as_str()),
                });
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapProps {
    pub query: String,
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    #[serde(default = "default_map_height")]
    pub height: u16,
}

fn default_zoom() -> u8 {
    14
}

fn default_map_height() -> u16 {
    300
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlProps {
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub src: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliderProps {
    pub slides: Vec<Slide>,
    #[serde(default)]
    pub autoplay_ms: Option<u32>,
}

/// Decoded block content, one variant per block-type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockContent {
    Text(TextProps),
    Heading(HeadingProps),
    Image(ImageProps),
    Video(VideoProps),
    Button(ButtonProps),
    Spacer(SpacerProps),
    Divider(DividerProps),
    Form(FormProps),
    Map(MapProps),
    Html(HtmlProps),
    Slider(SliderProps),
}

impl BlockContent {
    /// Decode and validate a block's property bag according to its tag.
    pub fn from_block(block: &Block) -> Result<Self, ContentError> {
        let ty = block.block_type;
        let content = match ty {
            BlockType::Text => BlockContent::Text(decode(block)?),
            BlockType::Heading => {
                let props: HeadingProps = decode(block)?;
                if !(1..=6).contains(&props.level) {
                    return Err(invalid(ty, format!("heading level {} out of range", props.level)));
                }
                BlockContent::Heading(props)
            }
            BlockType::Image => {
                let props: ImageProps = decode(block)?;
                require_non_empty(ty, "src", &props.src)?;
                BlockContent::Image(props)
            }
            BlockType::Video => {
                let props: VideoProps = decode(block)?;
                require_non_empty(ty, "src", &props.src)?;
                BlockContent::Video(props)
            }
            BlockType::Button => BlockContent::Button(decode(block)?),
            BlockType::Spacer => BlockContent::Spacer(decode(block)?),
            BlockType::Divider => BlockContent::Divider(decode(block)?),
            BlockType::Form => {
                let props: FormProps = decode(block)?;
                let mut seen = HashSet::new();
                for field in &props.fields {
                    require_non_empty(ty, "field name", &field.name)?;
                    if !seen.insert(field.name.as_str()) {
                        return Err(invalid(ty, format!("duplicate field name {}", field.name)));
                    }
                }
                BlockContent::Form(props)
            }
            BlockType::Map => BlockContent::Map(decode(block)?),
            BlockType::Html => BlockContent::Html(decode(block)?),
            BlockType::Slider => BlockContent::Slider(decode(block)?),
        };
        Ok(content)
    }
}

fn decode<T: DeserializeOwned>(block: &Block) -> Result<T, ContentError> {
    serde_json::from_value(block.props.clone()).map_err(|source| ContentError::InvalidProps {
        block_type: block.block_type,
        source,
    })
}

fn invalid(block_type: BlockType, reason: String) -> ContentError {
    ContentError::Invalid { block_type, reason }
}

fn require_non_empty(block_type: BlockType, what: &str, value: &str) -> Result<(), ContentError> {
    if value.trim().is_empty() {
        Err(invalid(block_type, format!("{} must not be empty", what)))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contact_form() -> FormProps {
        let block = Block::new(
            BlockType::Form,
            json!({
                "fields": [
                    { "name": "name", "label": "Name", "required": true },
                    { "name": "email", "label": "Email", "kind": "email", "required": true },
                    { "name": "phone", "label": "Phone", "kind": "tel" }
                ]
            }),
        );
        match BlockContent::from_block(&block).unwrap() {
            BlockContent::Form(props) => props,
            other => panic!("expected form, got {:?}", other),
        }
    }

    #[test]
    fn heading_defaults_to_level_two() {
        let block = Block::new(BlockType::Heading, json!({ "text": "Welcome" }));
        match BlockContent::from_block(&block).unwrap() {
            BlockContent::Heading(h) => {
                assert_eq!(h.text, "Welcome");
                assert_eq!(h.level, 2);
            }
            other => panic!("expected heading, got {:?}", other),
        }
    }

    #[test]
    fn heading_level_out_of_range_is_rejected() {
        let block = Block::new(BlockType::Heading, json!({ "text": "x", "level": 9 }));
        let err = BlockContent::from_block(&block).unwrap_err();
        assert!(err.to_string().contains("heading level 9"), "{}", err);
    }

    #[test]
    fn missing_required_prop_reports_block_type() {
        let block = Block::new(BlockType::Image, json!({ "alt": "no src" }));
        let err = BlockContent::from_block(&block).unwrap_err();
        assert!(matches!(err, ContentError::InvalidProps { block_type: BlockType::Image, .. }));
    }

    #[test]
    fn empty_bag_is_fine_for_defaulted_types() {
        let spacer = Block::new(BlockType::Spacer, json!({}));
        assert_eq!(
            BlockContent::from_block(&spacer).unwrap(),
            BlockContent::Spacer(SpacerProps { height: 32 })
        );
        let divider = Block::new(BlockType::Divider, json!({}));
        assert!(BlockContent::from_block(&divider).is_ok());
    }

    #[test]
    fn duplicate_form_fields_are_rejected() {
        let block = Block::new(
            BlockType::Form,
            json!({ "fields": [
                { "name": "a", "label": "A" },
                { "name": "a", "label": "Again" }
            ]}),
        );
        assert!(BlockContent::from_block(&block).is_err());
    }

    #[test]
    fn form_submission_accepts_valid_values() {
        let mut values = BTreeMap::new();
        values.insert("name".to_string(), "Ada".to_string());
        values.insert("email".to_string(), "ada@example.com".to_string());
        values.insert("unrelated".to_string(), "ignored".to_string());
        assert!(contact_form().validate_submission(&values).is_ok());
    }

    #[test]
    fn form_submission_reports_every_problem() {
        let mut values = BTreeMap::new();
        values.insert("email".to_string(), "not-an-email".to_string());
        values.insert("phone".to_string(), "call me".to_string());

        let errors = contact_form().validate_submission(&values).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "email", "phone"]);
        assert_eq!(errors[0].message, "Name is required");
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        let mut values = BTreeMap::new();
        values.insert("name".to_string(), "   ".to_string());
        values.insert("email".to_string(), "a@b.co".to_string());
        let errors = contact_form().validate_submission(&values).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "name");
    }
}
