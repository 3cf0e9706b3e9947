// ABOUTME: One Askama template per block type, rendering decoded block content to HTML fragments.
// ABOUTME: URLs and colours are checked before they reach an attribute; markdown raw HTML is escaped.

use askama::Template;
use pagewright_core::BlockContent;
use pagewright_core::content::{FieldKind, FormProps};
use pulldown_cmark::{Event, Options, Parser, Tag};
use ulid::Ulid;

#[derive(Template)]
#[template(path = "blocks/text.html")]
struct TextBlock {
    html: String,
}

#[derive(Template)]
#[template(path = "blocks/heading.html")]
struct HeadingBlock<'a> {
    level: u8,
    text: &'a str,
}

#[derive(Template)]
#[template(path = "blocks/image.html")]
struct ImageBlock<'a> {
    src: &'a str,
    alt: &'a str,
    caption: Option<&'a str>,
    href: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "blocks/video.html")]
struct VideoBlock<'a> {
    src: &'a str,
    poster: Option<&'a str>,
    autoplay: bool,
    controls: bool,
}

#[derive(Template)]
#[template(path = "blocks/button.html")]
struct ButtonBlock<'a> {
    label: &'a str,
    href: &'a str,
    style: &'static str,
    new_tab: bool,
}

#[derive(Template)]
#[template(path = "blocks/spacer.html")]
struct SpacerBlock {
    height: u16,
}

#[derive(Template)]
#[template(path = "blocks/divider.html")]
struct DividerBlock<'a> {
    thickness: u8,
    color: Option<&'a str>,
}

struct FieldView<'a> {
    name: &'a str,
    label: &'a str,
    input_type: &'static str,
    textarea: bool,
    required: bool,
    placeholder: &'a str,
}

#[derive(Template)]
#[template(path = "blocks/form.html")]
struct FormBlock<'a> {
    action: String,
    title: Option<&'a str>,
    fields: Vec<FieldView<'a>>,
    submit_label: &'a str,
}

#[derive(Template)]
#[template(path = "blocks/map.html")]
struct MapBlock {
    src: String,
    height: u16,
}

#[derive(Template)]
#[template(path = "blocks/html.html")]
struct HtmlBlock<'a> {
    html: &'a str,
}

struct SlideView<'a> {
    src: &'a str,
    alt: &'a str,
    caption: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "blocks/slider.html")]
struct SliderBlock<'a> {
    slides: Vec<SlideView<'a>>,
    autoplay_ms: Option<u32>,
}

/// Shown in place of a block whose props do not decode.
#[derive(Template)]
#[template(path = "blocks/fallback.html")]
pub(crate) struct BlockFallback {
    pub message: &'static str,
}

/// Returns the URL if it is relative or uses a scheme that cannot run
/// script. Inline images are allowed as data URLs.
pub(crate) fn safe_url(url: &str) -> Option<&str> {
    let trimmed = url.trim();
    let lower = trimmed.to_ascii_lowercase();
    let allowed = ["http://", "https://", "mailto:", "tel:", "data:image/"]
        .iter()
        .any(|scheme| lower.starts_with(scheme));
    let relative = match lower.find(':') {
        None => true,
        // A colon after the first path, query, or fragment delimiter is not a scheme
        Some(colon) => lower[..colon].contains(['/', '?', '#']),
    };
    (allowed || relative).then_some(trimmed)
}

/// Returns the colour if it is a hex literal or a bare CSS colour keyword.
pub(crate) fn safe_color(color: &str) -> Option<&str> {
    let trimmed = color.trim();
    let ok = match trimmed.strip_prefix('#') {
        Some(hex) => matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_alphabetic()),
    };
    ok.then_some(trimmed)
}

/// Markdown to HTML. Raw HTML in the source is escaped and links with
/// unsafe schemes are neutralised.
pub(crate) fn markdown_to_html(source: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(source, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) if safe_url(&dest_url).is_none() => Event::Start(Tag::Link {
            link_type,
            dest_url: "#".into(),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) if safe_url(&dest_url).is_none() => Event::Start(Tag::Image {
            link_type,
            dest_url: "".into(),
            title,
            id,
        }),
        other => other,
    });

    let mut out = String::new();
    pulldown_cmark::html::push_html(&mut out, parser);
    out
}

fn form_block<'a>(props: &'a FormProps, site_slug: &str, block_id: Ulid) -> FormBlock<'a> {
    let fields = props
        .fields
        .iter()
        .map(|field| FieldView {
            name: &field.name,
            label: &field.label,
            input_type: field.kind.as_str(),
            textarea: field.kind == FieldKind::Textarea,
            required: field.required,
            placeholder: field.placeholder.as_deref().unwrap_or(""),
        })
        .collect();

    FormBlock {
        action: format!("/api/sites/{}/forms/{}", site_slug, block_id),
        title: props.title.as_deref(),
        fields,
        submit_label: &props.submit_label,
    }
}

/// Render a block's decoded content. `block_id` and `site_slug` are needed
/// for blocks that post back to the server.
pub fn render_content(
    content: &BlockContent,
    site_slug: &str,
    block_id: Ulid,
) -> askama::Result<String> {
    match content {
        BlockContent::Text(p) => TextBlock {
            html: markdown_to_html(&p.markdown),
        }
        .render(),
        BlockContent::Heading(p) => HeadingBlock {
            level: p.level,
            text: &p.text,
        }
        .render(),
        BlockContent::Image(p) => ImageBlock {
            src: safe_url(&p.src).unwrap_or(""),
            alt: &p.alt,
            caption: p.caption.as_deref(),
            href: p.href.as_deref().and_then(safe_url),
        }
        .render(),
        BlockContent::Video(p) => VideoBlock {
            src: safe_url(&p.src).unwrap_or(""),
            poster: p.poster.as_deref().and_then(safe_url),
            autoplay: p.autoplay,
            controls: p.controls,
        }
        .render(),
        BlockContent::Button(p) => ButtonBlock {
            label: &p.label,
            href: safe_url(&p.href).unwrap_or("#"),
            style: p.style.as_str(),
            new_tab: p.new_tab,
        }
        .render(),
        BlockContent::Spacer(p) => SpacerBlock { height: p.height }.render(),
        BlockContent::Divider(p) => DividerBlock {
            thickness: p.thickness,
            color: p.color.as_deref().and_then(safe_color),
        }
        .render(),
        BlockContent::Form(p) => form_block(p, site_slug, block_id).render(),
        BlockContent::Map(p) => {
            let zoom = p.zoom.to_string();
            let query = serde_urlencoded::to_string([
                ("q", p.query.as_str()),
                ("z", zoom.as_str()),
                ("output", "embed"),
            ])
            .unwrap_or_default();
            MapBlock {
                src: format!("https://maps.google.com/maps?{}", query),
                height: p.height,
            }
            .render()
        }
        BlockContent::Html(p) => HtmlBlock { html: &p.html }.render(),
        BlockContent::Slider(p) => SliderBlock {
            slides: p
                .slides
                .iter()
                .map(|s| SlideView {
                    src: safe_url(&s.src).unwrap_or(""),
                    alt: &s.alt,
                    caption: s.caption.as_deref(),
                })
                .collect(),
            autoplay_ms: p.autoplay_ms,
        }
        .render(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewright_core::{Block, BlockType};
    use serde_json::json;

    fn render(block_type: BlockType, props: serde_json::Value) -> String {
        let block = Block::new(block_type, props);
        let content = BlockContent::from_block(&block).unwrap();
        render_content(&content, "acme", block.block_id).unwrap()
    }

    #[test]
    fn markdown_escapes_raw_html_and_bad_links() {
        let html = markdown_to_html("**hi** <script>alert(1)</script> [x](javascript:alert(1))");
        assert!(html.contains("<strong>hi</strong>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("href=\"#\""));
    }

    #[test]
    fn url_and_colour_checks() {
        assert_eq!(safe_url("/about"), Some("/about"));
        assert_eq!(safe_url("https://example.com"), Some("https://example.com"));
        assert_eq!(safe_url("page?next=a:b"), Some("page?next=a:b"));
        assert_eq!(safe_url(" JavaScript:alert(1)"), None);
        assert_eq!(safe_color("#fff"), Some("#fff"));
        assert_eq!(safe_color("rebeccapurple"), Some("rebeccapurple"));
        assert_eq!(safe_color("red;background:url(x)"), None);
    }

    #[test]
    fn heading_escapes_text() {
        let html = render(BlockType::Heading, json!({ "text": "Fish & <Chips>", "level": 3 }));
        assert!(html.contains("<h3>Fish &amp; &lt;Chips&gt;</h3>"), "{}", html);
    }

    #[test]
    fn button_with_unsafe_href_points_nowhere() {
        let html = render(
            BlockType::Button,
            json!({ "label": "Go", "href": "javascript:void(0)", "new_tab": true }),
        );
        assert!(html.contains("href=\"#\""));
        assert!(html.contains("rel=\"noopener\""));
    }

    #[test]
    fn form_posts_back_to_its_block() {
        let block = Block::new(
            BlockType::Form,
            json!({ "fields": [{ "name": "msg", "label": "Message", "kind": "textarea", "required": true }] }),
        );
        let content = BlockContent::from_block(&block).unwrap();
        let html = render_content(&content, "acme", block.block_id).unwrap();
        assert!(html.contains(&format!("action=\"/api/sites/acme/forms/{}\"", block.block_id)));
        assert!(html.contains("<textarea"));
        assert!(html.contains("required"));
    }

    #[test]
    fn map_query_is_url_encoded() {
        let html = render(BlockType::Map, json!({ "query": "10 Downing St, London" }));
        assert!(html.contains("q=10+Downing+St%2C+London"), "{}", html);
    }

    #[test]
    fn html_block_is_passed_through() {
        let html = render(BlockType::Html, json!({ "html": "<marquee>hi</marquee>" }));
        assert!(html.contains("<marquee>hi</marquee>"));
    }
}
