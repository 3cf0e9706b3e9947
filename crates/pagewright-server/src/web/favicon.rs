// ABOUTME: Generates a site's favicon as SVG from its settings.
// ABOUTME: The site name's initial on a rounded square in the theme colour, with a contrasting letter.

use askama::Template;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::app_state::SharedState;
use crate::error::ApiError;

const FALLBACK_COLOR: &str = "#3366ff";

#[derive(Template)]
#[template(path = "favicon.svg", escape = "html")]
struct FaviconTemplate<'a> {
    background: &'a str,
    foreground: &'static str,
    letter: char,
}

/// Dark text on light backgrounds, white otherwise. Expects `#rgb` or `#rrggbb`.
fn contrasting(hex: &str) -> &'static str {
    let digits = hex.trim_start_matches('#');
    let channel = |i: usize| -> f32 {
        let value = if digits.len() == 3 {
            u8::from_str_radix(&digits[i..i + 1], 16).map(|v| v * 17)
        } else {
            u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16)
        };
        f32::from(value.unwrap_or(0)) / 255.0
    };
    let luminance = 0.2126 * channel(0) + 0.7152 * channel(1) + 0.0722 * channel(2);
    if luminance > 0.6 { "#111111" } else { "#ffffff" }
}

fn initial(name: &str) -> char {
    name.chars()
        .find(|c| c.is_alphanumeric())
        .and_then(|c| c.to_uppercase().next())
        .unwrap_or('?')
}

pub(crate) fn render_favicon(name: &str, theme_color: Option<&str>) -> askama::Result<String> {
    let background = theme_color.unwrap_or(FALLBACK_COLOR);
    FaviconTemplate {
        background,
        foreground: contrasting(background),
        letter: initial(name),
    }
    .render()
}

async fn site_favicon(state: &SharedState, slug: &str) -> Result<String, ApiError> {
    let site = state.site(slug).await?;
    let settings = site.settings().await?;
    Ok(render_favicon(&settings.name, settings.valid_theme_color())?)
}

/// GET /sites/{site}/favicon.svg
pub async fn favicon(State(state): State<SharedState>, Path(site): Path<String>) -> Response {
    match site_favicon(&state, &site).await {
        Ok(svg) => (
            [
                (header::CONTENT_TYPE, "image/svg+xml"),
                (header::CACHE_CONTROL, "public, max-age=300"),
            ],
            svg,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_initial_and_theme_colour() {
        let svg = render_favicon("acme corp", Some("#112233")).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("fill=\"#112233\""));
        assert!(svg.contains(">A</text>"));
        assert!(svg.contains("fill=\"#ffffff\""));
    }

    #[test]
    fn light_backgrounds_get_dark_text() {
        assert_eq!(contrasting("#fff"), "#111111");
        assert_eq!(contrasting("#ffee88"), "#111111");
        assert_eq!(contrasting("#000080"), "#ffffff");
    }

    #[test]
    fn names_without_letters_fall_back() {
        assert_eq!(initial("  ***"), '?');
        assert_eq!(initial("élan"), 'É');
        let svg = render_favicon("", None).unwrap();
        assert!(svg.contains(FALLBACK_COLOR));
    }
}
