// ABOUTME: Picks the breakpoint a request is rendered for.
// ABOUTME: An explicit ?bp= wins, then a viewport-width client hint, then desktop.

use axum::http::HeaderMap;
use pagewright_core::Breakpoint;
use serde::Deserialize;

/// Client-hint headers carrying the viewport width in CSS pixels.
const WIDTH_HEADERS: [&str; 2] = ["sec-ch-viewport-width", "viewport-width"];

#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    pub bp: Option<String>,
}

/// Breakpoint for a public request. Unparseable hints are ignored.
pub fn breakpoint_for(query: &ViewQuery, headers: &HeaderMap) -> Breakpoint {
    if let Some(bp) = query.bp.as_deref().and_then(|raw| raw.parse().ok()) {
        return bp;
    }
    WIDTH_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| value.trim().parse::<f64>().ok())
        .filter(|width| width.is_finite() && *width >= 0.0)
        .map(|width| Breakpoint::from_width(width as u32))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn query(bp: Option<&str>) -> ViewQuery {
        ViewQuery {
            bp: bp.map(str::to_string),
        }
    }

    #[test]
    fn explicit_query_wins_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert("viewport-width", HeaderValue::from_static("400"));
        assert_eq!(breakpoint_for(&query(Some("tablet")), &headers), Breakpoint::Tablet);
        assert_eq!(breakpoint_for(&query(None), &headers), Breakpoint::Mobile);
    }

    #[test]
    fn falls_back_to_desktop() {
        let mut headers = HeaderMap::new();
        headers.insert("sec-ch-viewport-width", HeaderValue::from_static("wide"));
        assert_eq!(breakpoint_for(&query(Some("huge")), &headers), Breakpoint::Desktop);
        assert_eq!(breakpoint_for(&query(None), &HeaderMap::new()), Breakpoint::Desktop);
    }

    #[test]
    fn fractional_widths_are_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert("sec-ch-viewport-width", HeaderValue::from_static("800.5"));
        assert_eq!(breakpoint_for(&query(None), &headers), Breakpoint::Tablet);
    }
}
