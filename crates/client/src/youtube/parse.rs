//! Scraping helpers for YouTube pages.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::error::YoutubeError;
use super::types::{EmbedCheck, SearchItem};

static INITIAL_DATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)(?:var\s+ytInitialData|window\["ytInitialData"\])\s*=\s*(\{.*?\});\s*</script>"#)
        .expect("invalid ytInitialData pattern")
});

static PLAYABILITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""playabilityStatus":\{"status":"([A-Z_]+)"(?:,"reason":"([^"]*)")?"#)
        .expect("invalid playability pattern")
});

static VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("invalid video id pattern"));

/// Statuses that mean the embedded player will refuse to play.
const BLOCKING_STATUSES: &[&str] = &["UNPLAYABLE", "ERROR", "LOGIN_REQUIRED"];

pub fn is_video_id(id: &str) -> bool {
    VIDEO_ID.is_match(id)
}

/// Pull the `ytInitialData` object out of a results page.
pub fn initial_data(html: &str) -> Result<Value, YoutubeError> {
    let raw = INITIAL_DATA
        .captures(html)
        .and_then(|c| c.get(1))
        .ok_or_else(|| YoutubeError::Parse("ytInitialData not found".into()))?;
    serde_json::from_str(raw.as_str()).map_err(|e| YoutubeError::Parse(format!("ytInitialData: {e}")))
}

/// Collect up to `limit` video results, in page order.
pub fn video_results(data: &Value, limit: usize) -> Vec<SearchItem> {
    let mut out = Vec::new();
    collect(data, limit, &mut out);
    out
}

fn collect(value: &Value, limit: usize, out: &mut Vec<SearchItem>) {
    if out.len() >= limit {
        return;
    }
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if out.len() >= limit {
                    return;
                }
                if key == "videoRenderer" {
                    if let Some(item) = video_renderer(child) {
                        out.push(item);
                    }
                } else {
                    collect(child, limit, out);
                }
            }
        }
        Value::Array(items) => {
            for child in items {
                collect(child, limit, out);
            }
        }
        _ => {}
    }
}

fn video_renderer(renderer: &Value) -> Option<SearchItem> {
    let id = renderer.get("videoId")?.as_str()?.to_string();
    let title = renderer.get("title").and_then(text)?;
    let channel = renderer
        .get("ownerText")
        .or_else(|| renderer.get("longBylineText"))
        .and_then(text);
    let duration = renderer.get("lengthText").and_then(text);
    let thumbnail = renderer
        .pointer("/thumbnail/thumbnails")
        .and_then(Value::as_array)
        .and_then(|thumbs| thumbs.last())
        .and_then(|t| t.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(SearchItem { id, title, channel, duration, thumbnail })
}

/// Text of a `{"simpleText": ..}` or `{"runs": [{"text": ..}]}` node.
fn text(node: &Value) -> Option<String> {
    if let Some(simple) = node.get("simpleText").and_then(Value::as_str) {
        return Some(simple.to_string());
    }
    let runs = node.get("runs")?.as_array()?;
    let joined: String = runs.iter().filter_map(|r| r.get("text").and_then(Value::as_str)).collect();
    (!joined.is_empty()).then_some(joined)
}

/// Decide whether an embed page will play.
pub fn embed_check(id: &str, html: &str) -> EmbedCheck {
    if let Some(caps) = PLAYABILITY.captures(html) {
        let status = &caps[1];
        if BLOCKING_STATUSES.contains(&status) {
            let reason = caps
                .get(2)
                .map(|r| r.as_str().to_string())
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| status.to_lowercase());
            return EmbedCheck::blocked(id, reason);
        }
    }

    for status in BLOCKING_STATUSES {
        if html.contains(&format!(r#""status":"{status}""#)) {
            return EmbedCheck::blocked(id, status.to_lowercase());
        }
    }

    if html.contains("Video unavailable") {
        return EmbedCheck::blocked(id, "Video unavailable".to_string());
    }

    EmbedCheck { id: id.to_string(), embeddable: true, reason: None }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"<html><script>var ytInitialData = {"contents":{"twoColumnSearchResultsRenderer":{"primaryContents":{"sectionListRenderer":{"contents":[{"itemSectionRenderer":{"contents":[
        {"adSlotRenderer":{}},
        {"videoRenderer":{"videoId":"dQw4w9WgXcQ","title":{"runs":[{"text":"Never Gonna Give You Up"}]},"ownerText":{"runs":[{"text":"Rick Astley"}]},"lengthText":{"simpleText":"3:33"},"thumbnail":{"thumbnails":[{"url":"https://i.ytimg.com/vi/dQw4w9WgXcQ/default.jpg"},{"url":"https://i.ytimg.com/vi/dQw4w9WgXcQ/hq720.jpg"}]}}},
        {"videoRenderer":{"videoId":"yPYZpwSpKmA","title":{"simpleText":"Together Forever"}}}
    ]}}]}}}}};</script></html>"#;

    #[test]
    fn test_video_id() {
        assert!(is_video_id("dQw4w9WgXcQ"));
        assert!(is_video_id("a-b_c123456"));
        assert!(!is_video_id("short"));
        assert!(!is_video_id("dQw4w9WgXcQx"));
        assert!(!is_video_id("dQw4w9WgX/Q"));
    }

    #[test]
    fn test_extract_results() {
        let data = initial_data(RESULTS_PAGE).unwrap();
        let items = video_results(&data, 10);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "dQw4w9WgXcQ");
        assert_eq!(items[0].title, "Never Gonna Give You Up");
        assert_eq!(items[0].channel.as_deref(), Some("Rick Astley"));
        assert_eq!(items[0].duration.as_deref(), Some("3:33"));
        assert_eq!(items[0].thumbnail.as_deref(), Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/hq720.jpg"));
        assert_eq!(items[1].title, "Together Forever");
        assert_eq!(items[1].channel, None);
    }

    #[test]
    fn test_limit() {
        let data = initial_data(RESULTS_PAGE).unwrap();
        assert_eq!(video_results(&data, 1).len(), 1);
    }

    #[test]
    fn test_missing_initial_data() {
        let result = initial_data("<html><body>consent</body></html>");
        assert!(matches!(result, Err(YoutubeError::Parse(_))));
    }

    #[test]
    fn test_window_assignment_form() {
        let html = r#"<script>window["ytInitialData"] = {"a":[{"videoRenderer":{"videoId":"dQw4w9WgXcQ","title":{"simpleText":"x"}}}]};</script>"#;
        let items = video_results(&initial_data(html).unwrap(), 10);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_embed_playable() {
        let html = r#"{"playabilityStatus":{"status":"OK","playableInEmbed":true}}"#;
        let check = embed_check("dQw4w9WgXcQ", html);
        assert!(check.embeddable);
        assert_eq!(check.reason, None);
    }

    #[test]
    fn test_embed_blocked_with_reason() {
        let html = r#"{"playabilityStatus":{"status":"UNPLAYABLE","reason":"Playback on other websites has been disabled"}}"#;
        let check = embed_check("dQw4w9WgXcQ", html);
        assert!(!check.embeddable);
        assert_eq!(check.reason.as_deref(), Some("Playback on other websites has been disabled"));
    }

    #[test]
    fn test_embed_login_required() {
        let check = embed_check("dQw4w9WgXcQ", r#"..."status":"LOGIN_REQUIRED"..."#);
        assert!(!check.embeddable);
        assert_eq!(check.reason.as_deref(), Some("login_required"));
    }

    #[test]
    fn test_embed_unavailable_text() {
        let check = embed_check("dQw4w9WgXcQ", "<div>Video unavailable</div>");
        assert!(!check.embeddable);
    }
}
