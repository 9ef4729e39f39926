//! Response types returned by the YouTube client.

use serde::{Deserialize, Serialize};

/// One video result from a search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchItem {
    pub id: String,
    pub title: String,
    pub channel: Option<String>,
    /// Display duration as shown by YouTube, e.g. `"3:33"`. Absent for live streams.
    pub duration: Option<String>,
    /// Largest thumbnail offered.
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchItem>,
}

/// Video metadata from the oEmbed endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub author: String,
    pub author_url: Option<String>,
    pub thumbnail: Option<String>,
}

/// Raw oEmbed document; only the fields we keep.
#[derive(Debug, Deserialize)]
pub(crate) struct OEmbed {
    pub title: String,
    pub author_name: String,
    #[serde(default)]
    pub author_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl VideoInfo {
    pub(crate) fn from_oembed(id: &str, doc: OEmbed) -> Self {
        Self {
            id: id.to_string(),
            title: doc.title,
            author: doc.author_name,
            author_url: doc.author_url,
            thumbnail: doc.thumbnail_url,
        }
    }
}

/// Whether a video can be played in an embedded player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedCheck {
    pub id: String,
    pub embeddable: bool,
    pub reason: Option<String>,
}

impl EmbedCheck {
    pub(crate) fn blocked(id: &str, reason: String) -> Self {
        Self { id: id.to_string(), embeddable: false, reason: Some(reason) }
    }
}
