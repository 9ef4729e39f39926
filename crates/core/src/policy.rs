//! Caching policies and the strategy selector.
//!
//! ### Classification (first match wins)
//!
//! | Class | Match | Strategy | Max-age | Partition |
//! |---|---|---|---|---|
//! | Font | font-hosting host | cache-first | 365 days | `fonts` |
//! | Spotify | media CDN host | cache-first | 7 days | `images` |
//! | Image | image file extension | cache-first | 30 days | `images` |
//! | Api | path contains `/api/` | network-first | 5 minutes | `dynamic` |
//! | Static | anything else | stale-while-revalidate | 1 day | `runtime` |
//!
//! Partition names are `{prefix}-{kind}-{version}`. The table is built once
//! from configuration and never mutated.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

const DAY: u64 = 24 * 60 * 60;

const FONT_HOSTS: &[&str] = &["fonts.googleapis.com", "fonts.gstatic.com", "use.typekit.net"];

const MEDIA_CDN_HOSTS: &[&str] = &["scdn.co", "spotifycdn.com", "i.ytimg.com", "ggpht.com"];

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".avif", ".svg", ".ico", ".bmp"];

const API_MARKER: &str = "/api/";

/// Fetch/cache ordering applied to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
    NetworkOnly,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirst => "network-first",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
            Strategy::NetworkOnly => "network-only",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource class a URL is sorted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceClass {
    Font,
    /// Media CDN artwork (album covers, video thumbnails).
    Spotify,
    Image,
    Api,
    Static,
}

impl ResourceClass {
    pub const ALL: [ResourceClass; 5] =
        [ResourceClass::Font, ResourceClass::Spotify, ResourceClass::Image, ResourceClass::Api, ResourceClass::Static];

    fn index(self) -> usize {
        match self {
            ResourceClass::Font => 0,
            ResourceClass::Spotify => 1,
            ResourceClass::Image => 2,
            ResourceClass::Api => 3,
            ResourceClass::Static => 4,
        }
    }

    /// Classes whose offline fallback is the placeholder image.
    pub fn is_image(self) -> bool {
        matches!(self, ResourceClass::Spotify | ResourceClass::Image)
    }
}

/// Storage region kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    /// Primary partition, filled at install time.
    Static,
    Runtime,
    Fonts,
    Images,
    Dynamic,
}

impl PartitionKind {
    pub const ALL: [PartitionKind; 5] = [
        PartitionKind::Static,
        PartitionKind::Runtime,
        PartitionKind::Fonts,
        PartitionKind::Images,
        PartitionKind::Dynamic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionKind::Static => "static",
            PartitionKind::Runtime => "runtime",
            PartitionKind::Fonts => "fonts",
            PartitionKind::Images => "images",
            PartitionKind::Dynamic => "dynamic",
        }
    }
}

/// A named partition belonging to one cache version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition {
    pub kind: PartitionKind,
    pub name: String,
    pub version: String,
}

impl Partition {
    pub fn new(prefix: &str, kind: PartitionKind, version: &str) -> Self {
        Self { kind, name: format!("{prefix}-{}-{version}", kind.as_str()), version: version.to_string() }
    }
}

/// Strategy, freshness window and partition for one resource class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub class: ResourceClass,
    pub strategy: Strategy,
    pub max_age: Duration,
    pub partition: Partition,
}

/// Sort a URL into its resource class.
///
/// Pure and total: unparseable input is matched on its raw (lower-cased)
/// text and falls through to [`ResourceClass::Static`].
pub fn classify(url: &str) -> ResourceClass {
    let (host, path) = match Url::parse(url) {
        Ok(parsed) => (
            parsed.host_str().unwrap_or_default().to_ascii_lowercase(),
            parsed.path().to_ascii_lowercase(),
        ),
        Err(_) => {
            let raw = url.split(['?', '#']).next().unwrap_or_default();
            (String::new(), raw.to_ascii_lowercase())
        }
    };

    if FONT_HOSTS.iter().any(|h| host.contains(h)) {
        ResourceClass::Font
    } else if MEDIA_CDN_HOSTS.iter().any(|h| host.contains(h)) {
        ResourceClass::Spotify
    } else if IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        ResourceClass::Image
    } else if path.contains(API_MARKER) {
        ResourceClass::Api
    } else {
        ResourceClass::Static
    }
}

/// Immutable mapping from resource class to policy for one cache version.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    version: String,
    primary: Partition,
    policies: [Policy; 5],
}

impl PolicyTable {
    pub fn new(prefix: &str, version: &str) -> Self {
        let partition = |kind| Partition::new(prefix, kind, version);
        let policy = |class, strategy, max_age_secs, kind| Policy {
            class,
            strategy,
            max_age: Duration::from_secs(max_age_secs),
            partition: partition(kind),
        };

        Self {
            version: version.to_string(),
            primary: partition(PartitionKind::Static),
            policies: [
                policy(ResourceClass::Font, Strategy::CacheFirst, 365 * DAY, PartitionKind::Fonts),
                policy(ResourceClass::Spotify, Strategy::CacheFirst, 7 * DAY, PartitionKind::Images),
                policy(ResourceClass::Image, Strategy::CacheFirst, 30 * DAY, PartitionKind::Images),
                policy(ResourceClass::Api, Strategy::NetworkFirst, 5 * 60, PartitionKind::Dynamic),
                policy(ResourceClass::Static, Strategy::StaleWhileRevalidate, DAY, PartitionKind::Runtime),
            ],
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Partition filled at install time; also holds the app shell.
    pub fn primary(&self) -> &Partition {
        &self.primary
    }

    pub fn policy(&self, class: ResourceClass) -> &Policy {
        &self.policies[class.index()]
    }

    /// Classify `url` and return its policy.
    pub fn resolve(&self, url: &str) -> &Policy {
        self.policy(classify(url))
    }

    /// Every partition this version owns, primary first, without duplicates.
    pub fn partitions(&self) -> Vec<&Partition> {
        let mut out = vec![&self.primary];
        for policy in &self.policies {
            if !out.contains(&&policy.partition) {
                out.push(&policy.partition);
            }
        }
        out
    }

    /// Partition names that survive activation.
    pub fn allow_list(&self) -> Vec<String> {
        self.partitions().into_iter().map(|p| p.name.clone()).collect()
    }
}
