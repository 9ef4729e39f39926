//! Request router: the entry point for every intercepted request.
//!
//! Only GET requests are handled; other methods and browser-extension URLs
//! pass through untouched. Handled requests always end in a response: when
//! the strategy fails, a per-class offline fallback is served instead.

use std::sync::Arc;

use crate::fetch::{FetchRequest, FetchResponse};
use crate::policy::Policy;
use crate::strategy::{self, ResponseSource, StrategyContext};
use crate::worker::WorkerConfig;

const PASSTHROUGH_SCHEMES: &[&str] = &["chrome-extension", "moz-extension"];

/// Grey tile with a music note, served for images that cannot be fetched.
pub const OFFLINE_IMAGE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="200" viewBox="0 0 200 200"><rect width="200" height="200" fill="#282828"/><path d="M120 50v70.5a20 20 0 1 1-10-17.3V70l-40 10v50.5a20 20 0 1 1-10-17.3V65z" fill="#535353"/></svg>"##;

/// What to do with an intercepted request.
#[derive(Debug)]
pub enum Disposition {
    /// Not handled: forward to the network untouched.
    Passthrough,
    Respond { response: FetchResponse, source: ResponseSource },
}

/// Resolves a policy for each request and runs its executor.
#[derive(Clone)]
pub struct FetchRouter {
    config: Arc<WorkerConfig>,
    ctx: StrategyContext,
}

impl FetchRouter {
    pub fn new(config: Arc<WorkerConfig>, ctx: StrategyContext) -> Self {
        Self { config, ctx }
    }

    /// Whether the router handles this request at all.
    pub fn intercepts(request: &FetchRequest) -> bool {
        request.is_get() && !PASSTHROUGH_SCHEMES.contains(&request.url.scheme())
    }

    pub async fn handle(&self, request: &FetchRequest) -> Disposition {
        if !Self::intercepts(request) {
            tracing::debug!(method = %request.method, url = %request.url, "passthrough");
            return Disposition::Passthrough;
        }

        let policy = self.config.policies.resolve(request.url.as_str());
        match strategy::execute(&self.ctx, policy, request).await {
            Ok(outcome) => {
                // Dropping the handle detaches any background refresh.
                drop(outcome.revalidation);
                Disposition::Respond { response: outcome.response, source: outcome.source }
            }
            Err(e) => {
                tracing::warn!(url = %request.url, strategy = %policy.strategy, error = %e, "serving offline fallback");
                let response = self.offline_fallback(policy, request).await;
                Disposition::Respond { response, source: ResponseSource::OfflineFallback }
            }
        }
    }

    async fn offline_fallback(&self, policy: &Policy, request: &FetchRequest) -> FetchResponse {
        if policy.class.is_image() {
            return FetchResponse::new(200, OFFLINE_IMAGE_SVG)
                .with_header("Content-Type", "image/svg+xml")
                .with_header("Cache-Control", "no-store");
        }

        if request.is_navigation() {
            let shell = FetchRequest::get(self.config.app_shell.clone());
            match self.ctx.db.match_entry(&self.config.policies.primary().name, &shell).await {
                Ok(Some(entry)) => return entry.response,
                Ok(None) => tracing::debug!(shell = %self.config.app_shell, "app shell not cached"),
                Err(e) => tracing::warn!(error = %e, "app shell lookup failed"),
            }
        }

        service_unavailable()
    }
}

fn service_unavailable() -> FetchResponse {
    FetchResponse::new(503, "Offline: resource unavailable")
        .with_header("Content-Type", "text/plain; charset=utf-8")
        .with_header("Cache-Control", "no-store")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheDb;
    use crate::strategy::testing::{ScriptedNetwork, get};
    use bytes::Bytes;
    use url::Url;

    async fn router(network: ScriptedNetwork) -> (FetchRouter, CacheDb, Arc<WorkerConfig>) {
        let origin = Url::parse("http://localhost:5173").unwrap();
        let config = Arc::new(
            WorkerConfig::new("tunecache", "v1", &origin, &["/index.html".into()], "/index.html").unwrap(),
        );
        let db = CacheDb::open_in_memory().await.unwrap();
        let ctx = StrategyContext::new(db.clone(), Arc::new(network));
        (FetchRouter::new(config.clone(), ctx), db, config)
    }

    fn respond(disposition: Disposition) -> (FetchResponse, ResponseSource) {
        match disposition {
            Disposition::Respond { response, source } => (response, source),
            Disposition::Passthrough => panic!("expected a response"),
        }
    }

    #[tokio::test]
    async fn test_non_get_passes_through() {
        let (router, _db, _) = router(ScriptedNetwork::new()).await;
        let req = FetchRequest::new("POST", Url::parse("http://localhost:5173/api/scrobble").unwrap());

        assert!(matches!(router.handle(&req).await, Disposition::Passthrough));
    }

    #[tokio::test]
    async fn test_extension_scheme_passes_through() {
        let (router, _db, _) = router(ScriptedNetwork::new()).await;
        let req = get("chrome-extension://abcdef/content.js");

        assert!(matches!(router.handle(&req).await, Disposition::Passthrough));
    }

    #[tokio::test]
    async fn test_served_from_network() {
        let url = "http://localhost:5173/assets/app.js";
        let (router, db, _) = router(ScriptedNetwork::new().respond(url, FetchResponse::new(200, "js"))).await;

        let (response, source) = respond(router.handle(&get(url)).await);

        assert_eq!(source, ResponseSource::Network);
        assert_eq!(response.body, Bytes::from("js"));
        assert_eq!(db.count_entries("tunecache-runtime-v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_partial_content_is_never_replayed() {
        let url = "http://localhost:5173/music/track.mp3";
        let partial = FetchResponse::new(206, "first range").with_header("Content-Range", "bytes 0-999/50000");
        let network = Arc::new(ScriptedNetwork::new().respond(url, partial));
        let db = CacheDb::open_in_memory().await.unwrap();
        let origin = Url::parse("http://localhost:5173").unwrap();
        let config = Arc::new(
            WorkerConfig::new("tunecache", "v1", &origin, &["/index.html".into()], "/index.html").unwrap(),
        );
        let router = FetchRouter::new(config, StrategyContext::new(db.clone(), network.clone()));

        let first = get(url).with_header("Range", "bytes=0-999");
        let (response, source) = respond(router.handle(&first).await);
        assert_eq!(response.status, 206);
        assert_eq!(source, ResponseSource::Network);

        let stored: u64 = db.list_partitions().await.unwrap().iter().map(|p| p.entries).sum();
        assert_eq!(stored, 0);

        let second = get(url).with_header("Range", "bytes=20000-");
        let (_, source) = respond(router.handle(&second).await);
        assert_eq!(source, ResponseSource::Network);
        assert_eq!(network.calls(), 2);
    }

    #[tokio::test]
    async fn test_offline_image_placeholder() {
        let (router, _db, _) = router(ScriptedNetwork::new()).await;

        let (response, source) = respond(router.handle(&get("https://example.com/covers/a.jpg")).await);

        assert_eq!(source, ResponseSource::OfflineFallback);
        assert_eq!(response.content_type(), Some("image/svg+xml"));
        assert!(response.body.starts_with(b"<svg"));
    }

    #[tokio::test]
    async fn test_offline_cdn_artwork_placeholder() {
        let (router, _db, _) = router(ScriptedNetwork::new()).await;

        let (response, _) = respond(router.handle(&get("https://i.scdn.co/image/ab67616d")).await);

        assert_eq!(response.content_type(), Some("image/svg+xml"));
    }

    #[tokio::test]
    async fn test_offline_navigation_serves_app_shell() {
        let (router, db, config) = router(ScriptedNetwork::new()).await;
        let shell = FetchRequest::get(config.app_shell.clone());
        db.put_entry(
            config.policies.primary(),
            &shell,
            &FetchResponse::new(200, "<html>shell</html>").with_header("Content-Type", "text/html"),
        )
        .await
        .unwrap();

        let req = get("http://localhost:5173/library/albums").navigation();
        let (response, source) = respond(router.handle(&req).await);

        assert_eq!(source, ResponseSource::OfflineFallback);
        assert_eq!(response.status, 200);
        assert_eq!(response.body, Bytes::from("<html>shell</html>"));
    }

    #[tokio::test]
    async fn test_offline_navigation_without_shell_is_503() {
        let (router, _db, _) = router(ScriptedNetwork::new()).await;

        let req = get("http://localhost:5173/library").with_header("Accept", "text/html");
        let (response, _) = respond(router.handle(&req).await);

        assert_eq!(response.status, 503);
    }

    #[tokio::test]
    async fn test_offline_other_is_503() {
        let (router, _db, _) = router(ScriptedNetwork::new()).await;

        let (response, source) = respond(router.handle(&get("http://localhost:5173/api/tracks")).await);

        assert_eq!(source, ResponseSource::OfflineFallback);
        assert_eq!(response.status, 503);
    }
}
