use super::{Outcome, ResponseSource, StrategyContext, is_fresh};
use crate::Error;
use crate::fetch::FetchRequest;
use crate::policy::Policy;

/// Serve a fresh entry without touching the network; otherwise fetch,
/// falling back to a stale entry when the network fails.
pub async fn cache_first(ctx: &StrategyContext, policy: &Policy, request: &FetchRequest) -> Result<Outcome, Error> {
    let cached = ctx.lookup(&policy.partition, request).await;

    if let Some(entry) = &cached
        && is_fresh(entry, policy)
    {
        tracing::debug!(url = %request.url, "cache-first hit");
        return Ok(Outcome::new(entry.response.clone(), ResponseSource::Cache));
    }

    match ctx.network.fetch(request).await {
        Ok(response) => {
            ctx.store(&policy.partition, request, &response).await;
            Ok(Outcome::new(response, ResponseSource::Network))
        }
        Err(e) => match cached {
            Some(entry) => {
                tracing::debug!(url = %request.url, error = %e, "network failed, serving stale entry");
                Ok(Outcome::new(entry.response, ResponseSource::StaleCache))
            }
            None => Err(e),
        },
    }
}
