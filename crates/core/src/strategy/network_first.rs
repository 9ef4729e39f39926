use super::{Outcome, ResponseSource, StrategyContext, is_fresh};
use crate::Error;
use crate::fetch::FetchRequest;
use crate::policy::Policy;

/// Always try the network; on failure serve the cached entry only while it
/// is still within the policy's max-age.
pub async fn network_first(ctx: &StrategyContext, policy: &Policy, request: &FetchRequest) -> Result<Outcome, Error> {
    let err = match ctx.network.fetch(request).await {
        Ok(response) => {
            ctx.store(&policy.partition, request, &response).await;
            return Ok(Outcome::new(response, ResponseSource::Network));
        }
        Err(e) => e,
    };

    match ctx.lookup(&policy.partition, request).await {
        Some(entry) if is_fresh(&entry, policy) => {
            tracing::debug!(url = %request.url, error = %err, "network failed, serving cached entry");
            Ok(Outcome::new(entry.response, ResponseSource::Cache))
        }
        Some(_) => {
            tracing::debug!(url = %request.url, "network failed and cached entry expired");
            Err(err)
        }
        None => Err(err),
    }
}
