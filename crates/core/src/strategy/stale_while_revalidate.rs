use tokio::sync::oneshot;

use super::{Outcome, ResponseSource, Revalidation, StrategyContext, is_fresh};
use crate::Error;
use crate::fetch::{FetchRequest, FetchResponse};
use crate::policy::Policy;

/// Start a network refresh unconditionally and serve a fresh entry without
/// waiting for it. Without a fresh entry the caller gets the network result.
///
/// The refresh runs as a detached task. Its result reaches the caller only
/// on the no-fresh-entry path; otherwise a success lands in the partition
/// for the next request and a failure is logged.
pub async fn stale_while_revalidate(
    ctx: &StrategyContext, policy: &Policy, request: &FetchRequest,
) -> Result<Outcome, Error> {
    let (tx, rx) = oneshot::channel::<Result<FetchResponse, Error>>();

    let task_ctx = ctx.clone();
    let partition = policy.partition.clone();
    let task_request = request.clone();
    let handle = tokio::spawn(async move {
        let result = task_ctx.network.fetch(&task_request).await;
        match &result {
            Ok(response) => task_ctx.store(&partition, &task_request, response).await,
            Err(e) => tracing::warn!(url = %task_request.url, error = %e, "background revalidation failed"),
        }
        // The receiver is gone when the caller was served from cache.
        let _ = tx.send(result);
    });
    let revalidation = Revalidation(handle);

    if let Some(entry) = ctx.lookup(&policy.partition, request).await
        && is_fresh(&entry, policy)
    {
        tracing::debug!(url = %request.url, "serving cached entry, revalidating in background");
        return Ok(Outcome {
            response: entry.response,
            source: ResponseSource::Cache,
            revalidation: Some(revalidation),
        });
    }

    let response = rx
        .await
        .map_err(|_| Error::Network(format!("revalidation task for {} ended without a result", request.url)))??;
    Ok(Outcome { response, source: ResponseSource::Network, revalidation: None })
}
