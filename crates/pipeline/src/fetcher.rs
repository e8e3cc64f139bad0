//! Artifact download, verification and persistence, plus temp cleanup.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine_api::ConversionEngine;
use crate::error::PipelineError;
use crate::retry::{RetryError, RetryPolicy};
use crate::store::{OverwritePolicy, PermanentStore, StoreError, TempStore};
use crate::types::Artifact;

const FALLBACK_CONTENT_TYPE: &str = "audio/mpeg";

/// Downloads a finished job's result, verifies it and persists it.
pub struct ArtifactFetcher<'a> {
    engine: &'a dyn ConversionEngine,
    permanent: &'a dyn PermanentStore,
    retry: &'a RetryPolicy,
    cancel: CancellationToken,
}

impl<'a> ArtifactFetcher<'a> {
    pub fn new(
        engine: &'a dyn ConversionEngine,
        permanent: &'a dyn PermanentStore,
        retry: &'a RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            engine,
            permanent,
            retry,
            cancel,
        }
    }

    /// Fetches the result from `result_url` and stores it under `target_key`.
    ///
    /// The download happens once; the persist step (upsert write plus a
    /// read-back size comparison) runs under the retry policy. A failed
    /// verification after the budget is exhausted is terminal and never
    /// reported as success.
    pub async fn fetch_and_persist(
        &self,
        result_url: &str,
        target_key: &str,
    ) -> Result<Artifact, PipelineError> {
        let fetched = self.engine.fetch_result(result_url).await?;

        if fetched.data.is_empty() {
            return Err(PipelineError::Verification(
                "downloaded artifact is empty".into(),
            ));
        }
        if let Some(ct) = &fetched.content_type
            && !ct.starts_with("audio/")
        {
            return Err(PipelineError::Verification(format!(
                "unexpected artifact content type: {ct}"
            )));
        }

        let content_type = fetched
            .content_type
            .clone()
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());
        let size = fetched.data.len() as u64;
        debug!(key = %target_key, size, "artifact downloaded, persisting");

        let outcome = self
            .retry
            .run(&self.cancel, || {
                let data = fetched.data.as_slice();
                let content_type = content_type.as_str();
                async move {
                    self.permanent
                        .put(target_key, data, content_type, OverwritePolicy::Upsert)
                        .await?;

                    // Read back and compare sizes to catch silent write
                    // truncation.
                    let stored = self.permanent.get(target_key).await?;
                    if stored.len() as u64 != size {
                        return Err(StoreError::Write(format!(
                            "size mismatch after write: expected {size}, found {}",
                            stored.len()
                        )));
                    }
                    Ok(())
                }
            })
            .await;

        match outcome {
            Ok(()) => {
                info!(key = %target_key, size, "artifact persisted and verified");
                Ok(Artifact {
                    path: target_key.to_string(),
                    size,
                    content_type,
                })
            }
            Err(RetryError::Cancelled) => Err(PipelineError::Cancelled),
            Err(RetryError::Exhausted { attempts, error }) => {
                Err(PipelineError::Verification(format!(
                    "artifact persist failed after {attempts} attempts: {error}"
                )))
            }
        }
    }
}

/// Removes every temporary chunk object written for a session.
///
/// Best-effort: the conversion already succeeded, or the pipeline is
/// already failing for another reason, so failures are logged and never
/// escalated.
pub async fn cleanup_temp_chunks(temp: &dyn TempStore, session_key: &str, keys: &[String]) {
    if keys.is_empty() {
        return;
    }
    match temp.delete(keys).await {
        Ok(()) => {
            debug!(session = %session_key, count = keys.len(), "temporary chunks removed");
        }
        Err(e) => {
            warn!(session = %session_key, error = %e, "temporary chunk cleanup failed");
        }
    }
}
