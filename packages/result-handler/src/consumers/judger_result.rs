use std::sync::Arc;

use common::result::JudgerResult;
use mq::{BroccoliError, BrokerMessage, Mq};
use tracing::{error, info, warn};

use crate::services::ResultService;

/// Consume judger results from the result queue.
///
/// Results for different submissions are independent, so the handler runs
/// with the given concurrency; the store's conditional updates keep
/// concurrent results for the same submission consistent.
pub async fn consume_judger_results(
    service: Arc<ResultService>,
    mq: Arc<Mq>,
    queue_name: String,
    concurrency: usize,
) {
    info!(queue = %queue_name, concurrency, "Starting judger result consumer");

    let result = mq
        .process_messages(
            &queue_name,
            Some(concurrency),
            None,
            move |message: BrokerMessage<JudgerResult>| {
                let service = service.clone();
                async move {
                    let result = message.payload;
                    let submission_id = result.submission_id().to_string();

                    if let Err(e) = service.handle_judger_result(result).await {
                        if e.is_stale_fallout() {
                            // The submission this result refers to no longer
                            // exists; retrying cannot help.
                            warn!(
                                submission_id,
                                error = %e,
                                "Dropping judger result for an unknown submission"
                            );
                            return Ok(());
                        }
                        error!(
                            submission_id,
                            error = %e,
                            "Failed to process judger result"
                        );
                        return Err(BroccoliError::Job(e.to_string()));
                    }
                    Ok(())
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Judger result consumer stopped unexpectedly");
    }
}
