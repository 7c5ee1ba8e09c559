use std::sync::Arc;

use anyhow::Context;
use mq::{MqConfig, QueueRouter, init_mq};
use result_handler::config::ResultHandlerAppConfig;
use result_handler::consumers::consume_judger_results;
use result_handler::services::{ResultService, ScoreboardService, ScoringPolicy};
use result_handler::store::{
    MemoryProblemStore, MemoryRanklist, MemorySubmissionStore, MemoryTeamScoreStore,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = ResultHandlerAppConfig::load().context("Failed to load config")?;
    info!("Result handler starting");

    let mq = Arc::new(
        init_mq(MqConfig {
            url: config.mq.url.clone(),
            pool_size: config.mq.pool_size,
        })
        .await
        .context("Failed to initialize MQ")?,
    );

    info!(
        task_queue_name = %config.mq.task_queue_name,
        result_queue_name = %config.mq.result_queue_name,
        "MQ connected"
    );

    let router = Arc::new(QueueRouter::new(
        Arc::clone(&mq),
        config.mq.task_queue_name.clone(),
        config.mq.result_queue_name.clone(),
    ));

    let submissions = Arc::new(MemorySubmissionStore::new());
    let problems = Arc::new(MemoryProblemStore::new());
    let team_scores = Arc::new(MemoryTeamScoreStore::new());
    let ranklist = Arc::new(MemoryRanklist::new());

    let scoreboard = Arc::new(ScoreboardService::new(
        team_scores.clone(),
        team_scores,
        ranklist,
    ));
    let service = Arc::new(ResultService::new(
        submissions,
        problems,
        router,
        scoreboard,
        ScoringPolicy {
            partial_credit: config.scoring.partial_credit,
        },
    ));

    consume_judger_results(
        service,
        mq,
        config.mq.result_queue_name.clone(),
        config.result_handler.concurrency,
    )
    .await;

    Ok(())
}
