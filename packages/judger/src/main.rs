use anyhow::Context;
use common::languages::LanguageRegistry;
use common::storage::FilesystemObjectStore;
use judger::config::JudgerAppConfig;
use judger::executor::Executor;
use judger::sandbox::{IsolateSandbox, Sandbox};
use judger::scheduler::{Disposition, Scheduler, SlotPool};
use mq::{BroccoliError, BrokerMessage, MqConfig, QueueRouter, init_mq};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = JudgerAppConfig::load().context("Failed to load config")?;
    info!("Judger starting: {}", config.judger.id);

    let cores = match config.judger.slots {
        Some(slots) => slots,
        None => std::thread::available_parallelism()
            .context("Failed to detect CPU cores")?
            .get(),
    };
    info!("{cores} CPU cores detected");

    let storage = Arc::new(
        FilesystemObjectStore::new(PathBuf::from(&config.judger.storage_path))
            .await
            .context("Failed to initialize object store")?,
    );

    let sandbox: Arc<dyn Sandbox> = Arc::new(IsolateSandbox::new(&config.judger.isolate_bin));

    // Destroy every slot once before marking it available, so nothing from a
    // previous process survives into this one.
    let slots: Vec<u32> = (1..=cores as u32).collect();
    Scheduler::reset_slots(&sandbox, &slots).await;

    let pool = Arc::new(SlotPool::new(slots));

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
        slots = pool.capacity(),
        "MQ connected, start receiving tasks"
    );

    let router = Arc::new(QueueRouter::new(
        Arc::clone(&mq),
        config.mq.task_queue_name.clone(),
        config.mq.result_queue_name.clone(),
    ));
    let executor = Arc::new(Executor::new(
        Arc::clone(&sandbox),
        storage,
        LanguageRegistry::builtin(),
    ));
    let scheduler = Arc::new(Scheduler::new(pool, sandbox, executor, router));

    // Prefetch equal to the pool size is the sole concurrency throttle.
    let concurrency = scheduler.pool().capacity();
    let result = mq
        .process_messages(
            &config.mq.task_queue_name,
            Some(concurrency),
            None,
            move |message: BrokerMessage<serde_json::Value>| {
                let scheduler = Arc::clone(&scheduler);
                async move {
                    match scheduler.handle_delivery(message.payload).await {
                        // Drop was already logged by the scheduler; consuming
                        // the message here is what keeps a poison message from
                        // looping forever.
                        Disposition::Completed | Disposition::Drop => Ok(()),
                        Disposition::Requeue => Err(BroccoliError::Job(
                            "no sandbox slot available".to_string(),
                        )),
                    }
                }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Judger stopped unexpectedly");
    }

    Ok(())
}
