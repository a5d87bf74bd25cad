use std::io::Write;

use anyhow::{Context, Error, Result, anyhow};
use tracing::info;

use crate::{
    clients::{
        artifact_store::list_artifacts,
        rbmq::{RabbitMqClient, close_on_error},
    },
    config::{BrokerConfig, Config, DrainConfig, Mode, ReplayConfig},
    drain::{DispositionPolicy, DrainLoop, DrainSummary},
    replay::ReplayEngine,
};

pub async fn run<W: Write>(config: &Config, out: &mut W) -> Result<(), Error> {
    match &config.mode {
        Mode::Drain(drain) => run_drain(&config.broker, drain, out).await.map(|_| ()),
        Mode::Replay(replay) => run_replay(&config.broker, replay, out).await.map(|_| ()),
    }
}

/// Opens the source connection, and the forwarding one when `new_uri` is
/// set, and closes them once the drain loop returns.
pub async fn run_drain<W: Write>(
    broker: &BrokerConfig,
    config: &DrainConfig,
    out: &mut W,
) -> Result<DrainSummary, Error> {
    let policy = DispositionPolicy::from_config(config)?;

    if config.queue.is_empty() {
        return Err(anyhow!("Must supply queue name"));
    }

    let source = RabbitMqClient::connect(broker).await?;

    let forward = match &config.new_uri {
        Some(uri) => Some(
            close_on_error(
                RabbitMqClient::connect_uri(uri, broker.insecure_tls)
                    .await
                    .context("New AMQP URI"),
                || source.close(),
            )
            .await?,
        ),
        None => None,
    };

    let result = {
        let publisher = forward.as_ref().unwrap_or(&source);
        let mut drain = DrainLoop::new(config, policy, &source, publisher);
        drain.run(out).await
    };

    if let Some(forward) = forward {
        forward.close().await;
        info!("New AMQP connection closed");
    }
    source.close().await;

    result
}

pub async fn run_replay<W: Write>(
    broker: &BrokerConfig,
    config: &ReplayConfig,
    out: &mut W,
) -> Result<usize, Error> {
    let files = list_artifacts(&config.source_dir).context("Reading messages directory")?;
    info!(files = files.len(), dir = %config.source_dir.display(), "Messages to post");

    let client = RabbitMqClient::connect(broker).await?;

    let result = ReplayEngine::new(&client, config.new_exchange.clone(), config.json_content)
        .run(&files, out)
        .await;

    client.close().await;

    result
}
