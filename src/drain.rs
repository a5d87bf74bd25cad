use std::{fs, io::Write};

use anyhow::{Context, Error, Result};
use tracing::{debug, info, warn};

use crate::{
    clients::{artifact_store::ArtifactWriter, rbmq::Broker},
    config::DrainConfig,
    matcher::RuleSet,
    models::{
        directive::DirectiveFile,
        disposition::{Disposition, RouteOutcome},
        message::Message,
    },
};

/// How dispositions are chosen for the whole run.
#[derive(Debug, Clone)]
pub enum DispositionPolicy {
    Forward { exchange: String, ack_source: bool },
    Directive(RuleSet),
    BlanketAck,
    Leave,
}

impl DispositionPolicy {
    /// Builds the policy for a drain run, loading the directive file if one
    /// is configured. A directive file turns blanket ack off.
    pub fn from_config(config: &DrainConfig) -> Result<Self, Error> {
        let rules = match &config.messages_to_ack {
            Some(path) => {
                let bytes = fs::read(path).context("Opening messages to ack file")?;
                let directive =
                    DirectiveFile::from_slice(&bytes).context("Decoding messages to ack file")?;
                info!(rules = directive.messages.len(), "Directive file loaded");
                Some(RuleSet::new(directive.messages))
            }
            None => None,
        };

        let policy = match (&config.new_exchange, rules) {
            (Some(exchange), rules) => DispositionPolicy::Forward {
                exchange: exchange.clone(),
                ack_source: config.ack && rules.is_none(),
            },
            (None, Some(rules)) => DispositionPolicy::Directive(rules),
            (None, None) if config.ack => DispositionPolicy::BlanketAck,
            (None, None) => DispositionPolicy::Leave,
        };

        Ok(policy)
    }

    pub fn decide(&mut self, message: &Message) -> Disposition {
        match self {
            DispositionPolicy::Forward {
                exchange,
                ack_source,
            } => Disposition::Forward {
                exchange: exchange.clone(),
                ack_source: *ack_source,
            },
            DispositionPolicy::Directive(rules) => {
                match rules.take_match(&message.routing_key, &message.body_text()) {
                    Some(_) => Disposition::AckLocal,
                    None => Disposition::Leave,
                }
            }
            DispositionPolicy::BlanketAck => Disposition::AckLocal,
            DispositionPolicy::Leave => Disposition::Leave,
        }
    }
}

/// Carries out dispositions against the source session and the forwarding
/// destination, which may be a second connection.
pub struct DispositionRouter<'a, B: Broker> {
    source: &'a B,
    publisher: &'a B,
}

impl<'a, B: Broker> DispositionRouter<'a, B> {
    pub fn new(source: &'a B, publisher: &'a B) -> Self {
        Self { source, publisher }
    }

    /// Ack failures are fatal. Forward publish failures are reported in the
    /// outcome and leave the source message on the queue.
    pub async fn route(
        &self,
        message: &Message,
        disposition: &Disposition,
    ) -> Result<RouteOutcome, Error> {
        match disposition {
            Disposition::AckLocal => {
                self.source
                    .ack(message.delivery_tag)
                    .await
                    .context("Ack")?;
                Ok(RouteOutcome::Acked)
            }
            Disposition::Forward {
                exchange,
                ack_source,
            } => {
                let published = self
                    .publisher
                    .publish(
                        exchange,
                        &message.routing_key,
                        message.properties.clone(),
                        &message.body,
                    )
                    .await;

                if let Err(e) = published {
                    warn!(
                        exchange = %exchange,
                        routing_key = %message.routing_key,
                        error = %e,
                        "Forward publish failed"
                    );
                    return Ok(RouteOutcome::ForwardFailed {
                        error: e.to_string(),
                    });
                }

                if *ack_source {
                    self.source
                        .ack(message.delivery_tag)
                        .await
                        .context("Ack")?;
                }

                Ok(RouteOutcome::Forwarded { acked: *ack_source })
            }
            Disposition::Leave => Ok(RouteOutcome::Left),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub fetched: u64,
    pub acked: u64,
    pub forwarded: u64,
    pub forward_failures: u64,
}

pub struct DrainLoop<'a, B: Broker> {
    source: &'a B,
    router: DispositionRouter<'a, B>,
    queue: String,
    max_messages: u64,
    policy: DispositionPolicy,
    writer: ArtifactWriter,
}

impl<'a, B: Broker> DrainLoop<'a, B> {
    pub fn new(
        config: &DrainConfig,
        policy: DispositionPolicy,
        source: &'a B,
        publisher: &'a B,
    ) -> Self {
        Self {
            source,
            router: DispositionRouter::new(source, publisher),
            queue: config.queue.clone(),
            max_messages: config.max_messages,
            policy,
            writer: ArtifactWriter::new(config.output_dir.clone(), config.json_content),
        }
    }

    pub fn policy(&self) -> &DispositionPolicy {
        &self.policy
    }

    /// Fetches up to `max_messages` messages in delivery order, routing and
    /// persisting each one. Progress lines go to `out`.
    pub async fn run<W: Write>(&mut self, out: &mut W) -> Result<DrainSummary, Error> {
        let mut summary = DrainSummary::default();

        info!(queue = %self.queue, "Pulling messages from queue");

        for counter in 0..self.max_messages {
            let Some(message) = self.source.get(&self.queue).await.context("Queue get")? else {
                info!("No more messages in queue");
                break;
            };
            summary.fetched += 1;

            let disposition = self.policy.decide(&message);
            debug!(
                counter,
                routing_key = %message.routing_key,
                disposition = %disposition,
                "Message fetched"
            );

            let outcome = self.router.route(&message, &disposition).await?;

            match &outcome {
                RouteOutcome::ForwardFailed { error } => {
                    summary.forward_failures += 1;
                    writeln!(out, "Publish failed for msg-{:04}: {}", counter, error)?;
                }
                RouteOutcome::Forwarded { .. } => summary.forwarded += 1,
                RouteOutcome::Acked | RouteOutcome::Left => {}
            }

            if outcome.acked() {
                summary.acked += 1;
                writeln!(out, "Acked msg-{:04}", counter)?;
            }

            let path = self
                .writer
                .save(&message, counter, outcome.acked())
                .context("Save message")?;
            writeln!(out, "{}", path.display())?;
        }

        info!(
            fetched = summary.fetched,
            acked = summary.acked,
            forwarded = summary.forwarded,
            forward_failures = summary.forward_failures,
            "Drain finished"
        );

        Ok(summary)
    }
}
