use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Error, Result};
use lapin::{BasicProperties, types::ShortString};
use serde_json::Value as JsonValue;
use tracing::info;

use crate::{
    clients::{artifact_store::read_artifact, rbmq::Broker},
    models::{
        headers::json_to_table,
        message::{Artifact, MessageProperties},
    },
    utils::parse_timestamp,
};

/// A publish reconstructed from an artifact.
#[derive(Debug, Clone)]
pub struct Republish {
    pub exchange: String,
    pub routing_key: String,
    pub properties: BasicProperties,
    pub body: Vec<u8>,
}

impl Republish {
    /// The override exchange wins over the one recorded in the artifact.
    pub fn from_artifact(
        artifact: Artifact,
        exchange_override: Option<&str>,
        json_content: bool,
    ) -> Result<Self, Error> {
        let props = &artifact.properties;

        let exchange = exchange_override
            .map(str::to_string)
            .or_else(|| props.exchange.clone())
            .unwrap_or_default();
        let routing_key = props.routing_key.clone().unwrap_or_default();

        let mut properties = broker_properties(props)?;
        if let Some(headers) = &artifact.headers {
            properties = properties.with_headers(json_to_table(headers));
        }

        Ok(Self {
            exchange,
            routing_key,
            properties,
            body: content_body(&artifact.content, json_content)?,
        })
    }
}

fn broker_properties(props: &MessageProperties) -> Result<BasicProperties, Error> {
    let mut properties = BasicProperties::default();

    if let Some(v) = &props.app_id {
        properties = properties.with_app_id(short(v));
    }
    if let Some(v) = &props.content_encoding {
        properties = properties.with_content_encoding(short(v));
    }
    if let Some(v) = &props.content_type {
        properties = properties.with_content_type(short(v));
    }
    if let Some(v) = &props.correlation_id {
        properties = properties.with_correlation_id(short(v));
    }
    if let Some(v) = props.delivery_mode {
        properties = properties.with_delivery_mode(v);
    }
    if let Some(v) = &props.expiration {
        properties = properties.with_expiration(short(v));
    }
    if let Some(v) = &props.message_id {
        properties = properties.with_message_id(short(v));
    }
    if let Some(v) = props.priority {
        properties = properties.with_priority(v);
    }
    if let Some(v) = &props.reply_to {
        properties = properties.with_reply_to(short(v));
    }
    if let Some(v) = &props.timestamp {
        properties = properties.with_timestamp(parse_timestamp(v).context("Time Parse")?);
    }
    if let Some(v) = &props.kind {
        properties = properties.with_type(short(v));
    }
    if let Some(v) = &props.user_id {
        properties = properties.with_user_id(short(v));
    }

    Ok(properties)
}

fn short(value: &str) -> ShortString {
    ShortString::from(value.to_string())
}

// Without json_content, string content is raw text and goes back out
// verbatim. Everything else is sent as its JSON encoding.
fn content_body(content: &JsonValue, json_content: bool) -> Result<Vec<u8>, Error> {
    match content {
        JsonValue::String(text) if !json_content => Ok(text.clone().into_bytes()),
        other => serde_json::to_vec(other).context("Marshal message body"),
    }
}

pub struct ReplayEngine<'a, B: Broker> {
    broker: &'a B,
    exchange_override: Option<String>,
    json_content: bool,
}

impl<'a, B: Broker> ReplayEngine<'a, B> {
    pub fn new(broker: &'a B, exchange_override: Option<String>, json_content: bool) -> Self {
        Self {
            broker,
            exchange_override,
            json_content,
        }
    }

    /// Publishes every file in order. The first failure aborts the run.
    pub async fn run<W: Write>(&self, files: &[PathBuf], out: &mut W) -> Result<usize, Error> {
        for path in files {
            self.replay_file(path, out).await?;
        }

        info!(published = files.len(), "Replay finished");

        Ok(files.len())
    }

    async fn replay_file<W: Write>(&self, path: &Path, out: &mut W) -> Result<(), Error> {
        let artifact = read_artifact(path)?;
        let publish = Republish::from_artifact(
            artifact,
            self.exchange_override.as_deref(),
            self.json_content,
        )?;

        writeln!(out, "Publishing Message")?;

        self.broker
            .publish(
                &publish.exchange,
                &publish.routing_key,
                publish.properties,
                &publish.body,
            )
            .await
            .with_context(|| format!("Publish {}", path.display()))?;

        writeln!(out, "Message Published:{}", path.display())?;

        Ok(())
    }
}
