use std::future::Future;

use anyhow::{Context, Error, Result, anyhow};
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties,
    options::{BasicAckOptions, BasicGetOptions, BasicPublishOptions},
    uri::AMQPUri,
};
use tracing::{info, warn};

use crate::{
    clients::tls::{insecure_connector, tls_handshake},
    config::BrokerConfig,
    models::message::Message,
};

/// Fetch, acknowledge and publish primitives the drain and replay engines
/// drive. Calls are awaited one at a time.
#[allow(async_fn_in_trait)]
pub trait Broker {
    /// Fetches the next message without auto-ack. `None` when the queue is
    /// empty.
    async fn get(&self, queue: &str) -> Result<Option<Message>, Error>;

    async fn ack(&self, delivery_tag: u64) -> Result<(), Error>;

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: BasicProperties,
        body: &[u8],
    ) -> Result<(), Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    Plain,
    Verified,
    Insecure,
}

impl TlsMode {
    /// Insecure mode only applies to encrypted transports.
    pub fn for_uri(uri: &str, insecure_tls: bool) -> Self {
        if !uri.starts_with("amqps://") {
            TlsMode::Plain
        } else if insecure_tls {
            TlsMode::Insecure
        } else {
            TlsMode::Verified
        }
    }
}

pub struct RabbitMqClient {
    connection: Connection,
    pub channel: Channel,
}

impl RabbitMqClient {
    pub async fn connect(config: &BrokerConfig) -> Result<Self, Error> {
        Self::connect_uri(&config.uri, config.insecure_tls).await
    }

    pub async fn connect_uri(uri: &str, insecure_tls: bool) -> Result<Self, Error> {
        info!(uri = %redact_uri(uri), "Dialing");

        let connection = match TlsMode::for_uri(uri, insecure_tls) {
            TlsMode::Plain => Connection::connect(uri, ConnectionProperties::default()).await,
            TlsMode::Verified => {
                let _ = rustls::crypto::ring::default_provider().install_default();
                Connection::connect(uri, ConnectionProperties::default()).await
            }
            TlsMode::Insecure => {
                warn!("Skipping TLS certificate verification");
                let parsed = uri.parse::<AMQPUri>().map_err(|e| anyhow!(e)).context("Dial")?;
                let handshake = tls_handshake(insecure_connector()?);
                Connection::connector(parsed, handshake, ConnectionProperties::default()).await
            }
        }
        .context("Dial")?;

        info!("AMQP connection established");

        let channel = close_on_error(
            connection.create_channel().await.context("Channel"),
            || close_connection(&connection),
        )
        .await?;

        info!("AMQP channel opened");

        Ok(Self {
            connection,
            channel,
        })
    }

    /// Closes channel then connection. Errors are logged, not returned, so
    /// this can run on every exit path.
    pub async fn close(&self) {
        if let Err(e) = self.channel.close(200, "Bye".into()).await {
            warn!(error = %e, "Failed to close AMQP channel");
        } else {
            info!("AMQP channel closed");
        }

        close_connection(&self.connection).await;
    }
}

async fn close_connection(connection: &Connection) {
    if let Err(e) = connection.close(200, "Bye".into()).await {
        warn!(error = %e, "Failed to close AMQP connection");
    } else {
        info!("AMQP connection closed");
    }
}

/// Runs `cleanup` before handing back a failed `result`.
pub async fn close_on_error<T, F, Fut>(result: Result<T, Error>, cleanup: F) -> Result<T, Error>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    if result.is_err() {
        cleanup().await;
    }

    result
}

impl Broker for RabbitMqClient {
    async fn get(&self, queue: &str) -> Result<Option<Message>, Error> {
        let fetched = self
            .channel
            .basic_get(queue, BasicGetOptions::default())
            .await?;

        Ok(fetched.map(|message| {
            let delivery = message.delivery;
            Message {
                delivery_tag: delivery.delivery_tag,
                exchange: delivery.exchange.as_str().to_string(),
                routing_key: delivery.routing_key.as_str().to_string(),
                properties: delivery.properties,
                body: delivery.data,
            }
        }))
    }

    async fn ack(&self, delivery_tag: u64) -> Result<(), Error> {
        self.channel
            .basic_ack(delivery_tag, BasicAckOptions::default())
            .await?;

        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: BasicProperties,
        body: &[u8],
    ) -> Result<(), Error> {
        self.channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                body,
                properties,
            )
            .await?;

        Ok(())
    }
}

/// Hides the password part of an AMQP URI for logging.
pub fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };

    match rest.split_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{}://{}:***@{}", scheme, user, host)
        }
        None => uri.to_string(),
    }
}
