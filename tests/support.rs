use std::{collections::VecDeque, sync::Mutex};

use anyhow::{Error, Result, anyhow};
use lapin::BasicProperties;
use rabbitmq_dump_queue::{clients::rbmq::Broker, models::message::Message};

#[derive(Debug, Clone)]
pub struct Published {
    pub exchange: String,
    pub routing_key: String,
    pub properties: BasicProperties,
    pub body: Vec<u8>,
}

/// In-memory broker: a single queue plus records of acks and publishes.
#[derive(Default)]
pub struct FakeBroker {
    queue: Mutex<VecDeque<Message>>,
    acked: Mutex<Vec<u64>>,
    published: Mutex<Vec<Published>>,
    fail_publish: bool,
}

impl FakeBroker {
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            queue: Mutex::new(messages.into()),
            ..Default::default()
        }
    }

    pub fn failing_publish() -> Self {
        Self {
            fail_publish: true,
            ..Default::default()
        }
    }

    pub fn depth(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn acked(&self) -> Vec<u64> {
        self.acked.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }
}

impl Broker for FakeBroker {
    async fn get(&self, _queue: &str) -> Result<Option<Message>, Error> {
        Ok(self.queue.lock().unwrap().pop_front())
    }

    async fn ack(&self, delivery_tag: u64) -> Result<(), Error> {
        self.acked.lock().unwrap().push(delivery_tag);
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: BasicProperties,
        body: &[u8],
    ) -> Result<(), Error> {
        if self.fail_publish {
            return Err(anyhow!("exchange {} not found", exchange));
        }

        self.published.lock().unwrap().push(Published {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            properties,
            body: body.to_vec(),
        });
        Ok(())
    }
}

pub fn message(delivery_tag: u64, routing_key: &str, body: &str) -> Message {
    Message {
        delivery_tag,
        exchange: "events".to_string(),
        routing_key: routing_key.to_string(),
        properties: BasicProperties::default(),
        body: body.as_bytes().to_vec(),
    }
}

/// Messages shaped like `message-N-body` on routing key `test`.
pub fn numbered_messages(count: u64) -> Vec<Message> {
    (0..count)
        .map(|i| {
            let mut msg = message(i + 1, "test", &format!("message-{}-body", i));
            msg.properties = BasicProperties::default()
                .with_content_type("text/plain".into())
                .with_priority(4)
                .with_message_id(format!("msgid-{}", i).into());
            msg
        })
        .collect()
}
