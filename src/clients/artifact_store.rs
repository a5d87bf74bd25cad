use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Error, Result};
use lapin::types::ShortString;
use tracing::{debug, warn};

use crate::{
    clients::hidden::is_hidden,
    models::{
        headers::table_to_json,
        message::{Artifact, Message, MessageProperties},
    },
    utils::{artifact_path, format_timestamp},
};

/// Writes numbered artifact files for one drain run.
pub struct ArtifactWriter {
    output_dir: PathBuf,
    json_content: bool,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>, json_content: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            json_content,
        }
    }

    /// Serializes the message to `msg-NNNN.json` and returns the path.
    pub fn save(&self, message: &Message, counter: u64, acked: bool) -> Result<PathBuf, Error> {
        let artifact = build_artifact(message, self.json_content, acked);
        let data = serde_json::to_vec_pretty(&artifact)?;

        let path = artifact_path(&self.output_dir, counter);
        fs::write(&path, data).with_context(|| format!("writing {}", path.display()))?;

        debug!(path = %path.display(), acked, "Artifact written");

        Ok(path)
    }
}

pub fn build_artifact(message: &Message, json_content: bool, acked: bool) -> Artifact {
    let content = if json_content {
        match serde_json::from_slice(&message.body) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    delivery_tag = message.delivery_tag,
                    error = %e,
                    "Body is not valid JSON, storing raw text"
                );
                serde_json::Value::String(message.body_text())
            }
        }
    } else {
        serde_json::Value::String(message.body_text())
    };

    Artifact {
        acked,
        content,
        headers: message.properties.headers().as_ref().map(table_to_json),
        properties: properties_of(message),
    }
}

pub fn properties_of(message: &Message) -> MessageProperties {
    let props = &message.properties;

    MessageProperties {
        app_id: text(props.app_id()),
        content_encoding: text(props.content_encoding()),
        content_type: text(props.content_type()),
        correlation_id: text(props.correlation_id()),
        delivery_mode: props.delivery_mode().filter(|mode| *mode != 0),
        exchange: non_empty(&message.exchange),
        expiration: text(props.expiration()),
        message_id: text(props.message_id()),
        priority: props.priority().filter(|priority| *priority != 0),
        reply_to: text(props.reply_to()),
        routing_key: non_empty(&message.routing_key),
        timestamp: props
            .timestamp()
            .filter(|seconds| *seconds != 0)
            .and_then(format_timestamp),
        kind: text(props.kind()),
        user_id: text(props.user_id()),
    }
}

fn text(value: &Option<ShortString>) -> Option<String> {
    value.as_ref().and_then(|s| non_empty(s.as_str()))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Lists replayable artifact files: regular, non-hidden, `.json`, sorted by
/// file name.
pub fn list_artifacts(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if !fs::metadata(&path)?.is_file() || is_hidden(&path)? {
            continue;
        }

        if entry.file_name().to_string_lossy().ends_with(".json") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

pub fn read_artifact(path: &Path) -> Result<Artifact, Error> {
    let bytes = fs::read(path).context("Reading message file")?;
    let artifact = serde_json::from_slice(&bytes)
        .with_context(|| format!("Decoding message file {}", path.display()))?;

    Ok(artifact)
}
