use std::path::{Path, PathBuf};

use anyhow::{Error, Result, anyhow};
use chrono::{DateTime, Utc};

/// Textual layout of the `timestamp` artifact property, e.g.
/// `2024-03-01 10:15:00 +0000 UTC`. Fractional seconds only appear when
/// non-zero.
pub const TIMESTAMP_LAYOUT: &str = "%Y-%m-%d %H:%M:%S%.f %z %Z";

pub fn format_timestamp(seconds: u64) -> Option<String> {
    let seconds = i64::try_from(seconds).ok()?;
    let time = DateTime::<Utc>::from_timestamp(seconds, 0)?;

    Some(time.format(TIMESTAMP_LAYOUT).to_string())
}

/// Parses a `timestamp` property back into AMQP seconds since the epoch.
pub fn parse_timestamp(text: &str) -> Result<u64, Error> {
    let time = DateTime::parse_from_str(text, TIMESTAMP_LAYOUT)
        .map_err(|e| anyhow!("parsing time {:?}: {}", text, e))?;

    u64::try_from(time.timestamp()).map_err(|_| anyhow!("timestamp {:?} is before 1970", text))
}

pub fn artifact_file_name(counter: u64) -> String {
    format!("msg-{:04}.json", counter)
}

/// `output_dir/msg-NNNN.json`, with a bare `msg-NNNN.json` when the output
/// directory is the current one.
pub fn artifact_path(output_dir: &Path, counter: u64) -> PathBuf {
    let name = artifact_file_name(counter);

    if output_dir.as_os_str().is_empty() || output_dir == Path::new(".") {
        PathBuf::from(name)
    } else {
        output_dir.join(name)
    }
}
