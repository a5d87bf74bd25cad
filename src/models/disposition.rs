use std::fmt::{Display, Formatter, Result};

/// What the drain loop does with one fetched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    AckLocal,
    Forward { exchange: String, ack_source: bool },
    Leave,
}

impl Display for Disposition {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Disposition::AckLocal => write!(f, "ack"),
            Disposition::Forward { exchange, .. } => write!(f, "forward:{}", exchange),
            Disposition::Leave => write!(f, "leave"),
        }
    }
}

/// Outcome recorded for a message once the router has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Acked,
    Forwarded { acked: bool },
    ForwardFailed { error: String },
    Left,
}

impl RouteOutcome {
    pub fn acked(&self) -> bool {
        matches!(
            self,
            RouteOutcome::Acked | RouteOutcome::Forwarded { acked: true }
        )
    }
}
