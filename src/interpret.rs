use tracing::Level;

use crate::model::{ApiEnvelope, HeartbeatData};
use crate::transport::HttpResult;

/// Error string the service uses for a heartbeat it already has.
pub const DUPLICATE: &str = "Duplicate";

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted(Option<HeartbeatData>),
    Duplicate,
    OtherApiError(String),
    RateLimited,
    ClientError(u16),
    ServerError(u16),
    NetworkUnreachable,
    MalformedResponse(String),
    UnknownStatus(u16),
}

pub fn interpret(result: &HttpResult) -> Outcome {
    let (status, body) = match result {
        HttpResult::Unreachable => return Outcome::NetworkUnreachable,
        HttpResult::Completed { status, body } => (*status, body),
    };

    match status {
        429 => Outcome::RateLimited,
        400 | 401 | 403 | 404 => Outcome::ClientError(status),
        500..=599 => Outcome::ServerError(status),
        200..=299 if body.trim().is_empty() => Outcome::NetworkUnreachable,
        200..=299 => match serde_json::from_str::<ApiEnvelope<HeartbeatData>>(body) {
            Ok(envelope) => match envelope.error {
                None => Outcome::Accepted(envelope.data),
                Some(error) => api_error(error),
            },
            Err(e) => Outcome::MalformedResponse(e.to_string()),
        },
        // An error envelope still names the rejection, whatever the status.
        _ => match serde_json::from_str::<ApiEnvelope<HeartbeatData>>(body) {
            Ok(ApiEnvelope {
                error: Some(error),
                ..
            }) => api_error(error),
            _ => Outcome::UnknownStatus(status),
        },
    }
}

fn api_error(error: String) -> Outcome {
    if error == DUPLICATE {
        Outcome::Duplicate
    } else {
        Outcome::OtherApiError(error)
    }
}

impl Outcome {
    pub fn name(&self) -> &'static str {
        match self {
            Outcome::Accepted(_) => "accepted",
            Outcome::Duplicate => "duplicate",
            Outcome::OtherApiError(_) => "api_error",
            Outcome::RateLimited => "rate_limited",
            Outcome::ClientError(_) => "client_error",
            Outcome::ServerError(_) => "server_error",
            Outcome::NetworkUnreachable => "network_unreachable",
            Outcome::MalformedResponse(_) => "malformed_response",
            Outcome::UnknownStatus(_) => "unknown_status",
        }
    }

    /// The service rejected this heartbeat, so it must not count as sent.
    pub fn requires_rollback(&self) -> bool {
        matches!(self, Outcome::Duplicate | Outcome::OtherApiError(_))
    }

    pub fn triggers_backoff(&self) -> bool {
        matches!(self, Outcome::RateLimited)
    }

    pub fn level(&self) -> Level {
        match self {
            Outcome::Accepted(_) | Outcome::Duplicate => Level::DEBUG,
            Outcome::OtherApiError(_)
            | Outcome::RateLimited
            | Outcome::ServerError(_)
            | Outcome::NetworkUnreachable => Level::WARN,
            Outcome::ClientError(_) | Outcome::MalformedResponse(_) | Outcome::UnknownStatus(_) => {
                Level::ERROR
            }
        }
    }
}

/// Emits one log record for a completed submission.
///
/// `debug` raises routine outcomes to INFO; it never changes which record is
/// emitted.
pub fn report(outcome: &Outcome, entity: &str, debug: bool) {
    let kind = outcome.name();

    match outcome {
        Outcome::Accepted(data) => {
            let id = data.as_ref().map(|d| d.id.as_str()).unwrap_or("");
            if debug {
                tracing::info!(outcome = kind, entity, id, "heartbeat sent");
            } else {
                tracing::debug!(outcome = kind, entity, id, "heartbeat sent");
            }
        }
        Outcome::Duplicate => {
            if debug {
                tracing::info!(outcome = kind, entity, "heartbeat already recorded");
            } else {
                tracing::debug!(outcome = kind, entity, "heartbeat already recorded");
            }
        }
        Outcome::OtherApiError(message) => {
            tracing::warn!(outcome = kind, entity, message = %message, "heartbeat rejected");
        }
        Outcome::RateLimited => {
            tracing::warn!(outcome = kind, entity, "rate limited, backing off");
        }
        Outcome::ClientError(status) => {
            tracing::error!(
                outcome = kind,
                entity,
                status,
                "heartbeat refused, check the api key"
            );
        }
        Outcome::ServerError(status) => {
            tracing::warn!(outcome = kind, entity, status, "server error, heartbeat dropped");
        }
        Outcome::NetworkUnreachable => {
            tracing::warn!(
                outcome = kind,
                entity,
                "network unreachable; disable tracking while offline to silence this"
            );
        }
        Outcome::MalformedResponse(message) => {
            tracing::error!(
                outcome = kind,
                entity,
                message = %message,
                "could not decode response"
            );
        }
        Outcome::UnknownStatus(status) => {
            tracing::error!(outcome = kind, entity, status, "unexpected status from service");
        }
    }
}
