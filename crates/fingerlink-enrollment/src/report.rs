//! Progress and result reporting.
//!
//! Flows publish through the [`Reporter`] trait and never wait on delivery.
//! [`ChannelReporter`] queues [`ReportEvent`]s on an unbounded channel; the
//! consumer renders them into topic-tagged JSON [`Envelope`]s:
//!
//! | Topic | Payload |
//! |---|---|
//! | `fingerprint/status` | `{"status": "<stage>", "message": "..."}` |
//! | `fingerprint/result` | `{"id": 3, "success": true, "message": "..."}` |
//! | `fingerprint/templates` | `{"id": 3, "template": "<hex>"}` or `{"id": 3, "sha256": "<hex>"}` |
//! | `fingerprint/count` | `{"enrolledCount": 12}` |

use chrono::{DateTime, Utc};
use fingerlink_core::{Stage, TemplateEncoding, TemplateId, TemplatePayload};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::trace;

pub const TOPIC_STATUS: &str = "fingerprint/status";
pub const TOPIC_RESULT: &str = "fingerprint/result";
pub const TOPIC_TEMPLATES: &str = "fingerprint/templates";
pub const TOPIC_COUNT: &str = "fingerprint/count";

/// Fire-and-forget sink for flow output.
pub trait Reporter: Send + Sync {
    fn publish_status(&self, stage: Stage, message: &str);

    /// Outcome for one identifier; `id` is 0 when no identifier applies.
    fn publish_result(&self, id: u16, success: bool, message: &str);

    fn publish_template(&self, id: TemplateId, template: &TemplatePayload);

    fn publish_count(&self, count: u64);
}

/// One published message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Status {
        stage: Stage,
        message: String,
    },
    Result {
        id: u16,
        success: bool,
        message: String,
    },
    Template {
        id: TemplateId,
        template: TemplatePayload,
    },
    Count(u64),
}

impl ReportEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            ReportEvent::Status { .. } => TOPIC_STATUS,
            ReportEvent::Result { .. } => TOPIC_RESULT,
            ReportEvent::Template { .. } => TOPIC_TEMPLATES,
            ReportEvent::Count(_) => TOPIC_COUNT,
        }
    }

    /// JSON body of the message.
    pub fn payload(&self, encoding: TemplateEncoding) -> Value {
        match self {
            ReportEvent::Status { stage, message } => json!({
                "status": stage.as_str(),
                "message": message,
            }),
            ReportEvent::Result {
                id,
                success,
                message,
            } => json!({
                "id": id,
                "success": success,
                "message": message,
            }),
            ReportEvent::Template { id, template } => match encoding {
                TemplateEncoding::Hex => json!({ "id": id, "template": template.to_hex() }),
                TemplateEncoding::Sha256 => json!({ "id": id, "sha256": template.sha256_hex() }),
            },
            ReportEvent::Count(count) => json!({ "enrolledCount": count }),
        }
    }

    pub fn into_envelope(self, encoding: TemplateEncoding) -> Envelope {
        Envelope {
            topic: self.topic(),
            timestamp: Utc::now(),
            payload: self.payload(encoding),
        }
    }
}

/// A rendered event as written to the outside world.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub topic: &'static str,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
}

/// [`Reporter`] that queues events on an unbounded channel.
///
/// Events published after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: UnboundedSender<ReportEvent>,
}

impl ChannelReporter {
    pub fn new() -> (Self, UnboundedReceiver<ReportEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ReportEvent) {
        trace!(topic = event.topic(), "Publishing report");
        // Send only fails without a receiver; nothing is listening then.
        let _ = self.tx.send(event);
    }
}

impl Reporter for ChannelReporter {
    fn publish_status(&self, stage: Stage, message: &str) {
        self.send(ReportEvent::Status {
            stage,
            message: message.to_string(),
        });
    }

    fn publish_result(&self, id: u16, success: bool, message: &str) {
        self.send(ReportEvent::Result {
            id,
            success,
            message: message.to_string(),
        });
    }

    fn publish_template(&self, id: TemplateId, template: &TemplatePayload) {
        self.send(ReportEvent::Template {
            id,
            template: template.clone(),
        });
    }

    fn publish_count(&self, count: u64) {
        self.send(ReportEvent::Count(count));
    }
}
