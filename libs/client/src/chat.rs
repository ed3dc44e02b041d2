//! Conversation state and the scripted analytics assistant

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delay before the scripted assistant answers
pub const REPLY_DELAY: Duration = Duration::from_millis(2000);

const GREETING: &str = "¡Hola! Soy tu asistente de análisis de datos. Puedo ayudarte a generar dashboards y análisis a partir de tus datos. ¿En qué te gustaría que te ayude hoy?";
const REPLY: &str = "He analizado tus datos y he generado un dashboard con los insights principales. Aquí tienes un resumen de las métricas más importantes:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub title: String,
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard: Option<Dashboard>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            attachments: Vec::new(),
            dashboard: None,
        }
    }
}

/// Text and attachments being prepared for the next message
#[derive(Debug, Clone, Default)]
pub struct Composer {
    input: String,
    attachments: Vec<Attachment>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn attach(&mut self, name: impl Into<String>, mime_type: impl Into<String>, size: u64) -> Uuid {
        let id = Uuid::new_v4();
        self.attachments.push(Attachment {
            id,
            name: name.into(),
            mime_type: mime_type.into(),
            size,
        });
        id
    }

    pub fn remove_attachment(&mut self, id: Uuid) {
        self.attachments.retain(|attachment| attachment.id != id);
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Nothing worth sending: blank text and no attachments
    pub fn is_empty(&self) -> bool {
        self.input.trim().is_empty() && self.attachments.is_empty()
    }
}

/// Handle for an assistant reply that has not arrived yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingReply {
    pub in_reply_to: Uuid,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    pending: usize,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// A conversation opened by the assistant's greeting
    pub fn new() -> Self {
        Self {
            messages: vec![Message::new(Role::Assistant, GREETING)],
            pending: 0,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether a reply is still outstanding
    pub fn is_loading(&self) -> bool {
        self.pending > 0
    }

    /// Move the composer's contents into a user message
    ///
    /// Returns `None` and leaves everything untouched when the composer is
    /// empty.
    pub fn send(&mut self, composer: &mut Composer) -> Option<PendingReply> {
        if composer.is_empty() {
            return None;
        }

        let mut message = Message::new(Role::User, std::mem::take(&mut composer.input));
        message.attachments = std::mem::take(&mut composer.attachments);
        let pending = PendingReply {
            in_reply_to: message.id,
        };

        self.messages.push(message);
        self.pending += 1;
        Some(pending)
    }

    pub fn receive(&mut self, reply: Message) {
        self.pending = self.pending.saturating_sub(1);
        self.messages.push(reply);
    }
}

/// Placeholder assistant that answers every message with the same dashboard
#[derive(Debug, Clone)]
pub struct ScriptedAssistant {
    delay: Duration,
}

impl Default for ScriptedAssistant {
    fn default() -> Self {
        Self { delay: REPLY_DELAY }
    }
}

impl ScriptedAssistant {
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    pub async fn reply(&self, _pending: PendingReply) -> Message {
        tokio::time::sleep(self.delay).await;

        let mut message = Message::new(Role::Assistant, REPLY);
        message.dashboard = Some(placeholder_dashboard());
        message
    }
}

fn metric(label: &str, value: &str, change: Option<&str>, source: &str) -> Metric {
    Metric {
        label: label.to_string(),
        value: value.to_string(),
        change: change.map(str::to_string),
        source: Some(source.to_string()),
    }
}

pub fn placeholder_dashboard() -> Dashboard {
    Dashboard {
        title: "Análisis de Ventas Q1 2025".to_string(),
        metrics: vec![
            metric("Ventas Totales Q1", "$1.45M", Some("+15%"), "SAP"),
            metric("Nuevos Clientes", "237", None, "Salesforce"),
            metric("Ticket Promedio", "$345", None, "SAP"),
            metric("Crecimiento vs Q1 2024", "+15%", None, "SAP"),
        ],
    }
}

/// Human-readable size: `0 Bytes`, `500 Bytes`, `1.5 KB`, `2.25 MB`
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
