use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kinds of report the tracker can send. Serialized as the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ScrollDepth,
    CtaClick,
    OutboundClick,
    Heartbeat,
    PageLeave,
    FormSubmit,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ScrollDepth => "scroll_depth",
            EventKind::CtaClick => "cta_click",
            EventKind::OutboundClick => "outbound_click",
            EventKind::Heartbeat => "heartbeat",
            EventKind::PageLeave => "page_leave",
            EventKind::FormSubmit => "form_submit",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event-specific payload, serialized as the nested `data` object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventData {
    ScrollDepth {
        depth: u8,
    },
    CtaClick {
        text: String,
        category: String,
        href: Option<String>,
    },
    OutboundClick {
        url: String,
        text: String,
    },
    Heartbeat {
        seconds: u64,
    },
    PageLeave {
        seconds: u64,
        scroll_depths: Vec<u8>,
    },
    FormSubmit {
        form_type: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl EventData {
    /// Caller-supplied fields are merged next to `form_type`; a caller field
    /// named `form_type` is dropped so the label stays authoritative.
    pub fn form_submit(form_type: impl Into<String>, mut extra: Map<String, Value>) -> Self {
        extra.remove("form_type");
        EventData::FormSubmit {
            form_type: form_type.into(),
            extra,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            EventData::ScrollDepth { .. } => EventKind::ScrollDepth,
            EventData::CtaClick { .. } => EventKind::CtaClick,
            EventData::OutboundClick { .. } => EventKind::OutboundClick,
            EventData::Heartbeat { .. } => EventKind::Heartbeat,
            EventData::PageLeave { .. } => EventKind::PageLeave,
            EventData::FormSubmit { .. } => EventKind::FormSubmit,
        }
    }
}

/// Body of a record-event request. Built right before transmission and never retained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub data: EventData,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl TrackedEvent {
    pub fn new(data: EventData, path: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            kind: data.kind(),
            data,
            path: path.into(),
            session_id,
        }
    }
}
