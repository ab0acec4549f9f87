//! Alert records with typed source fields.
//!
//! The backend returns each alert's source document as loose JSON. Values are resolved
//! into [`FieldValue`]s once, when the alert is deserialized, so display and matching code
//! never has to guess at types again.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Source field holding the workflow status.
pub const ALERT_STATUS_FIELD: &str = "alert_status";

/// Source field holding the workflow id assigned on escalation.
pub const WORKFLOW_ID_FIELD: &str = "workflow_id";

/// Source field holding the globally unique alert id.
pub const GUID_FIELD: &str = "guid";

/// Source field naming the sensor that produced the alert.
pub const SENSOR_TYPE_FIELD: &str = "source:type";

/// Sensor type reported for alerts without one (meta alerts).
pub const META_ALERTS_SENSOR_TYPE: &str = "metaalert";

/// A typed source field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Free text, and anything structured kept as its JSON text.
    Text(String),
    /// A number.
    Number(f64),
    /// A boolean.
    Bool(bool),
    /// A point in time (stored on the wire as epoch milliseconds).
    Date(DateTime<Utc>),
}

impl FieldValue {
    /// Resolves a JSON value for the named field.
    ///
    /// Numbers in fields whose names end in `timestamp` or `:ts` are epoch milliseconds
    /// and become dates. Returns `None` for JSON `null`.
    pub fn from_json(field: &str, value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Self::Bool(b)),
            Value::Number(n) => {
                let number = n.as_f64()?;
                if is_time_field(field)
                    && let Some(date) = DateTime::from_timestamp_millis(number as i64)
                {
                    return Some(Self::Date(date));
                }
                Some(Self::Number(number))
            }
            Value::String(s) => Some(Self::Text(s)),
            other @ (Value::Array(_) | Value::Object(_)) => Some(Self::Text(other.to_string())),
        }
    }

    /// Converts back to the JSON wire form.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Number(n) => number_json(*n),
            Self::Bool(b) => Value::Bool(*b),
            Self::Date(d) => Value::Number(Number::from(d.timestamp_millis())),
        }
    }

    /// The value as a number, if it has a numeric reading.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Date(d) => Some(d.timestamp_millis() as f64),
            Self::Text(s) => s.parse().ok(),
            Self::Bool(_) => None,
        }
    }

    /// The value as text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    /// Renders the value the way it is matched in queries: dates as epoch milliseconds,
    /// integral numbers without a fraction.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Date(d) => write!(f, "{}", d.timestamp_millis()),
        }
    }
}

/// Whether a field holds epoch-millisecond timestamps by naming convention.
fn is_time_field(field: &str) -> bool {
    field.ends_with("timestamp") || field.ends_with(":ts")
}

/// Encodes a float as JSON, preferring an integer when there is no fraction.
fn number_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

/// Workflow status of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertStatus {
    /// Not yet triaged.
    #[default]
    New,
    /// Under investigation.
    Open,
    /// Handed to a workflow.
    Escalate,
    /// Not a real threat.
    Dismiss,
    /// Dealt with.
    Resolve,
}

impl AlertStatus {
    /// All statuses in workflow order.
    pub const ALL: [Self; 5] = [
        Self::New,
        Self::Open,
        Self::Escalate,
        Self::Dismiss,
        Self::Resolve,
    ];

    /// Upper-case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Open => "OPEN",
            Self::Escalate => "ESCALATE",
            Self::Dismiss => "DISMISS",
            Self::Resolve => "RESOLVE",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown alert status: {s}"))
    }
}

/// An alert's source document, keyed by field name.
pub type AlertSource = BTreeMap<String, FieldValue>;

/// A single security alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAlert", into = "RawAlert")]
pub struct Alert {
    /// Document id.
    pub id: String,
    /// Index the alert was found in.
    pub index: Option<String>,
    /// Search relevance score.
    pub score: Option<f64>,
    /// Typed source fields.
    pub source: AlertSource,
    /// Workflow status, read from the `alert_status` source field.
    pub status: AlertStatus,
}

impl Alert {
    /// Creates an alert from a JSON source object.
    pub fn from_source(id: impl Into<String>, source: Map<String, Value>) -> Self {
        RawAlert {
            id: id.into(),
            index: None,
            score: None,
            source,
        }
        .into()
    }

    /// Looks up a source field.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.source.get(name)
    }

    /// The alert guid, falling back to the document id.
    pub fn guid(&self) -> &str {
        self.field(GUID_FIELD)
            .and_then(FieldValue::as_str)
            .unwrap_or(self.id.as_str())
    }

    /// The producing sensor, or the meta-alert sensor type when absent.
    pub fn sensor_type(&self) -> &str {
        self.field(SENSOR_TYPE_FIELD)
            .and_then(FieldValue::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(META_ALERTS_SENSOR_TYPE)
    }

    /// Updates the workflow status in both the typed field and the source document.
    pub fn set_status(&mut self, status: AlertStatus, workflow_id: Option<&str>) {
        self.status = status;
        self.source.insert(
            ALERT_STATUS_FIELD.to_string(),
            FieldValue::Text(status.as_str().to_string()),
        );
        if let Some(id) = workflow_id {
            self.source
                .insert(WORKFLOW_ID_FIELD.to_string(), FieldValue::Text(id.to_string()));
        }
    }
}

/// Wire form of an alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawAlert {
    /// Document id.
    #[serde(default)]
    id: String,
    /// Index name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    index: Option<String>,
    /// Relevance score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
    /// Untyped source document.
    #[serde(default)]
    source: Map<String, Value>,
}

impl From<RawAlert> for Alert {
    fn from(raw: RawAlert) -> Self {
        let source: AlertSource = raw
            .source
            .into_iter()
            .filter_map(|(name, value)| {
                let typed = FieldValue::from_json(&name, value)?;
                Some((name, typed))
            })
            .collect();

        let status = source
            .get(ALERT_STATUS_FIELD)
            .and_then(FieldValue::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        Self {
            id: raw.id,
            index: raw.index,
            score: raw.score,
            source,
            status,
        }
    }
}

impl From<Alert> for RawAlert {
    fn from(alert: Alert) -> Self {
        Self {
            id: alert.id,
            index: alert.index,
            score: alert.score,
            source: alert
                .source
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        }
    }
}
