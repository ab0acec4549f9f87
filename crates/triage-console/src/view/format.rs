//! Table cell formatting shared by the views.

use chrono::{DateTime, Utc};
use triage_query::{ALERT_STATUS_FIELD, Alert, ColumnMetadata, FieldValue, ID_FIELD};

/// Layout of a timestamp cell.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Turns alerts into rows of cells for a set of columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFormatter {
    /// Columns in display order.
    columns: Vec<ColumnMetadata>,
}

impl RowFormatter {
    /// Creates a formatter for `columns`.
    pub fn new(columns: Vec<ColumnMetadata>) -> Self {
        Self { columns }
    }

    /// Columns in display order.
    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    /// Column names in display order.
    pub fn header(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// One cell per column.
    pub fn row(&self, alert: &Alert) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| format_value(&column.name, column_value(alert, &column.name).as_ref()))
            .collect()
    }
}

/// The raw value shown in `column`: the document id for `id`, the workflow status for
/// `alert_status`, the source field otherwise.
pub fn column_value(alert: &Alert, column: &str) -> Option<FieldValue> {
    match column {
        ID_FIELD => Some(FieldValue::Text(alert.id.clone())),
        ALERT_STATUS_FIELD => Some(FieldValue::Text(alert.status.to_string())),
        _ => alert.field(column).cloned(),
    }
}

/// Renders a cell. Time columns (names ending in `:ts` or `timestamp`) holding epoch
/// milliseconds render as `YYYY-MM-DD HH:MM:SS` in UTC; missing values render empty.
pub fn format_value(column: &str, value: Option<&FieldValue>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    if column.ends_with(":ts") || column.ends_with("timestamp") {
        let date = match value {
            FieldValue::Date(date) => Some(*date),
            other => other
                .as_f64()
                .and_then(|ms| DateTime::<Utc>::from_timestamp_millis(ms as i64)),
        };
        if let Some(date) = date {
            return date.format(TIMESTAMP_FORMAT).to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use triage_query::AlertStatus;

    use super::*;

    fn alert() -> Alert {
        let serde_json::Value::Object(source) = json!({
            "ip_src_addr": "10.0.0.1",
            "timestamp": 1_500_000_000_000_i64,
            "bro:ts": "1500000000000",
            "threat:triage:score": 12.5,
            "alert_status": "dismiss"
        }) else {
            unreachable!()
        };
        Alert::from_source("doc-1", source)
    }

    #[test]
    fn rows_follow_column_order() {
        let formatter = RowFormatter::new(vec![
            ColumnMetadata::new("id", "string"),
            ColumnMetadata::new("ip_src_addr", "ip"),
            ColumnMetadata::new("alert_status", "string"),
            ColumnMetadata::new("missing", "string"),
        ]);

        assert_eq!(formatter.header(), ["id", "ip_src_addr", "alert_status", "missing"]);
        assert_eq!(formatter.row(&alert()), ["doc-1", "10.0.0.1", "DISMISS", ""]);
    }

    #[test]
    fn time_columns_render_as_dates() {
        let alert = alert();
        let cell = |column: &str| format_value(column, column_value(&alert, column).as_ref());

        assert_eq!(cell("timestamp"), "2017-07-14 02:40:00");
        assert_eq!(cell("bro:ts"), "2017-07-14 02:40:00");
        assert_eq!(cell("threat:triage:score"), "12.5");
    }

    #[test]
    fn status_column_tracks_changes() {
        let mut alert = alert();
        alert.set_status(AlertStatus::Escalate, None);
        assert_eq!(
            format_value("alert_status", column_value(&alert, "alert_status").as_ref()),
            "ESCALATE"
        );
    }
}
