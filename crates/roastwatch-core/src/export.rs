use crate::Result;
use crate::clock::to_datetime;
use crate::report::Report;
use crate::vitals::VitalName;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

/// Fixed column set for tabular exports
pub const CSV_COLUMNS: [&str; 16] = [
    "timestamp",
    "url",
    "sessionId",
    "performanceScore",
    "lcp",
    "inp",
    "cls",
    "fcp",
    "ttfb",
    "clickCount",
    "scrollDepth",
    "timeOnPage",
    "engagementScore",
    "isMobile",
    "isLowEndDevice",
    "connectionType",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

pub fn export(reports: &[Report], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => to_json(reports),
        ExportFormat::Csv => Ok(to_csv(reports)),
    }
}

/// Full report history as a JSON array
pub fn to_json(reports: &[Report]) -> Result<String> {
    tracing::debug!("Exporting {} reports as JSON", reports.len());
    Ok(serde_json::to_string_pretty(reports)?)
}

pub fn from_json(content: &str) -> Result<Vec<Report>> {
    Ok(serde_json::from_str(content)?)
}

/// Flat CSV with one row per report
pub fn to_csv(reports: &[Report]) -> String {
    tracing::debug!("Exporting {} reports as CSV", reports.len());

    let mut out = CSV_COLUMNS.join(",");
    out.push('\n');

    for report in reports {
        let interactions = report.user_interactions.as_ref();
        let timestamp = to_datetime(report.timestamp)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_else(|| report.timestamp.to_string());

        let mut row: Vec<String> = vec![
            timestamp,
            escape(&report.url),
            escape(&report.session_id),
            format_number(report.performance_score()),
        ];
        row.extend(
            VitalName::ALL
                .iter()
                .map(|name| report.value(*name).map(format_number).unwrap_or_default()),
        );
        row.push(interactions.map(|i| i.click_count.to_string()).unwrap_or_default());
        row.push(interactions.map(|i| format_number(i.scroll_depth)).unwrap_or_default());
        row.push(interactions.map(|i| format_number(i.time_on_page)).unwrap_or_default());
        row.push(
            interactions
                .map(|i| format_number(i.engagement_score))
                .unwrap_or_default(),
        );
        row.push(report.device_info.is_mobile.to_string());
        row.push(report.device_info.is_low_end_device.to_string());
        row.push(escape(&report.device_info.connection_type));

        out.push_str(&row.join(","));
        out.push('\n');
    }

    out
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Quote a field when it contains a delimiter, quote or newline
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
