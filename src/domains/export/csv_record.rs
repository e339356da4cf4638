use serde::Serialize;
use crate::domains::participant::types::ParticipantResponse;

/// Strip characters that spreadsheet apps on iPad render as line breaks
pub fn sanitize_field(s: &str) -> String {
    s.chars()
        .filter_map(|c| match c {
            '\u{2028}' | '\u{2029}' | '\r' | '\n' => None,
            '\u{00A0}' => Some(' '),
            c => Some(c),
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Trait for types that can be exported to CSV
pub trait CsvRecord: Serialize {
    /// Get CSV headers for this type
    fn headers() -> Vec<&'static str>;

    /// Convert to CSV row
    fn to_csv(&self) -> Vec<String>;
}

// Helper for converting values to CSV-safe strings
pub fn csv_value_to_string<T: std::fmt::Display>(value: &T) -> String {
    sanitize_field(&value.to_string())
}

// Helper for optional values
pub fn csv_optional_to_string<T: std::fmt::Display>(value: &Option<T>) -> String {
    value.as_ref()
        .map(|v| csv_value_to_string(v))
        .unwrap_or_default()
}

pub const ROSTER_HEADERS: [&str; 8] = [
    "ID",
    "First Name",
    "Last Name",
    "Phone",
    "Email",
    "Modules Completed",
    "Status",
    "Joined Date",
];

impl CsvRecord for ParticipantResponse {
    fn headers() -> Vec<&'static str> {
        ROSTER_HEADERS.to_vec()
    }

    fn to_csv(&self) -> Vec<String> {
        let p = &self.participant;
        vec![
            csv_value_to_string(&p.id),
            csv_value_to_string(&p.first_name),
            csv_value_to_string(&p.last_name),
            csv_optional_to_string(&p.phone),
            csv_optional_to_string(&p.email),
            p.completed_count().to_string(),
            self.status.to_string(),
            p.joined_date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        ]
    }
}
