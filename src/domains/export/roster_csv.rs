//! Roster CSV import and export.
//!
//! Two row layouts are read back: the intake sheet staff fill in by hand
//! (`id,"full name",phone,email,modulesCompletedCount`) and the export layout
//! written by [`export_csv`]. The header row decides which one applies.
//!
//! Imports only know how many modules a participant completed, never which
//! ones, so the module set is rebuilt as `{1..=N}`. Progress for imported
//! records is therefore a count, not a history.

use crate::domains::curriculum::ModuleId;
use crate::domains::export::csv_record::CsvRecord;
use crate::domains::participant::types::{
    normalize_optional, parse_lenient_date, ImportPlaceholderStatus, Participant, ParticipantResponse,
};
use crate::errors::{DomainError, DomainResult};
use chrono::{DateTime, NaiveDate, Utc};
use csv::{QuoteStyle, ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::Serialize;

/// Outcome of parsing an import file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvImport {
    pub participants: Vec<Participant>,
    /// Non-blank data rows that could not be turned into a participant
    pub skipped_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowLayout {
    Intake,
    Export,
}

impl RowLayout {
    fn detect(header: Option<&StringRecord>) -> Self {
        let is_export = header.map_or(false, |h| {
            let col = |i: usize| h.get(i).map(|v| v.trim().to_ascii_lowercase());
            col(1).as_deref() == Some("first name") && col(2).as_deref() == Some("last name")
        });
        if is_export {
            RowLayout::Export
        } else {
            RowLayout::Intake
        }
    }
}

/// Parse a roster CSV. The first line is a header; blank lines are ignored.
///
/// Each line is parsed on its own, so an unbalanced quote only costs the row
/// it appears on.
pub fn parse_csv(text: &str, imported_on: NaiveDate) -> CsvImport {
    let mut lines = text.lines();
    let header = lines.next().and_then(parse_line);
    let layout = RowLayout::detect(header.as_ref());

    let mut participants = Vec::new();
    let mut skipped_rows = 0;

    for (index, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let participant = parse_line(line).and_then(|record| match layout {
            RowLayout::Intake => intake_row(&record, imported_on),
            RowLayout::Export => export_row(&record, imported_on),
        });
        match participant {
            Some(p) => participants.push(p),
            None => {
                log::debug!("Skipping malformed CSV row {}", index + 2);
                skipped_rows += 1;
            }
        }
    }

    log::info!(
        "Parsed {} participants from CSV ({:?} layout), skipped {} rows",
        participants.len(),
        layout,
        skipped_rows
    );

    CsvImport { participants, skipped_rows }
}

/// Serialize participants in the export layout. `Status` is the status shown
/// at `now`.
pub fn export_csv(participants: &[Participant], now: DateTime<Utc>) -> DomainResult<String> {
    let mut buffer = Vec::new();
    {
        let mut wtr = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .from_writer(&mut buffer);

        wtr.write_record(ParticipantResponse::headers())?;
        for participant in participants {
            let row = ParticipantResponse::new(participant.clone(), now);
            wtr.write_record(row.to_csv())?;
        }
        wtr.flush().map_err(|e| DomainError::Csv(e.to_string()))?;
    }

    String::from_utf8(buffer).map_err(|e| DomainError::Internal(format!("CSV output is not UTF-8: {}", e)))
}

fn parse_line(line: &str) -> Option<StringRecord> {
    // Odd quote count means an unterminated field
    if line.matches('"').count() % 2 != 0 {
        return None;
    }
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(line.as_bytes());
    let record = reader.records().next()?.ok();
    record
}

fn intake_row(record: &StringRecord, imported_on: NaiveDate) -> Option<Participant> {
    let id = required_field(record, 0)?;
    let (first_name, last_name) = split_full_name(record.get(1).unwrap_or_default());
    if first_name.is_empty() && last_name.is_empty() {
        return None;
    }
    let count = module_count(record.get(4));

    Some(imported(
        id,
        first_name,
        last_name,
        optional_field(record, 2),
        optional_field(record, 3),
        count,
        imported_on,
    ))
}

fn export_row(record: &StringRecord, imported_on: NaiveDate) -> Option<Participant> {
    let id = required_field(record, 0)?;
    let first_name = record.get(1).unwrap_or_default().to_string();
    let last_name = record.get(2).unwrap_or_default().to_string();
    if first_name.is_empty() && last_name.is_empty() {
        return None;
    }
    let count = module_count(record.get(5));
    // Column 6 (Status) is derived and ignored on the way back in
    let joined_date = record.get(7).and_then(parse_lenient_date).unwrap_or(imported_on);

    Some(imported(
        id,
        first_name,
        last_name,
        optional_field(record, 3),
        optional_field(record, 4),
        count,
        joined_date,
    ))
}

fn imported(
    id: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    email: Option<String>,
    count: usize,
    joined_date: NaiveDate,
) -> Participant {
    let completed_modules = ModuleId::first_n(count);
    Participant {
        id,
        first_name,
        last_name,
        phone,
        email,
        import_status: Some(ImportPlaceholderStatus::from_module_count(completed_modules.len())),
        completed_modules,
        joined_date: Some(joined_date),
        last_activity_date: None,
        graduated_at: None,
    }
}

fn required_field(record: &StringRecord, index: usize) -> Option<String> {
    record.get(index).filter(|v| !v.is_empty()).map(str::to_string)
}

fn optional_field(record: &StringRecord, index: usize) -> Option<String> {
    normalize_optional(record.get(index).map(str::to_string))
}

/// Modules-completed column; missing or non-numeric counts as zero
fn module_count(raw: Option<&str>) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok()).unwrap_or(0)
}

const NAME_SUFFIXES: [&str; 6] = ["jr", "sr", "ii", "iii", "iv", "v"];

/// Split a single name column into (first, last).
///
/// `"James Earl Carter"` gives `("James", "Earl Carter")`. A comma means
/// `"Last, First"`, except when the part after the comma is a generational
/// suffix: `"Smith, Jr."` is kept whole as the last name.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let full_name = full_name.trim();
    if let Some((before, after)) = full_name.split_once(',') {
        let suffix = after.trim().trim_end_matches('.').to_ascii_lowercase();
        if NAME_SUFFIXES.contains(&suffix.as_str()) {
            return (String::new(), full_name.to_string());
        }
        return (after.trim().to_string(), before.trim().to_string());
    }

    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::export::csv_record::ROSTER_HEADERS;
    use crate::domains::participant::lifecycle::{classify, effective_status};
    use crate::domains::participant::types::ParticipantStatus;
    use chrono::TimeZone;

    fn imported_on() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    const INTAKE_HEADER: &str = "id,name,phone,email,modules";

    #[test]
    fn test_quoted_comma_suffix_stays_in_last_name() {
        let text = format!("{}\n\"7\",\"Smith, Jr.\",2255551212,,3\n", INTAKE_HEADER);
        let import = parse_csv(&text, imported_on());
        assert_eq!(import.skipped_rows, 0);
        let p = &import.participants[0];
        assert_eq!(p.id, "7");
        assert_eq!(p.last_name, "Smith, Jr.");
        assert_eq!(p.first_name, "");
        assert_eq!(p.phone.as_deref(), Some("2255551212"));
        assert_eq!(p.email, None);
        let ids: Vec<u8> = p.completed_modules.iter().map(|m| m.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_name_splitting() {
        assert_eq!(split_full_name("James Earl Carter"), ("James".to_string(), "Earl Carter".to_string()));
        assert_eq!(split_full_name("Carter, James"), ("James".to_string(), "Carter".to_string()));
        assert_eq!(split_full_name("Prince"), ("Prince".to_string(), String::new()));
        assert_eq!(split_full_name("Lee, III"), (String::new(), "Lee, III".to_string()));
    }

    #[test]
    fn test_round_trip_preserves_ids_names_and_counts() {
        let text = format!(
            "{}\n1,Marcus Hill,2255550101,marcus@example.org,4\n2,\"Smith, Jr.\",,,14\n3,Dre,,,0\n",
            INTAKE_HEADER
        );
        let first = parse_csv(&text, imported_on());
        let exported = export_csv(&first.participants, now()).unwrap();
        assert!(exported.starts_with("\"ID\",\"First Name\",\"Last Name\""));

        let second = parse_csv(&exported, imported_on());
        assert_eq!(second.skipped_rows, 0);
        assert_eq!(second.participants.len(), first.participants.len());
        for (a, b) in first.participants.iter().zip(&second.participants) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.first_name, b.first_name);
            assert_eq!(a.last_name, b.last_name);
            assert_eq!(a.completed_count(), b.completed_count());
            assert_eq!(a.joined_date, b.joined_date);
        }
    }

    #[test]
    fn test_export_quotes_text_and_reports_status() {
        let import = parse_csv(&format!("{}\n9,\"Ortega, Luis\",,luis@example.org,14\n", INTAKE_HEADER), imported_on());
        let exported = export_csv(&import.participants, now()).unwrap();
        let row = exported.lines().nth(1).unwrap();
        assert_eq!(row, "\"9\",\"Luis\",\"Ortega\",\"\",\"luis@example.org\",\"14\",\"Graduated\",\"2024-06-01\"");

        // All-digit phone numbers are text too
        let import = parse_csv(&format!("{}\n10,Ray Lewis,2255550101,,2\n", INTAKE_HEADER), imported_on());
        let exported = export_csv(&import.participants, now()).unwrap();
        assert!(exported.lines().nth(1).unwrap().contains(",\"2255550101\","));
    }

    #[test]
    fn test_malformed_rows_are_counted_not_fatal() {
        let text = format!(
            "{}\n1,Marcus Hill,,,2\n,No Id,,,3\n2,,,,5\n\n3,\"Unclosed, Quote,,,1\n4,Ray Lewis,,,1\n",
            INTAKE_HEADER
        );
        let import = parse_csv(&text, imported_on());
        let ids: Vec<&str> = import.participants.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "4"]);
        // Blank line is not counted; the unbalanced quote only loses its own row
        assert_eq!(import.skipped_rows, 3);
    }

    #[test]
    fn test_count_column_edge_cases() {
        let text = format!("{}\n1,A B,,,40\n2,C D,,,lots\n3,E F,,\n", INTAKE_HEADER);
        let import = parse_csv(&text, imported_on());
        let counts: Vec<usize> = import.participants.iter().map(Participant::completed_count).collect();
        assert_eq!(counts, vec![14, 0, 0]);
    }

    #[test]
    fn test_import_placeholder_diverges_from_classifier() {
        // Joined today with one module: recency says Active, import says At Risk
        let import = parse_csv(&format!("{}\n1,Marcus Hill,,,1\n2,Ray Lewis,,,5\n", INTAKE_HEADER), imported_on());
        let low = &import.participants[0];
        assert_eq!(low.import_status, Some(ImportPlaceholderStatus::AtRisk));
        assert_eq!(effective_status(low, now()), ParticipantStatus::AtRisk);
        assert_eq!(classify(low, now()).status, ParticipantStatus::Active);

        let mid = &import.participants[1];
        assert_eq!(effective_status(mid, now()), ParticipantStatus::Active);
    }

    #[test]
    fn test_header_only_and_empty_input() {
        assert_eq!(parse_csv("", imported_on()).participants.len(), 0);
        let import = parse_csv(&ROSTER_HEADERS.join(","), imported_on());
        assert!(import.participants.is_empty());
        assert_eq!(import.skipped_rows, 0);
    }

    #[test]
    fn test_export_layout_reads_joined_date_and_ignores_status() {
        let text = format!("{}\n5,Andre,Price,,,3,Graduated,2024-01-15\n", ROSTER_HEADERS.join(","));
        let p = &parse_csv(&text, imported_on()).participants[0];
        assert_eq!(p.joined_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(p.completed_count(), 3);
        assert_eq!(p.import_status, Some(ImportPlaceholderStatus::Active));
    }
}
