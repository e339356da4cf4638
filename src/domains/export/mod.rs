pub mod csv_record;
pub mod roster_csv;

pub use csv_record::CsvRecord;
pub use roster_csv::{export_csv, parse_csv, split_full_name, CsvImport};
