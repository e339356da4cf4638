pub mod check_in;
pub mod qr;
pub mod types;

pub use check_in::check_in;
pub use types::{AttendanceEvent, AttendanceRecord, CheckIn, CheckInOutcome, CheckInRequest};
