//! Check-in links and QR image URLs for the kiosk flow.

use crate::domains::attendance::types::AttendanceEvent;

pub const DEFAULT_QR_GENERATOR_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";
pub const DEFAULT_QR_SIZE: u32 = 200;
pub const MIN_QR_SIZE: u32 = 50;
pub const MAX_QR_SIZE: u32 = 1000;

/// Link a participant scans to record attendance for `event`
pub fn check_in_url(base_url: &str, participant_id: &str, event: AttendanceEvent) -> String {
    format!(
        "{}/check-in?participantId={}&module={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(participant_id),
        event.raw_id()
    )
}

/// Image URL that renders `data` as a square QR code of `size` pixels
pub fn qr_image_url(generator_url: &str, data: &str, size: u32) -> String {
    format!("{}?size={}x{}&data={}", generator_url, size, size, urlencoding::encode(data))
}
