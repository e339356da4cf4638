//! Applying attendance events to participant snapshots.

use crate::domains::attendance::types::{AttendanceEvent, AttendanceRecord, CheckIn, CheckInOutcome};
use crate::domains::participant::types::Participant;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Record `event` for `participant` at `at`.
///
/// The input snapshot is never touched; callers holding it keep seeing the
/// pre-check-in state. Checking in twice to the same module leaves the module
/// set unchanged and reports `AlreadyCompleted`.
pub fn check_in(participant: &Participant, event: AttendanceEvent, at: DateTime<Utc>) -> CheckIn {
    let mut updated = participant.clone();
    updated.last_activity_date = Some(participant.last_activity_date.map_or(at, |last| last.max(at)));
    updated.import_status = None;

    let outcome = match event.module_id() {
        None => CheckInOutcome::SpecialClass,
        Some(module_id) => {
            let was_graduated = participant.is_graduated();
            if updated.completed_modules.insert(module_id) {
                let graduated = !was_graduated && updated.is_graduated();
                if graduated && updated.graduated_at.is_none() {
                    updated.graduated_at = Some(at);
                }
                CheckInOutcome::Recorded { graduated }
            } else {
                CheckInOutcome::AlreadyCompleted
            }
        }
    };

    log::debug!(
        "Check-in for {} to {:?}: {:?} ({} modules)",
        participant.id,
        event,
        outcome,
        updated.completed_count()
    );

    let record = AttendanceRecord {
        id: Uuid::new_v4(),
        participant_id: participant.id.clone(),
        event,
        attended_at: at,
    };

    CheckIn { participant: updated, outcome, record }
}
