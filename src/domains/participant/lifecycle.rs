//! Participant lifecycle classification.
//!
//! Every roster, dashboard and check-in view derives a participant's status
//! through [`classify`]. The function is pure: `now` is always passed in, and
//! the participant snapshot is only borrowed.

use crate::domains::participant::types::{Participant, ParticipantStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub use crate::domains::curriculum::GRADUATION_MODULE_COUNT;

/// Days without activity after which an active participant becomes At Risk
pub const AT_RISK_AFTER_DAYS: u32 = 14;

/// Days without activity after which a participant becomes Inactive
pub const INACTIVE_AFTER_DAYS: u32 = 28;

/// Reported when a participant has neither an activity nor a join date, so
/// they sort as the most inactive record on the roster
pub const INACTIVE_SENTINEL_DAYS: u32 = 999;

/// Result of classifying one participant at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub status: ParticipantStatus,
    pub days_since_activity: u32,
    pub progress_percent: u8,
    pub completed_count: usize,
}

impl Classification {
    /// One module short of graduation; views surface a reminder for these
    pub fn is_graduating_soon(&self) -> bool {
        self.completed_count + 1 == GRADUATION_MODULE_COUNT
    }
}

pub fn classify(participant: &Participant, now: DateTime<Utc>) -> Classification {
    let completed_count = participant.completed_count();
    let days_since_activity = days_since_activity(participant, now);
    Classification {
        status: status_for(completed_count, days_since_activity),
        days_since_activity,
        progress_percent: progress_percent(completed_count),
        completed_count,
    }
}

/// Status to display: the import placeholder until the first real activity
/// timestamp arrives, the canonical classification afterwards
pub fn effective_status(participant: &Participant, now: DateTime<Utc>) -> ParticipantStatus {
    if participant.is_graduated() {
        return ParticipantStatus::Graduated;
    }
    match (participant.last_activity_date, participant.import_status) {
        (None, Some(placeholder)) => placeholder.as_status(),
        _ => classify(participant, now).status,
    }
}

pub fn status_for(completed_count: usize, days_since_activity: u32) -> ParticipantStatus {
    if completed_count >= GRADUATION_MODULE_COUNT {
        ParticipantStatus::Graduated
    } else if days_since_activity < AT_RISK_AFTER_DAYS {
        ParticipantStatus::Active
    } else if days_since_activity < INACTIVE_AFTER_DAYS {
        ParticipantStatus::AtRisk
    } else {
        ParticipantStatus::Inactive
    }
}

/// Instant recency is measured from: last activity, else midnight UTC on the join date
pub fn reference_instant(participant: &Participant) -> Option<DateTime<Utc>> {
    participant.last_activity_date.or_else(|| {
        participant
            .joined_date
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    })
}

/// Whole days elapsed since the reference instant, floored. References in the
/// future count as zero.
pub fn days_since_activity(participant: &Participant, now: DateTime<Utc>) -> u32 {
    match reference_instant(participant) {
        None => INACTIVE_SENTINEL_DAYS,
        Some(reference) => {
            let days = now.signed_duration_since(reference).num_days();
            days.clamp(0, u32::MAX as i64) as u32
        }
    }
}

/// round(100 * completed / 14), clamped to [0, 100]
pub fn progress_percent(completed_count: usize) -> u8 {
    let completed = completed_count.min(GRADUATION_MODULE_COUNT);
    ((200 * completed + GRADUATION_MODULE_COUNT) / (2 * GRADUATION_MODULE_COUNT)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::curriculum::ModuleId;
    use crate::domains::participant::types::ImportPlaceholderStatus;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 15, 30, 0).unwrap()
    }

    fn participant(modules: usize, last_activity: Option<DateTime<Utc>>, joined: Option<NaiveDate>) -> Participant {
        Participant {
            id: "f-1".to_string(),
            first_name: "James".to_string(),
            last_name: "Carter".to_string(),
            phone: None,
            email: None,
            completed_modules: ModuleId::first_n(modules),
            joined_date: joined,
            last_activity_date: last_activity,
            import_status: None,
            graduated_at: None,
        }
    }

    #[test]
    fn test_recency_boundaries_are_exact() {
        let cases = [
            (13, ParticipantStatus::Active),
            (14, ParticipantStatus::AtRisk),
            (27, ParticipantStatus::AtRisk),
            (28, ParticipantStatus::Inactive),
        ];
        for (days, expected) in cases {
            let p = participant(5, Some(now() - Duration::days(days)), None);
            let c = classify(&p, now());
            assert_eq!(c.days_since_activity, days as u32);
            assert_eq!(c.status, expected, "{} days", days);
        }
    }

    #[test]
    fn test_partial_days_are_floored() {
        let p = participant(5, Some(now() - Duration::days(14) + Duration::minutes(1)), None);
        let c = classify(&p, now());
        assert_eq!(c.days_since_activity, 13);
        assert_eq!(c.status, ParticipantStatus::Active);
    }

    #[test]
    fn test_graduation_is_monotonic_for_any_now() {
        let last = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let p = participant(14, Some(last), None);
        for offset in [0_i64, 1, 13, 14, 27, 28, 365, 5_000] {
            let c = classify(&p, last + Duration::days(offset));
            assert_eq!(c.status, ParticipantStatus::Graduated);
            assert_eq!(c.progress_percent, 100);
        }
        let orphan = participant(14, None, None);
        assert_eq!(classify(&orphan, now()).status, ParticipantStatus::Graduated);
    }

    #[test]
    fn test_progress_bounds() {
        for count in 0..=20 {
            let pct = progress_percent(count);
            assert!(pct <= 100);
            assert_eq!(pct == 100, count >= GRADUATION_MODULE_COUNT, "count {}", count);
        }
        assert_eq!(progress_percent(0), 0);
        assert_eq!(progress_percent(1), 7);
        assert_eq!(progress_percent(7), 50);
        assert_eq!(progress_percent(13), 93);
    }

    #[test]
    fn test_sentinel_when_no_reference_date() {
        let p = participant(3, None, None);
        let c = classify(&p, now());
        assert_eq!(c.days_since_activity, INACTIVE_SENTINEL_DAYS);
        assert_eq!(c.status, ParticipantStatus::Inactive);
    }

    #[test]
    fn test_joined_date_is_fallback_reference() {
        let joined = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        let p = participant(0, None, Some(joined));
        assert_eq!(days_since_activity(&p, now()), 12);
        assert_eq!(classify(&p, now()).status, ParticipantStatus::Active);

        let with_activity = participant(0, Some(now() - Duration::days(30)), Some(joined));
        assert_eq!(classify(&with_activity, now()).status, ParticipantStatus::Inactive);
    }

    #[test]
    fn test_future_reference_counts_as_today() {
        let p = participant(2, Some(now() + Duration::days(3)), None);
        assert_eq!(days_since_activity(&p, now()), 0);
    }

    #[test]
    fn test_graduating_soon_boundary() {
        let p = participant(13, Some(now()), None);
        let c = classify(&p, now());
        assert_eq!(c.completed_count, 13);
        assert!(c.is_graduating_soon());
        assert!(!classify(&participant(14, Some(now()), None), now()).is_graduating_soon());
    }

    #[test]
    fn test_import_placeholder_diverges_until_first_activity() {
        // Imported with 1 module: placeholder says At Risk even though the
        // participant joined today and the recency rule would say Active.
        let mut p = participant(1, None, Some(now().date_naive()));
        p.import_status = Some(ImportPlaceholderStatus::from_module_count(1));
        assert_eq!(effective_status(&p, now()), ParticipantStatus::AtRisk);
        assert_eq!(classify(&p, now()).status, ParticipantStatus::Active);

        p.last_activity_date = Some(now());
        assert_eq!(effective_status(&p, now()), ParticipantStatus::Active);
    }
}
