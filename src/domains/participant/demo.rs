//! Sample roster for demos and offline walkthroughs.
//!
//! Only installed when configuration opts in with `use_demo_data`; the
//! backend-backed repository never falls back to it.

use crate::domains::curriculum::{ModuleId, GRADUATION_MODULE_COUNT};
use crate::domains::participant::types::Participant;
use chrono::{Duration, NaiveDate};

struct DemoFather {
    id: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    phone: Option<&'static str>,
    modules: usize,
    joined_days_ago: i64,
    active_days_ago: Option<i64>,
}

const DEMO_FATHERS: [DemoFather; 6] = [
    DemoFather { id: "demo-1", first_name: "Marcus", last_name: "Hill", phone: Some("2255550101"), modules: 6, joined_days_ago: 70, active_days_ago: Some(3) },
    DemoFather { id: "demo-2", first_name: "Andre", last_name: "Price", phone: None, modules: 13, joined_days_ago: 120, active_days_ago: Some(6) },
    DemoFather { id: "demo-3", first_name: "Luis", last_name: "Ortega", phone: Some("2255550144"), modules: 4, joined_days_ago: 60, active_days_ago: Some(18) },
    DemoFather { id: "demo-4", first_name: "Ray", last_name: "Lewis", phone: None, modules: 2, joined_days_ago: 90, active_days_ago: Some(41) },
    DemoFather { id: "demo-5", first_name: "Terrence", last_name: "Boyd", phone: Some("2255550177"), modules: 14, joined_days_ago: 200, active_days_ago: Some(75) },
    DemoFather { id: "demo-6", first_name: "Dre", last_name: "Coleman", phone: None, modules: 0, joined_days_ago: 2, active_days_ago: None },
];

/// Build the sample roster relative to `today`, covering every status
pub fn demo_roster(today: NaiveDate) -> Vec<Participant> {
    DEMO_FATHERS
        .iter()
        .map(|d| {
            let last_activity_date = d
                .active_days_ago
                .and_then(|days| (today - Duration::days(days)).and_hms_opt(18, 0, 0))
                .map(|dt| dt.and_utc());
            Participant {
                id: d.id.to_string(),
                first_name: d.first_name.to_string(),
                last_name: d.last_name.to_string(),
                phone: d.phone.map(str::to_string),
                email: None,
                completed_modules: ModuleId::first_n(d.modules),
                joined_date: Some(today - Duration::days(d.joined_days_ago)),
                graduated_at: if d.modules >= GRADUATION_MODULE_COUNT { last_activity_date } else { None },
                last_activity_date,
                import_status: None,
            }
        })
        .collect()
}
