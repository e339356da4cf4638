use crate::domains::curriculum::ModuleId;
use crate::domains::participant::types::Participant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// What a participant attended: a curriculum module, or a special class whose
/// ID falls outside the curriculum range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AttendanceEvent {
    Module(ModuleId),
    SpecialClass(i64),
}

/// Incoming shape; the ID alone decides module versus special class
#[derive(Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
enum WireEvent {
    Module(i64),
    SpecialClass(i64),
}

impl<'de> Deserialize<'de> for AttendanceEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match WireEvent::deserialize(deserializer)? {
            WireEvent::Module(raw) | WireEvent::SpecialClass(raw) => Ok(AttendanceEvent::from_raw(raw)),
        }
    }
}

impl AttendanceEvent {
    /// Classify a raw session ID as scanned from a QR link or typed by staff
    pub fn from_raw(raw: i64) -> Self {
        match ModuleId::from_raw(raw) {
            Some(module_id) => AttendanceEvent::Module(module_id),
            None => AttendanceEvent::SpecialClass(raw),
        }
    }

    pub fn raw_id(&self) -> i64 {
        match self {
            AttendanceEvent::Module(module_id) => module_id.get() as i64,
            AttendanceEvent::SpecialClass(raw) => *raw,
        }
    }

    pub fn module_id(&self) -> Option<ModuleId> {
        match self {
            AttendanceEvent::Module(module_id) => Some(*module_id),
            AttendanceEvent::SpecialClass(_) => None,
        }
    }
}

/// One entry of the attendance log. Every check-in produces one, including
/// repeats and special classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub participant_id: String,
    pub event: AttendanceEvent,
    pub attended_at: DateTime<Utc>,
}

/// How a check-in changed the participant, so views can pick their message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckInOutcome {
    /// A new module entered the completed set
    Recorded { graduated: bool },
    /// The module was already completed; the set is unchanged
    AlreadyCompleted,
    /// Non-curriculum session, logged only
    SpecialClass,
}

/// Result of applying one attendance event to a participant snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct CheckIn {
    pub participant: Participant,
    pub outcome: CheckInOutcome,
    pub record: AttendanceRecord,
}

/// Kiosk request as submitted from the check-in page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub participant_id: String,
    pub module: i64,
}

impl CheckInRequest {
    pub fn event(&self) -> AttendanceEvent {
        AttendanceEvent::from_raw(self.module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_splits_curriculum_and_special() {
        assert!(matches!(AttendanceEvent::from_raw(3), AttendanceEvent::Module(m) if m.get() == 3));
        assert_eq!(AttendanceEvent::from_raw(15), AttendanceEvent::SpecialClass(15));
        assert_eq!(AttendanceEvent::from_raw(0), AttendanceEvent::SpecialClass(0));
        assert_eq!(AttendanceEvent::from_raw(101).raw_id(), 101);
        assert_eq!(AttendanceEvent::from_raw(101).module_id(), None);
    }

    #[test]
    fn test_event_wire_shape() {
        let json = serde_json::to_value(AttendanceEvent::from_raw(4)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "module", "id": 4}));
        let special: AttendanceEvent = serde_json::from_str(r#"{"kind":"special_class","id":20}"#).unwrap();
        assert_eq!(special, AttendanceEvent::SpecialClass(20));
    }

    #[test]
    fn test_event_kind_follows_id_range() {
        let in_range: AttendanceEvent = serde_json::from_str(r#"{"kind":"special_class","id":5}"#).unwrap();
        assert_eq!(in_range, AttendanceEvent::from_raw(5));
        assert!(in_range.module_id().is_some());

        let out_of_range: AttendanceEvent = serde_json::from_str(r#"{"kind":"module","id":40}"#).unwrap();
        assert_eq!(out_of_range, AttendanceEvent::SpecialClass(40));
    }

    #[test]
    fn test_request_from_kiosk_payload() {
        let req: CheckInRequest = serde_json::from_str(r#"{"participantId":"f-2","module":7}"#).unwrap();
        assert_eq!(req.event().module_id().map(|m| m.get()), Some(7));
    }
}
