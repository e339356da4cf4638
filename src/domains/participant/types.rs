use crate::domains::curriculum::{next_module, ModuleId};
use crate::domains::participant::lifecycle::{self, Classification};
use crate::errors::{DomainResult, ValidationError};
use crate::validation::{common, Validate, ValidationBuilder};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Lifecycle status shown on every roster, dashboard and check-in view.
/// Always derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticipantStatus {
    Active,
    #[serde(rename = "At Risk")]
    AtRisk,
    Inactive,
    Graduated,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Active => "Active",
            ParticipantStatus::AtRisk => "At Risk",
            ParticipantStatus::Inactive => "Inactive",
            ParticipantStatus::Graduated => "Graduated",
        }
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse status assigned by CSV import, before any activity timestamp exists.
///
/// This rule only looks at the module count (Graduated at 14, At Risk below 2,
/// Active otherwise) and deliberately disagrees with the recency classifier in
/// [`lifecycle::classify`]. It is replaced by the canonical status on the
/// participant's first check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportPlaceholderStatus {
    Active,
    #[serde(rename = "At Risk")]
    AtRisk,
    Graduated,
}

impl ImportPlaceholderStatus {
    pub fn from_module_count(count: usize) -> Self {
        if count >= lifecycle::GRADUATION_MODULE_COUNT {
            ImportPlaceholderStatus::Graduated
        } else if count < 2 {
            ImportPlaceholderStatus::AtRisk
        } else {
            ImportPlaceholderStatus::Active
        }
    }

    pub fn as_status(&self) -> ParticipantStatus {
        match self {
            ImportPlaceholderStatus::Active => ParticipantStatus::Active,
            ImportPlaceholderStatus::AtRisk => ParticipantStatus::AtRisk,
            ImportPlaceholderStatus::Graduated => ParticipantStatus::Graduated,
        }
    }
}

/// Participant entity - an enrolled father being tracked through the curriculum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub last_name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_module_set")]
    pub completed_modules: BTreeSet<ModuleId>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub joined_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_datetime")]
    pub last_activity_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_status: Option<ImportPlaceholderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graduated_at: Option<DateTime<Utc>>,
}

impl Participant {
    /// Build a participant from a validated intake form
    pub fn from_intake(new_participant: NewParticipant, id: String, today: NaiveDate) -> DomainResult<Self> {
        new_participant.validate()?;

        let joined_date = match new_participant.joined_date.as_deref().map(str::trim) {
            Some(date) if !date.is_empty() => Some(
                NaiveDate::parse_from_str(date, "%Y-%m-%d")
                    .map_err(|_| ValidationError::format("joined_date", "must be in the format YYYY-MM-DD"))?,
            ),
            _ => Some(today),
        };

        Ok(Self {
            id,
            first_name: new_participant.first_name.trim().to_string(),
            last_name: new_participant.last_name.unwrap_or_default().trim().to_string(),
            phone: normalize_optional(new_participant.phone),
            email: normalize_optional(new_participant.email),
            completed_modules: BTreeSet::new(),
            joined_date,
            last_activity_date: None,
            import_status: None,
            graduated_at: None,
        })
    }

    pub fn full_name(&self) -> String {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.last_name),
            (false, true) => self.first_name.clone(),
            (true, _) => self.last_name.clone(),
        }
    }

    pub fn completed_count(&self) -> usize {
        self.completed_modules.len()
    }

    pub fn is_graduated(&self) -> bool {
        self.completed_count() >= lifecycle::GRADUATION_MODULE_COUNT
    }

    /// Apply an administrative contact edit, returning the new snapshot
    pub fn with_contact_update(&self, update: &UpdateParticipant) -> DomainResult<Self> {
        update.validate()?;
        let mut updated = self.clone();
        if let Some(phone) = &update.phone {
            updated.phone = normalize_optional(Some(phone.clone()));
        }
        if let Some(email) = &update.email {
            updated.email = normalize_optional(Some(email.clone()));
        }
        Ok(updated)
    }
}

/// NewParticipant DTO - single intake from the enrollment form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewParticipant {
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// YYYY-MM-DD; defaults to the intake day
    pub joined_date: Option<String>,
}

impl Validate for NewParticipant {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("first_name", Some(self.first_name.trim().to_string()))
            .required()
            .max_length(100)
            .validate()?;

        if let Some(last_name) = &self.last_name {
            ValidationBuilder::new("last_name", Some(last_name.clone()))
                .max_length(100)
                .validate()?;
        }
        validate_contact(&self.phone, &self.email)?;

        if let Some(joined_date) = self.joined_date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            common::validate_date_format(joined_date, "joined_date")?;
        }
        Ok(())
    }
}

/// UpdateParticipant DTO - contact edits. `None` leaves a field alone, an
/// empty string clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParticipant {
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Validate for UpdateParticipant {
    fn validate(&self) -> DomainResult<()> {
        validate_contact(&self.phone, &self.email)
    }
}

fn validate_contact(phone: &Option<String>, email: &Option<String>) -> DomainResult<()> {
    if let Some(phone) = normalize_optional(phone.clone()) {
        ValidationBuilder::new("phone", Some(phone)).phone().validate()?;
    }
    if let Some(email) = normalize_optional(email.clone()) {
        ValidationBuilder::new("email", Some(email)).email().validate()?;
    }
    Ok(())
}

/// ParticipantResponse DTO - the participant as the roster views consume it,
/// with every derived field computed for a single instant
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResponse {
    #[serde(flatten)]
    pub participant: Participant,
    pub status: ParticipantStatus,
    pub days_since_activity: u32,
    pub progress_percent: u8,
    pub graduating_soon: bool,
    pub next_module_id: Option<ModuleId>,
}

impl ParticipantResponse {
    pub fn new(participant: Participant, now: DateTime<Utc>) -> Self {
        let classification = lifecycle::classify(&participant, now);
        let Classification { days_since_activity, progress_percent, .. } = classification;
        Self {
            status: lifecycle::effective_status(&participant, now),
            days_since_activity,
            progress_percent,
            graduating_soon: classification.is_graduating_soon(),
            next_module_id: next_module(&participant.completed_modules).map(|m| m.id),
            participant,
        }
    }
}

/// Treat null, missing and whitespace-only strings identically
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a calendar date, accepting a full timestamp and keeping its date part
pub fn parse_lenient_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc).date_naive()))
}

/// Parse an ISO-8601 timestamp, accepting a bare date as midnight UTC
pub fn parse_lenient_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(normalize_optional(Option::<String>::deserialize(deserializer)?))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(|v| v.trim().to_string()).unwrap_or_default())
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(|value| {
        let parsed = parse_lenient_date(value);
        if parsed.is_none() && !value.trim().is_empty() {
            log::warn!("Ignoring unparseable joinedDate '{}'", value);
        }
        parsed
    }))
}

fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(|value| {
        let parsed = parse_lenient_datetime(value);
        if parsed.is_none() && !value.trim().is_empty() {
            log::warn!("Ignoring unparseable lastActivityDate '{}'", value);
        }
        parsed
    }))
}

/// Keep only distinct curriculum IDs; the backend has been seen sending
/// duplicates, numeric strings and special-class IDs in this array
fn lenient_module_set<'de, D>(deserializer: D) -> Result<BTreeSet<ModuleId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .iter()
        .filter_map(|value| match value {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        })
        .filter_map(ModuleId::from_raw)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_json_boundary_normalizes_loose_fields() {
        let json = r#"{
            "id": "f-12",
            "firstName": "Marcus",
            "lastName": "Hill",
            "phone": "",
            "email": null,
            "completedModules": [3, 1, 3, 15, 0, "2"],
            "joinedDate": "2024-01-08",
            "lastActivityDate": "not a date",
            "status": "Graduated"
        }"#;
        let p: Participant = serde_json::from_str(json).unwrap();
        assert_eq!(p.phone, None);
        assert_eq!(p.email, None);
        let ids: Vec<u8> = p.completed_modules.iter().map(|m| m.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(p.joined_date, NaiveDate::from_ymd_opt(2024, 1, 8));
        assert_eq!(p.last_activity_date, None);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let p: Participant = serde_json::from_str(r#"{"id": "f-1", "firstName": "Dre"}"#).unwrap();
        assert_eq!(p.last_name, "");
        assert!(p.completed_modules.is_empty());
        assert_eq!(p.joined_date, None);

        let p: Participant =
            serde_json::from_str(r#"{"id": "f-1", "firstName": "Dre", "lastName": null, "phone": null}"#).unwrap();
        assert_eq!(p.last_name, "");
        assert_eq!(p.phone, None);
    }

    #[test]
    fn test_response_shape_carries_derived_status() {
        let p = Participant {
            id: "f-3".to_string(),
            first_name: "Luis".to_string(),
            last_name: "Ortega".to_string(),
            phone: Some("2255550101".to_string()),
            email: None,
            completed_modules: ModuleId::first_n(13),
            joined_date: NaiveDate::from_ymd_opt(2024, 1, 8),
            last_activity_date: Some(Utc.with_ymd_and_hms(2024, 5, 30, 18, 0, 0).unwrap()),
            import_status: None,
            graduated_at: None,
        };
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let value = serde_json::to_value(ParticipantResponse::new(p, now)).unwrap();
        assert_eq!(value["status"], "Active");
        assert_eq!(value["firstName"], "Luis");
        assert_eq!(value["joinedDate"], "2024-01-08");
        assert_eq!(value["completedModules"].as_array().unwrap().len(), 13);
        assert_eq!(value["graduatingSoon"], true);
        assert_eq!(value["nextModuleId"], 14);
        assert_eq!(value["email"], serde_json::Value::Null);
    }

    #[test]
    fn test_intake_validation_and_defaults() {
        let p = Participant::from_intake(
            NewParticipant {
                first_name: "  Andre ".to_string(),
                last_name: None,
                phone: Some("(225) 555-0199".to_string()),
                email: Some("   ".to_string()),
                joined_date: None,
            },
            "f-9".to_string(),
            today(),
        )
        .unwrap();
        assert_eq!(p.first_name, "Andre");
        assert_eq!(p.last_name, "");
        assert_eq!(p.email, None);
        assert_eq!(p.joined_date, Some(today()));

        let missing_name = NewParticipant { first_name: " ".to_string(), ..Default::default() };
        assert!(Participant::from_intake(missing_name, "f-10".to_string(), today()).is_err());

        let bad_email = NewParticipant {
            first_name: "Tom".to_string(),
            email: Some("tom@".to_string()),
            ..Default::default()
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_contact_update_is_copy_on_write() {
        let original = Participant::from_intake(
            NewParticipant { first_name: "Ray".to_string(), phone: Some("2255550100".to_string()), ..Default::default() },
            "f-4".to_string(),
            today(),
        )
        .unwrap();
        let updated = original
            .with_contact_update(&UpdateParticipant { phone: Some(String::new()), email: Some("ray@example.org".to_string()) })
            .unwrap();
        assert_eq!(original.phone.as_deref(), Some("2255550100"));
        assert_eq!(updated.phone, None);
        assert_eq!(updated.email.as_deref(), Some("ray@example.org"));
    }

    #[test]
    fn test_placeholder_rule() {
        assert_eq!(ImportPlaceholderStatus::from_module_count(0), ImportPlaceholderStatus::AtRisk);
        assert_eq!(ImportPlaceholderStatus::from_module_count(1), ImportPlaceholderStatus::AtRisk);
        assert_eq!(ImportPlaceholderStatus::from_module_count(2), ImportPlaceholderStatus::Active);
        assert_eq!(ImportPlaceholderStatus::from_module_count(13), ImportPlaceholderStatus::Active);
        assert_eq!(ImportPlaceholderStatus::from_module_count(14), ImportPlaceholderStatus::Graduated);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(serde_json::to_string(&ParticipantStatus::AtRisk).unwrap(), "\"At Risk\"");
        assert_eq!(ParticipantStatus::Inactive.to_string(), "Inactive");
    }
}
