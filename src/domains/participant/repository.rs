use crate::config::AppConfig;
use crate::domains::attendance::AttendanceRecord;
use crate::domains::participant::types::{Participant, ParticipantResponse};
use crate::errors::{DomainError, ServiceError, ServiceResult};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// Trait defining participant data source operations
#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    /// All participants, ordered by ID
    async fn list(&self) -> ServiceResult<Vec<Participant>>;

    async fn find_by_id(&self, id: &str) -> ServiceResult<Participant>;

    /// Insert or replace a participant. The response carries the derived
    /// status so the backend can display it without recomputing.
    async fn save(&self, participant: &ParticipantResponse) -> ServiceResult<()>;

    async fn append_attendance(&self, record: &AttendanceRecord) -> ServiceResult<()>;

    async fn list_attendance(&self, participant_id: &str) -> ServiceResult<Vec<AttendanceRecord>>;
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::Domain(DomainError::EntityNotFound("Participant".to_string(), id.to_string()))
}

/// Gateway and maintenance responses are retryable; anything else is a backend fault
fn status_error(status: StatusCode, body: &str) -> ServiceError {
    match status {
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            ServiceError::ServiceUnavailable(format!("Server returned {}: {}", status, body))
        }
        _ => ServiceError::ExternalService(format!("Server returned error {}: {}", status, body)),
    }
}

/// Participant store held in memory; used for demo mode and tests
#[derive(Default)]
pub struct InMemoryParticipantRepository {
    participants: RwLock<HashMap<String, Participant>>,
    attendance: RwLock<Vec<AttendanceRecord>>,
}

impl InMemoryParticipantRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: Vec<Participant>) -> Self {
        let participants = seed.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            participants: RwLock::new(participants),
            attendance: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ParticipantRepository for InMemoryParticipantRepository {
    async fn list(&self) -> ServiceResult<Vec<Participant>> {
        let mut all: Vec<Participant> = self.participants.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn find_by_id(&self, id: &str) -> ServiceResult<Participant> {
        self.participants
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn save(&self, participant: &ParticipantResponse) -> ServiceResult<()> {
        let p = &participant.participant;
        self.participants.write().await.insert(p.id.clone(), p.clone());
        Ok(())
    }

    async fn append_attendance(&self, record: &AttendanceRecord) -> ServiceResult<()> {
        self.attendance.write().await.push(record.clone());
        Ok(())
    }

    async fn list_attendance(&self, participant_id: &str) -> ServiceResult<Vec<AttendanceRecord>> {
        Ok(self
            .attendance
            .read()
            .await
            .iter()
            .filter(|r| r.participant_id == participant_id)
            .cloned()
            .collect())
    }
}

/// Participant data source backed by the program's REST API
pub struct ApiParticipantRepository {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl ApiParticipantRepository {
    pub fn new(base_url: &str, api_token: Option<String>, timeout: Duration) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ServiceError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    pub fn from_config(config: &AppConfig) -> ServiceResult<Self> {
        let base_url = config
            .api_base_url
            .as_deref()
            .ok_or_else(|| ServiceError::Configuration("api_base_url is not set".to_string()))?;
        Self::new(base_url, config.api_token.clone(), config.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> ServiceResult<Response> {
        let response = self.authorize(request).send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                ServiceError::Network(format!("Failed to {}: {}", action, e))
            } else {
                ServiceError::ExternalService(format!("Failed to {}: {}", action, e))
            }
        })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to get error details".to_string());
            Err(status_error(status, &error_text))
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response, action: &str) -> ServiceResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::ExternalService(format!("Failed to parse {} response: {}", action, e)))
    }
}

#[async_trait]
impl ParticipantRepository for ApiParticipantRepository {
    async fn list(&self) -> ServiceResult<Vec<Participant>> {
        debug!("Fetching participant roster from {}", self.base_url);
        let response = self.send(self.client.get(self.url("fathers")), "fetch roster").await?;
        let mut all: Vec<Participant> = Self::parse(response, "roster").await?;
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn find_by_id(&self, id: &str) -> ServiceResult<Participant> {
        let url = self.url(&format!("fathers/{}", urlencoding::encode(id)));
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(ServiceError::from)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(not_found(id));
        }
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to get error details".to_string());
            return Err(status_error(status, &error_text));
        }
        Self::parse(response, "participant").await
    }

    async fn save(&self, participant: &ParticipantResponse) -> ServiceResult<()> {
        let id = &participant.participant.id;
        debug!("Saving participant {} ({})", id, participant.status);
        let url = self.url(&format!("fathers/{}", urlencoding::encode(id)));
        self.send(self.client.put(&url).json(participant), "save participant").await?;
        Ok(())
    }

    async fn append_attendance(&self, record: &AttendanceRecord) -> ServiceResult<()> {
        let response = self
            .send(self.client.post(self.url("attendance")).json(record), "record attendance")
            .await;
        if let Err(e) = &response {
            warn!("Attendance log write failed for {}: {}", record.participant_id, e);
        }
        response.map(|_| ())
    }

    async fn list_attendance(&self, participant_id: &str) -> ServiceResult<Vec<AttendanceRecord>> {
        let url = self.url(&format!("attendance?participantId={}", urlencoding::encode(participant_id)));
        let response = self.send(self.client.get(&url), "fetch attendance").await?;
        Self::parse(response, "attendance").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::attendance::AttendanceEvent;
    use crate::domains::curriculum::ModuleId;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn participant(id: &str) -> Participant {
        Participant {
            id: id.to_string(),
            first_name: "Kevin".to_string(),
            last_name: "Moore".to_string(),
            phone: None,
            email: None,
            completed_modules: ModuleId::first_n(2),
            joined_date: None,
            last_activity_date: None,
            import_status: None,
            graduated_at: None,
        }
    }

    #[tokio::test]
    async fn test_in_memory_find_and_save() {
        let repo = InMemoryParticipantRepository::with_seed(vec![participant("b"), participant("a")]);
        let ids: Vec<String> = repo.list().await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let err = repo.find_by_id("zzz").await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::EntityNotFound(ref e, ref id)) if e == "Participant" && id == "zzz"));

        let mut updated = participant("a");
        updated.first_name = "Kev".to_string();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        repo.save(&ParticipantResponse::new(updated, now)).await.unwrap();
        assert_eq!(repo.find_by_id("a").await.unwrap().first_name, "Kev");
    }

    #[tokio::test]
    async fn test_in_memory_attendance_is_per_participant() {
        let repo = InMemoryParticipantRepository::new();
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();
        for (pid, raw) in [("a", 1), ("b", 1), ("a", 20)] {
            repo.append_attendance(&AttendanceRecord {
                id: Uuid::new_v4(),
                participant_id: pid.to_string(),
                event: AttendanceEvent::from_raw(raw),
                attended_at: at,
            })
            .await
            .unwrap();
        }
        let log = repo.list_attendance("a").await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].event, AttendanceEvent::SpecialClass(20));
    }

    #[test]
    fn test_api_urls() {
        let repo = ApiParticipantRepository::new("https://api.example.org/v1/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(repo.url("fathers"), "https://api.example.org/v1/fathers");
        assert_eq!(repo.url("/attendance"), "https://api.example.org/v1/attendance");
    }

    #[test]
    fn test_status_errors() {
        assert!(matches!(status_error(StatusCode::SERVICE_UNAVAILABLE, "down"), ServiceError::ServiceUnavailable(_)));
        assert!(matches!(status_error(StatusCode::BAD_GATEWAY, ""), ServiceError::ServiceUnavailable(_)));
        assert!(matches!(status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom"), ServiceError::ExternalService(_)));
    }

    #[test]
    fn test_api_requires_base_url() {
        let config = AppConfig { api_base_url: None, ..AppConfig::default() };
        assert!(matches!(ApiParticipantRepository::from_config(&config), Err(ServiceError::Configuration(_))));
    }
}
