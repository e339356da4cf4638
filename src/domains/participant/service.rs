use crate::domains::attendance::qr::{check_in_url, qr_image_url, DEFAULT_QR_SIZE};
use crate::domains::attendance::{check_in, AttendanceRecord, CheckInOutcome, CheckInRequest};
use crate::domains::core::clock::Clock;
use crate::domains::export::{export_csv, parse_csv};
use crate::domains::participant::lifecycle::classify;
use crate::domains::participant::repository::ParticipantRepository;
use crate::domains::participant::types::{
    NewParticipant, Participant, ParticipantResponse, ParticipantStatus, UpdateParticipant,
};
use crate::errors::{DomainError, ServiceError, ServiceResult};
use crate::types::{PaginatedResult, PaginationParams};
use crate::validation::common;
use async_trait::async_trait;
use futures::future::try_join_all;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Roster filter used by the dashboard tabs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterQuery {
    pub status: Option<ParticipantStatus>,
    /// Case-insensitive match against the full name
    pub search: Option<String>,
}

/// Check-in result as returned to the kiosk view
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    pub participant: ParticipantResponse,
    pub outcome: CheckInOutcome,
    pub record: AttendanceRecord,
}

/// What a bulk import did
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    pub skipped_rows: usize,
    pub participant_ids: Vec<String>,
    /// Rows whose ID was already on the roster, or repeated within the file
    pub existing_ids: Vec<String>,
}

/// Dashboard header counts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterSummary {
    pub total: usize,
    pub active: usize,
    pub at_risk: usize,
    pub inactive: usize,
    pub graduated: usize,
    pub average_progress_percent: u8,
    /// Participants one module short of graduating
    pub graduating_soon: Vec<String>,
}

/// Printable check-in link for one participant and session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInLink {
    pub url: String,
    pub qr_image_url: String,
}

/// Trait defining roster service operations
#[async_trait]
pub trait RosterService: Send + Sync {
    /// Participants ordered most inactive first
    async fn list_roster(
        &self,
        query: RosterQuery,
        params: PaginationParams,
    ) -> ServiceResult<PaginatedResult<ParticipantResponse>>;

    async fn get_participant(&self, id: &str) -> ServiceResult<ParticipantResponse>;

    async fn add_participant(&self, new_participant: NewParticipant) -> ServiceResult<ParticipantResponse>;

    async fn update_contact(&self, id: &str, update: UpdateParticipant) -> ServiceResult<ParticipantResponse>;

    async fn record_check_in(&self, request: CheckInRequest) -> ServiceResult<CheckInResponse>;

    async fn import_csv(&self, text: &str) -> ServiceResult<ImportReport>;

    async fn export_csv(&self) -> ServiceResult<String>;

    /// Write the export to `path`, returning the number of bytes written
    async fn export_csv_to_file(&self, path: &Path) -> ServiceResult<usize>;

    async fn summary(&self) -> ServiceResult<RosterSummary>;

    async fn attendance_for(&self, participant_id: &str) -> ServiceResult<Vec<AttendanceRecord>>;

    async fn check_in_link(&self, participant_id: &str, module: i64, size: Option<u32>) -> ServiceResult<CheckInLink>;
}

/// Implementation of the roster service
#[derive(Clone)]
pub struct RosterServiceImpl {
    repo: Arc<dyn ParticipantRepository>,
    clock: Arc<dyn Clock>,
    checkin_base_url: String,
    qr_generator_url: String,
}

impl RosterServiceImpl {
    pub fn new(
        repo: Arc<dyn ParticipantRepository>,
        clock: Arc<dyn Clock>,
        checkin_base_url: impl Into<String>,
        qr_generator_url: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            clock,
            checkin_base_url: checkin_base_url.into(),
            qr_generator_url: qr_generator_url.into(),
        }
    }

    async fn responses(&self) -> ServiceResult<Vec<ParticipantResponse>> {
        let now = self.clock.now();
        Ok(self
            .repo
            .list()
            .await?
            .into_iter()
            .map(|p| ParticipantResponse::new(p, now))
            .collect())
    }

    async fn save(&self, participant: Participant) -> ServiceResult<ParticipantResponse> {
        let response = ParticipantResponse::new(participant, self.clock.now());
        self.repo.save(&response).await?;
        Ok(response)
    }
}

#[async_trait]
impl RosterService for RosterServiceImpl {
    async fn list_roster(
        &self,
        query: RosterQuery,
        params: PaginationParams,
    ) -> ServiceResult<PaginatedResult<ParticipantResponse>> {
        let needle = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase);

        let mut roster: Vec<ParticipantResponse> = self
            .responses()
            .await?
            .into_iter()
            .filter(|r| query.status.map_or(true, |s| r.status == s))
            .filter(|r| {
                needle
                    .as_ref()
                    .map_or(true, |n| r.participant.full_name().to_lowercase().contains(n.as_str()))
            })
            .collect();

        roster.sort_by(|a, b| {
            b.days_since_activity
                .cmp(&a.days_since_activity)
                .then_with(|| a.participant.full_name().cmp(&b.participant.full_name()))
        });

        debug!("Listing roster: {} matches, page {}", roster.len(), params.page);
        Ok(PaginatedResult::from_all(roster, params))
    }

    async fn get_participant(&self, id: &str) -> ServiceResult<ParticipantResponse> {
        let participant = self.repo.find_by_id(id).await?;
        Ok(ParticipantResponse::new(participant, self.clock.now()))
    }

    async fn add_participant(&self, new_participant: NewParticipant) -> ServiceResult<ParticipantResponse> {
        let participant = Participant::from_intake(new_participant, Uuid::new_v4().to_string(), self.clock.today())?;
        info!("Enrolled participant {} ({})", participant.id, participant.full_name());
        self.save(participant).await
    }

    async fn update_contact(&self, id: &str, update: UpdateParticipant) -> ServiceResult<ParticipantResponse> {
        let current = self.repo.find_by_id(id).await?;
        let updated = current.with_contact_update(&update)?;
        self.save(updated).await
    }

    async fn record_check_in(&self, request: CheckInRequest) -> ServiceResult<CheckInResponse> {
        let current = self.repo.find_by_id(&request.participant_id).await?;
        let now = self.clock.now();
        let result = check_in(&current, request.event(), now);

        // The log entry lands first so a failed write leaves the module open for a retry
        self.repo.append_attendance(&result.record).await?;
        let participant = ParticipantResponse::new(result.participant, now);
        self.repo.save(&participant).await?;

        if let CheckInOutcome::Recorded { graduated: true } = result.outcome {
            info!("Participant {} completed all modules and graduated", request.participant_id);
        }

        Ok(CheckInResponse {
            participant,
            outcome: result.outcome,
            record: result.record,
        })
    }

    async fn import_csv(&self, text: &str) -> ServiceResult<ImportReport> {
        let import = parse_csv(text, self.clock.today());
        let now = self.clock.now();
        let mut known: HashSet<String> = self.repo.list().await?.into_iter().map(|p| p.id).collect();

        // Import only enrolls; anyone already on the roster keeps their record
        let mut existing_ids = Vec::new();
        let mut responses = Vec::new();
        for participant in import.participants {
            if known.insert(participant.id.clone()) {
                responses.push(ParticipantResponse::new(participant, now));
            } else {
                existing_ids.push(participant.id);
            }
        }

        try_join_all(responses.iter().map(|r| self.repo.save(r))).await?;

        let participant_ids: Vec<String> = responses.into_iter().map(|r| r.participant.id).collect();
        if !existing_ids.is_empty() {
            warn!("CSV import left {} existing participants untouched", existing_ids.len());
        }
        info!("Imported {} participants from CSV, skipped {} rows", participant_ids.len(), import.skipped_rows);
        Ok(ImportReport {
            imported: participant_ids.len(),
            skipped_rows: import.skipped_rows,
            participant_ids,
            existing_ids,
        })
    }

    async fn export_csv(&self) -> ServiceResult<String> {
        let participants = self.repo.list().await?;
        Ok(export_csv(&participants, self.clock.now())?)
    }

    async fn export_csv_to_file(&self, path: &Path) -> ServiceResult<usize> {
        let csv = self.export_csv().await?;
        tokio::fs::write(path, csv.as_bytes()).await.map_err(|e| {
            ServiceError::Domain(DomainError::Internal(format!("Failed to write {}: {}", path.display(), e)))
        })?;
        info!("Exported roster to {}", path.display());
        Ok(csv.len())
    }

    async fn summary(&self) -> ServiceResult<RosterSummary> {
        let now = self.clock.now();
        let participants = self.repo.list().await?;
        let mut summary = RosterSummary { total: participants.len(), ..RosterSummary::default() };
        let mut progress_total = 0usize;

        for participant in &participants {
            let response = ParticipantResponse::new(participant.clone(), now);
            match response.status {
                ParticipantStatus::Active => summary.active += 1,
                ParticipantStatus::AtRisk => summary.at_risk += 1,
                ParticipantStatus::Inactive => summary.inactive += 1,
                ParticipantStatus::Graduated => summary.graduated += 1,
            }
            progress_total += response.progress_percent as usize;
            if classify(participant, now).is_graduating_soon() {
                summary.graduating_soon.push(participant.id.clone());
            }
        }

        if summary.total > 0 {
            summary.average_progress_percent = ((progress_total * 2 + summary.total) / (summary.total * 2)) as u8;
        }
        Ok(summary)
    }

    async fn attendance_for(&self, participant_id: &str) -> ServiceResult<Vec<AttendanceRecord>> {
        self.repo.find_by_id(participant_id).await?;
        self.repo.list_attendance(participant_id).await
    }

    async fn check_in_link(&self, participant_id: &str, module: i64, size: Option<u32>) -> ServiceResult<CheckInLink> {
        let size = size.unwrap_or(DEFAULT_QR_SIZE);
        common::validate_qr_size(size)?;
        self.repo.find_by_id(participant_id).await?;
        let request = CheckInRequest { participant_id: participant_id.to_string(), module };
        let url = check_in_url(&self.checkin_base_url, participant_id, request.event());
        Ok(CheckInLink {
            qr_image_url: qr_image_url(&self.qr_generator_url, &url, size),
            url,
        })
    }
}
