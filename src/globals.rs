use crate::config::AppConfig;
use crate::domains::core::clock::{Clock, SystemClock};
use crate::domains::participant::demo::demo_roster;
use crate::domains::participant::repository::{
    ApiParticipantRepository, InMemoryParticipantRepository, ParticipantRepository,
};
use crate::domains::participant::service::{RosterService, RosterServiceImpl};
use crate::errors::ServiceResult;
use crate::ffi::error::{FFIError, FFIResult};
use lazy_static::lazy_static;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// Global state definitions
lazy_static! {
    static ref INIT_MUTEX: Mutex<()> = Mutex::new(());
    static ref INITIALIZED: AtomicBool = AtomicBool::new(false);
    static ref ROSTER_SERVICE: Mutex<Option<Arc<dyn RosterService>>> = Mutex::new(None);
}

pub fn get_roster_service() -> FFIResult<Arc<dyn RosterService>> {
    ROSTER_SERVICE.lock().map_err(|_| FFIError::internal("ROSTER_SERVICE lock poisoned".to_string()))?.clone().ok_or_else(|| FFIError::internal("RosterService not initialized".to_string()))
}

pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

/// Initialize global services. Calls after the first successful one are no-ops.
pub fn initialize(config: AppConfig) -> FFIResult<()> {
    let _guard = INIT_MUTEX.lock().map_err(|_| FFIError::internal("INIT_MUTEX lock poisoned".to_string()))?;

    if INITIALIZED.load(Ordering::Acquire) {
        return Ok(());
    }

    let result = initialize_internal(config);

    // Mark as initialized only if successful
    if result.is_ok() {
        INITIALIZED.store(true, Ordering::Release);
    }

    result
}

fn initialize_internal(config: AppConfig) -> FFIResult<()> {
    // Initialize logging first
    if std::env::var("RUST_LOG").is_err() {
        #[cfg(debug_assertions)]
        std::env::set_var("RUST_LOG", "debug");
        #[cfg(not(debug_assertions))]
        std::env::set_var("RUST_LOG", "info");
    }
    let _ = env_logger::try_init();

    log::info!("Starting roster initialization");
    config.validate()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let repo = build_repository(&config, clock.as_ref())?;
    let service: Arc<dyn RosterService> = Arc::new(RosterServiceImpl::new(
        repo,
        clock,
        config.checkin_base_url.clone(),
        config.qr_generator_url.clone(),
    ));

    *ROSTER_SERVICE.lock().map_err(|_| FFIError::internal("ROSTER_SERVICE lock poisoned".to_string()))? = Some(service);

    log::info!("Roster initialization complete");
    Ok(())
}

/// Pick the participant data source. Demo data is never a silent fallback.
fn build_repository(config: &AppConfig, clock: &dyn Clock) -> ServiceResult<Arc<dyn ParticipantRepository>> {
    if config.use_demo_data {
        log::warn!("Demo data enabled: serving the built-in sample roster, no changes reach the API");
        return Ok(Arc::new(InMemoryParticipantRepository::with_seed(demo_roster(clock.today()))));
    }
    let repo = ApiParticipantRepository::from_config(config)?;
    log::debug!("Using API participant repository (timeout {}s)", config.request_timeout_secs);
    Ok(Arc::new(repo))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_repository_requires_opt_in() {
        let clock = SystemClock;
        let no_api = AppConfig { use_demo_data: false, api_base_url: None, ..AppConfig::default() };
        assert!(build_repository(&no_api, &clock).is_err());

        let demo = AppConfig { use_demo_data: true, ..AppConfig::default() };
        assert!(build_repository(&demo, &clock).is_ok());
    }
}
