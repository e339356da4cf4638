// src/ffi/roster.rs
// ============================================================================
// FFI bindings for the `RosterService` and the pure roster helpers.
// These wrappers (1) decode the JSON payload coming from Swift, (2) forward
// the request to the service on the shared runtime, (3) encode the result into
// JSON, and (4) hand the string back across the FFI boundary.
//
// Memory ownership rules:
//   - Any *mut c_char written to `result` must be released with `roster_free`.
//   - Never pass the same pointer to `roster_free` twice.
//   - Null or non-UTF-8 payloads are rejected with an error code, never a crash.
//
// Every function returns 0 on success and an `ErrorCode` otherwise. Payload
// shapes are documented above each function; keys are camelCase.
// ----------------------------------------------------------------------------

use crate::config::AppConfig;
use crate::domains::attendance::{check_in, CheckInRequest};
use crate::domains::curriculum::{catalog, next_module, remaining_modules, Module, ModuleId};
use crate::domains::export::parse_csv;
use crate::domains::participant::lifecycle::{classify, Classification};
use crate::domains::participant::service::{CheckInResponse, RosterQuery};
use crate::domains::participant::types::{NewParticipant, Participant, ParticipantResponse, UpdateParticipant};
use crate::ffi::error::FFIError;
use crate::ffi::{block_on_async, handle_status_result, read_payload, write_result};
use crate::globals;
use crate::types::PaginationParams;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::path::PathBuf;

/// Ensure pointer is not null
macro_rules! ensure_ptr {
    ($ptr:expr) => {
        if $ptr.is_null() {
            return Err(FFIError::null_pointer(stringify!($ptr)));
        }
    };
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdPayload {
    id: String,
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Initialize the library. Pass null to read configuration from the environment.
/// Expected JSON payload: `AppConfig`
/// { "api_base_url": "https://...", "api_token": null, "checkin_base_url": "...",
///   "qr_generator_url": "...", "request_timeout_secs": 30, "use_demo_data": false }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn roster_initialize(config_json: *const c_char) -> c_int {
    handle_status_result(|| unsafe {
        let config = if config_json.is_null() {
            AppConfig::from_env()?
        } else {
            read_payload::<AppConfig>(config_json)?
        };
        globals::initialize(config)
    })
}

/// Free a string previously returned through a `result` pointer
#[unsafe(no_mangle)]
pub unsafe extern "C" fn roster_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}

// ---------------------------------------------------------------------------
// Roster service
// ---------------------------------------------------------------------------

/// List the roster, most inactive first
/// Expected JSON payload:
/// { "query": { "status": "At Risk", "search": "hill" }, "pagination": { "page": 1, "per_page": 20 } }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn roster_list(payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(result);

        #[derive(Deserialize, Default)]
        #[serde(default)]
        struct Payload {
            query: RosterQuery,
            pagination: Option<PaginationParams>,
        }

        let p: Payload = if payload_json.is_null() { Payload::default() } else { read_payload(payload_json)? };
        let svc = globals::get_roster_service()?;
        let page = block_on_async(svc.list_roster(p.query, p.pagination.unwrap_or_default()))?;
        write_result(result, &page)
    })
}

/// Get one participant with derived status
/// Expected JSON payload: { "id": "string" }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn roster_get(payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(result);
        let p: IdPayload = read_payload(payload_json)?;
        let svc = globals::get_roster_service()?;
        let participant = block_on_async(svc.get_participant(&p.id))?;
        write_result(result, &participant)
    })
}

/// Enroll a participant from the intake form
/// Expected JSON payload:
/// { "participant": { "firstName": "string", "lastName": "string", "phone": "string",
///                    "email": "string", "joinedDate": "YYYY-MM-DD" } }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn roster_add(payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(result);

        #[derive(Deserialize)]
        struct Payload {
            participant: NewParticipant,
        }

        let p: Payload = read_payload(payload_json)?;
        let svc = globals::get_roster_service()?;
        let participant = block_on_async(svc.add_participant(p.participant))?;
        write_result(result, &participant)
    })
}

/// Edit contact details; an empty string clears a field
/// Expected JSON payload: { "id": "string", "update": { "phone": "string", "email": "string" } }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn roster_update_contact(payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(result);

        #[derive(Deserialize)]
        struct Payload {
            id: String,
            update: UpdateParticipant,
        }

        let p: Payload = read_payload(payload_json)?;
        let svc = globals::get_roster_service()?;
        let participant = block_on_async(svc.update_contact(&p.id, p.update))?;
        write_result(result, &participant)
    })
}

/// Record attendance from the kiosk
/// Expected JSON payload: { "participantId": "string", "module": 7 }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn roster_check_in(payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(result);
        let request: CheckInRequest = read_payload(payload_json)?;
        let svc = globals::get_roster_service()?;
        let response = block_on_async(svc.record_check_in(request))?;
        write_result(result, &response)
    })
}

/// Bulk import a roster CSV
/// Expected JSON payload: { "csv": "string" }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn roster_import_csv(payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(result);

        #[derive(Deserialize)]
        struct Payload {
            csv: String,
        }

        let p: Payload = read_payload(payload_json)?;
        let svc = globals::get_roster_service()?;
        let report = block_on_async(svc.import_csv(&p.csv))?;
        write_result(result, &report)
    })
}

/// Export the roster as CSV, optionally straight to a file
/// Expected JSON payload: { "path": "optional/file/path.csv" } or null
#[unsafe(no_mangle)]
pub unsafe extern "C" fn roster_export_csv(payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(result);

        #[derive(Deserialize, Default)]
        #[serde(default)]
        struct Payload {
            path: Option<PathBuf>,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            csv: Option<String>,
            path: Option<String>,
            bytes_written: usize,
        }

        let p: Payload = if payload_json.is_null() { Payload::default() } else { read_payload(payload_json)? };
        let svc = globals::get_roster_service()?;
        let response = match p.path {
            Some(path) => {
                let bytes_written = block_on_async(svc.export_csv_to_file(&path))?;
                Response { csv: None, path: Some(path.display().to_string()), bytes_written }
            }
            None => {
                let csv = block_on_async(svc.export_csv())?;
                Response { bytes_written: csv.len(), csv: Some(csv), path: None }
            }
        };
        write_result(result, &response)
    })
}

/// Dashboard counts. Payload is ignored and may be null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn roster_summary(_payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(result);
        let svc = globals::get_roster_service()?;
        let summary = block_on_async(svc.summary())?;
        write_result(result, &summary)
    })
}

/// Attendance log for one participant, including special classes
/// Expected JSON payload: { "id": "string" }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn roster_attendance(payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(result);
        let p: IdPayload = read_payload(payload_json)?;
        let svc = globals::get_roster_service()?;
        let records = block_on_async(svc.attendance_for(&p.id))?;
        write_result(result, &records)
    })
}

/// Check-in link and QR image URL for a participant and session
/// Expected JSON payload: { "participantId": "string", "module": 7, "size": 200 }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn roster_check_in_link(payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(result);

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            participant_id: String,
            module: i64,
            size: Option<u32>,
        }

        let p: Payload = read_payload(payload_json)?;
        let svc = globals::get_roster_service()?;
        let link = block_on_async(svc.check_in_link(&p.participant_id, p.module, p.size))?;
        write_result(result, &link)
    })
}

// ---------------------------------------------------------------------------
// Pure helpers (no initialization required)
// ---------------------------------------------------------------------------

/// Classify a participant snapshot
/// Expected JSON payload: { "participant": { Participant }, "now": "ISO-8601, optional" }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn roster_classify(payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(result);

        #[derive(Deserialize)]
        struct Payload {
            participant: Participant,
            now: Option<DateTime<Utc>>,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            classification: Classification,
            participant: ParticipantResponse,
        }

        let p: Payload = read_payload(payload_json)?;
        let now = p.now.unwrap_or_else(Utc::now);
        let response = Response {
            classification: classify(&p.participant, now),
            participant: ParticipantResponse::new(p.participant, now),
        };
        write_result(result, &response)
    })
}

/// Apply a check-in to a snapshot without saving it
/// Expected JSON payload: { "participant": { Participant }, "module": 7, "at": "ISO-8601, optional" }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn roster_check_in_preview(payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(result);

        #[derive(Deserialize)]
        struct Payload {
            participant: Participant,
            module: i64,
            at: Option<DateTime<Utc>>,
        }

        let p: Payload = read_payload(payload_json)?;
        let at = p.at.unwrap_or_else(Utc::now);
        let request = CheckInRequest { participant_id: p.participant.id.clone(), module: p.module };
        let outcome = check_in(&p.participant, request.event(), at);
        let response = CheckInResponse {
            participant: ParticipantResponse::new(outcome.participant, at),
            outcome: outcome.outcome,
            record: outcome.record,
        };
        write_result(result, &response)
    })
}

/// Parse a roster CSV without saving it
/// Expected JSON payload: { "csv": "string", "importedOn": "YYYY-MM-DD, optional" }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn roster_parse_csv(payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(result);

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            csv: String,
            imported_on: Option<NaiveDate>,
        }

        let p: Payload = read_payload(payload_json)?;
        let imported_on = p.imported_on.unwrap_or_else(|| Utc::now().date_naive());
        write_result(result, &parse_csv(&p.csv, imported_on))
    })
}

/// Curriculum catalog, optionally annotated with a participant's progress
/// Expected JSON payload: null, or { "completedModules": [1, 2, 3] }
#[unsafe(no_mangle)]
pub unsafe extern "C" fn roster_curriculum(payload_json: *const c_char, result: *mut *mut c_char) -> c_int {
    handle_status_result(|| unsafe {
        ensure_ptr!(result);

        #[derive(Deserialize, Default)]
        #[serde(rename_all = "camelCase", default)]
        struct Payload {
            completed_modules: Vec<i64>,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            modules: &'static [Module],
            remaining: Vec<&'static Module>,
            next: Option<&'static Module>,
        }

        let p: Payload = if payload_json.is_null() { Payload::default() } else { read_payload(payload_json)? };
        let completed: BTreeSet<ModuleId> = p.completed_modules.into_iter().filter_map(ModuleId::from_raw).collect();
        let response = Response {
            modules: catalog(),
            remaining: remaining_modules(&completed),
            next: next_module(&completed),
        };
        write_result(result, &response)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::error::ErrorCode;
    use std::ffi::CStr;
    use std::ptr;

    fn call(f: unsafe extern "C" fn(*const c_char, *mut *mut c_char) -> c_int, payload: Option<&str>) -> (c_int, Option<serde_json::Value>) {
        let payload = payload.map(|p| CString::new(p).unwrap());
        let payload_ptr = payload.as_ref().map_or(ptr::null(), |p| p.as_ptr());
        let mut out: *mut c_char = ptr::null_mut();
        let code = unsafe { f(payload_ptr, &mut out) };
        let value = if out.is_null() {
            None
        } else {
            let json = unsafe { CStr::from_ptr(out) }.to_str().unwrap().to_string();
            unsafe { roster_free(out) };
            Some(serde_json::from_str(&json).unwrap())
        };
        (code, value)
    }

    #[test]
    fn test_classify_boundary() {
        let payload = r#"{
            "participant": {"id": "f-1", "firstName": "Marcus", "completedModules": [1,2,3,4,5],
                            "lastActivityDate": "2024-05-18T12:00:00Z"},
            "now": "2024-06-01T12:00:00Z"
        }"#;
        let (code, value) = call(roster_classify, Some(payload));
        assert_eq!(code, 0);
        let value = value.unwrap();
        assert_eq!(value["classification"]["status"], "At Risk");
        assert_eq!(value["classification"]["daysSinceActivity"], 14);
        assert_eq!(value["participant"]["progressPercent"], 36);
    }

    #[test]
    fn test_check_in_preview_reports_outcome() {
        let payload = r#"{
            "participant": {"id": "f-1", "firstName": "Marcus", "completedModules": [1,2,3,4,5,6,7,8,9,10,11,12,13]},
            "module": 14,
            "at": "2024-06-01T18:00:00Z"
        }"#;
        let (code, value) = call(roster_check_in_preview, Some(payload));
        assert_eq!(code, 0);
        let value = value.unwrap();
        assert_eq!(value["outcome"]["type"], "recorded");
        assert_eq!(value["outcome"]["graduated"], true);
        assert_eq!(value["participant"]["status"], "Graduated");
    }

    #[test]
    fn test_parse_csv_boundary() {
        let payload = serde_json::json!({
            "csv": "id,name,phone,email,count\n\"7\",\"Smith, Jr.\",2255551212,,3\nbad\n",
            "importedOn": "2024-06-01"
        })
        .to_string();
        let (code, value) = call(roster_parse_csv, Some(&payload));
        assert_eq!(code, 0);
        let value = value.unwrap();
        assert_eq!(value["skippedRows"], 1);
        assert_eq!(value["participants"][0]["lastName"], "Smith, Jr.");
        assert_eq!(value["participants"][0]["completedModules"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_curriculum_catalog() {
        let (code, value) = call(roster_curriculum, Some(r#"{"completedModules": [1, 2, 99]}"#));
        assert_eq!(code, 0);
        let value = value.unwrap();
        assert_eq!(value["modules"].as_array().unwrap().len(), 14);
        assert_eq!(value["remaining"].as_array().unwrap().len(), 12);
        assert_eq!(value["next"]["id"], 3);
    }

    #[test]
    fn test_bad_payloads_return_codes() {
        let (code, value) = call(roster_classify, None);
        assert_eq!(code, ErrorCode::NullPointer as c_int);
        assert!(value.is_none());

        let (code, _) = call(roster_classify, Some("{not json"));
        assert_eq!(code, ErrorCode::InvalidArgument as c_int);

        let code = unsafe { roster_classify(ptr::null(), ptr::null_mut()) };
        assert_eq!(code, ErrorCode::NullPointer as c_int);
    }

    #[test]
    fn test_service_calls_after_demo_initialize() {
        let config = CString::new(r#"{"use_demo_data": true, "checkin_base_url": "https://kiosk.example.org"}"#).unwrap();
        assert_eq!(unsafe { roster_initialize(config.as_ptr()) }, 0);

        let (code, value) = call(roster_list, None);
        assert_eq!(code, 0);
        assert!(value.unwrap()["total"].as_u64().unwrap() >= 6);

        let (code, value) = call(roster_check_in, Some(r#"{"participantId": "demo-1", "module": 20}"#));
        assert_eq!(code, 0);
        assert_eq!(value.unwrap()["outcome"]["type"], "special_class");

        let (code, _) = call(roster_get, Some(r#"{"id": "missing"}"#));
        assert_eq!(code, ErrorCode::EntityNotFound as c_int);

        let (code, value) = call(roster_summary, None);
        assert_eq!(code, 0);
        assert!(value.unwrap()["total"].as_u64().unwrap() >= 6);
    }
}
