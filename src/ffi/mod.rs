use std::ffi::{CStr, CString};
use std::future::Future;
use std::os::raw::{c_char, c_int};
use crate::errors::ServiceResult;
use crate::ffi::error::{ErrorCode, FFIError};
use lazy_static::lazy_static;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::runtime::Runtime;

pub mod error;
pub mod roster;

pub use error::FFIResult;

lazy_static! {
    // One runtime for every call so pooled HTTP connections stay valid
    static ref RUNTIME: std::io::Result<Runtime> = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("roster-ffi")
        .enable_all()
        .build();
}

/// Run a service future to completion on the shared runtime
pub fn block_on_async<F, T>(future: F) -> FFIResult<T>
where
    F: Future<Output = ServiceResult<T>>,
{
    let runtime = RUNTIME
        .as_ref()
        .map_err(|e| FFIError::internal(format!("Failed to start async runtime: {}", e)))?;
    runtime.block_on(future).map_err(FFIError::from_service_error)
}

/// Error handling helper for FFI boundaries (returns error code)
pub fn handle_status_result<F>(func: F) -> c_int
where
    F: FnOnce() -> FFIResult<()>,
{
    match func() {
        Ok(_) => ErrorCode::Success as c_int,
        Err(e) => {
            log::error!("[Rust FFI Error] Code: {:?}, Message: {}, Details: {:?}",
                      e.code, e.message, e.details.as_deref().unwrap_or("None"));
            e.code as c_int
        }
    }
}

/// Decode a JSON payload from a C string owned by the caller
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that stays valid for the call.
pub unsafe fn read_payload<P: DeserializeOwned>(ptr: *const c_char) -> FFIResult<P> {
    if ptr.is_null() {
        return Err(FFIError::null_pointer("payload_json"));
    }
    let json = unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| FFIError::new(ErrorCode::InvalidUtf8, "payload is not valid UTF-8"))?;
    Ok(serde_json::from_str(json)?)
}

/// Serialize `value` and hand ownership of the string to the caller
///
/// # Safety
/// `result` must be a valid, writable pointer.
pub unsafe fn write_result<T: Serialize>(result: *mut *mut c_char, value: &T) -> FFIResult<()> {
    if result.is_null() {
        return Err(FFIError::null_pointer("result"));
    }
    let json = serde_json::to_string(value).map_err(|e| FFIError::internal(format!("ser {e}")))?;
    let cstr = CString::new(json)?;
    unsafe { *result = cstr.into_raw() };
    Ok(())
}
