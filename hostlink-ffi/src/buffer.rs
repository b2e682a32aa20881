//! Text in and out of the boundary.
//!
//! Input text arrives as pointer + length, never NUL-terminated. Output text
//! is handed to the caller's allocator, which copies it into memory the
//! caller owns from then on; nothing returned by this library is freed here.

use std::sync::{Mutex, PoisonError};

use crate::error::{FfiError, FfiResult};

/// Copies `len` bytes at `data` into caller-owned memory and returns it,
/// or null if it could not allocate.
pub type AllocatorFn = unsafe extern "C" fn(data: *const u8, len: usize) -> *mut u8;

static ALLOCATOR: Mutex<Option<AllocatorFn>> = Mutex::new(None);

/// Registers `allocator`, or clears it with `None`.
pub fn register_allocator(allocator: Option<AllocatorFn>) {
    *ALLOCATOR.lock().unwrap_or_else(PoisonError::into_inner) = allocator;
}

/// Hands `text` to the registered allocator.
pub fn write_output(text: &str) -> FfiResult<*mut u8> {
    let allocator = (*ALLOCATOR.lock().unwrap_or_else(PoisonError::into_inner))
        .ok_or(FfiError::NoAllocator)?;
    let out = unsafe { allocator(text.as_ptr(), text.len()) };
    if out.is_null() {
        Err(FfiError::AllocatorFailed { len: text.len() })
    } else {
        Ok(out)
    }
}

/// Borrows caller text as UTF-8.
///
/// # Safety
/// `ptr` must be null or point at `len` readable bytes that outlive `'a`.
pub unsafe fn read_str<'a>(ptr: *const u8, len: usize, what: &str) -> FfiResult<&'a str> {
    if ptr.is_null() {
        return if len == 0 {
            Ok("")
        } else {
            Err(FfiError::InvalidInput(format!("{what} is null with length {len}")))
        };
    }
    let bytes = unsafe { std::slice::from_raw_parts(ptr, len) };
    std::str::from_utf8(bytes)
        .map_err(|e| FfiError::InvalidInput(format!("{what} is not valid UTF-8: {e}")))
}
