/// Outcome of one exported call, as seen by the caller.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Ok = 0,
    /// The operation itself failed; see `hostlink_last_error`.
    Failed = 1,
    /// The call panicked and was contained.
    Panicked = 2,
    NotReady = 3,
    /// No allocator is registered, or it returned null.
    NoAllocator = 4,
    /// Null pointer with a non-zero length, invalid UTF-8, or a bad id.
    InvalidInput = 5,
}

impl CallStatus {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl From<CallStatus> for u8 {
    fn from(status: CallStatus) -> Self {
        status.code()
    }
}
