use core::result;
use std::cell::RefCell;

/// Error values.
#[derive(Debug, thiserror::Error)]
pub enum WaveError {
    /// Standard IO error. The message includes the file name when it is known.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The stream is not a valid WAVE file or its format is not supported.
    #[error("{0}")]
    Format(String),
    /// The operation is not allowed for the open mode of the file.
    #[error("{0}")]
    Mode(String),
    /// Invalid parameter.
    #[error("{0}")]
    Param(String),
}

/// Error category of [`WaveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operating system or IO error.
    Os,
    /// Malformed or unsupported container.
    Format,
    /// Invalid operation for the open mode.
    Mode,
    /// Invalid parameter.
    Param,
}

impl WaveError {
    /// Returns the category of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WaveError::Io(_) => ErrorKind::Os,
            WaveError::Format(_) => ErrorKind::Format,
            WaveError::Mode(_) => ErrorKind::Mode,
            WaveError::Param(_) => ErrorKind::Param,
        }
    }
}

/// Library Result type.
pub type WaveResult<T> = result::Result<T, WaveError>;

/// The last error recorded for the current thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    /// Error category.
    pub kind: ErrorKind,
    /// Formatted error message.
    pub message: String,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<LastError>> = const { RefCell::new(None) };
}

/// Returns the last error recorded by a failed [`WaveFile`](crate::WaveFile) operation
/// on the current thread, or `None` if there is no error.
///
/// The value stays until [`clear_error()`] is called or a newer error replaces it.
pub fn last_error() -> Option<LastError> {
    LAST_ERROR.with(|cell| cell.borrow().clone())
}

/// Clears the last error of the current thread.
pub fn clear_error() {
    LAST_ERROR.with(|cell| *cell.borrow_mut() = None);
}

/// Records the error as the last error of the current thread and passes it through.
pub(crate) fn record(err: WaveError) -> WaveError {
    let last = LastError { kind: err.kind(), message: err.to_string() };
    LAST_ERROR.with(|cell| *cell.borrow_mut() = Some(last));
    err
}
