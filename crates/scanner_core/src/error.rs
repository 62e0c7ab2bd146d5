use shared::{
    domain::{UnknownBarcodeFormat, ViewId},
    error::{codes, PlatformError},
};
use thiserror::Error;

pub const PROTOCOL_ERROR_CODE: &str = "protocol_error";

/// The host sent something this side of the channel cannot interpret.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    UnknownBarcodeFormat(#[from] UnknownBarcodeFormat),
    #[error("malformed {method} payload: {reason}")]
    MalformedPayload { method: String, reason: String },
    #[error("raw bytes in {method} payload are not valid base64")]
    InvalidRawBytes { method: String },
    #[error("camera facing index {0} is out of range")]
    UnknownCameraFacing(i64),
    #[error("unexpected reply to {method}: {reply}")]
    UnexpectedReply { method: String, reply: String },
}

#[derive(Debug, Error)]
pub enum ScannerError {
    #[error("host error {code}: {message}")]
    Platform { code: String, message: String },
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("scan requested before view dimensions were recorded")]
    DimensionsNotRecorded,
    #[error("scanning already started for view {0}")]
    ScanAlreadyStarted(ViewId),
    #[error("view controller has been disposed")]
    Disposed,
    #[error("view controller was already disposed")]
    AlreadyDisposed,
}

impl ScannerError {
    /// Host-side error code, if the host produced this error.
    pub fn code(&self) -> Option<&str> {
        match self {
            ScannerError::Platform { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            ScannerError::DimensionsNotRecorded
                | ScannerError::ScanAlreadyStarted(_)
                | ScannerError::Disposed
                | ScannerError::AlreadyDisposed
        )
    }

    /// Reply sent back to the host when handling one of its calls fails.
    pub fn to_platform_error(&self) -> PlatformError {
        match self {
            ScannerError::Platform { code, message } => PlatformError::new(code, message),
            ScannerError::Protocol(err) => PlatformError::new(PROTOCOL_ERROR_CODE, err.to_string()),
            other => PlatformError::new(codes::HANDLER_FAILED, other.to_string()),
        }
    }
}

impl From<PlatformError> for ScannerError {
    fn from(value: PlatformError) -> Self {
        ScannerError::Platform {
            code: value.code,
            message: value.message,
        }
    }
}
