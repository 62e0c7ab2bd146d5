use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{BarcodeFormat, ViewGeometry, ViewId};

pub const CHANNEL_PREFIX: &str = "net.touchcapture.qr.flutter";

/// Channel name for a single view instance.
pub fn channel_name(view_id: ViewId) -> String {
    format!("{CHANNEL_PREFIX}/qrview_{view_id}")
}

/// Method names on the view channel.
pub mod methods {
    pub const START_SCAN: &str = "startScan";
    pub const GET_CAMERA_INFO: &str = "getCameraInfo";
    pub const FLIP_CAMERA: &str = "flipCamera";
    pub const GET_FLASH_INFO: &str = "getFlashInfo";
    pub const TOGGLE_FLASH: &str = "toggleFlash";
    pub const PAUSE_CAMERA: &str = "pauseCamera";
    pub const RESUME_CAMERA: &str = "resumeCamera";
    pub const STOP_CAMERA: &str = "stopCamera";
    pub const INVERT_SCAN: &str = "invertScan";
    pub const GET_SYSTEM_FEATURES: &str = "getSystemFeatures";
    pub const SET_DIMENSIONS: &str = "setDimensions";

    pub const ON_RECOGNIZE_QR: &str = "onRecognizeQR";
    pub const ON_PERMISSION_SET: &str = "onPermissionSet";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    pub fn without_arguments(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }
}

/// `startScan` payload: format indices, empty meaning "all formats".
pub fn start_scan_arguments(formats: &[BarcodeFormat]) -> Value {
    Value::Array(
        formats
            .iter()
            .map(|format| Value::from(format.index()))
            .collect(),
    )
}

pub type SetDimensionsArgs = ViewGeometry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvertScanArgs {
    pub is_invert_scan: bool,
}

/// `onRecognizeQR` payload as sent by the host. `type` stays a raw string so an
/// unknown format can be reported instead of failing deserialisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizeArgs {
    pub code: String,
    #[serde(rename = "type")]
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_bytes: Option<RawBytes>,
}

/// Hosts send raw bytes either as a list of octets or as base64 text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawBytes {
    Octets(Vec<u8>),
    Base64(String),
}

impl RawBytes {
    pub fn into_bytes(self) -> Result<Vec<u8>, base64::DecodeError> {
        match self {
            RawBytes::Octets(bytes) => Ok(bytes),
            RawBytes::Base64(encoded) => STANDARD.decode(encoded),
        }
    }
}
