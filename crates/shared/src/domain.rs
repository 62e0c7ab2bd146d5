use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);
    };
}

id_newtype!(ViewId);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Barcode symbologies understood by the host decoder.
///
/// The declaration order is the wire index sent in `startScan`; do not reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarcodeFormat {
    Aztec,
    Codabar,
    Code39,
    Code93,
    Code128,
    DataMatrix,
    Ean8,
    Ean13,
    Itf,
    Maxicode,
    Pdf417,
    QrCode,
    Rss14,
    RssExpanded,
    UpcA,
    UpcE,
    UpcEanExtension,
}

impl BarcodeFormat {
    pub const ALL: [BarcodeFormat; 17] = [
        BarcodeFormat::Aztec,
        BarcodeFormat::Codabar,
        BarcodeFormat::Code39,
        BarcodeFormat::Code93,
        BarcodeFormat::Code128,
        BarcodeFormat::DataMatrix,
        BarcodeFormat::Ean8,
        BarcodeFormat::Ean13,
        BarcodeFormat::Itf,
        BarcodeFormat::Maxicode,
        BarcodeFormat::Pdf417,
        BarcodeFormat::QrCode,
        BarcodeFormat::Rss14,
        BarcodeFormat::RssExpanded,
        BarcodeFormat::UpcA,
        BarcodeFormat::UpcE,
        BarcodeFormat::UpcEanExtension,
    ];

    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Name the host uses in `onRecognizeQR.type`.
    pub fn wire_name(self) -> &'static str {
        match self {
            BarcodeFormat::Aztec => "AZTEC",
            BarcodeFormat::Codabar => "CODABAR",
            BarcodeFormat::Code39 => "CODE_39",
            BarcodeFormat::Code93 => "CODE_93",
            BarcodeFormat::Code128 => "CODE_128",
            BarcodeFormat::DataMatrix => "DATA_MATRIX",
            BarcodeFormat::Ean8 => "EAN_8",
            BarcodeFormat::Ean13 => "EAN_13",
            BarcodeFormat::Itf => "ITF",
            BarcodeFormat::Maxicode => "MAXICODE",
            BarcodeFormat::Pdf417 => "PDF_417",
            BarcodeFormat::QrCode => "QR_CODE",
            BarcodeFormat::Rss14 => "RSS_14",
            BarcodeFormat::RssExpanded => "RSS_EXPANDED",
            BarcodeFormat::UpcA => "UPC_A",
            BarcodeFormat::UpcE => "UPC_E",
            BarcodeFormat::UpcEanExtension => "UPC_EAN_EXTENSION",
        }
    }
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown barcode format '{0}'")]
pub struct UnknownBarcodeFormat(pub String);

impl FromStr for BarcodeFormat {
    type Err = UnknownBarcodeFormat;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.wire_name() == raw)
            .ok_or_else(|| UnknownBarcodeFormat(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraFacing {
    #[default]
    Back,
    Front,
    Unknown,
}

impl CameraFacing {
    pub fn index(self) -> u32 {
        match self {
            CameraFacing::Back => 0,
            CameraFacing::Front => 1,
            CameraFacing::Unknown => 2,
        }
    }

    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(CameraFacing::Back),
            1 => Some(CameraFacing::Front),
            2 => Some(CameraFacing::Unknown),
            _ => None,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            CameraFacing::Back => CameraFacing::Front,
            CameraFacing::Front => CameraFacing::Back,
            CameraFacing::Unknown => CameraFacing::Unknown,
        }
    }
}

/// Platform hosting the native view. Decides which commands are worth sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostPlatform {
    #[default]
    Android,
    Ios,
    Macos,
    Web,
}

impl HostPlatform {
    /// Android and web views follow their layout box on their own; the UIKit/AppKit
    /// views need the measured size and cut-out pushed to them.
    pub fn requires_dimension_updates(self) -> bool {
        matches!(self, HostPlatform::Ios | HostPlatform::Macos)
    }
}

impl FromStr for HostPlatform {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "android" => Ok(HostPlatform::Android),
            "ios" => Ok(HostPlatform::Ios),
            "macos" => Ok(HostPlatform::Macos),
            "web" => Ok(HostPlatform::Web),
            other => Err(format!("unsupported host platform '{other}'")),
        }
    }
}

/// One barcode decoded by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedItem {
    pub payload: String,
    pub format: BarcodeFormat,
    pub raw_bytes: Option<Vec<u8>>,
}

impl DecodedItem {
    pub fn new(payload: impl Into<String>, format: BarcodeFormat) -> Self {
        Self {
            payload: payload.into(),
            format,
            raw_bytes: None,
        }
    }

    pub fn with_raw_bytes(mut self, raw_bytes: Vec<u8>) -> Self {
        self.raw_bytes = Some(raw_bytes);
        self
    }
}

/// Capability flags reported by `getSystemFeatures`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemFeatures {
    #[serde(default)]
    pub has_flash: bool,
    #[serde(default)]
    pub has_back_camera: bool,
    #[serde(default)]
    pub has_front_camera: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewGeometry {
    pub width: f64,
    pub height: f64,
    /// Side length of the square overlay cut-out; zero scans the whole view.
    pub scan_area: f64,
    #[serde(default)]
    pub scan_area_offset: f64,
}

impl ViewGeometry {
    pub fn new(width: f64, height: f64, scan_area: f64) -> Self {
        Self {
            width,
            height,
            scan_area,
            scan_area_offset: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationParams {
    pub camera_facing: u32,
}

impl From<CameraFacing> for CreationParams {
    fn from(facing: CameraFacing) -> Self {
        Self {
            camera_facing: facing.index(),
        }
    }
}
