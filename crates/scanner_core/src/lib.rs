//! Application side of an embedded barcode scanner view.
//!
//! A [`QrViewController`] owns the method channel to one host-rendered camera
//! view. It forwards camera commands, turns host callbacks into a stream of
//! [`DecodedItem`]s and tracks the camera permission reported by the host.

pub mod commands;
mod controller;
pub mod error;
pub mod events;
mod sink;

pub use commands::CommandClient;
pub use controller::{
    next_view_id, ControllerOptions, PermissionCallback, PermissionState, QrViewController,
};
pub(crate) use controller::ViewState;
pub use error::{ProtocolError, ScannerError};
pub use events::{decode_host_call, EventDemultiplexer, HostEvent};
pub use shared::domain::{
    BarcodeFormat, CameraFacing, CreationParams, DecodedItem, HostPlatform, SystemFeatures,
    ViewGeometry, ViewId,
};
pub use sink::ScanStream;
