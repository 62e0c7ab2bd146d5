//! Typed commands sent from the application to the host view.

use std::sync::Arc;

use platform_channel::ChannelTransport;
use serde_json::Value;
use shared::{
    domain::{BarcodeFormat, CameraFacing, HostPlatform, SystemFeatures, ViewGeometry, ViewId},
    protocol::{methods, start_scan_arguments, InvertScanArgs, MethodCall},
};
use tokio::sync::watch;
use tracing::debug;

use crate::error::{ProtocolError, ScannerError};

#[derive(Clone)]
pub struct CommandClient {
    view_id: ViewId,
    platform: HostPlatform,
    transport: Arc<dyn ChannelTransport>,
    disposed: watch::Receiver<bool>,
}

impl CommandClient {
    pub fn new(
        view_id: ViewId,
        platform: HostPlatform,
        transport: Arc<dyn ChannelTransport>,
        disposed: watch::Receiver<bool>,
    ) -> Self {
        Self {
            view_id,
            platform,
            transport,
            disposed,
        }
    }

    pub fn platform(&self) -> HostPlatform {
        self.platform
    }

    pub fn is_disposed(&self) -> bool {
        *self.disposed.borrow()
    }

    /// Sends one call and waits for the reply.
    ///
    /// Resolves with [`ScannerError::Disposed`] as soon as the owning view is
    /// disposed, even if the host never answers.
    pub async fn invoke(&self, method: &str, arguments: Value) -> Result<Value, ScannerError> {
        let mut disposed = self.disposed.clone();
        if *disposed.borrow() {
            return Err(ScannerError::Disposed);
        }

        debug!(view_id = self.view_id.0, method, "invoking host method");
        let call = MethodCall::new(method, arguments);
        tokio::select! {
            result = self.transport.invoke_method(call) => result.map_err(ScannerError::from),
            _ = disposed.wait_for(|disposed| *disposed) => Err(ScannerError::Disposed),
        }
    }

    async fn invoke_unit(&self, method: &str) -> Result<Value, ScannerError> {
        self.invoke(method, Value::Null).await
    }

    pub async fn start_scan(&self, formats: &[BarcodeFormat]) -> Result<(), ScannerError> {
        self.invoke(methods::START_SCAN, start_scan_arguments(formats))
            .await?;
        Ok(())
    }

    pub async fn get_camera_info(&self) -> Result<CameraFacing, ScannerError> {
        let reply = self.invoke_unit(methods::GET_CAMERA_INFO).await?;
        camera_facing_from_reply(methods::GET_CAMERA_INFO, &reply)
    }

    pub async fn flip_camera(&self) -> Result<CameraFacing, ScannerError> {
        let reply = self.invoke_unit(methods::FLIP_CAMERA).await?;
        camera_facing_from_reply(methods::FLIP_CAMERA, &reply)
    }

    pub async fn get_flash_info(&self) -> Result<bool, ScannerError> {
        let reply = self.invoke_unit(methods::GET_FLASH_INFO).await?;
        reply
            .as_bool()
            .ok_or_else(|| unexpected_reply(methods::GET_FLASH_INFO, &reply))
    }

    pub async fn toggle_flash(&self) -> Result<(), ScannerError> {
        self.invoke_unit(methods::TOGGLE_FLASH).await?;
        Ok(())
    }

    pub async fn pause_camera(&self) -> Result<(), ScannerError> {
        self.invoke_unit(methods::PAUSE_CAMERA).await?;
        Ok(())
    }

    pub async fn resume_camera(&self) -> Result<(), ScannerError> {
        self.invoke_unit(methods::RESUME_CAMERA).await?;
        Ok(())
    }

    pub async fn stop_camera(&self) -> Result<(), ScannerError> {
        self.invoke_unit(methods::STOP_CAMERA).await?;
        Ok(())
    }

    pub async fn scan_invert(&self, is_invert_scan: bool) -> Result<(), ScannerError> {
        let arguments = serde_json::to_value(InvertScanArgs { is_invert_scan })
            .map_err(|err| unexpected_payload(methods::INVERT_SCAN, err))?;
        self.invoke(methods::INVERT_SCAN, arguments).await?;
        Ok(())
    }

    pub async fn get_system_features(&self) -> Result<SystemFeatures, ScannerError> {
        let reply = self.invoke_unit(methods::GET_SYSTEM_FEATURES).await?;
        if !reply.is_object() {
            return Err(unexpected_reply(methods::GET_SYSTEM_FEATURES, &reply));
        }
        serde_json::from_value(reply.clone())
            .map_err(|_| unexpected_reply(methods::GET_SYSTEM_FEATURES, &reply))
    }

    /// Pushes the measured geometry to hosts that need it. Returns whether a
    /// call was actually sent.
    pub async fn set_dimensions(&self, geometry: ViewGeometry) -> Result<bool, ScannerError> {
        if !self.platform.requires_dimension_updates() {
            debug!(
                view_id = self.view_id.0,
                platform = ?self.platform,
                "host tracks its own size; skipping setDimensions"
            );
            return Ok(false);
        }
        let arguments = serde_json::to_value(geometry)
            .map_err(|err| unexpected_payload(methods::SET_DIMENSIONS, err))?;
        self.invoke(methods::SET_DIMENSIONS, arguments).await?;
        Ok(true)
    }
}

fn camera_facing_from_reply(method: &str, reply: &Value) -> Result<CameraFacing, ScannerError> {
    let index = reply
        .as_i64()
        .ok_or_else(|| unexpected_reply(method, reply))?;
    CameraFacing::from_index(index)
        .ok_or_else(|| ProtocolError::UnknownCameraFacing(index).into())
}

fn unexpected_reply(method: &str, reply: &Value) -> ScannerError {
    ProtocolError::UnexpectedReply {
        method: method.to_string(),
        reply: reply.to_string(),
    }
    .into()
}

fn unexpected_payload(method: &str, err: serde_json::Error) -> ScannerError {
    ProtocolError::MalformedPayload {
        method: method.to_string(),
        reason: err.to_string(),
    }
    .into()
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
