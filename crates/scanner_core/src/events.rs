//! Decoding and dispatch of host-initiated calls.

use std::sync::Arc;

use async_trait::async_trait;
use platform_channel::{MethodCallHandler, MethodResult};
use serde_json::Value;
use shared::{
    domain::{BarcodeFormat, DecodedItem, ViewId},
    protocol::{methods, MethodCall, RecognizeArgs},
};
use tracing::{debug, warn};

use crate::{
    commands::CommandClient,
    error::{ProtocolError, ScannerError},
    sink::ItemSink,
    PermissionCallback, PermissionState, ViewState,
};

/// A host call after it has been checked against the wire contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Recognized(DecodedItem),
    /// `None` when the host sent something other than a boolean.
    PermissionSet(Option<bool>),
    Ignored { method: String },
}

pub fn decode_host_call(call: &MethodCall) -> Result<HostEvent, ProtocolError> {
    match call.method.as_str() {
        methods::ON_RECOGNIZE_QR => decode_recognized(&call.arguments),
        methods::ON_PERMISSION_SET => Ok(HostEvent::PermissionSet(call.arguments.as_bool())),
        other => Ok(HostEvent::Ignored {
            method: other.to_string(),
        }),
    }
}

fn decode_recognized(arguments: &Value) -> Result<HostEvent, ProtocolError> {
    if arguments.is_null() {
        return Ok(HostEvent::Ignored {
            method: methods::ON_RECOGNIZE_QR.to_string(),
        });
    }

    let args: RecognizeArgs =
        serde_json::from_value(arguments.clone()).map_err(|err| {
            ProtocolError::MalformedPayload {
                method: methods::ON_RECOGNIZE_QR.to_string(),
                reason: err.to_string(),
            }
        })?;
    let format: BarcodeFormat = args.format.parse()?;
    let raw_bytes = args
        .raw_bytes
        .map(|raw| raw.into_bytes())
        .transpose()
        .map_err(|_| ProtocolError::InvalidRawBytes {
            method: methods::ON_RECOGNIZE_QR.to_string(),
        })?;

    Ok(HostEvent::Recognized(DecodedItem {
        payload: args.code,
        format,
        raw_bytes,
    }))
}

/// Handler registered on the view channel. Routes decoded items to the sink
/// and permission changes to the shared view state.
pub struct EventDemultiplexer {
    view_id: ViewId,
    commands: CommandClient,
    state: Arc<ViewState>,
    sink: Arc<ItemSink>,
    on_permission_set: Option<PermissionCallback>,
}

impl EventDemultiplexer {
    pub(crate) fn new(
        view_id: ViewId,
        commands: CommandClient,
        state: Arc<ViewState>,
        sink: Arc<ItemSink>,
        on_permission_set: Option<PermissionCallback>,
    ) -> Self {
        Self {
            view_id,
            commands,
            state,
            sink,
            on_permission_set,
        }
    }

    /// Handles one host call. A protocol error rejects only this call.
    pub async fn handle(&self, call: MethodCall) -> Result<(), ScannerError> {
        let event = decode_host_call(&call).map_err(|err| {
            warn!(
                view_id = self.view_id.0,
                method = %call.method,
                error = %err,
                "rejecting host call that violates the channel contract"
            );
            err
        })?;
        self.dispatch(event).await;
        Ok(())
    }

    async fn dispatch(&self, event: HostEvent) {
        match event {
            HostEvent::Recognized(item) => {
                if self.commands.is_disposed() {
                    debug!(view_id = self.view_id.0, "view disposed; dropping decoded item");
                    return;
                }
                debug!(
                    view_id = self.view_id.0,
                    format = %item.format,
                    "publishing decoded item"
                );
                if !self.sink.publish(item) {
                    debug!(view_id = self.view_id.0, "item sink closed; dropping decoded item");
                }
            }
            HostEvent::PermissionSet(granted) => self.permission_set(granted).await,
            HostEvent::Ignored { method } => {
                debug!(view_id = self.view_id.0, %method, "ignoring host call");
            }
        }
    }

    async fn permission_set(&self, granted: Option<bool>) {
        // Feature availability depends on the permission outcome, so refresh
        // regardless of what the payload says.
        match self.commands.get_system_features().await {
            Ok(features) => *self.state.features.write().await = Some(features),
            Err(ScannerError::Disposed) => {}
            Err(err) => warn!(
                view_id = self.view_id.0,
                error = %err,
                "failed to refresh system features after permission event"
            ),
        }
        if self.commands.is_disposed() {
            debug!(view_id = self.view_id.0, "view disposed; dropping permission event");
            return;
        }

        let Some(granted) = granted else {
            debug!(view_id = self.view_id.0, "dropping non-boolean permission payload");
            return;
        };
        *self.state.permission.write().await = PermissionState::from(granted);
        if let Some(callback) = &self.on_permission_set {
            callback(granted);
        }
    }
}

#[async_trait]
impl MethodCallHandler for EventDemultiplexer {
    async fn handle_method_call(&self, call: MethodCall) -> MethodResult {
        self.handle(call)
            .await
            .map(|()| Value::Null)
            .map_err(|err| err.to_platform_error())
    }
}

#[cfg(test)]
#[path = "tests/events_tests.rs"]
mod tests;
