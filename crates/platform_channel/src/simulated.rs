use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    domain::{BarcodeFormat, CameraFacing, CreationParams, SystemFeatures, ViewGeometry},
    error::{codes, PlatformError},
    protocol::{methods, InvertScanArgs, MethodCall},
};
use tracing::debug;

use crate::{MethodCallHandler, MethodResult};

#[derive(Debug, Default)]
struct CameraState {
    facing: CameraFacing,
    flash_on: bool,
    paused: bool,
    stopped: bool,
    inverted: bool,
    geometry: Option<ViewGeometry>,
    scanning_formats: Option<Vec<BarcodeFormat>>,
    calls: Vec<MethodCall>,
}

/// In-memory stand-in for a native camera view.
///
/// Tracks camera facing, torch, pause state and the last reported geometry,
/// and records every call it receives so callers can check ordering.
pub struct SimulatedCameraHost {
    features: SystemFeatures,
    state: Mutex<CameraState>,
    failures: Mutex<HashMap<String, PlatformError>>,
    stalled: Mutex<HashSet<String>>,
}

impl SimulatedCameraHost {
    pub fn new(features: SystemFeatures) -> Self {
        Self {
            features,
            state: Mutex::new(CameraState::default()),
            failures: Mutex::new(HashMap::new()),
            stalled: Mutex::new(HashSet::new()),
        }
    }

    /// A phone-like host: torch plus front and back cameras.
    pub fn fully_featured() -> Self {
        Self::new(SystemFeatures {
            has_flash: true,
            has_back_camera: true,
            has_front_camera: true,
        })
    }

    /// Builds the host the way a native view factory would: from the
    /// creation parameters the application encoded for the new view.
    pub fn create(features: SystemFeatures, creation_params: Value) -> Result<Self, PlatformError> {
        let params: CreationParams = serde_json::from_value(creation_params).map_err(|err| {
            PlatformError::new(
                codes::INVALID_ARGUMENTS,
                format!("bad creation params: {err}"),
            )
        })?;
        let facing = CameraFacing::from_index(i64::from(params.camera_facing)).ok_or_else(|| {
            PlatformError::new(
                codes::INVALID_ARGUMENTS,
                format!("unknown camera facing {}", params.camera_facing),
            )
        })?;
        Ok(Self::new(features).with_facing(facing))
    }

    pub fn with_facing(self, facing: CameraFacing) -> Self {
        lock(&self.state).facing = facing;
        self
    }

    /// Every later call to `method` fails with `error`.
    pub fn fail_method(&self, method: &str, error: PlatformError) {
        lock(&self.failures).insert(method.to_string(), error);
    }

    pub fn clear_failure(&self, method: &str) {
        lock(&self.failures).remove(method);
    }

    /// Every later call to `method` is accepted but never answered.
    pub fn stall_method(&self, method: &str) {
        lock(&self.stalled).insert(method.to_string());
    }

    pub fn calls(&self) -> Vec<MethodCall> {
        lock(&self.state).calls.clone()
    }

    pub fn call_names(&self) -> Vec<String> {
        lock(&self.state)
            .calls
            .iter()
            .map(|call| call.method.clone())
            .collect()
    }

    pub fn facing(&self) -> CameraFacing {
        lock(&self.state).facing
    }

    pub fn flash_on(&self) -> bool {
        lock(&self.state).flash_on
    }

    pub fn is_paused(&self) -> bool {
        lock(&self.state).paused
    }

    pub fn is_stopped(&self) -> bool {
        lock(&self.state).stopped
    }

    pub fn is_inverted(&self) -> bool {
        lock(&self.state).inverted
    }

    pub fn geometry(&self) -> Option<ViewGeometry> {
        lock(&self.state).geometry
    }

    pub fn scanning_formats(&self) -> Option<Vec<BarcodeFormat>> {
        lock(&self.state).scanning_formats.clone()
    }

    fn apply(&self, call: &MethodCall) -> MethodResult {
        let mut state = lock(&self.state);
        match call.method.as_str() {
            methods::START_SCAN => {
                let indices: Vec<u32> = parse_arguments(call)?;
                let formats = indices
                    .into_iter()
                    .map(|index| {
                        BarcodeFormat::from_index(index).ok_or_else(|| {
                            PlatformError::new(
                                codes::INVALID_ARGUMENTS,
                                format!("unknown barcode format index {index}"),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                state.scanning_formats = Some(formats);
                state.paused = false;
                state.stopped = false;
                Ok(Value::Null)
            }
            methods::GET_CAMERA_INFO => Ok(Value::from(state.facing.index())),
            methods::FLIP_CAMERA => {
                if !(self.features.has_back_camera && self.features.has_front_camera) {
                    return Err(PlatformError::new(
                        codes::NO_CAMERA,
                        "device has no camera to flip to",
                    ));
                }
                state.facing = state.facing.flipped();
                Ok(Value::from(state.facing.index()))
            }
            methods::GET_FLASH_INFO => Ok(Value::Bool(state.flash_on)),
            methods::TOGGLE_FLASH => {
                if !self.features.has_flash {
                    return Err(PlatformError::new(codes::NO_CAMERA, "device has no flash"));
                }
                state.flash_on = !state.flash_on;
                Ok(Value::Bool(state.flash_on))
            }
            methods::PAUSE_CAMERA => {
                state.paused = true;
                Ok(Value::Null)
            }
            methods::RESUME_CAMERA => {
                state.paused = false;
                Ok(Value::Null)
            }
            methods::STOP_CAMERA => {
                state.stopped = true;
                state.flash_on = false;
                Ok(Value::Null)
            }
            methods::INVERT_SCAN => {
                let args: InvertScanArgs = parse_arguments(call)?;
                state.inverted = args.is_invert_scan;
                Ok(Value::Null)
            }
            methods::GET_SYSTEM_FEATURES => serde_json::to_value(self.features)
                .map_err(|err| PlatformError::new(codes::HANDLER_FAILED, err.to_string())),
            methods::SET_DIMENSIONS => {
                state.geometry = Some(parse_arguments(call)?);
                Ok(Value::Null)
            }
            other => Err(PlatformError::new(
                codes::NOT_IMPLEMENTED,
                format!("method {other} is not implemented"),
            )),
        }
    }
}

#[async_trait]
impl MethodCallHandler for SimulatedCameraHost {
    async fn handle_method_call(&self, call: MethodCall) -> MethodResult {
        debug!(method = %call.method, "simulated host: received call");
        lock(&self.state).calls.push(call.clone());

        let stalled = lock(&self.stalled).contains(&call.method);
        if stalled {
            std::future::pending::<()>().await;
        }
        let failure = lock(&self.failures).get(&call.method).cloned();
        if let Some(error) = failure {
            return Err(error);
        }
        self.apply(&call)
    }
}

fn parse_arguments<T: DeserializeOwned>(call: &MethodCall) -> Result<T, PlatformError> {
    serde_json::from_value(call.arguments.clone()).map_err(|err| {
        PlatformError::new(
            codes::INVALID_ARGUMENTS,
            format!("bad arguments for {}: {err}", call.method),
        )
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
