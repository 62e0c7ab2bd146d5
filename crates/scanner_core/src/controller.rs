use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use platform_channel::ChannelTransport;
use shared::{
    domain::{
        BarcodeFormat, CameraFacing, CreationParams, HostPlatform, SystemFeatures, ViewGeometry,
        ViewId,
    },
    protocol::channel_name,
};
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::{
    commands::CommandClient, error::ScannerError, events::EventDemultiplexer, sink::ItemSink,
    ScanStream,
};

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates a process-unique id for a new platform view.
pub fn next_view_id() -> ViewId {
    ViewId(NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed))
}

pub type PermissionCallback = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    #[default]
    Unknown,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            PermissionState::Unknown => None,
            PermissionState::Granted => Some(true),
            PermissionState::Denied => Some(false),
        }
    }
}

impl From<bool> for PermissionState {
    fn from(granted: bool) -> Self {
        if granted {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        }
    }
}

/// State written by the event demultiplexer and read through the controller.
#[derive(Default)]
pub(crate) struct ViewState {
    pub(crate) permission: RwLock<PermissionState>,
    pub(crate) features: RwLock<Option<SystemFeatures>>,
}

#[derive(Clone, Default)]
pub struct ControllerOptions {
    pub platform: HostPlatform,
    pub camera_facing: CameraFacing,
    /// Empty means every format the host supports.
    pub formats_allowed: Vec<BarcodeFormat>,
    pub on_permission_set: Option<PermissionCallback>,
}

impl ControllerOptions {
    pub fn new(platform: HostPlatform) -> Self {
        Self {
            platform,
            ..Self::default()
        }
    }

    pub fn with_camera_facing(mut self, camera_facing: CameraFacing) -> Self {
        self.camera_facing = camera_facing;
        self
    }

    pub fn with_formats(mut self, formats: impl IntoIterator<Item = BarcodeFormat>) -> Self {
        self.formats_allowed = formats.into_iter().collect();
        self
    }

    pub fn on_permission_set(mut self, callback: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.on_permission_set = Some(Arc::new(callback));
        self
    }

    /// Parameters the host receives when it creates the native view.
    pub fn creation_params(&self) -> CreationParams {
        CreationParams::from(self.camera_facing)
    }
}

impl fmt::Debug for ControllerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerOptions")
            .field("platform", &self.platform)
            .field("camera_facing", &self.camera_facing)
            .field("formats_allowed", &self.formats_allowed)
            .field("on_permission_set", &self.on_permission_set.is_some())
            .finish()
    }
}

#[derive(Default)]
struct Lifecycle {
    geometry: Option<ViewGeometry>,
    scan_started: bool,
}

/// Owner of the channel to one host-rendered scanner view.
pub struct QrViewController {
    view_id: ViewId,
    options: ControllerOptions,
    transport: Arc<dyn ChannelTransport>,
    commands: CommandClient,
    state: Arc<ViewState>,
    sink: Arc<ItemSink>,
    lifecycle: Mutex<Lifecycle>,
    disposed: watch::Sender<bool>,
}

impl QrViewController {
    /// Binds a controller to the channel of view `view_id` and registers its
    /// event handler. Nothing is sent to the host yet.
    pub fn attach<T>(view_id: ViewId, transport: T, options: ControllerOptions) -> Self
    where
        T: ChannelTransport + 'static,
    {
        let transport: Arc<dyn ChannelTransport> = Arc::new(transport);
        let (disposed, disposed_rx) = watch::channel(false);
        let commands = CommandClient::new(
            view_id,
            options.platform,
            Arc::clone(&transport),
            disposed_rx,
        );
        let state = Arc::new(ViewState::default());
        let sink = Arc::new(ItemSink::new());

        let demultiplexer = EventDemultiplexer::new(
            view_id,
            commands.clone(),
            Arc::clone(&state),
            Arc::clone(&sink),
            options.on_permission_set.clone(),
        );
        transport.set_method_call_handler(Some(Arc::new(demultiplexer)));
        info!(
            view_id = view_id.0,
            channel = transport.name(),
            platform = ?options.platform,
            "attached scanner view controller"
        );

        Self {
            view_id,
            options,
            transport,
            commands,
            state,
            sink,
            lifecycle: Mutex::new(Lifecycle::default()),
            disposed,
        }
    }

    /// Full startup for a freshly created view: attach, record the measured
    /// geometry, then start scanning with the configured formats.
    ///
    /// The host needs the scan-area geometry before `startScan` to clip
    /// results to the overlay, so the order here is fixed.
    pub async fn on_view_created<T>(
        view_id: ViewId,
        transport: T,
        geometry: ViewGeometry,
        options: ControllerOptions,
    ) -> Result<Self, ScannerError>
    where
        T: ChannelTransport + 'static,
    {
        let expected_channel = channel_name(view_id);
        if transport.name() != expected_channel {
            warn!(
                view_id = view_id.0,
                channel = transport.name(),
                expected = %expected_channel,
                "transport name does not match the view channel"
            );
        }

        let controller = Self::attach(view_id, transport, options);
        controller.update_dimensions(geometry).await?;
        let formats = controller.options.formats_allowed.clone();
        controller.start_scan(&formats).await?;
        Ok(controller)
    }

    pub fn view_id(&self) -> ViewId {
        self.view_id
    }

    pub fn channel_name(&self) -> &str {
        self.transport.name()
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }

    pub fn creation_params(&self) -> CreationParams {
        self.options.creation_params()
    }

    /// New consumer of decoded items. Items arrive in host order; the stream
    /// ends when the controller is disposed.
    pub fn scanned_items(&self) -> ScanStream {
        self.sink.subscribe()
    }

    pub async fn permission_state(&self) -> PermissionState {
        *self.state.permission.read().await
    }

    /// `None` until the host has reported a permission outcome.
    pub async fn has_permission(&self) -> Option<bool> {
        self.permission_state().await.as_bool()
    }

    /// Last feature snapshot fetched from the host, if any.
    pub async fn system_features(&self) -> Option<SystemFeatures> {
        *self.state.features.read().await
    }

    pub fn is_disposed(&self) -> bool {
        *self.disposed.borrow()
    }

    fn ensure_active(&self) -> Result<(), ScannerError> {
        if self.is_disposed() {
            Err(ScannerError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Forwards the measured view geometry to hosts that do not track their
    /// own size, then records it. A rejected update leaves nothing recorded.
    pub async fn update_dimensions(&self, geometry: ViewGeometry) -> Result<(), ScannerError> {
        self.ensure_active()?;
        self.commands.set_dimensions(geometry).await?;
        self.lifecycle.lock().await.geometry = Some(geometry);
        Ok(())
    }

    /// Starts the camera. Allowed once per view, after dimensions are known.
    pub async fn start_scan(&self, formats: &[BarcodeFormat]) -> Result<(), ScannerError> {
        self.ensure_active()?;
        {
            let mut lifecycle = self.lifecycle.lock().await;
            if lifecycle.geometry.is_none() {
                return Err(ScannerError::DimensionsNotRecorded);
            }
            if lifecycle.scan_started {
                return Err(ScannerError::ScanAlreadyStarted(self.view_id));
            }
            lifecycle.scan_started = true;
        }

        debug!(view_id = self.view_id.0, formats = formats.len(), "starting scan");
        if let Err(err) = self.commands.start_scan(formats).await {
            self.lifecycle.lock().await.scan_started = false;
            return Err(err);
        }
        Ok(())
    }

    pub async fn get_camera_info(&self) -> Result<CameraFacing, ScannerError> {
        self.commands.get_camera_info().await
    }

    pub async fn flip_camera(&self) -> Result<CameraFacing, ScannerError> {
        self.commands.flip_camera().await
    }

    pub async fn get_flash_info(&self) -> Result<bool, ScannerError> {
        self.commands.get_flash_info().await
    }

    pub async fn toggle_flash(&self) -> Result<(), ScannerError> {
        self.commands.toggle_flash().await
    }

    pub async fn pause_camera(&self) -> Result<(), ScannerError> {
        self.commands.pause_camera().await
    }

    pub async fn resume_camera(&self) -> Result<(), ScannerError> {
        self.commands.resume_camera().await
    }

    pub async fn stop_camera(&self) -> Result<(), ScannerError> {
        self.commands.stop_camera().await
    }

    pub async fn scan_invert(&self, is_invert_scan: bool) -> Result<(), ScannerError> {
        self.commands.scan_invert(is_invert_scan).await
    }

    /// Fetches a fresh feature snapshot and caches it.
    pub async fn get_system_features(&self) -> Result<SystemFeatures, ScannerError> {
        let features = self.commands.get_system_features().await?;
        *self.state.features.write().await = Some(features);
        Ok(features)
    }

    /// Ends every item stream, detaches from the channel and fails in-flight
    /// commands with [`ScannerError::Disposed`]. Disposing twice is an error.
    pub fn dispose(&self) -> Result<(), ScannerError> {
        if self.disposed.send_replace(true) {
            return Err(ScannerError::AlreadyDisposed);
        }
        self.sink.close();
        self.transport.set_method_call_handler(None);
        info!(view_id = self.view_id.0, "disposed scanner view controller");
        Ok(())
    }
}

impl Drop for QrViewController {
    fn drop(&mut self) {
        if !self.is_disposed() {
            let _ = self.dispose();
        }
    }
}
