use super::*;
use async_trait::async_trait;
use platform_channel::{
    loopback, HostEndpoint, MethodCallHandler, MethodResult, SimulatedCameraHost,
};
use serde_json::json;
use shared::error::{codes, PlatformError};

struct FixedReply(Value);

#[async_trait]
impl MethodCallHandler for FixedReply {
    async fn handle_method_call(&self, _call: MethodCall) -> MethodResult {
        Ok(self.0.clone())
    }
}

fn client_for(
    platform: HostPlatform,
    host: Arc<dyn MethodCallHandler>,
) -> (CommandClient, HostEndpoint, watch::Sender<bool>) {
    let (transport, endpoint) = loopback("test/qrview_1", host);
    let (disposed, disposed_rx) = watch::channel(false);
    let client = CommandClient::new(ViewId(1), platform, Arc::new(transport), disposed_rx);
    (client, endpoint, disposed)
}

#[tokio::test]
async fn empty_format_list_is_sent_as_empty_array() {
    let host = Arc::new(SimulatedCameraHost::fully_featured());
    let (client, _endpoint, _disposed) = client_for(HostPlatform::Android, host.clone());

    client.start_scan(&[]).await.expect("start");

    let calls = host.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, methods::START_SCAN);
    assert_eq!(calls[0].arguments, json!([]));
    assert_eq!(host.scanning_formats(), Some(Vec::new()));
}

#[tokio::test]
async fn host_errors_surface_with_code_and_message() {
    let host = Arc::new(SimulatedCameraHost::fully_featured());
    host.fail_method(
        methods::PAUSE_CAMERA,
        PlatformError::new("camera_busy", "camera is in use"),
    );
    let (client, _endpoint, _disposed) = client_for(HostPlatform::Android, host);

    let err = client.pause_camera().await.expect_err("must fail");

    assert_eq!(err.code(), Some("camera_busy"));
    assert!(err.to_string().contains("camera is in use"));
    assert!(!err.is_usage_error());
}

#[tokio::test]
async fn camera_facing_reply_out_of_range_is_a_protocol_error() {
    let (client, _endpoint, _disposed) =
        client_for(HostPlatform::Android, Arc::new(FixedReply(json!(9))));

    let err = client.get_camera_info().await.expect_err("bad index");

    assert!(matches!(
        err,
        ScannerError::Protocol(ProtocolError::UnknownCameraFacing(9))
    ));
}

#[tokio::test]
async fn non_boolean_flash_reply_is_a_protocol_error() {
    let (client, _endpoint, _disposed) =
        client_for(HostPlatform::Ios, Arc::new(FixedReply(json!("on"))));

    let err = client.get_flash_info().await.expect_err("bad reply");

    assert!(matches!(
        err,
        ScannerError::Protocol(ProtocolError::UnexpectedReply { .. })
    ));
}

#[tokio::test]
async fn system_features_decode_from_host_map() {
    let (client, _endpoint, _disposed) = client_for(
        HostPlatform::Android,
        Arc::new(FixedReply(
            json!({"hasFlash": true, "hasBackCamera": true, "hasFrontCamera": false}),
        )),
    );

    let features = client.get_system_features().await.expect("features");

    assert_eq!(
        features,
        SystemFeatures {
            has_flash: true,
            has_back_camera: true,
            has_front_camera: false,
        }
    );
}

#[tokio::test]
async fn set_dimensions_is_only_sent_to_hosts_that_need_it() {
    let geometry = ViewGeometry::new(360.0, 640.0, 300.0);

    let android_host = Arc::new(SimulatedCameraHost::fully_featured());
    let (android, _android_endpoint, _a) = client_for(HostPlatform::Android, android_host.clone());
    assert!(!android.set_dimensions(geometry).await.expect("android"));
    assert!(android_host.calls().is_empty());

    let ios_host = Arc::new(SimulatedCameraHost::fully_featured());
    let (ios, _ios_endpoint, _i) = client_for(HostPlatform::Ios, ios_host.clone());
    assert!(ios.set_dimensions(geometry).await.expect("ios"));
    assert_eq!(ios_host.geometry(), Some(geometry));
}

#[tokio::test]
async fn scan_invert_sends_named_flag() {
    let host = Arc::new(SimulatedCameraHost::fully_featured());
    let (client, _endpoint, _disposed) = client_for(HostPlatform::Android, host.clone());

    client.scan_invert(true).await.expect("invert");

    assert_eq!(host.calls()[0].arguments, json!({"isInvertScan": true}));
    assert!(host.is_inverted());
}

#[tokio::test]
async fn disposal_signal_fails_pending_and_new_commands() {
    let host = Arc::new(SimulatedCameraHost::fully_featured());
    host.stall_method(methods::GET_FLASH_INFO);
    let (client, _endpoint, disposed) = client_for(HostPlatform::Android, host);

    let pending = {
        let client = client.clone();
        tokio::spawn(async move { client.get_flash_info().await })
    };
    tokio::task::yield_now().await;
    disposed.send_replace(true);

    let err = pending.await.expect("join").expect_err("disposed");
    assert!(matches!(err, ScannerError::Disposed));

    let err = client.resume_camera().await.expect_err("disposed");
    assert!(matches!(err, ScannerError::Disposed));
    assert_eq!(err.code(), None);
}

#[tokio::test]
async fn closed_channel_maps_to_platform_error() {
    let host = Arc::new(SimulatedCameraHost::fully_featured());
    let (client, endpoint, _disposed) = client_for(HostPlatform::Android, host);
    endpoint.close();
    tokio::task::yield_now().await;

    let err = client.toggle_flash().await.expect_err("closed");

    assert_eq!(err.code(), Some(codes::CHANNEL_CLOSED));
}
