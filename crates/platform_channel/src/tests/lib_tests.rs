use super::*;
use serde_json::json;
use shared::{
    domain::{BarcodeFormat, CameraFacing, DecodedItem},
    error::codes,
    protocol::methods,
};
use tokio::sync::Mutex;

#[derive(Default)]
struct RecordingHandler {
    calls: Mutex<Vec<MethodCall>>,
}

#[async_trait]
impl MethodCallHandler for RecordingHandler {
    async fn handle_method_call(&self, call: MethodCall) -> MethodResult {
        self.calls.lock().await.push(call);
        Ok(Value::Null)
    }
}

#[tokio::test]
async fn application_calls_reach_the_host_and_return_its_reply() {
    let host = Arc::new(SimulatedCameraHost::fully_featured().with_facing(CameraFacing::Front));
    let (transport, _endpoint) = loopback("test/qrview_1", host.clone());

    let reply = transport
        .invoke_method(MethodCall::without_arguments(methods::GET_CAMERA_INFO))
        .await
        .expect("camera info");

    assert_eq!(reply, json!(1));
    assert_eq!(host.call_names(), vec![methods::GET_CAMERA_INFO.to_string()]);
}

#[tokio::test]
async fn host_calls_without_a_handler_fail_with_missing_plugin() {
    let host = Arc::new(SimulatedCameraHost::fully_featured());
    let (_transport, endpoint) = loopback("test/qrview_2", host);

    let err = endpoint
        .push_permission(true)
        .await
        .expect_err("no handler registered");

    assert_eq!(err.code, codes::MISSING_PLUGIN);
}

#[tokio::test]
async fn host_pushes_are_delivered_in_send_order() {
    let host = Arc::new(SimulatedCameraHost::fully_featured());
    let (transport, endpoint) = loopback("test/qrview_3", host);
    let recorder = Arc::new(RecordingHandler::default());
    transport.set_method_call_handler(Some(recorder.clone()));

    for index in 0..5 {
        endpoint
            .post_client(MethodCall::new("tick", json!(index)))
            .expect("post");
    }
    endpoint
        .push_recognized(&DecodedItem::new("last", BarcodeFormat::QrCode))
        .await
        .expect("flush");

    let calls = recorder.calls.lock().await;
    let ticks: Vec<Value> = calls
        .iter()
        .filter(|call| call.method == "tick")
        .map(|call| call.arguments.clone())
        .collect();
    assert_eq!(ticks, (0..5).map(|index| json!(index)).collect::<Vec<_>>());
    assert_eq!(calls.last().expect("last").method, methods::ON_RECOGNIZE_QR);
    assert_eq!(
        calls.last().expect("last").arguments,
        json!({"code": "last", "type": "QR_CODE"})
    );
}

#[tokio::test]
async fn detached_handler_stops_receiving_host_calls() {
    let host = Arc::new(SimulatedCameraHost::fully_featured());
    let (transport, endpoint) = loopback("test/qrview_4", host);
    let recorder = Arc::new(RecordingHandler::default());
    transport.set_method_call_handler(Some(recorder.clone()));
    endpoint.push_permission(true).await.expect("delivered");

    transport.set_method_call_handler(None);
    let err = endpoint.push_permission(false).await.expect_err("detached");

    assert_eq!(err.code, codes::MISSING_PLUGIN);
    assert_eq!(recorder.calls.lock().await.len(), 1);
}

#[tokio::test]
async fn closing_the_host_fails_outstanding_and_later_calls() {
    let host = Arc::new(SimulatedCameraHost::fully_featured());
    host.stall_method(methods::GET_FLASH_INFO);
    let (transport, endpoint) = loopback("test/qrview_5", host);
    let transport = Arc::new(transport);

    let pending = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            transport
                .invoke_method(MethodCall::without_arguments(methods::GET_FLASH_INFO))
                .await
        })
    };
    tokio::task::yield_now().await;
    endpoint.close();

    let err = pending.await.expect("join").expect_err("closed");
    assert_eq!(err.code, codes::CHANNEL_CLOSED);

    let err = transport
        .invoke_method(MethodCall::without_arguments(methods::PAUSE_CAMERA))
        .await
        .expect_err("closed");
    assert_eq!(err.code, codes::CHANNEL_CLOSED);
}

#[tokio::test]
async fn simulated_host_tracks_flash_and_rejects_null_format_lists() {
    let host = Arc::new(SimulatedCameraHost::fully_featured());
    let (transport, _endpoint) = loopback("test/qrview_6", host.clone());

    let toggled = transport
        .invoke_method(MethodCall::without_arguments(methods::TOGGLE_FLASH))
        .await
        .expect("toggle");
    assert_eq!(toggled, json!(true));
    assert!(host.flash_on());

    let err = transport
        .invoke_method(MethodCall::without_arguments(methods::START_SCAN))
        .await
        .expect_err("null formats");
    assert_eq!(err.code, codes::INVALID_ARGUMENTS);

    transport
        .invoke_method(MethodCall::new(methods::START_SCAN, json!([11])))
        .await
        .expect("start");
    assert_eq!(host.scanning_formats(), Some(vec![BarcodeFormat::QrCode]));
}

#[tokio::test]
async fn simulated_host_without_flash_reports_an_error() {
    let host = Arc::new(SimulatedCameraHost::new(Default::default()));
    let (transport, _endpoint) = loopback("test/qrview_7", host.clone());

    let err = transport
        .invoke_method(MethodCall::without_arguments(methods::TOGGLE_FLASH))
        .await
        .expect_err("no flash");

    assert_eq!(err.code, codes::NO_CAMERA);
    assert!(!host.flash_on());
}
