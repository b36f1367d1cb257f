use super::*;

use crate::app::error::{ERR_CHANNEL_REJECTED, ERR_VALIDATION};
use crate::app::session::files::list_directory;
use crate::app::testing::{ok, process_failure, FakeBridge};

fn echo_bridge() -> Arc<FakeBridge> {
    Arc::new(FakeBridge::new(|line| ok(&format!("ran: {line}"))))
}

#[test]
fn channel_names_round_trip() {
    for capability in Capability::ALL {
        assert_eq!(Capability::from_channel(capability.channel()), Some(capability));
    }
    assert_eq!(Capability::from_channel("execute_command"), None);
    assert_eq!(Capability::from_channel("EXECUTE-COMMAND"), None);
}

#[tokio::test]
async fn unknown_channel_never_reaches_bridge() {
    let bridge = echo_bridge();
    for channel in ["run-anything", "", "execute-command ", "install-apk"] {
        let request = IpcRequest {
            channel: channel.to_string(),
            payload: "adb reboot".to_string(),
            trace_id: Some("trace-1".to_string()),
        };
        let err = invoke(bridge.as_ref(), request).await.unwrap_err();
        assert_eq!(err.code, ERR_CHANNEL_REJECTED);
        assert_eq!(err.trace_id, "trace-1");
    }
    assert!(bridge.calls().is_empty());
}

#[tokio::test]
async fn each_channel_routes_to_its_capability() {
    let bridge = echo_bridge();
    let cases = [
        (Capability::ExecuteCommand, "adb devices", "ran: adb devices"),
        (Capability::ShellCommand, "ls /sdcard", "ran: adb shell ls /sdcard"),
        (Capability::DownloadFile, "/sdcard/a.txt", "ran: adb pull /sdcard/a.txt"),
        (Capability::DeleteFile, "/sdcard/a.txt", "ran: adb shell rm -r /sdcard/a.txt"),
    ];
    for (capability, payload, expected) in cases {
        let response = invoke(bridge.as_ref(), IpcRequest::new(capability, payload, None))
            .await
            .unwrap();
        assert_eq!(response.data, expected);
        assert!(!response.trace_id.is_empty());
    }
    assert_eq!(bridge.calls().len(), 4);
}

#[tokio::test]
async fn empty_payload_is_a_validation_error() {
    let bridge = echo_bridge();
    let err = invoke(
        bridge.as_ref(),
        IpcRequest::new(Capability::DeleteFile, "   ", Some("t".to_string())),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code, ERR_VALIDATION);
    assert_eq!(err.error, "remote_path is required");
    assert!(bridge.calls().is_empty());
}

#[tokio::test]
async fn json_requests_keep_caller_trace_id() {
    let bridge = echo_bridge();
    let response = invoke_json(
        bridge.as_ref(),
        r#"{"channel":"execute-command","payload":"adb version","trace_id":"abc-123"}"#,
    )
    .await
    .unwrap();
    assert_eq!(response.trace_id, "abc-123");

    let response = invoke_json(
        bridge.as_ref(),
        r#"{"channel":"execute-command","payload":"adb version","trace_id":"  "}"#,
    )
    .await
    .unwrap();
    assert_ne!(response.trace_id.trim(), "");

    let err = invoke_json(bridge.as_ref(), "{not json").await.unwrap_err();
    assert_eq!(err.code, ERR_VALIDATION);
}

#[tokio::test]
async fn bridge_errors_pass_through_unchanged() {
    let bridge = Arc::new(FakeBridge::new(|_| process_failure("error: device offline")));
    let client = IpcClient::new(bridge);
    let err = client.run_generic("adb shell ls", "t").await.unwrap_err();
    assert_eq!(err.error, "error: device offline");
    assert_eq!(err.exit_code, Some(1));
}

#[tokio::test]
async fn session_code_runs_through_client() {
    let bridge = Arc::new(FakeBridge::new(|line| {
        if line.starts_with("adb devices") {
            ok("List of devices attached\nemulator-5554\tdevice\n")
        } else if line.contains("ls -1A") {
            ok("Music\n")
        } else {
            ok("true")
        }
    }));
    let client = IpcClient::new(Arc::clone(&bridge));
    let entries = list_directory(&client, "/sdcard", "t").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_dir);
    assert_eq!(entries[0].path, "/sdcard/Music/");
    assert_eq!(bridge.calls().len(), 3);
}

#[tokio::test]
async fn client_works_over_trait_objects() {
    let bridge: Arc<dyn CommandBridge> = echo_bridge();
    let client = IpcClient::new(bridge);
    assert_eq!(
        client.download_path("/sdcard/x", "t").await.unwrap(),
        "ran: adb pull /sdcard/x"
    );
}
