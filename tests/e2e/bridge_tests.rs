//! Control endpoint E2E tests: HTTP request -> validation -> ManagedPort -> device.

use crate::common::TestBridge;
use pretty_assertions::assert_eq;
use simmer::client::{self, ClientError};
use simmer::command::CommandError;
use simmer::port::{MockConnection, ScriptedConnector};
use std::time::Duration;

async fn bridge_with_device() -> (TestBridge, MockConnection) {
    let device = MockConnection::held_open("MOCK0");
    let bridge = TestBridge::start(ScriptedConnector::new().then_open(device.clone())).await;
    assert!(bridge.wait_connected(true).await, "device never connected");
    (bridge, device)
}

#[tokio::test]
async fn test_set_temp_reaches_device() {
    let (bridge, device) = bridge_with_device().await;

    let (status, body) = bridge
        .post_form(&[("command", "set-temp"), ("value", "500")])
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["bytes_written"], 2);
    assert_eq!(device.write_log(), vec![vec![0x01, 0xF4]]);
}

#[tokio::test]
async fn test_boundary_values() {
    let (bridge, device) = bridge_with_device().await;

    let (status, _) = bridge.post_form(&[("command", "set-temp"), ("value", "0")]).await;
    assert_eq!(status, 200);
    let (status, _) = bridge
        .post_form(&[("command", "set-temp"), ("value", "1023")])
        .await;
    assert_eq!(status, 200);

    assert_eq!(device.write_log(), vec![vec![0x00, 0x00], vec![0x03, 0xFF]]);
}

#[tokio::test]
async fn test_validation_failures_are_bad_requests() {
    let (bridge, device) = bridge_with_device().await;

    let cases: [&[(&str, &str)]; 5] = [
        &[("command", "set-temp"), ("value", "abc")],
        &[("command", "set-temp"), ("value", "1024")],
        &[("command", "set-temp"), ("value", "-3")],
        &[("command", "set-temp")],
        &[("command", "warp"), ("value", "5")],
    ];

    for fields in cases {
        let (status, body) = bridge.post_form(fields).await;
        assert_eq!(status, 400, "fields {:?}", fields);
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"]["type"], "InvalidCommand");
    }

    // Nothing invalid may reach the wire.
    assert!(device.write_log().is_empty());
}

#[tokio::test]
async fn test_non_form_requests_are_bad_requests() {
    let (bridge, device) = bridge_with_device().await;
    let cases = [
        (None, ""),
        (Some("application/json"), r#"{"command":"set-temp","value":"5"}"#),
        (Some("text/plain"), "command=set-temp&value=5"),
    ];

    for (content_type, body) in cases {
        let (status, response) = bridge.post_raw("/", content_type, body).await;
        assert_eq!(status, 400, "content type {:?}", content_type);
        assert_eq!(response["error"]["type"], "InvalidCommand");
    }

    assert!(device.write_log().is_empty());
}

#[tokio::test]
async fn test_query_string_fields_accepted() {
    let (bridge, device) = bridge_with_device().await;

    let (status, body) = bridge
        .post_raw("/?command=set-temp&value=5", None, "")
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["bytes_written"], 2);
    assert_eq!(device.write_log(), vec![vec![0x00, 0x05]]);
}

#[tokio::test]
async fn test_repeated_field_uses_first_value() {
    let (bridge, device) = bridge_with_device().await;

    let (status, _) = bridge
        .post_raw(
            "/?value=9",
            Some("application/x-www-form-urlencoded"),
            "command=set-temp&value=5&value=6",
        )
        .await;

    assert_eq!(status, 200);
    assert_eq!(device.write_log(), vec![vec![0x00, 0x05]]);
}

#[tokio::test]
async fn test_device_never_available_returns_server_error() {
    let bridge = TestBridge::start(ScriptedConnector::new()).await;

    for _ in 0..5 {
        let (status, body) = bridge
            .post_form(&[("command", "set-temp"), ("value", "100")])
            .await;
        assert_eq!(status, 500);
        assert_eq!(body["error"]["type"], "NotConnected");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // Still serving and still retrying.
    assert_eq!(bridge.health().await["connected"], false);
    assert!(bridge.connector.attempts() > 1);
}

#[tokio::test]
async fn test_write_failure_is_server_error() {
    let (bridge, device) = bridge_with_device().await;
    device.fail_writes(std::io::ErrorKind::BrokenPipe);

    let (status, body) = bridge
        .post_form(&[("command", "set-temp"), ("value", "7")])
        .await;

    assert_eq!(status, 500);
    assert_eq!(body["error"]["type"], "WriteError");
}

#[tokio::test]
async fn test_device_output_is_relayed() {
    let device = MockConnection::held_open("MOCK0");
    device.enqueue_read(b"T 21.50 G 0.010\n");
    device.enqueue_read(b"T 21.52 G 0.012\n");
    let bridge = TestBridge::start(ScriptedConnector::new().then_open(device.clone())).await;

    let output = bridge.output.clone();
    assert!(
        crate::common::eventually(Duration::from_secs(5), move || {
            output.contents().len() == 32
        })
        .await
    );
    assert_eq!(bridge.output.contents(), b"T 21.50 G 0.010\nT 21.52 G 0.012\n".to_vec());
}

#[tokio::test]
async fn test_writes_follow_hot_swapped_device() {
    let first = MockConnection::held_open("MOCK0");
    let second = MockConnection::held_open("MOCK1");
    let connector = ScriptedConnector::new()
        .then_open(first.clone())
        .fail_times(2)
        .then_open(second.clone());
    let bridge = TestBridge::start(connector).await;
    assert!(bridge.wait_connected(true).await);

    let (status, _) = bridge.post_form(&[("command", "set-temp"), ("value", "1")]).await;
    assert_eq!(status, 200);

    // Unplug; the loop clears the slot, fails twice, then finds the new device.
    first.disconnect();
    let port = bridge.port.clone();
    let connector = bridge.connector.clone();
    assert!(
        crate::common::eventually(Duration::from_secs(5), move || {
            connector.attempts() == 4 && port.is_connected()
        })
        .await
    );

    let (status, _) = bridge.post_form(&[("command", "set-temp"), ("value", "2")]).await;
    assert_eq!(status, 200);

    assert_eq!(first.write_log(), vec![vec![0x00, 0x01]]);
    assert_eq!(second.write_log(), vec![vec![0x00, 0x02]]);
}

#[tokio::test]
async fn test_health_reports_connection() {
    let (mut bridge, device) = bridge_with_device().await;
    assert_eq!(bridge.health().await["connected"], true);

    device.disconnect();
    assert!(bridge.wait_connected(false).await);
    assert_eq!(bridge.health().await["connected"], false);

    bridge.stop();
}

#[tokio::test]
async fn test_client_round_trip() {
    let (bridge, device) = bridge_with_device().await;
    let addr = bridge.addr_string();

    let sent = tokio::task::spawn_blocking(move || {
        client::send_set_temp(&addr, "500", Duration::from_secs(5))
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(sent.get(), 500);
    assert_eq!(device.write_log(), vec![vec![0x01, 0xF4]]);
}

#[tokio::test]
async fn test_client_rejects_bad_value_locally() {
    let (bridge, device) = bridge_with_device().await;
    let addr = bridge.addr_string();

    let err = tokio::task::spawn_blocking(move || {
        client::send_set_temp(&addr, "abc", Duration::from_secs(5))
    })
    .await
    .unwrap()
    .unwrap_err();

    assert!(matches!(err, ClientError::Command(CommandError::InvalidValue(_))));
    assert!(device.write_log().is_empty());
}

#[tokio::test]
async fn test_client_surfaces_server_error() {
    let bridge = TestBridge::start(ScriptedConnector::new()).await;
    let addr = bridge.addr_string();

    let err = tokio::task::spawn_blocking(move || {
        client::send_set_temp(&addr, "10", Duration::from_secs(5))
    })
    .await
    .unwrap()
    .unwrap_err();

    match err {
        ClientError::Status { code, detail } => {
            assert_eq!(code, 500);
            assert_eq!(detail.as_deref(), Some("no open port"));
        }
        other => panic!("Expected status error, got {:?}", other),
    }
}
