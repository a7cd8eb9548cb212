//! Facade behavior that does not require a live server.

use std::sync::Arc;

use sotto_client::{ClientConfig, ClientError, NullAudio, VoiceClient};

fn test_client() -> VoiceClient {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    VoiceClient::new(ClientConfig::development(), Arc::new(NullAudio), Arc::new(NullAudio))
        .expect("bind voice socket")
}

#[tokio::test]
async fn invalid_address_is_rejected_synchronously() {
    let client = test_client();

    match client.connect("not-an-address", "alice").await {
        Err(ClientError::InvalidAddress(addr)) => assert_eq!(addr, "not-an-address"),
        other => panic!("expected invalid address, got {other:?}"),
    }
}

#[tokio::test]
async fn disconnect_without_connection_resolves_immediately() {
    let client = test_client();
    client.disconnect().await.expect("disconnect should resolve");

    let info = client.get_connection_info();
    assert!(!info.is_connected);
    assert!(!info.is_connecting);
    assert!(info.address.is_empty());
}

#[tokio::test]
async fn setters_are_noops_while_disconnected() {
    let client = test_client();

    // None of these may fail or panic without a connection.
    client.set_channel("Lobby");
    client.add_listen_channel("Ops");
    client.remove_listen_channel("Ops");
    client.set_voice_target(3);
    client.send_voice(vec![0x80, 0x00, 0x00]);
    client.set_output_volume(0.5);
    client.run_frame();

    assert!(client.get_talkers().is_empty());
    assert!(!client.does_channel_exist("Lobby"));
    assert_eq!(client.get_player_name_from_server_id(1), None);
}

#[tokio::test]
async fn voice_target_slot_is_readable() {
    let client = test_client();
    client.set_voice_target(7);

    // The slot is applied by the connection task; poll briefly.
    for _ in 0..50 {
        if client.voice_target() == 7 {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("voice target was never applied");
}
