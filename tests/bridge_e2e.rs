// tests/bridge_e2e.rs
// End-to-end tests: a Wyoming client talks to the bridge over TCP while the
// bridge talks to mock Home Assistant and gateway servers.


use axum::http::StatusCode;
use serde_json::json;
use test_helpers::*;
use wyoming_bridge::protocol::Event;

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test]
async fn test_describe_returns_info() {
    let (gateway, _) = spawn_gateway("unused").await;
    let addr = spawn_bridge(&bridge_config(&gateway, None, &[])).await;

    let mut client = BridgeClient::connect(addr).await;
    client.send(&Event::new("describe")).await;
    let info = client.recv().await.unwrap();

    assert_eq!(info.kind, "info");
    let handle = &info.data["handle"][0];
    assert_eq!(handle["name"], "openclaw");
    assert_eq!(handle["installed"], true);
    assert!(
        handle["models"][0]["languages"]
            .as_array()
            .unwrap()
            .contains(&json!("en"))
    );
}

#[tokio::test]
async fn test_audio_and_transcribe_are_silent() {
    let (gateway, log) = spawn_gateway("Hi!").await;
    let addr = spawn_bridge(&bridge_config(&gateway, None, &[])).await;

    let mut client = BridgeClient::connect(addr).await;
    client.send(&Event::new("transcribe")).await;
    client
        .send(&Event::with_data("audio-chunk", json!({"rate": 16000})).with_payload(vec![0u8; 320]))
        .await;

    // The first reply on the wire answers the transcript, not the earlier frames
    let reply = client.ask("hello there").await;
    assert_eq!(reply.kind, "handled");
    assert_eq!(reply.str_field("text"), Some("Hi!"));
    assert_eq!(log.lock().unwrap().len(), 1);
}

// ============================================================================
// Device control
// ============================================================================

#[tokio::test]
async fn test_turn_on_calls_home_assistant() {
    let (gateway, gateway_log) = spawn_gateway("unused").await;
    let (ha, ha_log) = spawn_home_assistant().await;
    let addr = spawn_bridge(&bridge_config(&gateway, Some(&ha), &[])).await;

    let mut client = BridgeClient::connect(addr).await;
    let reply = client.ask("Turn on the kitchen light.").await;

    assert_eq!(reply.kind, "handled");
    assert_eq!(reply.str_field("text"), Some("Done, I turned on the kitchen light."));

    let calls = ha_log.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, "/api/services/light/turn_on");
    assert_eq!(calls[0].authorization.as_deref(), Some("Bearer ha-secret"));
    assert_eq!(calls[0].body, json!({"entity_id": "light.kitchen"}));
    assert!(gateway_log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_brightness_is_forwarded() {
    let (gateway, _) = spawn_gateway("unused").await;
    let (ha, ha_log) = spawn_home_assistant().await;
    let addr = spawn_bridge(&bridge_config(&gateway, Some(&ha), &[])).await;

    let mut client = BridgeClient::connect(addr).await;
    let reply = client.ask("turn on the desk lamp to 40 percent").await;

    assert_eq!(
        reply.str_field("text"),
        Some("Done, I turned on the desk lamp at 40 percent.")
    );
    let calls = ha_log.lock().unwrap().clone();
    assert_eq!(
        calls[0].body,
        json!({"entity_id": "light.desk_lamp", "brightness_pct": 40})
    );
}

#[tokio::test]
async fn test_state_and_listing_queries() {
    let (gateway, _) = spawn_gateway("unused").await;
    let (ha, ha_log) = spawn_home_assistant().await;
    let addr = spawn_bridge(&bridge_config(&gateway, Some(&ha), &[])).await;

    let mut client = BridgeClient::connect(addr).await;

    let reply = client.ask("is the kitchen light on").await;
    assert_eq!(reply.str_field("text"), Some("Kitchen Light is on."));

    let reply = client.ask("is anything on").await;
    assert_eq!(
        reply.str_field("text"),
        Some("Kitchen Light and Coffee Maker are on.")
    );

    let reply = client.ask("what lights are off").await;
    assert_eq!(reply.str_field("text"), Some("Hallway Light is off."));

    let paths: Vec<String> = ha_log.lock().unwrap().iter().map(|r| r.path.clone()).collect();
    assert_eq!(paths, vec!["/api/states/light.kitchen", "/api/states", "/api/states"]);
}

#[tokio::test]
async fn test_missing_entity_gets_apology() {
    let (gateway, gateway_log) = spawn_gateway("unused").await;
    let (ha, _) = spawn_home_assistant().await;
    let addr = spawn_bridge(&bridge_config(&gateway, Some(&ha), &[])).await;

    let mut client = BridgeClient::connect(addr).await;
    let reply = client.ask("is the attic fan on").await;

    assert_eq!(reply.kind, "handled");
    assert_eq!(reply.str_field("text"), Some("Sorry, I couldn't check the attic fan."));
    assert!(gateway_log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_home_assistant_keeps_connection_usable() {
    let (gateway, _) = spawn_gateway("Paris.").await;
    let ha = refused_url().await;
    let addr = spawn_bridge(&bridge_config(&gateway, Some(&ha), &[])).await;

    let mut client = BridgeClient::connect(addr).await;
    let reply = client.ask("turn on the kitchen light").await;
    assert_eq!(
        reply.str_field("text"),
        Some("Sorry, I couldn't turn on the kitchen light.")
    );

    // Same connection, next transcript
    let reply = client.ask("what is the capital of France?").await;
    assert_eq!(reply.str_field("text"), Some("Paris."));
}

#[tokio::test]
async fn test_device_commands_go_to_gateway_without_home_assistant() {
    let (gateway, log) = spawn_gateway("Okay, the kitchen light is on.").await;
    let addr = spawn_bridge(&bridge_config(&gateway, None, &[])).await;

    let mut client = BridgeClient::connect(addr).await;
    let reply = client.ask("turn on the kitchen light").await;

    assert_eq!(reply.str_field("text"), Some("Okay, the kitchen light is on."));
    let requests = log.lock().unwrap().clone();
    assert_eq!(requests[0].body["input"][0]["content"], "turn on the kitchen light");
}

// ============================================================================
// Conversation
// ============================================================================

#[tokio::test]
async fn test_conversation_request_shape() {
    let (gateway, log) = spawn_gateway("It is sunny.").await;
    let config = bridge_config(
        &gateway,
        None,
        &["--agent-id", "kitchen", "--session-id", "abc123"],
    );
    let addr = spawn_bridge(&config).await;

    let mut client = BridgeClient::connect(addr).await;
    let reply = client.ask("What's the weather like?").await;
    assert_eq!(reply.str_field("text"), Some("It is sunny."));

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/v1/responses");
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer gateway-secret"));
    assert_eq!(requests[0].session_key.as_deref(), Some("voice-abc123"));
    assert_eq!(
        requests[0].body,
        json!({
            "model": "openclaw:kitchen",
            "input": [{"type": "message", "role": "user", "content": "What's the weather like?"}]
        })
    );
}

#[tokio::test]
async fn test_default_session_key() {
    let (gateway, log) = spawn_gateway("Hello.").await;
    let addr = spawn_bridge(&bridge_config(&gateway, None, &[])).await;

    let mut client = BridgeClient::connect(addr).await;
    client.ask("tell me a joke").await;

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests[0].session_key.as_deref(), Some("voice-default"));
    assert_eq!(requests[0].body["model"], "openclaw:main");
}

#[tokio::test]
async fn test_gateway_error_gets_apology() {
    let (gateway, _) =
        spawn_gateway_with(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"})).await;
    let addr = spawn_bridge(&bridge_config(&gateway, None, &[])).await;

    let mut client = BridgeClient::connect(addr).await;
    let reply = client.ask("tell me a joke").await;

    assert_eq!(reply.kind, "handled");
    assert_eq!(
        reply.str_field("text"),
        Some("Sorry, I couldn't reach the assistant right now.")
    );
}

#[tokio::test]
async fn test_gateway_without_text_gets_apology() {
    let (gateway, _) = spawn_gateway_with(
        StatusCode::OK,
        json!({"output": [{"type": "function_call", "name": "noop", "arguments": "{}"}]}),
    )
    .await;
    let addr = spawn_bridge(&bridge_config(&gateway, None, &[])).await;

    let mut client = BridgeClient::connect(addr).await;
    let reply = client.ask("tell me a joke").await;
    assert_eq!(
        reply.str_field("text"),
        Some("Sorry, I couldn't reach the assistant right now.")
    );
}

#[tokio::test]
async fn test_blank_gateway_text_gets_apology() {
    let (gateway, _) = spawn_gateway("").await;
    let addr = spawn_bridge(&bridge_config(&gateway, None, &[])).await;

    let mut client = BridgeClient::connect(addr).await;
    let reply = client.ask("tell me a joke").await;
    assert_eq!(
        reply.str_field("text"),
        Some("Sorry, I couldn't reach the assistant right now.")
    );
}

#[tokio::test]
async fn test_synthesize_reply_event() {
    let (gateway, _) = spawn_gateway("Sure.").await;
    let addr = spawn_bridge(&bridge_config(&gateway, None, &["--reply-event", "synthesize"])).await;

    let mut client = BridgeClient::connect(addr).await;
    let reply = client.ask("hi").await;
    assert_eq!(reply.kind, "synthesize");
    assert_eq!(reply.str_field("text"), Some("Sure."));
}

#[tokio::test]
async fn test_empty_transcript() {
    let (gateway, log) = spawn_gateway("unused").await;
    let addr = spawn_bridge(&bridge_config(&gateway, None, &[])).await;

    let mut client = BridgeClient::connect(addr).await;
    let reply = client.ask("   ").await;
    assert_eq!(reply.str_field("text"), Some("Sorry, I didn't catch that."));
    assert!(log.lock().unwrap().is_empty());
}

// ============================================================================
// Stream handling
// ============================================================================

#[tokio::test]
async fn test_truncated_frame_closes_quietly() {
    let (gateway, log) = spawn_gateway("unused").await;
    let addr = spawn_bridge(&bridge_config(&gateway, None, &[])).await;

    let mut client = BridgeClient::connect(addr).await;
    client
        .send_raw(b"{\"type\":\"transcript\",\"data\":{\"text\":\"hi\"},\"payload_length\":10}\nabc")
        .await;

    // Half-close so the bridge sees end of stream mid-payload
    let BridgeClient { mut reader, writer } = client;
    drop(writer);
    let mut rest = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut rest)
        .await
        .unwrap();

    assert!(rest.is_empty());
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_header_drops_connection() {
    let (gateway, _) = spawn_gateway("unused").await;
    let addr = spawn_bridge(&bridge_config(&gateway, None, &[])).await;

    let mut broken = BridgeClient::connect(addr).await;
    broken.send_raw(b"definitely not json\n").await;
    assert!(broken.recv().await.is_none());

    // The listener keeps serving other clients
    let mut client = BridgeClient::connect(addr).await;
    client.send(&Event::new("describe")).await;
    assert_eq!(client.recv().await.unwrap().kind, "info");
}
