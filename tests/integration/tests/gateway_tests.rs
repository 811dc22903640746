//! End-to-end tests: a real `Client` against the in-process fake server

use cord_common::{ClientConfig, Credentials};
use cord_core::{Activity, Id, Status};
use cord_gateway::{Client, GatewayError, SessionState};
use integration_tests::*;
use serde_json::json;
use tokio::sync::oneshot;

/// Interval long enough that no heartbeat fires during a test
const QUIET: u64 = 60_000;

async fn wait_for_state(client: &Client, state: SessionState) -> anyhow::Result<()> {
    let session = client.session().ok_or_else(|| anyhow::anyhow!("no session"))?;
    let mut states = session.subscribe_state();
    within(states.wait_for(|current| *current == state)).await??;
    Ok(())
}

async fn ready_client(server: &mut FakeServer) -> anyhow::Result<Client> {
    let client = server.client()?;
    client.login().await?;
    server.next_op(2).await?;
    wait_for_state(&client, SessionState::Ready).await?;
    Ok(client)
}

#[tokio::test]
async fn test_login_identifies_and_reaches_ready() {
    let mut server = FakeServer::start(QUIET).await.unwrap();
    let client = server.client().unwrap();

    client.login().await.unwrap();
    let identify = server.next_frame().await.unwrap();

    assert_eq!(identify["op"], 2);
    assert_eq!(identify["d"]["token"], "test-token");
    assert_eq!(identify["d"]["large_threshold"], 50);
    assert_eq!(identify["d"]["properties"]["$browser"], "cord");
    assert_eq!(identify["d"]["properties"]["$device"], "cord");
    assert!(identify["d"]["properties"]["$os"].is_string());

    wait_for_state(&client, SessionState::Ready).await.unwrap();
    let session = client.session().unwrap();
    assert_eq!(session.heartbeat_interval(), Some(std::time::Duration::from_millis(QUIET)));
}

#[tokio::test]
async fn test_socket_url_carries_version_and_encoding() {
    let mut server = FakeServer::start(QUIET).await.unwrap();
    let _client = ready_client(&mut server).await.unwrap();

    let query = server.socket_query().unwrap();
    assert_eq!(query.get("v").map(String::as_str), Some("6"));
    assert_eq!(query.get("encoding").map(String::as_str), Some("json"));
    assert_eq!(server.requests(), vec!["/gateway"]);
}

#[tokio::test]
async fn test_second_login_while_active_is_rejected() {
    let mut server = FakeServer::start(QUIET).await.unwrap();
    let client = ready_client(&mut server).await.unwrap();

    assert!(matches!(
        client.login().await,
        Err(GatewayError::AlreadyConnected)
    ));
}

#[tokio::test]
async fn test_dispatches_populate_cache() {
    let mut server = FakeServer::start(QUIET).await.unwrap();
    let client = ready_client(&mut server).await.unwrap();
    let mut ready_events = capture(&client, "READY");
    let mut marker = capture(&client, "MARKER");

    server.dispatch("READY", 1, ready(&["g1", "g2", "g3"])).unwrap();
    server
        .dispatch("GUILD_CREATE", 2, guild_create("g1", &["u1", "u2"], &["c1", "c2"]))
        .unwrap();
    server
        .dispatch("GUILD_CREATE", 3, guild_create("g2", &["u2"], &["c3"]))
        .unwrap();
    server
        .dispatch("PRESENCE_UPDATE", 4, presence_update("u2", "idle", Some("chess")))
        .unwrap();
    server.dispatch("MARKER", 5, json!({})).unwrap();

    let event = next_event(&mut ready_events).await.unwrap();
    assert_eq!(event.sequence, Some(1));
    assert_eq!(event.data["session_id"], "remote-session");
    next_event(&mut marker).await.unwrap();

    let cache = client.cache();
    assert_eq!(cache.guild_count(), 3);
    assert!(cache.get_guild("g3").unwrap().unavailable);

    let g1 = cache.get_guild("g1").unwrap();
    assert!(!g1.unavailable);
    assert_eq!(g1.members.len(), 2);
    assert_eq!(cache.get_channel("c1").unwrap().guild_id, Some(Id::from("g1")));
    assert_eq!(cache.get_channel("c3").unwrap().guild_id, Some(Id::from("g2")));

    // The presence lands on the user and on the member in each of its guilds
    let user = cache.get_user("u2").unwrap();
    let presence = user.presence.unwrap();
    assert_eq!(presence.status, Status::Idle);
    assert_eq!(presence.game.map(|game| game.name).as_deref(), Some("chess"));
    for guild in ["g1", "g2"] {
        let member = cache.guild_member(guild, "u2").unwrap();
        assert_eq!(member.presence.unwrap().status, Status::Idle);
    }
    assert!(cache.guild_member("g3", "u2").is_none());

    assert_eq!(client.user().unwrap().id, Id::from("u1"));
    let session = client.session().unwrap();
    assert_eq!(session.remote_session_id().as_deref(), Some("remote-session"));
    assert_eq!(session.last_sequence(), 5);
}

#[tokio::test]
async fn test_unknown_events_reach_handlers_verbatim() {
    let mut server = FakeServer::start(QUIET).await.unwrap();
    let client = ready_client(&mut server).await.unwrap();
    let mut typing = capture(&client, "TYPING_START");

    let payload = json!({"channel_id": "c1", "user_id": "u2", "timestamp": 1_500_000_000});
    server.dispatch("TYPING_START", 7, payload.clone()).unwrap();

    let event = next_event(&mut typing).await.unwrap();
    assert_eq!(event.name, "TYPING_START");
    assert_eq!(event.sequence, Some(7));
    assert_eq!(event.data, payload);
}

#[tokio::test]
async fn test_handler_panic_does_not_stop_session() {
    let mut server = FakeServer::start(QUIET).await.unwrap();
    let client = ready_client(&mut server).await.unwrap();
    client.on("MESSAGE_CREATE", |_| panic!("handler failure"));
    let mut messages = capture(&client, "MESSAGE_CREATE");

    server.dispatch("MESSAGE_CREATE", 1, message("m1", "c1", "one")).unwrap();
    server.dispatch("MESSAGE_CREATE", 2, message("m2", "c1", "two")).unwrap();

    assert_eq!(next_event(&mut messages).await.unwrap().data["content"], "one");
    assert_eq!(next_event(&mut messages).await.unwrap().data["content"], "two");
    assert_eq!(client.state(), SessionState::Ready);
}

#[tokio::test]
async fn test_heartbeats_report_highest_sequence() {
    let mut server = FakeServer::start(50).await.unwrap();
    let client = ready_client(&mut server).await.unwrap();
    let mut marker = capture(&client, "MARKER");

    server.dispatch("MARKER", 5, json!({})).unwrap();
    server.dispatch("MARKER", 3, json!({})).unwrap();
    next_event(&mut marker).await.unwrap();
    next_event(&mut marker).await.unwrap();

    let mut previous = 0;
    let mut after_max = 0;
    while after_max < 2 {
        let heartbeat = server.next_op(1).await.unwrap();
        let sequence = heartbeat["d"].as_u64().unwrap();
        assert!(sequence >= previous, "sequence went back from {previous} to {sequence}");
        previous = sequence;
        if sequence == 5 {
            after_max += 1;
        }
    }
    assert_eq!(client.session().unwrap().last_sequence(), 5);
}

#[tokio::test]
async fn test_server_heartbeat_request_and_ack() {
    let mut server = FakeServer::start(QUIET).await.unwrap();
    let client = ready_client(&mut server).await.unwrap();
    let mut marker = capture(&client, "MARKER");

    server.dispatch("MARKER", 9, json!({})).unwrap();
    next_event(&mut marker).await.unwrap();
    server.send(json!({"op": 1, "d": null})).unwrap();

    let heartbeat = server.next_op(1).await.unwrap();
    assert_eq!(heartbeat["d"], 9);

    server.send(json!({"op": 11})).unwrap();
    server.dispatch("MARKER", 10, json!({})).unwrap();
    next_event(&mut marker).await.unwrap();
    assert!(client.latency().is_some());
}

#[tokio::test]
async fn test_status_and_voice_commands() {
    let mut server = FakeServer::start(QUIET).await.unwrap();
    let client = ready_client(&mut server).await.unwrap();

    client
        .set_status(Some(1_000), Some(Activity::playing("chess")))
        .unwrap();
    let status = server.next_op(3).await.unwrap();
    assert_eq!(status["d"]["idle_since"], 1_000);
    assert_eq!(status["d"]["game"]["name"], "chess");

    client.set_status(None, None).unwrap();
    let cleared = server.next_op(3).await.unwrap();
    assert!(cleared["d"]["idle_since"].is_null());
    assert!(cleared["d"]["game"].is_null());

    client.voice_state("g1", Some("c9")).unwrap();
    let join = server.next_op(4).await.unwrap();
    assert_eq!(
        join["d"],
        json!({"guild_id": "g1", "channel_id": "c9", "self_mute": false, "self_deaf": false})
    );

    client.voice_state("g1", None).unwrap();
    let leave = server.next_op(4).await.unwrap();
    assert!(leave["d"]["channel_id"].is_null());
}

#[tokio::test]
async fn test_password_exchanged_before_gateway_lookup() {
    let mut server = FakeServer::start(QUIET).await.unwrap();
    let config = ClientConfig::new(Credentials::Password {
        email: "me@example.com".to_string(),
        password: "hunter2".to_string(),
    })
    .api_base(server.api_base());
    let client = Client::new(config).unwrap();

    client.login().await.unwrap();
    let identify = server.next_op(2).await.unwrap();

    assert_eq!(identify["d"]["token"], EXCHANGED_TOKEN);
    assert_eq!(server.requests(), vec!["/auth/login", "/gateway"]);
    assert_eq!(client.rest().token().as_deref(), Some(EXCHANGED_TOKEN));
}

#[tokio::test]
async fn test_rejected_password_never_opens_socket() {
    let server = FakeServer::start(QUIET).await.unwrap();
    let config = ClientConfig::new(Credentials::Password {
        email: "me@example.com".to_string(),
        password: "wrong".to_string(),
    })
    .api_base(server.api_base());
    let client = Client::new(config).unwrap();

    assert!(matches!(client.login().await, Err(GatewayError::Rest(_))));
    assert_eq!(server.requests(), vec!["/auth/login"]);
    assert!(server.socket_query().is_none());
    assert_eq!(client.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_server_close_ends_session() {
    let mut server = FakeServer::start(QUIET).await.unwrap();
    let client = ready_client(&mut server).await.unwrap();

    server.close(4004).unwrap();
    wait_for_state(&client, SessionState::Closed).await.unwrap();

    assert!(matches!(
        client.set_status(None, None),
        Err(GatewayError::NotConnected)
    ));
}

#[tokio::test]
async fn test_logout_closes_session() {
    let mut server = FakeServer::start(QUIET).await.unwrap();
    let client = ready_client(&mut server).await.unwrap();

    within(client.logout()).await.unwrap();

    assert_eq!(client.state(), SessionState::Closed);
    assert!(!client.session().unwrap().state().is_active());
    assert!(matches!(
        client.voice_state("g1", None),
        Err(GatewayError::NotConnected)
    ));
}

#[tokio::test]
async fn test_send_message_callback() {
    let server = FakeServer::start(QUIET).await.unwrap();
    let client = server.client().unwrap();
    let (tx, rx) = oneshot::channel();

    client.send_message("c1", "hello", move |result| {
        let _ = tx.send(result);
    });

    let message = within(rx).await.unwrap().unwrap().unwrap();
    assert_eq!(message.channel_id, Id::from("c1"));
    assert_eq!(message.content, "hello");
    assert_eq!(server.requests(), vec!["/channels/c1/messages"]);
}
