//! End-to-end client behavior against a scripted server on an in-memory pipe.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use rcon_protocol::core::codec::FrameCodec;
use rcon_protocol::core::frame::Frame;
use rcon_protocol::protocol::catalog::PlayerSubset;
use rcon_protocol::protocol::handshake::hash_password;
use rcon_protocol::{
    Client, ClientConfig, Command, ProtocolError, ServerEvent, SessionNotice, SessionState, Value,
};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_util::codec::Framed;

const WAIT: Duration = Duration::from_secs(2);

type Server = Framed<DuplexStream, FrameCodec>;

fn pair(config: ClientConfig) -> (Client, Server) {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let client = Client::with_stream(client_io, config).expect("client");
    (client, Framed::new(server_io, FrameCodec::new()))
}

fn with_password(password: &str) -> ClientConfig {
    ClientConfig {
        password: Some(password.to_string()),
        ..ClientConfig::default()
    }
}

async fn recv(server: &mut Server) -> Frame {
    timeout(WAIT, server.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("stream ended")
        .expect("decode failed")
}

async fn reply(server: &mut Server, sequence: u32, words: &[&str]) {
    server
        .send(Frame {
            sequence,
            is_from_server: false,
            is_response: true,
            words: words.iter().map(|w| w.to_string()).collect(),
        })
        .await
        .expect("reply");
}

async fn notice(rx: &mut broadcast::Receiver<SessionNotice>) -> SessionNotice {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for a notice")
        .expect("notice channel closed")
}

async fn wait_for_state(client: &Client, state: SessionState) {
    timeout(WAIT, async {
        while client.state() != state {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("never reached {state}, stuck in {}", client.state()));
}

#[tokio::test]
async fn test_submit_resolves_typed_value() {
    let (client, mut server) = pair(ClientConfig::default());
    assert_eq!(client.state(), SessionState::Authenticated);

    let call = tokio::spawn({
        let client = client.clone();
        async move { client.version().await }
    });

    let request = recv(&mut server).await;
    assert_eq!(request.words, vec!["version"]);
    assert!(!request.is_from_server);
    assert!(!request.is_response);
    assert_eq!(request.sequence, 1);

    reply(&mut server, request.sequence, &["OK", "BF3", "872601"]).await;
    let value = call.await.unwrap().unwrap();
    assert_eq!(value.get("game"), Some(&Value::from("BF3")));
    assert_eq!(value.get("version"), Some(&Value::Int(872601)));
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn test_out_of_order_responses() {
    let (client, mut server) = pair(ClientConfig::default());

    let first = tokio::spawn({
        let client = client.clone();
        async move { client.submit(Command::new("vars.serverName"), None).await }
    });
    let second = tokio::spawn({
        let client = client.clone();
        async move { client.list_players(PlayerSubset::All).await }
    });

    let a = recv(&mut server).await;
    let b = recv(&mut server).await;
    assert!(a.sequence < b.sequence);

    let (names, players) = if a.words[0] == "vars.serverName" { (a, b) } else { (b, a) };
    reply(
        &mut server,
        players.sequence,
        &["OK", "2", "name", "kills", "1", "Alice", "12"],
    )
    .await;
    reply(&mut server, names.sequence, &["OK", "My Server"]).await;

    let names = first.await.unwrap().unwrap();
    let players = second.await.unwrap().unwrap();
    assert_eq!(names, Value::List(vec![Value::from("My Server")]));
    assert_eq!(players.as_list().unwrap()[0].get("kills"), Some(&Value::Int(12)));
}

#[tokio::test]
async fn test_command_error_is_local_to_request() {
    let (client, mut server) = pair(ClientConfig::default());

    let call = tokio::spawn({
        let client = client.clone();
        async move {
            client
                .submit(Command::new("admin.kickPlayer").arg("nobody"), None)
                .await
        }
    });
    let request = recv(&mut server).await;
    reply(&mut server, request.sequence, &["PlayerNotFound"]).await;

    match call.await.unwrap() {
        Err(ProtocolError::Command(status)) => assert_eq!(status, "PlayerNotFound"),
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(client.state(), SessionState::Authenticated);
    assert_eq!(client.metrics().command_errors, 1);
}

#[tokio::test]
async fn test_queued_until_login_then_drained_in_order() {
    let (client, mut server) = pair(with_password("secret"));
    let mut notices = client.notices();
    assert_eq!(client.state(), SessionState::Authenticating);

    client.send(Command::new("admin.say").arg("first").arg("all")).unwrap();
    client.send(Command::new("admin.say").arg("second").arg("all")).unwrap();

    // Login traffic goes out ahead of the queue.
    let salt_request = recv(&mut server).await;
    assert_eq!(salt_request.words, vec!["login.hashed"]);
    reply(&mut server, salt_request.sequence, &["OK", "0a0b0c"]).await;

    let digest_login = recv(&mut server).await;
    assert_eq!(
        digest_login.words,
        vec!["login.hashed".to_string(), hash_password(&[0x0a, 0x0b, 0x0c], "secret")]
    );
    reply(&mut server, digest_login.sequence, &["OK"]).await;

    let first = recv(&mut server).await;
    let second = recv(&mut server).await;
    assert_eq!(first.words[1], "first");
    assert_eq!(second.words[1], "second");
    // Queued frames kept the sequence numbers they were serialized with.
    assert!(first.sequence < second.sequence);
    assert!(second.sequence < salt_request.sequence);

    assert_eq!(notice(&mut notices).await, SessionNotice::Authenticated);
    assert_eq!(client.state(), SessionState::Authenticated);
}

#[tokio::test]
async fn test_rejected_auto_login_is_promoted_to_notice() {
    let (client, mut server) = pair(with_password("wrong"));
    let mut notices = client.notices();

    client.send(Command::new("serverInfo")).unwrap();

    let salt_request = recv(&mut server).await;
    reply(&mut server, salt_request.sequence, &["OK", "ff"]).await;
    let digest_login = recv(&mut server).await;
    reply(&mut server, digest_login.sequence, &["InvalidPasswordHash"]).await;

    assert_eq!(
        notice(&mut notices).await,
        SessionNotice::Error("InvalidPasswordHash".into())
    );
    assert_eq!(client.state(), SessionState::Connected);

    // Back in Connected the queue is released.
    let queued = recv(&mut server).await;
    assert_eq!(queued.words, vec!["serverInfo"]);
    assert_eq!(client.metrics().handshakes_failed, 1);
}

#[tokio::test]
async fn test_explicit_plain_text_login_and_logout() {
    let (client, mut server) = pair(ClientConfig::default());

    let login = tokio::spawn({
        let client = client.clone();
        async move { client.login_plain_text("pw").await }
    });
    let request = recv(&mut server).await;
    assert_eq!(request.words, vec!["login.plainText", "pw"]);
    reply(&mut server, request.sequence, &["OK"]).await;
    login.await.unwrap().unwrap();
    assert_eq!(client.state(), SessionState::Authenticated);

    let logout = tokio::spawn({
        let client = client.clone();
        async move { client.logout().await }
    });
    let request = recv(&mut server).await;
    assert_eq!(request.words, vec!["logout"]);
    reply(&mut server, request.sequence, &["OK"]).await;
    logout.await.unwrap().unwrap();
    assert_eq!(client.state(), SessionState::Connected);
}

#[tokio::test]
async fn test_events_are_dispatched_and_acknowledged() {
    let (client, mut server) = pair(ClientConfig::default());
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    client
        .subscribe("player.*", move |event| {
            let _ = tx.send(event.clone());
        })
        .unwrap();

    server
        .send(Frame {
            sequence: 42,
            is_from_server: true,
            is_response: false,
            words: vec!["player.onJoin".into(), "Alice".into(), "EA_1234".into()],
        })
        .await
        .unwrap();

    let event = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(event.name, "player.onJoin");
    assert_eq!(event.field("guid"), Some(&Value::from("EA_1234")));

    let ack = recv(&mut server).await;
    assert_eq!(ack.sequence, 42);
    assert!(ack.is_from_server);
    assert!(ack.is_response);
    assert_eq!(ack.words, vec!["OK"]);
}

#[tokio::test]
async fn test_handler_may_subscribe_while_reader_keeps_running() {
    let (client, mut server) = pair(ClientConfig::default());
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let handle = client.clone();
    client
        .subscribe("player.onJoin", move |_| {
            let tx = tx.clone();
            handle
                .subscribe("player.onLeave", move |event| {
                    let _ = tx.send(event.name.clone());
                })
                .unwrap();
        })
        .unwrap();

    for (sequence, name) in [(1, "player.onJoin"), (2, "player.onLeave")] {
        server
            .send(Frame {
                sequence,
                is_from_server: true,
                is_response: false,
                words: vec![name.into(), "Alice".into()],
            })
            .await
            .unwrap();
    }
    assert_eq!(
        timeout(WAIT, rx.recv()).await.unwrap().unwrap(),
        "player.onLeave"
    );

    // Responses still flow after the nested subscription.
    let call = tokio::spawn({
        let client = client.clone();
        async move { client.submit(Command::new("version"), None).await }
    });
    let request = loop {
        let frame = recv(&mut server).await;
        if !frame.is_response {
            break frame;
        }
    };
    reply(&mut server, request.sequence, &["OK", "BF3"]).await;
    assert!(call.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_events_not_acknowledged_when_disabled() {
    let config = ClientConfig {
        acknowledge_events: false,
        ..ClientConfig::default()
    };
    let (client, mut server) = pair(config);
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    client
        .subscribe_all(move |event| {
            let _ = tx.send(event.name.clone());
        })
        .unwrap();

    server
        .send(Frame {
            sequence: 3,
            is_from_server: true,
            is_response: false,
            words: vec!["server.onRoundOver".into(), "1".into()],
        })
        .await
        .unwrap();
    assert_eq!(
        timeout(WAIT, rx.recv()).await.unwrap().unwrap(),
        "server.onRoundOver"
    );

    client.send(Command::new("version")).unwrap();
    // The next frame is the command, not an acknowledgement.
    assert_eq!(recv(&mut server).await.words, vec!["version"]);
}

#[tokio::test]
async fn test_unmatched_response_is_ignored() {
    let (client, mut server) = pair(ClientConfig::default());

    let call = tokio::spawn({
        let client = client.clone();
        async move { client.submit(Command::new("version"), None).await }
    });
    let request = recv(&mut server).await;

    reply(&mut server, request.sequence + 1000, &["OK", "stray"]).await;
    reply(&mut server, request.sequence, &["OK", "BF3"]).await;

    assert_eq!(
        call.await.unwrap().unwrap(),
        Value::List(vec![Value::from("BF3")])
    );
    assert_eq!(client.metrics().unmatched_responses, 1);
}

#[tokio::test]
async fn test_sequences_strictly_increase() {
    let (client, mut server) = pair(ClientConfig::default());
    for n in 0..5 {
        client
            .send(Command::new("admin.say").arg(format!("msg {n}")).arg("all"))
            .unwrap();
    }

    let mut last = 0;
    for _ in 0..5 {
        let frame = recv(&mut server).await;
        assert!(frame.sequence > last);
        last = frame.sequence;
    }
}

#[tokio::test]
async fn test_close_abandons_pending_requests() {
    let (client, mut server) = pair(ClientConfig::default());
    let mut notices = client.notices();

    let call = tokio::spawn({
        let client = client.clone();
        async move { client.submit(Command::new("serverInfo"), None).await }
    });
    let request = recv(&mut server).await;
    assert_eq!(request.words, vec!["serverInfo"]);

    client.close().unwrap();
    assert_eq!(client.state(), SessionState::Dead);
    assert!(matches!(
        call.await.unwrap(),
        Err(ProtocolError::ConnectionClosed)
    ));
    assert_eq!(notice(&mut notices).await, SessionNotice::Disconnected);

    assert_eq!(recv(&mut server).await.words, vec!["quit"]);
    // The writer shut its half down after the quit.
    assert!(timeout(WAIT, server.next()).await.unwrap().is_none());
    assert!(matches!(
        client.submit(Command::new("version"), None).await,
        Err(ProtocolError::SessionClosed)
    ));
    assert!(matches!(
        client.send(Command::new("version")),
        Err(ProtocolError::SessionClosed)
    ));
    // Closing twice is harmless.
    client.close().unwrap();
}

#[tokio::test]
async fn test_server_disconnect_tears_down_session() {
    let (client, mut server) = pair(ClientConfig::default());
    let mut notices = client.notices();

    let call = tokio::spawn({
        let client = client.clone();
        async move { client.submit(Command::new("serverInfo"), None).await }
    });
    recv(&mut server).await;
    drop(server);

    assert!(matches!(
        call.await.unwrap(),
        Err(ProtocolError::ConnectionClosed)
    ));
    assert_eq!(notice(&mut notices).await, SessionNotice::Disconnected);
    assert_eq!(client.state(), SessionState::Disconnected);
    assert!(matches!(
        client.send(Command::new("version")),
        Err(ProtocolError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn test_malformed_frame_is_fatal() {
    let (client, mut server) = pair(ClientConfig::default());
    let mut notices = client.notices();

    // Declared size smaller than the preamble.
    let mut bogus = Vec::new();
    bogus.extend_from_slice(&0x4000_0001u32.to_le_bytes());
    bogus.extend_from_slice(&4u32.to_le_bytes());
    bogus.extend_from_slice(&0u32.to_le_bytes());
    server.get_mut().write_all(&bogus).await.unwrap();

    match notice(&mut notices).await {
        SessionNotice::Error(detail) => assert!(detail.contains("header")),
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(client.state(), SessionState::Disconnected);
    assert_eq!(client.metrics().connection_errors, 1);
}

#[tokio::test]
async fn test_frames_split_across_writes() {
    let (client, mut server) = pair(ClientConfig::default());

    let call = tokio::spawn({
        let client = client.clone();
        async move { client.map_indices().await }
    });
    let request = recv(&mut server).await;

    let bytes = Frame {
        sequence: request.sequence,
        is_from_server: false,
        is_response: true,
        words: vec!["OK".into(), "2".into(), "3".into()],
    }
    .to_bytes();
    for chunk in bytes.chunks(3) {
        server.get_mut().write_all(chunk).await.unwrap();
        tokio::task::yield_now().await;
    }

    let value = call.await.unwrap().unwrap();
    assert_eq!(value.get("currentMapIndex"), Some(&Value::Int(2)));
    assert_eq!(value.get("nextMapIndex"), Some(&Value::Int(3)));
}

#[tokio::test]
async fn test_connect_over_tcp_queues_until_connected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = ClientConfig {
        address: listener.local_addr().unwrap().to_string(),
        ..ClientConfig::default()
    };

    let client = Client::connect(config).unwrap();
    assert_eq!(client.state(), SessionState::Connecting);
    client.send(Command::new("version")).unwrap();

    let (socket, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
    let mut server = Framed::new(socket, FrameCodec::new());
    let frame = timeout(WAIT, server.next()).await.unwrap().unwrap().unwrap();
    assert_eq!(frame.words, vec!["version"]);

    wait_for_state(&client, SessionState::Authenticated).await;
    client.close().unwrap();
}

#[tokio::test]
async fn test_connect_failure_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let client = Client::connect(ClientConfig {
        address,
        ..ClientConfig::default()
    })
    .unwrap();
    let mut notices = client.notices();

    assert!(matches!(notice(&mut notices).await, SessionNotice::Error(_)));
    assert_eq!(client.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_connect_rejects_invalid_config() {
    let result = Client::connect(ClientConfig {
        address: String::new(),
        ..ClientConfig::default()
    });
    assert!(matches!(result, Err(ProtocolError::ConfigError(_))));
}
