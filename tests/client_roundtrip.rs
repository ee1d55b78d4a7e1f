mod common;

use common::{ config_with_key, spawn_relay, state_with, StubProvider };
use lex_relay::client::{ ClientError, RelayClient, Transcript };
use lex_relay::config::RelayConfig;
use lex_relay::models::ChatMessage;
use lex_relay::server::{ api::AppState, Server };
use std::time::{ Duration, Instant };
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

fn client_for(addr: std::net::SocketAddr) -> RelayClient {
    RelayClient::new(format!("http://{}", addr)).unwrap()
}

#[tokio::test]
async fn success_returns_trimmed_text() {
    let stub = StubProvider::replying("  Здравствуйте\n");
    let addr = spawn_relay(state_with(config_with_key(), &stub)).await;

    let reply = client_for(addr).send(&[ChatMessage::user("Привет")]).await.unwrap();

    assert_eq!(reply, "Здравствуйте");
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn same_list_twice_makes_two_provider_calls() {
    let stub = StubProvider::replying("ok");
    let addr = spawn_relay(state_with(config_with_key(), &stub)).await;
    let client = client_for(addr);
    let messages = [ChatMessage::user("Привет")];

    let (a, b) = futures::future::join(client.send(&messages), client.send(&messages)).await;

    assert_eq!(a.unwrap(), "ok");
    assert_eq!(b.unwrap(), "ok");
    assert_eq!(stub.calls(), 2);
}

#[tokio::test]
async fn error_status_carries_code_and_body() {
    let stub = StubProvider::failing("rate limited");
    let addr = spawn_relay(state_with(config_with_key(), &stub)).await;

    let err = client_for(addr).send(&[ChatMessage::user("Привет")]).await.unwrap_err();

    match err {
        ClientError::Status { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("rate limited"), "body: {}", body);
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_credential_surfaces_as_status() {
    let stub = StubProvider::replying("unused");
    let addr = spawn_relay(state_with(RelayConfig::default(), &stub)).await;

    let err = client_for(addr).send(&[ChatMessage::user("Привет")]).await.unwrap_err();

    assert!(matches!(err, ClientError::Status { status: 500, .. }));
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn slow_provider_hits_client_deadline() {
    let stub = StubProvider::slow("too late", Duration::from_secs(5));
    let addr = spawn_relay(state_with(config_with_key(), &stub)).await;
    let client = RelayClient::builder(format!("http://{}", addr))
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();

    let started = Instant::now();
    let err = client.send(&[ChatMessage::user("Привет")]).await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_timeout(), "expected timeout, got {:?}", err);
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
}

#[tokio::test]
async fn timeout_closes_the_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = tokio::sync::oneshot::channel();

    // accepts the request and never answers; reports when the peer hangs up
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
        let _ = closed_tx.send(Instant::now());
    });

    let client = RelayClient::builder(format!("http://{}", addr))
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let err = client.send(&[ChatMessage::user("hi")]).await.unwrap_err();
    assert!(err.is_timeout());

    let closed = tokio::time::timeout(Duration::from_secs(5), closed_rx).await;
    assert!(closed.is_ok(), "client left the connection open");
}

#[tokio::test]
async fn external_cancel_is_distinct_from_timeout() {
    let stub = StubProvider::slow("too late", Duration::from_secs(5));
    let addr = spawn_relay(state_with(config_with_key(), &stub)).await;
    let client = client_for(addr);
    let token = CancellationToken::new();

    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = client.send_with_cancel(&[ChatMessage::user("hi")], token).await.unwrap_err();

    assert!(matches!(err, ClientError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn unreachable_relay_is_a_transport_error() {
    // grab a free port, then release it so nothing is listening there
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let err = client_for(addr).send(&[ChatMessage::user("hi")]).await.unwrap_err();

    assert!(matches!(err, ClientError::Transport(_)), "got {:?}", err);
}

#[tokio::test]
async fn transcript_grows_on_success_and_rolls_back_on_failure() {
    let ok = StubProvider::replying("Ответ");
    let ok_addr = spawn_relay(state_with(config_with_key(), &ok)).await;
    let mut transcript = Transcript::new();

    let reply = client_for(ok_addr).send_turn(&mut transcript, "Вопрос").await.unwrap();
    assert_eq!(reply, "Ответ");
    assert_eq!(transcript.messages(), &[ChatMessage::user("Вопрос"), ChatMessage::assistant("Ответ")]);

    let failing = StubProvider::failing("rate limited");
    let bad_addr = spawn_relay(state_with(config_with_key(), &failing)).await;
    let err = client_for(bad_addr).send_turn(&mut transcript, "Ещё вопрос").await;
    assert!(err.is_err());
    assert_eq!(transcript.len(), 2);

    let sent = failing.last_request().unwrap();
    // directive + full history + the new turn
    assert_eq!(sent.messages.len(), 4);
    assert_eq!(sent.messages[3], ChatMessage::user("Ещё вопрос"));
}

#[tokio::test]
async fn caller_key_travels_with_requests() {
    let stub = StubProvider::replying("ok");
    let config = RelayConfig { server_api_key: Some("secret".into()), ..config_with_key() };
    let addr = spawn_relay(state_with(config, &stub)).await;

    let anonymous = client_for(addr).send(&[ChatMessage::user("hi")]).await.unwrap_err();
    assert!(matches!(anonymous, ClientError::Status { status: 401, .. }));

    let keyed = RelayClient::builder(format!("http://{}", addr))
        .api_key(Some("secret".into()))
        .build()
        .unwrap();
    assert_eq!(keyed.send(&[ChatMessage::user("hi")]).await.unwrap(), "ok");
}

#[tokio::test]
async fn health_probe_through_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Server::new(AppState::new(RelayConfig::default(), None));
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });

    assert!(client_for(addr).health().await.unwrap());
}
