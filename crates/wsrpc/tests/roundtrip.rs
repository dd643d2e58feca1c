//! End-to-end exercises over real sockets: cookie exchange, upgrade, all
//! three exec flows, events and lifecycle.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use wsrpc::client::{ClientError, ConnectError, ConnectionSettings, LifecycleState, Session};
use wsrpc::server::{Emitter, HandlerError, ServerConfig, StreamBody, StreamHandle, WsServer};
use wsrpc::wire::{codec, Code, Packet, Reply};

const WAIT: Duration = Duration::from_secs(10);

fn demo_server(require_auth: bool) -> WsServer {
    WsServer::builder()
        .config(ServerConfig {
            require_auth,
            ..ServerConfig::default()
        })
        .register_call("/auth", |args: Vec<String>, _bytes, _client| async move {
            match args.first().map(String::as_str) {
                Some("login") if args.len() == 3 => Ok(Reply::ok("session refreshed")),
                _ => Err(HandlerError::new("usage: /auth login <user> <password>")),
            }
        })
        .register_call("/sys/echo", |args: Vec<String>, _bytes, _client| async move {
            Ok(Reply::ok(args.join(" ")))
        })
        .register_stream(
            "/sys/counter",
            |args: Vec<String>, _bytes, _client, emit: Emitter| async move {
                let count: u32 = args
                    .first()
                    .and_then(|raw| raw.parse().ok())
                    .unwrap_or(3);
                for n in 0..count {
                    emit.emit_value(&n);
                }
                Ok(StreamBody::Done)
            },
        )
        .register_duplex(
            "/sys/relay",
            |_args, _bytes, _client, stream: StreamHandle| async move {
                let emit = stream.emitter();
                stream.on_push(move |bytes| {
                    let emit = emit.clone();
                    async move {
                        emit.emit(bytes.unwrap_or_default());
                        Ok(())
                    }
                });
                stream.on_close(|| async { Ok(()) });
                Ok(())
            },
        )
        .build()
}

async fn start_server(require_auth: bool) -> (u16, WsServer) {
    let server = demo_server(require_auth);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    let serving = server.clone();
    tokio::spawn(async move {
        let _ = serving.serve(listener).await;
    });
    (port, server)
}

fn settings(port: u16) -> ConnectionSettings {
    ConnectionSettings {
        hostname: "127.0.0.1".to_string(),
        port,
        username: "tester".to_string(),
        password: "secret".to_string(),
        ..ConnectionSettings::default()
    }
}

async fn ready_session(port: u16) -> Session {
    let session = Session::new(settings(port));
    tokio::time::timeout(WAIT, session.connect())
        .await
        .expect("connect should not hang")
        .expect("connect should succeed");
    session
}

#[tokio::test]
async fn connect_execute_roundtrip() {
    let (port, _server) = start_server(true).await;
    let session = ready_session(port).await;

    assert!(session.is_connected());
    assert_eq!(session.lifecycle(), LifecycleState::Ready);

    let reply = session
        .execute("/sys/echo", vec!["hello".into(), "world".into()])
        .await
        .expect("execute");
    assert!(reply.is_ok);
    assert_eq!(reply.result, "hello world");

    session.disconnect();
}

#[tokio::test]
async fn unknown_endpoint_is_a_typed_failure() {
    let (port, _server) = start_server(true).await;
    let session = ready_session(port).await;

    let reply = session.execute("/missing", vec![]).await.expect("execute");
    assert!(!reply.is_ok);
    assert!(reply.result.contains("not found"));
}

#[tokio::test]
async fn streaming_yields_items_in_order() {
    let (port, _server) = start_server(true).await;
    let session = ready_session(port).await;

    let mut items = session
        .execute_streaming("/sys/counter", vec!["4".into()], None)
        .expect("stream open");

    let mut seen = Vec::new();
    while let Some(item) = tokio::time::timeout(WAIT, items.next())
        .await
        .expect("stream should not hang")
    {
        let bytes = item.expect("stream item");
        let n: u32 = codec::decode_value(&bytes).expect("item decodes");
        seen.push(n);
    }
    assert_eq!(seen, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn duplex_push_close_roundtrip() {
    let (port, _server) = start_server(true).await;
    let session = ready_session(port).await;

    let mut duplex = session
        .open_bidirectional("/sys/relay", vec![])
        .expect("duplex open");

    duplex
        .push(codec::encode_value("ping").expect("encode"))
        .expect("push");
    let echoed = tokio::time::timeout(WAIT, duplex.next())
        .await
        .expect("echo should arrive")
        .expect("item")
        .expect("payload");
    let text: String = codec::decode_value(&echoed).expect("decode");
    assert_eq!(text, "ping");

    duplex.close().expect("close");
    assert!(tokio::time::timeout(WAIT, duplex.next())
        .await
        .expect("complete should arrive")
        .is_none());
}

#[tokio::test]
async fn broadcast_reaches_subscribers() {
    let (port, server) = start_server(true).await;
    let session = ready_session(port).await;

    let mut events = session.subscribe("/sys/heartbeat");
    server
        .broadcast_value("/sys/heartbeat", &1u64)
        .expect("broadcast");

    let packet = tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("event should arrive")
        .expect("event");
    assert_eq!(packet.id, 0);
    assert_eq!(packet.endpoint, "/sys/heartbeat");
}

#[tokio::test]
async fn concurrent_connects_share_one_attempt() {
    let (port, server) = start_server(true).await;
    let session = Session::new(settings(port));

    let (first, second) = tokio::join!(session.connect(), session.connect());
    first.expect("first connect");
    second.expect("second connect");

    // One shared attempt means one credential exchange.
    assert_eq!(server.session_count(), 1);
}

#[tokio::test]
async fn connect_update_keeps_session_ready() {
    let (port, _server) = start_server(true).await;
    let session = ready_session(port).await;

    tokio::time::timeout(WAIT, session.connect_update())
        .await
        .expect("update should not hang")
        .expect("update should succeed");

    assert!(session.is_connected());
    assert_eq!(session.lifecycle(), LifecycleState::Ready);
}

#[tokio::test]
async fn disconnect_then_reconnect() {
    let (port, _server) = start_server(true).await;
    let session = ready_session(port).await;

    session.disconnect();
    for _ in 0..200 {
        if session.lifecycle() == LifecycleState::Disconnected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(session.lifecycle(), LifecycleState::Disconnected);
    assert!(!session.is_connected());
    assert!(matches!(
        session.execute("/sys/echo", vec![]).await,
        Err(ClientError::NotConnected)
    ));

    tokio::time::timeout(WAIT, session.connect())
        .await
        .expect("reconnect should not hang")
        .expect("reconnect should succeed");
    assert!(session.is_connected());
}

#[tokio::test]
async fn wrong_credentials_fail_authentication() {
    let (port, _server) = start_server(true).await;
    let session = Session::new(ConnectionSettings {
        password: "x".to_string(),
        ..settings(port)
    });

    let err = tokio::time::timeout(WAIT, session.connect())
        .await
        .expect("connect should not hang")
        .expect_err("connect must fail");
    assert!(matches!(
        err,
        ClientError::Connect(ConnectError::AuthenticationFailed(_))
    ));
    assert_eq!(session.lifecycle(), LifecycleState::AuthenticationFailed);
}

#[tokio::test]
async fn upgrade_without_cookie_is_refused() {
    let (port, _server) = start_server(true).await;
    let result = connect_async(format!("ws://127.0.0.1:{port}/socket")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn other_paths_are_refused_before_upgrade() {
    let (port, _server) = start_server(false).await;
    let result = connect_async(format!("ws://127.0.0.1:{port}/elsewhere")).await;
    assert!(result.is_err());
}

type RawSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn raw_next_packet(socket: &mut RawSocket) -> Packet {
    loop {
        let frame = tokio::time::timeout(WAIT, socket.next())
            .await
            .expect("frame should arrive")
            .expect("socket open")
            .expect("frame ok");
        match frame {
            Message::Binary(buf) => return codec::decode(&buf).expect("frame decodes"),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn raw_send(socket: &mut RawSocket, packet: &Packet) {
    let buf = codec::encode(packet).expect("encode");
    socket
        .send(Message::Binary(buf.into()))
        .await
        .expect("send");
}

#[tokio::test]
async fn text_frame_rejected_without_disturbing_streams() {
    let (port, _server) = start_server(false).await;
    let (mut socket, _) = connect_async(format!("ws://127.0.0.1:{port}/socket"))
        .await
        .expect("upgrade");

    // Open a duplex stream first.
    raw_send(&mut socket, &Packet::exec3_request("/sys/relay", vec![], Some(77))).await;
    assert_eq!(raw_next_packet(&mut socket).await.code, Code::Accept);

    // A text frame is rejected per-message...
    socket
        .send(Message::Text("not binary".into()))
        .await
        .expect("send text");
    let error = raw_next_packet(&mut socket).await;
    assert_eq!(error.code, Code::Error);
    assert_eq!(error.id, 0);
    let reply = Reply::from_optional(error.bytes.as_deref());
    assert!(reply.result.contains("binary"));
    assert_eq!(raw_next_packet(&mut socket).await.code, Code::Complete);

    // ...and the open stream still works afterwards.
    raw_send(
        &mut socket,
        &Packet::exec3_push(77, codec::encode_value("still alive").expect("encode")),
    )
    .await;
    let echoed = raw_next_packet(&mut socket).await;
    assert_eq!(echoed.code, Code::Exec3Resp);
    assert_eq!(echoed.id, 77);

    raw_send(&mut socket, &Packet::exec3_close(77)).await;
    let done = raw_next_packet(&mut socket).await;
    assert_eq!(done.code, Code::Complete);
    assert_eq!(done.id, 77);
}

#[tokio::test]
async fn interleaved_calls_stay_correlated() {
    let (port, _server) = start_server(true).await;
    let session = ready_session(port).await;

    let (a, b, c) = tokio::join!(
        session.execute("/sys/echo", vec!["alpha".into()]),
        session.execute("/sys/echo", vec!["beta".into()]),
        session.execute("/sys/echo", vec!["gamma".into()]),
    );

    assert_eq!(a.expect("alpha").result, "alpha");
    assert_eq!(b.expect("beta").result, "beta");
    assert_eq!(c.expect("gamma").result, "gamma");
}
