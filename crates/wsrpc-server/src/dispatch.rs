//! Per-connection packet loop and the three execution flows.
//!
//! One task per accepted socket reads frames and routes them by packet code;
//! each accepted request runs in its own task so a suspended handler never
//! blocks other in-flight requests on the same connection. All packets for
//! one correlation id are produced by a single task, which is what preserves
//! per-id ordering through the shared outbound queue.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use wsrpc_wire::{close_code, codec, Code, Packet, Reply};

use crate::client::Client;
use crate::error::HandlerError;
use crate::registry::{Emitter, Endpoint, StreamBody};
use crate::server::ServerState;
use crate::stream::{StreamHandle, StreamShared};

pub(crate) async fn run_connection(state: Arc<ServerState>, socket: WebSocket) {
    let id = state.next_client_id.fetch_add(1, Ordering::Relaxed);
    let (mut sink, mut incoming) = socket.split();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Message>();
    let client = Arc::new(Client::new(id, tx));

    state.clients.lock().insert(id, Arc::clone(&client));
    info!(client = id, "client connected");

    // Writer drains the queue until every sender is gone or the socket
    // rejects a write. Handler tasks hold senders through their client Arc.
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = incoming.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(err) => {
                debug!(client = id, "receive error: {err}");
                break;
            }
        };
        match msg {
            Message::Binary(data) => match codec::decode(&data) {
                Ok(packet) => dispatch_packet(&state, &client, packet).await,
                Err(err) => {
                    warn!(client = id, "dropping undecodable frame: {err}");
                    send_error(&client, 0, "/error", err.to_string(), Vec::new());
                }
            },
            Message::Text(_) => {
                // Binary is the only accepted framing. Reject the frame,
                // leave the connection and its open streams untouched.
                warn!(client = id, "text frame rejected");
                send_error(
                    &client,
                    0,
                    "/error",
                    close_code::describe(close_code::TEXT_FRAME_REJECTED).to_string(),
                    vec![close_code::TEXT_FRAME_REJECTED.to_string()],
                );
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    state.clients.lock().remove(&id);
    client.clear_streams();
    info!(client = id, "client disconnected");
}

/// Route one decoded packet to its execution flow.
pub(crate) async fn dispatch_packet(state: &Arc<ServerState>, client: &Arc<Client>, packet: Packet) {
    match packet.code {
        Code::ExecReq => exec_single(state, client, packet),
        Code::Exec2Req => exec_stream(state, client, packet),
        Code::Exec3Req => exec_duplex_open(state, client, packet).await,
        Code::Exec3Push => exec_duplex_push(client, packet).await,
        Code::Exec3Close => exec_duplex_close(client, packet).await,
        other => {
            send_error(
                client,
                packet.id,
                "/error",
                format!("unknown packet code: {}", other.tag()),
                Vec::new(),
            );
        }
    }
}

/// EXEC_REQ: ACCEPT, invoke, one response, COMPLETE.
fn exec_single(state: &Arc<ServerState>, client: &Arc<Client>, packet: Packet) {
    let Packet {
        id,
        endpoint,
        args,
        bytes,
        ..
    } = packet;

    let handler = match state.registry.resolve(&endpoint) {
        Some(Endpoint::Call(handler)) => Arc::clone(handler),
        Some(_) => {
            send_error(
                client,
                id,
                &endpoint,
                format!("endpoint {endpoint} does not accept single execution"),
                Vec::new(),
            );
            return;
        }
        None => {
            send_error(
                client,
                id,
                &endpoint,
                format!("endpoint not found: {endpoint}"),
                Vec::new(),
            );
            return;
        }
    };

    client.send(Packet::accept(id, &endpoint));
    let client = Arc::clone(client);
    tokio::spawn(async move {
        match handler.call(args, bytes, Arc::clone(&client)).await {
            Ok(reply) => match reply.to_bytes() {
                Ok(payload) => {
                    client.send(Packet::response(id, Code::ExecResp, &endpoint, payload));
                    client.send(Packet::complete(id, &endpoint));
                }
                Err(err) => send_error(&client, id, &endpoint, err.to_string(), Vec::new()),
            },
            Err(err) => send_error(&client, id, &endpoint, err.message, err.stack),
        }
    });
}

/// EXEC2_REQ: ACCEPT, invoke with an emitter, drain the produced sequence,
/// COMPLETE. A mid-stream error truncates with ERROR then COMPLETE.
fn exec_stream(state: &Arc<ServerState>, client: &Arc<Client>, packet: Packet) {
    let Packet {
        id,
        endpoint,
        args,
        bytes,
        ..
    } = packet;

    let handler = match state.registry.resolve(&endpoint) {
        Some(Endpoint::Stream(handler)) => Arc::clone(handler),
        Some(_) => {
            send_error(
                client,
                id,
                &endpoint,
                format!("endpoint {endpoint} does not stream"),
                Vec::new(),
            );
            return;
        }
        None => {
            send_error(
                client,
                id,
                &endpoint,
                format!("endpoint not found: {endpoint}"),
                Vec::new(),
            );
            return;
        }
    };

    client.send(Packet::accept(id, &endpoint));
    let emitter = Emitter::new(Arc::clone(client), id, Code::Exec2Resp, endpoint.clone());
    let client = Arc::clone(client);
    tokio::spawn(async move {
        match handler
            .call(args, bytes, Arc::clone(&client), emitter.clone())
            .await
        {
            Ok(body) => match drain_stream_body(&emitter, body).await {
                None => client.send(Packet::complete(id, &endpoint)),
                Some(err) => send_error(&client, id, &endpoint, err.message, err.stack),
            },
            Err(err) => send_error(&client, id, &endpoint, err.message, err.stack),
        }
    });
}

async fn drain_stream_body(emitter: &Emitter, body: StreamBody) -> Option<HandlerError> {
    match body {
        StreamBody::Done => None,
        StreamBody::Item(item) => {
            emitter.emit(item);
            None
        }
        StreamBody::Items(items) => {
            for item in items {
                emitter.emit(item);
            }
            None
        }
        StreamBody::Stream(mut stream) => {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(bytes) => emitter.emit(bytes),
                    Err(err) => return Some(err),
                }
            }
            None
        }
    }
}

/// EXEC3_REQ: ACCEPT, park a stream context on the client, invoke the
/// handler with a handle it may keep. The invocation is awaited so its
/// hooks are installed before the next frame is read; handlers that want to
/// emit long after setup spawn their own tasks and return. No COMPLETE is
/// sent here; the stream stays open until closed or the connection dies.
async fn exec_duplex_open(state: &Arc<ServerState>, client: &Arc<Client>, packet: Packet) {
    let Packet {
        id,
        endpoint,
        args,
        bytes,
        ..
    } = packet;

    let handler = match state.registry.resolve(&endpoint) {
        Some(Endpoint::Duplex(handler)) => Arc::clone(handler),
        Some(_) => {
            send_error(
                client,
                id,
                &endpoint,
                format!("endpoint {endpoint} is not bidirectional"),
                Vec::new(),
            );
            return;
        }
        None => {
            send_error(
                client,
                id,
                &endpoint,
                format!("endpoint not found: {endpoint}"),
                Vec::new(),
            );
            return;
        }
    };

    client.send(Packet::accept(id, &endpoint));

    let shared = Arc::new(StreamShared::default());
    client.insert_stream(id, endpoint.clone(), Arc::clone(&shared));
    let handle = StreamHandle::new(
        shared,
        Emitter::new(Arc::clone(client), id, Code::Exec3Resp, endpoint.clone()),
    );

    if let Err(err) = handler
        .call(args, bytes, Arc::clone(client), handle)
        .await
    {
        client.remove_stream(id);
        send_error(client, id, &endpoint, err.message, err.stack);
    }
}

/// EXEC3_PUSH: feed the push hook of an open stream. A hook failure is
/// reported but leaves the stream open; an unknown id terminates the
/// would-be exchange with ERROR and COMPLETE.
async fn exec_duplex_push(client: &Arc<Client>, packet: Packet) {
    let Some((endpoint, shared)) = client.stream(packet.id) else {
        send_error(
            client,
            packet.id,
            "/error",
            format!("no active stream for id: {}", packet.id),
            Vec::new(),
        );
        return;
    };

    let hook = shared.on_push.lock().clone();
    if let Some(hook) = hook {
        if let Err(err) = hook(packet.bytes).await {
            client.send(error_packet(
                packet.id,
                &endpoint,
                Reply::nok(err.message, err.stack),
            ));
        }
    }
}

/// EXEC3_CLOSE: run the close hook, COMPLETE, drop the context. Unknown ids
/// are a no-op so a duplicate close is harmless.
async fn exec_duplex_close(client: &Arc<Client>, packet: Packet) {
    let Some((endpoint, shared)) = client.take_stream(packet.id) else {
        return;
    };

    let hook = shared.on_close.lock().take();
    if let Some(hook) = hook {
        if let Err(err) = hook().await {
            warn!(id = packet.id, "stream close hook failed: {err}");
        }
    }
    client.send(Packet::complete(packet.id, &endpoint));
}

fn error_packet(id: u32, endpoint: &str, reply: Reply) -> Packet {
    Packet::error(id, endpoint, reply.to_bytes().ok())
}

/// ERROR followed by the terminal COMPLETE for the same id.
pub(crate) fn send_error(
    client: &Arc<Client>,
    id: u32,
    endpoint: &str,
    message: String,
    stack: Vec<String>,
) {
    client.send(error_packet(id, endpoint, Reply::nok(message, stack)));
    client.send(Packet::complete(id, endpoint));
}
