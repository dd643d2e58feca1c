use std::time::Duration;

use wsrpc_server::{Emitter, HandlerError, ServerConfig, StreamBody, StreamHandle, WsServer};
use wsrpc_wire::Reply;

use crate::cmd::ServeArgs;
use crate::exit::{io_error, server_error, CliResult, SUCCESS};

pub async fn run(args: ServeArgs) -> CliResult<i32> {
    let server = build_server(&args);

    let listener = tokio::net::TcpListener::bind((args.bind.as_str(), args.port))
        .await
        .map_err(|err| io_error("bind failed", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| io_error("bind failed", err))?;
    println!("wsrpc serving on {addr} (ws {})", args.ws_path);

    if args.heartbeat > 0 {
        let beats = server.clone();
        let period = Duration::from_secs(args.heartbeat);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            let mut beat = 0u64;
            loop {
                ticker.tick().await;
                beat += 1;
                let _ = beats.broadcast_value("/sys/heartbeat", &beat);
            }
        });
    }

    server
        .serve_with_shutdown(listener, shutdown_signal())
        .await
        .map_err(|err| server_error("serve failed", err))?;
    println!("wsrpc stopped");
    Ok(SUCCESS)
}

fn build_server(args: &ServeArgs) -> WsServer {
    WsServer::builder()
        .config(ServerConfig {
            ws_path: args.ws_path.clone(),
            cookie_path: args.cookie_path.clone(),
            require_auth: !args.no_auth,
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
                let count: u64 = args
                    .first()
                    .and_then(|raw| raw.parse().ok())
                    .unwrap_or(5);
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

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
