use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use serde::Serialize;
use wsrpc_wire::{codec, Reply};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    is_ok: bool,
    result: &'a str,
    stack: &'a [String],
}

pub fn print_reply(reply: &Reply, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ReplyOutput {
                is_ok: reply.is_ok,
                result: &reply.result,
                stack: &reply.stack,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Pretty => {
            let marker = if reply.is_ok { "ok" } else { "nok" };
            println!("{marker}: {}", reply.result);
            for frame in &reply.stack {
                println!("  at {frame}");
            }
        }
        OutputFormat::Raw => print_raw(reply.result.as_bytes()),
    }
}

/// Streamed items are opaque payload bytes; try the codec first and fall
/// back to a byte preview.
pub fn print_item(bytes: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Raw => print_raw(bytes),
        OutputFormat::Json | OutputFormat::Pretty => {
            match codec::decode_value::<serde_json::Value>(bytes) {
                Ok(value) => println!(
                    "{}",
                    serde_json::to_string(&value).unwrap_or_else(|_| "null".to_string())
                ),
                Err(_) => println!("{}", payload_preview(bytes)),
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_falls_back_for_binary() {
        assert_eq!(payload_preview(b"plain"), "plain");
        assert_eq!(payload_preview(&[0xFF, 0xFE]), "<binary 2 bytes>");
    }
}
