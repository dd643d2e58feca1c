use clap::{Args, Subcommand};

use crate::exit::{io_error, CliResult};
use crate::output::OutputFormat;

pub mod call;
pub mod serve;
pub mod stream;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a server with the built-in demo endpoints.
    Serve(ServeArgs),
    /// Invoke an endpoint once and print the reply.
    Call(CallArgs),
    /// Invoke a streaming endpoint and print each item.
    Stream(StreamArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    let runtime =
        tokio::runtime::Runtime::new().map_err(|err| io_error("runtime setup failed", err))?;
    match command {
        Command::Serve(args) => runtime.block_on(serve::run(args)),
        Command::Call(args) => runtime.block_on(call::run(args, format)),
        Command::Stream(args) => runtime.block_on(stream::run(args, format)),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on.
    #[arg(long, short = 'p', default_value = "3040")]
    pub port: u16,
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    pub bind: String,
    /// WebSocket upgrade path.
    #[arg(long, default_value = "/socket")]
    pub ws_path: String,
    /// Cookie exchange path.
    #[arg(long, default_value = "/cookie")]
    pub cookie_path: String,
    /// Accept upgrades without a session cookie.
    #[arg(long)]
    pub no_auth: bool,
    /// Broadcast a heartbeat event every N seconds (0 disables).
    #[arg(long, default_value = "0")]
    pub heartbeat: u64,
}

/// Connection target shared by the client subcommands.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Server hostname.
    #[arg(long, default_value = "localhost")]
    pub host: String,
    /// Server port.
    #[arg(long, short = 'p', default_value = "3040")]
    pub port: u16,
    /// Use TLS (wss/https).
    #[arg(long)]
    pub secure: bool,
    /// Identity for the cookie exchange.
    #[arg(long, short = 'u', env = "WSRPC_USERNAME", default_value = "wsrpc")]
    pub username: String,
    /// Password for the cookie exchange.
    #[arg(long, env = "WSRPC_PASSWORD", default_value = "wsrpc")]
    pub password: String,
    /// WebSocket upgrade path.
    #[arg(long, default_value = "/socket")]
    pub ws_path: String,
    /// Cookie exchange path.
    #[arg(long, default_value = "/cookie")]
    pub cookie_path: String,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Endpoint path, e.g. /sys/echo.
    pub endpoint: String,
    /// Positional arguments passed to the handler.
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Endpoint path, e.g. /sys/counter.
    pub endpoint: String,
    /// Positional arguments passed to the handler.
    pub args: Vec<String>,
    /// Exit after receiving N items.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
