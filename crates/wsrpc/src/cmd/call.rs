use wsrpc_client::{ConnectionSettings, Session};

use crate::cmd::{CallArgs, TargetArgs};
use crate::exit::{client_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_reply, OutputFormat};

pub(crate) fn settings_from(target: &TargetArgs) -> ConnectionSettings {
    ConnectionSettings {
        hostname: target.host.clone(),
        port: target.port,
        secure: target.secure,
        ws_path: target.ws_path.clone(),
        cookie_path: target.cookie_path.clone(),
        username: target.username.clone(),
        password: target.password.clone(),
    }
}

pub async fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let session = Session::new(settings_from(&args.target));
    session
        .connect()
        .await
        .map_err(|err| client_error("connect failed", err))?;

    let reply = session
        .execute(&args.endpoint, args.args)
        .await
        .map_err(|err| client_error("execute failed", err))?;
    print_reply(&reply, format);

    session.disconnect();
    Ok(if reply.is_ok { SUCCESS } else { FAILURE })
}
