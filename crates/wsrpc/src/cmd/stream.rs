use futures_util::StreamExt;

use wsrpc_client::Session;

use crate::cmd::call::settings_from;
use crate::cmd::StreamArgs;
use crate::exit::{client_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_item, OutputFormat};

pub async fn run(args: StreamArgs, format: OutputFormat) -> CliResult<i32> {
    let session = Session::new(settings_from(&args.target));
    session
        .connect()
        .await
        .map_err(|err| client_error("connect failed", err))?;

    let mut items = session
        .execute_streaming(&args.endpoint, args.args, None)
        .map_err(|err| client_error("stream failed", err))?;

    let mut printed = 0usize;
    while let Some(item) = items.next().await {
        match item {
            Ok(bytes) => {
                print_item(&bytes, format);
                printed = printed.saturating_add(1);
                if let Some(count) = args.count {
                    if printed >= count {
                        break;
                    }
                }
            }
            Err(err) => {
                return Err(CliError::new(FAILURE, format!("stream failed: {err}")));
            }
        }
    }

    session.disconnect();
    Ok(SUCCESS)
}
