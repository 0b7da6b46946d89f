use std::process::ExitCode;

use clap::Parser;
use dbcli::app::{self, ATHENA_CLIENT};
use dbcli::args::AthenaCliArgs;

#[tokio::main]
async fn main() -> ExitCode {
    let args = AthenaCliArgs::parse();
    app::run(&ATHENA_CLIENT, args.into_launch()).await
}
