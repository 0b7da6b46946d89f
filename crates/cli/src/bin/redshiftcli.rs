use std::process::ExitCode;

use clap::Parser;
use dbcli::app::{self, REDSHIFT_CLIENT};
use dbcli::args::RedshiftCliArgs;

#[tokio::main]
async fn main() -> ExitCode {
    let args = RedshiftCliArgs::parse();
    app::run(&REDSHIFT_CLIENT, args.into_launch()).await
}
