use anyhow::Result;

use crate::config::Config;
use crate::server;

use super::args::{Cli, Command};
use super::{config_cmd, run_cmd, sentiment};

pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve(args) => server::serve(Config::load()?, args.bind).await,
        Command::Run(args) => run_cmd::handle_run(args, &Config::load()?).await,
        Command::Sentiment(args) => sentiment::handle_sentiment(args, &Config::load()?).await,
        Command::Config(args) => config_cmd::handle_config(&args),
    }
}
