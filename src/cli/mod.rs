mod args;
mod commands;
mod config_cmd;
mod run_cmd;
mod sentiment;
mod util;

pub use args::Cli;
