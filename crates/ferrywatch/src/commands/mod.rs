//! Command dispatch: bridges CLI args -> core session/decoder -> output formatting.

pub mod check;
pub mod config_cmd;
pub mod keys;
pub mod relations;
pub mod scope;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command to its handler. Completions are handled in `main`.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(args, global).await,
        Command::Check(args) => check::handle(args, global).await,
        Command::Keys(args) => keys::handle(&args, global),
        Command::Scope(args) => scope::handle(&args, global),
        Command::Relations(args) => relations::handle(&args, global),
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(_) => Err(CliError::Internal {
            message: "completions are generated before dispatch".into(),
        }),
    }
}
