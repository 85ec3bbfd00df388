//! Command dispatch: bridges CLI args -> engine workflows -> output.

pub mod config_cmd;
pub mod crud;
pub mod domains;
pub mod show;
pub mod transition;
pub mod util;

use estatedesk_core::Engine;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a site-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Add(args) => crud::add(engine, args, global).await,
        Command::Edit(args) => crud::edit(engine, args, global).await,
        Command::Delete(args) => crud::delete(engine, args, global).await,
        Command::Show(args) => show::show(engine, args, global).await,
        Command::Transition(args) => transition::transition(engine, args, global).await,
        Command::BatchDelete(args) => transition::batch_delete(engine, args, global).await,
        // Handled before an engine is built
        Command::Domains | Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not need a site connection".into(),
        )),
    }
}
