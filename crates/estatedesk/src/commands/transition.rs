//! Status actions and bulk deletes.

use estatedesk_core::{ConfirmOutcome, DomainKind, Engine, TransitionOutcome};

use crate::cli::{BatchDeleteArgs, GlobalOpts, TransitionArgs};
use crate::error::CliError;
use crate::host::Host;

use super::util::{self, Report};

pub async fn transition(
    engine: &Engine,
    args: TransitionArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let kind = util::domain_kind(args.domain);
    let action = kind.find_action(&args.action)?;
    let mut host = Host::new(engine.page(), global);

    // An input action without --value goes through its form, like the
    // page's action dialog.
    if let (Some(input), None) = (action.input, args.value.as_deref()) {
        if !host.interactive() {
            return Err(CliError::Validation {
                field: "value".into(),
                reason: format!("{} is required; pass --value", input.label),
            });
        }
        return prompt_transition(engine, &mut host, global, kind, &args).await;
    }

    let spinner = host.spinner(format!("{} #{}...", action.label, args.id));
    let outcome = engine
        .transition(kind, &args.id, action.name, args.value.as_deref())
        .await;
    spinner.finish_and_clear();
    finish(engine, &mut host, global, kind, &args.action, Some(&args.id), outcome?).await
}

async fn prompt_transition(
    engine: &Engine,
    host: &mut Host,
    global: &GlobalOpts,
    kind: DomainKind,
    args: &TransitionArgs,
) -> Result<(), CliError> {
    let Some(session) = engine.prompt_transition(kind, &args.id, &args.action)? else {
        return Err(CliError::Unsupported {
            domain: kind.to_string(),
            operation: format!("input for {}", args.action),
        });
    };
    let action = kind.find_action(&args.action)?;
    let Some(input) = action.input else {
        return Err(CliError::Internal(format!("{} takes no input", args.action)));
    };

    loop {
        let value = host.prompt_action_input(input.label, input.multiline, input.choices)?;
        session.set_value(&value)?;

        let outcome = session.submit().await;
        host.drain();
        match outcome {
            Some(ConfirmOutcome::Close) => break,
            Some(ConfirmOutcome::StayOpen) => {
                if !host.confirm("Try again?", true)? {
                    session.cancel();
                    return Err(CliError::Rejected {
                        message: util::failure_message(host, format!("{} failed", action.label)),
                    });
                }
                host.take_error();
            }
            None => return Err(CliError::Internal("the action dialog closed unexpectedly".into())),
        }
    }

    let navigation = util::await_reload(engine, host).await?;
    let report = Report::new(kind, &args.action, Some(&args.id), "applied")
        .with_message(host.last_success())
        .with_reload(&navigation);
    util::print_report(&report, global)
}

pub async fn batch_delete(
    engine: &Engine,
    args: BatchDeleteArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let kind = util::domain_kind(args.domain);
    if kind.batch_plan().is_none() {
        return Err(CliError::Unsupported {
            domain: kind.to_string(),
            operation: "batch delete".into(),
        });
    }
    let mut host = Host::new(engine.page(), global);

    let spinner = host.spinner(format!("Deleting {} {}...", args.ids.len(), kind.plural()));
    let outcome = engine.batch_delete(kind, &args.ids).await;
    spinner.finish_and_clear();
    finish(engine, &mut host, global, kind, "batch-delete", None, outcome?).await
}

/// Turn an outcome into output or an error.
async fn finish(
    engine: &Engine,
    host: &mut Host,
    global: &GlobalOpts,
    kind: DomainKind,
    operation: &str,
    id: Option<&str>,
    outcome: TransitionOutcome,
) -> Result<(), CliError> {
    host.drain();
    match outcome {
        TransitionOutcome::Applied => {
            let navigation = util::await_reload(engine, host).await?;
            let report = Report::new(kind, operation, id, "applied")
                .with_message(host.last_success())
                .with_reload(&navigation);
            util::print_report(&report, global)
        }
        TransitionOutcome::Declined if !global.yes && !host.interactive() => {
            Err(CliError::NonInteractiveRequiresYes {
                action: format!("{operation} on {}", kind.plural()),
            })
        }
        TransitionOutcome::Declined => {
            util::print_report(&Report::new(kind, operation, id, "declined"), global)
        }
        TransitionOutcome::Failed => Err(CliError::Rejected {
            message: util::failure_message(host, format!("{operation} failed")),
        }),
    }
}
