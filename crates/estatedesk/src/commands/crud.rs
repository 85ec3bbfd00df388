//! Add / edit / delete: the modal form workflows, driven from the terminal.

use estatedesk_core::form::text_content;
use estatedesk_core::{ConfirmOutcome, CrudSession, DomainKind, Engine, WorkflowState};
use tracing::debug;

use crate::cli::{DeleteArgs, EditArgs, FormArgs, GlobalOpts};
use crate::error::CliError;
use crate::host::{Host, field_error_lines};

use super::util::{self, Report};

pub async fn add(engine: &Engine, args: FormArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let kind = util::domain_kind(args.domain);
    let mut host = Host::new(engine.page(), global);

    let spinner = host.spinner(format!("Loading {} form...", kind.item_name()));
    let session = engine.add(kind).await;
    spinner.finish_and_clear();
    let Some(session) = session? else {
        return Err(load_failure(&mut host, kind));
    };

    run_form(engine, &mut host, global, kind, session, &args.set, None).await
}

pub async fn edit(engine: &Engine, args: EditArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let kind = util::domain_kind(args.domain);
    let mut host = Host::new(engine.page(), global);

    let spinner = host.spinner(format!("Loading {} #{}...", kind.item_name(), args.id));
    let session = engine.edit(kind, &args.id).await;
    spinner.finish_and_clear();
    let Some(session) = session? else {
        return Err(load_failure(&mut host, kind));
    };

    run_form(engine, &mut host, global, kind, session, &args.set, Some(&args.id)).await
}

pub async fn delete(engine: &Engine, args: DeleteArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let kind = util::domain_kind(args.domain);
    let mut host = Host::new(engine.page(), global);

    let session = engine.delete(kind, &args.id, args.name.as_deref());
    host.drain();

    let question = engine
        .page()
        .modal_view()
        .map(|view| text_content(&view.body_html))
        .unwrap_or_else(|| format!("Delete {} #{}?", kind.item_name(), args.id));

    let confirmed = match util::confirm(&host, &question, global) {
        Ok(confirmed) => confirmed,
        Err(e) => {
            session.cancel();
            return Err(e);
        }
    };
    if !confirmed {
        session.cancel();
        return Ok(());
    }

    let spinner = host.spinner(format!("Deleting {} #{}...", kind.item_name(), args.id));
    let outcome = session.confirm().await;
    spinner.finish_and_clear();
    host.drain();

    match outcome {
        Some(ConfirmOutcome::Close) => {
            let navigation = util::await_reload(engine, &mut host).await?;
            let report = Report::new(kind, "delete", Some(&args.id), "applied")
                .with_message(host.last_success())
                .with_reload(&navigation);
            util::print_report(&report, global)
        }
        Some(ConfirmOutcome::StayOpen) => {
            // The dialog stays up on failure; a terminal has nothing to retry with.
            session.cancel();
            Err(CliError::Rejected {
                message: util::failure_message(&mut host, "Delete failed"),
            })
        }
        None => Err(CliError::Internal("the delete dialog closed unexpectedly".into())),
    }
}

// ── Form loop ────────────────────────────────────────────────────────

/// Fill, submit, and on rejection re-prompt until saved or abandoned.
async fn run_form(
    engine: &Engine,
    host: &mut Host,
    global: &GlobalOpts,
    kind: DomainKind,
    mut session: CrudSession,
    presets: &[(String, String)],
    id: Option<&str>,
) -> Result<(), CliError> {
    session.ready().await;
    host.drain();

    for (name, value) in presets {
        debug!(field = %name, "applying preset");
        if let Err(e) = session.set_field(name, value).await {
            session.cancel();
            return Err(e.into());
        }
    }

    if host.interactive() {
        host.fill_form(&session).await?;
    }
    host.drain();
    // Cascade failures were already shown; only the submission decides.
    host.take_error();

    loop {
        let spinner = host.spinner(format!("Saving {}...", kind.item_name()));
        let outcome = session.submit().await;
        spinner.finish_and_clear();
        host.drain();

        match outcome {
            Some(ConfirmOutcome::Close) => break,
            Some(ConfirmOutcome::StayOpen) => {
                let message = host
                    .take_error()
                    .unwrap_or_else(|| format!("{} was not saved", kind.item_name()));
                let transport_failed = session.state() == WorkflowState::TransportFailed;

                let lines = session
                    .form()
                    .map(|form| field_error_lines(&form))
                    .unwrap_or_default();
                for line in &lines {
                    eprintln!("  {line}");
                }

                if !host.interactive() {
                    session.cancel();
                    return Err(rejection(message, &lines, transport_failed));
                }
                let retry = if transport_failed {
                    "Try saving again?"
                } else {
                    "Edit the form and try again?"
                };
                if !host.confirm(retry, true)? {
                    session.cancel();
                    return Err(rejection(message, &lines, transport_failed));
                }
                if !transport_failed {
                    host.fill_form(&session).await?;
                    host.drain();
                    host.take_error();
                }
            }
            None => return Err(CliError::Internal("the form closed unexpectedly".into())),
        }
    }

    let navigation = util::await_reload(engine, host).await?;
    let operation = if id.is_some() { "edit" } else { "add" };
    let report = Report::new(kind, operation, id, "applied")
        .with_message(host.last_success())
        .with_reload(&navigation);
    util::print_report(&report, global)
}

fn rejection(message: String, lines: &[String], transport_failed: bool) -> CliError {
    if transport_failed {
        return CliError::Rejected { message };
    }
    let message = if lines.is_empty() {
        message
    } else {
        format!("{message}: {}", lines.join("; "))
    };
    CliError::FormInvalid { message }
}

fn load_failure(host: &mut Host, kind: DomainKind) -> CliError {
    CliError::FormLoad {
        url: kind.form_root().unwrap_or_default().to_owned(),
        reason: util::failure_message(host, format!("Failed to load {} form", kind.item_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_lists_field_errors() {
        let err = rejection(
            "Please correct the highlighted fields".into(),
            &["Name: This field is required.".into()],
            false,
        );
        assert_eq!(
            err.to_string(),
            "Please correct the highlighted fields: Name: This field is required."
        );
        assert_eq!(err.exit_code(), crate::error::exit_code::USAGE);

        let err = rejection("Failed to save Community: request failed (HTTP 502)".into(), &[], true);
        assert_eq!(err.exit_code(), crate::error::exit_code::CONFLICT);
    }
}
