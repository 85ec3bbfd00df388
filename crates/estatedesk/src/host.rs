//! Terminal host for the engine's page.
//!
//! The engine renders into a headless `Page`; this module is the screen.
//! Toasts become status lines on stderr, modal forms become dialoguer
//! prompts, and the post-mutation navigation is what a command waits for
//! before it exits.

use std::io::IsTerminal;
use std::time::Duration;

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect, Select};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::runtime::RuntimeFlavor;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, trace};

use estatedesk_core::{
    ConfirmPrompt, CrudSession, Field, FieldKind, Navigation, NoticeKind, Page, PageEvent,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{notice_line, should_color};

// ── Confirmation ─────────────────────────────────────────────────────

/// Confirmation questions asked on the terminal.
///
/// `--yes` answers everything; without a terminal every question is
/// declined so nothing destructive runs unattended.
#[derive(Debug, Clone, Copy)]
pub struct TerminalConfirm {
    pub yes: bool,
    pub interactive: bool,
}

impl ConfirmPrompt for TerminalConfirm {
    fn confirm(&self, message: &str) -> bool {
        if self.yes {
            return true;
        }
        if !self.interactive {
            debug!(question = %message, "declining confirmation without a terminal");
            return false;
        }
        off_runtime(|| {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(message)
                .default(false)
                .interact()
                .unwrap_or(false)
        })
    }
}

/// Run a blocking terminal prompt without stalling the runtime's other
/// tasks: on a multi-thread runtime the worker hands its tasks off first.
pub fn off_runtime<R>(prompt: impl FnOnce() -> R) -> R {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(prompt)
        }
        _ => prompt(),
    }
}

/// Whether prompts may be shown.
pub fn is_interactive(global: &GlobalOpts) -> bool {
    !global.no_input && std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
}

// ── Host ─────────────────────────────────────────────────────────────

pub struct Host {
    events: broadcast::Receiver<PageEvent>,
    theme: ColorfulTheme,
    color: bool,
    quiet: bool,
    interactive: bool,
    last_error: Option<String>,
    last_success: Option<String>,
    navigation: Option<Navigation>,
}

impl Host {
    /// Subscribe to `page`. Events published before this call are not seen.
    pub fn new(page: &Page, global: &GlobalOpts) -> Self {
        Self {
            events: page.subscribe(),
            theme: ColorfulTheme::default(),
            color: should_color(global.color),
            quiet: global.quiet,
            interactive: is_interactive(global),
            last_error: None,
            last_success: None,
            navigation: None,
        }
    }

    pub fn interactive(&self) -> bool {
        self.interactive
    }

    /// Print everything the page published since the last call.
    pub fn drain(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.handle(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "page events lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    fn handle(&mut self, event: PageEvent) {
        trace!(?event, "page event");
        match event {
            PageEvent::ToastShown { message, kind, .. } => {
                if !self.quiet || kind == NoticeKind::Error {
                    eprintln!("{}", notice_line(kind, &message, self.color));
                }
                match kind {
                    NoticeKind::Error => self.last_error = Some(message),
                    NoticeKind::Success => self.last_success = Some(message),
                    NoticeKind::Info | NoticeKind::Warning => {}
                }
            }
            PageEvent::ModalOpened { title, .. } => debug!(%title, "modal opened"),
            PageEvent::Navigated(navigation) => {
                if !self.quiet {
                    let line = format!("↻ {navigation}");
                    if self.color {
                        eprintln!("{}", line.dimmed());
                    } else {
                        eprintln!("{line}");
                    }
                }
                self.navigation = Some(navigation);
            }
            PageEvent::ToastRemoved { .. }
            | PageEvent::ModalUpdated { .. }
            | PageEvent::ModalClosed { .. } => {}
        }
    }

    /// The last error toast, consumed.
    pub fn take_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    pub fn last_success(&self) -> Option<&str> {
        self.last_success.as_deref()
    }

    /// Wait for the reload a successful mutation schedules.
    pub async fn wait_for_navigation(&mut self, timeout: Duration) -> Result<Navigation, CliError> {
        self.drain();
        if let Some(navigation) = self.navigation.clone() {
            return Ok(navigation);
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.events.recv()).await {
                Ok(Ok(event)) => {
                    self.handle(event);
                    if let Some(navigation) = self.navigation.clone() {
                        return Ok(navigation);
                    }
                }
                Ok(Err(RecvError::Lagged(skipped))) => debug!(skipped, "page events lagged"),
                Ok(Err(RecvError::Closed)) => {
                    return Err(CliError::Internal("page closed before reloading".into()));
                }
                Err(_) => {
                    return Err(CliError::Timeout {
                        seconds: timeout.as_secs(),
                    });
                }
            }
        }
    }

    /// Spinner on stderr; hidden when not on a terminal.
    pub fn spinner(&self, message: impl Into<String>) -> ProgressBar {
        if !self.interactive || self.quiet {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    }

    pub fn confirm(&self, message: &str, default: bool) -> Result<bool, CliError> {
        Ok(off_runtime(|| {
            Confirm::with_theme(&self.theme)
                .with_prompt(message)
                .default(default)
                .interact()
        })?)
    }

    // ── Forms ────────────────────────────────────────────────────────

    /// Walk the editable fields of the mounted form, prompting for each.
    ///
    /// Fields are re-read after every change so options filled in by a
    /// field-change hook (the property list of a community) are current.
    pub async fn fill_form(&self, session: &CrudSession) -> Result<(), CliError> {
        let form = session.form().ok_or(estatedesk_core::CoreError::ModalClosed)?;
        let names: Vec<String> = form.field_names().into_iter().map(str::to_owned).collect();

        for name in names {
            let Some(form) = session.form() else {
                return Err(estatedesk_core::CoreError::ModalClosed.into());
            };
            let group: Vec<&Field> = form.fields().iter().filter(|f| f.name == name).collect();
            let Some(first) = group.first() else {
                continue;
            };
            if !first.is_editable() {
                continue;
            }

            let current = form.value(&name).unwrap_or_default();
            let answer = off_runtime(|| {
                if first.kind == FieldKind::Radio {
                    self.prompt_radio(&group)
                } else {
                    self.prompt_field(first)
                }
            })?;

            if let Some(value) = answer.filter(|v| *v != current) {
                debug!(field = %name, "field changed");
                session.set_field(&name, &value).await?;
            }
        }
        Ok(())
    }

    /// Prompt for one control. `None` keeps the current value.
    fn prompt_field(&self, field: &Field) -> Result<Option<String>, CliError> {
        let prompt = field_prompt(field);
        match field.kind {
            FieldKind::Select if field.multiple => {
                let options: Vec<_> = field.options.iter().filter(|o| !o.disabled).collect();
                if options.is_empty() {
                    return Ok(None);
                }
                let labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
                let selected: Vec<bool> = options.iter().map(|o| o.selected).collect();
                let picked = MultiSelect::with_theme(&self.theme)
                    .with_prompt(prompt)
                    .items(&labels)
                    .defaults(&selected)
                    .interact()?;
                let values: Vec<&str> = picked
                    .into_iter()
                    .filter_map(|i| options.get(i).map(|o| o.value.as_str()))
                    .collect();
                Ok(Some(values.join(",")))
            }
            FieldKind::Select => {
                let options: Vec<_> = field.options.iter().filter(|o| !o.disabled).collect();
                if options.is_empty() {
                    return Ok(None);
                }
                let labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
                let default = options.iter().position(|o| o.selected).unwrap_or(0);
                let picked = Select::with_theme(&self.theme)
                    .with_prompt(prompt)
                    .items(&labels)
                    .default(default)
                    .interact()?;
                Ok(options.get(picked).map(|o| o.value.clone()))
            }
            FieldKind::Checkbox => {
                let on = Confirm::with_theme(&self.theme)
                    .with_prompt(prompt)
                    .default(field.checked)
                    .interact()?;
                Ok(Some(if on { "on" } else { "off" }.to_owned()))
            }
            FieldKind::Input | FieldKind::Textarea => {
                let value: String = Input::with_theme(&self.theme)
                    .with_prompt(prompt)
                    .with_initial_text(field.value.clone())
                    .allow_empty(!field.required)
                    .interact_text()?;
                Ok(Some(value))
            }
            FieldKind::Radio | FieldKind::Hidden | FieldKind::File => Ok(None),
        }
    }

    fn prompt_radio(&self, group: &[&Field]) -> Result<Option<String>, CliError> {
        let members: Vec<&&Field> = group.iter().filter(|f| !f.disabled).collect();
        let Some(first) = members.first() else {
            return Ok(None);
        };
        let labels: Vec<&str> = members.iter().map(|f| f.display_label()).collect();
        let default = members.iter().position(|f| f.checked).unwrap_or(0);
        let picked = Select::with_theme(&self.theme)
            .with_prompt(field_prompt(first))
            .items(&labels)
            .default(default)
            .interact()?;
        Ok(members.get(picked).map(|f| f.value.clone()))
    }

    /// Free-text or choice input for a transition.
    pub fn prompt_action_input(
        &self,
        label: &str,
        multiline: bool,
        choices: &[(&str, &str)],
    ) -> Result<String, CliError> {
        off_runtime(|| self.read_action_input(label, multiline, choices))
    }

    fn read_action_input(
        &self,
        label: &str,
        multiline: bool,
        choices: &[(&str, &str)],
    ) -> Result<String, CliError> {
        if !choices.is_empty() {
            let labels: Vec<&str> = choices.iter().map(|(_, text)| *text).collect();
            let picked = Select::with_theme(&self.theme)
                .with_prompt(label)
                .items(&labels)
                .default(0)
                .interact()?;
            return Ok(choices
                .get(picked)
                .map(|(value, _)| (*value).to_owned())
                .unwrap_or_default());
        }
        let prompt = if multiline {
            format!("{label} (one line)")
        } else {
            label.to_owned()
        };
        Ok(Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact_text()?)
    }
}

/// Prompt text: label, required marker and the error from the last submit.
fn field_prompt(field: &Field) -> String {
    let mut prompt = field.display_label().to_owned();
    if field.required {
        prompt.push_str(" *");
    }
    if let Some(error) = &field.error {
        prompt.push_str(&format!(" ({error})"));
    }
    prompt
}

/// Field errors of a form as `label: message` lines.
pub fn field_error_lines(form: &estatedesk_core::FormDocument) -> Vec<String> {
    let mut lines: Vec<String> = form
        .fields()
        .iter()
        .filter_map(|f| {
            f.error
                .as_ref()
                .map(|e| format!("{}: {e}", f.display_label()))
        })
        .collect();
    lines.extend(form.form_errors().iter().cloned());
    lines
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use estatedesk_core::{FieldErrors, FormDocument, NON_FIELD_ERRORS};

    use super::*;

    const FORM: &str = r#"
        <label for="id_name">Name</label>
        <input type="text" name="name" id="id_name" required>
        <label for="id_city">City</label>
        <input type="text" name="city" id="id_city">
    "#;

    #[test]
    fn prompt_marks_required_and_errors() {
        let mut form = FormDocument::parse(FORM);
        let mut errors = FieldErrors::new();
        errors.insert("name".into(), "This field is required.".into());
        form.apply_field_errors(&errors);

        assert_eq!(
            field_prompt(form.field("name").unwrap()),
            "Name * (This field is required.)"
        );
        assert_eq!(field_prompt(form.field("city").unwrap()), "City");
    }

    #[test]
    fn error_lines_include_form_level_errors() {
        let mut form = FormDocument::parse(FORM);
        let mut errors = FieldErrors::new();
        errors.insert("name".into(), "Too short.".into());
        errors.insert(NON_FIELD_ERRORS.into(), "Duplicate community.".into());
        form.apply_field_errors(&errors);

        assert_eq!(
            field_error_lines(&form),
            ["Name: Too short.", "Duplicate community."]
        );
    }

    #[test]
    fn declines_without_a_terminal() {
        let prompt = TerminalConfirm {
            yes: false,
            interactive: false,
        };
        assert!(!prompt.confirm("Close request #8?"));
        let yes = TerminalConfirm {
            yes: true,
            interactive: false,
        };
        assert!(yes.confirm("Close request #8?"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn prompts_leave_the_runtime_serving_other_tasks() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};

        // With a single worker, the sibling only runs if the blocked
        // prompt gave the worker up.
        let answered = Arc::new(AtomicBool::new(false));
        let waited = tokio::spawn({
            let answered = Arc::clone(&answered);
            async move {
                let sibling = Arc::clone(&answered);
                tokio::spawn(async move { sibling.store(true, Ordering::SeqCst) });
                off_runtime(|| {
                    for _ in 0..200 {
                        if answered.load(Ordering::SeqCst) {
                            return true;
                        }
                        std::thread::sleep(Duration::from_millis(10));
                    }
                    false
                })
            }
        });
        assert!(waited.await.unwrap_or(false));
    }

    #[tokio::test]
    async fn current_thread_prompts_run_inline() {
        assert_eq!(off_runtime(|| 7), 7);
    }

    #[test]
    fn prompts_outside_a_runtime_run_inline() {
        assert!(off_runtime(|| true));
    }
}
