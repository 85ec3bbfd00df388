//! Clap derive structures for the `estatedesk` CLI.
//!
//! Only depends on clap + clap_complete so `build.rs` can include it.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// estatedesk -- drive the property-management admin from a terminal
#[derive(Debug, Parser)]
#[command(
    name = "estatedesk",
    version,
    about = "Create, edit and delete property-management records from the command line",
    long_about = "Runs the admin site's modal CRUD workflows in a terminal.\n\n\
        Forms are fetched from the server, filled in interactively (or with --set),\n\
        and submitted with the session cookie and CSRF token of a profile.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Site profile to use
    #[arg(long, short = 'p', env = "ESTATEDESK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Admin site URL (overrides profile)
    #[arg(long, short = 'u', env = "ESTATEDESK_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Session cookie value (overrides profile and keyring)
    #[arg(long, env = "ESTATEDESK_SESSION", global = true, hide_env_values = true)]
    pub session: Option<String>,

    /// List page the command runs on, e.g. "/admin/payment/?status=unpaid"
    #[arg(long, global = true)]
    pub page: Option<String>,

    /// Active tab of the list page, kept across the reload
    #[arg(long, global = true)]
    pub tab: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ESTATEDESK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Never prompt; only --set / --value supply input
    #[arg(long, global = true)]
    pub no_input: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "ESTATEDESK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "ESTATEDESK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// Record kinds managed through the admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Domain {
    Community,
    Building,
    Property,
    Owner,
    Tenant,
    Maintenance,
    FeeStandard,
    Bill,
    PaymentRecord,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the create form of a record kind
    #[command(alias = "new")]
    Add(FormArgs),

    /// Open the edit form of a record
    Edit(EditArgs),

    /// Delete a record after confirmation
    #[command(alias = "rm")]
    Delete(DeleteArgs),

    /// Show a record read-only (payment records)
    #[command(alias = "view")]
    Show(ShowArgs),

    /// Run a status action (maintenance assign/start/complete/close/reopen,
    /// bill update-status/update-payment-method)
    #[command(alias = "tr")]
    Transition(TransitionArgs),

    /// Delete several records at once (bills, fee standards, payment records)
    BatchDelete(BatchDeleteArgs),

    /// List record kinds with their routes and actions
    Domains,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CRUD
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct FormArgs {
    /// Record kind
    pub domain: Domain,

    /// Pre-fill a field (repeatable): --set name="Maple Court"
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Record kind
    pub domain: Domain,

    /// Record id
    pub id: String,

    /// Change a field (repeatable): --set status=closed
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Record kind
    pub domain: Domain,

    /// Record id
    pub id: String,

    /// Record name shown in the confirmation
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Record kind
    pub domain: Domain,

    /// Record id
    pub id: String,
}

#[derive(Debug, Args)]
pub struct TransitionArgs {
    /// Record kind (maintenance or bill)
    pub domain: Domain,

    /// Record id
    pub id: String,

    /// Action name, e.g. "assign", "update-status"
    pub action: String,

    /// Input for actions that need one (worker name, result, status...)
    #[arg(long)]
    pub value: Option<String>,
}

#[derive(Debug, Args)]
pub struct BatchDeleteArgs {
    /// Record kind
    pub domain: Domain,

    /// Ids of the records to delete
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<String>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{raw}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty field name in '{raw}'"));
    }
    Ok((key.trim().to_owned(), value.to_owned()))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Set a profile value
    Set {
        /// Profile key (base_url, session_cookie_env, session_cookie_name,
        /// csrf_token, page, ca_cert, insecure, timeout)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a session cookie in the system keyring
    SetSession {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },

    /// Print the config file path
    Path,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
