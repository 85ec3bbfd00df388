mod cli;
mod commands;
mod error;
mod host;
mod output;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use estatedesk_config as config;
use estatedesk_core::{Engine, Page, SiteConfig, Tab, TlsMode};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;
use crate::host::TerminalConfirm;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Local commands don't need a site
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),
        Command::Domains => commands::domains::handle(&cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "estatedesk", &mut std::io::stdout());
            Ok(())
        }

        // Everything else drives the engine against a site
        cmd => {
            let engine = build_engine(&cli.global)?;
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &engine, &cli.global).await
        }
    }
}

/// Build the engine from the config file, profile, and CLI overrides.
fn build_engine(global: &GlobalOpts) -> Result<Engine, CliError> {
    let cfg = config::load_config()?;

    let (profile_name, mut site, profile_page) = match cfg.profile(global.profile.as_deref()) {
        Ok((name, profile)) => {
            let mut profile = profile.clone();
            if let Some(ref url) = global.base_url {
                profile.base_url.clone_from(url);
            }
            let site = config::profile_to_site_config(&profile, &name, &cfg.defaults)?;
            (name, site, profile.page)
        }
        // A named profile must exist; without one, flags alone may do
        Err(_) if global.profile.is_some() => {
            let name = global.profile.clone().unwrap_or_default();
            let available: Vec<_> = cfg.profiles.keys().cloned().collect();
            return Err(CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        Err(_) => {
            let url_str = global.base_url.as_deref().ok_or_else(|| CliError::NoConfig {
                path: config::config_path().display().to_string(),
            })?;
            let url: url::Url = url_str.parse().map_err(|_| CliError::Validation {
                field: "base-url".into(),
                reason: format!("invalid URL: {url_str}"),
            })?;

            let mut site = SiteConfig::new(url);
            site.timeout = Duration::from_secs(cfg.defaults.timeout);
            if cfg.defaults.insecure {
                site.tls = TlsMode::DangerAcceptInvalid;
            }
            ("(flags)".to_owned(), site, None)
        }
    };

    if let Some(ref session) = global.session {
        site.session = Some(SecretString::from(session.clone()));
    }
    if let Some(seconds) = global.timeout {
        site.timeout = Duration::from_secs(seconds);
    }
    if global.insecure {
        site.tls = TlsMode::DangerAcceptInvalid;
    }
    if site.session.is_none() {
        tracing::warn!(profile = %profile_name, "no session cookie configured, requests are anonymous");
    }

    let page_path = global
        .page
        .clone()
        .or(profile_page)
        .unwrap_or_else(|| "/".into());
    let page = Page::at(&page_path);
    if let Some(ref tab) = global.tab {
        page.set_tabs(vec![Tab::new(tab.clone(), tab.clone())]);
        page.activate_tab(tab);
    }

    let prompt = Arc::new(TerminalConfirm {
        yes: global.yes,
        interactive: host::is_interactive(global),
    });
    Ok(Engine::new(
        &site,
        config::engine_settings(&cfg.defaults),
        page,
        prompt,
    )?)
}
