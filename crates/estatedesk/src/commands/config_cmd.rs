//! Config subcommand handlers.

use dialoguer::{Input, Password, Select};

use estatedesk_config::{self as config, Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

const VALID_KEYS: &str = "base_url, session_cookie, session_cookie_env, session_cookie_name, \
                          csrf_token, page, ca_cert, insecure, timeout";

/// Active profile: `--profile`, else the config's default.
fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

fn available(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Copy of the config safe to print.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.session_cookie.is_some() {
            profile.session_cookie = Some("********".into());
        }
    }
    cfg
}

/// Apply `key = value` to a profile.
fn set_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "base_url" | "base-url" => {
            url::Url::parse(&value).map_err(|e| CliError::Validation {
                field: "base_url".into(),
                reason: format!("invalid URL: {e}"),
            })?;
            profile.base_url = value;
        }
        "session_cookie" | "session-cookie" => profile.session_cookie = Some(value),
        "session_cookie_env" | "session-cookie-env" => profile.session_cookie_env = Some(value),
        "session_cookie_name" | "session-cookie-name" => profile.session_cookie_name = Some(value),
        "csrf_token" | "csrf-token" => profile.csrf_token = Some(value),
        "page" => profile.page = Some(value),
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        "insecure" => {
            profile.insecure = Some(value.parse().map_err(|_| CliError::Validation {
                field: "insecure".into(),
                reason: "must be 'true' or 'false'".into(),
            })?);
        }
        "timeout" => {
            profile.timeout = Some(value.parse().map_err(|_| CliError::Validation {
                field: "timeout".into(),
                reason: "must be a number (seconds)".into(),
            })?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!("unknown config key '{other}'. Valid keys: {VALID_KEYS}"),
            });
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("estatedesk configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()?;

            let base_url: String = Input::new()
                .with_prompt("Admin site URL")
                .default("http://127.0.0.1:8000/".into())
                .validate_with(|input: &String| {
                    url::Url::parse(input).map(|_| ()).map_err(|e| e.to_string())
                })
                .interact_text()?;

            let cookie = Password::new()
                .with_prompt("Session cookie (sessionid, empty to skip)")
                .allow_empty_password(true)
                .interact()?;

            let mut profile = Profile {
                base_url,
                ..Profile::default()
            };

            if !cookie.is_empty() {
                let choices = &[
                    "Store in system keyring (recommended)",
                    "Save to config file (plaintext)",
                ];
                let selection = Select::new()
                    .with_prompt("Where to store the session cookie?")
                    .items(choices)
                    .default(0)
                    .interact()?;
                if selection == 0 {
                    config::store_session(&profile_name, &cookie)?;
                    eprintln!("   ✓ Session cookie stored in system keyring");
                } else {
                    profile.session_cookie = Some(cookie);
                }
            }

            let page: String = Input::new()
                .with_prompt("Default list page (empty for /)")
                .allow_empty(true)
                .interact_text()?;
            if !page.trim().is_empty() {
                profile.page = Some(page.trim().to_owned());
            }

            let mut cfg = config::load_config_or_default();
            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());

            let path = config::save_config(&cfg)?;
            eprintln!("\n✓ Configuration written to {}", path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Try it: estatedesk add community");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config()?);
            let out = output::render_single(
                global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|_| format!("{c:#?}")),
                |c| c.profiles.keys().cloned().collect::<Vec<_>>().join("\n"),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_key(profile, &key, value)?;

            config::save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: estatedesk config init");
            } else {
                for (name, profile) in &cfg.profiles {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}\t{}", profile.base_url);
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: available(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetSession ──────────────────────────────────────────────
        ConfigCommand::SetSession { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| active_profile_name(global, &cfg));
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: available(&cfg),
                    name: profile_name,
                });
            }

            let cookie = Password::new()
                .with_prompt("Session cookie")
                .interact()?;
            if cookie.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "session".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            config::store_session(&profile_name, cookie.trim())?;
            eprintln!("✓ Session cookie stored in system keyring for profile '{profile_name}'");
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn set_key_validates_values() {
        let mut profile = Profile::default();
        set_key(&mut profile, "base-url", "https://desk.example.com/".into()).unwrap();
        set_key(&mut profile, "timeout", "10".into()).unwrap();
        set_key(&mut profile, "page", "/admin/payment/?tab=bills".into()).unwrap();
        assert_eq!(profile.base_url, "https://desk.example.com/");
        assert_eq!(profile.timeout, Some(10));
        assert_eq!(profile.page.as_deref(), Some("/admin/payment/?tab=bills"));

        assert!(set_key(&mut profile, "timeout", "soon".into()).is_err());
        assert!(set_key(&mut profile, "base_url", "not a url".into()).is_err());
        let err = set_key(&mut profile, "api_key", "x".into()).unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn show_hides_session_cookies() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                base_url: "http://127.0.0.1:8000/".into(),
                session_cookie: Some("abc123".into()),
                ..Profile::default()
            },
        );
        let shown = redacted(&cfg);
        assert_eq!(
            shown.profiles["default"].session_cookie.as_deref(),
            Some("********")
        );
    }
}
