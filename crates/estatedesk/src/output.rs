//! Output formatting: table, JSON, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use estatedesk_core::NoticeKind;

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// One status line for a toast, e.g. `✓ Community saved successfully`.
pub fn notice_line(kind: NoticeKind, message: &str, color: bool) -> String {
    let marker = match kind {
        NoticeKind::Success => "✓",
        NoticeKind::Error => "✗",
        NoticeKind::Warning => "!",
        NoticeKind::Info => "·",
    };
    if !color {
        return format!("{marker} {message}");
    }
    match kind {
        NoticeKind::Success => format!("{} {message}", marker.green().bold()),
        NoticeKind::Error => format!("{} {}", marker.red().bold(), message.red()),
        NoticeKind::Warning => format!("{} {message}", marker.yellow().bold()),
        NoticeKind::Info => format!("{marker} {message}").dimmed().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the data itself via serde
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, serde_json::Error>
where
    T: serde::Serialize,
    R: Tabled,
{
    Ok(match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    })
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item views don't use
/// the `Tabled` derive.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, serde_json::Error>
where
    T: serde::Serialize,
{
    Ok(match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => id_fn(data),
    })
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, Tabled)]
    struct Row {
        name: String,
        count: u32,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                name: "bills".into(),
                count: 2,
            },
            Row {
                name: "owners".into(),
                count: 0,
            },
        ]
    }

    #[test]
    fn plain_lists_one_id_per_line() {
        let out = render_list(
            OutputFormat::Plain,
            &rows(),
            |r| Row {
                name: r.name.clone(),
                count: r.count,
            },
            |r| r.name.clone(),
        )
        .unwrap_or_default();
        assert_eq!(out, "bills\nowners");
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_single(
            OutputFormat::JsonCompact,
            &rows()[0],
            |_| String::new(),
            |r| r.name.clone(),
        )
        .unwrap_or_default();
        assert_eq!(out, r#"{"name":"bills","count":2}"#);
    }

    #[test]
    fn notice_lines_without_color() {
        assert_eq!(
            notice_line(NoticeKind::Error, "Failed to delete Owner", false),
            "✗ Failed to delete Owner"
        );
        assert_eq!(notice_line(NoticeKind::Success, "Saved", false), "✓ Saved");
    }
}
