//! How command results and errors reach the terminal.
//!
//! Handlers get an [`OutputMode`] from `main` and never pick one themselves.
//! Pretty output is for someone reading at the front desk, text is one
//! tab-separated row per item, and JSON is the stable contract for scripts.
//!
//! The mode comes from `--format`, then the hidden `--json` flag, then
//! whatever `ecoroom_core::config::resolve_config` answers (`ECOROOM_FORMAT`,
//! the user config, finally pretty on a terminal and text on a pipe).

use clap::ValueEnum;
use ecoroom_core::Error;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

const RULE_WIDTH: usize = 64;

pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{}", "-".repeat(RULE_WIDTH))
}

/// Heading line underlined by [`pretty_rule`].
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// `key:` padded to a fixed column, then the value.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    let label = format!("{key}:");
    writeln!(w, "{label:<12} {}", value.as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Aligned, sectioned output for people.
    Pretty,
    /// Tab-separated rows for pipes.
    Text,
    /// Pretty-printed JSON on stdout, JSON errors on stderr.
    Json,
}

impl OutputMode {
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Pick the mode from the flags, falling back to the config layer's answer
/// (`"pretty"`, `"text"` or `"json"`).
fn choose_mode(format_flag: Option<OutputMode>, json_flag: bool, configured: &str) -> OutputMode {
    match (format_flag, json_flag, configured) {
        (Some(mode), _, _) => mode,
        (None, true, _) | (None, false, "json") => OutputMode::Json,
        (None, false, "text") => OutputMode::Text,
        (None, false, _) => OutputMode::Pretty,
    }
}

/// Resolve the output mode for this invocation.
///
/// An unreadable config falls back to text so the command can still report
/// its own error legibly.
pub fn resolve_output_mode(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    project_root: &Path,
) -> OutputMode {
    let configured = ecoroom_core::config::resolve_config(project_root, json_flag)
        .map_or_else(|_| "text".to_string(), |c| c.resolved_output);
    choose_mode(format_flag, json_flag, &configured)
}

/// A row type that `list`-style commands print in every mode. JSON output
/// is the serde form of the whole slice.
pub trait Renderable: Serialize {
    fn write_pretty(&self, w: &mut dyn Write) -> io::Result<()>;

    /// One text row; fields in [`Renderable::headers`] order.
    fn write_row(&self, w: &mut dyn Write) -> io::Result<()>;

    fn headers() -> &'static [&'static str];
}

pub fn render_list_to<R: Renderable>(
    items: &[R],
    mode: OutputMode,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => write_json(out, items)?,
        OutputMode::Text if items.is_empty() => {}
        OutputMode::Text => {
            writeln!(out, "{}", R::headers().join("\t"))?;
            for item in items {
                item.write_row(out)?;
            }
        }
        OutputMode::Pretty => {
            for item in items {
                item.write_pretty(out)?;
            }
        }
    }
    Ok(())
}

pub fn render_list<R: Renderable>(items: &[R], mode: OutputMode) -> anyhow::Result<()> {
    render_list_to(items, mode, &mut io::stdout().lock())
}

fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Print `value` as JSON, or through `text_fn` / `pretty_fn`.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    match mode {
        OutputMode::Json => write_json(&mut out, value)?,
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// [`render_mode`] for results that read the same in pretty and text.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    if mode.is_json() {
        write_json(&mut out, value)
    } else {
        human_fn(value, &mut out)?;
        Ok(())
    }
}

/// What a failed command reports. Serialized under `"error"` in JSON mode.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// `E####` from [`ecoroom_core::ErrorCode`], when the failure has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    /// Uses the code and hint of the first core error in the chain; the
    /// message keeps every context layer.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let core = err.chain().find_map(|e| e.downcast_ref::<Error>());
        let mut cli = core.map_or_else(
            || Self {
                message: String::new(),
                suggestion: None,
                error_code: None,
            },
            Self::from,
        );
        cli.message = format!("{err:#}");
        cli
    }
}

impl From<&Error> for CliError {
    fn from(err: &Error) -> Self {
        Self {
            message: err.to_string(),
            suggestion: err.hint().map(str::to_string),
            error_code: Some(err.code().code().to_string()),
        }
    }
}

pub fn write_error(mode: OutputMode, error: &CliError, out: &mut dyn Write) -> anyhow::Result<()> {
    if mode.is_json() {
        return write_json(out, &serde_json::json!({ "error": error }));
    }
    let tag = error
        .error_code
        .as_deref()
        .map_or_else(|| "error".to_string(), |code| format!("error[{code}]"));
    writeln!(out, "{tag}: {}", error.message)?;
    if let Some(suggestion) = &error.suggestion {
        writeln!(out, "  suggestion: {suggestion}")?;
    }
    Ok(())
}

/// [`write_error`] on stderr.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    write_error(mode, error, &mut io::stderr().lock())
}
