//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one value per line.
//! Status lines go to stderr through [`Painter`].

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// Styles short status messages; a no-op when color is off.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    color: bool,
}

impl Painter {
    pub fn new(mode: &ColorMode) -> Self {
        Self {
            color: should_color(mode),
        }
    }

    pub fn success(self, text: &str) -> String {
        if self.color {
            format!("{} {}", "✓".green().bold(), text)
        } else {
            format!("✓ {text}")
        }
    }

    pub fn warning(self, text: &str) -> String {
        if self.color {
            format!("{} {}", "!".yellow().bold(), text.yellow())
        } else {
            format!("! {text}")
        }
    }

    pub fn heading(self, text: &str) -> String {
        if self.color {
            text.bold().cyan().to_string()
        } else {
            text.to_owned()
        }
    }

    pub fn dim(self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_owned()
        }
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one value per line
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since detail views are free-form.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Aligned `key: value` lines for detail views.
pub fn detail_lines(pairs: &[(&str, String)]) -> String {
    let width = pairs.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    pairs
        .iter()
        .map(|(k, v)| format!("{k:<width$}  {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Print a status line to stderr, respecting quiet mode.
pub fn print_status(line: &str, quiet: bool) {
    if !quiet {
        eprintln!("{line}");
    }
}

// ── Format-specific renderers ────────────────────────────────────────

pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.expect("serialization should not fail")
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).expect("serialization should not fail")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
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
                name: "planner".into(),
                count: 3,
            },
            Row {
                name: "recipe".into(),
                count: 1,
            },
        ]
    }

    #[test]
    fn plain_is_one_value_per_line() {
        let data = rows();
        let out = render_list(
            &OutputFormat::Plain,
            &data,
            |r| Row {
                name: r.name.clone(),
                count: r.count,
            },
            |r| r.name.clone(),
        );
        assert_eq!(out, "planner\nrecipe");
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_single(
            &OutputFormat::JsonCompact,
            &rows()[0],
            |_| String::new(),
            |_| String::new(),
        );
        assert_eq!(out, r#"{"name":"planner","count":3}"#);
    }

    #[test]
    fn table_has_headers() {
        let data = rows();
        let out = render_list(
            &OutputFormat::Table,
            &data,
            |r| Row {
                name: r.name.clone(),
                count: r.count,
            },
            |r| r.name.clone(),
        );
        assert!(out.contains("name"));
        assert!(out.contains("recipe"));
    }

    #[test]
    fn detail_lines_align_keys() {
        let out = detail_lines(&[("Role", "admin".into()), ("Screen", "login".into())]);
        assert_eq!(out, "Role    admin\nScreen  login");
    }

    #[test]
    fn painter_without_color_is_plain() {
        let p = Painter::new(&ColorMode::Never);
        assert_eq!(p.success("done"), "✓ done");
        assert_eq!(p.heading("Plan"), "Plan");
    }
}
