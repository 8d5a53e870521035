//! Jumplink - table of contents and reference jump links for HTML documents.
//!
//! # Usage
//!
//! ```bash
//! jumplink bericht.html
//! jumplink --outline --sources "ol.quellen li" bericht.html
//! jumplink bericht.html --batch toc,sources,references,link,apply --output -
//! ```

use std::fs::File;
use std::path::PathBuf;
use std::process::{Command, ExitCode};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

use jumplink::app::{default_output_path, read_document, App};
use jumplink::batch::{run_batch, OutputTarget};
use jumplink::config::{
    clear_config_flags, global_config_path, load_config_flags, local_override_path,
    parse_flag_tokens, save_config_flags, ConfigFlags, ThemeMode,
};
use jumplink::highlight::{set_background_mode, HighlightBackground};
use jumplink::perf;
use jumplink::session::{Action, HeadingTag};

/// Add a table of contents and reference jump links to HTML documents
#[derive(Parser, Debug)]
#[command(name = "jumplink", version, about, long_about = None)]
struct Cli {
    /// HTML file to process
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Where downloads are written (default: modified.html next to FILE, `-` for stdout in batch mode)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Heading tags for the table of contents, e.g. h1,h2,h3
    #[arg(long, value_enum, value_delimiter = ',', value_name = "TAGS")]
    tags: Option<Vec<HeadingTag>>,

    /// Reference style; the first `1` marks the number, e.g. "(1)" or "Quelle 1"
    #[arg(long, value_name = "STYLE")]
    style: Option<String>,

    /// CSS selector of the source elements
    #[arg(long, value_name = "SELECTOR")]
    sources: Option<String>,

    /// Insert the table of contents before the element matching this selector
    #[arg(long, value_name = "SELECTOR")]
    anchor: Option<String>,

    /// Heading of the table of contents
    #[arg(long, value_name = "TITLE")]
    toc_title: Option<String>,

    /// Run these actions without a terminal UI
    #[arg(long, value_enum, value_delimiter = ',', value_name = "ACTIONS")]
    batch: Option<Vec<Action>>,

    /// Print the batch report as JSON
    #[arg(long, requires = "batch")]
    json: bool,

    /// Watch the file for changes and reload
    #[arg(short, long)]
    watch: bool,

    /// Start with the outline sidebar open
    #[arg(long)]
    outline: bool,

    /// Force syntax highlight theme background (light or dark)
    #[arg(long, value_enum, default_value = "auto")]
    theme: ThemeMode,

    /// Enable performance logging
    #[arg(long)]
    perf: bool,

    /// Write detailed render debug events to a file
    #[arg(long, value_name = "PATH")]
    render_debug_log: Option<PathBuf>,

    /// Write log output to a file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

// Query the terminal background using OSC 11.
// We talk to /dev/tty so the terminal responds even when stdout is piped.
// On non-Unix platforms the query is skipped: the stdin fallback leaves a
// reader thread behind that swallows console input.
#[cfg(not(unix))]
fn query_terminal_background() -> std::io::Result<Option<(u8, u8, u8)>> {
    Ok(None)
}

#[cfg(unix)]
fn query_terminal_background() -> std::io::Result<Option<(u8, u8, u8)>> {
    use std::io::{Read, Write};
    use std::sync::mpsc;

    let (tx, rx) = mpsc::channel();

    let mut io = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/tty")?;
    let reader = io.try_clone()?;

    // OSC 11 query: ESC ] 11 ; ? BEL
    io.write_all(b"\x1b]11;?\x07")?;
    io.flush()?;

    std::thread::spawn(move || {
        let mut reader = reader;
        let mut buf = [0u8; 256];
        let mut collected: Vec<u8> = Vec::new();
        loop {
            match reader.read(&mut buf) {
                Ok(0) => {}
                Ok(n) => {
                    collected.extend_from_slice(&buf[..n]);
                    if collected.contains(&b'\x07')
                        || collected.windows(2).any(|w| w == b"\x1b\\")
                    {
                        let _ = tx.send(collected);
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    let Ok(collected) = rx.recv_timeout(Duration::from_millis(75)) else {
        return Ok(None);
    };
    let text = String::from_utf8_lossy(&collected);
    Ok(parse_osc11_reply(&text))
}

fn theme_from_rgb(r: u8, g: u8, b: u8) -> HighlightBackground {
    let luma = 0.0722f32.mul_add(
        f32::from(b),
        0.2126f32.mul_add(f32::from(r), 0.7152 * f32::from(g)),
    );
    if luma >= 140.0 {
        HighlightBackground::Light
    } else {
        HighlightBackground::Dark
    }
}

fn detect_theme() -> Option<HighlightBackground> {
    let _raw = enable_raw_mode();
    let result = query_terminal_background();
    let _ = disable_raw_mode();
    result.ok().flatten().map(|(r, g, b)| theme_from_rgb(r, g, b))
}

const fn theme_arg(mode: HighlightBackground) -> &'static str {
    match mode {
        HighlightBackground::Light => "light",
        HighlightBackground::Dark => "dark",
    }
}

/// Run again with the detected theme pinned, so the reader thread left by
/// the query does not compete with the UI for terminal input.
fn relaunch_with_theme(mode: HighlightBackground, raw_args: &[String]) -> Result<ExitCode> {
    let exe = std::env::current_exe().context("current exe")?;
    let tokens = raw_args.get(1..).unwrap_or_default();
    let mut args: Vec<String> = Vec::with_capacity(tokens.len() + 2);
    let mut saw_theme = false;
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        if token == "--theme" {
            saw_theme = true;
            iter.next();
            args.push("--theme".to_string());
            args.push(theme_arg(mode).to_string());
        } else if let Some(value) = token.strip_prefix("--theme=") {
            saw_theme = true;
            if value == "auto" {
                args.push(format!("--theme={}", theme_arg(mode)));
            } else {
                args.push(token.clone());
            }
        } else {
            args.push(token.clone());
        }
    }
    if !saw_theme {
        args.push("--theme".to_string());
        args.push(theme_arg(mode).to_string());
    }

    let status = Command::new(exe)
        .args(args)
        .status()
        .context("failed to relaunch jumplink with detected theme")?;
    Ok(if status.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn parse_osc11_reply(reply: &str) -> Option<(u8, u8, u8)> {
    // Expect: ESC ] 11 ; rgb:RRRR/GGGG/BBBB BEL or ST
    let start = reply.find("rgb:")?;
    let data = &reply[start + 4..];
    let mut parts = data.split(['/', '\x07', '\x1b']);
    let r = parts.next()?;
    let g = parts.next()?;
    let b = parts.next()?;
    Some((
        parse_osc_component(r)?,
        parse_osc_component(g)?,
        parse_osc_component(b)?,
    ))
}

fn parse_osc_component(s: &str) -> Option<u8> {
    let hex = s.trim();
    if hex.len() >= 4 {
        let v = u16::from_str_radix(hex.get(..4)?, 16).ok()?;
        u8::try_from(v >> 8).ok()
    } else if hex.len() == 2 {
        u8::from_str_radix(hex, 16).ok()
    } else {
        None
    }
}

fn run_batch_mode(cli: &Cli, effective: &ConfigFlags, actions: &[Action]) -> Result<ExitCode> {
    let content = read_document(&cli.file)?;
    let output = cli.output.as_deref().map_or_else(
        || OutputTarget::File(default_output_path(&cli.file)),
        OutputTarget::from_arg,
    );
    let report = run_batch(&cli.file, content, effective.settings(), actions, &output)?;

    let rendered = if cli.json {
        format!("{}\n", report.to_json()?)
    } else {
        report.to_text()
    };
    // The document owns stdout when it is written there.
    if output == OutputTarget::Stdout {
        eprint!("{rendered}");
    } else {
        print!("{rendered}");
    }

    Ok(if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> Result<ExitCode> {
    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);
    tracing::debug!(?effective, "effective flags");

    perf::set_enabled(effective.perf);
    let render_debug_log_path = effective
        .render_debug_log
        .clone()
        .or_else(|| std::env::var_os("JUMPLINK_RENDER_DEBUG_LOG").map(PathBuf::from));
    if let Err(err) = perf::set_debug_log_path(render_debug_log_path.as_deref()) {
        tracing::warn!(
            path = %render_debug_log_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
            error = %err,
            "failed to initialize render debug log"
        );
    }

    if !cli.file.exists() {
        anyhow::bail!("File not found: {}", cli.file.display());
    }

    if let Some(actions) = &cli.batch {
        return run_batch_mode(&cli, &effective, actions);
    }

    match effective.theme.unwrap_or(ThemeMode::Auto) {
        ThemeMode::Auto => {
            if let Some(mode) = detect_theme() {
                return relaunch_with_theme(mode, &raw_args);
            }
            set_background_mode(None);
        }
        ThemeMode::Light => set_background_mode(Some(HighlightBackground::Light)),
        ThemeMode::Dark => set_background_mode(Some(HighlightBackground::Dark)),
    }

    let mut app = App::new(cli.file.clone())
        .with_settings(effective.settings())
        .with_output_path(cli.output.clone())
        .with_watch(effective.watch)
        .with_outline_visible(effective.outline)
        .with_config_paths(
            Some(global_path),
            local_path.exists().then_some(local_path),
        );

    app.run().context("Application error")?;
    Ok(ExitCode::SUCCESS)
}
