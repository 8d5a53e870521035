//! Flag defaults from rc files.
//!
//! Both the global config and the local `.jumplinkrc` hold one flag per
//! line, optionally followed by its value (`--style Quelle 1`). Values keep
//! their inner spaces. Lines starting with `#` are comments.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::session::{HeadingTag, Settings};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Auto,
    Light,
    Dark,
}

impl ThemeMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub watch: bool,
    pub outline: bool,
    pub perf: bool,
    pub theme: Option<ThemeMode>,
    pub render_debug_log: Option<PathBuf>,
    pub tags: Option<Vec<HeadingTag>>,
    pub style: Option<String>,
    pub sources: Option<String>,
    pub anchor: Option<String>,
    pub toc_title: Option<String>,
}

impl ConfigFlags {
    /// Merge `other` over `self`: booleans are OR-ed, valued flags from
    /// `other` win.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        fn pick<T: Clone>(base: &Option<T>, over: &Option<T>) -> Option<T> {
            over.clone().or_else(|| base.clone())
        }
        Self {
            watch: self.watch || other.watch,
            outline: self.outline || other.outline,
            perf: self.perf || other.perf,
            theme: other.theme.or(self.theme),
            render_debug_log: pick(&self.render_debug_log, &other.render_debug_log),
            tags: pick(&self.tags, &other.tags),
            style: pick(&self.style, &other.style),
            sources: pick(&self.sources, &other.sources),
            anchor: pick(&self.anchor, &other.anchor),
            toc_title: pick(&self.toc_title, &other.toc_title),
        }
    }

    /// Session settings with these flags applied over the defaults.
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        if let Some(tags) = &self.tags {
            settings.tags.clone_from(tags);
        }
        if let Some(style) = &self.style {
            settings.style.clone_from(style);
        }
        if let Some(sources) = &self.sources {
            settings.sources_selector.clone_from(sources);
        }
        settings.toc_anchor.clone_from(&self.anchor);
        if let Some(title) = &self.toc_title {
            settings.toc_title.clone_from(title);
        }
        settings
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("jumplink").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("jumplink")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("jumplink").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("jumplink")
                .join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".jumplinkrc")
}

/// # Errors
///
/// Fails when the file exists but cannot be read.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| match line.split_once(char::is_whitespace) {
            Some((flag, value)) => vec![flag.to_string(), value.trim().to_string()],
            None => vec![line.to_string()],
        })
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

/// # Errors
///
/// Fails when the config directory or file cannot be written.
pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# jumplink defaults (saved with --save)".to_string()];
    if flags.watch {
        lines.push("--watch".to_string());
    }
    if flags.outline {
        lines.push("--outline".to_string());
    }
    if flags.perf {
        lines.push("--perf".to_string());
    }
    if let Some(theme) = flags.theme {
        lines.push(format!("--theme {}", theme.as_str()));
    }
    if let Some(path) = &flags.render_debug_log {
        lines.push(format!("--render-debug-log {}", path.display()));
    }
    if let Some(tags) = &flags.tags {
        let tags: Vec<_> = tags.iter().map(|tag| tag.name()).collect();
        lines.push(format!("--tags {}", tags.join(",")));
    }
    let valued = [
        ("--style", &flags.style),
        ("--sources", &flags.sources),
        ("--anchor", &flags.anchor),
        ("--toc-title", &flags.toc_title),
    ];
    for (flag, value) in valued {
        if let Some(value) = value {
            lines.push(format!("{flag} {value}"));
        }
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

/// # Errors
///
/// Fails when an existing file cannot be removed.
pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the known flags out of raw arguments. Unknown tokens and flags with
/// malformed values are skipped.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (name, inline_value) = match token.split_once('=') {
            Some((name, value)) if name.starts_with("--") => (name, Some(value)),
            _ => (token, None),
        };
        match name {
            "--watch" | "-w" => flags.watch = true,
            "--outline" => flags.outline = true,
            "--perf" => flags.perf = true,
            "--theme" | "--render-debug-log" | "--tags" | "--style" | "--sources" | "--anchor"
            | "--toc-title" => {
                let value = match inline_value {
                    Some(value) => Some(value),
                    None => {
                        i += 1;
                        tokens.get(i).map(String::as_str)
                    }
                };
                if let Some(value) = value {
                    apply_valued_flag(&mut flags, name, value);
                }
            }
            _ => {}
        }
        i += 1;
    }
    flags
}

fn apply_valued_flag(flags: &mut ConfigFlags, name: &str, value: &str) {
    match name {
        "--theme" => flags.theme = parse_theme(value),
        "--render-debug-log" => flags.render_debug_log = Some(PathBuf::from(value)),
        "--tags" => flags.tags = parse_tags(value),
        "--style" => flags.style = Some(value.to_string()),
        "--sources" => flags.sources = Some(value.to_string()),
        "--anchor" => flags.anchor = Some(value.to_string()),
        "--toc-title" => flags.toc_title = Some(value.to_string()),
        _ => {}
    }
}

fn parse_theme(s: &str) -> Option<ThemeMode> {
    match s {
        "auto" => Some(ThemeMode::Auto),
        "light" => Some(ThemeMode::Light),
        "dark" => Some(ThemeMode::Dark),
        _ => None,
    }
}

/// Comma-separated heading tags, e.g. `h2,h3`.
pub fn parse_tags(s: &str) -> Option<Vec<HeadingTag>> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<HeadingTag>().ok())
        .collect()
}
