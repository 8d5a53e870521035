use std::path::PathBuf;

use jumplink::config::{load_config_flags, parse_flag_tokens, ConfigFlags, ThemeMode};
use jumplink::session::HeadingTag;

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".jumplinkrc");
    let content = r#"
# comment
--watch

--theme light
   
--render-debug-log=render.log
--style Quelle 1
"#;
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert!(flags.watch);
    assert_eq!(flags.theme, Some(ThemeMode::Light));
    assert_eq!(flags.render_debug_log, Some(PathBuf::from("render.log")));
    assert_eq!(flags.style.as_deref(), Some("Quelle 1"));
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".jumplinkrc");
    let content = "--watch\n--theme light\n--render-debug-log file.log\n--tags h1,h2\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_args = vec![
        "jumplink".to_string(),
        "--theme".to_string(),
        "dark".to_string(),
        "--outline".to_string(),
        "--tags".to_string(),
        "h3".to_string(),
    ];
    let cli_flags = parse_flag_tokens(&cli_args);

    let effective = file_flags.union(&cli_flags);
    assert!(effective.watch, "file flags should remain enabled");
    assert!(effective.outline, "cli flags should be applied");
    assert_eq!(effective.theme, Some(ThemeMode::Dark), "cli should override theme");
    assert_eq!(effective.tags, Some(vec![HeadingTag::H3]));
    assert_eq!(
        effective.render_debug_log,
        Some(PathBuf::from("file.log")),
        "file config should be preserved when CLI does not override"
    );
}

#[test]
fn test_parse_flag_tokens_handles_equals_syntax() {
    let args = vec![
        "jumplink".to_string(),
        "--theme=dark".to_string(),
        "--sources=ol.quellen li".to_string(),
        "--toc-title=Inhalt".to_string(),
    ];
    let flags = parse_flag_tokens(&args);
    assert_eq!(flags.theme, Some(ThemeMode::Dark));
    assert_eq!(flags.sources.as_deref(), Some("ol.quellen li"));
    assert_eq!(flags.toc_title.as_deref(), Some("Inhalt"));
}

#[test]
fn test_local_override_beats_global_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let global = dir.path().join("config");
    let local = dir.path().join(".jumplinkrc");
    std::fs::write(&global, "--perf\n--style [1]\n--anchor h1\n").unwrap();
    std::fs::write(&local, "--style Quelle 1\n").unwrap();

    let merged = load_config_flags(&global)
        .unwrap()
        .union(&load_config_flags(&local).unwrap());
    assert!(merged.perf);
    let settings = merged.settings();
    assert_eq!(settings.style, "Quelle 1");
    assert_eq!(settings.toc_anchor.as_deref(), Some("h1"));
}

#[test]
fn test_config_union_merges_booleans() {
    let file = ConfigFlags {
        watch: true,
        ..ConfigFlags::default()
    };
    let cli = ConfigFlags {
        outline: true,
        perf: true,
        ..ConfigFlags::default()
    };
    let merged = file.union(&cli);
    assert!(merged.watch);
    assert!(merged.outline);
    assert!(merged.perf);
}
