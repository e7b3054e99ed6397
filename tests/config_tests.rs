use serde_json::{json, Map, Value};
use statusblocks::bar::{Align, MinWidth};
use statusblocks::config::options::{parsers, ColorSpec, OptionSchema, OptionValue};
use statusblocks::config::{self, load_config_file, parse_config, BlockConfig, Config};
use statusblocks::error::ConfigError;
use statusblocks::themes::{get_theme, FALLBACK_COLOR};
use statusblocks::utils::template::{self, TemplateValue};
use statusblocks::utils::{format_size, gib, parse_size};
use statusblocks::Registry;
use std::time::Duration;
use tempfile::TempDir;
use tokio::fs;

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

async fn builtin_registry() -> Registry {
    let mut registry = Registry::new(get_theme("default"));
    registry.load_plugins(None).await;
    registry
}

#[test]
fn test_minimal_config_uses_defaults() {
    let config = parse_config(r#"{"blocks": [{"plugin": "clock"}]}"#).unwrap();

    assert_eq!(config.interval, 1);
    assert_eq!(config.theme, "default");
    assert_eq!(config.startup_delay_ms, 100);
    assert_eq!(config.fetch_timeout(), None);
    assert_eq!(config.plugin_dir, None);
    assert_eq!(config.header.to_header().version, 1);
    assert!(!config.render.comma_separated);
    assert_eq!(config.blocks.as_ref().unwrap().len(), 1);
}

#[test]
fn test_full_config_parses() {
    let config = parse_config(
        r##"{
            "interval": 2,
            "theme": "nord",
            "plugin_dir": "/opt/statusblocks",
            "fetch_timeout": 5,
            "startup_delay_ms": 0,
            "header": {"stop_signal": 10, "cont_signal": 12, "click_events": false},
            "render": {"indent": 2, "comma_separated": true},
            "blocks": [
                {"plugin": "cpu", "name": "core0", "interval": 3, "cpu": 0, "color": "#ff0000"}
            ]
        }"##,
    )
    .unwrap();

    assert_eq!(config.frame_interval().unwrap(), Duration::from_secs(2));
    assert_eq!(config.fetch_timeout(), Some(Duration::from_secs(5)));
    assert_eq!(config.startup_delay(), Duration::ZERO);
    let header = config.header.to_header();
    assert_eq!(header.stop_signal, Some(10));
    assert_eq!(header.cont_signal, Some(12));
    assert_eq!(header.click_events, Some(false));
    assert_eq!(config.render.indent, Some(2));

    let block = &config.blocks.as_ref().unwrap()[0];
    assert_eq!(block.plugin.as_deref(), Some("cpu"));
    assert_eq!(block.name.as_deref(), Some("core0"));
    assert_eq!(block.interval, Some(3));
    assert_eq!(block.options.get("cpu"), Some(&json!(0)));
    assert_eq!(block.options.get("color"), Some(&json!("#ff0000")));
    assert!(!block.options.contains_key("plugin"));
}

#[test]
fn test_unknown_top_level_key_is_rejected() {
    assert!(parse_config(r#"{"blocks": [], "colour": "red"}"#).is_err());
    assert!(parse_config(r#"{"blocks": [], "header": {"version": 2}}"#).is_err());
}

#[tokio::test]
async fn test_load_errors_have_distinct_exit_codes() {
    let dir = TempDir::new().unwrap();

    let missing = load_config_file(&dir.path().join("missing.json"))
        .await
        .unwrap_err();
    assert!(matches!(missing, ConfigError::Io { .. }));
    assert_eq!(missing.exit_code(), 3);

    let broken_path = dir.path().join("broken.json");
    fs::write(&broken_path, "{ not json").await.unwrap();
    let broken = load_config_file(&broken_path).await.unwrap_err();
    assert!(matches!(broken, ConfigError::Parse { .. }));
    assert_eq!(broken.exit_code(), 4);

    let good_path = dir.path().join("good.json");
    fs::write(&good_path, r#"{"theme": "gruvbox", "blocks": []}"#)
        .await
        .unwrap();
    let good = load_config_file(&good_path).await.unwrap();
    assert_eq!(good.theme, "gruvbox");
}

#[tokio::test]
async fn test_explicit_path_wins_and_env_overrides_apply() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bar.json");
    fs::write(&path, r#"{"theme": "nord", "blocks": [{"plugin": "clock"}]}"#)
        .await
        .unwrap();

    std::env::set_var(config::PLUGIN_DIR_ENV, dir.path());
    let config = config::load_config(Some(path)).await.unwrap();
    std::env::remove_var(config::PLUGIN_DIR_ENV);

    assert_eq!(config.plugin_dir.as_deref(), Some(dir.path()));
    assert_eq!(config.blocks.unwrap().len(), 1);
}

#[tokio::test]
async fn test_default_config_resolves() {
    let registry = builtin_registry().await;
    let config = Config::default();

    let blocks = config.resolve_blocks(&registry).unwrap();
    let plugins: Vec<&str> = blocks.iter().map(|b| b.plugin.as_str()).collect();
    assert_eq!(plugins, vec!["clock", "cpu", "memory", "loadavg"]);
    assert_eq!(blocks[0].name, "clock");
    assert_eq!(blocks[0].interval, Duration::from_secs(1));
    assert_eq!(blocks[1].interval, Duration::from_secs(2));
}

#[tokio::test]
async fn test_structure_errors() {
    let registry = builtin_registry().await;

    let no_blocks = parse_config(r#"{"interval": 1}"#).unwrap();
    let err = no_blocks.resolve_blocks(&registry).unwrap_err();
    assert!(matches!(err, ConfigError::MissingBlocks));
    assert_eq!(err.exit_code(), 2);

    let no_plugin = parse_config(r#"{"blocks": [{"plugin": "clock"}, {"name": "x"}]}"#).unwrap();
    let err = no_plugin.resolve_blocks(&registry).unwrap_err();
    assert!(matches!(err, ConfigError::MissingPlugin { index: 1 }));

    let zero = parse_config(r#"{"blocks": [{"plugin": "clock", "interval": 0}]}"#).unwrap();
    let err = zero.resolve_blocks(&registry).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidInterval { interval: 0, .. }));

    let zero_frames = parse_config(r#"{"interval": 0, "blocks": []}"#).unwrap();
    assert_eq!(zero_frames.frame_interval().unwrap_err().exit_code(), 2);
}

#[tokio::test]
async fn test_option_errors() {
    let registry = builtin_registry().await;

    let config = Config {
        blocks: Some(vec![BlockConfig::new("cpu").option("threshold_warn", json!("lots"))]),
        ..Config::default()
    };
    let err = config.resolve_blocks(&registry).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidOption { ref option, .. } if option == "threshold_warn"));
    assert_eq!(err.exit_code(), 5);

    let config = Config {
        blocks: Some(vec![BlockConfig::new("temperature")]),
        ..Config::default()
    };
    let err = config.resolve_blocks(&registry).unwrap_err();
    assert!(matches!(err, ConfigError::MissingOption { ref option, .. } if option == "path"));
    assert_eq!(err.exit_code(), 5);

    let config = Config {
        blocks: Some(vec![BlockConfig::new("clock").option("text", json!("%Y-%m-%d %Q"))]),
        ..Config::default()
    };
    assert!(config.resolve_blocks(&registry).is_err());
}

#[tokio::test]
async fn test_time_formats_that_cannot_be_rendered_are_rejected() {
    let registry = builtin_registry().await;

    // `%#z` parses, but chrono can only use it for parsing, not formatting.
    for text in ["%#z", "%H:%M %#z"] {
        let config = Config {
            blocks: Some(vec![BlockConfig::new("clock").option("text", json!(text))]),
            ..Config::default()
        };
        let err = config.resolve_blocks(&registry).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidOption { ref option, .. } if option == "text"),
            "{}: {}",
            text,
            err
        );
        assert_eq!(err.exit_code(), 5);
    }

    let err = parsers::strftime(&json!("%#z")).unwrap_err();
    assert!(err.contains("invalid time format"));
    assert!(parsers::strftime(&json!("%Y-%m-%d %H:%M:%S %z")).is_ok());
}

#[tokio::test]
async fn test_unknown_plugins_and_options_pass_through() {
    let registry = builtin_registry().await;
    let config = Config {
        blocks: Some(vec![
            BlockConfig::new("nonexistent").named("ghost"),
            BlockConfig::new("clock").option("flavour", json!("vanilla")),
        ]),
        ..Config::default()
    };

    let blocks = config.resolve_blocks(&registry).unwrap();
    assert_eq!(blocks.len(), 2);
    assert!(blocks[0].options.is_empty());
    assert!(!blocks[1].options.contains("flavour"));
}

#[test]
fn test_schema_parses_typed_options() {
    let mut schema = OptionSchema::new("sample");
    schema.register_option("count", parsers::int, true);
    schema.register_option("ratio", parsers::float, false);
    schema.register_option("enabled", parsers::boolean, false);
    schema.register_option("limit", parsers::size, false);

    let options = schema
        .validate(&object(json!({
            "count": "42",
            "ratio": 2,
            "enabled": "yes",
            "limit": "20GiB",
            "color": {"ok": "#00FF00", "warn": {"r": 255, "g": 255, "b": 0}},
            "align": "center",
            "min_width": 120,
            "separator": null
        })))
        .unwrap();

    assert_eq!(options.int("count"), Some(42));
    assert_eq!(options.float("ratio"), Some(2.0));
    assert_eq!(options.bool("enabled"), Some(true));
    assert_eq!(options.size("limit"), Some(gib(20)));
    assert_eq!(options.align(), Some(Align::Center));
    assert_eq!(options.min_width(), Some(&MinWidth::Pixels(120)));
    assert!(!options.contains("separator"));

    let Some(ColorSpec::States(states)) = options.color("color") else {
        panic!("expected a state color map");
    };
    assert_eq!(states["ok"], "#00ff00");
    assert_eq!(states["warn"], "#ffff00");

    let required: Vec<&str> = schema.required().collect();
    assert_eq!(required, vec!["count"]);
}

#[test]
fn test_parsers_reject_garbage() {
    assert!(parsers::int(&json!("twelve")).is_err());
    assert!(parsers::uint(&json!(-1)).is_err());
    assert!(parsers::boolean(&json!("maybe")).is_err());
    assert!(parsers::color(&json!("red")).is_err());
    assert!(parsers::color(&json!({"r": 300, "g": 0, "b": 0})).is_err());
    assert!(parsers::align(&json!("middle")).is_err());
    assert!(parsers::template(&json!("{unclosed")).is_err());
    assert!(parsers::directory(&json!("/definitely/not/here")).is_err());
    assert!(parsers::executable(&json!("/definitely/not/here")).is_err());

    assert_eq!(
        parsers::single_color(&json!("#ABCDEF")).unwrap(),
        OptionValue::Color(ColorSpec::Single("#abcdef".to_string()))
    );
}

#[test]
fn test_template_map_lowercases_states() {
    let parsed = parsers::template_map(&json!({"COMPLETED": "{ssid}", "default": "{wpa_state}"})).unwrap();
    let OptionValue::TextMap(map) = parsed else {
        panic!("expected a template map");
    };
    assert_eq!(map["completed"], "{ssid}");
    assert_eq!(map["default"], "{wpa_state}");
}

#[test]
fn test_sizes() {
    assert_eq!(parse_size("1024").unwrap(), 1024);
    assert_eq!(parse_size("20GiB").unwrap(), gib(20));
    assert!(parse_size("").is_err());
    assert!(parse_size("much").is_err());
    assert_eq!(gib(1), 1024 * 1024 * 1024);
    assert!(format_size(gib(2)).contains("2.0"));
}

#[test]
fn test_templates() {
    let values = [("usage", TemplateValue::from(12.345f64)), ("core", TemplateValue::from(3i64))];

    assert_eq!(template::render("C: {usage:.1}%", &values), "C: 12.3%");
    assert_eq!(template::render("{core}: {usage:.0}", &values), "3: 12");
    assert_eq!(template::render("{}", &values), "12.345");
    assert_eq!(template::render("{missing} {core}", &values), "{missing} 3");
    assert_eq!(template::render("no placeholders", &values), "no placeholders");

    assert!(template::validate("L: {one:.2} {five:.2}").is_ok());
    assert!(template::validate("broken {").is_err());
    assert!(template::validate("also } broken").is_err());

    // Precision is capped so a template can't ask for gigabytes of digits.
    assert!(template::validate("{usage:.20}").is_ok());
    assert!(template::validate("{usage:.21}").is_err());
    assert!(template::validate("C: {usage:.4000000000}%").is_err());
    assert!(template::validate("{usage:.99999999999999999999999}").is_err());
    assert!(parsers::template(&json!("{usage:.99}")).is_err());
    assert_eq!(
        template::render("{usage:.4000000000}", &values).len(),
        "12.".len() + template::MAX_PRECISION
    );
}

#[test]
fn test_theme_palettes() {
    let theme = get_theme("default");
    let states = ["ok", "warn", "err"];

    let palette = theme.palette(None, &states);
    assert_eq!(palette.get("ok"), "#ffffff");
    assert_eq!(palette.get("warn"), "#ffff00");
    assert_eq!(palette.get("unknown-state"), FALLBACK_COLOR);

    // A single color applies to every state.
    let single = ColorSpec::Single("#123456".to_string());
    let palette = theme.palette(Some(&single), &states);
    assert_eq!(palette.get("ok"), "#123456");
    assert_eq!(palette.get("err"), "#123456");

    // A state map overrides only the states it names.
    let map = ColorSpec::States([("warn".to_string(), "#abcdef".to_string())].into());
    let palette = theme.palette(Some(&map), &states);
    assert_eq!(palette.get("warn"), "#abcdef");
    assert_eq!(palette.get("err"), "#ff0000");

    // Unknown themes fall back to the default palette.
    assert_eq!(get_theme("no-such-theme").name, "default");
    assert_ne!(get_theme("nord").get_color("ok"), theme.get_color("ok"));
}
