use serde_json::{json, Value};
use statusblocks::config::options::{OptionValue, Options};
use statusblocks::error::ConfigError;
use statusblocks::plugins::cpu::CpuConfig;
use statusblocks::plugins::storage::Storage;
use statusblocks::plugins::uptime::format_uptime;
use statusblocks::plugins::wifi::parse_status;
use statusblocks::plugins::{
    BatteryPlugin, ClockPlugin, DiskPlugin, InstanceContext, LoadavgPlugin, MemoryPlugin, Plugin,
    Reading, TemperaturePlugin, ZfsPlugin,
};
use statusblocks::themes::{get_theme, Theme};
use statusblocks::utils::gib;
use tempfile::TempDir;

fn validate(plugin: &dyn Plugin, raw: Value) -> Result<Options, ConfigError> {
    let Value::Object(map) = raw else {
        panic!("options must be an object");
    };
    plugin.schema().validate(&map)
}

fn context<'a>(
    plugin: &'a str,
    instance: &'a str,
    options: &'a Options,
    theme: &'a Theme,
) -> InstanceContext<'a> {
    InstanceContext {
        plugin,
        instance,
        options,
        theme,
    }
}

async fn fetch_once(plugin: &dyn Plugin, instance: &str, raw: Value) -> anyhow::Result<Reading> {
    let theme = get_theme("default");
    let options = validate(plugin, raw)?;
    let mut sensor = plugin.instantiate(&context(plugin.name(), instance, &options, &theme))?;
    sensor.fetch().await
}

#[test]
fn test_format_uptime() {
    assert_eq!(format_uptime(0), "0:00:00");
    assert_eq!(format_uptime(3 * 3600 + 7 * 60 + 9), "3:07:09");
    assert_eq!(format_uptime(86_400 + 61), "1 day, 0:01:01");
    assert_eq!(format_uptime(5 * 86_400 + 23 * 3600), "5 days, 23:00:00");
}

#[test]
fn test_parse_wpa_status() {
    let output = "bssid=00:11:22:33:44:55\nssid=home=sweet\nwpa_state=COMPLETED\n\ngarbage line\n=novalue\n";
    let (status, rejected) = parse_status(output);

    assert_eq!(status["ssid"], "home=sweet");
    assert_eq!(status["wpa_state"], "COMPLETED");
    assert_eq!(status.len(), 3);
    assert_eq!(rejected, vec!["garbage line", "=novalue"]);
}

#[test]
fn test_cpu_states() {
    let theme = get_theme("default");
    let plugin = statusblocks::plugins::CpuPlugin::new();
    let options = validate(&plugin, json!({"threshold_warn": 50, "threshold_err": "75.5"})).unwrap();
    let config = CpuConfig::from_context(&context("cpu", "cpu", &options, &theme)).unwrap();

    assert_eq!(config.core, None);
    assert_eq!(config.state(50.0), "ok");
    assert_eq!(config.state(50.1), "warn");
    assert_eq!(config.state(75.5), "warn");
    assert_eq!(config.state(99.0), "err");

    let options = validate(&plugin, json!({"cpu": 0})).unwrap();
    let config = CpuConfig::from_context(&context("cpu", "core0", &options, &theme)).unwrap();
    assert_eq!(config.core, Some(0));
    assert_eq!(config.threshold_warn, 80.0);
    assert_eq!(config.threshold_err, 90.0);
}

#[test]
fn test_storage_states_and_colors() {
    let theme = get_theme("default");
    let plugin = MemoryPlugin::new();
    let options = validate(
        &plugin,
        json!({"threshold_warn": "2GiB", "color": {"ok": "#00ff00"}}),
    )
    .unwrap();
    let storage = Storage::from_context(
        &context("memory", "memory", &options, &theme),
        gib(4),
        gib(1),
        "M: {avail}",
    );

    assert_eq!(storage.threshold_warn, gib(2));
    assert_eq!(storage.threshold_err, gib(1));
    assert_eq!(storage.state(gib(1)), "err");
    assert_eq!(storage.state(gib(1) + 1), "warn");
    assert_eq!(storage.state(gib(2)), "warn");
    assert_eq!(storage.state(gib(3)), "ok");

    let reading = storage.reading(gib(3));
    assert!(reading.full_text.starts_with("M: 3"), "{}", reading.full_text);
    assert_eq!(reading.short_text.as_deref(), Some(reading.full_text.as_str()));
    assert_eq!(reading.color.as_deref(), Some("#00ff00"));
    assert_eq!(storage.reading(0).color.as_deref(), Some("#ff0000"));
}

#[test]
fn test_memory_source_option() {
    let plugin = MemoryPlugin::new();
    let options = validate(&plugin, json!({"source": 2})).unwrap();
    assert_eq!(options.text("source"), Some("swap"));
    let options = validate(&plugin, json!({"source": "RAM"})).unwrap();
    assert_eq!(options.text("source"), Some("ram"));
    assert!(validate(&plugin, json!({"source": "zram"})).is_err());
}

#[tokio::test]
async fn test_temperature_reads_millidegrees() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("temp1_input");
    tokio::fs::write(&input, "45300\n").await.unwrap();

    let reading = fetch_once(
        &TemperaturePlugin::new(),
        "temperature",
        json!({"path": input.to_str().unwrap()}),
    )
    .await
    .unwrap();
    assert_eq!(reading.full_text, "T: 45°C");
    assert_eq!(reading.color.as_deref(), Some("#ffff00"));

    tokio::fs::write(&input, "not a number").await.unwrap();
    let err = fetch_once(
        &TemperaturePlugin::new(),
        "temperature",
        json!({"path": input.to_str().unwrap()}),
    )
    .await;
    assert!(err.is_err());
}

#[tokio::test]
async fn test_battery_states() {
    let dir = TempDir::new().unwrap();
    let battery = dir.path().join("BAT0");
    let adapter = dir.path().join("AC");
    tokio::fs::create_dir(&battery).await.unwrap();
    tokio::fs::create_dir(&adapter).await.unwrap();

    let options = json!({
        "battery": battery.to_str().unwrap(),
        "adapter": adapter.to_str().unwrap()
    });

    let cases = [
        ("1", "20", "B: 20%", "#00ff00"),
        ("0", "80", "B: 80%", "#ffffff"),
        ("0", "25", "B: 25%", "#ffff00"),
        ("0", "15", "B: 15%", "#ff0000"),
    ];
    for (online, capacity, text, color) in cases {
        tokio::fs::write(adapter.join("online"), online).await.unwrap();
        tokio::fs::write(battery.join("capacity"), format!("{}\n", capacity))
            .await
            .unwrap();

        let reading = fetch_once(&BatteryPlugin::new(), "battery", options.clone())
            .await
            .unwrap();
        assert_eq!(reading.full_text, text);
        assert_eq!(reading.color.as_deref(), Some(color), "capacity {}", capacity);
    }
}

#[tokio::test]
async fn test_battery_missing_files_fail_the_fetch() {
    let dir = TempDir::new().unwrap();
    let result = fetch_once(
        &BatteryPlugin::new(),
        "battery",
        json!({"battery": dir.path().to_str().unwrap(), "adapter": dir.path().to_str().unwrap()}),
    )
    .await;
    assert!(result.is_err());
}

#[test]
fn test_disk_needs_a_directory() {
    let theme = get_theme("default");
    let plugin = DiskPlugin::new();
    let options = Options::new();

    let err = plugin
        .instantiate(&context("disk", "home", &options, &theme))
        .err()
        .unwrap();
    assert!(matches!(err, ConfigError::Plugin { .. }));
    assert_eq!(err.exit_code(), 6);

    let dir = TempDir::new().unwrap();
    let path = dir.path().to_str().unwrap();
    assert!(plugin
        .instantiate(&context("disk", path, &options, &theme))
        .is_ok());
}

#[test]
fn test_zfs_requires_a_dataset() {
    let plugin = ZfsPlugin::new();
    let err = validate(&plugin, json!({})).unwrap_err();
    assert!(matches!(err, ConfigError::MissingOption { ref option, .. } if option == "dataset"));
}

#[tokio::test]
async fn test_loadavg_formats_three_values() {
    let reading = fetch_once(&LoadavgPlugin::new(), "loadavg", json!({})).await.unwrap();
    let parts: Vec<&str> = reading.full_text.split_whitespace().collect();
    assert_eq!(parts.len(), 4);
    assert_eq!(parts[0], "L:");
    for part in &parts[1..] {
        let (_, decimals) = part.split_once('.').unwrap();
        assert_eq!(decimals.len(), 2);
    }
    assert!(reading.short_text.unwrap().starts_with("L: "));
}

#[tokio::test]
async fn test_clock_formats() {
    let reading = fetch_once(
        &ClockPlugin::new(),
        "clock",
        json!({"text": "%Y", "short": "", "utc": true}),
    )
    .await
    .unwrap();
    assert_eq!(reading.full_text.len(), 4);
    assert!(reading.full_text.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(reading.short_text, None);
    assert_eq!(reading.color, None);
}

#[tokio::test]
async fn test_clock_reports_unformattable_time_as_an_error() {
    // Options built by hand skip validation, so the sensor itself must not
    // panic on a format chrono cannot render.
    let theme = get_theme("default");
    let plugin = ClockPlugin::new();
    let options = Options::new().with("text", OptionValue::Text("%H:%M %#z".to_string()));
    let mut sensor = plugin
        .instantiate(&context("clock", "clock", &options, &theme))
        .unwrap();

    let err = sensor.fetch().await.unwrap_err();
    assert!(err.to_string().contains("%#z"), "{}", err);
}
