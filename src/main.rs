use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use pico_args::Arguments;
use statusblocks::config;
use statusblocks::utils::{lib_path, logger};
use statusblocks::{get_theme, ConfigError, Registry, RenderOptions, Statusline};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::time::MissedTickBehavior;

#[derive(Debug)]
struct Args {
    config: Option<PathBuf>,
    theme: Option<String>,
    debug: bool,
    list_plugins: bool,
    help: bool,
    version: bool,
}

impl Args {
    fn from_env() -> Result<Self, pico_args::Error> {
        let mut args = Arguments::from_env();

        let parsed = Self {
            help: args.contains(["-h", "--help"]),
            version: args.contains(["-V", "--version"]),
            debug: args.contains(["-d", "--debug"]),
            list_plugins: args.contains("--list-plugins"),
            config: args.opt_value_from_str(["-c", "--config"])?,
            theme: args.opt_value_from_str("--theme")?,
        };

        let rest = args.finish();
        if !rest.is_empty() {
            eprintln!("Warning: ignoring unexpected arguments {:?}", rest);
        }
        Ok(parsed)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::from_env() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            return ExitCode::from(2);
        }
    };

    if args.help {
        print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        println!("statusblocks {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    logger::init(args.debug);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            match e.downcast_ref::<ConfigError>() {
                Some(config_error) => ExitCode::from(config_error.exit_code()),
                None => ExitCode::FAILURE,
            }
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = config::load_config(args.config).await?;
    if let Some(theme) = args.theme {
        config.theme = theme;
    }
    let frame_interval = config.frame_interval()?;

    let mut registry =
        Registry::new(get_theme(&config.theme)).with_fetch_timeout(config.fetch_timeout());
    let plugin_dir = config.plugin_dir.clone().or_else(lib_path);
    registry.load_plugins(plugin_dir.as_deref()).await;

    if args.list_plugins {
        for plugin in registry.plugins() {
            let info = plugin.info();
            println!("{:<16} {:<10} {}", info.name, info.version, info.author);
        }
        return Ok(());
    }

    let descriptors = config.resolve_blocks(&registry)?;

    // Watch signals before any worker runs, so an early SIGTERM is queued
    // instead of killing the process mid-startup.
    let mut signals = signals::Signals::new(&config.header)?;

    let render = RenderOptions {
        indent: if args.debug { Some(4) } else { config.render.indent },
        ..config.render.clone()
    };
    let statusline = Statusline::new(io::stdout(), render);

    for block in &descriptors {
        if let Err(e) = registry.instantiate(
            &statusline,
            &block.plugin,
            &block.name,
            block.interval,
            &block.options,
        ) {
            registry.stop_all().await;
            return Err(e.into());
        }
    }
    info!(
        "{} of {} configured blocks running",
        registry.instance_count(),
        descriptors.len()
    );

    // Give the first fetches a chance to land before the first frame.
    tokio::time::sleep(config.startup_delay()).await;

    statusline
        .start(&config.header.to_header())
        .context("failed to open the status stream")?;

    let result = drive(&statusline, &mut signals, frame_interval).await;

    registry.stop_all().await;
    if let Err(e) = statusline.stop() {
        warn!("Failed to close the status stream: {}", e);
    }
    result
}

/// Emit frames until asked to quit or stdout goes away.
async fn drive(
    statusline: &Statusline<io::Stdout>,
    signals: &mut signals::Signals,
    frame_interval: std::time::Duration,
) -> Result<()> {
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut paused = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if paused {
                    continue;
                }
                if let Err(e) = statusline.sendline() {
                    error!("Failed to write status line: {}", e);
                    return Ok(());
                }
            }
            event = signals.next() => match event {
                signals::Event::Shutdown(name) => {
                    info!("Received {}", name);
                    return Ok(());
                }
                signals::Event::Pause => {
                    debug!("Pausing output");
                    paused = true;
                }
                signals::Event::Resume => {
                    debug!("Resuming output");
                    paused = false;
                    ticker.reset_immediately();
                }
            }
        }
    }
}

#[cfg(unix)]
mod signals {
    use anyhow::{Context, Result};
    use log::warn;
    use statusblocks::config::HeaderConfig;
    use tokio::signal::unix::{signal, Signal, SignalKind};

    /// Signals that can't be handled by a process.
    const UNCATCHABLE: &[i32] = &[9, 19];

    pub enum Event {
        Shutdown(&'static str),
        Pause,
        Resume,
    }

    pub struct Signals {
        interrupt: Signal,
        terminate: Signal,
        stop: Option<Signal>,
        cont: Option<Signal>,
    }

    impl Signals {
        pub fn new(header: &HeaderConfig) -> Result<Self> {
            Ok(Self {
                interrupt: signal(SignalKind::interrupt()).context("failed to watch SIGINT")?,
                terminate: signal(SignalKind::terminate()).context("failed to watch SIGTERM")?,
                stop: optional(header.stop_signal)?,
                cont: optional(header.cont_signal)?,
            })
        }

        pub async fn next(&mut self) -> Event {
            tokio::select! {
                _ = self.interrupt.recv() => Event::Shutdown("SIGINT"),
                _ = self.terminate.recv() => Event::Shutdown("SIGTERM"),
                _ = recv(&mut self.stop) => Event::Pause,
                _ = recv(&mut self.cont) => Event::Resume,
            }
        }
    }

    fn optional(number: Option<i32>) -> Result<Option<Signal>> {
        match number {
            Some(n) if UNCATCHABLE.contains(&n) => {
                warn!("Signal {} cannot be caught, leaving it to the kernel", n);
                Ok(None)
            }
            Some(n) => signal(SignalKind::from_raw(n))
                .map(Some)
                .with_context(|| format!("failed to watch signal {}", n)),
            None => Ok(None),
        }
    }

    async fn recv(signal: &mut Option<Signal>) {
        match signal {
            Some(signal) => {
                signal.recv().await;
            }
            None => std::future::pending().await,
        }
    }
}

#[cfg(not(unix))]
mod signals {
    use anyhow::Result;
    use statusblocks::config::HeaderConfig;

    // Only `Shutdown` is ever produced here.
    #[allow(dead_code)]
    pub enum Event {
        Shutdown(&'static str),
        Pause,
        Resume,
    }

    pub struct Signals;

    impl Signals {
        pub fn new(_header: &HeaderConfig) -> Result<Self> {
            Ok(Self)
        }

        pub async fn next(&mut self) -> Event {
            let _ = tokio::signal::ctrl_c().await;
            Event::Shutdown("Ctrl-C")
        }
    }
}

fn print_help() {
    println!(
        r#"statusblocks - i3bar/swaybar status line generator

USAGE:
    statusblocks [OPTIONS]

OPTIONS:
    -c, --config <FILE>   Configuration file (JSON)
    -d, --debug           Debug logging and indented output
        --theme <NAME>    Color theme: {}
        --list-plugins    Print the available plugins and exit
    -h, --help            Print help
    -V, --version         Print version

CONFIGURATION:
    Searched in order when --config is not given:
        $STATUSBLOCKS_CONFIG
        ./statusblocks.json
        ~/.config/statusblocks/config.json

ENVIRONMENT:
    STATUSBLOCKS_THEME        Override the configured theme
    STATUSBLOCKS_PLUGIN_DIR   Directory of external plugins
    STATUSBLOCKS_LOG          Log filter (env_logger syntax)

EXAMPLE:
    {{
        "interval": 1,
        "theme": "nord",
        "blocks": [
            {{"plugin": "clock", "text": "%H:%M"}},
            {{"plugin": "cpu", "interval": 2, "threshold_warn": 80}}
        ]
    }}
"#,
        statusblocks::theme_names().join(", ")
    );
}
