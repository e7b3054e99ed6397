use env_logger::{Builder, Env, Target};

/// Environment variable holding an env_logger filter, e.g. `debug` or
/// `statusblocks::worker=trace`.
pub const LOG_ENV: &str = "STATUSBLOCKS_LOG";

/// Initialize logging on stderr. stdout is reserved for the bar protocol.
pub fn init(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let _ = Builder::from_env(Env::default().filter_or(LOG_ENV, level))
        .target(Target::Stderr)
        .try_init();
}
