use env_logger::Env;

/// `level` is the default filter when `RUST_LOG` is unset; an explicit `RUST_LOG` always wins.
pub fn init(level: Option<&str>) {
    let default = level.unwrap_or("info");
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(default))
        .format_target(false)
        .try_init();
}
