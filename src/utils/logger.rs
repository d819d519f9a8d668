use env_logger::{Builder, DEFAULT_FILTER_ENV};
use log::LevelFilter;

/// Installs the global logger.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` for this crate when `verbose`, with
/// vulkano capped at `warn`.
pub fn init(verbose: bool) {
    let rust_log = std::env::var(DEFAULT_FILTER_ENV).ok();
    configure(rust_log.as_deref(), verbose)
        .format_timestamp_millis()
        .init();
}

fn configure(rust_log: Option<&str>, verbose: bool) -> Builder {
    let mut builder = Builder::new();
    match rust_log {
        Some(filters) => {
            builder.parse_filters(filters);
        }
        None => {
            builder
                .parse_filters(if verbose { "info,snek3d=debug" } else { "info" })
                .filter_module("vulkano", LevelFilter::Warn);
        }
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    fn allows(mut builder: Builder, target: &str, level: Level) -> bool {
        let logger = builder.build();
        let metadata = log::Metadata::builder().target(target).level(level).build();
        log::Log::enabled(&logger, &metadata)
    }

    #[test]
    fn vulkano_is_capped_by_default() {
        assert!(!allows(configure(None, false), "vulkano::device", Level::Info));
        assert!(allows(configure(None, false), "vulkano::device", Level::Warn));
        assert!(allows(configure(None, false), "snek3d::engine", Level::Info));
    }

    #[test]
    fn rust_log_overrides_vulkano_cap() {
        let builder = configure(Some("info,vulkano=debug"), false);
        assert!(allows(builder, "vulkano::device", Level::Debug));
    }

    #[test]
    fn verbose_enables_crate_debug() {
        assert!(allows(configure(None, true), "snek3d::engine", Level::Debug));
        assert!(!allows(configure(None, false), "snek3d::engine", Level::Debug));
    }
}
