//! Logging setup

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber on stderr.
///
/// `RUST_LOG` takes precedence over `level` when set. Calling this more than
/// once keeps the first subscriber.
pub fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Our own crate logs at `level`; FFmpeg bindings and the runtime stay at warn
fn default_directive(level: &str) -> String {
    format!("warn,vidshrink={}", level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_parses() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            let directive = default_directive(level);
            assert!(EnvFilter::try_new(&directive).is_ok(), "{}", directive);
        }
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging("debug", false);
        init_logging("info", true);
    }
}
