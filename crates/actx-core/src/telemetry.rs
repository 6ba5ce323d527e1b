//! Process-level tracing setup shared by the actx binaries.
//!
//! Distinct from the per-branch operation log: tracing goes to stderr for
//! the operator, the operation log goes to `logs/<branch>.log` for
//! observability of the store itself.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `level` is the default verbosity; the `ACTX_LOG` environment variable
/// overrides it with a full filter directive. With `json` set, log lines are
/// emitted as newline-delimited JSON. Calling this more than once is a
/// no-op: the global subscriber can only be installed once per process.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_env("ACTX_LOG")
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr).json())
            .try_init()
            .ok();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}
