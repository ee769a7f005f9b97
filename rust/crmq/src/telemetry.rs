use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: OnceCell<()> = OnceCell::new();

/// Filter applied when `RUST_LOG` is unset: service logs plus HTTP request spans.
pub const DEFAULT_DIRECTIVES: &str = "crmq=info,tower_http=info";

pub fn init_tracing() {
    init_tracing_with(DEFAULT_DIRECTIVES);
}

/// Installs the global fmt subscriber once; later calls are no-ops.
pub fn init_tracing_with(default_directives: &str) {
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives));
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    });
}
