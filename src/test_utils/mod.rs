//! Helpers shared by unit and integration tests
//!
//! Logging stays silent unless a level is passed or `RUST_LOG` is set, so
//! `RUST_LOG=nugup=debug cargo test` shows resolver and runner decisions.

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Install a test-friendly subscriber once per process
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// A minimal SDK-style project file referencing `packages` as `(name, version)`
pub fn sdk_project(packages: &[(&str, &str)]) -> String {
    let mut content = String::from("<Project Sdk=\"Microsoft.NET.Sdk\">\n  <ItemGroup>\n");
    for (name, version) in packages {
        content.push_str(&format!(
            "    <PackageReference Include=\"{}\" Version=\"{}\" />\n",
            name, version
        ));
    }
    content.push_str("  </ItemGroup>\n</Project>\n");
    content
}
