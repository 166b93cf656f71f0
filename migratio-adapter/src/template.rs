use crate::config::AdapterConfig;
use std::path::{Path, PathBuf};

/// Directory, relative to this crate's root, holding the migration templates.
pub const TEMPLATE_DIR: &str = "templates";

/// Absolute path of the configured migration template.
///
/// The path is anchored at the directory this crate was installed to, so the
/// result does not depend on the process working directory.
pub fn template_path(config: &AdapterConfig) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join(TEMPLATE_DIR)
        .join(config.migration_file())
}
