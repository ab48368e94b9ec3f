pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const COMMIT: &str = match option_env!("BUILD_COMMIT") {
    Some(c) => c,
    None => "unknown",
};

/// Version string shown by `docsync --version`.
pub fn version_string() -> String {
    format!("{VERSION} (commit: {COMMIT})")
}
