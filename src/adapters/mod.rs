// Adapters - External system implementations

pub mod exec_libav;
pub mod fs_local;
pub mod toml_config;

// Re-export adapters
pub use exec_libav::LibavBackend;
pub use fs_local::LocalFsAdapter;
pub use toml_config::{Settings, TomlConfigAdapter};
