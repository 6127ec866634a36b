pub mod toml_loader;

pub use toml_loader::resolve_locator_config;
