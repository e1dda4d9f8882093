/// TOML configuration, validation and the hot-reloading config manager.
pub mod toml_config;
