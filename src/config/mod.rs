//! Configuration module.
//!
//! JSON configuration files, `BUZZLINE__`-prefixed environment overrides,
//! and compiled defaults, merged by [`loader::load`]. See each submodule
//! for the concern it configures:
//!
//! - [`types`]: root `Config` struct plus security/generator/persistence
//! - [`server`]: heartbeat, buzzer timing, and room lifetime knobs
//! - [`logging`]: log level, format, and rolling-file options
//! - [`loader`]: source merging and env parsing
//! - [`validation`]: startup sanity checks
//! - [`defaults`]: default value functions

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod server;
pub mod types;
pub mod validation;

pub use loader::load;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use server::ServerConfig;
pub use types::{
    Config, GeneratorConfig, PersistenceBackend, PersistenceConfig, SecurityConfig,
};
pub use validation::validate_config;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.port, 3001);
        assert_eq!(config.server.ping_interval_ms, 1_000);
        assert_eq!(config.server.pong_timeout_ms, 3_000);
        assert_eq!(config.server.tie_window_ms, 250);
        assert_eq!(config.server.tie_buffer_ms, 50);
        assert_eq!(config.server.final_answer_timeout_ms, 30_000);
        assert_eq!(config.server.room_grace_ms, 300_000);

        assert_eq!(config.security.frontend_origin, "*");
        assert_eq!(config.persistence.backend, PersistenceBackend::DocumentStore);
        assert_eq!(config.persistence.dir, "saved_games");
        assert!(config.generator.endpoint.is_none());

        assert_eq!(config.logging.dir, "logs");
        assert_eq!(config.logging.filename, "server.log");
        assert_eq!(config.logging.rotation, "daily");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config.port, deserialized.port);
        assert_eq!(config.server.tie_window_ms, deserialized.server.tie_window_ms);
        assert_eq!(
            config.persistence.backend,
            deserialized.persistence.backend
        );
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"port": 9000, "server": {"tie_window_ms": 125}}"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.server.tie_window_ms, 125);
        assert_eq!(config.server.tie_buffer_ms, 50);
        assert_eq!(config.security.frontend_origin, "*");
    }

    #[test]
    fn persistence_backend_names_are_snake_case() {
        let config: Config =
            serde_json::from_str(r#"{"persistence": {"backend": "filesystem"}}"#).unwrap();
        assert_eq!(config.persistence.backend, PersistenceBackend::Filesystem);
        let config: Config =
            serde_json::from_str(r#"{"persistence": {"backend": "document_store"}}"#).unwrap();
        assert_eq!(config.persistence.backend, PersistenceBackend::DocumentStore);
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(LogLevel::Info.to_string(), "info");
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }

    #[test]
    fn warning_aliases_parse() {
        let level: LogLevel = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(level, LogLevel::Warn);
        assert!(serde_json::from_str::<LogLevel>("\"loud\"").is_err());
    }
}
