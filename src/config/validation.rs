//! Configuration validation functions.

use super::Config;

/// Reject configurations that cannot work at runtime. Returns a newline
/// separated list of every problem found.
pub fn validate_config(config: &Config) -> Result<(), String> {
    let mut problems = Vec::new();

    if config.server.tie_window_ms == 0 {
        problems.push("server.tie_window_ms must be greater than zero".to_string());
    }
    if config.server.ping_interval_ms == 0 {
        problems.push("server.ping_interval_ms must be greater than zero".to_string());
    }
    if config.server.pong_timeout_ms <= config.server.ping_interval_ms {
        problems.push(format!(
            "server.pong_timeout_ms ({}) must exceed server.ping_interval_ms ({})",
            config.server.pong_timeout_ms, config.server.ping_interval_ms
        ));
    }
    if config.server.final_answer_timeout_ms == 0 {
        problems.push("server.final_answer_timeout_ms must be greater than zero".to_string());
    }
    if config.server.max_message_size < 1_024 {
        problems.push("server.max_message_size must be at least 1024 bytes".to_string());
    }
    if config.generator.endpoint.is_none() && config.generator.api_key.is_some() {
        problems.push("generator.api_key is set but generator.endpoint is not".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn zero_tie_window_is_rejected() {
        let mut config = Config::default();
        config.server.tie_window_ms = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.contains("tie_window_ms"));
    }

    #[test]
    fn pong_timeout_must_exceed_ping_interval() {
        let mut config = Config::default();
        config.server.pong_timeout_ms = config.server.ping_interval_ms;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn orphan_api_key_is_flagged() {
        let mut config = Config::default();
        config.generator.api_key = Some("secret".to_string());
        let err = validate_config(&config).unwrap_err();
        assert!(err.contains("generator.endpoint"));
    }

    #[test]
    fn all_problems_are_reported_together() {
        let mut config = Config::default();
        config.server.tie_window_ms = 0;
        config.server.final_answer_timeout_ms = 0;
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.lines().count(), 2);
    }
}
