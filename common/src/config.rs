use serde::{Deserialize, Serialize};

/// Service configuration, persisted as JSON in the data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// IANA timezone the weekly triggers fire in.
    pub timezone: String,
    pub command_timeout_ms: u64,
    /// Wait between a successful power-on and the input switch.
    pub input_switch_delay_ms: u64,
    pub overheat_threshold_c: f32,
    pub alert_suppression_minutes: u64,
    pub http_port: u16,
    #[serde(default)]
    pub alert_webhook_url: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Madrid".to_string(),
            command_timeout_ms: 3_000,
            input_switch_delay_ms: 30_000,
            overheat_threshold_c: 75.0,
            alert_suppression_minutes: 60,
            http_port: 3001,
            alert_webhook_url: None,
        }
    }
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        self.command_timeout_ms = self.command_timeout_ms.clamp(100, 60_000);
        self.input_switch_delay_ms = self.input_switch_delay_ms.min(300_000);

        if !self.overheat_threshold_c.is_finite() {
            self.overheat_threshold_c = 75.0;
        }
        self.overheat_threshold_c = self.overheat_threshold_c.clamp(40.0, 110.0);

        self.alert_suppression_minutes = self.alert_suppression_minutes.clamp(1, 24 * 60);

        if self.http_port == 0 {
            self.http_port = 3001;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_survive_sanitize() {
        let mut config = RuntimeConfig::default();
        let expected = config.clone();
        config.sanitize();

        assert_eq!(config.command_timeout_ms, expected.command_timeout_ms);
        assert_eq!(config.overheat_threshold_c, expected.overheat_threshold_c);
        assert_eq!(config.http_port, expected.http_port);
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let mut config = RuntimeConfig {
            command_timeout_ms: 0,
            overheat_threshold_c: f32::NAN,
            alert_suppression_minutes: 0,
            http_port: 0,
            ..RuntimeConfig::default()
        };
        config.sanitize();

        assert_eq!(config.command_timeout_ms, 100);
        assert_eq!(config.overheat_threshold_c, 75.0);
        assert_eq!(config.alert_suppression_minutes, 1);
        assert_eq!(config.http_port, 3001);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = RuntimeConfig {
            alert_webhook_url: Some("http://alerts.local/hook".to_string()),
            ..RuntimeConfig::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: RuntimeConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.timezone, config.timezone);
        assert_eq!(parsed.alert_webhook_url, config.alert_webhook_url);
    }
}
