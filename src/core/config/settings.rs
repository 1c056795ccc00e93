use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_environment, parse_u32, parse_u64, parse_usize,
};
use super::types::{
    ApiSettings, ConfigError, RuntimeSettings, SessionSettings, Settings, TelemetrySettings,
};

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            parse_environment(env_optional("EXAMIND_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("EXAMIND_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let base_url = env_or_default("EXAMIND_API_BASE_URL", "http://localhost:8000/api/v1");
        let bearer_token = env_optional("EXAMIND_API_TOKEN");
        let timeout_seconds =
            parse_u64("EXAMIND_API_TIMEOUT_SECONDS", env_or_default("EXAMIND_API_TIMEOUT_SECONDS", "30"))?;
        let connect_timeout_seconds = parse_u64(
            "EXAMIND_API_CONNECT_TIMEOUT_SECONDS",
            env_or_default("EXAMIND_API_CONNECT_TIMEOUT_SECONDS", "10"),
        )?;

        let warning_threshold_seconds = parse_u32(
            "EXAMIND_WARNING_THRESHOLD_SECONDS",
            env_or_default("EXAMIND_WARNING_THRESHOLD_SECONDS", "60"),
        )?;
        let auto_save_interval_seconds = parse_u32(
            "EXAMIND_AUTO_SAVE_INTERVAL_SECONDS",
            env_or_default("EXAMIND_AUTO_SAVE_INTERVAL_SECONDS", "10"),
        )?;
        let max_attachments =
            parse_usize("EXAMIND_MAX_ATTACHMENTS", env_or_default("EXAMIND_MAX_ATTACHMENTS", "10"))?;

        let log_level = env_or_default("EXAMIND_LOG_LEVEL", "info");
        let json = env_optional("EXAMIND_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("EXAMIND_PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { base_url, bearer_token, timeout_seconds, connect_timeout_seconds },
            session: SessionSettings {
                warning_threshold_seconds,
                auto_save_interval_seconds,
                max_attachments,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session.warning_threshold_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "EXAMIND_WARNING_THRESHOLD_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.session.auto_save_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "EXAMIND_AUTO_SAVE_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.session.max_attachments == 0 {
            return Err(ConfigError::InvalidValue {
                field: "EXAMIND_MAX_ATTACHMENTS",
                value: "0".to_string(),
            });
        }

        if self.api.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "EXAMIND_API_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.api.base_url.is_empty()
            || !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://"))
        {
            return Err(ConfigError::MissingSetting("EXAMIND_API_BASE_URL"));
        }
        if self.api.bearer_token.is_none() {
            return Err(ConfigError::MissingSetting("EXAMIND_API_TOKEN"));
        }

        Ok(())
    }
}
