use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use service_core::http::RetryConfig;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub common: core_config::Config,
    pub registry: RegistryConfig,
    pub retry: RetrySettings,
    pub groups: GroupPolicyConfig,
}

/// Connection settings for the COmanage Registry REST API.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Base URL without a trailing slash, e.g. `https://registry.example.org/registry`.
    pub url: String,
    pub coid: i64,
    pub api_user_id: String,
    pub api_key: Secret<String>,
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub attempts: u32,
    pub backoff_multiplier: f64,
}

impl RetrySettings {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.attempts, self.backoff_multiplier)
    }
}

#[derive(Debug, Clone)]
pub struct GroupPolicyConfig {
    /// Glob patterns naming the resources a group may be created for.
    pub create_groups_for_resources: Vec<String>,
}

impl Default for GroupPolicyConfig {
    fn default() -> Self {
        Self {
            create_groups_for_resources: vec!["*".to_string()],
        }
    }
}

impl BridgeConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Build the bridge settings from any key/value source.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = get_var(&lookup, "COMANAGE_REGISTRY_URL", None)?;
        let url = url.trim_end_matches('/').to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "COMANAGE_REGISTRY_URL must be an http(s) URL, got '{}'",
                url
            )));
        }

        let timeout_seconds = parse_var(&lookup, "COMANAGE_TIMEOUT_SECONDS", "10")?;
        let connect_timeout_seconds = match lookup("COMANAGE_CONNECT_TIMEOUT_SECONDS") {
            Some(raw) => parse_value("COMANAGE_CONNECT_TIMEOUT_SECONDS", &raw)?,
            None => timeout_seconds,
        };

        let attempts: u32 = parse_var(&lookup, "COMANAGE_RETRY_ATTEMPTS", "3")?;
        if attempts == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "COMANAGE_RETRY_ATTEMPTS must be at least 1"
            )));
        }

        let create_groups_for_resources = match lookup("CREATE_GROUPS_FOR_RESOURCES") {
            Some(raw) => parse_pattern_list(&raw)?,
            None => GroupPolicyConfig::default().create_groups_for_resources,
        };

        Ok(BridgeConfig {
            common,
            registry: RegistryConfig {
                url,
                coid: parse_var(&lookup, "COMANAGE_COID", "")?,
                api_user_id: get_var(&lookup, "COMANAGE_API_USERID", None)?,
                api_key: Secret::new(get_var(&lookup, "COMANAGE_API_KEY", None)?),
                timeout_seconds,
                connect_timeout_seconds,
            },
            retry: RetrySettings {
                attempts,
                backoff_multiplier: parse_var(&lookup, "COMANAGE_RETRY_BACKOFF", "3")?,
            },
            groups: GroupPolicyConfig {
                create_groups_for_resources,
            },
        })
    }
}

fn get_var<F>(lookup: &F, key: &str, default: Option<&str>) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => default.map(str::to_string).ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!("{} is required but not set", key))
        }),
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let default = (!default.is_empty()).then_some(default);
    let raw = get_var(lookup, key, default)?;
    parse_value(key, &raw)
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
    })
}

/// Accepts a JSON array (`["urn:a:*","urn:b"]`) or a comma-separated list.
fn parse_pattern_list(raw: &str) -> Result<Vec<String>, AppError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "CREATE_GROUPS_FOR_RESOURCES is not a valid JSON list: {}",
                e
            ))
        });
    }

    Ok(trimmed
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect())
}
