use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;
use thiserror::Error;

const PREFIX: &str = "FRP_INGRESS_";

/// Process-wide settings, read once at startup and shared read-only.
#[derive(Clone, Debug)]
pub struct Config {
    pub log_level: String,
    /// IP address or hostname, resolved when the listener binds.
    pub host: String,
    pub port: u16,
    pub namespace: String,
    /// Identifies this adapter instance. Prefixes every managed Ingress name
    /// and is written as the ownership marker.
    pub instance: String,
    pub subdomain: Option<SubdomainConfig>,
    pub custom_domains: CustomDomainPolicy,
    pub ingress: IngressConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SubdomainConfig {
    pub host: String,
    pub secret_name: Option<String>,
}

/// What to do with proxies that claim domains outside the subdomain host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CustomDomainPolicy {
    Allow,
    Deny,
    Ignore,
}

impl FromStr for CustomDomainPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "true" => Ok(CustomDomainPolicy::Allow),
            "false" => Ok(CustomDomainPolicy::Deny),
            "ignore" => Ok(CustomDomainPolicy::Ignore),
            other => Err(ConfigError::InvalidPolicy(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IngressConfig {
    pub class_name: Option<String>,
    pub annotations: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub service: BackendService,
}

/// The service every generated rule points at.
#[derive(Clone, Debug, PartialEq)]
pub struct BackendService {
    pub name: String,
    pub port: BackendPort,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BackendPort {
    Name(String),
    Number(i32),
    Unset,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Keys are the full variable
    /// names, e.g. `FRP_INGRESS_PORT`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(format!("{}{}", PREFIX, name).as_str()).filter(|v| !v.is_empty());

        let port: u16 = match var("PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("PORT", port.clone()))?,
            None => 7001,
        };

        let subdomain = var("SUB_DOMAIN_HOST").map(|host| SubdomainConfig {
            host,
            secret_name: var("SUB_DOMAIN_SECRET_NAME"),
        });

        let custom_domains = match var("ALLOW_CUSTOM_DOMAINS") {
            Some(policy) => policy.parse()?,
            None => CustomDomainPolicy::Ignore,
        };

        let port_name = var("INGRESS_SERVICE_PORT_NAME");
        let port_number: Option<i32> = match var("INGRESS_SERVICE_PORT_NUMBER") {
            Some(number) => Some(
                number
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber("INGRESS_SERVICE_PORT_NUMBER", number.clone()))?,
            ),
            None => None,
        };
        let service_port = match (port_name, port_number) {
            (Some(_), Some(_)) => return Err(ConfigError::AmbiguousServicePort),
            (Some(name), None) => BackendPort::Name(name),
            (None, Some(number)) => BackendPort::Number(number),
            (None, None) => BackendPort::Unset,
        };

        let service = BackendService {
            name: var("INGRESS_SERVICE_NAME").ok_or(ConfigError::Missing("INGRESS_SERVICE_NAME"))?,
            port: service_port,
        };

        Ok(Config {
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            namespace: var("NAMESPACE").unwrap_or_else(|| "default".to_string()),
            instance: var("APP_INSTANCE").unwrap_or_else(|| "frp-ingress".to_string()),
            subdomain,
            custom_domains,
            ingress: IngressConfig {
                class_name: var("INGRESS_CLASS_NAME"),
                annotations: parse_string_map("INGRESS_ANNOTATIONS", var("INGRESS_ANNOTATIONS"))?,
                labels: parse_string_map("INGRESS_LABELS", var("INGRESS_LABELS"))?,
                service,
            },
        })
    }

    pub fn listen_addr(&self) -> (&str, u16) {
        (&self.host, self.port)
    }
}

fn parse_string_map(
    name: &'static str,
    raw: Option<String>,
) -> Result<BTreeMap<String, String>, ConfigError> {
    match raw {
        Some(raw) => {
            serde_json::from_str(&raw).map_err(|source| ConfigError::InvalidMap { name, source })
        }
        None => Ok(BTreeMap::new()),
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("FRP_INGRESS_{0} must be set.")]
    Missing(&'static str),
    #[error("FRP_INGRESS_{0} is not a valid number: `{1}`.")]
    InvalidNumber(&'static str, String),
    #[error("`{0}` is not a custom domain policy, expected `true`, `false` or `ignore`.")]
    InvalidPolicy(String),
    #[error("FRP_INGRESS_{name} must be a JSON object of strings: {source}")]
    InvalidMap {
        name: &'static str,
        source: serde_json::Error,
    },
    #[error("Only one of the service port name and number may be set.")]
    AmbiguousServicePort,
}
