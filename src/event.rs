use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// A proxy lifecycle notification from the frp server plugin.
#[derive(Clone, Debug, PartialEq)]
pub enum ProxyEvent {
    Registered(NewProxy),
    Closed(CloseProxy),
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewProxy {
    pub proxy_name: String,
    pub proxy_type: String,
    pub subdomain: Option<String>,
    pub custom_domains: Vec<String>,
    /// The `content` object exactly as received, unknown fields included.
    pub spec: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CloseProxy {
    pub proxy_name: String,
}

/// The plugin request body. Other top-level fields (`version`) are skipped.
#[derive(Deserialize)]
#[serde(tag = "op", content = "content")]
enum Envelope {
    NewProxy(Value),
    CloseProxy(CloseProxyContent),
}

#[derive(Deserialize)]
struct NewProxyContent {
    proxy_name: String,
    proxy_type: String,
    subdomain: Option<String>,
    custom_domains: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct CloseProxyContent {
    proxy_name: String,
}

impl ProxyEvent {
    pub fn parse(body: &[u8]) -> Result<Self, EventError> {
        let event = match serde_json::from_slice::<Envelope>(body)? {
            Envelope::NewProxy(content) => {
                let fields: NewProxyContent = serde_json::from_value(content.clone())?;
                ProxyEvent::Registered(NewProxy {
                    proxy_name: fields.proxy_name,
                    proxy_type: fields.proxy_type,
                    // frp leaves unset fields empty
                    subdomain: fields.subdomain.filter(|s| !s.is_empty()),
                    custom_domains: fields.custom_domains.unwrap_or_default(),
                    spec: content,
                })
            }
            Envelope::CloseProxy(fields) => ProxyEvent::Closed(CloseProxy {
                proxy_name: fields.proxy_name,
            }),
        };

        if event.proxy_name().is_empty() {
            return Err(EventError::EmptyProxyName);
        }

        Ok(event)
    }

    pub fn proxy_name(&self) -> &str {
        match self {
            ProxyEvent::Registered(proxy) => &proxy.proxy_name,
            ProxyEvent::Closed(proxy) => &proxy.proxy_name,
        }
    }
}

#[derive(Error, Debug)]
pub enum EventError {
    #[error("Malformed plugin request: {0}")]
    Json(#[from] serde_json::Error),
    #[error("The proxy name is empty.")]
    EmptyProxyName,
}
