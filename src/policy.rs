//! Decides what routing a proxy registration is entitled to.
//!
//! Everything in here is pure: the same event and config always produce the
//! same decision, and no decision touches the cluster.

use crate::config::{BackendService, Config, CustomDomainPolicy, SubdomainConfig};
use crate::event::NewProxy;
use std::collections::BTreeMap;

/// Ownership marker. Only Ingresses carrying this instance's value here are
/// ever replaced or deleted.
pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const INGRESS_INSTANCE: &str = "frp-ingress.io/ingress-instance";
pub const PROXY_NAME: &str = "frp-ingress.io/proxy-name";
pub const PROXY_SPEC: &str = "frp-ingress.io/proxy-spec";

/// The desired state of one managed Ingress.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutingTarget {
    pub resource_name: String,
    pub instance: String,
    pub hosts: Vec<String>,
    pub tls_secret_name: Option<String>,
    pub annotations: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub ingress_class_name: Option<String>,
    pub backend: BackendService,
}

impl RoutingTarget {
    /// Without a shared secret every host gets its own certificate secret.
    pub fn tls_per_host(&self) -> bool {
        self.tls_secret_name.is_none()
    }

    pub fn host_secret_name(&self, host: &str) -> String {
        format!("{}-{}", self.instance, host)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PolicyDecision {
    Apply(RoutingTarget),
    /// Nothing to route; the registration itself is fine.
    Ignore(&'static str),
    /// The registration must be refused.
    Reject(&'static str),
}

pub fn resource_name(instance: &str, proxy_name: &str) -> String {
    format!("{}-{}", instance, proxy_name)
}

pub fn decide(proxy: &NewProxy, config: &Config) -> PolicyDecision {
    if proxy.proxy_type != "http" {
        return PolicyDecision::Ignore("non-http proxy type");
    }

    let subdomain_config = config.subdomain.as_ref();

    let (hosts, tls_secret_name) = match &proxy.subdomain {
        Some(subdomain) => match subdomain_config {
            Some(sub) => (
                vec![format!("{}.{}", subdomain, sub.host)],
                sub.secret_name.clone(),
            ),
            None => return PolicyDecision::Reject("subdomain is not configured"),
        },
        None => match subdomain_config {
            Some(sub) if all_are_subdomains(&proxy.custom_domains, sub) => {
                (proxy.custom_domains.clone(), sub.secret_name.clone())
            }
            _ => match config.custom_domains {
                CustomDomainPolicy::Ignore => {
                    return PolicyDecision::Ignore("custom domains ignored by policy")
                }
                CustomDomainPolicy::Deny => {
                    return PolicyDecision::Reject("custom domains rejected by policy")
                }
                CustomDomainPolicy::Allow => (proxy.custom_domains.clone(), None),
            },
        },
    };

    if hosts.is_empty() {
        return PolicyDecision::Ignore("no hosts to route");
    }

    let mut annotations = config.ingress.annotations.clone();
    annotations.insert(MANAGED_BY.to_string(), config.instance.clone());
    annotations.insert(INGRESS_INSTANCE.to_string(), config.instance.clone());
    annotations.insert(PROXY_NAME.to_string(), proxy.proxy_name.clone());
    annotations.insert(PROXY_SPEC.to_string(), proxy.spec.to_string());

    PolicyDecision::Apply(RoutingTarget {
        resource_name: resource_name(&config.instance, &proxy.proxy_name),
        instance: config.instance.clone(),
        hosts,
        tls_secret_name,
        annotations,
        labels: config.ingress.labels.clone(),
        ingress_class_name: config.ingress.class_name.clone(),
        backend: config.ingress.service.clone(),
    })
}

/// Every domain has to be exactly one label under the subdomain host. Labels
/// are word characters or hyphens, so wildcards never count.
fn all_are_subdomains(domains: &[String], sub: &SubdomainConfig) -> bool {
    domains.iter().all(|domain| match domain.split_once('.') {
        Some((label, rest)) => is_label(label) && rest == sub.host,
        None => false,
    })
}

fn is_label(label: &str) -> bool {
    !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
