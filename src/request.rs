use crate::config::Config;
use crate::event::{CloseProxy, NewProxy, ProxyEvent};
use crate::kube::IngressStore;
use crate::policy::{self, PolicyDecision};
use crate::reconcile::{Outcome, ReconcileError, Reconciler};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Plugin reply as frp expects it.
///
/// `unchange` is about the proxy content, not about routing: frp takes a
/// reply without it as replacement content. The adapter never rewrites the
/// content, so every accepting reply sets it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reply {
    pub reject: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unchange: Option<bool>,
}

impl Reply {
    pub fn accept() -> Self {
        Reply {
            reject: false,
            reject_reason: None,
            unchange: Some(true),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Reply {
            reject: true,
            reject_reason: Some(reason.into()),
            unchange: None,
        }
    }
}

/// What a handled event answers with. `Closed` events carry no body.
#[derive(Clone, Debug, PartialEq)]
pub enum Handled {
    Reply(Reply),
    Empty,
}

/// Runs events through the policy and the reconciler.
pub struct Handler<S> {
    config: Arc<Config>,
    reconciler: Reconciler<S>,
}

impl<S: IngressStore> Handler<S> {
    pub fn new(config: Arc<Config>, store: S) -> Self {
        let reconciler = Reconciler::new(store, config.namespace.clone(), config.instance.clone());

        Handler { config, reconciler }
    }

    pub async fn handle(&self, event: ProxyEvent) -> Result<Handled, ReconcileError> {
        match event {
            ProxyEvent::Registered(proxy) => self.register(proxy).await.map(Handled::Reply),
            ProxyEvent::Closed(proxy) => {
                self.close(proxy).await?;
                Ok(Handled::Empty)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        self.reconciler.store()
    }

    async fn register(&self, proxy: NewProxy) -> Result<Reply, ReconcileError> {
        let name = policy::resource_name(&self.config.instance, &proxy.proxy_name);

        let reply = match policy::decide(&proxy, &self.config) {
            PolicyDecision::Apply(target) => {
                let outcome = self.reconciler.apply(&target).await?;
                info!(
                    "Ingress `{}` {} for proxy `{}` ({}).",
                    name,
                    outcome,
                    proxy.proxy_name,
                    target.hosts.join(", ")
                );
                return Ok(Reply::accept());
            }
            PolicyDecision::Ignore(reason) => {
                debug!("Ignoring proxy `{}`: {}.", proxy.proxy_name, reason);
                Reply::accept()
            }
            PolicyDecision::Reject(reason) => {
                debug!("Rejecting proxy `{}`: {}.", proxy.proxy_name, reason);
                Reply::reject(reason)
            }
        };

        // A re-registration that no longer routes must not leave the old
        // Ingress behind. The policy reply stands even if cleanup fails.
        match self.reconciler.prune(&name).await {
            Ok(Outcome::Deleted) => info!(
                "Ingress `{}` deleted, proxy `{}` no longer routes.",
                name, proxy.proxy_name
            ),
            Ok(_) => {}
            Err(e) => warn!("Failed to prune ingress `{}`: {}", name, e),
        }

        Ok(reply)
    }

    async fn close(&self, proxy: CloseProxy) -> Result<(), ReconcileError> {
        let name = policy::resource_name(&self.config.instance, &proxy.proxy_name);

        match self.reconciler.remove(&name).await? {
            Outcome::Deleted => info!("Ingress `{}` deleted for closed proxy.", name),
            outcome => debug!("Ingress `{}` {} for closed proxy.", name, outcome),
        }

        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum RequestError {
    #[error(transparent)]
    HyperError(#[from] hyper::Error),
    #[error(transparent)]
    HttpError(#[from] http::Error),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}
