use crate::kube::ingress;
use crate::kube::{IngressStore, Lookup};
use crate::policy::RoutingTarget;
use k8s_openapi::api::networking::v1::Ingress;
use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Replaced,
    Deleted,
    Noop,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Created => "created",
            Outcome::Replaced => "replaced",
            Outcome::Deleted => "deleted",
            Outcome::Noop => "unchanged",
        })
    }
}

/// Converges the Ingresses in one namespace to what the policy asks for.
/// Every call reads the current object first and never touches one that
/// belongs to someone else.
pub struct Reconciler<S> {
    store: S,
    namespace: String,
    instance: String,
}

impl<S: IngressStore> Reconciler<S> {
    pub fn new(store: S, namespace: impl Into<String>, instance: impl Into<String>) -> Self {
        Reconciler {
            store,
            namespace: namespace.into(),
            instance: instance.into(),
        }
    }

    pub async fn apply(&self, target: &RoutingTarget) -> Result<Outcome, ReconcileError> {
        let name = &target.resource_name;
        let mut desired = ingress::desired(target);
        debug!("Prepared ingress `{}`: {:?}", name, desired);

        match self.store.get(&self.namespace, name).await? {
            Lookup::NotFound => {
                self.store.create(&self.namespace, &desired).await?;
                Ok(Outcome::Created)
            }
            Lookup::Found(existing) => {
                self.check_owner(name, &existing)?;
                desired.metadata.resource_version = existing.metadata.resource_version;
                self.store.replace(&self.namespace, name, &desired).await?;
                Ok(Outcome::Replaced)
            }
        }
    }

    pub async fn remove(&self, name: &str) -> Result<Outcome, ReconcileError> {
        match self.store.get(&self.namespace, name).await? {
            Lookup::NotFound => Ok(Outcome::Noop),
            Lookup::Found(existing) => {
                self.check_owner(name, &existing)?;
                debug!("Deleting ingress `{}`.", name);
                self.store.delete(&self.namespace, name).await?;
                Ok(Outcome::Deleted)
            }
        }
    }

    /// Deletes an Ingress this instance left behind for a proxy that no
    /// longer routes. Ingresses owned by others are not ours to clean up.
    pub async fn prune(&self, name: &str) -> Result<Outcome, ReconcileError> {
        match self.remove(name).await {
            Err(ReconcileError::Foreign { name, owner }) => {
                debug!(
                    "Not pruning ingress `{}`, it is managed by {:?}.",
                    name, owner
                );
                Ok(Outcome::Noop)
            }
            res => res,
        }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    fn check_owner(&self, name: &str, existing: &Ingress) -> Result<(), ReconcileError> {
        match ingress::owner(existing) {
            Some(owner) if owner == self.instance => Ok(()),
            owner => Err(ReconcileError::Foreign {
                name: name.to_string(),
                owner: owner.map(str::to_string),
            }),
        }
    }
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Ingress `{name}` exists but is not managed by this instance (managed by {owner:?}).")]
    Foreign { name: String, owner: Option<String> },
    #[error("Kubernetes request failed: {0}")]
    Kube(#[from] kube::Error),
}
