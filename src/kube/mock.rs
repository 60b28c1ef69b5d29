//! In-memory `IngressStore` for tests.

use super::{IngressStore, Lookup};
use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;
use kube::error::ErrorResponse;
use kube::Error;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Get(String),
    Create(Ingress),
    Replace(String, Ingress),
    Delete(String),
}

#[derive(Default)]
pub struct MockStore {
    ingresses: Mutex<BTreeMap<(String, String), Ingress>>,
    calls: Mutex<Vec<Call>>,
    fail_with: Mutex<Option<u16>>,
}

impl MockStore {
    pub fn with(namespace: &str, ingress: Ingress) -> Self {
        let store = MockStore::default();
        store.insert(namespace, ingress);
        store
    }

    pub fn insert(&self, namespace: &str, ingress: Ingress) {
        let name = ingress.metadata.name.clone().unwrap_or_default();
        self.ingresses
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name), ingress);
    }

    pub fn stored(&self, namespace: &str, name: &str) -> Option<Ingress> {
        self.ingresses
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Every following call fails with an API error carrying `code`.
    pub fn fail_with(&self, code: u16) {
        *self.fail_with.lock().unwrap() = Some(code);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, Call::Get(_)))
            .collect()
    }

    fn record(&self, call: Call) -> Result<(), Error> {
        self.calls.lock().unwrap().push(call);
        match *self.fail_with.lock().unwrap() {
            Some(code) => Err(api_error(code, "injected failure")),
            None => Ok(()),
        }
    }
}

pub fn api_error(code: u16, message: &str) -> Error {
    Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: match code {
            404 => "NotFound",
            409 => "Conflict",
            _ => "InternalError",
        }
        .to_string(),
        code,
    })
}

fn next_version(ingress: &Ingress) -> String {
    let current: u64 = ingress
        .metadata
        .resource_version
        .as_deref()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    (current + 1).to_string()
}

#[async_trait]
impl IngressStore for MockStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Lookup<Ingress>, Error> {
        self.record(Call::Get(name.to_string()))?;
        Ok(match self.stored(namespace, name) {
            Some(ingress) => Lookup::Found(ingress),
            None => Lookup::NotFound,
        })
    }

    async fn create(&self, namespace: &str, ingress: &Ingress) -> Result<Ingress, Error> {
        self.record(Call::Create(ingress.clone()))?;
        let name = ingress.metadata.name.clone().unwrap_or_default();
        if self.stored(namespace, &name).is_some() {
            return Err(api_error(409, "already exists"));
        }

        let mut created = ingress.clone();
        created.metadata.resource_version = Some("1".to_string());
        self.insert(namespace, created.clone());
        Ok(created)
    }

    async fn replace(
        &self,
        namespace: &str,
        name: &str,
        ingress: &Ingress,
    ) -> Result<Ingress, Error> {
        self.record(Call::Replace(name.to_string(), ingress.clone()))?;
        let current = self
            .stored(namespace, name)
            .ok_or_else(|| api_error(404, "not found"))?;
        if ingress.metadata.resource_version.is_some()
            && ingress.metadata.resource_version != current.metadata.resource_version
        {
            return Err(api_error(409, "the object has been modified"));
        }

        let mut replaced = ingress.clone();
        replaced.metadata.resource_version = Some(next_version(&current));
        self.insert(namespace, replaced.clone());
        Ok(replaced)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), Error> {
        self.record(Call::Delete(name.to_string()))?;
        self.ingresses
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| api_error(404, "not found"))
    }
}
