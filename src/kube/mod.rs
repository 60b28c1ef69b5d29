use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, Error};

pub mod ingress;
#[cfg(test)]
pub mod mock;

/// Result of reading a resource that may legitimately be missing.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

/// The cluster operations the reconciler needs.
#[async_trait]
pub trait IngressStore: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<Lookup<Ingress>, Error>;
    async fn create(&self, namespace: &str, ingress: &Ingress) -> Result<Ingress, Error>;
    async fn replace(&self, namespace: &str, name: &str, ingress: &Ingress)
        -> Result<Ingress, Error>;
    async fn delete(&self, namespace: &str, name: &str) -> Result<(), Error>;
}

pub struct Kube {
    client: Client,
}

impl Kube {
    pub async fn connect() -> Result<Self, Error> {
        let client = Client::try_default().await?;

        Ok(Kube { client })
    }

    fn ingresses(&self, namespace: &str) -> Api<Ingress> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl IngressStore for Kube {
    async fn get(&self, namespace: &str, name: &str) -> Result<Lookup<Ingress>, Error> {
        match self.ingresses(namespace).get(name).await {
            Ok(ingress) => Ok(Lookup::Found(ingress)),
            Err(Error::Api(response)) if response.code == 404 => {
                trace!("Ingress `{}/{}` does not exist.", namespace, name);
                Ok(Lookup::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    async fn create(&self, namespace: &str, ingress: &Ingress) -> Result<Ingress, Error> {
        self.ingresses(namespace)
            .create(&PostParams::default(), ingress)
            .await
    }

    async fn replace(
        &self,
        namespace: &str,
        name: &str,
        ingress: &Ingress,
    ) -> Result<Ingress, Error> {
        self.ingresses(namespace)
            .replace(name, &PostParams::default(), ingress)
            .await
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), Error> {
        self.ingresses(namespace)
            .delete(name, &DeleteParams::default())
            .await?;

        Ok(())
    }
}
