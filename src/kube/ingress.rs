use crate::config::{BackendPort, BackendService};
use crate::policy::{RoutingTarget, MANAGED_BY};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// The Ingress a routing target should converge to. Built from scratch every
/// time so a replace never carries anything over from the previous object.
pub fn desired(target: &RoutingTarget) -> Ingress {
    let backend = backend(&target.backend);

    let rules = target
        .hosts
        .iter()
        .map(|host| IngressRule {
            host: Some(host.clone()),
            http: Some(HTTPIngressRuleValue {
                paths: vec![HTTPIngressPath {
                    path: Some("/".to_string()),
                    path_type: "Prefix".to_string(),
                    backend: backend.clone(),
                }],
            }),
        })
        .collect();

    Ingress {
        metadata: ObjectMeta {
            name: Some(target.resource_name.clone()),
            annotations: Some(target.annotations.clone()),
            labels: Some(target.labels.clone()),
            ..ObjectMeta::default()
        },
        spec: Some(IngressSpec {
            ingress_class_name: target.ingress_class_name.clone(),
            rules: Some(rules),
            tls: Some(tls(target)),
            ..IngressSpec::default()
        }),
        ..Ingress::default()
    }
}

fn tls(target: &RoutingTarget) -> Vec<IngressTLS> {
    if target.tls_per_host() {
        return target
            .hosts
            .iter()
            .map(|host| IngressTLS {
                hosts: Some(vec![host.clone()]),
                secret_name: Some(target.host_secret_name(host)),
            })
            .collect();
    }

    vec![IngressTLS {
        hosts: Some(target.hosts.clone()),
        secret_name: target.tls_secret_name.clone(),
    }]
}

fn backend(service: &BackendService) -> IngressBackend {
    let port = match &service.port {
        BackendPort::Name(name) => Some(ServiceBackendPort {
            name: Some(name.clone()),
            number: None,
        }),
        BackendPort::Number(number) => Some(ServiceBackendPort {
            name: None,
            number: Some(*number),
        }),
        BackendPort::Unset => None,
    };

    IngressBackend {
        service: Some(IngressServiceBackend {
            name: service.name.clone(),
            port,
        }),
        resource: None,
    }
}

/// The instance that claims the Ingress, if any.
pub fn owner(ingress: &Ingress) -> Option<&str> {
    ingress
        .metadata
        .annotations
        .as_ref()?
        .get(MANAGED_BY)
        .map(String::as_str)
}
