//! Builders for registry repositories laid out on disk.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use kubecm::{ContextTriple, Kubeconfig};

/// Static cluster definition embedding a one-context kubeconfig.
pub fn static_cluster(server: &str, token: &str) -> String {
    format!(
        r#"apiVersion: kubecm.io/v1alpha1
kind: Cluster
provider: static
kubeconfig: |
  apiVersion: v1
  kind: Config
  clusters:
  - name: upstream
    cluster:
      server: "{server}"
  users:
  - name: upstream
    user:
      token: "{token}"
  contexts:
  - name: upstream
    context:
      cluster: upstream
      user: upstream
  current-context: upstream
"#
    )
}

/// EKS cluster definition.
pub fn aws_cluster(region: &str, cluster: &str) -> String {
    format!("kind: Cluster\nprovider: aws\naws:\n  region: \"{region}\"\n  cluster: \"{cluster}\"\n")
}

/// Builder for a registry repository directory.
#[derive(Default)]
pub struct RegistryBuilder {
    name: String,
    variables: Vec<(String, bool, Option<String>)>,
    files: Vec<(String, String)>,
}

impl RegistryBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Declare a variable in `registry.yaml`.
    pub fn variable(mut self, name: &str, required: bool, default: Option<&str>) -> Self {
        self.variables
            .push((name.to_string(), required, default.map(str::to_string)));
        self
    }

    /// Role using the legacy `fragments` list.
    pub fn fragments_role(self, name: &str, prefix: Option<&str>, fragments: &[&str]) -> Self {
        let mut body = format!("kind: Role\nmetadata:\n  name: {name}\n");
        if let Some(prefix) = prefix {
            body.push_str(&format!("contextPrefix: {prefix}\n"));
        }
        body.push_str("fragments:\n");
        for fragment in fragments {
            body.push_str(&format!("- {fragment}\n"));
        }
        self.file(&format!("roles/{name}.yaml"), &body)
    }

    /// Role with a raw YAML body.
    pub fn role(self, name: &str, body: &str) -> Self {
        self.file(&format!("roles/{name}.yaml"), body)
    }

    pub fn cluster(self, name: &str, body: &str) -> Self {
        self.file(&format!("clusters/{name}.yaml"), body)
    }

    pub fn fragment(self, name: &str, body: &str) -> Self {
        self.file(&format!("fragments/{name}.yaml"), body)
    }

    pub fn user(self, name: &str, body: &str) -> Self {
        self.file(&format!("users/{name}.yaml"), body)
    }

    pub fn file(mut self, path: &str, body: &str) -> Self {
        self.files.push((path.to_string(), body.to_string()));
        self
    }

    fn registry_yaml(&self) -> String {
        let mut body = format!(
            "apiVersion: kubecm.io/v1alpha1\nkind: Registry\nmetadata:\n  name: {}\n",
            self.name
        );
        if !self.variables.is_empty() {
            body.push_str("variables:\n");
            for (name, required, default) in &self.variables {
                body.push_str(&format!("- name: {name}\n  required: {required}\n"));
                if let Some(default) = default {
                    body.push_str(&format!("  default: \"{default}\"\n"));
                }
            }
        }
        body
    }

    /// Write the repository into `dir`, replacing files of the same name.
    pub fn write(&self, dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("registry.yaml"), self.registry_yaml()).unwrap();
        for (path, body) in &self.files {
            let target = dir.join(path);
            fs::create_dir_all(target.parent().unwrap()).unwrap();
            fs::write(target, body).unwrap();
        }
    }
}

/// Kubeconfig of hand-made contexts, each with its own cluster and user.
pub fn kubeconfig_with(contexts: &[(&str, &str, &str)]) -> Kubeconfig {
    let mut config = Kubeconfig::new();
    for (name, server, token) in contexts {
        let mut triple = ContextTriple::default();
        triple.cluster.server = server.to_string();
        triple.auth_info.token = Some(token.to_string());
        config.upsert_triple(name, triple);
    }
    config
}
