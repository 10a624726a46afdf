//! Test harness for isolated registry tests.
//!
//! `TestHarness` owns a temporary directory holding:
//! - `home/`, the kubecm state directory
//! - `sources/<registry>/<ref>/`, registry contents served by `CopyFetcher`
//! - `kubeconfig`, the live kubeconfig file

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tempfile::TempDir;
use walkdir::WalkDir;

use kubecm::kubeconfig::{file, ExecConfig};
use kubecm::registry::{
    AddRegistry, AwsParams, AzureParams, ClusterProviders, ProviderError, RegistryError,
    RegistryManager, RepositoryFetcher, StateStore, Variables,
};
use kubecm::{ContextTriple, Kubeconfig};

use super::builders::RegistryBuilder;

/// Serves registry "clones" by copying `<url>/<ref>` into the destination.
#[derive(Clone, Default)]
pub struct CopyFetcher {
    fetches: Rc<RefCell<Vec<(String, String)>>>,
}

impl CopyFetcher {
    /// `(url, ref)` pairs fetched so far.
    pub fn fetches(&self) -> Vec<(String, String)> {
        self.fetches.borrow().clone()
    }
}

impl RepositoryFetcher for CopyFetcher {
    fn fetch(&self, url: &str, git_ref: &str, dest: &Path) -> kubecm::registry::Result<String> {
        self.fetches
            .borrow_mut()
            .push((url.to_string(), git_ref.to_string()));

        let source = Path::new(url);
        if !source.is_dir() {
            return Err(RegistryError::GitOperation(format!(
                "repository '{}' not found",
                url
            )));
        }
        let source = source.join(git_ref);
        if !source.is_dir() {
            return Err(RegistryError::GitRefNotFound(git_ref.to_string()));
        }

        if dest.exists() {
            fs::remove_dir_all(dest).unwrap();
        }
        for entry in WalkDir::new(&source) {
            let entry = entry.unwrap();
            let target = dest.join(entry.path().strip_prefix(&source).unwrap());
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).unwrap();
            } else {
                fs::copy(entry.path(), &target).unwrap();
            }
        }
        Ok("0".repeat(40))
    }
}

/// Cloud providers answering from memory. Clusters named in `failing` error out.
#[derive(Clone, Default)]
pub struct FakeProviders {
    pub failing: BTreeSet<String>,
}

impl FakeProviders {
    pub fn failing(clusters: &[&str]) -> Self {
        Self {
            failing: clusters.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn check(&self, program: &str, cluster: &str) -> Result<(), ProviderError> {
        if self.failing.contains(cluster) {
            return Err(ProviderError::Command {
                program: program.to_string(),
                message: format!("cluster {} unreachable", cluster),
            });
        }
        Ok(())
    }
}

impl ClusterProviders for FakeProviders {
    fn aws_kubeconfig(&self, params: &AwsParams) -> Result<Kubeconfig, ProviderError> {
        self.check("aws", &params.cluster)?;

        let mut triple = ContextTriple::default();
        triple.cluster.server = format!(
            "https://{}.{}.eks.amazonaws.com",
            params.cluster, params.region
        );
        let mut exec = ExecConfig {
            api_version: Some("client.authentication.k8s.io/v1beta1".to_string()),
            command: "aws".to_string(),
            args: vec!["eks".to_string(), "get-token".to_string()],
            ..Default::default()
        };
        if let Some(profile) = &params.profile {
            exec.set_env("AWS_PROFILE", profile.clone());
        }
        triple.auth_info.exec = Some(exec);

        let mut config = Kubeconfig::new();
        config.upsert_triple(&params.cluster, triple);
        Ok(config)
    }

    fn azure_kubeconfig(&self, params: &AzureParams) -> Result<Vec<u8>, ProviderError> {
        self.check("az", &params.cluster)?;

        Ok(format!(
            "apiVersion: v1\nkind: Config\nclusters:\n- name: {c}\n  cluster:\n    server: https://{c}.hcp.azmk8s.io\nusers:\n- name: {c}\n  user:\n    exec:\n      command: kubelogin\n      args: [get-token]\ncontexts:\n- name: {c}\n  context:\n    cluster: {c}\n    user: {c}\ncurrent-context: {c}\n",
            c = params.cluster
        )
        .into_bytes())
    }
}

/// Isolated environment for registry integration tests.
pub struct TestHarness {
    temp_dir: TempDir,
    pub home: PathBuf,
    pub sources: PathBuf,
    pub kubeconfig_path: PathBuf,
    pub fetcher: CopyFetcher,
    pub providers: FakeProviders,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_providers(FakeProviders::default())
    }

    pub fn with_providers(providers: FakeProviders) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let home = base.join("home");
        let sources = base.join("sources");
        fs::create_dir_all(&home).expect("Failed to create home dir");
        fs::create_dir_all(&sources).expect("Failed to create sources dir");

        Self {
            kubeconfig_path: base.join("kubeconfig"),
            temp_dir,
            home,
            sources,
            fetcher: CopyFetcher::default(),
            providers,
        }
    }

    /// URL under which `registry` is served.
    pub fn url(&self, registry: &str) -> String {
        self.sources.join(registry).to_string_lossy().into_owned()
    }

    /// Publishes `builder` as `git_ref` of `registry`.
    pub fn publish(&self, registry: &str, git_ref: &str, builder: &RegistryBuilder) {
        builder.write(&self.sources.join(registry).join(git_ref));
    }

    pub fn store(&self) -> StateStore {
        StateStore::new(&self.home)
    }

    pub fn manager(&self) -> RegistryManager {
        RegistryManager::new(
            self.store(),
            Box::new(self.fetcher.clone()),
            Box::new(self.providers.clone()),
        )
    }

    /// Adds `registry` tracking `main` with the given role and bindings.
    pub fn add_registry(
        &self,
        registry: &str,
        role: &str,
        variables: &[(&str, &str)],
    ) -> kubecm::registry::Result<kubecm::RegistryEntry> {
        self.manager().add(AddRegistry {
            name: registry.to_string(),
            url: self.url(registry),
            git_ref: None,
            role: role.to_string(),
            variables: variables
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Variables>(),
        })
    }

    pub fn load_kubeconfig(&self) -> Kubeconfig {
        file::load(&self.kubeconfig_path).expect("Failed to load kubeconfig")
    }

    pub fn save_kubeconfig(&self, config: &Kubeconfig) {
        file::save(&self.kubeconfig_path, config).expect("Failed to save kubeconfig");
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
