//! Reconciliation tests running the sync engine against on-disk registries.

mod common;

use common::{aws_cluster, kubeconfig_with, static_cluster, FakeProviders, RegistryBuilder};
use kubecm::kubeconfig::Context;
use kubecm::registry::{RegistryEntry, Syncer, Variables};
use kubecm::Kubeconfig;
use tempfile::TempDir;

fn entry(role: &str) -> RegistryEntry {
    RegistryEntry {
        name: "acme".to_string(),
        url: "https://git.example.com/acme/clusters.git".to_string(),
        git_ref: "main".to_string(),
        role: role.to_string(),
        ..Default::default()
    }
}

fn base_registry() -> RegistryBuilder {
    RegistryBuilder::new("acme")
        .fragment("a", &static_cluster("https://a.example.com", "token-a"))
        .fragment("b", &static_cluster("https://b.example.com", "token-b"))
        .cluster("db1", &static_cluster("https://db1.example.com", "token-db1"))
}

fn write(builder: RegistryBuilder) -> TempDir {
    let dir = TempDir::new().unwrap();
    builder.write(dir.path());
    dir
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn test_second_sync_is_a_no_op() {
    let repo = write(base_registry().fragments_role("devops", Some("acme"), &["a", "b"]));
    let providers = FakeProviders::default();
    let syncer = Syncer::new(&providers);
    let mut entry = entry("devops");
    let mut config = Kubeconfig::new();

    let first = syncer.sync(repo.path(), &mut entry, &mut config).unwrap();
    assert_eq!(first.added, vec!["acme-a", "acme-b"]);

    let snapshot = config.clone();
    let second = syncer.sync(repo.path(), &mut entry, &mut config).unwrap();

    assert!(second.added.is_empty());
    assert!(second.updated.is_empty());
    assert!(second.removed.is_empty());
    assert_eq!(second.unchanged, vec!["acme-a", "acme-b"]);
    assert_eq!(config, snapshot);
}

#[test]
fn test_cloud_cluster_sync_is_idempotent() {
    let repo = write(
        RegistryBuilder::new("acme")
            .cluster("prod", &aws_cluster("eu-west-1", "prod"))
            .role("ops", "contexts:\n- cluster: prod\n"),
    );
    let providers = FakeProviders::default();
    let syncer = Syncer::new(&providers);
    let mut entry = entry("ops");
    let mut config = Kubeconfig::new();

    syncer.sync(repo.path(), &mut entry, &mut config).unwrap();
    let second = syncer.sync(repo.path(), &mut entry, &mut config).unwrap();

    assert!(!second.has_changes());
    assert_eq!(
        config.cluster("prod").unwrap().server,
        "https://prod.eu-west-1.eks.amazonaws.com"
    );
}

// ============================================================================
// Stale pruning
// ============================================================================

#[test]
fn test_context_dropped_from_role_is_removed() {
    let dir = TempDir::new().unwrap();
    base_registry()
        .fragments_role("devops", None, &["a", "b"])
        .write(dir.path());
    let providers = FakeProviders::default();
    let syncer = Syncer::new(&providers);
    let mut entry = entry("devops");
    let mut config = Kubeconfig::new();
    syncer.sync(dir.path(), &mut entry, &mut config).unwrap();

    RegistryBuilder::new("acme")
        .fragments_role("devops", None, &["a"])
        .write(dir.path());
    let result = syncer.sync(dir.path(), &mut entry, &mut config).unwrap();

    assert_eq!(result.removed, vec!["b"]);
    assert!(!config.has_context("b"));
    assert!(config.cluster("b").is_none());
    assert!(config.auth_info("b").is_none());
    assert_eq!(config.cluster("a").unwrap().server, "https://a.example.com");
    assert_eq!(
        config.auth_info("a").unwrap().token.as_deref(),
        Some("token-a")
    );
    assert_eq!(entry.managed_contexts, vec!["a"]);
}

#[test]
fn test_managed_context_deleted_by_hand_is_not_reported() {
    let dir = TempDir::new().unwrap();
    base_registry()
        .fragments_role("devops", None, &["a", "b"])
        .write(dir.path());
    let providers = FakeProviders::default();
    let syncer = Syncer::new(&providers);
    let mut entry = entry("devops");
    let mut config = Kubeconfig::new();
    syncer.sync(dir.path(), &mut entry, &mut config).unwrap();

    config.remove_context("b").unwrap();
    RegistryBuilder::new("acme")
        .fragments_role("devops", None, &["a"])
        .write(dir.path());
    let result = syncer.sync(dir.path(), &mut entry, &mut config).unwrap();

    assert!(result.removed.is_empty());
    assert_eq!(entry.managed_contexts, vec!["a"]);
}

// ============================================================================
// Shared resources
// ============================================================================

#[test]
fn test_pruning_keeps_cluster_still_referenced() {
    let dir = TempDir::new().unwrap();
    base_registry()
        .fragments_role("devops", None, &["a", "b"])
        .write(dir.path());
    let providers = FakeProviders::default();
    let syncer = Syncer::new(&providers);
    let mut entry = entry("devops");
    let mut config = Kubeconfig::new();
    syncer.sync(dir.path(), &mut entry, &mut config).unwrap();

    // A hand-made context sharing the managed cluster and user of `b`.
    config.upsert_context(
        "b-admin",
        Context {
            cluster: "b".to_string(),
            user: "b".to_string(),
            namespace: Some("kube-system".to_string()),
            ..Default::default()
        },
    );

    RegistryBuilder::new("acme")
        .fragments_role("devops", None, &["a"])
        .write(dir.path());
    let result = syncer.sync(dir.path(), &mut entry, &mut config).unwrap();

    assert_eq!(result.removed, vec!["b"]);
    assert!(!config.has_context("b"));
    assert!(config.has_context("b-admin"));
    assert_eq!(config.cluster("b").unwrap().server, "https://b.example.com");
    assert!(config.auth_info("b").is_some());
}

// ============================================================================
// Unmanaged conflicts
// ============================================================================

#[test]
fn test_unmanaged_context_is_skipped_untouched() {
    let repo = write(base_registry().role("devops", "contexts:\n- cluster: a\n  name: mine\n- cluster: b\n"));
    let providers = FakeProviders::default();
    let mut entry = entry("devops");
    let mut config = kubeconfig_with(&[("mine", "https://hand-made.example.com", "secret")]);
    let before = config.clone();

    let result = Syncer::new(&providers)
        .sync(repo.path(), &mut entry, &mut config)
        .unwrap();

    assert_eq!(result.skipped, vec!["mine"]);
    assert_eq!(result.added, vec!["b"]);
    assert_eq!(config.context("mine"), before.context("mine"));
    assert_eq!(config.cluster("mine"), before.cluster("mine"));
    assert_eq!(config.auth_info("mine"), before.auth_info("mine"));
    assert_eq!(entry.managed_contexts, vec!["b"]);
}

#[test]
fn test_skipped_context_is_never_claimed() {
    let repo = write(base_registry().role("devops", "contexts:\n- cluster: a\n  name: mine\n"));
    let providers = FakeProviders::default();
    let syncer = Syncer::new(&providers);
    let mut entry = entry("devops");
    let mut config = kubeconfig_with(&[("mine", "https://hand-made.example.com", "secret")]);

    syncer.sync(repo.path(), &mut entry, &mut config).unwrap();
    let second = syncer.sync(repo.path(), &mut entry, &mut config).unwrap();

    assert_eq!(second.skipped, vec!["mine"]);
    assert!(entry.managed_contexts.is_empty());
}

// ============================================================================
// Dry run
// ============================================================================

#[test]
fn test_dry_run_matches_real_run_without_mutating() {
    let dir = TempDir::new().unwrap();
    base_registry()
        .fragments_role("devops", None, &["a", "b"])
        .write(dir.path());
    let providers = FakeProviders::default();
    let mut entry = entry("devops");
    let mut config = kubeconfig_with(&[("db1", "https://hand-made.example.com", "secret")]);
    Syncer::new(&providers)
        .sync(dir.path(), &mut entry, &mut config)
        .unwrap();

    // Drop b, change a, claim the unmanaged db1.
    RegistryBuilder::new("acme")
        .fragment("a", &static_cluster("https://a2.example.com", "token-a"))
        .role("devops", "contexts:\n- cluster: a\n- cluster: db1\n")
        .write(dir.path());

    let config_before = config.clone();
    let entry_before = entry.clone();
    let planned = Syncer::new(&providers)
        .dry_run(true)
        .sync(dir.path(), &mut entry, &mut config)
        .unwrap();

    assert_eq!(config, config_before);
    assert_eq!(entry, entry_before);
    assert_eq!(planned.updated, vec!["a"]);
    assert_eq!(planned.removed, vec!["b"]);
    assert_eq!(planned.skipped, vec!["db1"]);

    let applied = Syncer::new(&providers)
        .sync(dir.path(), &mut entry, &mut config)
        .unwrap();
    assert_eq!(applied, planned);
    assert_ne!(config, config_before);
}

// ============================================================================
// Naming and templating
// ============================================================================

#[test]
fn test_context_names_follow_prefix() {
    let providers = FakeProviders::default();

    let prefixed = write(base_registry().role("r", "contextPrefix: acme\ncontexts:\n- cluster: db1\n"));
    let mut config = Kubeconfig::new();
    Syncer::new(&providers)
        .sync(prefixed.path(), &mut entry("r"), &mut config)
        .unwrap();
    assert_eq!(config.context_names(), vec!["acme-db1"]);
    assert!(config.cluster("acme-db1").is_some());
    assert!(config.auth_info("acme-db1").is_some());

    let bare = write(base_registry().role("r", "contexts:\n- cluster: db1\n"));
    let mut config = Kubeconfig::new();
    Syncer::new(&providers)
        .sync(bare.path(), &mut entry("r"), &mut config)
        .unwrap();
    assert_eq!(config.context_names(), vec!["db1"]);
}

#[test]
fn test_explicit_name_ignores_prefix() {
    let repo = write(base_registry().role(
        "r",
        "contextPrefix: acme\ncontexts:\n- cluster: db1\n  name: database\n",
    ));
    let providers = FakeProviders::default();
    let mut config = Kubeconfig::new();

    Syncer::new(&providers)
        .sync(repo.path(), &mut entry("r"), &mut config)
        .unwrap();
    assert_eq!(config.context_names(), vec!["database"]);
}

#[test]
fn test_empty_bindings_leave_templates_verbatim() {
    let repo = write(
        RegistryBuilder::new("acme")
            .fragment("t", &static_cluster("https://t.example.com", "{{ .Username }}-token"))
            .fragments_role("r", None, &["t"]),
    );
    let providers = FakeProviders::default();
    let mut config = Kubeconfig::new();

    let result = Syncer::new(&providers)
        .sync(repo.path(), &mut entry("r"), &mut config)
        .unwrap();
    assert_eq!(result.added, vec!["t"]);
    assert_eq!(
        config.auth_info("t").unwrap().token.as_deref(),
        Some("{{ .Username }}-token")
    );
}

#[test]
fn test_missing_variable_is_a_per_context_error() {
    let repo = write(
        base_registry()
            .fragment("t", &static_cluster("https://t.example.com", "{{ .Username }}-token"))
            .fragments_role("r", None, &["a", "t"]),
    );
    let providers = FakeProviders::default();
    let mut entry = entry("r");
    entry.variables = Variables::from([("Team".to_string(), "ops".to_string())]);
    let mut config = Kubeconfig::new();

    let result = Syncer::new(&providers)
        .sync(repo.path(), &mut entry, &mut config)
        .unwrap();
    assert_eq!(result.added, vec!["a"]);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("t: "));

    entry
        .variables
        .insert("Username".to_string(), "alice".to_string());
    let result = Syncer::new(&providers)
        .sync(repo.path(), &mut entry, &mut config)
        .unwrap();
    assert_eq!(result.added, vec!["t"]);
    assert_eq!(
        config.auth_info("t").unwrap().token.as_deref(),
        Some("alice-token")
    );
}

#[test]
fn test_user_overlay_sets_aws_profile() {
    let repo = write(
        RegistryBuilder::new("acme")
            .cluster("prod", &aws_cluster("us-east-1", "prod"))
            .user(
                "sso",
                "kind: User\nprovider: aws\naws:\n  profile: \"{{ .Team }}-admin\"\n",
            )
            .role("ops", "contexts:\n- cluster: prod\n  user: sso\n"),
    );
    let providers = FakeProviders::default();
    let mut entry = entry("ops");
    entry.variables = Variables::from([("Team".to_string(), "platform".to_string())]);
    let mut config = Kubeconfig::new();

    let result = Syncer::new(&providers)
        .sync(repo.path(), &mut entry, &mut config)
        .unwrap();

    assert_eq!(result.added, vec!["prod"]);
    let exec = config.auth_info("prod").unwrap().exec.clone().unwrap();
    assert_eq!(exec.command, "aws");
    assert!(exec
        .env
        .iter()
        .any(|e| e.name == "AWS_PROFILE" && e.value == "platform-admin"));
}

#[test]
fn test_provider_failure_keeps_other_contexts() {
    let repo = write(
        base_registry()
            .cluster("prod", &aws_cluster("us-east-1", "prod"))
            .role("ops", "contexts:\n- cluster: prod\n- cluster: a\n"),
    );
    let providers = FakeProviders::failing(&["prod"]);
    let mut entry = entry("ops");
    let mut config = Kubeconfig::new();

    let result = Syncer::new(&providers)
        .sync(repo.path(), &mut entry, &mut config)
        .unwrap();

    assert_eq!(result.added, vec!["a"]);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("unreachable"));
    assert_eq!(entry.managed_contexts, vec!["a"]);
}
