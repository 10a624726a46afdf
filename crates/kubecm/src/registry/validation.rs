//! Role and variable validation for registries.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::error::{RegistryError, Result};
use super::resource::{NormalizedContext, RegistryMeta, Role};
use super::template::Variables;

// Registry names become directory names under the state root.
static RE_REGISTRY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._-]*$").unwrap());

/// A normalized declaration paired with the context name it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedDeclaration {
    pub name: String,
    pub decl: NormalizedContext,
}

/// Normalizes a role's declarations and checks them.
///
/// Rejects a role with no declarations, a declaration without a cluster
/// reference, and two declarations that end up with the same context name.
pub fn validate_role_contexts(role: &Role) -> Result<Vec<NamedDeclaration>> {
    let invalid = |message: String| RegistryError::InvalidRole {
        role: role.metadata.name.clone(),
        message,
    };

    let decls = role.spec.normalized_contexts();
    if decls.is_empty() {
        return Err(invalid("declares no contexts".to_string()));
    }

    let prefix = role.spec.context_prefix.as_deref();
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    let mut named = Vec::with_capacity(decls.len());

    for (idx, decl) in decls.into_iter().enumerate() {
        if decl.cluster_ref.is_empty() {
            errors.push(format!("context #{} has no cluster reference", idx + 1));
            continue;
        }
        let name = decl.context_name(prefix);
        if !seen.insert(name.clone()) {
            errors.push(format!("duplicate context name '{}'", name));
            continue;
        }
        named.push(NamedDeclaration { name, decl });
    }

    if errors.is_empty() {
        Ok(named)
    } else {
        Err(invalid(errors.join("; ")))
    }
}

/// Fills declared defaults into `provided` and checks required variables.
///
/// Variables the registry does not declare are passed through untouched.
pub fn resolve_variables(meta: &RegistryMeta, provided: &Variables) -> Result<Variables> {
    let mut resolved = provided.clone();
    let mut missing = Vec::new();

    for spec in &meta.spec.variables {
        if resolved.contains_key(&spec.name) {
            continue;
        }
        match &spec.default {
            Some(default) => {
                resolved.insert(spec.name.clone(), default.clone());
            }
            None if spec.required => missing.push(spec.name.clone()),
            None => {}
        }
    }

    if missing.is_empty() {
        Ok(resolved)
    } else {
        Err(RegistryError::MissingVariables(missing))
    }
}

/// Parses a `KEY=VALUE` binding.
pub fn parse_variable(binding: &str) -> Result<(String, String)> {
    match binding.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(RegistryError::InvalidVariable(binding.to_string())),
    }
}

/// Checks a registry name is usable as a directory name.
pub fn validate_registry_name(name: &str) -> Result<()> {
    if RE_REGISTRY_NAME.is_match(name) {
        Ok(())
    } else {
        Err(RegistryError::InvalidName(name.to_string()))
    }
}
