//! `{{ .Name }}` substitution for registry definitions.
//!
//! Only plain field references are understood. An empty variable map turns
//! rendering into a no-op that returns the input verbatim, so registries
//! without variables may carry literal `{{ }}` text.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static RE_ACTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{(.*?)\}\}").unwrap());

static RE_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\s*\.([A-Za-z_][A-Za-z0-9_]*)\s*-?$").unwrap());

/// Variable bindings, name to value.
pub type Variables = BTreeMap<String, String>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("map has no entry for key \"{0}\"")]
    MissingKey(String),

    #[error("unsupported template action \"{{{{{0}}}}}\"")]
    UnsupportedAction(String),

    #[error("unclosed action starting at byte {0}")]
    Unterminated(usize),
}

/// Substitutes `{{ .Name }}` placeholders in `text`.
pub fn resolve_template(text: &str, vars: &Variables) -> Result<String, TemplateError> {
    if vars.is_empty() {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in RE_ACTION.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        check_closed(&text[last..whole.start()], last)?;
        out.push_str(&text[last..whole.start()]);

        let action = &caps[1];
        let field = RE_FIELD
            .captures(action)
            .ok_or_else(|| TemplateError::UnsupportedAction(action.to_string()))?;
        let key = &field[1];
        let value = vars
            .get(key)
            .ok_or_else(|| TemplateError::MissingKey(key.to_string()))?;
        out.push_str(value);

        last = whole.end();
    }

    check_closed(&text[last..], last)?;
    out.push_str(&text[last..]);
    Ok(out)
}

fn check_closed(segment: &str, offset: usize) -> Result<(), TemplateError> {
    match segment.find("{{") {
        Some(pos) => Err(TemplateError::Unterminated(offset + pos)),
        None => Ok(()),
    }
}

/// Renders an optional field in place.
pub(crate) fn render_opt(
    value: &Option<String>,
    vars: &Variables,
) -> Result<Option<String>, TemplateError> {
    value
        .as_deref()
        .map(|v| resolve_template(v, vars))
        .transpose()
}

/// Types whose string fields are templated before use.
pub trait Render: Sized {
    fn render(&self, vars: &Variables) -> Result<Self, TemplateError>;
}
