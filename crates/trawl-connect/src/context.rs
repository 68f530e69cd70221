//! Run context for entity imports
//!
//! An [`EntityContext`] carries what the orchestrator decides per run: the
//! entity name, the run mode (full vs delta) and a set of named variables
//! available for token substitution in command templates and field hints.
//!
//! ## Token substitution
//!
//! Templates may contain `${name}` tokens. A token resolves against the
//! current row first, then against the context variables; an unresolvable
//! token becomes the empty string.
//!
//! ```rust
//! use trawl_connect::context::{EntityContext, RunMode};
//!
//! let ctx = EntityContext::new("orders", RunMode::Delta)
//!     .with_variable("lastRun", "2024-06-01T00:00:00Z");
//!
//! let resolved = ctx.resolve_tokens(r#"{"modifiedtime": {"$gt": "${lastRun}"}}"#, None);
//! assert_eq!(resolved, r#"{"modifiedtime": {"$gt": "2024-06-01T00:00:00Z"}}"#);
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

use trawl_docstore::Row;

/// Pre-compiled regex for token extraction
static TOKEN_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)\}")
        .expect("token regex pattern is invalid - this is a bug")
});

/// Import run mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Full import: every document matching the primary command
    #[default]
    Full,
    /// Incremental import: only changed documents, via the delta command
    Delta,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Delta => write!(f, "delta"),
        }
    }
}

/// Per-run context handed to an entity processor
#[derive(Debug, Clone)]
pub struct EntityContext {
    /// Entity name, used in logs and errors
    pub name: String,
    /// Selected run mode
    pub mode: RunMode,
    /// Named variables available to token substitution
    pub variables: HashMap<String, String>,
}

impl EntityContext {
    /// Create a context for the given entity and mode
    pub fn new(name: impl Into<String>, mode: RunMode) -> Self {
        Self {
            name: name.into(),
            mode,
            variables: HashMap::new(),
        }
    }

    /// Add a substitution variable
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Look up a substitution variable
    pub fn var(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(|s| s.as_str())
    }

    /// Substitute `${name}` tokens in a template
    ///
    /// Row fields shadow context variables; a token matching neither becomes
    /// the empty string.
    pub fn resolve_tokens(&self, template: &str, row: Option<&Row>) -> String {
        if !template.contains("${") {
            return template.to_string();
        }

        TOKEN_REGEX
            .replace_all(template, |caps: &regex::Captures| {
                let name = &caps[1];

                if let Some(value) = row.and_then(|r| r.get(name)) {
                    return value_to_text(value);
                }
                if let Some(value) = self.variables.get(name) {
                    return value.clone();
                }

                tracing::debug!(token = name, "unresolved token, substituting empty string");
                String::new()
            })
            .to_string()
    }
}

/// Render a row value as text
///
/// Strings render without quotes; everything else uses its JSON form. Token
/// substitution and identifier hashing share this canonical form.
pub(crate) fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
