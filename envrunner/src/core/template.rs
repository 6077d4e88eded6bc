//! `${env.VAR}` expansion of config text.
//!
//! Expansion is textual and runs before JSON parsing, so a substituted value
//! can make the document invalid JSON. Callers report that as a parse error.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{env\.([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex")
});

/// Key-value source used to resolve placeholders.
pub trait TemplateSource {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Resolves placeholders from the current process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl TemplateSource for ProcessEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl TemplateSource for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl TemplateSource for BTreeMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Replace every `${env.VAR}` in `text`. Unset variables expand to "".
pub fn expand_env_placeholders<S: TemplateSource + ?Sized>(text: &str, source: &S) -> String {
    PLACEHOLDER_RE
        .replace_all(text, |caps: &Captures<'_>| {
            source.lookup(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}
