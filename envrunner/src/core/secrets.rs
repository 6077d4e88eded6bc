//! Secret segregation between the state artifact and the secret artifact.
//!
//! Declared secret fields are moved out of the state tree into a flat map
//! keyed `component.field` and replaced in place by a `{{component.field}}`
//! token. Loading reverses the substitution.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::core::types::EnvState;

/// Keys stored in plaintext unless the settings file overrides the table.
///
/// These are identifiers that other tooling reads back without a key.
pub const DEFAULT_EXEMPT_KEYS: &[&str] = &[
    "solution.teamsAppTenantId",
    "fx-resource-aad-app-for-teams.clientId",
    "fx-resource-aad-app-for-teams.objectId",
    "fx-resource-bot.botId",
];

/// Flat `component.field` → value map (plaintext or ciphertext).
pub type SecretMap = BTreeMap<String, String>;

/// Canonical key shared by a secret's token and its secret-map entry.
pub fn secret_key(component: &str, field: &str) -> String {
    format!("{component}.{field}")
}

/// Placeholder written into the state artifact in place of a secret.
pub fn secret_token(key: &str) -> String {
    format!("{{{{{key}}}}}")
}

/// Deterministic, key-only decision of which secrets are stored encrypted.
///
/// Save and load consult the same policy, so an exempt key is never passed
/// to `decrypt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionPolicy {
    exempt: BTreeSet<String>,
}

impl EncryptionPolicy {
    pub fn new<I, S>(exempt: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exempt: exempt.into_iter().map(Into::into).collect(),
        }
    }

    /// Policy that encrypts every secret.
    pub fn encrypt_all() -> Self {
        Self {
            exempt: BTreeSet::new(),
        }
    }

    pub fn needs_encryption(&self, key: &str) -> bool {
        !self.exempt.contains(key)
    }
}

impl Default for EncryptionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EXEMPT_KEYS.iter().copied())
    }
}

/// Move every declared secret field of `state` into the returned map and
/// replace it with its token.
///
/// Absent fields are skipped. A field that already holds its own token is
/// left alone (its secret was never loaded). Non-string secret values are
/// rejected so the reload cannot change their type.
pub fn separate_secrets(state: &mut EnvState) -> Result<SecretMap, String> {
    let mut secrets = SecretMap::new();
    let declared = declared_secret_fields(state);

    for (component, fields) in declared {
        let target = state.component_mut(&component);
        for field in fields {
            let key = secret_key(&component, &field);
            let token = secret_token(&key);
            let Some(value) = target.get(&field) else {
                continue;
            };
            check_secret_key(&key)?;
            let plaintext = match value {
                Value::String(s) if *s == token => continue,
                Value::String(s) => s.clone(),
                other => {
                    return Err(format!(
                        "secret field '{key}' must be a string, found {}",
                        json_type(other)
                    ));
                }
            };
            secrets.insert(key, plaintext);
            target.insert(field, Value::String(token));
        }
    }

    Ok(secrets)
}

/// Text shown in place of a secret value.
pub const MASK: &str = "********";

/// Overwrite every present declared secret field with [`MASK`].
pub fn mask_secrets(state: &mut EnvState) {
    for (component, fields) in declared_secret_fields(state) {
        let target = state.component_mut(&component);
        for field in fields {
            if let Some(value) = target.get_mut(&field) {
                *value = Value::String(MASK.to_string());
            }
        }
    }
}

/// Put secret values back into the declared fields that hold their own
/// token.
///
/// Only a field listed in its component's `secretFields` whose value equals
/// `{{component.field}}` is restored. Returns the keys whose token had no
/// entry in `secrets`, sorted.
pub fn restore_secrets(state: &mut EnvState, secrets: &SecretMap) -> Vec<String> {
    let mut unresolved = BTreeSet::new();
    for (component, fields) in declared_secret_fields(state) {
        let target = state.component_mut(&component);
        for field in fields {
            let key = secret_key(&component, &field);
            let Some(Value::String(value)) = target.get_mut(&field) else {
                continue;
            };
            if *value != secret_token(&key) {
                continue;
            }
            match secrets.get(&key) {
                Some(secret) => value.clone_from(secret),
                None => {
                    unresolved.insert(key);
                }
            }
        }
    }
    unresolved.into_iter().collect()
}

fn declared_secret_fields(state: &EnvState) -> Vec<(String, Vec<String>)> {
    state
        .components()
        .map(|(name, _)| (name.clone(), state.secret_fields(name)))
        .filter(|(_, fields)| !fields.is_empty())
        .collect()
}

/// Keys must survive the `key=value` line format of the secret artifact.
fn check_secret_key(key: &str) -> Result<(), String> {
    if key.contains(['=', '\n', '\r']) || key.starts_with('#') || key.trim() != key {
        return Err(format!(
            "secret field '{}' cannot be stored in the secret artifact",
            key.escape_debug()
        ));
    }
    Ok(())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(value: Value) -> EnvState {
        serde_json::from_value(value).expect("state")
    }

    #[test]
    fn mask_hides_declared_fields_only() {
        let mut s = state(json!({
            "bot": { "botId": "b1", "botPassword": "p@ss", "secretFields": ["botPassword", "absent"] }
        }));

        mask_secrets(&mut s);

        let bot = s.component("bot").expect("bot");
        assert_eq!(bot["botPassword"], json!(MASK));
        assert_eq!(bot["botId"], json!("b1"));
        assert!(bot.get("absent").is_none());
    }

    #[test]
    fn token_and_key_share_canonical_name() {
        let key = secret_key("bot", "botPassword");
        assert_eq!(key, "bot.botPassword");
        assert_eq!(secret_token(&key), "{{bot.botPassword}}");
    }

    #[test]
    fn separate_replaces_declared_fields_with_tokens() {
        let mut s = state(json!({
            "bot": { "botId": "b1", "botPassword": "p@ss", "secretFields": ["botPassword"] },
            "aad": { "clientId": "abc" }
        }));

        let secrets = separate_secrets(&mut s).expect("separate");

        assert_eq!(secrets.get("bot.botPassword").map(String::as_str), Some("p@ss"));
        assert_eq!(secrets.len(), 1);
        let bot = s.component("bot").expect("bot");
        assert_eq!(bot["botPassword"], json!("{{bot.botPassword}}"));
        assert_eq!(bot["botId"], json!("b1"));
        assert_eq!(s.component("aad").expect("aad")["clientId"], json!("abc"));
    }

    #[test]
    fn separate_skips_absent_and_already_tokenized_fields() {
        let mut s = state(json!({
            "bot": {
                "botPassword": "{{bot.botPassword}}",
                "secretFields": ["botPassword", "missing"]
            }
        }));

        let secrets = separate_secrets(&mut s).expect("separate");

        assert!(secrets.is_empty());
        assert!(s.component("bot").expect("bot").get("missing").is_none());
    }

    #[test]
    fn separate_rejects_non_string_secret() {
        let mut s = state(json!({
            "sql": { "adminPassword": 42, "secretFields": ["adminPassword"] }
        }));

        let err = separate_secrets(&mut s).unwrap_err();
        assert!(err.contains("sql.adminPassword"));
        assert!(err.contains("number"));
    }

    #[test]
    fn restore_reverses_separate() {
        let original = state(json!({
            "bot": { "botPassword": "p@ss", "secretFields": ["botPassword"] },
            "aad": { "clientSecret": "s3cret", "secretFields": ["clientSecret"] }
        }));
        let mut s = original.clone();
        let secrets = separate_secrets(&mut s).expect("separate");

        let unresolved = restore_secrets(&mut s, &secrets);

        assert!(unresolved.is_empty());
        assert_eq!(s, original);
    }

    #[test]
    fn restore_reports_unknown_tokens_and_leaves_them() {
        let mut s = state(json!({
            "bot": {
                "botPassword": "{{bot.botPassword}}",
                "note": "{{ not a token }}",
                "secretFields": ["botPassword"]
            }
        }));

        let unresolved = restore_secrets(&mut s, &SecretMap::new());

        assert_eq!(unresolved, vec!["bot.botPassword".to_string()]);
        assert_eq!(
            s.component("bot").expect("bot")["botPassword"],
            json!("{{bot.botPassword}}")
        );
    }

    #[test]
    fn restore_handles_field_names_with_spaces_and_braces() {
        let original = state(json!({
            "bot": {
                "bot password": "p@ss",
                "{odd}": "x y",
                "secretFields": ["bot password", "{odd}"]
            }
        }));
        let mut s = original.clone();
        let secrets = separate_secrets(&mut s).expect("separate");
        assert_eq!(secrets.len(), 2);

        let unresolved = restore_secrets(&mut s, &secrets);

        assert!(unresolved.is_empty());
        assert_eq!(s, original);
        let mut again = s.clone();
        assert_eq!(separate_secrets(&mut again).expect("separate again"), secrets);
    }

    #[test]
    fn restore_ignores_tokens_outside_declared_fields() {
        let mut s = state(json!({
            "bot": { "botPassword": "{{bot.botPassword}}", "secretFields": ["botPassword"] },
            "docs": { "example": "{{bot.botPassword}}" }
        }));
        let secrets: SecretMap = [("bot.botPassword".to_string(), "p@ss".to_string())]
            .into_iter()
            .collect();

        restore_secrets(&mut s, &secrets);

        assert_eq!(s.component("bot").expect("bot")["botPassword"], json!("p@ss"));
        assert_eq!(
            s.component("docs").expect("docs")["example"],
            json!("{{bot.botPassword}}")
        );
    }

    #[test]
    fn separate_rejects_keys_the_secret_artifact_cannot_hold() {
        for field in ["a=b", "line\nbreak", "padded "] {
            let mut s = state(json!({ "bot": { field: "v", "secretFields": [field] } }));
            let err = separate_secrets(&mut s).unwrap_err();
            assert!(err.contains("cannot be stored"), "{err}");
        }
    }

    #[test]
    fn policy_exempts_only_listed_keys() {
        let policy = EncryptionPolicy::new(["aad.clientId"]);
        assert!(!policy.needs_encryption("aad.clientId"));
        assert!(policy.needs_encryption("aad.clientSecret"));
        assert!(EncryptionPolicy::encrypt_all().needs_encryption("fx-resource-bot.botId"));
        assert!(!EncryptionPolicy::default().needs_encryption("fx-resource-bot.botId"));
    }
}
