//! Environment overrides
//!
//! Credentials for the Elasticsearch sink are normally kept out of config
//! files. These variables override the `[sinks.elasticsearch]` section:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `ES_HOST` | `url` |
//! | `ES_USER` | `username` |
//! | `ES_PASS` | `password` |
//! | `ES_INDEX` | `index` |
//! | `ES_ENABLED` | `enabled` (`true` / anything else) |

use crate::Config;

pub const ES_HOST: &str = "ES_HOST";
pub const ES_USER: &str = "ES_USER";
pub const ES_PASS: &str = "ES_PASS";
pub const ES_INDEX: &str = "ES_INDEX";
pub const ES_ENABLED: &str = "ES_ENABLED";

/// Apply overrides from the process environment
pub fn apply_process_env(config: &mut Config) {
    apply_env_with(config, |key| std::env::var(key).ok());
}

/// Apply overrides using a custom lookup (used by tests)
pub fn apply_env_with<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let es = &mut config.sinks.elasticsearch;

    if let Some(url) = lookup(ES_HOST) {
        es.url = url;
    }
    if let Some(user) = lookup(ES_USER) {
        es.username = user;
    }
    if let Some(pass) = lookup(ES_PASS) {
        es.password = Some(pass);
    }
    if let Some(index) = lookup(ES_INDEX) {
        es.index = index;
    }
    if let Some(enabled) = lookup(ES_ENABLED) {
        es.enabled = enabled.trim().eq_ignore_ascii_case("true");
        tracing::debug!(enabled = es.enabled, "elasticsearch sink toggled from environment");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_overrides_applied() {
        let vars: HashMap<&str, &str> = [
            (ES_HOST, "http://es.local:9200"),
            (ES_USER, "ingest"),
            (ES_PASS, "hunter2"),
            (ES_INDEX, "muons"),
            (ES_ENABLED, "TRUE"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_with(&mut config, |k| vars.get(k).map(|v| (*v).to_string()));

        let es = &config.sinks.elasticsearch;
        assert!(es.enabled);
        assert_eq!(es.url, "http://es.local:9200");
        assert_eq!(es.username, "ingest");
        assert_eq!(es.password.as_deref(), Some("hunter2"));
        assert_eq!(es.index, "muons");
    }

    #[test]
    fn test_missing_vars_leave_config() {
        let mut config = Config::default();
        apply_env_with(&mut config, |_| None);

        let es = &config.sinks.elasticsearch;
        assert!(!es.enabled);
        assert_eq!(es.url, "https://localhost:9200");
        assert!(es.password.is_none());
    }

    #[test]
    fn test_enabled_false_values() {
        for value in ["false", "0", "yes", ""] {
            let mut config = Config::default();
            config.sinks.elasticsearch.enabled = true;
            apply_env_with(&mut config, |k| (k == ES_ENABLED).then(|| value.to_string()));
            assert!(!config.sinks.elasticsearch.enabled, "value {value:?}");
        }
    }
}
