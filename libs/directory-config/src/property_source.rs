use std::collections::HashMap;
use std::sync::Arc;

use figment::Figment;

/// Read-only lookup of a single configuration property by its dotted key.
pub trait PropertySource: Send + Sync {
    /// Get the value of `key`, if any.
    fn property(&self, key: &str) -> Option<String>;
}

impl PropertySource for HashMap<String, String> {
    fn property(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Scalars are returned as strings; maps and sequences are not properties.
impl PropertySource for Figment {
    fn property(&self, key: &str) -> Option<String> {
        let value: serde_json::Value = self.extract_inner(key).ok()?;
        scalar_to_string(value)
    }
}

impl<T: PropertySource + ?Sized> PropertySource for &T {
    fn property(&self, key: &str) -> Option<String> {
        (**self).property(key)
    }
}

impl<T: PropertySource + ?Sized> PropertySource for Arc<T> {
    fn property(&self, key: &str) -> Option<String> {
        (**self).property(key)
    }
}

/// Looks up `key` in the first source, then in the second.
impl<A: PropertySource, B: PropertySource> PropertySource for (A, B) {
    fn property(&self, key: &str) -> Option<String> {
        self.0.property(key).or_else(|| self.1.property(key))
    }
}

/// Process environment variables.
///
/// A dotted key is mapped to its environment variable name by upper-casing
/// it and replacing `.` and `-` with `_`, so `local.directory.port` is read
/// from `LOCAL_DIRECTORY_PORT`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl ProcessEnvironment {
    pub fn variable_name(key: &str) -> String {
        key.chars()
            .map(|c| match c {
                '.' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect()
    }
}

impl PropertySource for ProcessEnvironment {
    fn property(&self, key: &str) -> Option<String> {
        std::env::var(Self::variable_name(key)).ok()
    }
}

/// Render a scalar JSON value as a string. Returns `None` for null, arrays and objects.
pub(crate) fn scalar_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LOCAL_PORT_PROPERTY;
    use figment::providers::{Format, Yaml};

    #[test]
    fn test_variable_name_mapping() {
        assert_eq!(
            ProcessEnvironment::variable_name(LOCAL_PORT_PROPERTY),
            "LOCAL_DIRECTORY_PORT"
        );
        assert_eq!(
            ProcessEnvironment::variable_name("some.kebab-key"),
            "SOME_KEBAB_KEY"
        );
    }

    #[test]
    fn test_process_environment_reads_variable() {
        std::env::set_var("DIRCONF_TEST_PROCESS_ENV_PORT", "4389");
        let env = ProcessEnvironment;
        assert_eq!(
            env.property("dirconf.test.process-env.port").as_deref(),
            Some("4389")
        );
        assert_eq!(env.property("dirconf.test.process-env.unset"), None);
    }

    #[test]
    fn test_figment_scalars() {
        let figment = Figment::new().merge(Yaml::string(
            r#"
local:
  directory:
    port: 10389
    enabled: true
    name: "embedded"
    nested:
      key: value
"#,
        ));

        assert_eq!(figment.property(LOCAL_PORT_PROPERTY).as_deref(), Some("10389"));
        assert_eq!(
            figment.property("local.directory.enabled").as_deref(),
            Some("true")
        );
        assert_eq!(
            figment.property("local.directory.name").as_deref(),
            Some("embedded")
        );
        assert_eq!(figment.property("local.directory.nested"), None);
        assert_eq!(figment.property("local.directory.missing"), None);
    }

    #[test]
    fn test_pair_prefers_first_source() {
        let first = HashMap::from([("a".to_string(), "1".to_string())]);
        let second = HashMap::from([
            ("a".to_string(), "2".to_string()),
            ("b".to_string(), "3".to_string()),
        ]);
        let chain = (&first, &second);

        assert_eq!(chain.property("a").as_deref(), Some("1"));
        assert_eq!(chain.property("b").as_deref(), Some("3"));
        assert_eq!(chain.property("c"), None);
    }
}
