use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use anyhow::{Context, Result};
use serde::{Serialize, Serializer};

use crate::error::DirectoryConfigError;
use crate::property_source::PropertySource;

/// Well-known port of the directory protocol, used when no URL and no local port are configured.
pub const DEFAULT_PORT: u16 = 389;

/// Host used for the fallback URL.
pub const DEFAULT_HOST: &str = "localhost";

/// URL scheme used for the fallback URL.
pub const SCHEME: &str = "ldap";

/// Property carrying a dynamically assigned local port (embedded/test servers).
pub const LOCAL_PORT_PROPERTY: &str = "local.directory.port";

const REDACTED: &str = "***";

/// Connection settings for a directory service client.
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryConfig {
    /// Directory server URLs, e.g. `ldap://host:389`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    urls: Vec<String>,
    /// Base suffix from which all operations should originate.
    #[serde(skip_serializing_if = "Option::is_none")]
    base: Option<String>,
    /// Login user of the directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    /// Login password of the directory.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_redacted"
    )]
    password: Option<String>,
    /// Custom provider environment properties.
    #[serde(rename = "environment")]
    base_environment: HashMap<String, String>,
}

fn serialize_redacted<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(_) => s.serialize_str(REDACTED),
        None => s.serialize_none(),
    }
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("urls", &self.urls)
            .field("base", &self.base)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("base_environment", &self.base_environment)
            .finish()
    }
}

impl DirectoryConfig {
    pub fn builder() -> DirectoryConfigBuilder {
        DirectoryConfigBuilder::default()
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn set_urls(&mut self, urls: Vec<String>) {
        self.urls = urls;
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn set_base(&mut self, base: Option<String>) {
        self.base = base;
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn set_username(&mut self, username: Option<String>) {
        self.username = username;
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn set_password(&mut self, password: Option<String>) {
        self.password = password;
    }

    pub fn base_environment(&self) -> &HashMap<String, String> {
        &self.base_environment
    }

    /// Replace the provider environment. `None` clears it to an empty map.
    pub fn set_base_environment(&mut self, environment: Option<HashMap<String, String>>) {
        self.base_environment = environment.unwrap_or_default();
    }

    /// Returns the URLs to connect to.
    ///
    /// Configured URLs are returned as-is. Without any, a single
    /// `ldap://localhost:<port>` URL is derived, where the port comes from
    /// [`LOCAL_PORT_PROPERTY`] in `source` or falls back to [`DEFAULT_PORT`].
    ///
    /// Fails with [`DirectoryConfigError::InvalidState`] when a fallback is
    /// needed but no `source` is given, and with
    /// [`DirectoryConfigError::Format`] when the local port is not an integer.
    pub fn resolve_urls(
        &self,
        source: Option<&dyn PropertySource>,
    ) -> Result<Cow<'_, [String]>, DirectoryConfigError> {
        if !self.urls.is_empty() {
            return Ok(Cow::Borrowed(&self.urls));
        }
        let port = resolve_port(source)?;
        tracing::debug!(port, "No directory urls configured, using local fallback");
        Ok(Cow::Owned(vec![format!("{SCHEME}://{DEFAULT_HOST}:{port}")]))
    }

    /// Serialize configuration to YAML. The password is redacted.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize directory config to YAML")
    }
}

/// The local port is any 32-bit integer; range checks are left to the client.
fn resolve_port(source: Option<&dyn PropertySource>) -> Result<i32, DirectoryConfigError> {
    let source = source.ok_or(DirectoryConfigError::InvalidState(
        "No local directory port configured",
    ))?;
    match source.property(LOCAL_PORT_PROPERTY) {
        Some(value) => value
            .parse::<i32>()
            .map_err(|source| DirectoryConfigError::Format {
                key: LOCAL_PORT_PROPERTY.to_string(),
                value,
                source,
            }),
        None => Ok(i32::from(DEFAULT_PORT)),
    }
}

/// Builder for [`DirectoryConfig`].
#[derive(Debug, Default)]
pub struct DirectoryConfigBuilder {
    inner: DirectoryConfig,
}

impl DirectoryConfigBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.inner.urls.push(url.into());
        self
    }

    pub fn urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.urls.extend(urls.into_iter().map(Into::into));
        self
    }

    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.inner.base = Some(base.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.inner.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.inner.password = Some(password.into());
        self
    }

    pub fn environment_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.base_environment.insert(key.into(), value.into());
        self
    }

    pub fn base_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.inner.base_environment.extend(environment);
        self
    }

    pub fn build(self) -> DirectoryConfig {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port_source(port: &str) -> HashMap<String, String> {
        HashMap::from([(LOCAL_PORT_PROPERTY.to_string(), port.to_string())])
    }

    #[test]
    fn test_default_config() {
        let config = DirectoryConfig::default();
        assert!(config.urls().is_empty());
        assert_eq!(config.base(), None);
        assert_eq!(config.username(), None);
        assert_eq!(config.password(), None);
        assert!(config.base_environment().is_empty());
    }

    #[test]
    fn test_configured_urls_are_returned_unchanged() {
        let config = DirectoryConfig::builder()
            .url("ldap://a.example.org:389")
            .url("ldaps://b.example.org:636")
            .build();
        let source = port_source("10389");

        let urls = config.resolve_urls(Some(&source)).unwrap();
        assert!(matches!(urls, Cow::Borrowed(_)));
        assert_eq!(
            urls.as_ref(),
            ["ldap://a.example.org:389", "ldaps://b.example.org:636"]
        );
    }

    #[test]
    fn test_configured_urls_do_not_need_a_source() {
        let config = DirectoryConfig::builder().url("ldap://a:1").build();
        let urls = config.resolve_urls(None).unwrap();
        assert_eq!(urls.as_ref(), ["ldap://a:1"]);
    }

    #[test]
    fn test_fallback_uses_default_port() {
        let config = DirectoryConfig::default();
        let source = HashMap::<String, String>::new();
        let urls = config.resolve_urls(Some(&source)).unwrap();
        assert_eq!(urls.as_ref(), ["ldap://localhost:389"]);
    }

    #[test]
    fn test_fallback_uses_local_port() {
        let config = DirectoryConfig::default();
        let urls = config.resolve_urls(Some(&port_source("10389"))).unwrap();
        assert_eq!(urls.as_ref(), ["ldap://localhost:10389"]);
    }

    #[test]
    fn test_fallback_rejects_malformed_port() {
        let config = DirectoryConfig::default();
        let err = config
            .resolve_urls(Some(&port_source("notanumber")))
            .unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("notanumber"));
        assert!(err.to_string().contains(LOCAL_PORT_PROPERTY));
    }

    #[test]
    fn test_fallback_accepts_any_integer_port() {
        let config = DirectoryConfig::default();
        for (port, expected) in [
            ("70000", "ldap://localhost:70000"),
            ("-1", "ldap://localhost:-1"),
            ("+10389", "ldap://localhost:10389"),
            ("2147483647", "ldap://localhost:2147483647"),
        ] {
            let urls = config.resolve_urls(Some(&port_source(port))).unwrap();
            assert_eq!(urls.as_ref(), [expected]);
        }
    }

    #[test]
    fn test_fallback_rejects_port_beyond_integer_range() {
        let config = DirectoryConfig::default();
        for port in ["2147483648", " 389", ""] {
            let err = config.resolve_urls(Some(&port_source(port))).unwrap_err();
            assert!(err.is_format(), "{port:?} should not parse");
        }
    }

    #[test]
    fn test_fallback_requires_source() {
        let err = DirectoryConfig::default().resolve_urls(None).unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(err.to_string(), "No local directory port configured");
    }

    #[test]
    fn test_set_base_environment_none_yields_empty_map() {
        let mut config = DirectoryConfig::builder()
            .environment_entry("java.naming.referral", "follow")
            .build();
        assert_eq!(config.base_environment().len(), 1);

        config.set_base_environment(None);
        assert!(config.base_environment().is_empty());
    }

    #[test]
    fn test_setters() {
        let mut config = DirectoryConfig::default();
        config.set_urls(vec!["ldap://x:389".to_string()]);
        config.set_base(Some("dc=example,dc=org".to_string()));
        config.set_username(Some("cn=admin".to_string()));
        config.set_password(Some("secret".to_string()));

        assert_eq!(config.urls(), ["ldap://x:389"]);
        assert_eq!(config.base(), Some("dc=example,dc=org"));
        assert_eq!(config.username(), Some("cn=admin"));
        assert_eq!(config.password(), Some("secret"));
    }

    #[test]
    fn test_password_is_redacted() {
        let config = DirectoryConfig::builder()
            .username("cn=admin")
            .password("s3cr3t")
            .build();

        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("***"));

        let yaml = config.to_yaml().unwrap();
        assert!(!yaml.contains("s3cr3t"));
        assert!(yaml.contains("password: '***'") || yaml.contains("password: \"***\""));
        assert!(yaml.contains("username: cn=admin"));
    }
}
