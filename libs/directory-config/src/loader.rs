use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Format, Serialized, Yaml},
    value::{Dict, Map},
    Figment, Metadata, Profile, Provider,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::DirectoryConfig;
use crate::property_source::{scalar_to_string, ProcessEnvironment};

/// Key prefix of the directory section.
pub const CONFIG_PREFIX: &str = "directory";

/// Prefix of environment overrides, e.g. `APP__DIRECTORY__BASE` maps to `directory.base`.
pub const ENV_PREFIX: &str = "APP__";

/// `urls` may be given as a list or as one comma-separated string.
#[derive(Deserialize)]
#[serde(untagged)]
enum UrlList {
    Many(Vec<String>),
    Joined(String),
}

impl UrlList {
    fn into_vec(self) -> Vec<String> {
        let raw = match self {
            UrlList::Many(urls) => urls,
            UrlList::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect()
    }
}

/// Builds a [`DirectoryConfig`] from layered configuration sources.
///
/// Sources are merged in order (defaults, then YAML file, then environment),
/// and [`load`](Self::load) reads each key of the `directory` section by name.
#[derive(Debug, Clone)]
pub struct DirectoryConfigLoader {
    figment: Figment,
}

impl Default for DirectoryConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryConfigLoader {
    /// Loader holding only the built-in defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::new().merge(Serialized::default(
                CONFIG_PREFIX,
                DirectoryConfig::default(),
            )),
        }
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    /// Standard layering: defaults → YAML file (if given) → `APP__*` environment.
    pub fn layered<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        let mut loader = Self::new();
        if let Some(path) = config_path {
            loader = loader.merge_file(path)?;
        }
        Ok(loader.merge_env(ENV_PREFIX))
    }

    /// Merge a YAML file. The file must exist.
    pub fn merge_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("Config file not found: {}", path.display());
        }
        tracing::info!(path = %path.display(), "Loading directory configuration file");
        Ok(Self {
            figment: self.figment.merge(Yaml::file(path)),
        })
    }

    /// Merge environment variables starting with `prefix`; `__` separates key levels.
    pub fn merge_env(self, prefix: &str) -> Self {
        Self {
            figment: self.figment.merge(RawEnv::prefixed(prefix)),
        }
    }

    pub fn figment(&self) -> &Figment {
        &self.figment
    }

    /// Source for [`DirectoryConfig::resolve_urls`]: process environment
    /// variables first, then the merged configuration.
    pub fn port_source(&self) -> (ProcessEnvironment, &Figment) {
        (ProcessEnvironment, &self.figment)
    }

    /// Read the `directory` section key by key and build the configuration.
    pub fn load(&self) -> Result<DirectoryConfig> {
        let mut builder = DirectoryConfig::builder();

        if let Some(urls) = self.optional::<UrlList>("urls")? {
            builder = builder.urls(urls.into_vec());
        }
        if let Some(base) = self.optional_string("base")? {
            builder = builder.base(base);
        }
        if let Some(username) = self.optional_string("username")? {
            builder = builder.username(username);
        }
        if let Some(raw) = self.optional_string("password")? {
            let password = resolve_secret(&raw)
                .with_context(|| format!("Failed to resolve '{CONFIG_PREFIX}.password'"))?;
            builder = builder.password(password);
        }
        if let Some(entries) =
            self.optional::<Option<HashMap<String, serde_json::Value>>>("environment")?
        {
            builder = builder.base_environment(environment_entries(entries.unwrap_or_default())?);
        }

        let config = builder.build();
        tracing::debug!(
            urls = config.urls().len(),
            has_base = config.base().is_some(),
            has_username = config.username().is_some(),
            has_password = config.password().is_some(),
            environment_entries = config.base_environment().len(),
            "Loaded directory configuration"
        );
        Ok(config)
    }

    /// Extract `directory.<name>`. A missing key yields `Ok(None)`.
    fn optional<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let key = format!("{CONFIG_PREFIX}.{name}");
        match self.figment.extract_inner::<T>(&key) {
            Err(e) if e.missing() => Ok(None),
            other => other
                .map(Some)
                .with_context(|| format!("Invalid value for '{key}'")),
        }
    }

    /// Extract `directory.<name>` as a string. YAML numbers and booleans are
    /// accepted and rendered as text.
    fn optional_string(&self, name: &str) -> Result<Option<String>> {
        match self.optional::<serde_json::Value>(name)? {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => match scalar_to_string(value) {
                Some(s) => Ok(Some(s)),
                None => bail!("'{CONFIG_PREFIX}.{name}' must be a string"),
            },
        }
    }
}

impl DirectoryConfig {
    /// Load with [`DirectoryConfigLoader::layered`]. Without a path only
    /// defaults and environment overrides apply.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        DirectoryConfigLoader::layered(config_path)?.load()
    }
}

fn environment_entries(
    entries: HashMap<String, serde_json::Value>,
) -> Result<HashMap<String, String>> {
    entries
        .into_iter()
        .map(|(key, value)| match scalar_to_string(value) {
            Some(value) => Ok((key, value)),
            None => bail!("'{CONFIG_PREFIX}.environment.{key}' must be a scalar value"),
        })
        .collect()
}

/// Environment variables under a prefix, with values kept as the raw text.
///
/// `PREFIX__DIRECTORY__PASSWORD=0123` becomes `directory.password = "0123"`;
/// key segments are lower-cased, values are never parsed into numbers.
#[derive(Debug, Clone)]
pub struct RawEnv {
    prefix: String,
}

impl RawEnv {
    pub fn prefixed(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    fn collect(&self, vars: impl IntoIterator<Item = (String, String)>) -> serde_json::Value {
        let mut root = serde_json::Map::new();
        for (name, value) in vars {
            let Some(rest) = strip_prefix_ignore_case(&name, &self.prefix) else {
                continue;
            };
            let rest = rest.to_ascii_lowercase();
            let path: Vec<&str> = rest.split("__").filter(|s| !s.is_empty()).collect();
            if !path.is_empty() {
                insert_nested(&mut root, &path, value);
            }
        }
        serde_json::Value::Object(root)
    }
}

impl Provider for RawEnv {
    fn metadata(&self) -> Metadata {
        Metadata::named(format!("`{}` environment variable(s)", self.prefix))
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        // Non-UTF-8 variables cannot name or hold a setting.
        let vars = std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)));
        Serialized::defaults(self.collect(vars)).data()
    }
}

fn strip_prefix_ignore_case<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let head = name.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &name[prefix.len()..])
}

fn insert_nested(map: &mut serde_json::Map<String, serde_json::Value>, path: &[&str], value: String) {
    let (last, parents) = match path.split_last() {
        Some(split) => split,
        None => return,
    };
    let mut current = map;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        if !entry.is_object() {
            *entry = serde_json::Value::Object(serde_json::Map::new());
        }
        current = match entry {
            serde_json::Value::Object(next) => next,
            _ => return,
        };
    }
    current.insert(last.to_string(), serde_json::Value::String(value));
}

/// Resolves a secret: `${VAR}` is read from the environment variable `VAR`,
/// anything else is returned as-is.
pub fn resolve_secret(raw: &str) -> Result<String> {
    match raw.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        Some(var_name) => std::env::var(var_name)
            .with_context(|| format!("Environment variable '{var_name}' not found for password")),
        None => Ok(raw.to_string()),
    }
}
