//! INI-style configuration: `[Section]` headers, `key = value` pairs, `#`
//! comments. Keys before the first section are globals.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error reading config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid value {value:?} for [{section}] {key}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
}

#[derive(Debug, Default)]
pub struct Config {
    pub globals: HashMap<String, String>,
    pub sections: HashMap<String, HashMap<String, String>>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut globals = HashMap::new();
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current_section: Option<String> = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                current_section = Some(name.trim().to_string());
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim().to_string();
                let value = value.trim().trim_matches('"').to_string();

                match &current_section {
                    None => {
                        globals.insert(key, value);
                    }
                    Some(sec) => {
                        sections.entry(sec.clone()).or_default().insert(key, value);
                    }
                }
            }
        }
        Config { globals, sections }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|sec| sec.get(key))
            .map(String::as_str)
    }

    #[must_use]
    pub fn get_non_empty(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn get_global(&self, key: &str) -> Option<&str> {
        self.globals.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn get_or_default<'a>(&'a self, section: &str, key: &str, default: &'a str) -> &'a str {
        self.get_non_empty(section, key)
            .or_else(|| self.get_global(key).filter(|s| !s.is_empty()))
            .unwrap_or(default)
    }

    /// Parse a non-empty value; absent keys give `Ok(None)`.
    pub fn get_parsed<T: FromStr>(&self, section: &str, key: &str) -> Result<Option<T>, ConfigError> {
        let Some(raw) = self.get_non_empty(section, key) else {
            return Ok(None);
        };
        raw.parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                section: section.to_string(),
                key: key.to_string(),
                value: raw.to_string(),
            })
    }

    /// `true/yes/on/1` and `false/no/off/0`, case-insensitive.
    #[must_use]
    pub fn get_bool(&self, section: &str, key: &str) -> Option<bool> {
        match self.get_non_empty(section, key)?.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    const SAMPLE: &str = r#"
# quickim server
store_dir = /tmp/global

[Server]
bind_addr = "127.0.0.1:7000"
pbkdf2_iterations = 5000
store_dir =

[Logging]
stderr = off
"#;

    #[test]
    fn sections_and_globals_are_parsed() {
        let cfg = Config::parse(SAMPLE);
        assert_eq!(cfg.get("Server", "bind_addr"), Some("127.0.0.1:7000"));
        assert_eq!(cfg.get_global("store_dir"), Some("/tmp/global"));
        assert_eq!(cfg.get("Server", "missing"), None);
    }

    #[test]
    fn empty_section_value_falls_back_to_global_then_default() {
        let cfg = Config::parse(SAMPLE);
        assert_eq!(cfg.get_or_default("Server", "store_dir", "data"), "/tmp/global");
        assert_eq!(cfg.get_or_default("Server", "nope", "data"), "data");
    }

    #[test]
    fn typed_lookups() {
        let cfg = Config::parse(SAMPLE);
        assert_eq!(cfg.get_parsed::<u32>("Server", "pbkdf2_iterations").unwrap(), Some(5000));
        assert_eq!(cfg.get_parsed::<u32>("Server", "absent").unwrap(), None);
        assert!(matches!(
            cfg.get_parsed::<u32>("Server", "bind_addr"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(cfg.get_bool("Logging", "stderr"), Some(false));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = Config::load("/definitely/not/here.ini").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
