// Language toolchain registry for the judge
use crate::engine::BackendKind;
use anyhow::{bail, Context, Result};
use arbiter_common::types::Language;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// The shipped registry, embedded so the judge works without a config file
const BUILTIN_LANGUAGES: &str = include_str!("../../../config/languages.json");

/// A command with fallback binary names.
///
/// Placeholders substituted at run time: `{source}` (entry file), `{sources}`
/// (every generated file, expands to several arguments), `{binary}` (compiled
/// output path) and `{dir}` (per-invocation workspace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandTemplate {
    pub candidates: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Language identifier understood by the remote service
    pub language: String,
    /// Names under which the remote runtime catalog may list this language
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub name: Language,
    pub source_file: String,
    pub default_backend: BackendKind,
    pub remote: RemoteSettings,
    #[serde(default)]
    pub compile: Option<CommandTemplate>,
    pub run: CommandTemplate,
}

#[derive(Debug, Serialize, Deserialize)]
struct LanguagesJson {
    languages: Vec<LanguageConfig>,
}

/// Language configuration manager
#[derive(Debug, Clone)]
pub struct LanguageConfigManager {
    configs: HashMap<Language, LanguageConfig>,
}

impl LanguageConfigManager {
    /// Load language configurations from a languages.json file
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Language config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        Self::from_json(&content)
    }

    /// Load with default path (config/languages.json)
    pub fn load_default() -> Result<Self> {
        Self::load(Path::new(arbiter_common::config::DEFAULT_LANGUAGES_CONFIG))
    }

    /// Load from `path`, falling back to the embedded registry when the file
    /// does not exist
    pub fn load_or_builtin(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!(
                path = %path.display(),
                "Language config not found, using built-in registry"
            );
            Ok(Self::builtin())
        }
    }

    /// Registry compiled into the binary
    pub fn builtin() -> Self {
        // The embedded file is covered by tests; a broken copy is a build defect.
        Self::from_json(BUILTIN_LANGUAGES).unwrap_or_else(|_| Self {
            configs: HashMap::new(),
        })
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let languages_json: LanguagesJson =
            serde_json::from_str(content).context("Failed to parse languages.json")?;

        let mut configs = HashMap::new();
        for lang in languages_json.languages {
            if lang.run.candidates.is_empty() {
                bail!("Language '{}' has no run command candidates", lang.name);
            }
            configs.insert(lang.name, lang);
        }

        if configs.is_empty() {
            bail!("No languages configured in languages.json");
        }

        Ok(Self { configs })
    }

    /// Get configuration for a specific language
    pub fn get_config(&self, language: &Language) -> Result<&LanguageConfig> {
        self.configs
            .get(language)
            .ok_or_else(|| anyhow::anyhow!("No configuration found for language: {}", language))
    }

    pub fn is_enabled(&self, language: &Language) -> bool {
        self.configs.contains_key(language)
    }

    pub fn default_backend(&self, language: &Language) -> Result<BackendKind> {
        Ok(self.get_config(language)?.default_backend)
    }

    /// Catalog names accepted for `language` when resolving remote versions
    pub fn remote_aliases(&self) -> HashMap<Language, Vec<String>> {
        self.configs
            .iter()
            .map(|(language, config)| {
                let mut names = vec![config.remote.language.to_lowercase()];
                names.extend(config.remote.aliases.iter().map(|a| a.to_lowercase()));
                names.dedup();
                (*language, names)
            })
            .collect()
    }

    /// List all supported languages, in a stable order
    pub fn list_languages(&self) -> Vec<Language> {
        Language::ALL
            .into_iter()
            .filter(|language| self.configs.contains_key(language))
            .collect()
    }
}
