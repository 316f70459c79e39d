// Environment-driven judge configuration

use crate::types::Language;
use std::collections::HashMap;

pub const DEFAULT_PISTON_URL: &str = "https://emkc.org/api/v2/piston";
pub const DEFAULT_LANGUAGES_CONFIG: &str = "config/languages.json";

#[derive(Debug, Clone, PartialEq)]
pub struct JudgeConfig {
    /// Base URL of the remote compile-and-run service
    pub piston_url: String,
    /// Forced runtime versions, bypassing the remote catalog
    pub version_overrides: HashMap<Language, String>,
    /// Per test case budget when the caller does not give one
    pub default_time_limit_ms: u64,
    pub local_compile_timeout_ms: u64,
    pub remote_compile_timeout_ms: u64,
    pub catalog_timeout_ms: u64,
    pub max_parallel_tests: usize,
    pub languages_config: String,
    pub api_addr: String,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            piston_url: DEFAULT_PISTON_URL.to_string(),
            version_overrides: HashMap::new(),
            default_time_limit_ms: 5000,
            local_compile_timeout_ms: 15_000,
            remote_compile_timeout_ms: 10_000,
            catalog_timeout_ms: 8000,
            max_parallel_tests: 1,
            languages_config: DEFAULT_LANGUAGES_CONFIG.to_string(),
            api_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl JudgeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparsable numbers fall back to
    /// the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let number = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        let mut version_overrides = HashMap::new();
        for language in Language::ALL {
            let key = format!("PISTON_{}_VERSION", language.as_str().to_uppercase());
            if let Some(version) = lookup(&key).filter(|v| !v.trim().is_empty()) {
                version_overrides.insert(language, version.trim().to_string());
            }
        }

        Self {
            piston_url: lookup("PISTON_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.piston_url),
            version_overrides,
            default_time_limit_ms: number("JUDGE_TIME_LIMIT_MS", defaults.default_time_limit_ms),
            local_compile_timeout_ms: number(
                "JUDGE_COMPILE_TIMEOUT_MS",
                defaults.local_compile_timeout_ms,
            ),
            remote_compile_timeout_ms: number(
                "JUDGE_REMOTE_COMPILE_TIMEOUT_MS",
                defaults.remote_compile_timeout_ms,
            ),
            catalog_timeout_ms: number("JUDGE_CATALOG_TIMEOUT_MS", defaults.catalog_timeout_ms),
            max_parallel_tests: number("JUDGE_MAX_PARALLEL_TESTS", 1).max(1) as usize,
            languages_config: lookup("LANGUAGES_CONFIG").unwrap_or(defaults.languages_config),
            api_addr: lookup("API_ADDR").unwrap_or(defaults.api_addr),
        }
    }
}
