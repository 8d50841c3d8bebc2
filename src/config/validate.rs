//! Configuration validation with unknown field detection.

use std::collections::HashSet;

use serde_json::Value;

use super::{AuthConfig, Config};

/// Known top-level config field names.
const KNOWN_TOP_LEVEL: &[&str] = &[
    "backend",
    "auth",
    "http",
    "retry",
    "rate_limit",
    "cache",
    "limits",
    "logging",
    "audit",
];

/// Known fields for each section.
const KNOWN_SECTIONS: &[(&str, &[&str])] = &[
    ("backend", &["base_url", "profile", "headers"]),
    (
        "http",
        &[
            "timeout_secs",
            "connect_timeout_secs",
            "max_connections",
            "pool_max_idle_per_host",
            "pool_idle_timeout_secs",
            "user_agent",
        ],
    ),
    ("retry", &["max_attempts", "base_delay_ms", "max_delay_ms"]),
    ("rate_limit", &["capacity", "refill_per_minute"]),
    (
        "cache",
        &["enabled", "ttl_secs", "folder_tree_ttl_secs", "max_entries"],
    ),
    (
        "limits",
        &["max_search_results", "default_page_size", "max_folder_depth"],
    ),
    ("logging", &["level", "format", "file"]),
    ("audit", &["enabled"]),
];

/// Parameters accepted by each auth type.
const KNOWN_AUTH: &[(&str, &[&str])] = &[
    (
        "oauth2",
        &[
            "type",
            "client_id",
            "client_secret",
            "token_url",
            "scopes",
            "refresh_margin_secs",
        ],
    ),
    ("api_key", &["type", "key", "header_name"]),
    ("basic", &["type", "username", "password"]),
];

/// A validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Ok,
    Warn,
    Error,
}

impl Diagnostic {
    fn ok(message: &str) -> Self {
        Self {
            level: DiagnosticLevel::Ok,
            path: String::new(),
            message: message.to_string(),
        }
    }

    fn warn(path: &str, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warn,
            path: path.to_string(),
            message: message.into(),
        }
    }

    fn error(path: &str, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            path: path.to_string(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.level {
            DiagnosticLevel::Ok => "[OK]",
            DiagnosticLevel::Warn => "[WARN]",
            DiagnosticLevel::Error => "[ERROR]",
        };
        if self.path.is_empty() {
            write!(f, "{} {}", prefix, self.message)
        } else {
            write!(f, "{} {}: {}", prefix, self.path, self.message)
        }
    }
}

/// Simple Levenshtein distance for "did you mean?" suggestions.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut matrix = vec![vec![0usize; b.len() + 1]; a.len() + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, val) in matrix[0].iter_mut().enumerate() {
        *val = j;
    }

    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            matrix[i + 1][j + 1] = std::cmp::min(
                std::cmp::min(matrix[i][j + 1] + 1, matrix[i + 1][j] + 1),
                matrix[i][j] + cost,
            );
        }
    }
    matrix[a.len()][b.len()]
}

/// Suggest the closest known field name (if distance <= 3).
pub fn suggest_field(unknown: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .map(|k| (k, levenshtein(unknown, k)))
        .filter(|(_, d)| *d <= 3)
        .min_by_key(|(_, d)| *d)
        .map(|(k, _)| format!("did you mean '{}'?", k))
}

fn unknown_keys(
    obj: &serde_json::Map<String, Value>,
    known: &[&str],
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    let known_set: HashSet<&str> = known.iter().copied().collect();
    let mut found = false;
    for key in obj.keys() {
        if known_set.contains(key.as_str()) {
            continue;
        }
        found = true;
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        let msg = match suggest_field(key, known) {
            Some(suggestion) => format!("Unknown field '{}': {}", key, suggestion),
            None => format!("Unknown field '{}'", key),
        };
        diagnostics.push(Diagnostic::error(&path, msg));
    }
    found
}

/// Validate a raw config document against known field names.
pub fn validate_config(raw: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match raw.as_object() {
        Some(o) => o,
        None => {
            diagnostics.push(Diagnostic::error("", "Config must be an object"));
            return diagnostics;
        }
    };
    diagnostics.push(Diagnostic::ok("Parsed config document"));

    let mut has_unknown = unknown_keys(obj, KNOWN_TOP_LEVEL, "", &mut diagnostics);

    for (section, known) in KNOWN_SECTIONS {
        if let Some(fields) = obj.get(*section).and_then(Value::as_object) {
            has_unknown |= unknown_keys(fields, known, section, &mut diagnostics);
        }
    }

    if let Some(auth) = obj.get("auth").and_then(Value::as_object) {
        let auth_type = auth.get("type").and_then(Value::as_str).unwrap_or("api_key");
        match KNOWN_AUTH.iter().find(|(t, _)| *t == auth_type) {
            Some((_, known)) => {
                has_unknown |= unknown_keys(auth, known, "auth", &mut diagnostics);
            }
            None => {
                let types: Vec<&str> = KNOWN_AUTH.iter().map(|(t, _)| *t).collect();
                let hint = suggest_field(auth_type, &types).unwrap_or_default();
                diagnostics.push(Diagnostic::error(
                    "auth.type",
                    format!("Unknown auth type '{}' {}", auth_type, hint).trim_end().to_string(),
                ));
                has_unknown = true;
            }
        }
    }

    if !has_unknown {
        diagnostics.push(Diagnostic::ok("All fields recognized"));
    }
    diagnostics
}

fn check_url(path: &str, url: &str, diagnostics: &mut Vec<Diagnostic>) {
    match reqwest::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(parsed) => diagnostics.push(Diagnostic::error(
            path,
            format!("Unsupported URL scheme '{}'", parsed.scheme()),
        )),
        Err(e) => diagnostics.push(Diagnostic::error(path, format!("Malformed URL '{}': {}", url, e))),
    }
}

/// Validate typed settings: URLs, credentials, zero capacities.
pub fn validate_settings(config: &Config) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    check_url("backend.base_url", &config.backend.base_url, &mut diagnostics);
    for name in config.backend.headers.keys() {
        if name.trim().is_empty() || name.contains(char::is_whitespace) {
            diagnostics.push(Diagnostic::error(
                "backend.headers",
                format!("Invalid header name '{}'", name),
            ));
        }
    }

    match &config.auth {
        AuthConfig::OAuth2 {
            client_id,
            client_secret,
            token_url,
            ..
        } => {
            if client_id.is_empty() || client_secret.is_empty() {
                diagnostics.push(Diagnostic::error(
                    "auth",
                    "oauth2 needs client_id and client_secret",
                ));
            }
            check_url("auth.token_url", token_url, &mut diagnostics);
        }
        AuthConfig::ApiKey { key, header_name } => {
            if key.is_empty() {
                diagnostics.push(Diagnostic::error("auth.key", "API key is empty"));
            }
            if header_name.trim().is_empty() {
                diagnostics.push(Diagnostic::error("auth.header_name", "Header name is empty"));
            }
        }
        AuthConfig::Basic { username, .. } => {
            if username.is_empty() {
                diagnostics.push(Diagnostic::error("auth.username", "Username is empty"));
            }
        }
    }

    if config.http.timeout_secs == 0 {
        diagnostics.push(Diagnostic::error("http.timeout_secs", "Must be greater than 0"));
    }
    if config.http.max_connections == 0 {
        diagnostics.push(Diagnostic::error("http.max_connections", "Must be greater than 0"));
    }
    if config.retry.max_attempts == 0 {
        diagnostics.push(Diagnostic::error("retry.max_attempts", "Must be at least 1"));
    }
    if config.retry.base_delay_ms > config.retry.max_delay_ms {
        diagnostics.push(Diagnostic::warn(
            "retry.base_delay_ms",
            "Larger than max_delay_ms; every retry waits max_delay_ms",
        ));
    }
    if config.rate_limit.capacity == 0 || config.rate_limit.refill_per_minute == 0 {
        diagnostics.push(Diagnostic::warn(
            "rate_limit",
            "Zero capacity or refill disables outbound rate limiting",
        ));
    }
    if config.cache.enabled && config.cache.max_entries == 0 {
        diagnostics.push(Diagnostic::warn(
            "cache.max_entries",
            "Cache is enabled with zero capacity; nothing will be cached",
        ));
    }
    if config.limits.max_search_results == 0 {
        diagnostics.push(Diagnostic::error("limits.max_search_results", "Must be greater than 0"));
    }
    if config.limits.max_folder_depth == 0 {
        diagnostics.push(Diagnostic::error("limits.max_folder_depth", "Must be greater than 0"));
    }
    if config.limits.default_page_size > config.limits.max_search_results {
        diagnostics.push(Diagnostic::warn(
            "limits.default_page_size",
            "Larger than max_search_results; it will be clamped",
        ));
    }

    if !diagnostics.iter().any(Diagnostic::is_error) {
        diagnostics.push(Diagnostic::ok("Settings are usable"));
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn usable() -> Config {
        Config {
            auth: AuthConfig::ApiKey {
                key: "secret".into(),
                header_name: "X-API-Key".into(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("hello", "hello"), 0);
        assert_eq!(levenshtein("hello", "helo"), 1);
        assert!(levenshtein("hello", "world") > 3);
    }

    #[test]
    fn test_suggest_field() {
        let result = suggest_field("bakend", KNOWN_TOP_LEVEL).unwrap();
        assert!(result.contains("backend"));
        assert!(suggest_field("xyzabcdef", KNOWN_TOP_LEVEL).is_none());
    }

    #[test]
    fn test_validate_valid_config() {
        let raw = json!({
            "backend": {"base_url": "https://ecm.example.com", "profile": "alfresco"},
            "auth": {"type": "basic", "username": "u", "password": "p"},
            "retry": {"max_attempts": 5}
        });
        let diags = validate_config(&raw);
        assert!(diags.iter().all(|d| !d.is_error()), "{:?}", diags);
    }

    #[test]
    fn test_validate_unknown_fields_with_suggestion() {
        let raw = json!({
            "cache": {"ttl_sec": 10},
            "retyr": {}
        });
        let diags = validate_config(&raw);
        let errors: Vec<_> = diags.iter().filter(|d| d.is_error()).collect();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|d| d.path == "cache.ttl_sec" && d.message.contains("ttl_secs")));
        assert!(errors.iter().any(|d| d.path == "retyr" && d.message.contains("retry")));
    }

    #[test]
    fn test_validate_unknown_auth_parameter() {
        let raw = json!({"auth": {"type": "api_key", "key": "k", "client_id": "x"}});
        let diags = validate_config(&raw);
        assert!(diags.iter().any(|d| d.is_error() && d.path == "auth.client_id"));

        let raw = json!({"auth": {"type": "oauth"}});
        let diags = validate_config(&raw);
        assert!(diags
            .iter()
            .any(|d| d.path == "auth.type" && d.message.contains("oauth2")));
    }

    #[test]
    fn test_validate_not_an_object() {
        let diags = validate_config(&json!("nope"));
        assert!(diags.iter().any(|d| d.is_error()));
    }

    #[test]
    fn test_settings_usable() {
        let diags = validate_settings(&usable());
        assert!(diags.iter().all(|d| !d.is_error()), "{:?}", diags);
    }

    #[test]
    fn test_settings_errors() {
        let mut config = usable();
        config.backend.base_url = "not a url".into();
        config.retry.max_attempts = 0;
        config.auth = AuthConfig::ApiKey {
            key: String::new(),
            header_name: "X-API-Key".into(),
        };
        let diags = validate_settings(&config);
        for path in ["backend.base_url", "retry.max_attempts", "auth.key"] {
            assert!(
                diags.iter().any(|d| d.is_error() && d.path == path),
                "missing error for {}",
                path
            );
        }
    }

    #[test]
    fn test_settings_zero_capacity_warns() {
        let mut config = usable();
        config.rate_limit.capacity = 0;
        let diags = validate_settings(&config);
        assert!(diags
            .iter()
            .any(|d| d.level == DiagnosticLevel::Warn && d.path == "rate_limit"));
        assert!(!diags.iter().any(Diagnostic::is_error));
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::error("auth.key", "API key is empty");
        assert_eq!(d.to_string(), "[ERROR] auth.key: API key is empty");
    }
}
