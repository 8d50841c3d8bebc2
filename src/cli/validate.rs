//! Config check command handler.

use std::path::Path;

use anyhow::{bail, Result};

use ecm_gateway::config::{validate_config, Config, Diagnostic, DiagnosticLevel};

/// Validate the configuration file and the effective settings.
pub(crate) fn cmd_validate(path: &Path) -> Result<()> {
    println!("Config file: {}", path.display());

    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut config = if path.exists() {
        let raw = match Config::read_raw(path) {
            Ok(v) => v,
            Err(e) => {
                println!("[ERROR] {}", e);
                bail!("configuration is unreadable");
            }
        };
        diagnostics.extend(validate_config(&raw));
        match Config::from_value(raw) {
            Ok(c) => c,
            Err(e) => {
                for diag in &diagnostics {
                    println!("{}", diag);
                }
                println!("[ERROR] {}", e);
                bail!("configuration does not match the expected shape");
            }
        }
    } else {
        println!("[OK] No config file found (using defaults)");
        Config::default()
    };
    config.apply_env_overrides();
    diagnostics.extend(config.validate());

    for diag in &diagnostics {
        println!("{}", diag);
    }

    let errors = diagnostics
        .iter()
        .filter(|d| d.level == DiagnosticLevel::Error)
        .count();
    let warnings = diagnostics
        .iter()
        .filter(|d| d.level == DiagnosticLevel::Warn)
        .count();

    if errors == 0 && warnings == 0 {
        println!("\nConfiguration looks good!");
    } else {
        println!("\nFound {} error(s), {} warning(s)", errors, warnings);
    }
    if errors > 0 {
        bail!("configuration has {} error(s)", errors);
    }
    Ok(())
}
