//! Operation commands: catalog, single calls, resource reads and stdio serving.

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use tracing::info;

use ecm_gateway::config::Config;
use ecm_gateway::gateway::{stdio, Gateway, OperationCategory, RESOURCE_TEMPLATES};

fn build_gateway(config: &Config) -> Result<Gateway> {
    Gateway::new(config).context("Failed to build gateway")
}

/// Print the operation catalog.
pub(crate) fn cmd_operations(config: &Config, json: bool) -> Result<()> {
    // The catalog does not depend on credentials, so tolerate an
    // incomplete config here.
    let table = ecm_gateway::gateway::OperationTable::standard();
    let descriptors = table.descriptors();

    if json {
        let catalog = serde_json::json!({
            "operations": descriptors,
            "resources": RESOURCE_TEMPLATES,
            "profile": config.backend.profile,
        });
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    println!("Backend profile: {}", config.backend.profile);
    println!();
    for d in &descriptors {
        let marker = match d.category {
            OperationCategory::Read => " ",
            OperationCategory::Write => "*",
            OperationCategory::Destructive => "!",
        };
        println!("{} {:<24} {}", marker, d.name, d.description);
    }
    println!();
    println!("* modifies content   ! deletes content");
    println!();
    println!("Resources:");
    for template in RESOURCE_TEMPLATES {
        println!("  {}", template);
    }
    Ok(())
}

/// Run one operation and print the result as JSON.
pub(crate) async fn cmd_call(config: &Config, operation: &str, args: &str) -> Result<()> {
    let args: Value =
        serde_json::from_str(args).map_err(|e| anyhow!("--args is not valid JSON: {}", e))?;
    let gateway = build_gateway(config)?;

    match gateway.call(operation, args).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&e.to_tagged())?);
            Err(anyhow!("{} failed ({})", operation, e.kind()))
        }
    }
}

/// Read one resource and print it as JSON.
pub(crate) async fn cmd_read(config: &Config, uri: &str) -> Result<()> {
    let gateway = build_gateway(config)?;
    let value = gateway
        .read_resource(uri)
        .await
        .with_context(|| format!("Failed to read {}", uri))?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Serve newline-delimited JSON requests until stdin closes.
pub(crate) async fn cmd_stdio(config: &Config) -> Result<()> {
    let gateway = build_gateway(config)?;
    ecm_gateway::log_component!(info, "stdio", "Serving requests on stdin");

    let reader = tokio::io::BufReader::new(tokio::io::stdin());
    let answered = stdio::serve(&gateway, reader, tokio::io::stdout())
        .await
        .context("stdio transport failed")?;

    info!(
        component = "stdio",
        answered = answered,
        summary = %gateway.metrics().summary(),
        "Input closed"
    );
    Ok(())
}
