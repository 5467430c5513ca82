use std::path::Path;

use anyhow::{Context, Result};
use kuduflow_sdk::validation::FailureCollector;

use crate::plugin::{self, PluginFile, PluginKind, Unresolved};

/// Execute the `check` command: validate every plugin property.
pub fn execute(plugin_path: &Path) -> Result<()> {
    let file = plugin::parse_plugin(plugin_path)
        .with_context(|| format!("Failed to parse plugin: {}", plugin_path.display()))?;

    let collector = collect_failures(&file)?;
    if collector.is_empty() {
        println!("{:18} OK", format!("{}:", file.plugin));
        println!("\nAll checks passed.");
        return Ok(());
    }

    println!("{:18} FAILED", format!("{}:", file.plugin));
    for failure in collector.failures() {
        let property = failure.property.as_deref().unwrap_or("-");
        println!("  [{property}] {}", failure.message);
        if let Some(action) = &failure.corrective_action {
            println!("    {action}");
        }
    }
    anyhow::bail!("{} configuration problem(s)", collector.failures().len())
}

/// Validate the properties, leaving unresolved macros for deployment.
pub fn collect_failures(file: &PluginFile) -> Result<FailureCollector> {
    Ok(match file.plugin {
        PluginKind::Source => file
            .config::<source_kudu::Config>(Unresolved::Keep)?
            .validate(),
        PluginKind::Sink => file.config::<dest_kudu::Config>(Unresolved::Keep)?.validate(),
    })
}
