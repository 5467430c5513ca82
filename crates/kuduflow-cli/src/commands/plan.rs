use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use dest_kudu::ddl::create_table_request;

use crate::plugin::{self, PluginFile, PluginKind, Unresolved};

/// Execute the `plan` command: print the table a sink would create, or the
/// scan a source would run.
pub fn execute(plugin_path: &Path) -> Result<()> {
    let file = plugin::parse_plugin(plugin_path)
        .with_context(|| format!("Failed to parse plugin: {}", plugin_path.display()))?;
    print!("{}", render(&file)?);
    Ok(())
}

/// Human-readable plan followed by a machine-readable JSON line.
///
/// Every macro must resolve from the file's arguments.
pub fn render(file: &PluginFile) -> Result<String> {
    match file.plugin {
        PluginKind::Source => render_source(&file.config(Unresolved::Fail)?),
        PluginKind::Sink => render_sink(&file.config(Unresolved::Fail)?),
    }
}

fn render_sink(config: &dest_kudu::Config) -> Result<String> {
    config.validate().into_result()?;
    let settings = config.settings()?;
    let request = create_table_request(&settings.table, settings.schema.fields(), &settings.policy)?;

    let mut out = String::new();
    writeln!(out, "Table:        {} (created if missing)", request.table_name)?;
    writeln!(out, "Masters:      {}", settings.connection.master_list())?;
    writeln!(
        out,
        "Partitioning: hash({}) into {} bucket(s), seed {}",
        request.partitioning.columns.join(", "),
        request.partitioning.buckets,
        request.partitioning.seed
    )?;
    writeln!(out, "Replicas:     {}", request.replicas)?;
    writeln!(out, "Row flush:    {}", settings.row_flush)?;
    writeln!(out, "Columns:")?;
    for col in request.schema.columns() {
        let nullable = if col.nullable { "NULL" } else { "NOT NULL" };
        let key = if col.is_key { ", KEY" } else { "" };
        writeln!(
            out,
            "  - {} ({}, {}{}) encoding={} compression={}",
            col.name, col.storage_type, nullable, key, col.encoding, col.compression
        )?;
    }
    writeln!(out)?;
    writeln!(out, "@@CREATE_TABLE_JSON@@{}", serde_json::to_string(&request)?)?;
    writeln!(
        out,
        "@@OUTPUT_FORMAT_JSON@@{}",
        serde_json::to_string(&config.output_format_conf()?)?
    )?;
    Ok(out)
}

fn render_source(config: &source_kudu::Config) -> Result<String> {
    config.validate().into_result()?;
    let connection = config.connection_config()?;
    let schema = config.output_schema()?;

    let mut out = String::new();
    writeln!(out, "Table:        {}", config.table_name())?;
    writeln!(out, "Masters:      {}", connection.master_list())?;
    writeln!(out, "Projection:   {}", config.projection())?;
    writeln!(out, "Timeout:      {} ms", connection.operation_timeout.as_millis())?;
    writeln!(out, "Output schema ({}):", schema.name())?;
    for field in schema.fields() {
        let nullable = if field.nullable { "NULL" } else { "NOT NULL" };
        writeln!(out, "  - {} ({}, {})", field.name, field.field_type, nullable)?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "@@INPUT_FORMAT_JSON@@{}",
        serde_json::to_string(&config.input_format_conf())?
    )?;
    Ok(out)
}
