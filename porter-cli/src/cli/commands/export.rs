//! `export` command

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use colored::*;

use super::find_platform;
use crate::cli::ExportArgs;
use crate::config::PorterConfig;
use crate::platforms::{PlatformExportSpec, PlatformRegistry};
use crate::porter::output::{MemoryWriter, PorterFileWriter};
use crate::porter::source::SqliteSource;
use crate::porter::{
    ExportEngine, ExportSummary, RunOptions, SourcePrefix, TableOutcome, run_plan,
};

/// Everything an export run needs, after merging flags, env and config
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedExport {
    pub source: String,
    pub prefix: SourcePrefix,
    pub output: PathBuf,
    pub options: RunOptions,
}

/// Merge CLI flags over environment and config file values
pub fn resolve_export(
    args: &ExportArgs,
    config: &PorterConfig,
    platform: &PlatformExportSpec,
) -> Result<ResolvedExport> {
    let source = args
        .source
        .clone()
        .or_else(|| config.source.clone())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No source database given. Use --source or set {}",
                crate::config::ENV_SOURCE
            )
        })?;

    let prefix = match args.prefix.as_deref().or(config.prefix_for(platform.id)) {
        Some(prefix) => SourcePrefix::new(prefix).context("Invalid --prefix")?,
        None => platform.default_prefix(),
    };

    let output = match args.output {
        Some(ref path) => path.clone(),
        None => {
            let name = format!(
                "export_{}_{}.txt",
                platform.id,
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            );
            match config.output_dir {
                Some(ref dir) => dir.join(name),
                None => PathBuf::from(name),
            }
        }
    };

    Ok(ResolvedExport {
        source,
        prefix,
        output,
        options: RunOptions {
            fail_fast: args.fail_fast || config.fail_fast,
            drop_staged: config.drop_staged,
            character_set: args.charset.clone().or_else(|| config.character_set.clone()),
        },
    })
}

pub async fn handle_export_command(args: ExportArgs, registry: &PlatformRegistry) -> Result<()> {
    let mut config = PorterConfig::load(args.config.as_deref())?;
    config.apply_env();

    let platform = find_platform(registry, &args.platform)?;
    let resolved = resolve_export(&args, &config, platform)?;

    println!(
        "Exporting {} from {}",
        platform.name.bright_green().bold(),
        resolved.source.cyan()
    );

    let source = SqliteSource::connect(&resolved.source)
        .await
        .with_context(|| format!("Failed to open source database: {}", resolved.source))?;
    let mut engine = ExportEngine::new(source, resolved.prefix.clone());

    let start = Instant::now();
    let summary = if args.dry_run {
        let (summary, _) = run_plan(
            &mut engine,
            platform.name,
            platform.probe_table,
            &platform.plan,
            MemoryWriter::new(),
            &resolved.options,
        )
        .await
        .context("Dry run failed")?;
        summary
    } else {
        if let Some(parent) = resolved.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
        let writer = PorterFileWriter::create(&resolved.output).with_context(|| {
            format!("Failed to create export file: {}", resolved.output.display())
        })?;
        let (summary, _) = run_plan(
            &mut engine,
            platform.name,
            platform.probe_table,
            &platform.plan,
            writer,
            &resolved.options,
        )
        .await
        .with_context(|| format!("Failed to write export file: {}", resolved.output.display()))?;
        summary
    };

    print_summary(&summary);
    println!("Total time: {:.2}s", start.elapsed().as_secs_f64());

    if !args.dry_run {
        println!("Export written to {}", resolved.output.display().to_string().cyan());
    }

    if let Some(ref path) = args.report {
        write_report(&summary, path)?;
        println!("Report written to {}", path.display().to_string().cyan());
    }

    let failed = summary.failed().len();
    if failed > 0 {
        anyhow::bail!("{} of {} tables failed", failed, summary.tables.len());
    }
    Ok(())
}

fn print_summary(summary: &ExportSummary) {
    println!();
    for report in &summary.tables {
        match report.outcome {
            TableOutcome::Exported => {
                println!(
                    "  {} {:<22} {:>8} rows",
                    "✓".green(),
                    report.table.to_string(),
                    report.rows
                );
                if !report.dropped_columns.is_empty() {
                    println!(
                        "      {} {}",
                        "dropped:".yellow(),
                        report.dropped_columns.join(", ")
                    );
                }
            }
            TableOutcome::Failed { ref message, .. } => {
                println!("  {} {:<22} {}", "✗".red(), report.table.to_string(), message.red());
            }
            TableOutcome::Skipped => {
                println!("  {} {:<22} {}", "-".dimmed(), report.table.to_string(), "skipped".dimmed());
            }
        }
    }
    println!();
    println!(
        "{} tables, {} rows exported",
        summary.exported().to_string().bold(),
        summary.rows().to_string().bold()
    );
}

fn write_report(summary: &ExportSummary, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize run report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(platform: &str) -> ExportArgs {
        ExportArgs {
            platform: platform.to_string(),
            source: None,
            prefix: None,
            output: None,
            charset: None,
            fail_fast: false,
            dry_run: false,
            report: None,
            config: None,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let registry = PlatformRegistry::builtin().unwrap();
        let platform = registry.get("webwiz").unwrap();
        let config = PorterConfig {
            source: Some("config.db".into()),
            character_set: Some("latin1".into()),
            ..PorterConfig::default()
        };
        let mut args = args("webwiz");
        args.source = Some("flag.db".into());
        args.output = Some(PathBuf::from("out.txt"));
        args.fail_fast = true;

        let resolved = resolve_export(&args, &config, platform).unwrap();
        assert_eq!(resolved.source, "flag.db");
        assert_eq!(resolved.prefix.as_str(), "tbl");
        assert_eq!(resolved.output, PathBuf::from("out.txt"));
        assert_eq!(resolved.options.character_set.as_deref(), Some("latin1"));
        assert!(resolved.options.fail_fast);
    }

    #[test]
    fn test_config_prefix_and_output_dir() {
        let registry = PlatformRegistry::builtin().unwrap();
        let platform = registry.get("webwiz").unwrap();
        let mut config = PorterConfig::from_toml(
            "source = \"forum.db\"\noutput_dir = \"/exports\"\n[prefixes]\nwebwiz = \"wwf\"",
        )
        .unwrap();
        config.drop_staged = false;

        let resolved = resolve_export(&args("webwiz"), &config, platform).unwrap();
        assert_eq!(resolved.prefix.as_str(), "wwf");
        assert!(resolved.output.starts_with("/exports"));
        assert!(!resolved.options.drop_staged);
    }

    #[test]
    fn test_requires_source() {
        let registry = PlatformRegistry::builtin().unwrap();
        let platform = registry.get("lithium").unwrap();
        let err = resolve_export(&args("lithium"), &PorterConfig::default(), platform).unwrap_err();
        assert!(err.to_string().contains("--source"));
    }

    #[test]
    fn test_rejects_bad_prefix_flag() {
        let registry = PlatformRegistry::builtin().unwrap();
        let platform = registry.get("webwiz").unwrap();
        let mut args = args("webwiz");
        args.source = Some("forum.db".into());
        args.prefix = Some("tbl where 1".into());
        assert!(resolve_export(&args, &PorterConfig::default(), platform).is_err());
    }

    #[tokio::test]
    async fn test_export_writes_file_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("forum.db");
        {
            let url = format!("sqlite://{}?mode=rwc", db.display());
            let pool = sqlx::SqlitePool::connect(&url).await.unwrap();
            sqlx::query("create table users (id integer, sso_id text)")
                .execute(&pool)
                .await
                .unwrap();
            sqlx::query("insert into users values (1, 'abc')")
                .execute(&pool)
                .await
                .unwrap();
            pool.close().await;
        }

        let registry = PlatformRegistry::builtin().unwrap();
        let mut args = args("lithium");
        args.source = Some(db.display().to_string());
        args.output = Some(dir.path().join("out").join("lithium.txt"));
        args.report = Some(dir.path().join("report.json"));
        args.config = Some(dir.path().join("config.toml"));
        std::fs::write(dir.path().join("config.toml"), "").unwrap();

        // Most Lithium tables are missing from this database
        let err = handle_export_command(args.clone(), &registry).await.unwrap_err();
        assert!(err.to_string().contains("tables failed"));

        let written = std::fs::read_to_string(args.output.as_ref().unwrap()).unwrap();
        assert!(written.starts_with("Porter Export: 1.0, Source: Lithium 14.*"));
        assert!(written.contains("Table: UserAuthentication\nForeignUserKey:varchar(255),ProviderKey:varchar(64),UserID:int\nabc,122254137,1\n"));

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(args.report.as_ref().unwrap()).unwrap())
                .unwrap();
        let tables = report["tables"].as_array().unwrap();
        assert_eq!(tables.len(), 11);
        assert_eq!(tables[10]["table"], "UserAuthentication");
        assert_eq!(tables[10]["status"], "exported");
        assert_eq!(tables[0]["status"], "failed");
    }
}
