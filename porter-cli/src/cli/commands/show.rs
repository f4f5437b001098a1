//! `show` command: print a platform's plan

use anyhow::Result;
use colored::*;

use super::find_platform;
use crate::platforms::PlatformRegistry;
use crate::porter::{ExportStep, TableExportSpec};

pub fn handle_show_command(registry: &PlatformRegistry, id: &str) -> Result<()> {
    let platform = find_platform(registry, id)?;
    let prefix = platform.default_prefix();

    println!("{} ({})", platform.name.bold(), platform.id.cyan());
    println!("Default prefix: {}", if prefix.as_str().is_empty() { "none" } else { prefix.as_str() });
    println!("Character set probe: {}{}", prefix, platform.probe_table);
    let features: Vec<&str> = platform.features.iter().map(|f| f.name()).collect();
    println!("Features: {}", features.join(", "));

    for step in &platform.plan.steps {
        match step {
            ExportStep::Table(spec) => print_table(spec),
            ExportStep::Conversations { source, tables } => {
                println!();
                println!(
                    "{} grouped from {} (id {}, subject {}, participants {})",
                    "Conversations".bright_blue().bold(),
                    source.query.as_str(),
                    source.id_column,
                    source.subject_column,
                    source.participant_columns.join(", ")
                );
                for spec in tables {
                    print_table(spec);
                }
            }
        }
    }

    Ok(())
}

fn print_table(spec: &TableExportSpec) {
    println!();
    println!("{} {}", "Table:".bold(), spec.target.to_string().bright_green());
    for line in spec.query.as_str().trim().lines() {
        println!("    {}", line.trim_end().dimmed());
    }
    match spec.mapping {
        Some(ref mapping) => {
            for entry in mapping.entries() {
                println!("  {}", entry.describe());
            }
        }
        None => println!("  {}", "(columns passed through)".italic()),
    }
}
