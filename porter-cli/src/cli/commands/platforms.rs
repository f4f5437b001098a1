//! `platforms` command

use anyhow::{Context, Result};
use colored::*;
use serde::Serialize;

use crate::platforms::{Feature, PlatformRegistry};

#[derive(Serialize)]
struct PlatformSummary<'a> {
    id: &'a str,
    name: &'a str,
    prefix: &'a str,
    tables: usize,
    features: &'a [Feature],
}

pub fn handle_platforms_command(registry: &PlatformRegistry, json: bool) -> Result<()> {
    let summaries: Vec<PlatformSummary> = registry
        .iter()
        .map(|p| PlatformSummary {
            id: p.id,
            name: p.name,
            prefix: p.default_prefix,
            tables: p.plan.tables().len(),
            features: &p.features,
        })
        .collect();

    if json {
        let out = serde_json::to_string_pretty(&summaries)
            .context("Failed to serialize platform list")?;
        println!("{}", out);
        return Ok(());
    }

    println!("{}", "Supported platforms".bold());
    println!();
    for summary in &summaries {
        let prefix = if summary.prefix.is_empty() {
            "none".dimmed().to_string()
        } else {
            summary.prefix.to_string()
        };
        println!(
            "  {:<10} {} (prefix: {}, {} tables)",
            summary.id.bright_green().bold(),
            summary.name,
            prefix,
            summary.tables
        );
        let features: Vec<&str> = summary.features.iter().map(Feature::name).collect();
        println!("             {}", features.join(", ").dimmed());
    }

    Ok(())
}
