//! Runs a whole export plan: charset probe, steps in order, finalization

use crate::porter::conversations::{drop_staged_tables, stage_conversations};
use crate::porter::engine::{DEFAULT_CHARACTER_SET, ExportEngine, ExportSession, ExportSummary};
use crate::porter::output::{DestinationWriter, OutputError};
use crate::porter::source::SourceStore;
use crate::porter::{ConversationSource, ExportError, ExportPlan, ExportStep, TableExportSpec};

/// Knobs for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop at the first failed table; remaining tables are reported skipped
    pub fail_fast: bool,
    /// Drop conversation staging tables once their dependents are exported
    pub drop_staged: bool,
    /// Use this character set instead of probing the source
    pub character_set: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            fail_fast: false,
            drop_staged: true,
            character_set: None,
        }
    }
}

/// Export every step of a plan into `writer`
///
/// Table failures are recorded in the summary; only failures of the writer
/// itself at begin or end abort the run.
pub async fn run_plan<S: SourceStore, W: DestinationWriter>(
    engine: &mut ExportEngine<S>,
    label: &str,
    probe_table: &str,
    plan: &ExportPlan,
    writer: W,
    options: &RunOptions,
) -> Result<(ExportSummary, W), OutputError> {
    let character_set = match options.character_set {
        Some(ref cs) => cs.clone(),
        None => match engine.get_character_set(probe_table).await {
            Ok(Some(cs)) => cs,
            Ok(None) => {
                log::warn!(
                    "Probe table '{}{}' not found, assuming {}",
                    engine.prefix(),
                    probe_table,
                    DEFAULT_CHARACTER_SET
                );
                DEFAULT_CHARACTER_SET.to_string()
            }
            Err(e) => {
                log::warn!("Could not read source character set: {}", e);
                DEFAULT_CHARACTER_SET.to_string()
            }
        },
    };
    engine.set_character_set(character_set);

    let mut session = engine.begin_export(label, writer)?;
    let mut halted = false;

    for step in &plan.steps {
        if halted {
            for table in step.tables() {
                session.record_skipped(table);
            }
            continue;
        }

        let ok = match step {
            ExportStep::Table(spec) => engine.export_spec(&mut session, spec).await.is_ok(),
            ExportStep::Conversations { source, tables } => {
                run_conversations(engine, &mut session, source, tables, options).await
            }
        };

        if !ok && options.fail_fast {
            log::error!("Stopping export after first failure");
            halted = true;
        }
    }

    engine.end_export(session)
}

/// Stage conversation groups and export the tables reading them
///
/// Returns false when any of the tables failed.
async fn run_conversations<S: SourceStore, W: DestinationWriter>(
    engine: &ExportEngine<S>,
    session: &mut ExportSession<W>,
    source: &ConversationSource,
    tables: &[TableExportSpec],
    options: &RunOptions,
) -> bool {
    let mut ok = true;

    match stage_conversations(engine.source(), engine.prefix(), source).await {
        Ok(_) => {
            for spec in tables {
                if !ok && options.fail_fast {
                    session.record_skipped(spec.target);
                    continue;
                }
                if engine.export_spec(session, spec).await.is_err() {
                    ok = false;
                }
            }
        }
        Err(e) => {
            let message = e.to_string();
            for spec in tables {
                session.record_failure(&ExportError::Staging {
                    table: spec.target,
                    message: message.clone(),
                });
            }
            ok = false;
        }
    }

    // Also clears tables a failed staging left half written
    if options.drop_staged {
        if let Err(e) = drop_staged_tables(engine.source()).await {
            log::warn!("Failed to drop conversation staging tables: {}", e);
        }
    }

    ok
}
