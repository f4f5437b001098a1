//! Export plan types: what a platform exports and in which order

use serde::{Deserialize, Serialize};

use super::{DestinationTable, MappingTable, QueryTemplate};

/// One destination table: the query that feeds it and how its columns map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableExportSpec {
    pub target: DestinationTable,
    pub query: QueryTemplate,
    /// `None` passes every result column through unchanged
    pub mapping: Option<MappingTable>,
}

impl TableExportSpec {
    pub fn new(target: DestinationTable, query: impl Into<QueryTemplate>, mapping: MappingTable) -> Self {
        TableExportSpec {
            target,
            query: query.into(),
            mapping: Some(mapping),
        }
    }

    /// A table whose query already produces destination column names
    pub fn passthrough(target: DestinationTable, query: impl Into<QueryTemplate>) -> Self {
        TableExportSpec {
            target,
            query: query.into(),
            mapping: None,
        }
    }
}

/// Where the conversation preprocessor reads flat private messages from
///
/// The query must select the id, subject and every participant column; the
/// parent column is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSource {
    pub query: QueryTemplate,
    pub id_column: String,
    pub subject_column: String,
    /// Sender and recipient columns; NULL entries are skipped
    pub participant_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_column: Option<String>,
}

/// A step of an export plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExportStep {
    /// Export a single table
    Table(TableExportSpec),
    /// Stage conversation groups, then export the tables that read them
    Conversations {
        source: ConversationSource,
        tables: Vec<TableExportSpec>,
    },
}

impl ExportStep {
    /// Destination tables written by this step, in order
    pub fn tables(&self) -> Vec<DestinationTable> {
        match self {
            ExportStep::Table(spec) => vec![spec.target],
            ExportStep::Conversations { tables, .. } => tables.iter().map(|t| t.target).collect(),
        }
    }
}

/// Error when a plan exports a table before one it depends on
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{later} must be exported before {earlier}, but the plan lists it after")]
pub struct PlanOrderError {
    pub earlier: DestinationTable,
    pub later: DestinationTable,
}

/// Ordered steps for one platform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportPlan {
    pub steps: Vec<ExportStep>,
}

impl ExportPlan {
    pub fn new() -> Self {
        ExportPlan::default()
    }

    pub fn table(mut self, spec: TableExportSpec) -> Self {
        self.steps.push(ExportStep::Table(spec));
        self
    }

    pub fn conversations(mut self, source: ConversationSource, tables: Vec<TableExportSpec>) -> Self {
        self.steps.push(ExportStep::Conversations { source, tables });
        self
    }

    /// All destination tables in export order
    pub fn tables(&self) -> Vec<DestinationTable> {
        self.steps.iter().flat_map(|s| s.tables()).collect()
    }

    /// Find the spec exporting a destination table
    pub fn find_table(&self, target: DestinationTable) -> Option<&TableExportSpec> {
        self.steps.iter().find_map(|step| match step {
            ExportStep::Table(spec) if spec.target == target => Some(spec),
            ExportStep::Table(_) => None,
            ExportStep::Conversations { tables, .. } => tables.iter().find(|t| t.target == target),
        })
    }

    /// Check tables are listed in dependency order
    pub fn validate_order(&self) -> Result<(), PlanOrderError> {
        let tables = self.tables();
        for pair in tables.windows(2) {
            if pair[1].stage() < pair[0].stage() {
                return Err(PlanOrderError {
                    earlier: pair[0],
                    later: pair[1],
                });
            }
        }
        Ok(())
    }
}
