//! Derived tables holding the conversation grouping for platform queries

use crate::porter::source::{ResultSet, SourceError, SourceRow, SourceStore, StagedTable};
use crate::porter::{ConversationSource, SourcePrefix, Value};

use super::grouping::{ConversationGrouping, PrivateMessage, group_conversations};

/// (message id, user id) memberships
pub const PARTICIPANTS_TABLE: &str = "z_pmto";
/// Participant set key per message
pub const PARTICIPANT_KEYS_TABLE: &str = "z_pmto2";
/// Every message with its canonical subject and group
pub const MESSAGES_TABLE: &str = "z_pmtext";
/// One row per synthesized conversation
pub const GROUPS_TABLE: &str = "z_pmgroup";

/// Staged tables in the order they are written
pub const STAGED_TABLES: [&str; 4] = [
    PARTICIPANTS_TABLE,
    PARTICIPANT_KEYS_TABLE,
    MESSAGES_TABLE,
    GROUPS_TABLE,
];

/// Failure reading messages or writing the staged tables
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("message query does not return column '{0}'")]
    MissingColumn(String),
    #[error("row {row}: column '{column}' holds {value}, expected an integer id")]
    InvalidId {
        row: usize,
        column: String,
        value: Value,
    },
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Turn the message query result into private messages
pub fn read_messages(
    source: &ConversationSource,
    result: &ResultSet,
) -> Result<Vec<PrivateMessage>, StagingError> {
    let required = std::iter::once(&source.id_column)
        .chain(std::iter::once(&source.subject_column))
        .chain(source.participant_columns.iter())
        .chain(source.parent_column.iter());
    for column in required {
        if !result.has_column(column) {
            return Err(StagingError::MissingColumn(column.clone()));
        }
    }

    result
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let id = required_id(row, idx, &source.id_column)?;

            let subject = match row.get(&source.subject_column) {
                Some(Value::Null) | None => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_cell(),
            };

            let mut participants = Vec::with_capacity(source.participant_columns.len());
            for column in &source.participant_columns {
                if let Some(user) = optional_id(row, idx, column)? {
                    participants.push(user);
                }
            }

            let parent_id = match source.parent_column {
                Some(ref column) => optional_id(row, idx, column)?,
                None => None,
            };

            Ok(PrivateMessage {
                id,
                subject,
                participants,
                parent_id,
            })
        })
        .collect()
}

fn optional_id(row: &SourceRow, idx: usize, column: &str) -> Result<Option<i64>, StagingError> {
    match row.get(column) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_int().map(Some).ok_or_else(|| StagingError::InvalidId {
            row: idx,
            column: column.to_string(),
            value: value.clone(),
        }),
    }
}

fn required_id(row: &SourceRow, idx: usize, column: &str) -> Result<i64, StagingError> {
    optional_id(row, idx, column)?.ok_or_else(|| StagingError::InvalidId {
        row: idx,
        column: column.to_string(),
        value: Value::Null,
    })
}

/// Lay the grouping out as the four derived tables
pub fn staged_tables(grouping: &ConversationGrouping) -> Vec<StagedTable> {
    let mut participants = StagedTable::new(
        PARTICIPANTS_TABLE,
        &[("PM_ID", "INTEGER"), ("User_ID", "INTEGER")],
    );
    for (message_id, user_id) in &grouping.participants {
        participants.push(vec![Value::Int(*message_id), Value::Int(*user_id)]);
    }

    let mut keys = StagedTable::new(
        PARTICIPANT_KEYS_TABLE,
        &[("PM_ID", "INTEGER"), ("UserIDs", "TEXT")],
    );
    for (message_id, key) in &grouping.participant_keys {
        keys.push(vec![Value::Int(*message_id), Value::from(key.as_str())]);
    }

    let mut messages = StagedTable::new(
        MESSAGES_TABLE,
        &[
            ("PM_ID", "INTEGER"),
            ("Title", "TEXT"),
            ("Title2", "TEXT"),
            ("UserIDs", "TEXT"),
            ("Group_ID", "INTEGER"),
        ],
    );
    for message in &grouping.messages {
        messages.push(vec![
            Value::Int(message.id),
            Value::from(message.subject.as_str()),
            Value::from(message.canonical_subject.as_str()),
            Value::from(message.participant_key.as_str()),
            Value::Int(message.group_id),
        ]);
    }

    let mut groups = StagedTable::new(
        GROUPS_TABLE,
        &[("Group_ID", "INTEGER"), ("Title", "TEXT"), ("UserIDs", "TEXT")],
    );
    for group in &grouping.groups {
        groups.push(vec![
            Value::Int(group.group_id),
            Value::from(group.subject.as_str()),
            Value::from(group.participant_key.as_str()),
        ]);
    }

    vec![participants, keys, messages, groups]
}

/// Read private messages, group them and write the derived tables
///
/// Every staged table is fully written before this returns, so dependent
/// queries never see a partial grouping.
pub async fn stage_conversations<S: SourceStore + ?Sized>(
    store: &S,
    prefix: &SourcePrefix,
    source: &ConversationSource,
) -> Result<ConversationGrouping, StagingError> {
    let sql = source.query.render(prefix);
    log::debug!("Reading private messages: {}", sql);

    let result = store.fetch(&sql).await?;
    let messages = read_messages(source, &result)?;
    let grouping = group_conversations(&messages);

    for table in staged_tables(&grouping) {
        log::debug!("Staging {} ({} rows)", table.name, table.rows.len());
        store.stage(&table).await?;
    }

    log::info!(
        "Staged {} conversations from {} private messages",
        grouping.groups.len(),
        messages.len()
    );
    Ok(grouping)
}

/// Drop every staged table, including ones a failed run left behind
pub async fn drop_staged_tables<S: SourceStore + ?Sized>(store: &S) -> Result<(), SourceError> {
    for name in STAGED_TABLES {
        store.drop_staged(name).await?;
    }
    log::debug!("Dropped conversation staging tables");
    Ok(())
}
