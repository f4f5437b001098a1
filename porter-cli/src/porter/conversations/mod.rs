//! Conversation synthesis for sources that store private messages flat

mod grouping;
mod staging;

pub use grouping::{
    ConversationGroup, ConversationGrouping, GroupedMessage, PrivateMessage, canonical_subject,
    group_conversations, participant_key,
};
pub use staging::{
    GROUPS_TABLE, MESSAGES_TABLE, PARTICIPANT_KEYS_TABLE, PARTICIPANTS_TABLE, STAGED_TABLES,
    StagingError, drop_staged_tables, read_messages, stage_conversations, staged_tables,
};
