//! Rebuild conversation threads from a flat private-message table
//!
//! Sources without a conversation concept store each private message as a
//! standalone row. Messages are clustered by the pair (canonical subject,
//! participant set): a reply titled "Re: Trip" between the same people as
//! "Trip" lands in the same conversation.
//!
//! Known limitation: two unrelated threads that share both the canonical
//! subject and the exact participant set are merged into one conversation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

/// Leading reply marker: optional whitespace, "re:" in any case, whitespace
static REPLY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*re:\s*").expect("reply prefix pattern is valid"));

/// A flat private message as read from the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateMessage {
    pub id: i64,
    pub subject: String,
    /// Sender and recipients; duplicates are allowed
    pub participants: Vec<i64>,
    /// Parent message reference, carried for diagnostics only
    pub parent_id: Option<i64>,
}

/// A message after grouping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedMessage {
    pub id: i64,
    pub subject: String,
    pub canonical_subject: String,
    pub participant_key: String,
    pub group_id: i64,
}

/// A synthesized conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationGroup {
    /// Smallest message id in the group
    pub group_id: i64,
    pub subject: String,
    pub participant_key: String,
    /// Member message ids, ascending
    pub message_ids: Vec<i64>,
}

/// Output of every grouping stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationGrouping {
    /// Stage 1: distinct (message id, user id) pairs, sorted
    pub participants: BTreeSet<(i64, i64)>,
    /// Stage 2: participant set key per message id
    pub participant_keys: BTreeMap<i64, String>,
    /// Stages 3 and 4: every message with its canonical subject and group
    pub messages: Vec<GroupedMessage>,
    /// Groups ordered by group id
    pub groups: Vec<ConversationGroup>,
}

impl ConversationGrouping {
    pub fn group_of(&self, message_id: i64) -> Option<i64> {
        self.messages
            .iter()
            .find(|m| m.id == message_id)
            .map(|m| m.group_id)
    }

    pub fn group(&self, group_id: i64) -> Option<&ConversationGroup> {
        self.groups.iter().find(|g| g.group_id == group_id)
    }
}

/// Strip one leading "Re:" (any case, surrounding whitespace) from a subject
///
/// Both replies and originals are trimmed so padding never splits a thread.
pub fn canonical_subject(subject: &str) -> String {
    let rest = match REPLY_PREFIX.find(subject) {
        Some(prefix) => &subject[prefix.end()..],
        None => subject,
    };
    rest.trim().to_string()
}

/// Comma-joined, sorted, de-duplicated user ids
pub fn participant_key<'a>(users: impl IntoIterator<Item = &'a i64>) -> String {
    users
        .into_iter()
        .copied()
        .collect::<BTreeSet<i64>>()
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Partition messages into conversations
pub fn group_conversations(messages: &[PrivateMessage]) -> ConversationGrouping {
    // Stage 1: participant memberships as a set
    let participants: BTreeSet<(i64, i64)> = messages
        .iter()
        .flat_map(|m| m.participants.iter().map(move |user| (m.id, *user)))
        .collect();

    // Stage 2: every membership row linked to a message id feeds its key
    let mut users_by_message: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
    for message in messages {
        users_by_message.entry(message.id).or_default();
    }
    for (message_id, user_id) in &participants {
        users_by_message.entry(*message_id).or_default().insert(*user_id);
    }
    let participant_keys: BTreeMap<i64, String> = users_by_message
        .iter()
        .map(|(id, users)| (*id, participant_key(users)))
        .collect();

    // Stages 3 and 4: partition on (canonical subject, participant key)
    let mut partitions: BTreeMap<(String, String), BTreeSet<i64>> = BTreeMap::new();
    let mut staged: Vec<(i64, String, String, String)> = Vec::with_capacity(messages.len());
    for message in messages {
        let canonical = canonical_subject(&message.subject);
        let key = participant_keys
            .get(&message.id)
            .cloned()
            .unwrap_or_default();
        partitions
            .entry((canonical.clone(), key.clone()))
            .or_default()
            .insert(message.id);
        staged.push((message.id, message.subject.clone(), canonical, key));
    }

    let mut groups: Vec<ConversationGroup> = partitions
        .into_iter()
        .filter_map(|((subject, participant_key), ids)| {
            let group_id = *ids.first()?;
            Some(ConversationGroup {
                group_id,
                subject,
                participant_key,
                message_ids: ids.into_iter().collect(),
            })
        })
        .collect();
    groups.sort_by_key(|g| g.group_id);

    let representative: BTreeMap<(&str, &str), i64> = groups
        .iter()
        .map(|g| ((g.subject.as_str(), g.participant_key.as_str()), g.group_id))
        .collect();

    let grouped: Vec<GroupedMessage> = staged
        .iter()
        .map(|(id, subject, canonical, key)| GroupedMessage {
            id: *id,
            subject: subject.clone(),
            canonical_subject: canonical.clone(),
            participant_key: key.clone(),
            group_id: representative[&(canonical.as_str(), key.as_str())],
        })
        .collect();

    log::debug!(
        "Grouped {} private messages into {} conversations",
        messages.len(),
        groups.len()
    );

    ConversationGrouping {
        participants,
        participant_keys,
        messages: grouped,
        groups,
    }
}
