//! Destination tables and their fixed schema

use serde::{Deserialize, Serialize};

/// Type used for destination columns the schema does not describe
pub const DEFAULT_COLUMN_TYPE: &str = "varchar(255)";

/// Type used for permission flag columns
const PERMISSION_FLAG_TYPE: &str = "tinyint";

/// A table of the destination forum schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DestinationTable {
    User,
    Rank,
    Role,
    UserRole,
    Permission,
    UserMeta,
    Category,
    Discussion,
    Tag,
    TagDiscussion,
    Comment,
    Conversation,
    UserConversation,
    ConversationMessage,
    UserAuthentication,
}

impl DestinationTable {
    pub fn all_variants() -> &'static [DestinationTable] {
        &[
            DestinationTable::User,
            DestinationTable::Rank,
            DestinationTable::Role,
            DestinationTable::UserRole,
            DestinationTable::Permission,
            DestinationTable::UserMeta,
            DestinationTable::Category,
            DestinationTable::Discussion,
            DestinationTable::Tag,
            DestinationTable::TagDiscussion,
            DestinationTable::Comment,
            DestinationTable::Conversation,
            DestinationTable::UserConversation,
            DestinationTable::ConversationMessage,
            DestinationTable::UserAuthentication,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            DestinationTable::User => "User",
            DestinationTable::Rank => "Rank",
            DestinationTable::Role => "Role",
            DestinationTable::UserRole => "UserRole",
            DestinationTable::Permission => "Permission",
            DestinationTable::UserMeta => "UserMeta",
            DestinationTable::Category => "Category",
            DestinationTable::Discussion => "Discussion",
            DestinationTable::Tag => "Tag",
            DestinationTable::TagDiscussion => "TagDiscussion",
            DestinationTable::Comment => "Comment",
            DestinationTable::Conversation => "Conversation",
            DestinationTable::UserConversation => "UserConversation",
            DestinationTable::ConversationMessage => "ConversationMessage",
            DestinationTable::UserAuthentication => "UserAuthentication",
        }
    }

    /// Dependency stage; a plan must export tables in non-decreasing stage order
    ///
    /// Users -> Roles -> UserRoles -> Permissions/UserMeta -> Categories ->
    /// Discussions -> Tags -> Comments -> Conversations -> SSO
    pub fn stage(&self) -> u8 {
        match self {
            DestinationTable::User | DestinationTable::Rank => 0,
            DestinationTable::Role => 1,
            DestinationTable::UserRole => 2,
            DestinationTable::Permission | DestinationTable::UserMeta => 3,
            DestinationTable::Category => 4,
            DestinationTable::Discussion => 5,
            DestinationTable::Tag | DestinationTable::TagDiscussion => 6,
            DestinationTable::Comment => 7,
            DestinationTable::Conversation
            | DestinationTable::UserConversation
            | DestinationTable::ConversationMessage => 8,
            DestinationTable::UserAuthentication => 9,
        }
    }

    /// Open tables accept any column (permission names are open-ended)
    pub fn is_open(&self) -> bool {
        matches!(self, DestinationTable::Permission)
    }

    /// Known columns and their destination types
    pub fn columns(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            DestinationTable::User => &[
                ("UserID", "int"),
                ("Name", "varchar(50)"),
                ("FullName", "varchar(50)"),
                ("Email", "varchar(200)"),
                ("Password", "varbinary(100)"),
                ("HashMethod", "varchar(10)"),
                ("Photo", "varchar(255)"),
                ("Title", "varchar(100)"),
                ("Location", "varchar(255)"),
                ("About", "longtext"),
                ("Gender", "varchar(1)"),
                ("DateOfBirth", "datetime"),
                ("DateFirstVisit", "datetime"),
                ("DateLastActive", "datetime"),
                ("DateInserted", "datetime"),
                ("DateUpdated", "datetime"),
                ("InsertIPAddress", "varchar(39)"),
                ("LastIPAddress", "varchar(39)"),
                ("ShowEmail", "tinyint"),
                ("Admin", "tinyint"),
                ("Banned", "tinyint"),
                ("Verified", "tinyint"),
                ("Deleted", "tinyint"),
                ("RankID", "int"),
                ("CountVisits", "int"),
                ("CountComments", "int"),
                ("CountDiscussions", "int"),
                ("Points", "int"),
            ],
            DestinationTable::Rank => &[
                ("RankID", "int"),
                ("Name", "varchar(100)"),
                ("Level", "smallint"),
                ("Label", "varchar(255)"),
                ("Body", "text"),
                ("Sort", "int"),
                ("PostReq", "int"),
                ("PointReq", "int"),
                ("AgeReq", "int"),
                ("Enabled", "tinyint"),
            ],
            DestinationTable::Role => &[
                ("RoleID", "int"),
                ("Name", "varchar(100)"),
                ("Description", "varchar(500)"),
                ("CanSession", "tinyint"),
            ],
            DestinationTable::UserRole => &[("UserID", "int"), ("RoleID", "int")],
            DestinationTable::Permission => &[
                ("RoleID", "int"),
                ("JunctionTable", "varchar(100)"),
                ("JunctionColumn", "varchar(100)"),
                ("JunctionID", "int"),
                ("_Permissions", "varchar(255)"),
            ],
            DestinationTable::UserMeta => &[
                ("UserID", "int"),
                ("Name", "varchar(255)"),
                ("Value", "text"),
            ],
            DestinationTable::Category => &[
                ("CategoryID", "int"),
                ("Name", "varchar(255)"),
                ("UrlCode", "varchar(255)"),
                ("Description", "varchar(500)"),
                ("ParentCategoryID", "int"),
                ("Depth", "int"),
                ("DisplayAs", "varchar(20)"),
                ("Sort", "int"),
                ("Archived", "tinyint"),
                ("CountDiscussions", "int"),
                ("CountComments", "int"),
                ("PermissionCategoryID", "int"),
                ("DateInserted", "datetime"),
                ("InsertUserID", "int"),
                ("DateUpdated", "datetime"),
                ("UpdateUserID", "int"),
            ],
            DestinationTable::Discussion => &[
                ("DiscussionID", "int"),
                ("Type", "varchar(10)"),
                ("ForeignID", "varchar(32)"),
                ("CategoryID", "int"),
                ("Name", "varchar(100)"),
                ("Body", "longtext"),
                ("Format", "varchar(20)"),
                ("Tags", "varchar(255)"),
                ("CountComments", "int"),
                ("CountViews", "int"),
                ("Closed", "tinyint"),
                ("Announce", "tinyint"),
                ("Sink", "tinyint"),
                ("FirstCommentID", "int"),
                ("LastCommentID", "int"),
                ("LastCommentUserID", "int"),
                ("DateLastComment", "datetime"),
                ("DateInserted", "datetime"),
                ("InsertUserID", "int"),
                ("InsertIPAddress", "varchar(39)"),
                ("DateUpdated", "datetime"),
                ("UpdateUserID", "int"),
                ("Score", "float"),
            ],
            DestinationTable::Tag => &[
                ("TagID", "int"),
                ("Name", "varchar(255)"),
                ("Type", "varchar(10)"),
                ("InsertUserID", "int"),
                ("DateInserted", "datetime"),
                ("CategoryID", "int"),
                ("CountDiscussions", "int"),
            ],
            DestinationTable::TagDiscussion => &[
                ("TagID", "int"),
                ("DiscussionID", "int"),
                ("CategoryID", "int"),
                ("DateInserted", "datetime"),
            ],
            DestinationTable::Comment => &[
                ("CommentID", "int"),
                ("DiscussionID", "int"),
                ("Body", "longtext"),
                ("Format", "varchar(20)"),
                ("DateInserted", "datetime"),
                ("InsertUserID", "int"),
                ("InsertIPAddress", "varchar(39)"),
                ("DateUpdated", "datetime"),
                ("UpdateUserID", "int"),
                ("Score", "float"),
            ],
            DestinationTable::Conversation => &[
                ("ConversationID", "int"),
                ("Subject", "varchar(255)"),
                ("FirstMessageID", "int"),
                ("DateInserted", "datetime"),
                ("InsertUserID", "int"),
                ("DateUpdated", "datetime"),
                ("UpdateUserID", "int"),
            ],
            DestinationTable::UserConversation => &[
                ("UserID", "int"),
                ("ConversationID", "int"),
                ("Deleted", "tinyint"),
                ("LastMessageID", "int"),
            ],
            DestinationTable::ConversationMessage => &[
                ("MessageID", "int"),
                ("ConversationID", "int"),
                ("Body", "longtext"),
                ("Format", "varchar(20)"),
                ("InsertUserID", "int"),
                ("DateInserted", "datetime"),
                ("InsertIPAddress", "varchar(39)"),
            ],
            DestinationTable::UserAuthentication => &[
                ("ForeignUserKey", "varchar(255)"),
                ("ProviderKey", "varchar(64)"),
                ("UserID", "int"),
            ],
        }
    }

    /// Destination type of a column, `None` when the table does not accept it
    pub fn column_type(&self, column: &str) -> Option<&'static str> {
        self.columns()
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, ty)| *ty)
            .or_else(|| self.is_open().then_some(PERMISSION_FLAG_TYPE))
    }
}

impl std::fmt::Display for DestinationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for DestinationTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DestinationTable::all_variants()
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown destination table '{}'", s))
    }
}
