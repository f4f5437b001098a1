//! Lithium 14
//!
//! Lithium stores times as Unix milliseconds; queries select the raw values
//! and the `unix_millis` filter turns them into datetimes.

use crate::porter::{Column, DestinationTable, ExportPlan, Filter, MappingTable, TableExportSpec};

use super::{Feature, PlatformExportSpec};

/// Nodes excluded from categories, discussions and comments
const EXCLUDED_NODES: &str = "(72, 73)";

/// Provider key of the SSO connection user ids are linked to
const SSO_PROVIDER_KEY: &str = "122254137";

/// Tags used by fewer discussions are not exported
const MIN_TAG_USES: u32 = 5;

pub fn platform() -> PlatformExportSpec {
    PlatformExportSpec {
        id: "lithium",
        name: "Lithium 14.*",
        default_prefix: "",
        probe_table: "message2",
        features: vec![
            Feature::Users,
            Feature::Passwords,
            Feature::Ranks,
            Feature::Roles,
            Feature::Permissions,
            Feature::Categories,
            Feature::Discussions,
            Feature::Tags,
            Feature::Comments,
            Feature::SingleSignOn,
        ],
        plan: plan(),
    }
}

fn plan() -> ExportPlan {
    ExportPlan::new()
        .table(users())
        .table(ranks())
        .table(roles())
        .table(user_roles())
        .table(permissions())
        .table(categories())
        .table(discussions())
        .table(tags())
        .table(tag_discussions())
        .table(comments())
        .table(single_sign_on())
}

fn millis(target: &str) -> Column {
    Column::new(target).filter(Filter::UnixMillis)
}

fn users() -> TableExportSpec {
    // RegistrationDate is listed twice; the second entry replaces the first
    let mapping = MappingTable::new()
        .map("id", "UserID")
        .map("pwd_hash", "Password")
        .column("nlogin", Column::new("Name").filter(Filter::HtmlDecode))
        .map("About", "About")
        .map("email", "Email")
        .map("ShowEmail", "ShowEmail")
        .map("Birthday", "DateOfBirth")
        .column("RegistrationDate", millis("DateFirstVisit"))
        .column("LastVisitDate", millis("DateLastActive"))
        .column("RegistrationDate", millis("DateInserted"))
        .map("isAdmin", "Admin")
        .map("Verified", "Verified")
        .map("Banned", "Banned")
        .map("deleted", "Deleted")
        .map("ranking_id", "RankID");

    TableExportSpec::new(
        DestinationTable::User,
        "
        select u.*,
            u.registration_time as RegistrationDate,
            u.last_visit_time as LastVisitDate,
            (ur.role_id is not null) as isAdmin,
            (ban.id is not null) as Banned,
            ver.nvalue as Verified,
            bd.nvalue as Birthday,
            bio.nvalue as About,
            pe.nvalue is null as ShowEmail
        from :_users u
        left outer join :_user_profile ver
            on u.id = ver.user_id and ver.param = 'user.email_verified'
        left outer join :_user_bans ban
            on u.id = ban.user_id
        left outer join :_user_profile bd
            on u.id = bd.user_id and bd.param = 'profile.birthday'
        left outer join :_user_profile bio
            on u.id = bio.user_id and bio.param = 'profile.biography'
        left outer join :_user_profile pe
            on u.id = pe.user_id and pe.param = 'profile.privacy_email'
        left outer join :_user_role ur
            on u.id = ur.user_id and ur.role_id = 1
        ",
        mapping,
    )
}

fn ranks() -> TableExportSpec {
    TableExportSpec::new(
        DestinationTable::Rank,
        "
        select *,
            case when deleted is not null then not deleted else 0 end as Enabled
        from :_user_rankings
        ",
        MappingTable::new()
            .map("id", "RankID")
            .map("sort_order", "Sort")
            .map("metric_posts", "PostReq")
            .map("average_message_rating", "PointReq")
            .map("registration_age", "AgeReq")
            .map("rank_name", "Name")
            .map("Enabled", "Enabled"),
    )
}

fn roles() -> TableExportSpec {
    TableExportSpec::new(
        DestinationTable::Role,
        "
        select *
        from :_roles
        where deleted = 0 and node_id = 1
        ",
        MappingTable::new().map("id", "RoleID").map("name", "Name"),
    )
}

fn user_roles() -> TableExportSpec {
    TableExportSpec::new(
        DestinationTable::UserRole,
        "
        select u.*
        from :_user_role u
        join :_roles r on r.id = u.role_id
        where r.deleted = 0 and r.node_id = 1
        ",
        MappingTable::new()
            .map("user_id", "UserID")
            .map("role_id", "RoleID"),
    )
}

/// Role permissions, one flag column per destination permission
///
/// Several source flags are listed more than once. Only the last target of
/// each survives, so e.g. `Garden.Users.Add` is never exported and
/// `ManageUsers` ends up granting `Vanilla.Comments.Me`. Kept as authored.
fn permission_map() -> MappingTable {
    MappingTable::new()
        .map("RoleID", "RoleID")
        .map("JunctionTable", "JunctionTable")
        .map("JunctionColumn", "JunctionColumn")
        .map("JunctionID", "JunctionID")
        .map("view_personal_info", "Garden.PersonalInfo.View")
        // Garden
        .map("ReadMessage", "Garden.AdvancedNotifications.Allow")
        .map("DeleteMessage", "Garden.Activity.Delete")
        .map("ReadMessage", "Garden.Activity.View")
        .map("view_personal_info", "Garden.Email.View")
        .map("manage_messages", "Garden.Messages.Manage")
        .map("modbar_manage", "Garden.Moderation.Manage")
        .map("ManageUsers", "Garden.Profiles.Edit")
        .map("MyTrueField", "Garden.Profiles.View")
        .map("ManageSettings", "Garden.Settings.Manage")
        .map("ManageSettings", "Garden.Settings.View")
        .map("MyTrueField", "Garden.SignIn.Allow")
        .map("ManageUsers", "Garden.Users.Add")
        .map("ManageUsers", "Garden.Users.Approve")
        .map("ManageUsers", "Garden.Users.Delete")
        .map("ManageUsers", "Garden.Users.Edit")
        // Conversations
        .map("create_thread", "Conversations.Conversations.Add")
        .map("access_moderation_manager", "Conversations.Moderation.Manage")
        // Vanilla
        .map("MyFalseField", "Vanilla.Approval.Require")
        .map("ManageUsers", "Vanilla.Comments.Me")
        // Default category permissions
        .map("create_message", "Vanilla.Comments.Add")
        .map("DeleteMessage", "Vanilla.Comments.Delete")
        .map("update_message", "Vanilla.Comments.Edit")
        .map("create_thread", "Vanilla.Discussions.Add")
        .map("allow_float_for_all_users", "Vanilla.Discussions.Announce")
        .map("DeleteMessage", "Vanilla.Discussions.Close")
        .map("DeleteMessage", "Vanilla.Discussions.Delete")
        .map("update_message", "Vanilla.Discussions.Edit")
        .map("allow_float_for_all_users", "Vanilla.Discussions.Sink")
        .map("ReadMessage", "Vanilla.Discussions.View")
}

fn permissions() -> TableExportSpec {
    let flags = [
        ("vpi", "view_personal_info", "view_personal_info"),
        ("rm", "read_message", "ReadMessage"),
        ("dm", "delete_message", "DeleteMessage"),
        ("mm", "manage_messages", "manage_messages"),
        ("mmod", "modbar_manage", "modbar_manage"),
        ("mu", "allow_manage_users", "ManageUsers"),
        ("cc", "create_category", "ManageSettings"),
        ("ct", "create_thread", "create_thread"),
        ("amm", "access_moderation_manager", "access_moderation_manager"),
        ("cm", "create_message", "create_message"),
        ("um", "update_message", "update_message"),
        ("f", "allow_float_for_all_users", "allow_float_for_all_users"),
    ];

    let columns: Vec<String> = flags
        .iter()
        .map(|(alias, _, column)| {
            format!("coalesce({alias}.access_level > 0, 0) as {column}")
        })
        .collect();
    let joins: Vec<String> = flags
        .iter()
        .map(|(alias, permission, _)| {
            format!(
                "left outer join :_role_permission {alias}\n            on {alias}.role_id = r.id and {alias}.permission = '{permission}'"
            )
        })
        .collect();

    let sql = format!(
        "
        select
            1 as MyTrueField,
            0 as MyFalseField,
            r.id as RoleID,
            'Category' as JunctionTable,
            'PermissionCategoryID' as JunctionColumn,
            -1 as JunctionID,
            {}
        from :_roles r
        {}
        where r.deleted = 0 and r.node_id = 1
        ",
        columns.join(",\n            "),
        joins.join("\n        "),
    );

    TableExportSpec::new(DestinationTable::Permission, sql, permission_map())
}

fn categories() -> TableExportSpec {
    let mapping = MappingTable::new()
        .map("node_id", "CategoryID")
        .map("parent_node_id", "ParentCategoryID")
        .map("DepthCalc", "Depth")
        .map("paths", "Name")
        .map("display_id", "UrlCode")
        .map("position", "Sort")
        .map("DisplayAs", "DisplayAs")
        .map("owner_user_id", "InsertUserID")
        .map("owner_user_id", "UpdateUserID")
        .column("CreatedDate", millis("DateInserted"))
        .column("CreatedDate", millis("DateUpdated"));

    TableExportSpec::new(
        DestinationTable::Category,
        format!(
            "
            select c.*,
                (c.depth - 2) as DepthCalc,
                case when c.type_id = 2 then 'Categories' else 'Discussions' end as DisplayAs,
                c.created_time as CreatedDate
            from :_nodes c
            where c.deleted = 0 and c.depth > 2 and c.node_id not in {EXCLUDED_NODES}
            "
        ),
        mapping,
    )
}

fn discussions() -> TableExportSpec {
    let mapping = MappingTable::new()
        .map("unique_id", "DiscussionID")
        .map("node_id", "CategoryID")
        .map("user_id", "InsertUserID")
        .map("FirstCommentID", "FirstCommentID")
        .map("LastCommentID", "LastCommentID")
        .column("subject", Column::new("Name").filter(Filter::HtmlDecode))
        .column("body", Column::new("Body").filter(Filter::HtmlDecode))
        .map("Tags", "Tags")
        .map("CountComments", "CountComments")
        .map("views", "CountViews")
        .column("DateInserted", millis("DateInserted"))
        .column("DateLastComment", millis("DateLastComment"))
        .map("LastCommentUserID", "LastCommentUserID")
        .column("DateUpdated", millis("DateUpdated"))
        .map("edit_user", "UpdateUserID");

    TableExportSpec::new(
        DestinationTable::Discussion,
        format!(
            "
            select m.*,
                m.post_date as DateInserted,
                m.edit_date as DateUpdated,
                (select group_concat(t.tag_text)
                    from :_tags t
                    join :_tag_events_message e on t.tag_id = e.tag_id
                    where e.target_id = m.unique_id) as Tags,
                (select fc.unique_id from :_message2 fc
                    where fc.root_id = m.id and fc.node_id = m.node_id
                    order by fc.post_date asc limit 1) as FirstCommentID,
                (select lc.unique_id from :_message2 lc
                    where lc.root_id = m.id and lc.node_id = m.node_id
                    order by lc.post_date desc limit 1) as LastCommentID,
                (select count(*) from :_message2 cc
                    where cc.root_id = m.id and cc.node_id = m.node_id) as CountComments,
                (select lc.post_date from :_message2 lc
                    where lc.root_id = m.id and lc.node_id = m.node_id
                    order by lc.post_date desc limit 1) as DateLastComment,
                (select lc.user_id from :_message2 lc
                    where lc.root_id = m.id and lc.node_id = m.node_id
                    order by lc.post_date desc limit 1) as LastCommentUserID
            from :_message2 m
            where m.root_id = m.id and m.deleted = 0 and m.node_id not in {EXCLUDED_NODES}
            "
        ),
        mapping,
    )
}

fn tags() -> TableExportSpec {
    TableExportSpec::new(
        DestinationTable::Tag,
        format!(
            "
            select t.*,
                t.creation_time as DateInserted,
                '' as EmptyString,
                -1 as NegativeOne,
                (select count(*) from :_tag_events_message tem
                    where tem.tag_id = t.tag_id) as CountDiscussions
            from :_tags t
            where (select count(*) from :_tag_events_message tem
                where tem.tag_id = t.tag_id) >= {MIN_TAG_USES}
            "
        ),
        MappingTable::new()
            .map("tag_id", "TagID")
            .map("tag_text_canon", "Name")
            .map("EmptyString", "Type")
            .column("DateInserted", millis("DateInserted"))
            .map("NegativeOne", "CategoryID")
            .map("CountDiscussions", "CountDiscussions"),
    )
}

fn tag_discussions() -> TableExportSpec {
    TableExportSpec::new(
        DestinationTable::TagDiscussion,
        format!(
            "
            select t.*,
                m2.node_id as CategoryID,
                m2.post_date as DateInserted
            from :_tag_events_message t
            join :_message2 m2 on m2.unique_id = t.target_id
            where (select count(*) from :_tag_events_message tem
                where tem.tag_id = t.tag_id) >= {MIN_TAG_USES}
            "
        ),
        MappingTable::new()
            .map("tag_id", "TagID")
            .map("target_id", "DiscussionID")
            .map("CategoryID", "CategoryID")
            .column("DateInserted", millis("DateInserted")),
    )
}

fn comments() -> TableExportSpec {
    TableExportSpec::new(
        DestinationTable::Comment,
        format!(
            "
            select m.*,
                m.post_date as DateInserted,
                m.edit_date as DateUpdated,
                r.unique_id as RootID
            from :_message2 m
            join :_message2 r on m.root_id = r.id and m.node_id = r.node_id
            where m.id != m.root_id and m.deleted = 0 and m.node_id not in {EXCLUDED_NODES}
            "
        ),
        MappingTable::new()
            .map("unique_id", "CommentID")
            .map("RootID", "DiscussionID")
            .map("user_id", "InsertUserID")
            .map("edit_user", "UpdateUserID")
            .map("body", "Body")
            .column("DateInserted", millis("DateInserted"))
            .column("DateUpdated", millis("DateUpdated")),
    )
}

fn single_sign_on() -> TableExportSpec {
    TableExportSpec::new(
        DestinationTable::UserAuthentication,
        format!(
            "
            select sso_id,
                id,
                '{SSO_PROVIDER_KEY}' as ProviderKey
            from :_users
            "
        ),
        MappingTable::new()
            .map("sso_id", "ForeignUserKey")
            .map("ProviderKey", "ProviderKey")
            .map("id", "UserID"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::porter::output::MemoryWriter;
    use crate::porter::source::SqliteSource;
    use crate::porter::{ExportEngine, SourcePrefix, Value};

    #[test]
    fn test_plan_order_is_valid() {
        let plan = platform().plan;
        assert!(plan.validate_order().is_ok());
        assert_eq!(plan.tables().len(), 11);
    }

    #[test]
    fn test_permission_map_keeps_last_target_per_source() {
        let mapping = permission_map();
        assert_eq!(
            mapping.target_columns(),
            vec![
                "RoleID",
                "JunctionTable",
                "JunctionColumn",
                "JunctionID",
                "Garden.Email.View",
                "Vanilla.Discussions.View",
                "Vanilla.Discussions.Delete",
                "Garden.Messages.Manage",
                "Garden.Moderation.Manage",
                "Vanilla.Comments.Me",
                "Garden.SignIn.Allow",
                "Garden.Settings.View",
                "Vanilla.Discussions.Add",
                "Conversations.Moderation.Manage",
                "Vanilla.Approval.Require",
                "Vanilla.Comments.Add",
                "Vanilla.Discussions.Edit",
                "Vanilla.Discussions.Sink",
            ]
        );
    }

    #[test]
    fn test_user_registration_date_maps_to_date_inserted() {
        let plan = platform().plan;
        let users = plan.find_table(DestinationTable::User).unwrap();
        let mapping = users.mapping.as_ref().unwrap();
        let entry = mapping.find("RegistrationDate").unwrap();
        assert_eq!(entry.target_column(), "DateInserted");
        assert_eq!(entry.target.filter, Some(Filter::UnixMillis));
        assert!(!mapping.target_columns().contains(&"DateFirstVisit"));
    }

    #[tokio::test]
    async fn test_permission_export() {
        let source = SqliteSource::connect("sqlite::memory:").await.unwrap();
        for sql in [
            "create table roles (id integer, name text, deleted integer, node_id integer)",
            "insert into roles values (1, 'Administrator', 0, 1), (2, 'Guest', 0, 1), (3, 'Old', 1, 1)",
            "create table role_permission (role_id integer, permission text, access_level integer)",
            "insert into role_permission values (1, 'allow_manage_users', 1), (1, 'read_message', 1), (2, 'read_message', 0)",
        ] {
            sqlx::query(sql).execute(source.pool()).await.unwrap();
        }
        let engine = ExportEngine::new(source, SourcePrefix::default());
        let mut session = engine.begin_export("Lithium 14.*", MemoryWriter::new()).unwrap();

        let spec = permissions();
        engine.export_spec(&mut session, &spec).await.unwrap();

        let (_, writer) = engine.end_export(session).unwrap();
        let table = writer.table(DestinationTable::Permission).unwrap();
        let records = table.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["Vanilla.Comments.Me"], &Value::Int(1));
        assert_eq!(records[0]["Vanilla.Discussions.View"], &Value::Int(1));
        assert_eq!(records[1]["Vanilla.Discussions.View"], &Value::Int(0));
        assert_eq!(records[1]["JunctionID"], &Value::Int(-1));
        assert_eq!(table.columns[5].column_type, "tinyint");
    }

    #[tokio::test]
    async fn test_comment_dates_from_millis() {
        let source = SqliteSource::connect("sqlite::memory:").await.unwrap();
        for sql in [
            "create table message2 (unique_id integer, id integer, root_id integer, node_id integer, user_id integer, edit_user integer, body text, post_date integer, edit_date integer, deleted integer)",
            "insert into message2 values
                (500, 1, 1, 10, 7, null, 'Root', 1700000000000, null, 0),
                (501, 2, 1, 10, 8, 8, 'Reply', 1700000060000, 1700000120500, 0)",
        ] {
            sqlx::query(sql).execute(source.pool()).await.unwrap();
        }
        let engine = ExportEngine::new(source, SourcePrefix::default());
        let mut session = engine.begin_export("Lithium 14.*", MemoryWriter::new()).unwrap();
        let spec = comments();
        engine
            .export_table(&mut session, spec.target, &spec.query, spec.mapping.as_ref())
            .await
            .unwrap();

        let comments = session.writer().table(DestinationTable::Comment).unwrap().records();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0]["DiscussionID"], &Value::Int(500));
        assert_eq!(comments[0]["DateInserted"], &Value::from("2023-11-14 22:14:20"));
        assert_eq!(comments[0]["DateUpdated"], &Value::from("2023-11-14 22:15:20"));
    }
}
