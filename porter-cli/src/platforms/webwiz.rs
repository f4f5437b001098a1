//! Web Wiz Forums

use crate::porter::{
    Column, ConversationSource, DestinationTable, ExportPlan, Filter, MappingTable, QueryTemplate,
    TableExportSpec,
};

use super::{Feature, PlatformExportSpec};

pub fn platform() -> PlatformExportSpec {
    PlatformExportSpec {
        id: "webwiz",
        name: "Web Wiz Forums",
        default_prefix: "tbl",
        probe_table: "Topic",
        features: vec![
            Feature::Comments,
            Feature::Discussions,
            Feature::Users,
            Feature::Categories,
            Feature::Roles,
            Feature::Avatars,
            Feature::PrivateMessages,
            Feature::Signatures,
            Feature::Passwords,
        ],
        plan: plan(),
    }
}

fn plan() -> ExportPlan {
    ExportPlan::new()
        .table(users())
        .table(roles())
        .table(user_roles())
        .table(signatures())
        .table(categories())
        .table(discussions())
        .table(comments())
        .conversations(
            private_messages(),
            vec![conversations(), user_conversations(), conversation_messages()],
        )
}

fn users() -> TableExportSpec {
    let mapping = MappingTable::new()
        .map("Author_ID", "UserID")
        .column("Username", Column::new("Name").filter(Filter::HtmlDecode))
        .column(
            "Real_name",
            Column::new("FullName")
                .target_type("varchar(50)")
                .filter(Filter::HtmlDecode),
        )
        .map("Password2", "Password")
        .map("HashMethod", "HashMethod")
        .map("Gender2", "Gender")
        .map("Author_email", "Email")
        .column("Photo2", Column::new("Photo").filter(Filter::HtmlDecode))
        .map("Login_IP", "LastIPAddress")
        .map("Banned", "Banned")
        .map("Join_date", "DateInserted")
        .map("Last_visit", "DateLastActive")
        .column("Location", Column::new("Location").filter(Filter::HtmlDecode))
        .map("DOB", "DateOfBirth")
        .map("Show_email", "ShowEmail");

    TableExportSpec::new(
        DestinationTable::User,
        "
        select
            u.Salt || '$' || u.Password as Password2,
            case u.Gender when 'Male' then 'm' when 'Female' then 'f' else 'u' end as Gender2,
            case
                when u.Avatar like 'http%' then u.Avatar
                when u.Avatar > '' then 'webwiz/' || u.Avatar
                else null
            end as Photo2,
            'webwiz' as HashMethod,
            u.*
        from :_Author u
        ",
        mapping,
    )
}

fn roles() -> TableExportSpec {
    TableExportSpec::new(
        DestinationTable::Role,
        "select * from :_Group",
        MappingTable::new().map("Group_ID", "RoleID").map("Name", "Name"),
    )
}

fn user_roles() -> TableExportSpec {
    TableExportSpec::new(
        DestinationTable::UserRole,
        "select u.* from :_Author u",
        MappingTable::new()
            .map("Author_ID", "UserID")
            .map("Group_ID", "RoleID"),
    )
}

fn signatures() -> TableExportSpec {
    TableExportSpec::passthrough(
        DestinationTable::UserMeta,
        "
        select
            Author_ID as UserID,
            'Plugin.Signatures.Sig' as \"Name\",
            Signature as \"Value\"
        from :_Author
        where Signature <> ''
        ",
    )
}

/// Forums become categories; WebWiz categories become parents with id `Cat_ID * 1000`
fn categories() -> TableExportSpec {
    TableExportSpec::new(
        DestinationTable::Category,
        "
        select
            f.Forum_ID,
            f.Cat_ID * 1000 as Parent_ID,
            f.Forum_order,
            f.Forum_name,
            f.Forum_description
        from :_Forum f

        union all

        select
            c.Cat_ID * 1000,
            null,
            c.Cat_order,
            c.Cat_name,
            null
        from :_Category c
        ",
        MappingTable::new()
            .map("Forum_ID", "CategoryID")
            .map("Forum_name", "Name")
            .map("Forum_description", "Description")
            .map("Parent_ID", "ParentCategoryID")
            .map("Forum_order", "Sort"),
    )
}

fn discussions() -> TableExportSpec {
    let mapping = MappingTable::new()
        .map("Topic_ID", "DiscussionID")
        .map("Forum_ID", "CategoryID")
        .map("Author_ID", "InsertUserID")
        .column("Subject", Column::new("Name").filter(Filter::HtmlDecode))
        .map("IP_addr", "InsertIPAddress")
        .map("Message", "Body")
        .map("Format", "Format")
        .map("Message_date", "DateInserted")
        .map("No_of_views", "CountViews")
        .map("Locked", "Closed");

    TableExportSpec::new(
        DestinationTable::Discussion,
        "
        select
            th.Author_ID,
            th.Message,
            th.Message_date,
            th.IP_addr,
            'Html' as Format,
            t.*
        from :_Topic t
        join :_Thread th
            on t.Start_Thread_ID = th.Thread_ID
        ",
        mapping,
    )
}

fn comments() -> TableExportSpec {
    TableExportSpec::new(
        DestinationTable::Comment,
        "
        select
            th.*,
            'Html' as Format
        from :_Thread th
        join :_Topic t
            on t.Topic_ID = th.Topic_ID
        where th.Thread_ID <> t.Start_Thread_ID
        ",
        MappingTable::new()
            .map("Thread_ID", "CommentID")
            .map("Topic_ID", "DiscussionID")
            .map("Author_ID", "InsertUserID")
            .map("IP_addr", "InsertIPAddress")
            .map("Message", "Body")
            .map("Format", "Format")
            .map("Message_date", "DateInserted"),
    )
}

/// Each PM row names its recipient (`Author_ID`) and sender (`From_ID`)
fn private_messages() -> ConversationSource {
    ConversationSource {
        query: QueryTemplate::new("select PM_ID, PM_Tittle, Author_ID, From_ID from :_PMMessage"),
        id_column: "PM_ID".into(),
        subject_column: "PM_Tittle".into(),
        participant_columns: vec!["Author_ID".into(), "From_ID".into()],
        parent_column: None,
    }
}

fn conversations() -> TableExportSpec {
    TableExportSpec::new(
        DestinationTable::Conversation,
        "
        select
            pm.*,
            g.Title
        from :_PMMessage pm
        join z_pmgroup g
            on pm.PM_ID = g.Group_ID
        ",
        MappingTable::new()
            .map("PM_ID", "ConversationID")
            .column("Title", Column::new("Subject").target_type("varchar(255)"))
            .map("Author_ID", "InsertUserID")
            .map("PM_Message_Date", "DateInserted"),
    )
}

fn user_conversations() -> TableExportSpec {
    TableExportSpec::new(
        DestinationTable::UserConversation,
        "
        select
            g.Group_ID,
            t.User_ID
        from z_pmto t
        join z_pmgroup g
            on g.Group_ID = t.PM_ID
        ",
        MappingTable::new()
            .map("Group_ID", "ConversationID")
            .map("User_ID", "UserID"),
    )
}

fn conversation_messages() -> TableExportSpec {
    TableExportSpec::new(
        DestinationTable::ConversationMessage,
        "
        select
            pm.*,
            pm2.Group_ID,
            'Html' as Format
        from :_PMMessage pm
        join z_pmtext pm2
            on pm.PM_ID = pm2.PM_ID
        ",
        MappingTable::new()
            .map("Group_ID", "ConversationID")
            .map("PM_ID", "MessageID")
            .map("PM_Message", "Body")
            .map("Format", "Format")
            .map("PM_Message_Date", "DateInserted")
            .map("Author_ID", "InsertUserID"),
    )
}
