use sea_query::{ColumnDef, Expr, ForeignKey, ForeignKeyAction, Index, PostgresQueryBuilder, Table};

use crate::schema::{Links, Media, Metadata, Sessions, Tasks, Users};

/// CREATE TABLE IF NOT EXISTS metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)
pub fn create_metadata_table() -> String {
    Table::create()
        .table(Metadata::Table)
        .if_not_exists()
        .col(ColumnDef::new(Metadata::Key).string().primary_key())
        .col(ColumnDef::new(Metadata::Value).string().not_null())
        .to_string(PostgresQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS users (id UUID PRIMARY KEY, first_name, last_name, username VARCHAR(50))
pub fn create_users_table() -> String {
    Table::create()
        .table(Users::Table)
        .if_not_exists()
        .col(ColumnDef::new(Users::Id).uuid().primary_key())
        .col(ColumnDef::new(Users::FirstName).string_len(50).not_null().default(""))
        .col(ColumnDef::new(Users::LastName).string_len(50).not_null().default(""))
        .col(ColumnDef::new(Users::Username).string_len(50).not_null().default(""))
        .to_string(PostgresQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS tasks (
///     id UUID PRIMARY KEY,
///     user_id UUID NOT NULL,
///     title VARCHAR NOT NULL,
///     target_bpm INTEGER NOT NULL,
///     is_completed BOOL NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT now()
/// )
pub fn create_tasks_table() -> String {
    Table::create()
        .table(Tasks::Table)
        .if_not_exists()
        .col(ColumnDef::new(Tasks::Id).uuid().primary_key())
        .col(ColumnDef::new(Tasks::UserId).uuid().not_null())
        .col(ColumnDef::new(Tasks::Title).string().not_null())
        .col(ColumnDef::new(Tasks::TargetBpm).integer().not_null())
        .col(
            ColumnDef::new(Tasks::IsCompleted)
                .boolean()
                .not_null()
                .default(false),
        )
        .col(
            ColumnDef::new(Tasks::CreatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .to_string(PostgresQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS sessions (..., task_id UUID REFERENCES tasks(id) ON DELETE CASCADE)
pub fn create_sessions_table() -> String {
    Table::create()
        .table(Sessions::Table)
        .if_not_exists()
        .col(ColumnDef::new(Sessions::Id).uuid().primary_key())
        .col(ColumnDef::new(Sessions::TaskId).uuid().not_null())
        .col(ColumnDef::new(Sessions::Bpm).integer().not_null())
        .col(ColumnDef::new(Sessions::Note).text().not_null().default(""))
        .col(ColumnDef::new(Sessions::Confidence).integer().not_null())
        .col(
            ColumnDef::new(Sessions::StartTime)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(Sessions::EndTime)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .from(Sessions::Table, Sessions::TaskId)
                .to(Tasks::Table, Tasks::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_string(PostgresQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS media (..., task_id UUID REFERENCES tasks(id) ON DELETE CASCADE)
pub fn create_media_table() -> String {
    Table::create()
        .table(Media::Table)
        .if_not_exists()
        .col(ColumnDef::new(Media::Id).uuid().primary_key())
        .col(ColumnDef::new(Media::TaskId).uuid().not_null())
        .col(ColumnDef::new(Media::MediaType).string().not_null())
        .col(ColumnDef::new(Media::Filename).string().not_null())
        .col(ColumnDef::new(Media::Size).big_integer().not_null())
        .col(ColumnDef::new(Media::Duration).integer().not_null())
        .col(
            ColumnDef::new(Media::CreatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .foreign_key(
            ForeignKey::create()
                .from(Media::Table, Media::TaskId)
                .to(Tasks::Table, Tasks::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_string(PostgresQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS links (..., task_id UUID REFERENCES tasks(id) ON DELETE CASCADE)
pub fn create_links_table() -> String {
    Table::create()
        .table(Links::Table)
        .if_not_exists()
        .col(ColumnDef::new(Links::Id).uuid().primary_key())
        .col(ColumnDef::new(Links::TaskId).uuid().not_null())
        .col(ColumnDef::new(Links::Url).text().not_null())
        .col(ColumnDef::new(Links::Title).string().not_null())
        .col(ColumnDef::new(Links::LinkType).string().not_null())
        .col(
            ColumnDef::new(Links::CreatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .foreign_key(
            ForeignKey::create()
                .from(Links::Table, Links::TaskId)
                .to(Tasks::Table, Tasks::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_string(PostgresQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_tasks_user_completed ON tasks(user_id, is_completed)
pub fn create_tasks_user_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_tasks_user_completed")
        .table(Tasks::Table)
        .col(Tasks::UserId)
        .col(Tasks::IsCompleted)
        .to_string(PostgresQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_sessions_task_id ON sessions(task_id)
pub fn create_sessions_task_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_sessions_task_id")
        .table(Sessions::Table)
        .col(Sessions::TaskId)
        .to_string(PostgresQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_media_task_id ON media(task_id)
pub fn create_media_task_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_media_task_id")
        .table(Media::Table)
        .col(Media::TaskId)
        .to_string(PostgresQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_links_task_id ON links(task_id)
pub fn create_links_task_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_links_task_id")
        .table(Links::Table)
        .col(Links::TaskId)
        .to_string(PostgresQueryBuilder)
}

/// All schema statements in dependency order
pub fn all_statements() -> Vec<String> {
    vec![
        create_metadata_table(),
        create_users_table(),
        create_tasks_table(),
        create_sessions_table(),
        create_media_table(),
        create_links_table(),
        create_tasks_user_index(),
        create_sessions_task_index(),
        create_media_task_index(),
        create_links_task_index(),
    ]
}
