use sea_query::{Expr, Order, PostgresQueryBuilder, Query};
use uuid::Uuid;

use crate::models::Media as MediaRow;
use crate::schema::Media;

const COLUMNS: [Media; 7] = [
    Media::Id,
    Media::TaskId,
    Media::MediaType,
    Media::Filename,
    Media::Size,
    Media::Duration,
    Media::CreatedAt,
];

/// SELECT ... FROM media WHERE task_id = ? ORDER BY created_at
pub fn select_by_task(task_id: Uuid) -> String {
    Query::select()
        .columns(COLUMNS)
        .from(Media::Table)
        .and_where(Expr::col(Media::TaskId).eq(task_id))
        .order_by(Media::CreatedAt, Order::Asc)
        .to_string(PostgresQueryBuilder)
}

/// SELECT ... FROM media WHERE id = ?
pub fn select_by_id(id: Uuid) -> String {
    Query::select()
        .columns(COLUMNS)
        .from(Media::Table)
        .and_where(Expr::col(Media::Id).eq(id))
        .to_string(PostgresQueryBuilder)
}

/// INSERT INTO media (...) VALUES (...) RETURNING *
pub fn insert(media: &MediaRow) -> String {
    Query::insert()
        .into_table(Media::Table)
        .columns(COLUMNS)
        .values_panic([
            media.id.into(),
            media.task_id.into(),
            media.media_type.as_str().into(),
            media.filename.as_str().into(),
            media.size.into(),
            media.duration.into(),
            media.created_at.into(),
        ])
        .returning_all()
        .to_string(PostgresQueryBuilder)
}

/// DELETE FROM media WHERE id = ?
pub fn delete(id: Uuid) -> String {
    Query::delete()
        .from_table(Media::Table)
        .and_where(Expr::col(Media::Id).eq(id))
        .to_string(PostgresQueryBuilder)
}

/// DELETE FROM media WHERE id IN (...)
pub fn delete_batch(ids: &[Uuid]) -> String {
    Query::delete()
        .from_table(Media::Table)
        .and_where(Expr::col(Media::Id).is_in(ids.iter().copied()))
        .to_string(PostgresQueryBuilder)
}
