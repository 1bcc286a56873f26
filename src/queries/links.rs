use sea_query::{Expr, Order, PostgresQueryBuilder, Query};
use uuid::Uuid;

use crate::models::Link;
use crate::schema::Links;

const COLUMNS: [Links; 6] = [
    Links::Id,
    Links::TaskId,
    Links::Url,
    Links::Title,
    Links::LinkType,
    Links::CreatedAt,
];

/// SELECT ... FROM links WHERE task_id = ? ORDER BY created_at
pub fn select_by_task(task_id: Uuid) -> String {
    Query::select()
        .columns(COLUMNS)
        .from(Links::Table)
        .and_where(Expr::col(Links::TaskId).eq(task_id))
        .order_by(Links::CreatedAt, Order::Asc)
        .to_string(PostgresQueryBuilder)
}

/// INSERT INTO links (...) VALUES (...) RETURNING *
pub fn insert(link: &Link) -> String {
    Query::insert()
        .into_table(Links::Table)
        .columns(COLUMNS)
        .values_panic([
            link.id.into(),
            link.task_id.into(),
            link.url.as_str().into(),
            link.title.as_str().into(),
            link.link_type.as_str().into(),
            link.created_at.into(),
        ])
        .returning_all()
        .to_string(PostgresQueryBuilder)
}

/// DELETE FROM links WHERE id = ?
pub fn delete(id: Uuid) -> String {
    Query::delete()
        .from_table(Links::Table)
        .and_where(Expr::col(Links::Id).eq(id))
        .to_string(PostgresQueryBuilder)
}
