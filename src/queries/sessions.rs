use sea_query::{Expr, Order, PostgresQueryBuilder, Query};
use uuid::Uuid;

use crate::models::Session;
use crate::schema::Sessions;

const COLUMNS: [Sessions; 7] = [
    Sessions::Id,
    Sessions::TaskId,
    Sessions::Bpm,
    Sessions::Note,
    Sessions::Confidence,
    Sessions::StartTime,
    Sessions::EndTime,
];

/// SELECT ... FROM sessions WHERE task_id = ? ORDER BY start_time
pub fn select_by_task(task_id: Uuid) -> String {
    Query::select()
        .columns(COLUMNS)
        .from(Sessions::Table)
        .and_where(Expr::col(Sessions::TaskId).eq(task_id))
        .order_by(Sessions::StartTime, Order::Asc)
        .to_string(PostgresQueryBuilder)
}

/// SELECT ... FROM sessions WHERE id = ?
pub fn select_by_id(id: Uuid) -> String {
    Query::select()
        .columns(COLUMNS)
        .from(Sessions::Table)
        .and_where(Expr::col(Sessions::Id).eq(id))
        .to_string(PostgresQueryBuilder)
}

/// INSERT INTO sessions (...) VALUES (...) RETURNING *
pub fn insert(session: &Session) -> String {
    Query::insert()
        .into_table(Sessions::Table)
        .columns(COLUMNS)
        .values_panic([
            session.id.into(),
            session.task_id.into(),
            session.bpm.into(),
            session.note.as_str().into(),
            session.confidence.into(),
            session.start_time.into(),
            session.end_time.into(),
        ])
        .returning_all()
        .to_string(PostgresQueryBuilder)
}
