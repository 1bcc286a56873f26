use sea_query::{Expr, Order, PostgresQueryBuilder, Query};
use uuid::Uuid;

use crate::models::Task;
use crate::schema::Tasks;

const COLUMNS: [Tasks; 6] = [
    Tasks::Id,
    Tasks::UserId,
    Tasks::Title,
    Tasks::TargetBpm,
    Tasks::IsCompleted,
    Tasks::CreatedAt,
];

/// SELECT ... FROM tasks WHERE user_id = ? AND is_completed = ? ORDER BY created_at DESC
pub fn select_by_user(user_id: Uuid, is_completed: bool) -> String {
    Query::select()
        .columns(COLUMNS)
        .from(Tasks::Table)
        .and_where(Expr::col(Tasks::UserId).eq(user_id))
        .and_where(Expr::col(Tasks::IsCompleted).eq(is_completed))
        .order_by(Tasks::CreatedAt, Order::Desc)
        .to_string(PostgresQueryBuilder)
}

/// SELECT ... FROM tasks WHERE id = ?
pub fn select_by_id(id: Uuid) -> String {
    Query::select()
        .columns(COLUMNS)
        .from(Tasks::Table)
        .and_where(Expr::col(Tasks::Id).eq(id))
        .to_string(PostgresQueryBuilder)
}

/// INSERT INTO tasks (id, user_id, title, target_bpm, is_completed, created_at) VALUES (...) RETURNING *
pub fn insert(task: &Task) -> String {
    Query::insert()
        .into_table(Tasks::Table)
        .columns(COLUMNS)
        .values_panic([
            task.id.into(),
            task.user_id.into(),
            task.title.as_str().into(),
            task.target_bpm.into(),
            task.is_completed.into(),
            task.created_at.into(),
        ])
        .returning_all()
        .to_string(PostgresQueryBuilder)
}

/// UPDATE tasks SET title = ?, target_bpm = ?, is_completed = ? WHERE id = ? AND user_id = ? RETURNING *
pub fn update(task: &Task) -> String {
    Query::update()
        .table(Tasks::Table)
        .values([
            (Tasks::Title, task.title.as_str().into()),
            (Tasks::TargetBpm, task.target_bpm.into()),
            (Tasks::IsCompleted, task.is_completed.into()),
        ])
        .and_where(Expr::col(Tasks::Id).eq(task.id))
        .and_where(Expr::col(Tasks::UserId).eq(task.user_id))
        .returning_all()
        .to_string(PostgresQueryBuilder)
}
