use sea_query::{Expr, PostgresQueryBuilder, Query};
use uuid::Uuid;

use crate::models::User;
use crate::schema::Users;

const COLUMNS: [Users; 4] = [
    Users::Id,
    Users::FirstName,
    Users::LastName,
    Users::Username,
];

/// SELECT id, first_name, last_name, username FROM users WHERE id = ?
pub fn select_by_id(id: Uuid) -> String {
    Query::select()
        .columns(COLUMNS)
        .from(Users::Table)
        .and_where(Expr::col(Users::Id).eq(id))
        .to_string(PostgresQueryBuilder)
}

/// UPDATE users SET first_name = ?, last_name = ?, username = ? WHERE id = ? RETURNING *
pub fn update(user: &User) -> String {
    Query::update()
        .table(Users::Table)
        .values([
            (Users::FirstName, user.first_name.as_str().into()),
            (Users::LastName, user.last_name.as_str().into()),
            (Users::Username, user.username.as_str().into()),
        ])
        .and_where(Expr::col(Users::Id).eq(user.id))
        .returning_all()
        .to_string(PostgresQueryBuilder)
}
