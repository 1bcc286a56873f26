use sea_query::Iden;

/// Metadata table - key-value store for database configuration
#[derive(Iden)]
pub enum Metadata {
    Table,
    Key,
    Value,
}

/// Tasks table - practice goals owned by a user
#[derive(Iden)]
pub enum Tasks {
    Table,
    Id,
    UserId,
    Title,
    TargetBpm,
    IsCompleted,
    CreatedAt,
}

/// Sessions table - practice attempts, immutable once inserted
#[derive(Iden)]
pub enum Sessions {
    Table,
    Id,
    TaskId,
    Bpm,
    Note,
    Confidence,
    StartTime,
    EndTime,
}

/// Media table - confirmed uploads; payload lives in the object store
#[derive(Iden)]
pub enum Media {
    Table,
    Id,
    TaskId,
    #[iden = "type"]
    MediaType,
    Filename,
    Size,
    Duration,
    CreatedAt,
}

/// Links table - external references attached to a task
#[derive(Iden)]
pub enum Links {
    Table,
    Id,
    TaskId,
    Url,
    Title,
    #[iden = "type"]
    LinkType,
    CreatedAt,
}

/// Users table - profile fields; accounts are provisioned by the auth service
#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    FirstName,
    LastName,
    Username,
}
