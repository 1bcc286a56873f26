pub mod ddl;
pub mod links;
pub mod media;
pub mod metadata;
pub mod sessions;
pub mod tasks;
pub mod users;
