use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc as StdArc;
use std::time::Duration;

use trackmus::avatar::AvatarService;
use trackmus::config::ApiConfig;
use trackmus::constants::CLEANUP_SHUTDOWN_TIMEOUT;
use trackmus::credentials::{get_password, load_credentials, CredentialType, Credentials};
use trackmus::db::{create_database_if_not_exists, init_schema, open_postgres_connection, PgRepository};
use trackmus::media::{MediaCoordinator, MediaSettings};
use trackmus::object_store::{ObjectStore, S3Store};
use trackmus::serve::{run_server, AppState};
use trackmus::service::TaskService;
use trackmus::user::UserService;

#[derive(Parser, Debug)]
#[command(author, version, about = "Practice tracker API server")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API
    Serve {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Create the database if needed and apply the schema
    InitDb {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match args.command {
        Command::Serve { config } => serve(&config),
        Command::InitDb { config } => init_db(&config),
    }
}

fn load(config_path: &Path) -> Result<(ApiConfig, Option<Credentials>), Box<dyn std::error::Error>> {
    let config = ApiConfig::load(config_path)?;
    let credentials = load_credentials()?;
    Ok((config, credentials))
}

fn init_db(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (config, credentials) = load(config_path)?;
    let pg = &config.postgres;
    let password = get_password(&credentials, CredentialType::Postgres, &pg.credential_profile)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        create_database_if_not_exists(&pg.url, &password, &pg.database).await?;
        let pool = open_postgres_connection(&pg.url, &password, &pg.database, 1).await?;
        init_schema(&pool).await?;
        info!("Schema ready in database '{}'", pg.database);
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

fn serve(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (config, credentials) = load(config_path)?;
    let pg = &config.postgres;
    let os = &config.object_store;
    let pg_password = get_password(&credentials, CredentialType::Postgres, &pg.credential_profile)?;
    let secret_key = get_password(&credentials, CredentialType::ObjectStore, &os.credential_profile)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let pool =
            open_postgres_connection(&pg.url, &pg_password, &pg.database, pg.max_connections)
                .await?;
        init_schema(&pool).await?;
        let repo = StdArc::new(PgRepository::new(pool));

        let store: StdArc<dyn ObjectStore> =
            StdArc::new(S3Store::new(&os.endpoint, &os.region, &os.access_key, &secret_key)?);
        store.ensure_bucket(&os.media_bucket).await?;
        store.ensure_bucket(&os.avatar_bucket).await?;

        let settings = MediaSettings::from_config(os, &config.media);
        info!(
            "Media bucket '{}', avatar bucket '{}', presigned URLs valid for {}s",
            settings.bucket, os.avatar_bucket, os.presign_ttl_secs
        );
        let (media, cleanup) = MediaCoordinator::new(repo.clone(), store.clone(), settings);

        let avatars = StdArc::new(AvatarService::new(
            store,
            os.avatar_bucket.clone(),
            Duration::from_secs(os.presign_ttl_secs),
        ));
        let state = StdArc::new(AppState {
            tasks: TaskService::new(repo.clone(), repo.clone(), repo.clone(), StdArc::new(media)),
            users: UserService::new(repo, avatars.clone()),
            avatars,
        });

        // The router owns the state; the cleanup queue closes once it is dropped
        run_server(state, config.server.port).await?;
        cleanup.shutdown(CLEANUP_SHUTDOWN_TIMEOUT).await;
        info!("Server stopped");

        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
