mod config;
mod database;
mod error;
mod server;
mod timing;

use std::sync::Arc;

use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use r2d2_sqlite::SqliteConnectionManager;
use server::server::Server;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use config::Config;
use database::sqlite::SqliteDatabase;

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(err) = run().await {
        error!("{}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let manager = SqliteConnectionManager::file(&config.database);
    let pool = r2d2::Pool::builder().build(manager)?;
    SqliteDatabase::create_tables(&pool.get()?)?;
    let pool = Arc::new(pool);

    let server = Server::setup(pool, config.timezone);

    let listener = TcpListener::bind(("127.0.0.1", config.port)).await?;
    info!(port = config.port, timezone = %config.timezone, "Listening");

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                error!("Could not accept connection.\n{}", err);
                continue;
            }
        };
        let io = TokioIo::new(stream);
        let server_clone = server.clone();
        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(io, server_clone)
                .await
            {
                error!("{}", err);
            }
        });
    }
}
