use anyhow::Context;
use poem::{Server, listener::TcpListener};
use sqlx::postgres::PgPoolOptions;
use tokio::main;

use mailing::{
    application::services::transport::MailTransport,
    config::Config,
    infrastructure::{
        mail::{log::LogTransport, smtp::SmtpTransport},
        repositories::Stores,
    },
    logging,
    presentation::http::{build_app, endpoints::root::ApiState},
};

#[main]
async fn main() -> anyhow::Result<()> {
    let config = Config::try_parse().context("invalid configuration")?;
    logging::init(config.log_format);

    let stores = match &config.database {
        Some(database) => {
            let pool = PgPoolOptions::new()
                .max_connections(database.max_connections)
                .connect(&database.url)
                .await
                .context("failed to connect to postgres")?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("failed to run migrations")?;
            tracing::info!("using postgres storage");
            Stores::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, data is kept in memory only");
            Stores::in_memory()
        }
    };

    let transport: std::sync::Arc<dyn MailTransport> = match config.smtp.clone() {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "sending through smtp relay");
            SmtpTransport::new(smtp, config.dispatch.concurrency as u32)?
        }
        None => {
            tracing::warn!("SMTP_HOST is not set, messages are written to the log");
            LogTransport::new()
        }
    };

    let server_url = config.server_url();
    tracing::info!(%server_url, "starting server");

    let state = ApiState::new(stores, transport, config.dispatch);
    let app = build_app(state, &server_url);

    Server::new(TcpListener::bind(format!("localhost:{}", config.port)))
        .run(app)
        .await
        .context("http server failed")
}
