use std::sync::Arc;

use actix_cors::Cors;
use actix_web::web;
use shuttle_actix_web::ShuttleActixWeb;
use shuttle_runtime::SecretStore;
use tracing::info;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

mod auth;
mod config;
mod error;
mod intake;
mod inventory;
mod messaging;
mod middleware;
mod models;
mod notify;
mod realtime;
mod routes;
mod session;
mod state;
mod store;
mod triage;
mod types;

use crate::auth::JwtKeys;
use crate::config::AppConfig;
use crate::middleware::auth::Authentication;
use crate::routes::ApiDoc;
use crate::state::AppState;
use crate::store::{ChangeFeed, EntityStore, MemoryStore, PgStore};

#[shuttle_runtime::main]
async fn main(
    #[shuttle_runtime::Secrets] secret_store: SecretStore,
) -> ShuttleActixWeb<impl FnOnce(&mut web::ServiceConfig) + Send + Clone + 'static> {
    let config = AppConfig::new(&secret_store)?;

    let (store, feed): (Arc<dyn EntityStore>, Arc<dyn ChangeFeed>) = if config.uses_memory_store()
    {
        info!("Using the in-memory store; nothing will be persisted");
        let memory = MemoryStore::new();
        (Arc::new(memory.clone()), Arc::new(memory))
    } else {
        let pg = PgStore::connect(&config.database_url, config.store_timeout).await?;
        info!("Connected to Postgres");
        (Arc::new(pg.clone()), Arc::new(pg))
    };

    info!(
        "Lead transitions: {}, store timeout: {:?}",
        config.lead_transitions, config.store_timeout
    );

    let keys = Arc::new(JwtKeys::new(config.jwt_secret.as_bytes()));
    let app_state = Arc::new(AppState::new(config, store, feed));

    let config = move |cfg: &mut web::ServiceConfig| {
        cfg.service(Scalar::with_url("/scalar", ApiDoc::openapi()));
        cfg.service(
            web::scope("")
                .wrap(Authentication { keys })
                .wrap(Cors::permissive())
                .app_data(web::Data::new(app_state))
                .configure(routes::configure),
        );
    };

    Ok(config.into())
}
