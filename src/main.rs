use anyhow::Result;
use axum::extract::{Form, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use listabot::bot::{self, Services};
use listabot::db::{self, PgListingStore};
use listabot::drive::GoogleDrive;
use listabot::parser::OpenAiParser;
use listabot::session::SessionStore;
use listabot::twilio::TwilioClient;
use listabot::{inbound, reply};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting Listabot WhatsApp Bot");

    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Required configuration; all of it is validated before the server starts
    let account_sid = env::var("TWILIO_ACCOUNT_SID").expect("TWILIO_ACCOUNT_SID must be set");
    let auth_token = env::var("TWILIO_AUTH_TOKEN").expect("TWILIO_AUTH_TOKEN must be set");
    let phone_number = env::var("TWILIO_PHONE_NUMBER").expect("TWILIO_PHONE_NUMBER must be set");
    let openai_key = env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set");
    let drive_token = env::var("DRIVE_ACCESS_TOKEN").expect("DRIVE_ACCESS_TOKEN must be set");
    let drive_root = env::var("DRIVE_ROOT_FOLDER_ID").expect("DRIVE_ROOT_FOLDER_ID must be set");
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let openai_model = env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let staging_root = env::var("STAGING_ROOT").unwrap_or_else(|_| "staging".to_string());

    info!("Connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    db::init_schema(&pool).await?;

    let services = Arc::new(Services {
        sessions: SessionStore::new(),
        parser: Arc::new(OpenAiParser::from_config(openai_key, openai_model)),
        drive: Arc::new(GoogleDrive::from_config(drive_token)),
        listings: Arc::new(PgListingStore::new(pool)),
        messenger: Arc::new(TwilioClient::from_config(
            account_sid,
            auth_token,
            phone_number,
        )),
        drive_root_folder: drive_root,
        staging_root: PathBuf::from(staging_root),
    });

    let app = Router::new()
        .route("/webhook", post(webhook))
        .route("/listings", get(listings))
        .with_state(services);

    info!(addr = %bind_addr, "Listening for webhook deliveries");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Twilio webhook: one delivery in, one TwiML envelope out. Never errors.
async fn webhook(
    State(services): State<Arc<Services>>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let body = match inbound::normalize(&form) {
        Some(msg) => bot::handle_incoming(&services, msg).await,
        None => {
            error!("webhook delivery without sender id dropped");
            None
        }
    };

    (
        [(header::CONTENT_TYPE, "application/xml")],
        reply::message_response(body.as_deref()),
    )
}

/// All persisted listings as JSON, or an error object on failure.
async fn listings(State(services): State<Arc<Services>>) -> impl IntoResponse {
    match services.listings.list_all().await {
        Ok(rows) => Json(json!(rows)),
        Err(e) => {
            error!(error = ?e, "failed to fetch listings");
            Json(json!({ "error": "failed to fetch listings" }))
        }
    }
}
