use std::convert::Infallible;
use std::sync::Arc;

use actix_web::{get, post, web, HttpResponse};
use bytes::Bytes;
use futures::stream;
use tokio::sync::mpsc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::AppError;
use crate::messaging;
use crate::models::{Conversation, DirectMessage};
use crate::realtime::{self, Invalidation, Subscription};
use crate::session::Session;
use crate::state::AppState;
use crate::types::SendMessageRequest;

#[utoipa::path(
    context_path = "/conversations",
    tag = "messaging",
    responses((status = 200, description = "Most recent activity first", body = Vec<Conversation>))
)]
#[get("")]
async fn list_conversations(
    app_state: web::Data<Arc<AppState>>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let conversations =
        messaging::conversations(app_state.store.as_ref(), session.user_id()).await?;
    Ok(HttpResponse::Ok().json(conversations))
}

#[utoipa::path(
    context_path = "/conversations",
    tag = "messaging",
    responses((status = 201, body = Conversation))
)]
#[post("")]
async fn create_conversation(
    app_state: web::Data<Arc<AppState>>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let conversation =
        messaging::open_conversation(app_state.store.as_ref(), session.user_id()).await?;
    Ok(HttpResponse::Created().json(conversation))
}

#[utoipa::path(
    context_path = "/conversations",
    tag = "messaging",
    params(("id" = Uuid, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Oldest first", body = Vec<DirectMessage>),
        (status = 404, description = "Unknown, or the caller is not a participant")
    )
)]
#[get("/{id}/messages")]
async fn list_messages(
    app_state: web::Data<Arc<AppState>>,
    session: Session,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let messages =
        messaging::thread(app_state.store.as_ref(), path.into_inner(), session.user_id()).await?;
    Ok(HttpResponse::Ok().json(messages))
}

#[utoipa::path(
    context_path = "/conversations",
    tag = "messaging",
    params(("id" = Uuid, Path, description = "Conversation id")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, body = DirectMessage),
        (status = 422, description = "Empty message, or nobody to send it to yet")
    )
)]
#[post("/{id}/messages")]
async fn send_message(
    app_state: web::Data<Arc<AppState>>,
    session: Session,
    path: web::Path<Uuid>,
    req_body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let message = messaging::send_message(
        app_state.store.as_ref(),
        path.into_inner(),
        session.user_id(),
        &req_body.message,
    )
    .await?;
    Ok(HttpResponse::Created().json(message))
}

/// Server-sent invalidations for the caller's conversation list and inbox.
#[utoipa::path(
    context_path = "/conversations",
    tag = "messaging",
    responses((status = 200, description = "text/event-stream of invalidations"))
)]
#[get("/events")]
async fn conversation_events(
    app_state: web::Data<Arc<AppState>>,
    session: Session,
) -> HttpResponse {
    let user_id = session.user_id();
    let mut subscriptions = Subscription::conversations_of(user_id);
    subscriptions.push(Subscription::inbox_of(user_id));

    debug!("Opening event stream for {}", user_id);
    let invalidations = realtime::watch(
        app_state.feed.clone(),
        subscriptions,
        app_state.config.backoff(),
    );
    event_stream(invalidations)
}

/// Server-sent invalidations for one open thread.
#[utoipa::path(
    context_path = "/conversations",
    tag = "messaging",
    params(("id" = Uuid, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "text/event-stream of invalidations"),
        (status = 404, description = "Unknown, or the caller is not a participant")
    )
)]
#[get("/{id}/events")]
async fn thread_events(
    app_state: web::Data<Arc<AppState>>,
    session: Session,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let conversation =
        messaging::conversation_for(app_state.store.as_ref(), path.into_inner(), session.user_id())
            .await?;

    let invalidations = realtime::watch(
        app_state.feed.clone(),
        vec![Subscription::thread(conversation.id)],
        app_state.config.backoff(),
    );
    Ok(event_stream(invalidations))
}

/// The watcher lives as long as the response body: when the client goes
/// away actix drops the stream, the receiver with it, and the watcher stops.
fn event_stream(invalidations: mpsc::Receiver<Invalidation>) -> HttpResponse {
    let body = stream::unfold(invalidations, |mut invalidations| async move {
        let invalidation = invalidations.recv().await?;
        let data = match serde_json::to_string(&invalidation) {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to encode invalidation: {:?}", e);
                r#"{"invalidate":"resync"}"#.to_string()
            }
        };
        let frame = format!("event: invalidate\ndata: {}\n\n", data);
        Some((Ok::<_, Infallible>(Bytes::from(frame)), invalidations))
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(body)
}
