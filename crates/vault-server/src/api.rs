use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        DefaultBodyLimit, Path, Query, State,
    },
    http::{HeaderMap, Method},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use vault_ledger::{ChainReport, Ledger};
use vault_shared::encoding::{base64_bytes, base64_opt};
use vault_shared::protocol::{
    Appended, Attachment, AttachmentMeta, ChainMessage, ChainTail, NewAttachment, NewMessage,
    Receipt, User,
};
use vault_shared::types::{AttachmentId, ConversationId, KeyId, MessageId, UserId};

use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub config: Arc<ServerConfig>,
}

type ApiResult<T> = Result<Json<T>, ServerError>;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/users", post(register_user))
        .route("/users/:id", get(get_user))
        .route("/users/:id/conversations", get(user_conversations))
        .route("/conversations", post(create_conversation))
        .route(
            "/conversations/:id/participants",
            get(list_participants).post(add_participant),
        )
        .route(
            "/conversations/:id/messages",
            get(list_messages).post(append_message),
        )
        .route("/conversations/:id/tail", get(chain_tail))
        .route("/conversations/:id/messages/last-hash", get(last_hash))
        .route("/messages/:id/read", get(read_state).post(mark_read))
        .route("/messages/:id/delivered", post(mark_delivered))
        .route("/messages/:id/status", get(message_status))
        .route(
            "/messages/:id/attachments",
            get(list_attachments).post(add_attachment),
        )
        .route("/attachments/:id", get(get_attachment))
        .route("/admin/conversations/:id/verify", get(admin_verify_chain))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
struct RegisterRequest {
    #[serde(with = "base64_bytes")]
    public_key: Vec<u8>,
    #[serde(with = "base64_bytes")]
    fingerprint: Vec<u8>,
}

#[derive(Serialize)]
struct RegisterResponse {
    user_id: UserId,
    key_id: KeyId,
}

#[derive(Serialize)]
struct ConversationRef {
    conversation_id: ConversationId,
}

#[derive(Deserialize)]
struct UserRef {
    user_id: UserId,
}

#[derive(Serialize)]
struct AddedResponse {
    added: bool,
}

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<i64>,
    after: Option<u64>,
}

#[derive(Serialize)]
struct LastHashResponse {
    #[serde(with = "base64_opt")]
    content_hash: Option<Vec<u8>>,
}

#[derive(Serialize)]
struct ReadResponse {
    read_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct DeliveredResponse {
    delivered_at: DateTime<Utc>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn register_user(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<RegisterResponse> {
    let Json(req) = body?;
    let user = state
        .ledger
        .identities()
        .register(req.public_key, req.fingerprint)
        .await?;

    Ok(Json(RegisterResponse {
        user_id: user.user_id,
        key_id: user.key_id,
    }))
}

async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<UserId>, PathRejection>,
) -> ApiResult<User> {
    let Path(user_id) = id?;
    Ok(Json(state.ledger.identities().get(user_id).await?))
}

async fn user_conversations(
    State(state): State<AppState>,
    id: Result<Path<UserId>, PathRejection>,
) -> ApiResult<Vec<ConversationRef>> {
    let Path(user_id) = id?;
    let conversations = state.ledger.conversations().list_for_user(user_id).await?;
    Ok(Json(
        conversations
            .into_iter()
            .map(|conversation_id| ConversationRef { conversation_id })
            .collect(),
    ))
}

async fn create_conversation(State(state): State<AppState>) -> ApiResult<ConversationRef> {
    let conversation_id = state.ledger.conversations().create().await?;
    Ok(Json(ConversationRef { conversation_id }))
}

async fn add_participant(
    State(state): State<AppState>,
    id: Result<Path<ConversationId>, PathRejection>,
    body: Result<Json<UserRef>, JsonRejection>,
) -> ApiResult<AddedResponse> {
    let Path(conversation_id) = id?;
    let Json(req) = body?;
    state
        .ledger
        .conversations()
        .add_participant(conversation_id, req.user_id)
        .await?;
    Ok(Json(AddedResponse { added: true }))
}

async fn list_participants(
    State(state): State<AppState>,
    id: Result<Path<ConversationId>, PathRejection>,
) -> ApiResult<Vec<UserId>> {
    let Path(conversation_id) = id?;
    let participants = state
        .ledger
        .conversations()
        .list_participants(conversation_id)
        .await?;
    Ok(Json(participants.into_iter().collect()))
}

async fn append_message(
    State(state): State<AppState>,
    id: Result<Path<ConversationId>, PathRejection>,
    body: Result<Json<NewMessage>, JsonRejection>,
) -> ApiResult<Appended> {
    let Path(conversation_id) = id?;
    let Json(message) = body?;
    Ok(Json(
        state.ledger.chain().append(conversation_id, message).await?,
    ))
}

async fn list_messages(
    State(state): State<AppState>,
    id: Result<Path<ConversationId>, PathRejection>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<ChainMessage>> {
    let Path(conversation_id) = id?;
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or_else(|| i64::from(state.ledger.config().default_page_limit));
    let messages = state
        .ledger
        .chain()
        .list(conversation_id, query.after.unwrap_or(0), limit)
        .await?;
    Ok(Json(messages))
}

async fn chain_tail(
    State(state): State<AppState>,
    id: Result<Path<ConversationId>, PathRejection>,
) -> ApiResult<ChainTail> {
    let Path(conversation_id) = id?;
    Ok(Json(state.ledger.chain().tail(conversation_id).await?))
}

/// Hash a client should use as `prev_hash` for its next message.
async fn last_hash(
    State(state): State<AppState>,
    id: Result<Path<ConversationId>, PathRejection>,
) -> ApiResult<LastHashResponse> {
    let Path(conversation_id) = id?;
    let tail = state.ledger.chain().tail(conversation_id).await?;
    Ok(Json(LastHashResponse {
        content_hash: tail.last_hash,
    }))
}

async fn mark_read(
    State(state): State<AppState>,
    id: Result<Path<MessageId>, PathRejection>,
    body: Result<Json<UserRef>, JsonRejection>,
) -> ApiResult<ReadResponse> {
    let Path(message_id) = id?;
    let Json(req) = body?;
    let read_at = state
        .ledger
        .receipts()
        .mark_read(message_id, req.user_id)
        .await?;
    Ok(Json(ReadResponse { read_at }))
}

async fn read_state(
    State(state): State<AppState>,
    id: Result<Path<MessageId>, PathRejection>,
) -> ApiResult<Vec<UserId>> {
    let Path(message_id) = id?;
    let readers = state.ledger.receipts().read_state(message_id).await?;
    Ok(Json(readers.into_iter().collect()))
}

async fn mark_delivered(
    State(state): State<AppState>,
    id: Result<Path<MessageId>, PathRejection>,
    body: Result<Json<UserRef>, JsonRejection>,
) -> ApiResult<DeliveredResponse> {
    let Path(message_id) = id?;
    let Json(req) = body?;
    let delivered_at = state
        .ledger
        .receipts()
        .mark_delivered(message_id, req.user_id)
        .await?;
    Ok(Json(DeliveredResponse { delivered_at }))
}

async fn message_status(
    State(state): State<AppState>,
    id: Result<Path<MessageId>, PathRejection>,
) -> ApiResult<Vec<Receipt>> {
    let Path(message_id) = id?;
    Ok(Json(state.ledger.receipts().status(message_id).await?))
}

async fn add_attachment(
    State(state): State<AppState>,
    id: Result<Path<MessageId>, PathRejection>,
    body: Result<Json<NewAttachment>, JsonRejection>,
) -> ApiResult<AttachmentMeta> {
    let Path(message_id) = id?;
    let Json(upload) = body?;
    let meta = state
        .ledger
        .attachments()
        .add_attachment(message_id, upload)
        .await?;
    Ok(Json(meta))
}

async fn list_attachments(
    State(state): State<AppState>,
    id: Result<Path<MessageId>, PathRejection>,
    query: Result<Query<UserRef>, QueryRejection>,
) -> ApiResult<Vec<AttachmentMeta>> {
    let Path(message_id) = id?;
    let Query(viewer) = query?;
    Ok(Json(
        state
            .ledger
            .attachments()
            .list_attachments(message_id, viewer.user_id)
            .await?,
    ))
}

async fn get_attachment(
    State(state): State<AppState>,
    id: Result<Path<AttachmentId>, PathRejection>,
    query: Result<Query<UserRef>, QueryRejection>,
) -> ApiResult<Attachment> {
    let Path(attachment_id) = id?;
    let Query(viewer) = query?;
    Ok(Json(
        state
            .ledger
            .attachments()
            .get_attachment(attachment_id, viewer.user_id)
            .await?,
    ))
}

fn verify_admin_token(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ServerError> {
    let Some(ref expected) = config.admin_token else {
        return Err(ServerError::Forbidden(
            "Admin API is disabled (no ADMIN_TOKEN configured)".into(),
        ));
    };

    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let Some(token) = auth.strip_prefix("Bearer ") else {
        return Err(ServerError::Forbidden("Missing bearer token".into()));
    };

    use subtle::ConstantTimeEq;
    if token.as_bytes().ct_eq(expected.as_bytes()).unwrap_u8() != 1 {
        return Err(ServerError::Forbidden("Invalid admin token".into()));
    }

    Ok(())
}

async fn admin_verify_chain(
    headers: HeaderMap,
    State(state): State<AppState>,
    id: Result<Path<ConversationId>, PathRejection>,
) -> ApiResult<ChainReport> {
    verify_admin_token(&headers, &state.config)?;
    let Path(conversation_id) = id?;

    let report = state.ledger.chain().audit_chain(conversation_id).await?;
    info!(
        conversation = %conversation_id,
        intact = report.intact,
        "Admin chain audit"
    );
    Ok(Json(report))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
