use crate::models::api::{
    ConversationsResponse,
    MessagesResponse,
    PostMessageRequest,
    PostMessageResponse,
    StatusResponse,
};
use crate::service::{ ConversationService, Served, ServiceError };
use std::sync::Arc;
use axum::{
    routing::{ get, post },
    Router,
    Json,
    extract::{ Path, State, rejection::JsonRejection },
    response::{ IntoResponse, Response },
    http::{ HeaderName, HeaderValue, StatusCode },
};
use serde::Serialize;
use tower_http::cors::{ Any, CorsLayer };
use log::{ debug, error };

/// Set on responses that were answered from mock data instead of the store.
pub const DEGRADED_HEADER: HeaderName = HeaderName::from_static("x-degraded-mode");

/// Body of every 503; store details only go to the log.
pub const STORE_UNAVAILABLE: &str = "Store unavailable";

#[derive(Clone)]
struct AppState {
    service: Arc<ConversationService>,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServiceError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ServiceError::Store(e) => {
                error!("Store error: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, STORE_UNAVAILABLE.to_string())
            }
        };
        (status, Json(StatusResponse { message })).into_response()
    }
}

fn served_response<T: Serialize>(served: Served<T>) -> Response {
    match served {
        Served::Live(value) => Json(value).into_response(),
        Served::Degraded { value, reason } => {
            let mut resp = Json(value).into_response();
            let header = HeaderValue::from_str(&reason).unwrap_or_else(|_|
                HeaderValue::from_static("store unavailable")
            );
            resp.headers_mut().insert(DEGRADED_HEADER, header);
            resp
        }
    }
}

pub fn create_router(service: Arc<ConversationService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(hello_handler))
        .route("/conversations", get(list_conversations_handler))
        .route(
            "/conversations/{conversation_id}",
            get(get_conversation_handler).delete(delete_conversation_handler)
        )
        .route(
            "/conversations/{conversation_id}/messages",
            post(post_message_handler)
        )
        .layer(cors)
        .with_state(AppState { service })
}

async fn hello_handler() -> &'static str {
    "Hello World from the conversation service!"
}

async fn list_conversations_handler(State(state): State<AppState>) -> Response {
    let served = state.service.list_conversations().await;
    served_response(served.map(|conversations| ConversationsResponse { conversations }))
}

async fn get_conversation_handler(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>
) -> Result<Response, ServiceError> {
    let served = state.service.get_conversation(&conversation_id).await?;
    Ok(served_response(served.map(|messages| MessagesResponse { messages })))
}

async fn post_message_handler(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    body: Result<Json<PostMessageRequest>, JsonRejection>
) -> Result<Response, ServiceError> {
    let Json(req) = body.map_err(|rejection| {
        debug!("Rejected message body for {}: {}", conversation_id, rejection.body_text());
        ServiceError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    })?;
    let text = req.message.unwrap_or_default();

    let served = state.service.post_message(&conversation_id, &text).await?;
    Ok(
        served_response(
            served.map(|posted| PostMessageResponse {
                message: posted.message,
                answer: posted.answer,
            })
        )
    )
}

async fn delete_conversation_handler(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>
) -> Result<Json<StatusResponse>, ServiceError> {
    let outcome = state.service.delete_conversation(&conversation_id).await?;
    Ok(Json(StatusResponse { message: outcome.message().to_string() }))
}
