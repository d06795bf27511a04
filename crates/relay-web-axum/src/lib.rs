use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use bytes::Bytes;
use relay_core::WebhookResponse;
use relay_ingest::IngestPipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: IngestPipeline,
}

/// Webhook router: `POST /`. Other methods on the path get 405 from the
/// method router before any downstream call is made.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(receive_webhook))
        .with_state(state)
}

/// Accept one Twilio webhook delivery and relay it into the entity store.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let response = state.pipeline.process(content_type, &body).await;
    into_axum_response(response)
}

fn into_axum_response(response: WebhookResponse) -> Response {
    let status = StatusCode::from_u16(response.status.as_u16())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, response.content_type)],
        response.body,
    )
        .into_response()
}
