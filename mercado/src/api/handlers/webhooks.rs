//! Payment processor webhook.

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
};
use tracing::{error, info, warn};

use crate::{
    AppState,
    api::{handlers::checkout::payment_provider, models::checkout::WebhookAck},
    errors::{Error, Result},
    reconciliation::{self, Reconciled},
};

/// Receive a signed payment event.
///
/// A bad signature or malformed body is 400. Any verified event is acknowledged with 200, even
/// when it cannot be applied (sold-out contest, duplicate entry), so the processor stops
/// retrying. Only infrastructure failures answer 5xx and get redelivered.
#[utoipa::path(
    post,
    path = "/webhooks/payments",
    tag = "checkout",
    request_body(content = String, description = "Signed event payload", content_type = "application/json"),
    responses(
        (status = 200, description = "Event received", body = WebhookAck),
        (status = 400, description = "Invalid signature or payload"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn payment_webhook(State(state): State<AppState>, headers: HeaderMap, body: String) -> Result<Json<WebhookAck>> {
    let provider = payment_provider(&state.config)?;
    let event = provider.validate_webhook(&headers, &body).await.map_err(|e| {
        warn!(error = %e, "Rejected payment webhook");
        Error::from(e)
    })?;

    match reconciliation::handle_event(&state.db, &state.config, &event).await {
        Ok(Reconciled::Completed(kind)) => info!(?kind, "Payment reconciled"),
        Ok(Reconciled::Discarded { reason }) => warn!(%reason, "Payment event discarded"),
        Ok(outcome) => info!(?outcome, "Payment event needed no action"),
        Err(e) if e.status_code().is_server_error() => {
            error!(error = %e, "Payment reconciliation failed");
            return Err(e);
        }
        Err(e) => warn!(error = %e, "Payment event could not be applied"),
    }

    Ok(Json(WebhookAck { received: true }))
}
