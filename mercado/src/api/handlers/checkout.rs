//! Purchases paid through the external payment processor.
//!
//! Each endpoint persists a `PENDING` checkout keyed by the processor's reference and hands the
//! buyer a redirect URL. Nothing is granted here: the signed webhook completes the checkout
//! (see [`crate::reconciliation`]). The one exception is a one-click credits purchase whose
//! token charge settles synchronously, which is reconciled inline.

use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use tracing::info;

use crate::{
    AppState,
    api::models::{
        checkout::{CheckoutResponse, CreditsCheckoutRequest, ProCheckoutRequest, TurboCheckoutRequest},
        users::CurrentUser,
    },
    config::Config,
    db::{
        handlers::{Checkouts, Listings},
        models::checkouts::{CheckoutCreateDBRequest, CheckoutKind, CheckoutStatus},
    },
    errors::{Error, Result},
    ledger::boosts::catalog_entry,
    payment_providers::{ChargeRequest, PaymentProvider, SubscriptionRequest, TokenChargeRequest, create_provider},
    reconciliation::{self, Reconciled},
    types::abbrev_uuid,
};

/// The configured payment processor; 503 when none is configured
pub(crate) fn payment_provider(config: &Config) -> Result<Box<dyn PaymentProvider>> {
    config.payment.clone().map(create_provider).ok_or_else(|| Error::Upstream {
        service: "Payment processor".to_string(),
        message: "No payment provider is configured".to_string(),
    })
}

/// Signed-in users pay as themselves; guests must give an email
pub(crate) fn buyer_email(current_user: Option<&CurrentUser>, email: Option<&str>) -> Result<String> {
    if let Some(user) = current_user {
        return Ok(user.email.clone());
    }
    match email.map(|e| e.trim().to_lowercase()) {
        Some(email) if email.contains('@') => Ok(email),
        _ => Err(Error::BadRequest {
            message: "An email address is required to check out without an account".to_string(),
        }),
    }
}

/// `(success_url, cancel_url)` on the public site
pub(crate) fn return_urls(config: &Config, kind: &str) -> (String, String) {
    let base = config.public_url.trim_end_matches('/');
    (
        format!("{base}/checkout/success?kind={kind}"),
        format!("{base}/checkout/cancel?kind={kind}"),
    )
}

/// Record the pending checkout; the reference must already exist at the processor
pub(crate) async fn persist_checkout(state: &AppState, request: &CheckoutCreateDBRequest) -> Result<()> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let checkout = Checkouts::new(&mut conn).create(request).await?;
    info!(
        checkout_id = %abbrev_uuid(&checkout.id),
        kind = ?checkout.kind,
        item = %checkout.item_key,
        amount = %checkout.amount,
        "Checkout created"
    );
    Ok(())
}

/// Buy a credit package.
///
/// With `payment_token` the saved payment method is charged directly and no redirect is returned.
#[utoipa::path(
    post,
    path = "/checkout/credits",
    tag = "checkout",
    request_body = CreditsCheckoutRequest,
    responses(
        (status = 200, description = "Checkout created, or charged when a payment token was given", body = CheckoutResponse),
        (status = 400, description = "Unknown package, missing guest email, or payment declined"),
        (status = 503, description = "Payment processor unavailable or not configured"),
    )
)]
#[tracing::instrument(skip_all, fields(package = %request.package))]
pub async fn checkout_credits(
    State(state): State<AppState>,
    current_user: Option<CurrentUser>,
    Json(request): Json<CreditsCheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let package = state.config.credits.packages.get(&request.package).ok_or_else(|| Error::BadRequest {
        message: format!("Unknown credit package '{}'", request.package),
    })?;
    let email = buyer_email(current_user.as_ref(), request.email.as_deref())?;
    let provider = payment_provider(&state.config)?;
    let description = format!("{} credits", package.credits);

    let mut checkout = CheckoutCreateDBRequest {
        kind: CheckoutKind::Credits,
        item_key: request.package.clone(),
        amount: package.price,
        credits: package.credits,
        user_id: current_user.as_ref().map(|u| u.id),
        email: email.clone(),
        listing_id: None,
        contest_id: None,
        payment_reference: String::new(),
    };

    if let Some(token) = request.payment_token {
        let charge = provider
            .charge_with_token(&TokenChargeRequest {
                token,
                amount: package.price,
                description,
                customer_email: email,
            })
            .await?;
        checkout.payment_reference = charge.payment_id.clone();
        persist_checkout(&state, &checkout).await?;

        let status = if charge.paid {
            match reconciliation::complete_payment(&state.db, &state.config, &charge.payment_id, None).await? {
                Reconciled::Discarded { .. } => CheckoutStatus::Discarded,
                _ => CheckoutStatus::Completed,
            }
        } else {
            CheckoutStatus::Pending
        };

        return Ok(Json(CheckoutResponse {
            payment_id: Some(charge.payment_id),
            status: Some(status),
            ..Default::default()
        }));
    }

    let (success_url, cancel_url) = return_urls(&state.config, "credits");
    let created = provider
        .create_one_time_charge(&ChargeRequest {
            amount: package.price,
            description,
            customer_email: email,
            success_url,
            cancel_url,
        })
        .await?;
    checkout.payment_reference = created.payment_id.clone();
    persist_checkout(&state, &checkout).await?;

    Ok(Json(CheckoutResponse {
        checkout_url: Some(created.checkout_url),
        payment_id: Some(created.payment_id),
        status: Some(CheckoutStatus::Pending),
        ..Default::default()
    }))
}

/// Subscribe to a pro plan
#[utoipa::path(
    post,
    path = "/checkout/pro",
    tag = "checkout",
    request_body = ProCheckoutRequest,
    responses(
        (status = 200, description = "Subscription checkout created", body = CheckoutResponse),
        (status = 400, description = "Unknown plan or missing guest email"),
        (status = 503, description = "Payment processor unavailable or not configured"),
    )
)]
#[tracing::instrument(skip_all, fields(plan = %request.plan))]
pub async fn checkout_pro(
    State(state): State<AppState>,
    current_user: Option<CurrentUser>,
    Json(request): Json<ProCheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let plan = state.config.subscriptions.plans.get(&request.plan).ok_or_else(|| Error::BadRequest {
        message: format!("Unknown plan '{}'", request.plan),
    })?;
    let email = buyer_email(current_user.as_ref(), request.email.as_deref())?;
    let provider = payment_provider(&state.config)?;

    let (success_url, cancel_url) = return_urls(&state.config, "pro");
    let created = provider
        .create_subscription(&SubscriptionRequest {
            plan: request.plan.clone(),
            amount: plan.price,
            interval_days: plan.interval_days,
            customer_email: email.clone(),
            success_url,
            cancel_url,
        })
        .await?;

    persist_checkout(
        &state,
        &CheckoutCreateDBRequest {
            kind: CheckoutKind::Subscription,
            item_key: request.plan,
            amount: plan.price,
            credits: 0,
            user_id: current_user.map(|u| u.id),
            email,
            listing_id: None,
            contest_id: None,
            payment_reference: created.subscription_id.clone(),
        },
    )
    .await?;

    Ok(Json(CheckoutResponse {
        checkout_url: Some(created.checkout_url),
        subscription_id: Some(created.subscription_id),
        status: Some(CheckoutStatus::Pending),
        ..Default::default()
    }))
}

/// Pay cash for a boost on one of the caller's listings
#[utoipa::path(
    post,
    path = "/checkout/turbo",
    tag = "checkout",
    request_body = TurboCheckoutRequest,
    responses(
        (status = 200, description = "Checkout created", body = CheckoutResponse),
        (status = 400, description = "Unknown boost type"),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Listing belongs to someone else"),
        (status = 404, description = "Listing not found"),
        (status = 503, description = "Payment processor unavailable or not configured"),
    ),
    security(("session" = []))
)]
#[tracing::instrument(skip_all, fields(boost_type = %request.boost_type))]
pub async fn checkout_turbo(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<TurboCheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let boost = catalog_entry(&state.config.boosts, &request.boost_type)?;
    if boost.cash_price <= Decimal::ZERO {
        return Err(Error::BadRequest {
            message: format!("Boost type '{}' cannot be bought with cash", request.boost_type),
        });
    }

    let listing = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Listings::new(&mut conn)
            .get_by_id(request.listing_id)
            .await?
            .ok_or_else(|| Error::NotFound {
                resource: "Listing".to_string(),
                id: request.listing_id.to_string(),
            })?
    };
    if listing.owner_id != current_user.id {
        return Err(Error::InsufficientPermissions {
            action: "boost".to_string(),
            resource: "a listing you do not own".to_string(),
        });
    }

    let email = buyer_email(Some(&current_user), request.email.as_deref())?;
    let provider = payment_provider(&state.config)?;
    let (success_url, cancel_url) = return_urls(&state.config, "turbo");
    let created = provider
        .create_one_time_charge(&ChargeRequest {
            amount: boost.cash_price,
            description: format!("{} boost: {}", request.boost_type, listing.title),
            customer_email: email.clone(),
            success_url,
            cancel_url,
        })
        .await?;

    persist_checkout(
        &state,
        &CheckoutCreateDBRequest {
            kind: CheckoutKind::Turbo,
            item_key: request.boost_type,
            amount: boost.cash_price,
            credits: 0,
            user_id: Some(current_user.id),
            email,
            listing_id: Some(listing.id),
            contest_id: None,
            payment_reference: created.payment_id.clone(),
        },
    )
    .await?;

    Ok(Json(CheckoutResponse {
        checkout_url: Some(created.checkout_url),
        payment_id: Some(created.payment_id),
        status: Some(CheckoutStatus::Pending),
        ..Default::default()
    }))
}
