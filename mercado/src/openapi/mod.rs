//! OpenAPI documentation for the marketplace API.
//!
//! [`ApiDoc`] collects every annotated handler. It is rendered with Scalar at `/docs` and the raw
//! document is available at `/openapi.json`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api::handlers;

/// Session security scheme: the JWT from the session cookie, or the same token as a bearer header.
struct SessionSecurityAddon;

impl Modify for SessionSecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "session".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session token issued by `/auth/login` and `/auth/register`. Browsers send it in the \
                            session cookie; other clients can pass it in the `Authorization` header:\n\n\
                            ```\nAuthorization: Bearer YOUR_SESSION_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mercado API",
        description = "Classifieds, premium content and a credits ledger for the PT/ES marketplace."
    ),
    modifiers(&SessionSecurityAddon),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::forgot_password,
        handlers::auth::reset_password,
        handlers::auth::verify_email,
        handlers::users::get_me,
        handlers::users::update_me,
        handlers::users::get_credits,
        handlers::users::list_transactions,
        handlers::users::list_payouts,
        handlers::users::request_payout,
        handlers::listings::list_listings,
        handlers::listings::get_listing,
        handlers::listings::create_listing,
        handlers::listings::delete_listing,
        handlers::blog_posts::list_blog_posts,
        handlers::blog_posts::create_blog_post,
        handlers::vods::list_vods,
        handlers::vods::get_vod,
        handlers::vods::create_vod,
        handlers::purchases::purchase_boost,
        handlers::purchases::list_my_boosts,
        handlers::purchases::unlock_vod,
        handlers::checkout::checkout_credits,
        handlers::checkout::checkout_pro,
        handlers::checkout::checkout_turbo,
        handlers::webhooks::payment_webhook,
        handlers::contests::list_contests,
        handlers::contests::get_contest,
        handlers::contests::create_contest,
        handlers::contests::enter_contest,
        handlers::contests::resolve_contest,
        handlers::forum::list_threads,
        handlers::forum::get_thread,
        handlers::forum::create_thread,
        handlers::forum::create_post,
        handlers::wishlist::get_wishlist,
        handlers::wishlist::add_item,
        handlers::wishlist::remove_item,
        handlers::admin::list_users,
        handlers::admin::update_user,
        handlers::admin::adjust_credits,
        handlers::admin::list_listings,
        handlers::admin::approve_listing,
        handlers::admin::reject_listing,
        handlers::admin::list_payouts,
        handlers::admin::approve_payout,
        handlers::admin::reject_payout,
        handlers::admin::lock_thread,
        handlers::admin::report_summary,
    ),
    tags(
        (name = "auth", description = "Registration, sessions and account recovery"),
        (name = "user", description = "The signed-in account"),
        (name = "credits", description = "Credit balance and history"),
        (name = "transactions", description = "Value exchanges between clients and providers"),
        (name = "payouts", description = "Cash withdrawals for providers"),
        (name = "listings", description = "Classified listings"),
        (name = "blog", description = "Blog posts"),
        (name = "vods", description = "Premium videos"),
        (name = "purchases", description = "Spending credits on boosts and unlocks"),
        (name = "checkout", description = "Card payments and processor webhooks"),
        (name = "contests", description = "Paid-slot contests"),
        (name = "forum", description = "Community forum"),
        (name = "wishlist", description = "Products saved from the store"),
        (name = "admin", description = "Back-office (admin only)"),
    )
)]
pub struct ApiDoc;
