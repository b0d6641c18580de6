pub mod content;
pub mod donations;
pub mod error;
pub mod health;
pub mod payments;
pub mod versions;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::infrastructure::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Public donation flow
        .route("/donations/checkout", post(donations::checkout))
        .route("/donations/:reference/status", get(donations::public_status))
        .route("/payments/callback", post(payments::payment_callback))
        // Admin: donations
        .route("/admin/donations", get(donations::list_donations))
        .route(
            "/admin/donations/refresh-status",
            post(donations::refresh_status),
        )
        .route("/admin/donations/mark-expired", post(donations::mark_expired))
        .route("/admin/donations/sandbox", delete(donations::purge_sandbox))
        .route(
            "/admin/donations/:reference/logs",
            get(donations::donation_logs),
        )
        .route("/admin/stats/donations", get(donations::donation_stats))
        // Admin: versioned content
        .route(
            "/admin/content/:content_type",
            get(content::list_content).post(content::create_content),
        )
        .route(
            "/admin/content/:content_type/:id",
            get(content::get_content)
                .put(content::update_content)
                .delete(content::delete_content),
        )
        .route(
            "/admin/content/:content_type/:id/versions",
            get(versions::version_history),
        )
        .route("/admin/versions/:id", get(versions::get_version))
        .route("/admin/versions/:id/restore", post(versions::restore_version))
        .route("/admin/activity", get(versions::activity_log))
        .route("/admin/stats/versions", get(versions::version_stats))
        .with_state(state)
}
