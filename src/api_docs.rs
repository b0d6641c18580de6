use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::donations::checkout,
        api::donations::public_status,
        api::payments::payment_callback,
        api::donations::refresh_status,
        api::donations::mark_expired,
        api::donations::list_donations,
        api::donations::donation_logs,
        api::donations::purge_sandbox,
        api::donations::donation_stats,
        api::content::list_content,
        api::content::get_content,
        api::content::create_content,
        api::content::update_content,
        api::content::delete_content,
        api::versions::version_history,
        api::versions::get_version,
        api::versions::restore_version,
        api::versions::activity_log,
        api::versions::version_stats,
    ),
    tags(
        (name = "kasih", description = "Kasih donations and content API")
    )
)]
pub struct ApiDoc;
