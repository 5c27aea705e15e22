use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::submissions::create_submission,
        api::submissions::get_status,
        api::submissions::list_submissions,
        api::decisions::approve,
        api::decisions::deny,
        api::decisions::require_otp,
    ),
    tags(
        (name = "credrelay", description = "Credential relay API")
    )
)]
pub struct ApiDoc;
