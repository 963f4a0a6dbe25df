use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Triage API",
        version = "0.1.0",
        description = "Patient risk prediction with a dynamically prioritised waiting queue."
    ),
    paths(
        crate::routes::root,
        crate::routes::predict,
        crate::routes::get_queue,
        crate::routes::update_priorities,
        crate::routes::clear_queue,
        crate::routes::next_patient,
        crate::routes::feedback,
        crate::routes::policy,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::WelcomeResponse,
        crate::dto::MessageResponse,
        crate::dto::PredictRequest,
        crate::dto::VitalSignsResponse,
        crate::dto::RiskPredictionResponse,
        crate::dto::PatientQueueResponse,
        crate::dto::UpdatePrioritiesResponse,
        crate::dto::OutcomeResponse,
        crate::dto::FeedbackResponse,
        crate::dto::PolicyResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "prediction", description = "Risk assessment and admission"),
        (name = "queue", description = "Waiting queue management"),
        (name = "scheduling", description = "Learned scheduling policy"),
        (name = "system", description = "Health and system status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds Bearer token security scheme to the OpenAPI document.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("token")
                        .description(Some(
                            "API key. Only enforced when TRIAGE_API_KEY is set.",
                        ))
                        .build(),
                ),
            );
        }
    }
}
