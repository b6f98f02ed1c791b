use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::giveaway::create,
        handlers::giveaway::get,
        handlers::giveaway::join,
        handlers::giveaway::leave,
        handlers::giveaway::entrants,
        handlers::giveaway::reroll,
        handlers::giveaway::end,
        handlers::giveaway::fill_test,
        handlers::giveaway::debug,
        handlers::admin::shutdown,
    ),
    components(
        schemas(
            CreateGiveawayRequest,
            GiveawayResponse,
            JoinRequest,
            JoinResponse,
            LeaveRequest,
            EntrantEntry,
            EntrantsSummaryResponse,
            RerollRequest,
            RerollResponse,
            EndMode,
            EndGiveawayRequest,
            DebugResponse,
            ShutdownRequest,
        )
    ),
    tags(
        (name = "giveaway", description = "Giveaway lifecycle API"),
        (name = "admin", description = "Privileged operations"),
    ),
    info(
        title = "Giveaway Backend API",
        version = "1.0.0",
        description = "Giveaway lifecycle REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
