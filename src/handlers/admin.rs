use crate::models::ShutdownRequest;
use crate::services::GiveawayService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/admin/shutdown",
    tag = "admin",
    request_body = ShutdownRequest,
    responses(
        (status = 200, description = "Shutdown initiated"),
        (status = 403, description = "Not the configured dev identity")
    )
)]
/// Emergency stop, restricted to the configured dev identity. The process
/// exits shortly after the response is flushed.
pub async fn shutdown(
    service: web::Data<GiveawayService>,
    req: web::Json<ShutdownRequest>,
) -> Result<HttpResponse> {
    match service.authorize_shutdown(&req.user_id).await {
        Ok(()) => {
            log::warn!("Shutdown initiated by {}", req.user_id);
            tokio::spawn(async {
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                std::process::exit(0);
            });
            Ok(HttpResponse::Ok().json(json!({ "success": true })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/admin").route("/shutdown", web::post().to(shutdown)));
}
