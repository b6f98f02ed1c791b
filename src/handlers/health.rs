use actix_web::{HttpResponse, Result, web};

/// Keep-alive endpoint for platform health checks.
pub async fn health() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().body("Bot is alive!"))
}

pub fn health_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(health));
}
