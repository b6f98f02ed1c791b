use crate::models::*;
use crate::services::GiveawayService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/giveaways",
    tag = "giveaway",
    request_body = CreateGiveawayRequest,
    responses(
        (status = 200, description = "Giveaway created and announced", body = GiveawayResponse),
        (status = 400, description = "Invalid title or duration"),
        (status = 502, description = "Announcement delivery failed")
    )
)]
/// Create a giveaway: announce it with the entry buttons, then persist
/// the record
pub async fn create(
    service: web::Data<GiveawayService>,
    req: web::Json<CreateGiveawayRequest>,
) -> Result<HttpResponse> {
    match service.create(req.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/giveaways/{id}",
    tag = "giveaway",
    params(("id" = String, Path, description = "Giveaway ID")),
    responses(
        (status = 200, description = "Giveaway state", body = GiveawayResponse),
        (status = 404, description = "Giveaway not found")
    )
)]
/// Fetch the current state of a giveaway
pub async fn get(
    service: web::Data<GiveawayService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match service.get(&path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/giveaways/{id}/join",
    tag = "giveaway",
    params(("id" = String, Path, description = "Giveaway ID")),
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Entered, possibly with a role multiplier", body = JoinResponse),
        (status = 404, description = "Giveaway not found"),
        (status = 409, description = "Identity already in the pool")
    )
)]
/// Enter the pool; the configured role map decides the entry multiplier
pub async fn join(
    service: web::Data<GiveawayService>,
    path: web::Path<String>,
    req: web::Json<JoinRequest>,
) -> Result<HttpResponse> {
    match service.join(&path.into_inner(), req.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/giveaways/{id}/leave",
    tag = "giveaway",
    params(("id" = String, Path, description = "Giveaway ID")),
    request_body = LeaveRequest,
    responses(
        (status = 200, description = "Left; every weighted occurrence removed"),
        (status = 400, description = "Identity not in the pool"),
        (status = 404, description = "Giveaway not found")
    )
)]
/// Leave the pool, dropping all weighted occurrences of the identity
pub async fn leave(
    service: web::Data<GiveawayService>,
    path: web::Path<String>,
    req: web::Json<LeaveRequest>,
) -> Result<HttpResponse> {
    match service.leave(&path.into_inner(), req.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/giveaways/{id}/entrants",
    tag = "giveaway",
    params(("id" = String, Path, description = "Giveaway ID")),
    responses(
        (status = 200, description = "Per-identity occurrence counts", body = EntrantsSummaryResponse),
        (status = 404, description = "Giveaway not found")
    )
)]
/// Display view of the entry pool (distinct identities with counts)
pub async fn entrants(
    service: web::Data<GiveawayService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match service.entrants_summary(&path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/giveaways/{id}/reroll",
    tag = "giveaway",
    params(("id" = String, Path, description = "Giveaway ID")),
    request_body = RerollRequest,
    responses(
        (status = 200, description = "New winner selected, audit hash overwritten", body = RerollResponse),
        (status = 400, description = "Giveaway still open or has no entrants"),
        (status = 403, description = "Missing manage capability"),
        (status = 404, description = "Giveaway not found")
    )
)]
/// Re-run winner selection on a closed giveaway with a fresh draw
pub async fn reroll(
    service: web::Data<GiveawayService>,
    path: web::Path<String>,
    req: web::Json<RerollRequest>,
) -> Result<HttpResponse> {
    match service.reroll(&path.into_inner(), req.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/giveaways/{id}/end",
    tag = "giveaway",
    params(("id" = String, Path, description = "Giveaway ID")),
    request_body = EndGiveawayRequest,
    responses(
        (status = 200, description = "Cancelled, or queued for the next scan pass"),
        (status = 400, description = "Already ended"),
        (status = 404, description = "Giveaway not found")
    )
)]
/// Cancel (delete outright) or force-end (finalize on the next scan pass)
pub async fn end(
    service: web::Data<GiveawayService>,
    path: web::Path<String>,
    req: web::Json<EndGiveawayRequest>,
) -> Result<HttpResponse> {
    match service.end(&path.into_inner(), req.mode).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/giveaways/{id}/fill-test",
    tag = "giveaway",
    params(("id" = String, Path, description = "Giveaway ID")),
    responses(
        (status = 200, description = "Fake identities injected"),
        (status = 404, description = "Giveaway not found")
    )
)]
/// Debug helper: inject five fixed fake entrants
pub async fn fill_test(
    service: web::Data<GiveawayService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match service.fill_test(&path.into_inner()).await {
        Ok(count) => {
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": { "added": count } })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/giveaways/{id}/debug",
    tag = "giveaway",
    params(("id" = String, Path, description = "Giveaway ID")),
    responses(
        (status = 200, description = "Audit inspection view", body = DebugResponse),
        (status = 404, description = "Giveaway not found")
    )
)]
/// Audit inspection: stored hash, selection parameters, recomputed index
pub async fn debug(
    service: web::Data<GiveawayService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match service.debug_info(&path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn giveaway_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/giveaways")
            .route("", web::post().to(create))
            .route("/{id}", web::get().to(get))
            .route("/{id}/join", web::post().to(join))
            .route("/{id}/leave", web::post().to(leave))
            .route("/{id}/entrants", web::get().to(entrants))
            .route("/{id}/reroll", web::post().to(reroll))
            .route("/{id}/end", web::post().to(end))
            .route("/{id}/fill-test", web::post().to(fill_test))
            .route("/{id}/debug", web::get().to(debug)),
    );
}
