mod hub;
mod session;

use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use sandglass_infra::SandglassContext;
use serde::Deserialize;
use session::TimerSocket;

pub use hub::SessionHub;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectParams {
    user_id: Option<String>,
}

async fn ws_connect(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<ConnectParams>,
    ctx: web::Data<SandglassContext>,
    hub: web::Data<SessionHub>,
) -> Result<HttpResponse, actix_web::Error> {
    let header_user_id = req
        .headers()
        .get("userId")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());
    let user_id = query.0.user_id.or(header_user_id).filter(|u| !u.is_empty());

    ws::start(
        TimerSocket::new(ctx.get_ref().clone(), hub.clone().into_inner(), user_id),
        &req,
        stream,
    )
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(ws_connect));
}
