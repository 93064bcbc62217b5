mod consumer;
mod error;
mod job_schedulers;
mod monitoring;
mod scheduler;
mod shared;
mod status;
mod timer;
mod ws;

use actix_cors::Cors;
use actix_web::{dev::Server, middleware, web, App, HttpServer};
use sandglass_infra::SandglassContext;
use std::net::TcpListener;
use std::sync::Arc;
use tracing::warn;
use tracing_actix_web::TracingLogger;
use ws::SessionHub;

pub fn configure_server_api(cfg: &mut web::ServiceConfig) {
    timer::configure_routes(cfg);
    monitoring::configure_routes(cfg);
    ws::configure_routes(cfg);
    status::configure_routes(cfg);
}

pub struct Application {
    server: Server,
    port: u16,
    context: SandglassContext,
}

impl Application {
    pub async fn new(context: SandglassContext) -> Result<Self, std::io::Error> {
        let hub = Arc::new(SessionHub::new());
        let (server, port) = Application::configure_server(context.clone(), hub.clone()).await?;
        Application::start_background_services(context.clone(), hub);

        Ok(Self {
            server,
            port,
            context,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn start_background_services(context: SandglassContext, hub: Arc<SessionHub>) {
        scheduler::start_ttl_scheduler(context.clone());
        timer::start_completion_listener(context.clone());
        consumer::start_bus_consumers(context.clone(), hub);
        job_schedulers::start_missed_timer_detection_job(context);
    }

    async fn configure_server(
        context: SandglassContext,
        hub: Arc<SessionHub>,
    ) -> Result<(Server, u16), std::io::Error> {
        let port = context.config.port;
        let address = format!("0.0.0.0:{}", port);
        let listener = TcpListener::bind(&address)?;
        let port = listener.local_addr()?.port();

        let server = HttpServer::new(move || {
            let ctx = context.clone();
            let hub = hub.clone();

            App::new()
                .wrap(Cors::permissive())
                .wrap(middleware::Compress::default())
                .wrap(TracingLogger::default())
                .app_data(web::Data::new(ctx))
                .app_data(web::Data::from(hub))
                .service(web::scope("/api/v1").configure(configure_server_api))
        })
        .listen(listener)?
        .workers(4)
        .run();

        Ok((server, port))
    }

    pub async fn start(self) -> Result<(), std::io::Error> {
        let res = self.server.await;

        // Best-effort presence sweep so peers see our viewers leave now
        // instead of after TTL decay.
        let server_id = self.context.config.server_instance_id.clone();
        if let Err(e) = self.context.presence.cleanup_server(&server_id).await {
            warn!("Presence cleanup on shutdown failed: {}", e);
        }

        res
    }
}
