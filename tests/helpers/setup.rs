use sandglass_api::Application;
use sandglass_infra::{setup_context, Config};
use sandglass_sdk::SandglassSDK;

pub struct TestApp {
    pub config: Config,
    pub port: u16,
}

// Launch the application as a background task
pub async fn spawn_app() -> (TestApp, SandglassSDK, String) {
    let mut ctx = setup_context().await;
    ctx.config.port = 0; // Random port

    let config = ctx.config.clone();
    let application = Application::new(ctx)
        .await
        .expect("Failed to build application.");
    let port = application.port();

    let address = format!("http://localhost:{}", port);
    let _ = actix_web::rt::spawn(async move {
        application
            .start()
            .await
            .expect("Expected application to start");
    });

    let app = TestApp { config, port };
    let sdk = SandglassSDK::new(address.clone());
    (app, sdk, address)
}
