use actix_web::{web, App, HttpServer};
use log::{error, info};
use log4rs::init_file;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod apis;
mod cores;
mod configs;
mod utils;

use crate::configs::settings::GLOBAL_CONFIG;
use crate::cores::worker::Worker;
use crate::apis::api_doc::ApiDoc;

#[cfg(test)]
mod test;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = &*GLOBAL_CONFIG;

    init_file(&config.log_config, Default::default())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("Logger setup failed: {}", e)))?;

    let worker = Worker::from_config(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("Worker setup failed: {}", e)))?;
    let worker = web::Data::new(worker);

    // A failed start is remembered and reported per job; the process stays up.
    if config.eager_init {
        if let Err(err) = worker.initialize().await {
            error!(target: "error_log", "Worker is not ready: {}", err);
        }
    }

    // Set the port number
    let port = config.port;
    info!("Starting worker on port {}", port);

    // Start the HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(worker.clone())
            .configure(apis::jobs_api::run::configure)
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()))
    })
    .workers(config.workers.max(1))
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
