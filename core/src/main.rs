use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use common::{
    cors,
    env_config::Config,
    stripe::{PaymentProcessor, StripeProcessor},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars, a missing Stripe key stops the process here
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };
    let config_data = config.clone();

    // init logger, request bodies are only logged outside production
    let level = if config.is_production() {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Debug
    };
    if config.console_logging_enabled {
        logger::setup(config.log_file.as_deref(), level).expect("Failed to set up logger");
    }
    log::info!(
        "Starting booking server ({}, {:?}) on {}:{}",
        config.environment,
        config.deployment,
        config.server_host,
        config.server_port
    );

    // one Stripe client shared by every worker
    let processor: Arc<dyn PaymentProcessor> =
        Arc::new(StripeProcessor::new(&config.stripe_secret_key));

    HttpServer::new(move || {
        App::new()
            .wrap(logger::middleware(
                config_data.console_logging_enabled,
                config_data.max_body_bytes,
            )) // 2nd
            .wrap(cors::default(config_data.deployment)) // 1st
            .app_data(web::Data::from(processor.clone()))
            .app_data(web::Data::new(config_data.clone()))
            .service(api_pay::mount_pay())
            .service(api_pay::mount_serverless())
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
