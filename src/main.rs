use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use giveaway_backend::{
    config::Config,
    database::{MongoGiveawayStore, connect, ensure_indexes},
    external::{DiscordNotifier, EntropyClient},
    handlers,
    services::GiveawayService,
    swagger::swagger_config,
    tasks,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration file");

    let collection = connect(&config.database)
        .await
        .expect("Failed to connect to the document store");
    ensure_indexes(&collection, config.giveaway.retention_days)
        .await
        .expect("Failed to ensure store indexes");

    let store = Arc::new(MongoGiveawayStore::new(collection));
    let notifier = Arc::new(DiscordNotifier::new(config.discord.clone()));
    let entropy = EntropyClient::new(config.entropy.clone());

    let giveaway_service = GiveawayService::new(
        store,
        notifier,
        entropy,
        config.giveaway.entry_multipliers.clone(),
        config.discord.dev_user_id.clone(),
    );

    tasks::spawn_all(
        giveaway_service.clone(),
        config.giveaway.scan_interval_secs,
    );

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(giveaway_service.clone()))
            .configure(swagger_config)
            .configure(handlers::health_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::giveaway_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
