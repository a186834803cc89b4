use std::time::Duration;

use actix_web::{http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::info;
use market_order_engine::{
    events::EventProducers,
    OrderFlowApi,
    PaymentsApi,
    RefundApi,
    SqliteDatabase,
    WebhookReconciler,
};

use crate::{
    config::ServerConfig,
    data_objects::PaymentConfigResponse,
    errors::ServerError,
    integrations::{notifications::create_notification_handlers, stripe::StripeGateway, stripe::WebhookVerifier},
    payment_routes::{configure_payment_routes, payment_config, payment_webhook},
    routes::{configure_order_routes, health},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_notification_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::BackendError(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<actix_web::dev::Server, ServerError> {
    let gateway = StripeGateway::new(&config.gateway)?;
    info!("💻️ Payment gateway configured: {}", config.gateway.enabled);
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let flow_api = OrderFlowApi::new(db.clone(), config.pricing.clone(), producers.clone());
        let reconciler = WebhookReconciler::new(db.clone(), producers.clone());
        let payments_api = PaymentsApi::new(db.clone(), gateway.clone(), config.currency.clone());
        let refund_api = RefundApi::new(db.clone(), gateway.clone());
        let verifier = WebhookVerifier::new(&config.gateway);
        let public_config = PaymentConfigResponse::from_config(&config.gateway, &config.currency);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mos::access_log"))
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(reconciler))
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(refund_api))
            .app_data(web::Data::new(verifier))
            .app_data(web::Data::new(public_config))
            .app_data(web::Data::new(config.clone()));
        // Routes that require an authenticated caller
        let api_scope = web::scope("/api")
            .configure(configure_order_routes::<SqliteDatabase>)
            .configure(configure_payment_routes::<SqliteDatabase, StripeGateway>);
        app.service(health)
            .route("/payment/config", web::get().to(payment_config))
            .route("/payment/webhook", web::post().to(payment_webhook::<SqliteDatabase>))
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
