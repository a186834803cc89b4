//! Payment request handlers: intent and checkout creation, refunds, gateway config, and the webhook
//! endpoint.

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::*;
use market_order_engine::{
    traits::{OrderFlowDatabase, OrderManagement, PaymentProcessor},
    PaymentsApi,
    RefundApi,
    WebhookReconciler,
};
use stripe_tools::Event;

use crate::{
    auth::AuthClaims,
    config::ServerConfig,
    data_objects::{
        CheckoutPayload,
        CheckoutResponse,
        PaymentConfigResponse,
        PaymentIntentPayload,
        PaymentIntentResponse,
        RefundPayload,
        RefundResponse,
    },
    errors::ServerError,
    integrations::stripe::{gateway_event_from_stripe, WebhookVerifier},
};

/// The header carrying the gateway's delivery signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

pub fn configure_payment_routes<B, P>(cfg: &mut web::ServiceConfig)
where
    B: OrderFlowDatabase + 'static,
    P: PaymentProcessor + 'static,
{
    cfg.route("/payment/intent", web::post().to(create_payment_intent::<B, P>))
        .route("/payment/checkout", web::post().to(create_checkout::<B, P>))
        .route("/payment/refund/{order_id}", web::post().to(refund_order::<B, P>))
        .route("/payment/intent/{payment_intent_id}", web::get().to(payment_details::<B, P>));
}

/// `GET /payment/config`. Public: a storefront needs this before the user signs in.
pub async fn payment_config(config: web::Data<PaymentConfigResponse>) -> impl Responder {
    HttpResponse::Ok().json(config.as_ref())
}

/// `POST /api/payment/intent`. 503 when the gateway is disabled.
pub async fn create_payment_intent<B, P>(
    claims: AuthClaims,
    api: web::Data<PaymentsApi<B, P>>,
    body: web::Json<PaymentIntentPayload>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderFlowDatabase + 'static,
    P: PaymentProcessor + 'static,
{
    let payload = body.into_inner();
    authorize_order_access(api.db(), payload.order_id, &claims).await?;
    let (handle, _order) =
        api.create_intent(payload.order_id, payload.amount, payload.currency.as_deref()).await?;
    Ok(HttpResponse::Ok().json(PaymentIntentResponse {
        payment_intent_id: handle.payment_intent_id,
        client_secret: handle.client_secret,
    }))
}

/// `POST /api/payment/checkout`. Builds a hosted checkout session for the order.
pub async fn create_checkout<B, P>(
    claims: AuthClaims,
    api: web::Data<PaymentsApi<B, P>>,
    config: web::Data<ServerConfig>,
    body: web::Json<CheckoutPayload>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderFlowDatabase + 'static,
    P: PaymentProcessor + 'static,
{
    let payload = body.into_inner();
    authorize_order_access(api.db(), payload.order_id, &claims).await?;
    let success_url = payload.success_url.as_deref().unwrap_or(config.success_url.as_str());
    let cancel_url = payload.cancel_url.as_deref().unwrap_or(config.cancel_url.as_str());
    let (handle, _order) =
        api.create_checkout(payload.order_id, &payload.items, success_url, cancel_url).await?;
    Ok(HttpResponse::Ok().json(CheckoutResponse { session_id: handle.session_id, url: handle.url }))
}

/// `POST /api/payment/refund/{order_id}`. Admin only.
pub async fn refund_order<B, P>(
    claims: AuthClaims,
    api: web::Data<RefundApi<B, P>>,
    path: web::Path<i64>,
    body: Option<web::Json<RefundPayload>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderFlowDatabase + 'static,
    P: PaymentProcessor + 'static,
{
    if !claims.is_admin() {
        return Err(ServerError::InsufficientPermissions("Only admins may issue refunds".to_string()));
    }
    let order_id = path.into_inner();
    let payload = body.map(|b| b.into_inner()).unwrap_or_default();
    let (order, refund) = api.refund(order_id, payload.amount, payload.reason.as_deref()).await?;
    Ok(HttpResponse::Ok().json(RefundResponse { order, refund }))
}

/// `GET /api/payment/intent/{payment_intent_id}`. Pass-through read of the gateway's view; admins may read
/// any payment, buyers only their own.
pub async fn payment_details<B, P>(
    claims: AuthClaims,
    api: web::Data<PaymentsApi<B, P>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderFlowDatabase + 'static,
    P: PaymentProcessor + 'static,
{
    let payment_intent_id = path.into_inner();
    if !claims.is_admin() {
        let order = api.db().fetch_order_by_payment_intent(&payment_intent_id).await?;
        match order {
            Some(order) if order.user_id == claims.user_id => {},
            _ => {
                return Err(ServerError::InsufficientPermissions(
                    "You do not have access to this payment".to_string(),
                ));
            },
        }
    }
    let details = api.payment_details(&payment_intent_id).await?;
    Ok(HttpResponse::Ok().json(details))
}

/// `POST /payment/webhook`. No session auth: the raw body is authenticated by its signature alone, and the
/// payload is never parsed before the signature checks out.
///
/// Response policy: signature failures are 400 (a permanent failure must not be retried); unresolvable or
/// unrecognized events are acknowledged with 200 so the provider stops redelivering them; only storage
/// failures surface as 5xx, which is exactly the class of failure a redelivery can fix.
pub async fn payment_webhook<B>(
    req: HttpRequest,
    body: web::Bytes,
    verifier: web::Data<WebhookVerifier>,
    api: web::Data<WebhookReconciler<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderFlowDatabase + 'static,
{
    trace!("🔔️ Received webhook delivery: {}", req.uri());
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ServerError::WebhookAuthError)?;
    verifier.verify(signature, body.as_ref())?;
    let event: Event = serde_json::from_slice(body.as_ref()).map_err(|e| {
        warn!("🔔️ Verified webhook payload could not be parsed: {e}");
        ServerError::ValidationError("Unparseable event payload".to_string())
    })?;
    let gateway_event = gateway_event_from_stripe(&event);
    api.process_event(gateway_event).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })))
}

async fn authorize_order_access<B>(db: &B, order_id: i64, claims: &AuthClaims) -> Result<(), ServerError>
where B: OrderManagement {
    let order =
        db.fetch_order(order_id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id}")))?;
    if order.user_id != claims.user_id && !claims.is_admin() {
        return Err(ServerError::InsufficientPermissions("You do not have access to this order".to_string()));
    }
    Ok(())
}
