//! Order lifecycle request handlers.
//!
//! Handlers are generic over the backend trait so the endpoint tests can run them against mocks. Since each
//! worker thread processes requests concurrently, nothing here may block: all I/O is awaited.

use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use market_order_engine::{
    traits::{OrderFlowDatabase, OrderManagement},
    OrderFlowApi,
};

use crate::{
    auth::{AuthClaims, Role},
    data_objects::{CancelOrderPayload, NewOrderPayload, OrderResponse, UpdateStatusPayload},
    errors::ServerError,
};

pub fn configure_order_routes<B>(cfg: &mut web::ServiceConfig)
where B: OrderFlowDatabase + 'static {
    cfg.route("/orders", web::post().to(create_order::<B>))
        .route("/orders/{id}", web::get().to(get_order::<B>))
        .route("/orders/{id}/cancel", web::post().to(cancel_order::<B>))
        .route("/orders/{id}/status", web::put().to(update_order_status::<B>));
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------   Orders  ----------------------------------------------------

/// `POST /api/orders`. Creates an order from the caller's cart; the whole operation (stock reservation,
/// order persistence, cart clearing) is atomic in the engine.
pub async fn create_order<B>(
    claims: AuthClaims,
    api: web::Data<OrderFlowApi<B>>,
    body: web::Json<NewOrderPayload>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderFlowDatabase + 'static,
{
    trace!("💻️ POST /orders for user {}", claims.user_id);
    let (order, items) = api.place_order(&claims.user_id, body.into_inner().into()).await?;
    Ok(HttpResponse::Created().json(OrderResponse { order, items }))
}

/// `GET /api/orders/{id}`. Readable by the buyer, a seller of a contained item, or an admin.
pub async fn get_order<B>(
    claims: AuthClaims,
    api: web::Data<OrderFlowApi<B>>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderFlowDatabase + 'static,
{
    let order_id = path.into_inner();
    let order = api
        .db()
        .fetch_order(order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id}")))?;
    let is_buyer = order.user_id == claims.user_id;
    let is_seller_of_item = !is_buyer
        && !claims.is_admin()
        && api.db().order_contains_seller(order_id, &claims.user_id).await?;
    if !(is_buyer || claims.is_admin() || is_seller_of_item) {
        debug!("💻️ User {} may not view order {order_id}", claims.user_id);
        return Err(ServerError::InsufficientPermissions("You do not have access to this order".to_string()));
    }
    let items = api.db().fetch_order_items(order_id).await?;
    Ok(HttpResponse::Ok().json(OrderResponse { order, items }))
}

/// `POST /api/orders/{id}/cancel`. Only the buyer or an admin may cancel; the engine enforces which states
/// are cancellable and returns the stock.
pub async fn cancel_order<B>(
    claims: AuthClaims,
    api: web::Data<OrderFlowApi<B>>,
    path: web::Path<i64>,
    body: Option<web::Json<CancelOrderPayload>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderFlowDatabase + 'static,
{
    let order_id = path.into_inner();
    let order = api
        .db()
        .fetch_order(order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id}")))?;
    if order.user_id != claims.user_id && !claims.is_admin() {
        return Err(ServerError::InsufficientPermissions("You may not cancel this order".to_string()));
    }
    if let Some(reason) = body.and_then(|b| b.into_inner().reason) {
        info!("💻️ Order {order_id} cancellation requested by {}: {reason}", claims.user_id);
    }
    let order = api.cancel_order(order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

/// `PUT /api/orders/{id}/status`. Sellers move their orders through fulfilment; admins may drive any order.
pub async fn update_order_status<B>(
    claims: AuthClaims,
    api: web::Data<OrderFlowApi<B>>,
    path: web::Path<i64>,
    body: web::Json<UpdateStatusPayload>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderFlowDatabase + 'static,
{
    let order_id = path.into_inner();
    let new_status = body.into_inner().status;
    if !claims.is_admin() {
        if !claims.has_role(Role::Seller) {
            return Err(ServerError::InsufficientPermissions(
                "Only sellers and admins may change order status".to_string(),
            ));
        }
        if !api.db().order_contains_seller(order_id, &claims.user_id).await? {
            return Err(ServerError::InsufficientPermissions(
                "None of the items in this order are yours".to_string(),
            ));
        }
    }
    let order = api.set_order_status(order_id, new_status).await?;
    Ok(HttpResponse::Ok().json(order))
}
