use chrono::{TimeZone, Utc};
use market_order_engine::{
    db_types::{
        CartLine,
        GatewayEvent,
        NewOrderRequest,
        NewRefund,
        Order,
        OrderItem,
        OrderNumber,
        OrderStatus,
        PaymentEvent,
        PaymentStatus,
        Product,
        RefundRecord,
        ShippingAddress,
        WebhookOutcome,
    },
    helpers::PricingPolicy,
    traits::{OrderFlowDatabase, OrderFlowError, OrderManagement, OrderQueryError},
};
use mockall::mock;
use mos_common::Money;

mock! {
    pub FlowBackend {}
    impl OrderManagement for FlowBackend {
        async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderQueryError>;
        async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderQueryError>;
        async fn fetch_order_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Order>, OrderQueryError>;
        async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderQueryError>;
        async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, OrderQueryError>;
        async fn order_contains_seller(&self, order_id: i64, seller_id: &str) -> Result<bool, OrderQueryError>;
        async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, OrderQueryError>;
        async fn fetch_cart(&self, user_id: &str) -> Result<Vec<CartLine>, OrderQueryError>;
        async fn fetch_refunds_for_order(&self, order_id: i64) -> Result<Vec<RefundRecord>, OrderQueryError>;
        async fn fetch_payment_event(&self, event_id: &str) -> Result<Option<PaymentEvent>, OrderQueryError>;
    }
    impl OrderFlowDatabase for FlowBackend {
        fn url(&self) -> &str;
        async fn create_order_from_cart(
            &self,
            user_id: &str,
            request: NewOrderRequest,
            pricing: &PricingPolicy,
        ) -> Result<(Order, Vec<OrderItem>), OrderFlowError>;
        async fn transition_order(&self, order_id: i64, new_status: OrderStatus) -> Result<Order, OrderFlowError>;
        async fn apply_payment_event(&self, event: GatewayEvent) -> Result<WebhookOutcome, OrderFlowError>;
        async fn store_payment_intent(&self, order_id: i64, payment_intent_id: &str) -> Result<Order, OrderFlowError>;
        async fn store_checkout_session(&self, order_id: i64, session_id: &str) -> Result<Order, OrderFlowError>;
        async fn total_refunded(&self, order_id: i64) -> Result<Money, OrderFlowError>;
        async fn record_refund(&self, order_id: i64, refund: NewRefund) -> Result<(Order, RefundRecord), OrderFlowError>;
        async fn mark_refund_pending(&self, order_id: i64) -> Result<Order, OrderFlowError>;
    }
}

pub fn sample_order(id: i64, user_id: &str) -> Order {
    let created = Utc.with_ymd_and_hms(2024, 7, 15, 10, 30, 0).unwrap();
    Order {
        id,
        order_number: OrderNumber(format!("MO-1721039400000-{id:04}")),
        user_id: user_id.to_string(),
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
        subtotal: Money::from_cents(2000),
        tax: Money::from_cents(200),
        shipping: Money::from_cents(1000),
        total: Money::from_cents(3200),
        shipping_address: ShippingAddress {
            street: "12 Harbour Lane".to_string(),
            city: "Port Devon".to_string(),
            state: "WC".to_string(),
            zip_code: "8001".to_string(),
            country: "ZA".to_string(),
        },
        payment_method: "card".to_string(),
        notes: None,
        payment_intent_id: None,
        checkout_session_id: None,
        refund_status: None,
        captured_amount: None,
        captured_currency: None,
        failure_reason: None,
        created_at: created,
        updated_at: created,
        shipped_at: None,
        delivered_at: None,
    }
}

pub fn sample_items(order_id: i64) -> Vec<OrderItem> {
    vec![OrderItem {
        id: 1,
        order_id,
        product_id: 11,
        quantity: 2,
        price: Money::from_cents(1000),
        total: Money::from_cents(2000),
    }]
}
