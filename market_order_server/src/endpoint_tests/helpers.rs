use actix_web::{http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};

use crate::auth::{USER_ID_HEADER, USER_ROLES_HEADER};

/// `(user id, comma-separated roles)` as the upstream auth proxy would assert them.
pub type Identity<'a> = Option<(&'a str, &'a str)>;

pub async fn get_request(
    identity: Identity<'_>,
    path: &str,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    let req = with_identity(TestRequest::get().uri(path), identity);
    call(req, configure).await
}

pub async fn post_json(
    identity: Identity<'_>,
    path: &str,
    body: serde_json::Value,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    let req = with_identity(TestRequest::post().uri(path).set_json(body), identity);
    call(req, configure).await
}

pub async fn put_json(
    identity: Identity<'_>,
    path: &str,
    body: serde_json::Value,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    let req = with_identity(TestRequest::put().uri(path).set_json(body), identity);
    call(req, configure).await
}

/// Sends a raw-body POST, as the payment provider does for webhook deliveries.
pub async fn post_raw(
    path: &str,
    body: Vec<u8>,
    headers: Vec<(&str, String)>,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri(path).set_payload(body);
    for (name, value) in headers {
        req = req.insert_header((name, value));
    }
    call(req, configure).await
}

fn with_identity(mut req: TestRequest, identity: Identity<'_>) -> TestRequest {
    if let Some((user, roles)) = identity {
        req = req.insert_header((USER_ID_HEADER, user)).insert_header((USER_ROLES_HEADER, roles));
    }
    req
}

async fn call(req: TestRequest, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let _ = env_logger::try_init();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}
