use actix_web::{
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use log::debug;
use serde_json::Value;

use crate::{
    auth::{ROLE_HEADER, USER_ID_HEADER},
    server::json_error_handler,
};

/// Adds the caller identity headers the dashboard would send.
pub fn as_user(req: TestRequest, user_id: i64) -> TestRequest {
    req.insert_header((USER_ID_HEADER, user_id.to_string()))
}

pub fn as_admin(req: TestRequest, user_id: i64) -> TestRequest {
    as_user(req, user_id).insert_header((ROLE_HEADER, "ADMIN"))
}

/// Sends `req` to an app set up by `configure` and returns the status and the parsed JSON body. Errors raised by
/// middleware are rendered the same way the server would render them.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, Value)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().app_data(web::JsonConfig::default().error_handler(json_error_handler)).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (status, body) = match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            (status, test::read_body(res).await)
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = actix_web::body::to_bytes(res.into_body()).await.expect("Could not read error body");
            (status, body)
        },
    };
    let json = serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into()));
    (status, json)
}
