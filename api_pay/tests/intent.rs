use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use actix_web::{
    App,
    dev::ServiceResponse,
    http::{Method, StatusCode, header},
    test, web,
};
use api_pay::{mount_pay, mount_serverless};
use async_trait::async_trait;
use common::{
    cors,
    env_config::Config,
    error::{AppError, Res},
    stripe::{IntentHandle, IntentParams, PaymentProcessor},
};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create(IntentParams),
    Update(String, IntentParams),
}

/// Records every call instead of talking to Stripe.
#[derive(Default)]
struct MockProcessor {
    calls: Mutex<Vec<Call>>,
    delay: Option<Duration>,
    fail: bool,
}

impl MockProcessor {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    async fn respond(&self, id: &str) -> Res<IntentHandle> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(AppError::Processor(format!("No such payment_intent: '{}'", id)));
        }
        Ok(IntentHandle {
            id: id.to_string(),
            client_secret: format!("{}_secret_test", id),
        })
    }
}

#[async_trait]
impl PaymentProcessor for MockProcessor {
    async fn create_intent(&self, params: IntentParams) -> Res<IntentHandle> {
        self.calls.lock().unwrap().push(Call::Create(params));
        self.respond("pi_new").await
    }

    async fn update_intent(&self, id: &str, params: IntentParams) -> Res<IntentHandle> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Update(id.to_string(), params));
        self.respond(id).await
    }
}

fn config_with(vars: &[(&str, &str)]) -> Arc<Config> {
    let mut map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    map.insert("STRIPE_SECRET_KEY".to_string(), "sk_test_123".to_string());
    Config::from_lookup(|name| map.get(name).cloned()).unwrap()
}

fn config() -> Arc<Config> {
    config_with(&[])
}

macro_rules! app {
    ($processor:expr, $config:expr) => {{
        let processor: Arc<dyn PaymentProcessor> = $processor.clone();
        let config: Arc<Config> = $config;
        test::init_service(
            App::new()
                .wrap(cors::default(config.deployment))
                .app_data(web::Data::from(processor))
                .app_data(web::Data::new(config))
                .service(mount_pay())
                .service(mount_serverless()),
        )
        .await
    }};
}

fn post(uri: &str, body: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload(body.to_string())
}

fn header_of<B>(resp: &ServiceResponse<B>, name: header::HeaderName) -> String {
    resp.headers()
        .get(name)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default()
}

#[actix_web::test]
async fn create_without_intent_id() {
    let processor = Arc::new(MockProcessor::default());
    let app = app!(processor, config());

    let body = json!({
        "amount": 210,
        "customerDetails": { "email": "a@b.com", "suburb": "Bondi" }
    });
    let resp = test::call_service(
        &app,
        post("/api/create-payment-intent", &body.to_string()).to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        header_of(&resp, header::CACHE_CONTROL),
        "no-store, must-revalidate"
    );
    assert_eq!(header_of(&resp, header::PRAGMA), "no-cache");
    assert_eq!(header_of(&resp, header::ACCESS_CONTROL_ALLOW_ORIGIN), "*");

    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["paymentIntentId"], "pi_new");
    assert_eq!(json["clientSecret"], "pi_new_secret_test");

    let calls = processor.calls();
    assert_eq!(calls.len(), 1);
    let Call::Create(params) = &calls[0] else {
        panic!("expected a create call, got {:?}", calls[0]);
    };
    assert_eq!(params.amount_minor, 21000);
    assert_eq!(params.metadata["email"], "a@b.com");
    assert_eq!(params.metadata["phone"], "");
    assert!(params.metadata.contains_key("timestamp"));
    assert_eq!(params.metadata["timestamp"], params.metadata["updatedAt"]);
}

#[actix_web::test]
async fn update_with_intent_id() {
    let processor = Arc::new(MockProcessor::default());
    let app = app!(processor, config());

    let body = json!({ "amount": 240, "paymentIntentId": "pi_123", "includeCprSign": true });
    let resp = test::call_service(
        &app,
        post("/api/create-payment-intent", &body.to_string()).to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json["paymentIntentId"], "pi_123");
    assert_eq!(json["clientSecret"], "pi_123_secret_test");

    let calls = processor.calls();
    assert_eq!(calls.len(), 1);
    let Call::Update(id, params) = &calls[0] else {
        panic!("expected an update call, got {:?}", calls[0]);
    };
    assert_eq!(id, "pi_123");
    assert_eq!(params.amount_minor, 24000);
    assert_eq!(params.metadata["includeCprSign"], "yes");
    assert_eq!(params.metadata["totalAmount"], "240");
    assert!(params.metadata.contains_key("updatedAt"));
    assert!(!params.metadata.contains_key("timestamp"));
}

#[actix_web::test]
async fn client_amount_does_not_set_the_price() {
    let processor = Arc::new(MockProcessor::default());
    let app = app!(processor, config());

    let resp = test::call_service(
        &app,
        post("/api/create-payment-intent", r#"{"amount": 1}"#).to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let calls = processor.calls();
    assert!(matches!(&calls[..], [Call::Create(p)] if p.amount_minor == 21000));
}

#[actix_web::test]
async fn invalid_amounts_never_reach_the_processor() {
    let processor = Arc::new(MockProcessor::default());
    let app = app!(processor, config());

    for body in [
        r#"{"amount": 0}"#,
        r#"{"amount": -10, "paymentIntentId": "pi_123"}"#,
        r#"{"customerDetails": {}}"#,
        "",
    ] {
        let resp =
            test::call_service(&app, post("/api/create-payment-intent", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {:?}", body);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json, json!({ "error": "Invalid amount" }));
    }

    assert!(processor.calls().is_empty());
}

#[actix_web::test]
async fn malformed_body_never_reaches_the_processor() {
    let processor = Arc::new(MockProcessor::default());
    let app = app!(processor, config());

    let resp = test::call_service(
        &app,
        post("/api/create-payment-intent", r#"{"amount": 210,"#).to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        header_of(&resp, header::CACHE_CONTROL),
        "no-store, must-revalidate"
    );
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json, json!({ "error": "Invalid request body" }));

    for body in ["42", "null", "[]"] {
        let resp =
            test::call_service(&app, post("/api/create-payment-intent", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {:?}", body);
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json, json!({ "error": "Invalid request body" }));
    }
    assert!(processor.calls().is_empty());
}

#[actix_web::test]
async fn preflight_is_empty_no_content() {
    let processor = Arc::new(MockProcessor::default());
    let app = app!(processor, config());

    let req = test::TestRequest::default()
        .method(Method::OPTIONS)
        .uri("/api/create-payment-intent")
        .set_payload("not even json")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(header_of(&resp, header::ACCESS_CONTROL_ALLOW_ORIGIN), "*");
    assert_eq!(
        header_of(&resp, header::ACCESS_CONTROL_ALLOW_CREDENTIALS),
        "true"
    );
    assert_eq!(
        header_of(&resp, header::ACCESS_CONTROL_ALLOW_METHODS),
        "GET, POST, PUT, DELETE, OPTIONS"
    );
    assert!(test::read_body(resp).await.is_empty());
    assert!(processor.calls().is_empty());
}

#[actix_web::test]
async fn serverless_path_advertises_post_only() {
    let processor = Arc::new(MockProcessor::default());
    let app = app!(processor, config_with(&[("DEPLOYMENT_TARGET", "serverless")]));

    let req = test::TestRequest::default()
        .method(Method::OPTIONS)
        .uri("/.netlify/functions/create-payment-intent")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        header_of(&resp, header::ACCESS_CONTROL_ALLOW_METHODS),
        "POST, OPTIONS"
    );

    let resp = test::call_service(
        &app,
        post(
            "/.netlify/functions/create-payment-intent",
            r#"{"amount": 210}"#,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(processor.calls().len(), 1);
}

#[actix_web::test]
async fn other_methods_are_not_allowed() {
    let processor = Arc::new(MockProcessor::default());
    let app = app!(processor, config());

    for method in [Method::GET, Method::PUT, Method::DELETE] {
        let req = test::TestRequest::default()
            .method(method.clone())
            .uri("/api/create-payment-intent")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{}", method);
        assert_eq!(header_of(&resp, header::ACCESS_CONTROL_ALLOW_ORIGIN), "*");
        let json: Value = test::read_body_json(resp).await;
        assert_eq!(json, json!({ "error": "Method not allowed" }));
    }
    assert!(processor.calls().is_empty());
}

#[actix_web::test]
async fn processor_failure_is_a_server_error() {
    let processor = Arc::new(MockProcessor {
        fail: true,
        ..Default::default()
    });
    let app = app!(processor, config());

    let resp = test::call_service(
        &app,
        post(
            "/api/create-payment-intent",
            r#"{"amount": 210, "paymentIntentId": "pi_gone"}"#,
        )
        .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = test::read_body_json(resp).await;
    assert!(json["error"].is_string());
    assert_eq!(processor.calls().len(), 1);
}

#[actix_web::test]
async fn slow_processor_times_out() {
    let processor = Arc::new(MockProcessor {
        delay: Some(Duration::from_secs(5)),
        ..Default::default()
    });
    let mut config = (*config()).clone();
    config.processor_timeout = Duration::from_millis(20);
    let app = app!(processor, Arc::new(config));

    let resp = test::call_service(
        &app,
        post("/api/create-payment-intent", r#"{"amount": 210}"#).to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json, json!({ "error": "Request timeout" }));
    // the call was issued; its outcome is unknown
    assert_eq!(processor.calls().len(), 1);
}

#[actix_web::test]
async fn catalog_lists_server_prices() {
    let processor = Arc::new(MockProcessor::default());
    let app = app!(processor, config_with(&[("CPR_SIGN_PRICE_CENTS", "3550")]));

    let req = test::TestRequest::get().uri("/api/catalog").to_request();
    let json: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(json["currency"], "AUD");
    assert_eq!(json["baseAmount"], 210.0);
    assert_eq!(json["cprSignAmount"], 35.5);
}

#[actix_web::test]
async fn oversized_body_is_rejected_as_json() {
    let processor = Arc::new(MockProcessor::default());
    let app = app!(processor, config());

    let body = json!({
        "amount": 210,
        "customerDetails": { "notes": "x".repeat(300_000) }
    });
    let resp = test::call_service(
        &app,
        post("/api/create-payment-intent", &body.to_string()).to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        header_of(&resp, header::CACHE_CONTROL),
        "no-store, must-revalidate"
    );
    assert_eq!(header_of(&resp, header::PRAGMA), "no-cache");
    assert_eq!(header_of(&resp, header::ACCESS_CONTROL_ALLOW_ORIGIN), "*");
    let json: Value = test::read_body_json(resp).await;
    assert_eq!(json, json!({ "error": "Payload too large" }));
    assert!(processor.calls().is_empty());
}

#[actix_web::test]
async fn body_limit_follows_config() {
    let processor = Arc::new(MockProcessor::default());
    let app = app!(processor, config_with(&[("MAX_BODY_BYTES", "32")]));

    let resp = test::call_service(
        &app,
        post(
            "/api/create-payment-intent",
            r#"{"amount": 210, "includeCprSign": false}"#,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let resp = test::call_service(
        &app,
        post("/api/create-payment-intent", r#"{"amount": 210}"#).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}
