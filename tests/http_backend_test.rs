//! Drives the reqwest adapter against an in-process fake backend.
//!
//! The fake is a small actix-web app bound to an ephemeral port; every write
//! it receives is recorded so tests can assert on paths and bodies.

use std::sync::Mutex;
use std::time::Duration;

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::{json, Value};

use stock_requests::domain::builder::DraftLineItem;
use stock_requests::domain::inventory::{CatalogQuery, CatalogResult};
use stock_requests::domain::ports::{
    AuthGateway, AutoConfirm, CatalogPort, Credentials, RackGateway, RequestFeed, RequestGateway,
    SettingsGateway,
};
use stock_requests::domain::request::{LineKey, RequestId};
use stock_requests::domain::session::{Role, Session};
use stock_requests::domain::status::LineStatus;
use stock_requests::{ActionOutcome, AppError, HttpBackend, LifecycleEngine};

const TOKEN: &str = "tok-1";

#[derive(Default)]
struct Recorded {
    writes: Mutex<Vec<(String, Value)>>,
}

impl Recorded {
    fn push(&self, what: String, body: Value) {
        self.writes.lock().unwrap().push((what, body));
    }
}

fn authorized(req: &HttpRequest) -> bool {
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn rows() -> Value {
    json!([
        {
            "id": "10", "adding_number": 1, "user_name": "ayse", "selectedViewer": "mehmet",
            "productCode": "M6", "description": "hex bolt", "standard": "ISO 4017",
            "requestedQuantity": "3", "availableQuantity": 40, "status": "Pending",
            "updated_at": "2024-03-01 08:15:00"
        },
        {
            "id": 11, "adding_number": "1", "user_name": "ayse", "selectedViewer": "mehmet",
            "productCode": "M8", "description": "hex nut", "standard": "DIN 934",
            "requestedQuantity": 5, "availableQuantity": "12", "status": "Preparing",
            "preparing_at": "2024-03-01T09:00:00Z"
        }
    ])
}

async fn login(body: web::Json<Value>) -> HttpResponse {
    if body["password"] == "pw" {
        HttpResponse::Ok().json(json!({"token": TOKEN, "user": {"id": 7, "role": "Reviewer"}}))
    } else {
        HttpResponse::Unauthorized().json(json!({"message": "Invalid credentials"}))
    }
}

async fn list_rows(req: HttpRequest) -> HttpResponse {
    if !authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    HttpResponse::Ok().json(rows())
}

async fn create_request(
    req: HttpRequest,
    body: web::Json<Value>,
    recorded: web::Data<Recorded>,
) -> HttpResponse {
    if !authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    let too_many = body["input"]
        .as_array()
        .into_iter()
        .flatten()
        .any(|line| line["requestedQuantity"].as_u64() > line["availableQty"].as_u64());
    if too_many {
        return HttpResponse::BadRequest().json(json!({"message": "Not enough stock for M6"}));
    }
    recorded.push("POST /api/requests".into(), body.into_inner());
    HttpResponse::Created().json(json!({"request_id": 88}))
}

async fn update_item(
    req: HttpRequest,
    path: web::Path<(u64, String, u64)>,
    body: web::Json<Value>,
    recorded: web::Data<Recorded>,
) -> HttpResponse {
    if !authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    let (request, code, line) = path.into_inner();
    recorded.push(
        format!("PUT /api/updaterequests/{request}/{code}/{line}"),
        body.into_inner(),
    );
    HttpResponse::Ok().json(json!({"message": "updated"}))
}

async fn update_request(
    req: HttpRequest,
    path: web::Path<u64>,
    body: web::Json<Value>,
    recorded: web::Data<Recorded>,
) -> HttpResponse {
    if !authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    recorded.push(format!("PUT /api/requests/{}", path.into_inner()), body.into_inner());
    HttpResponse::Ok().finish()
}

async fn product_detail(req: HttpRequest, body: web::Json<Value>) -> HttpResponse {
    if !authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    if body["product_code"] == "" {
        return HttpResponse::Accepted().json(json!({"message": "No product matched"}));
    }
    HttpResponse::Ok().json(json!([
        {"id": 3, "product_code": "M6", "quantity": "40", "description": "hex bolt", "standard": "ISO 4017"}
    ]))
}

async fn rack_data(req: HttpRequest) -> HttpResponse {
    if !authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    HttpResponse::Ok().json(json!([
        {"id": 1, "rack": "2", "level": 1, "product_code": "M6", "quantity": 40,
         "unit_weight_gram": "12.5", "total_weight_kg": 0.5, "status": "full"}
    ]))
}

async fn mail_settings(req: HttpRequest) -> HttpResponse {
    if !authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    HttpResponse::Ok().json(json!([
        {"systemMail": "stock@example.com", "smtpPassword": "x", "requestCreator": "a@example.com",
         "viewerMail": "b@example.com", "lowStockMail": "c@example.com"}
    ]))
}

async fn broken() -> HttpResponse {
    HttpResponse::InternalServerError().body("database down")
}

/// Start the fake backend and return its base URL plus the write log.
fn start_backend() -> (String, web::Data<Recorded>) {
    let recorded = web::Data::new(Recorded::default());
    let data = recorded.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/auth/login", web::post().to(login))
            .service(
                web::scope("/api")
                    .route("/requests", web::get().to(list_rows))
                    .route("/requests", web::post().to(create_request))
                    .route("/requests/{id}", web::put().to(update_request))
                    .route("/getactivereqeusts", web::get().to(list_rows))
                    .route("/updaterequests/{req}/{code}/{line}", web::put().to(update_item))
                    .route("/product_detail", web::post().to(product_detail))
                    .route("/rack_data", web::get().to(rack_data))
                    .route("/mail_settings", web::get().to(mail_settings))
                    .route("/dashboard_data", web::get().to(broken)),
            )
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("bind fake backend");
    let addr = server.addrs()[0];
    tokio::spawn(server.run());
    (format!("http://{addr}"), recorded)
}

fn backend(base_url: &str) -> HttpBackend {
    HttpBackend::new(base_url, Duration::from_secs(5)).unwrap()
}

fn session() -> Session {
    Session {
        token: TOKEN.into(),
        user_id: "7".into(),
        user_name: "mehmet".into(),
        role: Role::Reviewer,
    }
}

fn credentials(password: &str) -> Credentials {
    Credentials {
        username: "mehmet".into(),
        password: password.into(),
    }
}

#[tokio::test]
async fn login_returns_a_session_with_role() {
    let (url, _) = start_backend();
    let backend = backend(&url);

    let session = backend.login(&credentials("pw")).await.unwrap();
    assert_eq!(session.token, TOKEN);
    assert_eq!(session.user_id, "7");
    assert_eq!(session.role, Role::Reviewer);

    let err = backend.login(&credentials("nope")).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
}

#[tokio::test]
async fn rows_with_mixed_scalars_are_parsed() {
    let (url, _) = start_backend();
    let rows = backend(&url)
        .list_requests(&session(), RequestFeed::All)
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, 10);
    assert_eq!(rows[0].request_id, RequestId(1));
    assert_eq!(rows[0].requested_quantity, 3);
    assert!(rows[0].timestamps.updated.is_some());
    assert_eq!(rows[1].available_quantity, 12);
    assert_eq!(rows[1].status, LineStatus::Preparing);
}

#[tokio::test]
async fn missing_bearer_is_unauthorized() {
    let (url, _) = start_backend();
    let stale = Session {
        token: "expired".into(),
        ..session()
    };
    let err = backend(&url)
        .list_requests(&stale, RequestFeed::Active)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
    assert_eq!(err.user_message(), "Please sign in again.");
}

#[tokio::test]
async fn create_request_posts_one_batch() {
    let (url, recorded) = start_backend();
    let lines = vec![
        DraftLineItem {
            product_code: "M6".into(),
            description: "hex bolt".into(),
            standard: "ISO 4017".into(),
            requested_quantity: 3,
            available_quantity: 40,
        },
        DraftLineItem {
            product_code: "M8".into(),
            description: "hex nut".into(),
            standard: "DIN 934".into(),
            requested_quantity: 5,
            available_quantity: 12,
        },
    ];

    let id = backend(&url).create_request(&session(), &lines).await.unwrap();
    assert_eq!(id, RequestId(88));

    let writes = recorded.writes.lock().unwrap();
    assert_eq!(writes.len(), 1);
    let (what, body) = &writes[0];
    assert_eq!(what, "POST /api/requests");
    assert_eq!(body["userId"], "7");
    assert_eq!(body["input"][1]["productCode"], "M8");
    assert_eq!(body["input"][1]["requestedQuantity"], 5);
}

#[tokio::test]
async fn server_rejection_message_is_surfaced() {
    let (url, recorded) = start_backend();
    let lines = vec![DraftLineItem {
        product_code: "M6".into(),
        description: String::new(),
        standard: String::new(),
        requested_quantity: 50,
        available_quantity: 40,
    }];

    let err = backend(&url)
        .create_request(&session(), &lines)
        .await
        .unwrap_err();
    assert!(matches!(&err, AppError::ServerValidation(msg) if msg == "Not enough stock for M6"));
    assert_eq!(err.user_message(), "Not enough stock for M6");
    assert!(recorded.writes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn catalog_notice_and_slots() {
    let (url, _) = start_backend();
    let backend = backend(&url);

    let notice = backend
        .search(&session(), &CatalogQuery::default())
        .await
        .unwrap();
    assert_eq!(notice, CatalogResult::Notice("No product matched".into()));

    let found = backend
        .search(&session(), &CatalogQuery::by_code("M6"))
        .await
        .unwrap();
    assert_eq!(found.slots()[0].available_quantity, 40);
}

#[tokio::test]
async fn server_errors_are_generic_to_the_user() {
    let (url, _) = start_backend();
    let err = backend(&url).dashboard(&session()).await.unwrap_err();
    assert!(matches!(&err, AppError::Network(msg) if msg.contains("500")));
    assert_eq!(err.user_message(), "An unexpected error occurred.");
}

#[tokio::test]
async fn racks_and_settings_are_read() {
    let (url, _) = start_backend();
    let backend = backend(&url);

    let slots = backend.list_slots(&session()).await.unwrap();
    assert_eq!(slots[0].rack, 2);
    assert!((slots[0].unit_weight_gram - 12.5).abs() < 1e-9);

    let mail = backend.mail_settings(&session()).await.unwrap();
    assert_eq!(mail.system_mail, "stock@example.com");
}

#[tokio::test]
async fn lifecycle_actions_hit_the_expected_endpoints() {
    let (url, recorded) = start_backend();
    let engine = LifecycleEngine::new(
        backend(&url),
        session(),
        RequestFeed::Active,
        Box::new(AutoConfirm),
    );
    engine.refresh().await.unwrap();

    assert_eq!(engine.begin_prepare(10).await.unwrap(), ActionOutcome::Applied);
    assert_eq!(
        engine.cancel_request(RequestId(1)).await.unwrap(),
        ActionOutcome::Applied
    );

    let writes = recorded.writes.lock().unwrap();
    assert_eq!(
        *writes,
        vec![
            (
                "PUT /api/updaterequests/1/M6/10".to_string(),
                json!({"status": "Preparing"})
            ),
            (
                "PUT /api/requests/1".to_string(),
                json!({"status": "Cancelled"})
            ),
        ]
    );
}

#[tokio::test]
async fn product_codes_with_reserved_characters_reach_the_item_route() {
    let (url, recorded) = start_backend();
    let key = LineKey {
        request_id: RequestId(12),
        product_code: "M8#2".into(),
        line_id: 301,
    };

    backend(&url)
        .update_item_status(&session(), &key, LineStatus::Ready)
        .await
        .unwrap();

    let writes = recorded.writes.lock().unwrap();
    assert_eq!(writes.len(), 1);
    let (what, body) = &writes[0];
    assert!(what.starts_with("PUT /api/updaterequests/12/M8"), "{what}");
    assert!(what.ends_with("/301"), "{what}");
    assert_eq!(body, &json!({"status": "Ready"}));
}
