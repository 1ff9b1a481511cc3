use std::sync::{Arc, Mutex};

use actix_web::{App, HttpResponse, http::StatusCode, http::header, test, web};
use chrono::{DateTime, Duration, Utc};
use common::env_config::{Config, JwtConfig, RateLimitConfig, TokenConfig};
use common::error::{AppError, Res};
use common::jwt::SESSION_COOKIE;
use db::{
    UserStore,
    dtos::user::UserCreateRequest,
    memory::MemoryStore,
    models::user::{TokenKind, User},
};
use mailer::{Email, MailError, Mailer};
use serde_json::{Value, json};
use uuid::Uuid;

const SECRET: &str = "integration-secret";

#[derive(Clone, Default)]
struct RecordingMailer {
    sent: Arc<Mutex<Vec<Email>>>,
    fail: bool,
}

impl RecordingMailer {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn attempts(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Raw token from the link in the last email.
    fn last_token(&self) -> String {
        let sent = self.sent.lock().unwrap();
        let html = &sent.last().expect("an email was sent").html;
        let start = html.find("token=").expect("link with token") + "token=".len();
        html[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect()
    }
}

impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email.clone());
        if self.fail {
            return Err(MailError::Unreachable("connection refused".to_string()));
        }
        Ok(())
    }
}

fn config() -> Arc<Config> {
    Arc::new(Config {
        environment: "development".to_string(),
        database_url: String::new(),
        jwt_config: JwtConfig {
            secret: SECRET.to_string(),
        },
        token_config: TokenConfig {
            secret: "token-secret".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
            email_timeout_secs: 2,
        },
        server_host: "127.0.0.1".to_string(),
        server_port: 8080,
        num_workers: 1,
        cors_allowed_origin: "http://localhost:3000".to_string(),
        console_logging_enabled: false,
        smtp: None,
        rate_limit: RateLimitConfig {
            max_requests: 100,
            window_secs: 60,
        },
        export_timeout_secs: 5,
    })
}

async fn ok() -> HttpResponse {
    HttpResponse::Ok().finish()
}

macro_rules! app {
    ($store:expr, $mailer:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($store.clone()))
                .app_data(web::Data::new($mailer.clone()))
                .app_data(web::Data::new(config()))
                .wrap(api_auth::gate_middleware())
                .wrap(extractor::middleware(SECRET))
                .service(api_auth::mount_auth::<MemoryStore, RecordingMailer>())
                .configure(api_auth::configure_account::<MemoryStore>)
                .route("/", web::get().to(ok))
                .route("/dashboard", web::get().to(ok)),
        )
        .await
    };
}

fn register(email: &str, password: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "email": email, "password": password }))
}

fn signin(email: &str, password: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/auth/signin")
        .set_json(json!({ "email": email, "password": password, "callbackUrl": "/dashboard" }))
}

#[actix_web::test]
async fn should_register_one_unverified_user_and_send_one_email() {
    let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
    let app = app!(store, mailer);

    let res = test::call_service(&app, register("  Ana@Example.com", "abc12345").to_request()).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["emailSent"], true);
    assert_eq!(body["user"]["email"], "ana@example.com");
    assert_eq!(body["user"]["isVerified"], false);
    assert!(body["user"].get("passwordHash").is_none());

    assert_eq!(store.user_count(), 1);
    assert_eq!(mailer.attempts(), 1);
    let user = store.get_user_by_email("ana@example.com").await.unwrap().unwrap();
    assert!(!user.is_verified);
    assert!(user.verification_token.is_some());
}

#[actix_web::test]
async fn should_report_all_validation_errors() {
    let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
    let app = app!(store, mailer);

    let res = test::call_service(&app, register("nope", "short").to_request()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;

    assert_eq!(body["kind"], "VALIDATION");
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);
    assert_eq!(store.user_count(), 0);
    assert_eq!(mailer.attempts(), 0);
}

#[actix_web::test]
async fn should_still_register_when_email_fails() {
    let (store, mailer) = (MemoryStore::new(), RecordingMailer::failing());
    let app = app!(store, mailer);

    let res = test::call_service(&app, register("ana@example.com", "abc12345").to_request()).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;

    assert_eq!(body["emailSent"], false);
    assert!(body["message"].as_str().unwrap().contains("delayed"));
    assert_eq!(store.user_count(), 1);
}

#[actix_web::test]
async fn should_distinguish_duplicate_registrations() {
    let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
    let app = app!(store, mailer);

    test::call_service(&app, register("ana@example.com", "abc12345").to_request()).await;
    let res = test::call_service(&app, register("ana@example.com", "abc12345").to_request()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let token = mailer.last_token();
    let req = test::TestRequest::get()
        .uri(&format!("/verifyemail?token={}", token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let res = test::call_service(&app, register("ana@example.com", "abc12345").to_request()).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn should_reject_expired_verification_token() {
    let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
    let app = app!(store, mailer);
    test::call_service(&app, register("ana@example.com", "abc12345").to_request()).await;

    let raw = mailer.last_token();
    let user = store.get_user_by_email("ana@example.com").await.unwrap().unwrap();
    store
        .set_user_token(
            user.id,
            TokenKind::Verify,
            &api_auth::services::token::token_digest(&raw),
            Utc::now() - Duration::minutes(1),
        )
        .await
        .unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/verifyemail?token={}", raw))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["kind"], "INVALID_OR_EXPIRED_TOKEN");

    let user = store.get_user_by_id(user.id).await.unwrap().unwrap();
    assert!(!user.is_verified);
}

#[actix_web::test]
async fn should_redeem_verification_token_only_once() {
    let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
    let app = app!(store, mailer);
    test::call_service(&app, register("ana@example.com", "abc12345").to_request()).await;
    let uri = format!("/verifyemail?token={}", mailer.last_token());

    let first = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(first.status(), StatusCode::OK);

    let user = store.get_user_by_email("ana@example.com").await.unwrap().unwrap();
    assert!(user.is_verified);
    assert!(user.verification_token.is_none());

    let second = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(second).await;
    assert_eq!(body["kind"], "INVALID_OR_EXPIRED_TOKEN");
}

#[actix_web::test]
async fn should_resend_verification_on_unverified_signin() {
    let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
    let app = app!(store, mailer);
    test::call_service(&app, register("ana@example.com", "abc12345").to_request()).await;
    assert_eq!(mailer.attempts(), 1);

    let res = test::call_service(&app, signin("ana@example.com", "abc12345").to_request()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["kind"], "UNVERIFIED_ACCOUNT");
    assert_eq!(mailer.attempts(), 2);

    // a wrong password never triggers the side effect
    let res = test::call_service(&app, signin("ana@example.com", "wrong1234").to_request()).await;
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["kind"], "INVALID_CREDENTIALS");
    assert_eq!(mailer.attempts(), 2);
}

#[actix_web::test]
async fn should_name_signin_failures() {
    let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
    let app = app!(store, mailer);

    let res = test::call_service(&app, signin("ghost@example.com", "abc12345").to_request()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["kind"], "NO_SUCH_USER");

    let res = test::call_service(&app, signin("", "").to_request()).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn should_redirect_anonymous_dashboard_to_signin() {
    let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
    let app = app!(store, mailer);

    let req = test::TestRequest::get().uri("/dashboard").to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(
        res.headers().get(header::LOCATION).unwrap(),
        "/auth/signin?callbackUrl=/dashboard"
    );
}

#[actix_web::test]
async fn should_sign_in_and_redirect_home_from_signin_page() {
    let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
    let app = app!(store, mailer);
    test::call_service(&app, register("ana@example.com", "abc12345").to_request()).await;
    let verify = format!("/verifyemail?token={}", mailer.last_token());
    test::call_service(&app, test::TestRequest::get().uri(&verify).to_request()).await;

    let res = test::call_service(&app, signin("ana@example.com", "abc12345").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .expect("session cookie")
        .into_owned();
    assert!(cookie.http_only().unwrap_or(false));
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["user"]["name"], "ana");
    assert_eq!(body["user"]["role"], "user");
    assert_eq!(body["callbackUrl"], "/dashboard");

    let req = test::TestRequest::get()
        .uri("/auth/signin")
        .cookie(cookie.clone())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/");

    let req = test::TestRequest::get()
        .uri("/dashboard")
        .insert_header(("Authorization", format!("Bearer {}", body["token"].as_str().unwrap())))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/auth/session")
        .cookie(cookie)
        .to_request();
    let session: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(session["user"]["email"], "ana@example.com");
}

#[actix_web::test]
async fn should_treat_forged_token_as_anonymous() {
    let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
    let app = app!(store, mailer);

    let req = test::TestRequest::get()
        .uri("/dashboard")
        .insert_header(("Authorization", "Bearer not.a.jwt"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);

    let req = test::TestRequest::get()
        .uri("/auth/signin")
        .insert_header(("Authorization", "Bearer not.a.jwt"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn should_reset_password_with_emailed_token() {
    let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
    let app = app!(store, mailer);
    test::call_service(&app, register("ana@example.com", "abc12345").to_request()).await;
    let verify = format!("/verifyemail?token={}", mailer.last_token());
    test::call_service(&app, test::TestRequest::get().uri(&verify).to_request()).await;

    let req = test::TestRequest::post()
        .uri("/auth/request-reset-password")
        .set_json(json!({ "email": "ana@example.com" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::ACCEPTED);
    assert_eq!(mailer.attempts(), 2);
    let token = mailer.last_token();

    let check = test::TestRequest::get()
        .uri(&format!("/reset-password?token={}", token))
        .to_request();
    assert_eq!(test::call_service(&app, check).await.status(), StatusCode::OK);

    let weak = test::TestRequest::post()
        .uri("/reset-password")
        .set_json(json!({ "token": token, "password": "weak" }))
        .to_request();
    assert_eq!(test::call_service(&app, weak).await.status(), StatusCode::BAD_REQUEST);

    let reset = test::TestRequest::post()
        .uri("/reset-password")
        .set_json(json!({ "token": token, "password": "newpass99" }))
        .to_request();
    assert_eq!(test::call_service(&app, reset).await.status(), StatusCode::OK);

    let old = test::call_service(&app, signin("ana@example.com", "abc12345").to_request()).await;
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);
    let new = test::call_service(&app, signin("ana@example.com", "newpass99").to_request()).await;
    assert_eq!(new.status(), StatusCode::OK);

    let again = test::TestRequest::post()
        .uri("/reset-password")
        .set_json(json!({ "token": token, "password": "another99" }))
        .to_request();
    assert_eq!(test::call_service(&app, again).await.status(), StatusCode::BAD_REQUEST);
}

/// Posts a reset request, expects 202 and returns the body.
macro_rules! request_reset {
    ($app:expr, $email:expr) => {{
        let req = test::TestRequest::post()
            .uri("/auth/request-reset-password")
            .set_json(json!({ "email": $email }))
            .to_request();
        let res = test::call_service($app, req).await;
        assert_eq!(res.status(), StatusCode::ACCEPTED);
        let body: Value = test::read_body_json(res).await;
        body
    }};
}

#[actix_web::test]
async fn should_answer_reset_request_identically_for_unknown_email() {
    let (store, mailer) = (MemoryStore::new(), RecordingMailer::failing());
    let app = app!(store, mailer);
    test::call_service(&app, register("ana@example.com", "abc12345").to_request()).await;
    assert_eq!(mailer.attempts(), 1);

    // the known account's email fails to send, the unknown one is never attempted
    let known = request_reset!(&app, "ana@example.com");
    assert_eq!(mailer.attempts(), 2);
    let unknown = request_reset!(&app, "ghost@example.com");
    assert_eq!(mailer.attempts(), 2);

    assert_eq!(known, unknown);
    assert!(known.get("emailSent").is_none());
}

/// Credential store that cannot persist tokens.
#[derive(Clone, Default)]
struct TokenlessStore(MemoryStore);

impl UserStore for TokenlessStore {
    async fn get_user_by_email(&self, email: &str) -> Res<Option<User>> {
        self.0.get_user_by_email(email).await
    }
    async fn get_user_by_id(&self, user_id: Uuid) -> Res<Option<User>> {
        self.0.get_user_by_id(user_id).await
    }
    async fn insert_user(&self, data: UserCreateRequest) -> Res<User> {
        self.0.insert_user(data).await
    }
    async fn set_user_token(
        &self,
        _: Uuid,
        _: TokenKind,
        _: &str,
        _: DateTime<Utc>,
    ) -> Res<()> {
        Err(AppError::Internal("token column unavailable".to_string()))
    }
    async fn find_user_by_token(
        &self,
        kind: TokenKind,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Res<Option<User>> {
        self.0.find_user_by_token(kind, digest, now).await
    }
    async fn consume_verification_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Res<Option<User>> {
        self.0.consume_verification_token(digest, now).await
    }
    async fn consume_reset_token(
        &self,
        digest: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Res<Option<User>> {
        self.0.consume_reset_token(digest, now, password_hash).await
    }
}

#[actix_web::test]
async fn should_survive_token_storage_failure() {
    let (store, mailer) = (TokenlessStore::default(), RecordingMailer::default());
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(mailer.clone()))
            .app_data(web::Data::new(config()))
            .wrap(api_auth::gate_middleware())
            .wrap(extractor::middleware(SECRET))
            .service(api_auth::mount_auth::<TokenlessStore, RecordingMailer>()),
    )
    .await;

    let res = test::call_service(&app, register("ana@example.com", "abc12345").to_request()).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["emailSent"], false);
    assert_eq!(store.0.user_count(), 1);

    let res = test::call_service(&app, signin("ana@example.com", "abc12345").to_request()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["kind"], "UNVERIFIED_ACCOUNT");

    request_reset!(&app, "ana@example.com");
    assert_eq!(mailer.attempts(), 0);
}
