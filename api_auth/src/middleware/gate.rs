use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::Method,
};
use common::{
    error::{AppError, Res},
    http,
    jwt::SessionClaims,
};
use futures::future::{Ready, ok};

/// Reachable without a session, and only without one.
const PUBLIC_ROUTES: [&str; 5] = [
    "/auth/signin",
    "/auth/register",
    "/auth/request-reset-password",
    "/reset-password",
    "/verifyemail",
];

const STATIC_PREFIXES: [&str; 4] = ["/assets/", "/static/", "/_next/", "/favicon.ico"];

/// Session issuance endpoints; they must stay reachable in both states.
const ISSUANCE_ROUTES: [&str; 3] = ["/auth/signin", "/auth/register", "/auth/signout"];

pub const SIGNIN_PATH: &str = "/auth/signin";
pub const HOME_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Not inspected by the gate.
    Excluded,
    /// Public, and off limits once signed in.
    AuthRestricted,
    Protected,
}

#[derive(Debug)]
pub enum GateDecision {
    Allow,
    Redirect(String),
    Reject(AppError),
}

pub fn classify(method: &Method, path: &str) -> RouteClass {
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    if STATIC_PREFIXES.iter().any(|p| path.starts_with(p))
        || path == "/healthz"
        || path == HOME_PATH
        || path == "/qr/resolve"
        || (*method == Method::POST && ISSUANCE_ROUTES.contains(&path))
    {
        return RouteClass::Excluded;
    }

    if PUBLIC_ROUTES.contains(&path) {
        RouteClass::AuthRestricted
    } else {
        RouteClass::Protected
    }
}

/// Sign-in location carrying the originally requested path and query.
pub fn signin_redirect(path_and_query: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(path_and_query.as_bytes()).collect();
    format!("{}?callbackUrl={}", SIGNIN_PATH, encoded.replace("%2F", "/"))
}

pub fn decide(
    class: RouteClass,
    method: &Method,
    path_and_query: &str,
    authenticated: bool,
) -> GateDecision {
    match (class, authenticated) {
        (RouteClass::Excluded, _) => GateDecision::Allow,
        (RouteClass::AuthRestricted, true) => GateDecision::Redirect(HOME_PATH.to_string()),
        (RouteClass::AuthRestricted, false) => GateDecision::Allow,
        (RouteClass::Protected, true) => GateDecision::Allow,
        (RouteClass::Protected, false) => {
            if *method == Method::GET || *method == Method::HEAD {
                GateDecision::Redirect(signin_redirect(path_and_query))
            } else {
                GateDecision::Reject(AppError::Unauthorized(
                    "Sign in to access this resource".to_string(),
                ))
            }
        }
    }
}

/// Whether the request carries a valid session. A token that fails
/// verification counts as no session.
fn is_authenticated(req: &ServiceRequest) -> bool {
    match req.extensions().get::<Res<SessionClaims>>() {
        Some(Ok(_)) => true,
        Some(Err(e)) => {
            log::warn!("Session rejected on {}: {}", req.path(), e);
            false
        }
        None => false,
    }
}

pub struct AccessGate;

impl<S, B> Transform<S, ServiceRequest> for AccessGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = AccessGateService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AccessGateService {
            service: Rc::new(service),
        })
    }
}

pub struct AccessGateService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AccessGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let class = classify(req.method(), req.path());
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.path().to_string());
        let authenticated = class != RouteClass::Excluded && is_authenticated(&req);
        let decision = decide(class, req.method(), &path_and_query, authenticated);
        let srv = Rc::clone(&self.service);

        Box::pin(async move {
            match decision {
                GateDecision::Allow => srv.call(req).await.map(|res| res.map_into_boxed_body()),
                GateDecision::Redirect(location) => {
                    Ok(req.into_response(http::found(&location)).map_into_boxed_body())
                }
                GateDecision::Reject(error) => Ok(req.error_response(error)),
            }
        })
    }
}
