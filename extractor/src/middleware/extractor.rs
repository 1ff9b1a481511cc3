use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures::future::{Ready, ok};

use common::{
    error::Res,
    jwt::{self, SESSION_COOKIE, SessionClaims},
    misc::{self, ClientAddress},
};

pub struct ExtractionMiddleware {
    secret: Rc<str>,
}

impl ExtractionMiddleware {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Rc::from(secret),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ExtractionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = ExtractionMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ExtractionMiddlewareService {
            service: Rc::new(service),
            secret: Rc::clone(&self.secret),
        })
    }
}

pub struct ExtractionMiddlewareService<S> {
    service: Rc<S>,
    secret: Rc<str>,
}

/// Bearer token from the `Authorization` header, else the session cookie.
fn session_token(req: &ServiceRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned);

    bearer.or_else(|| {
        req.cookie(SESSION_COOKIE)
            .map(|c| c.value().to_owned())
            .filter(|t| !t.is_empty())
    })
}

impl<S, B> Service<ServiceRequest> for ExtractionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = session_token(&req);
        let peer = req.peer_addr().map(|addr| addr.ip().to_string());
        let address = misc::client_address(req.headers(), peer);
        if address == misc::UNKNOWN_CLIENT {
            log::debug!(
                "No client address for {} {}, using the shared bucket",
                req.method(),
                req.path()
            );
        }
        let secret = Rc::clone(&self.secret);
        let srv = Rc::clone(&self.service);

        Box::pin(async move {
            req.extensions_mut().insert(ClientAddress(address));
            if let Some(token) = token {
                // validate token and insert claims to request object for future use
                let claims_res = jwt::validate_jwt(&token, &secret);
                req.extensions_mut().insert::<Res<SessionClaims>>(claims_res);
            }
            srv.call(req).await.map(|res| res.map_into_boxed_body())
        })
    }
}
