use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderValue, RETRY_AFTER},
};
use common::{
    error::AppError,
    misc::{self, ClientAddress},
};
use std::{future::Future, pin::Pin, rc::Rc, sync::Arc};

use crate::rate_limiter::{RateLimitDecision, RateLimiter};

/// Paths that are never counted.
const EXEMPT_PREFIXES: [&str; 5] = ["/assets/", "/static/", "/_next/", "/favicon.ico", "/healthz"];

pub fn is_exempt(path: &str) -> bool {
    EXEMPT_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// This limiter counts requests per client address
pub struct ClientLimiter {
    limiter: Arc<RateLimiter>,
}

impl ClientLimiter {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ClientLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = ClientLimiterService<S>;
    type InitError = ();
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(ClientLimiterService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct ClientLimiterService<S> {
    service: Rc<S>,
    limiter: Arc<RateLimiter>,
}

impl<S, B> Service<ServiceRequest> for ClientLimiterService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = Rc::clone(&self.service);

        if is_exempt(req.path()) {
            return Box::pin(async move { srv.call(req).await.map(|res| res.map_into_boxed_body()) });
        }

        let key = match req.extensions().get::<ClientAddress>() {
            Some(address) => address.0.clone(),
            None => misc::client_address(
                req.headers(),
                req.peer_addr().map(|addr| addr.ip().to_string()),
            ),
        };
        let decision = self.limiter.check(&key);

        Box::pin(async move {
            match decision {
                RateLimitDecision::Allowed { .. } => {
                    srv.call(req).await.map(|res| res.map_into_boxed_body())
                }
                RateLimitDecision::Limited { retry_after } => {
                    log::warn!("Rate limit exceeded for {} on {}", key, req.path());
                    let mut res = req.error_response(AppError::TooManyRequests(
                        "Too many requests, please try again later.".to_string(),
                    ));
                    res.headers_mut().insert(
                        RETRY_AFTER,
                        HeaderValue::from(retry_after.as_secs().max(1)),
                    );
                    Ok(res)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, test, web};
    use std::time::Duration;

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn rejects_with_429_once_window_is_spent() {
        let limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(60)));
        let app = test::init_service(
            App::new()
                .wrap(ClientLimiter::new(limiter))
                .route("/dashboard", web::get().to(ok))
                .route("/healthz", web::get().to(ok)),
        )
        .await;

        let call = |uri: &'static str| {
            test::TestRequest::get()
                .uri(uri)
                .insert_header(("X-Forwarded-For", "203.0.113.9"))
                .to_request()
        };

        assert_eq!(test::call_service(&app, call("/dashboard")).await.status(), 200);
        assert_eq!(test::call_service(&app, call("/dashboard")).await.status(), 200);

        let limited = test::call_service(&app, call("/dashboard")).await;
        assert_eq!(limited.status(), 429);
        assert!(limited.headers().contains_key(RETRY_AFTER));

        // health checks are never counted
        assert_eq!(test::call_service(&app, call("/healthz")).await.status(), 200);
    }

    #[::core::prelude::v1::test]
    fn static_paths_are_exempt() {
        assert!(is_exempt("/_next/static/chunk.js"));
        assert!(is_exempt("/favicon.ico"));
        assert!(!is_exempt("/qr/resolve"));
    }
}
