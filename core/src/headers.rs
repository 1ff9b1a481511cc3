use actix_web::middleware::DefaultHeaders;

/// Hardening headers sent on every response.
pub const HARDENING_HEADERS: [(&str, &str); 5] = [
    ("X-Content-Type-Options", "nosniff"),
    ("X-Frame-Options", "SAMEORIGIN"),
    ("X-XSS-Protection", "1; mode=block"),
    ("Referrer-Policy", "strict-origin-when-cross-origin"),
    (
        "Content-Security-Policy",
        "default-src 'self'; img-src 'self' data: https:; frame-ancestors 'self'",
    ),
];

pub fn middleware() -> DefaultHeaders {
    HARDENING_HEADERS
        .iter()
        .fold(DefaultHeaders::new(), |headers, pair| headers.add(*pair))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, test, web};

    #[actix_web::test]
    async fn every_response_is_hardened() {
        let app = test::init_service(
            App::new()
                .wrap(middleware())
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        for uri in ["/", "/missing"] {
            let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            for (name, value) in HARDENING_HEADERS {
                assert_eq!(res.headers().get(name).unwrap(), value, "{} on {}", name, uri);
            }
        }
    }
}
