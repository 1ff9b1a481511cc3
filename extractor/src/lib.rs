use middleware::extractor::ExtractionMiddleware;

pub mod middleware {
    pub mod extractor;
}

/// Decodes the session token (bearer header or session cookie) and resolves
/// the client address once per request.
pub fn middleware(jwt_secret: &str) -> ExtractionMiddleware {
    ExtractionMiddleware::new(jwt_secret)
}
