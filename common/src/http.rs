use actix_web::{
    HttpResponse, Responder,
    http::header::{self, ContentDisposition, DispositionParam, DispositionType},
};
use serde::Serialize;

use super::error::Res;

pub struct Success;
impl Success {
    pub fn created<T: Serialize>(body: T) -> Res<impl Responder> {
        Result::Ok(HttpResponse::Created().json(body))
    }
    pub fn ok<T: Serialize>(body: T) -> Res<impl Responder> {
        Result::Ok(HttpResponse::Ok().json(body))
    }
    pub fn accepted<T: Serialize>(body: T) -> Res<impl Responder> {
        Result::Ok(HttpResponse::Accepted().json(body))
    }
    pub fn no_content() -> Res<HttpResponse> {
        Result::Ok(HttpResponse::NoContent().finish())
    }
}

/// 302 Found pointing at `location`.
pub fn found(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Binary download with `Content-Disposition: attachment`.
pub fn attachment(bytes: Vec<u8>, content_type: &str, filename: &str) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(content_type)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename.to_string())],
        })
        .body(bytes)
}
