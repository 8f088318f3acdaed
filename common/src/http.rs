use actix_web::{
    HttpResponse, HttpResponseBuilder, Responder,
    http::header,
    web::{self, Bytes, BytesMut},
};
use futures::StreamExt;
use serde::Serialize;

use super::error::{AppError, Res};

/// Marks a response as uncacheable. Payment responses carry client secrets.
pub fn no_store(builder: &mut HttpResponseBuilder) -> &mut HttpResponseBuilder {
    builder
        .insert_header((header::CACHE_CONTROL, "no-store, must-revalidate"))
        .insert_header((header::PRAGMA, "no-cache"))
}

/// Reads the request body, giving up as soon as it grows past `limit` bytes.
pub async fn read_body(mut payload: web::Payload, limit: usize) -> Res<Bytes> {
    let mut body = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| {
            log::debug!("Failed to read request body: {}", e);
            AppError::InvalidRequestBody
        })?;
        if body.len() + chunk.len() > limit {
            return Err(AppError::PayloadTooLarge);
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

pub struct Success;
impl Success {
    pub fn ok<T: Serialize>(body: T) -> Res<impl Responder> {
        Result::Ok(no_store(&mut HttpResponse::Ok()).json(body))
    }
    pub fn no_content() -> Res<impl Responder> {
        Result::Ok(HttpResponse::NoContent().finish())
    }
}
