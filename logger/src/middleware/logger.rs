use actix_web::body::{self, BoxBody, MessageBody};
use actix_web::dev::Payload;
use actix_web::web::{self, Bytes};
use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use actix_web::{HttpMessage, HttpResponse, ResponseError};
use colored::Colorize;
use futures::StreamExt;
use futures::future::{LocalBoxFuture, Ready, ready};
use log::{debug, info};
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::redact::redact_json;

/// Access log for every request. Request bodies are logged at debug level
/// with customer details masked; response bodies only for error statuses,
/// since successful ones carry client secrets.
///
/// At most `body_limit` bytes of a request are buffered; larger bodies are
/// passed on unlogged.
pub struct LoggerMiddleware {
    enabled: bool,
    body_limit: usize,
}

impl LoggerMiddleware {
    pub fn new(enabled: bool, body_limit: usize) -> Self {
        Self {
            enabled,
            body_limit,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: actix_web::body::MessageBody + 'static,
    <B as MessageBody>::Error: ResponseError,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = LoggerMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggerMiddlewareService {
            service: Arc::new(service),
            enabled: self.enabled,
            body_limit: self.body_limit,
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Arc<S>,
    enabled: bool,
    body_limit: usize,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: actix_web::body::MessageBody + 'static,
    <B as MessageBody>::Error: ResponseError,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let srv = Arc::clone(&self.service);

        if !self.enabled {
            return Box::pin(async move { Ok(srv.call(req).await?.map_into_boxed_body()) });
        }

        // Common request info
        let method = req.method().to_string();
        let path = req.path().to_string();
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        let body_limit = self.body_limit;

        Box::pin(async move {
            // Copy request body from payload and reconstruct it
            let mut payload = req.take_payload();
            let (body_bytes, complete) = extract_body(&mut payload, body_limit).await?;
            let request_body = if complete && !body_bytes.is_empty() {
                serde_json::from_slice::<Value>(&body_bytes).ok()
            } else {
                None
            };
            let new_stream: Pin<
                Box<dyn futures::Stream<Item = Result<Bytes, actix_web::error::PayloadError>>>,
            > = futures::stream::once(async move {
                Ok::<Bytes, actix_web::error::PayloadError>(body_bytes)
            })
            .chain(payload)
            .boxed_local();
            req.set_payload(Payload::from(new_stream));

            // Call next services
            let res = srv.call(req).await?;

            let status = res.status();
            let status_code = status.as_u16();
            let elapsed_ms = started.elapsed().as_millis();

            let colored_status = match status_code {
                200..=299 => status_code.to_string().green(),
                300..=399 => status_code.to_string().yellow(),
                400..=499 => status_code.to_string().bright_red(),
                _ => status_code.to_string().red(),
            };

            let colored_method = match method.as_str() {
                "GET" => method.blue(),
                "POST" => method.yellow(),
                "PUT" => method.purple(),
                "DELETE" => method.red(),
                _ => method.normal(),
            };

            info!(
                "[{}] {} {} {} request_id={}",
                colored_status,
                colored_method,
                path.bright_white(),
                format!("({}ms)", elapsed_ms).bright_black(),
                request_id.to_string().bright_blue(),
            );

            if let Some(mut body) = request_body {
                redact_json(&mut body);
                debug!(
                    "  Request: {}",
                    serde_json::to_string(&body)
                        .unwrap_or_default()
                        .bright_green()
                );
            }

            if status_code < 400 {
                return Ok(res.map_into_boxed_body());
            }

            // Copy error body and reconstruct response
            let (req, res) = res.into_parts();
            let headers = res.headers().clone();
            let response_body_bytes = body::to_bytes(res.into_body()).await?;
            debug!(
                "  Response: {}",
                String::from_utf8_lossy(&response_body_bytes).bright_yellow()
            );
            let mut new_res = HttpResponse::build(status);
            for (key, value) in headers.iter() {
                new_res.append_header((key.clone(), value.clone()));
            }
            let new_res = new_res.body(response_body_bytes);

            Ok(ServiceResponse::new(req, new_res))
        })
    }
}

/// Buffers the payload up to just past `limit` bytes. The flag is false when
/// the payload was cut short; the rest stays in `payload`.
async fn extract_body(payload: &mut Payload, limit: usize) -> Result<(Bytes, bool), Error> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk?;
        body.extend_from_slice(&chunk);
        if body.len() > limit {
            return Ok((body.freeze(), false));
        }
    }
    Ok((body.freeze(), true))
}
