use actix_web::{
    http::Method,
    web::{self},
};

use crate::routes;

fn mount_intent() -> actix_web::Resource {
    web::resource("/create-payment-intent")
        .route(web::post().to(routes::pay::post_payment_intent))
        .route(web::method(Method::OPTIONS).to(routes::pay::preflight))
        .default_service(web::route().to(routes::pay::method_not_allowed))
}

pub fn mount_pay() -> actix_web::Scope {
    web::scope("/api")
        .service(routes::pay::get_catalog)
        .service(mount_intent())
}
pub fn mount_serverless() -> actix_web::Scope {
    web::scope("/.netlify/functions").service(mount_intent())
}
