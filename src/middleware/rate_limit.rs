use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::middleware::Next;
use actix_web::{web, Error};

use crate::error::AppError;
use crate::AppState;

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const WINDOW_HEADER: &str = "x-ratelimit-window";

/// First `X-Forwarded-For` hop when the proxy is trusted, else the peer
/// address.
pub fn client_id(req: &ServiceRequest, trust_forwarded_for: bool) -> String {
    let forwarded = if trust_forwarded_for {
        req.headers()
            .get("X-Forwarded-For")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(String::from)
    } else {
        None
    };

    forwarded
        .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Denials are answered here as a 429 envelope instead of bubbling an
/// error out of the pipeline.
pub async fn rate_limit<B: MessageBody + 'static>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let limiter = req
        .app_data::<web::Data<AppState>>()
        .map(|state| state.rate_limiter.clone());
    let limiter = match limiter {
        Some(limiter) if limiter.is_enabled() => limiter,
        _ => return next.call(req).await.map(ServiceResponse::map_into_left_body),
    };

    let client = client_id(&req, limiter.config().trust_forwarded_for);
    let path = req.path().to_string();
    let decision = limiter.check(&client, &path).await;

    let mut res = if decision.allowed {
        next.call(req).await?.map_into_left_body()
    } else {
        let (http_req, _) = req.into_parts();
        let err = AppError::RateLimited {
            retry_after: decision.retry_after,
        };
        ServiceResponse::from_err(err, http_req).map_into_right_body()
    };

    let headers = res.headers_mut();
    headers.insert(HeaderName::from_static(LIMIT_HEADER), HeaderValue::from(decision.limit));
    headers.insert(HeaderName::from_static(REMAINING_HEADER), HeaderValue::from(decision.remaining));
    headers.insert(HeaderName::from_static(WINDOW_HEADER), HeaderValue::from(decision.window_secs));
    Ok(res)
}
