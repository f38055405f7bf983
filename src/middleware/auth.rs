use std::{
    future::{ready, Ready},
    sync::Arc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures_util::future::LocalBoxFuture;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::JwtKeys;

/// Set on the request when a valid bearer token was presented.
#[derive(Clone, Copy, Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Verifies bearer tokens. Never rejects a request itself: public routes stay
/// reachable and the session extractors decide what an anonymous caller gets.
pub struct Authentication {
    pub keys: Arc<JwtKeys>,
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticationMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticationMiddleware {
            service,
            keys: self.keys.clone(),
        }))
    }
}

pub struct AuthenticationMiddleware<S> {
    service: S,
    keys: Arc<JwtKeys>,
}

impl<S, B> Service<ServiceRequest> for AuthenticationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        match token {
            Some(token) => match self.keys.verify(token) {
                Ok(user_id) => {
                    debug!("Authenticated user: {}", user_id);
                    req.extensions_mut().insert(AuthenticatedUser { user_id });
                }
                Err(e) => {
                    warn!("Invalid token on {}: {:?}", req.path(), e);
                }
            },
            None => {
                debug!("No bearer token on {}", req.path());
            }
        }

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            Ok(res)
        })
    }
}
