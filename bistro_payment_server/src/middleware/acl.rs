//! Access control middleware.
//!
//! This middleware can be placed on any route or service. It validates the bearer token in the
//! `Authorization` header against the shared auth configuration and then checks the claims
//! against the required roles for the route. On success the claims are left in the request
//! extensions, where the [`crate::auth::JwtClaims`] extractor picks them up; otherwise the
//! request is rejected with a 401 (no/invalid token) or 403 (wrong role).

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorForbidden, ErrorInternalServerError, ErrorUnauthorized},
    web,
    Error,
    HttpMessage,
};
use bistro_order_engine::db_types::Role;
use futures::{
    future::{ok, Ready},
    Future,
};

use crate::{
    auth::{decode_bearer_token, AUTH_HEADER},
    config::AuthConfig,
};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let config = req.app_data::<web::Data<AuthConfig>>().cloned().ok_or_else(|| {
                log::error!("🔐️ Auth configuration is not registered with the app");
                ErrorInternalServerError("Auth configuration is not registered")
            })?;
            let header = req
                .headers()
                .get(AUTH_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| ErrorUnauthorized("Authentication required"))?;
            let claims = decode_bearer_token(header, &config).map_err(|e| {
                log::debug!("🔐️ Token validation failed. {e}");
                ErrorUnauthorized("Invalid or expired access token")
            })?;
            if required_roles.iter().all(|role| claims.role == *role) {
                req.extensions_mut().insert(claims);
                service.call(req).await
            } else {
                Err(ErrorForbidden("Insufficient permissions"))
            }
        })
    }
}
