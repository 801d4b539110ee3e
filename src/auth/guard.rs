use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::role::Role;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::{EitherBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures::future::{LocalBoxFuture, Ready, ready};

/// Route-level authorization: the routing table declares which roles may
/// call a route, this middleware performs the single membership check.
/// Missing identity is 401 (auth_middleware did not run or rejected the
/// token), wrong role is 403.
pub struct RequireRole {
    allowed: &'static [Role],
}

impl RequireRole {
    pub fn any_of(allowed: &'static [Role]) -> Self {
        Self { allowed }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireRole
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RequireRoleMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireRoleMiddleware {
            service,
            allowed: self.allowed,
        }))
    }
}

pub struct RequireRoleMiddleware<S> {
    service: S,
    allowed: &'static [Role],
}

impl<S, B> Service<ServiceRequest> for RequireRoleMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let identity = req.extensions().get::<AuthUser>().cloned();

        let deny = match &identity {
            None => Some(ApiError::unauthorized("Unauthorized").error_response()),
            Some(user) if !user.role.is_any_of(self.allowed) => Some(
                ApiError::forbidden("Forbidden - Insufficient permissions").error_response(),
            ),
            Some(_) => None,
        };

        if let Some(resp) = deny {
            let (req, _) = req.into_parts();
            let resp = ServiceResponse::new(req, resp.map_into_right_body());
            return Box::pin(async move { Ok(resp) });
        }

        let fut = self.service.call(req);
        Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::BoxBody;
    use actix_web::middleware::{Next, from_fn};
    use actix_web::{App, HttpResponse, Responder, test, web};

    async fn ok_handler() -> impl Responder {
        HttpResponse::Ok().body("ok")
    }

    async fn insert_admin(
        req: ServiceRequest,
        next: Next<BoxBody>,
    ) -> Result<ServiceResponse<BoxBody>, Error> {
        req.extensions_mut().insert(AuthUser {
            user_id: 1,
            email: "admin@company.com".into(),
            role: Role::Admin,
        });
        next.call(req).await
    }

    async fn insert_employee(
        req: ServiceRequest,
        next: Next<BoxBody>,
    ) -> Result<ServiceResponse<BoxBody>, Error> {
        req.extensions_mut().insert(AuthUser {
            user_id: 2,
            email: "emp@company.com".into(),
            role: Role::Employee,
        });
        next.call(req).await
    }

    fn admin_only() -> RequireRole {
        RequireRole::any_of(&[Role::Admin])
    }

    #[actix_web::test]
    async fn missing_identity_is_401() {
        let app = test::init_service(
            App::new()
                .service(web::resource("/x").route(web::get().to(ok_handler).wrap(admin_only()))),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/x").to_request()).await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_web::test]
    async fn wrong_role_is_403() {
        let app = test::init_service(
            App::new()
                .wrap(from_fn(insert_employee))
                .service(web::resource("/x").route(web::get().to(ok_handler).wrap(admin_only()))),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/x").to_request()).await;
        assert_eq!(resp.status(), 403);
    }

    #[actix_web::test]
    async fn allowed_role_passes_through() {
        let app = test::init_service(
            App::new()
                .wrap(from_fn(insert_admin))
                .service(web::resource("/x").route(web::get().to(ok_handler).wrap(admin_only()))),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/x").to_request()).await;
        assert_eq!(resp.status(), 200);
    }
}
