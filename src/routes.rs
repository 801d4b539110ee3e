use crate::{
    api::{customer_measurement, leave, task, user},
    auth::{guard::RequireRole, handlers, middleware::auth_middleware},
    config::Config,
    model::role::Role,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// The routing table below is the authorization table: each scope or route
// names exactly the roles allowed to call it.
const ADMIN: &[Role] = &[Role::Admin];
const ADMIN_OR_MANAGER: &[Role] = &[Role::Admin, Role::Manager];

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/users")
                    // any authenticated caller
                    .service(web::resource("/profile").route(web::get().to(user::profile)))
                    .service(
                        web::resource("/email/{email}")
                            .route(web::get().to(user::find_by_email)),
                    )
                    // /users — reads for Admin+Manager, mutations Admin only
                    .service(
                        web::resource("")
                            .route(
                                web::get()
                                    .wrap(RequireRole::any_of(ADMIN_OR_MANAGER))
                                    .to(user::list_users),
                            )
                            .route(
                                web::post()
                                    .wrap(RequireRole::any_of(ADMIN))
                                    .to(user::create_user),
                            ),
                    )
                    // /users/{id}
                    .service(
                        web::resource("/{id}")
                            .route(
                                web::get()
                                    .wrap(RequireRole::any_of(ADMIN_OR_MANAGER))
                                    .to(user::get_user),
                            )
                            .route(
                                web::put()
                                    .wrap(RequireRole::any_of(ADMIN))
                                    .to(user::update_user),
                            )
                            .route(
                                web::patch()
                                    .wrap(RequireRole::any_of(ADMIN))
                                    .to(user::update_user),
                            )
                            .route(
                                web::delete()
                                    .wrap(RequireRole::any_of(ADMIN))
                                    .to(user::delete_user),
                            ),
                    ),
            )
            .service(
                web::scope("/tasks")
                    .wrap(RequireRole::any_of(ADMIN_OR_MANAGER))
                    .service(
                        web::resource("")
                            .route(web::get().to(task::list_tasks))
                            .route(web::post().to(task::create_task)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(task::get_task))
                            .route(web::put().to(task::update_task))
                            .route(web::patch().to(task::update_task))
                            .route(web::delete().to(task::delete_task)),
                    ),
            )
            .service(
                // Leave CRUD carries no role restriction; any authenticated
                // user may call it.
                web::scope("/leaves")
                    .service(
                        web::resource("/user/{id}").route(web::get().to(leave::find_by_user)),
                    )
                    .service(
                        web::resource("/user/{id}/pending")
                            .route(web::get().to(leave::find_pending_by_user)),
                    )
                    .service(
                        web::resource("/user/{id}/approved")
                            .route(web::get().to(leave::find_approved_by_user)),
                    )
                    .service(
                        web::resource("/user/{id}/rejected")
                            .route(web::get().to(leave::find_rejected_by_user)),
                    )
                    .service(
                        web::resource("")
                            .route(web::get().to(leave::list_leaves))
                            .route(web::post().to(leave::create_leave)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave::get_leave))
                            .route(web::put().to(leave::update_leave))
                            .route(web::patch().to(leave::update_leave))
                            .route(web::delete().to(leave::delete_leave)),
                    ),
            )
            .service(
                web::scope("/customer-measurements")
                    .wrap(RequireRole::any_of(ADMIN_OR_MANAGER))
                    // /trashed must precede /{id} or it would be captured
                    // as an id
                    .service(
                        web::resource("/trashed")
                            .route(web::get().to(customer_measurement::trashed_measurements)),
                    )
                    .service(
                        web::resource("")
                            .route(web::get().to(customer_measurement::list_measurements))
                            .route(web::post().to(customer_measurement::create_measurement)),
                    )
                    .service(
                        web::resource("/{id}/restore")
                            .route(web::post().to(customer_measurement::restore_measurement)),
                    )
                    .service(
                        web::resource("/{id}/force-delete")
                            .route(web::delete().to(customer_measurement::force_delete_measurement)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(customer_measurement::get_measurement))
                            .route(web::put().to(customer_measurement::update_measurement))
                            .route(web::patch().to(customer_measurement::update_measurement))
                            .route(web::delete().to(customer_measurement::delete_measurement)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)
//
// API REQUEST
//  └─ Authorization: Bearer access_token
//
// ACCESS EXPIRED
//  └─ POST /refresh with refresh_token
//       └─ returns new access_token
