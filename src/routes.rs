use crate::{
    api::{attendance, dashboard, employee, payout, settings},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

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
    let upload_limiter = Arc::new(build_limiter(config.rate_upload_per_min));
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
                web::scope("/employees")
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    // /employees/{id}/attendance
                    .service(
                        web::resource("/{id}/attendance")
                            .route(web::get().to(attendance::employee_attendance)),
                    )
                    // /employees/{id}/payouts
                    .service(
                        web::resource("/{id}/payouts")
                            .route(web::get().to(payout::preview_periods))
                            .route(web::post().to(payout::save_payout)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("").route(web::get().to(attendance::list_attendance)),
                    )
                    // /attendance/upload
                    .service(
                        web::resource("/upload")
                            .app_data(web::PayloadConfig::new(attendance::UPLOAD_LIMIT_BYTES))
                            .wrap(upload_limiter)
                            .route(web::post().to(attendance::upload_log)),
                    ),
            )
            .service(
                web::scope("/payouts")
                    // /payouts
                    .service(web::resource("").route(web::get().to(payout::list_payouts)))
                    // /payouts/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(payout::get_payout))
                            .route(web::patch().to(payout::update_payout)),
                    ),
            )
            .service(
                web::scope("/settings").service(
                    web::resource("")
                        .route(web::get().to(settings::get_settings))
                        .route(web::put().to(settings::update_settings)),
                ),
            )
            .service(
                web::scope("/dashboard").service(
                    web::resource("/stats").route(web::get().to(dashboard::dashboard_stats)),
                ),
            ),
    );
}
