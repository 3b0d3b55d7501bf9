use crate::{
    api::{assignment, attendance, employee, location, payroll, report, shift, site, user},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap()
    }

    // Governor is cheap to clone; the quota state lives behind an Arc.
    let login_limiter = build_limiter(config.rate_login_per_min);
    let scan_limiter = build_limiter(config.rate_scan_per_min);
    let refresh_limiter = build_limiter(config.rate_refresh_per_min);
    let protected_limiter = build_limiter(config.rate_protected_per_min);

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(Governor::new(&login_limiter))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(Governor::new(&refresh_limiter))
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(Governor::new(&login_limiter))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(Governor::new(&protected_limiter)) // rate limiting
            .service(
                web::scope("/attendance")
                    // /attendance — the scan endpoint gets its own limiter:
                    // kiosks hammer it far harder than back-office pages
                    .service(
                        web::resource("")
                            .wrap(Governor::new(&scan_limiter))
                            .route(web::post().to(attendance::scan)),
                    )
                    // /attendance/logs
                    .service(
                        web::resource("/logs").route(web::get().to(attendance::list_logs)),
                    ),
            )
            .service(
                web::scope("/employee")
                    // /employee/register
                    .service(
                        web::resource("/register")
                            .route(web::post().to(employee::register_employee)),
                    )
                    // /employee
                    .service(
                        web::resource("").route(web::get().to(employee::list_employees)),
                    )
                    // /employee/{id}/face
                    .service(
                        web::resource("/{id}/face").route(web::put().to(employee::update_face)),
                    )
                    // /employee/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/location")
                    .service(
                        web::resource("")
                            .route(web::get().to(location::list_locations))
                            .route(web::post().to(location::create_location)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(location::get_location))
                            .route(web::put().to(location::update_location))
                            .route(web::delete().to(location::delete_location)),
                    ),
            )
            .service(
                web::scope("/site")
                    .service(
                        web::resource("")
                            .route(web::get().to(site::list_sites))
                            .route(web::post().to(site::create_site)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(site::update_site))
                            .route(web::delete().to(site::delete_site)),
                    ),
            )
            .service(
                web::scope("/shift")
                    .service(
                        web::resource("")
                            .route(web::get().to(shift::list_shifts))
                            .route(web::post().to(shift::create_shift)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(shift::update_shift))
                            .route(web::delete().to(shift::delete_shift)),
                    ),
            )
            .service(
                web::scope("/assignment")
                    .service(
                        web::resource("").route(web::get().to(assignment::list_assignments)),
                    )
                    .service(
                        web::resource("/bulk")
                            .route(web::post().to(assignment::bulk_assign_shift)),
                    )
                    .service(
                        web::resource("/sites/bulk")
                            .route(web::post().to(assignment::bulk_assign_sites)),
                    ),
            )
            .service(
                web::scope("/user")
                    .service(
                        web::resource("")
                            .route(web::get().to(user::list_users))
                            .route(web::post().to(user::create_user)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(user::update_user))
                            .route(web::delete().to(user::delete_user)),
                    ),
            )
            .service(
                web::scope("/payroll")
                    .service(web::resource("").route(web::get().to(payroll::list_payrolls)))
                    .service(
                        web::resource("/generate")
                            .route(web::post().to(payroll::generate_payroll)),
                    ),
            )
            .service(
                web::scope("/reports")
                    .service(
                        web::resource("/attendance-summary")
                            .route(web::get().to(report::attendance_summary)),
                    )
                    .service(
                        web::resource("/monthly-status")
                            .route(web::get().to(report::monthly_status)),
                    ),
            ),
    );
}
