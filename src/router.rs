use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, Request},
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info_span, warn};

use crate::config::Config;
use crate::crypto::CredentialCipher;
use crate::db::Storage;
use crate::handlers::{
    customers, dashboard, erp, health, images, invoices, products, suppliers, users,
};
use crate::middleware::rate_limit::{ApiRateLimiter, rate_limit};
use crate::middleware::request_id::{REQUEST_ID_HEADER, RequestId, assign_request_id};
use crate::service::image_upload::S3Presigner;
use crate::service::{ErpConnections, SessionKeys, UserService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Storage,
    pub connections: ErpConnections,
    pub users: UserService,
    pub session: SessionKeys,
    pub limiter: ApiRateLimiter,
    pub presigner: Option<S3Presigner>,
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Storage,
        http: reqwest::Client,
        cipher: CredentialCipher,
    ) -> Self {
        let session = SessionKeys::new(&config.jwt_secret);
        let connections = ErpConnections::new(storage.clone(), Arc::new(cipher), http);
        let users = UserService::new(storage.clone(), connections.clone(), session.clone());
        Self {
            limiter: ApiRateLimiter::new(config.rate_limit_max, config.rate_limit_window()),
            presigner: S3Presigner::from_config(&config),
            secure_cookies: config.is_production(),
            config: Arc::new(config),
            storage,
            connections,
            users,
            session,
        }
    }
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        state.session.clone()
    }
}

impl FromRef<AppState> for ErpConnections {
    fn from_ref(state: &AppState) -> Self {
        state.connections.clone()
    }
}

impl FromRef<AppState> for ApiRateLimiter {
    fn from_ref(state: &AppState) -> Self {
        state.limiter.clone()
    }
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(users::login))
        .route("/logout", post(users::logout))
        .route("/createUser", post(users::create_user))
        .route("/getAllUser", get(users::list_users))
        .route(
            "/me/profile",
            get(users::my_profile).patch(users::update_my_profile),
        )
        .route("/{id}", get(users::get_user).patch(users::update_user))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list).post(products::create))
        .route(
            "/{id}",
            get(products::get)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/{id}/stock", get(products::stock))
        .route(
            "/public/{tenant_id}/products/{barcode}",
            get(products::public_by_barcode),
        )
}

fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/users", user_routes())
        .route("/erp/test-connection", get(erp::test_connection))
        .route("/erp/masters", get(erp::masters))
        .nest("/products", product_routes())
        .route("/customers", get(customers::list).post(customers::create))
        .route(
            "/customers/{id}",
            get(customers::get)
                .put(customers::update)
                .delete(customers::delete),
        )
        .route("/suppliers", get(suppliers::list).post(suppliers::create))
        .route(
            "/suppliers/{id}",
            get(suppliers::get)
                .put(suppliers::update)
                .delete(suppliers::delete),
        )
        .route("/sales", get(invoices::list_sales).post(invoices::create_sale))
        .route("/sales/{id}", get(invoices::get_sale))
        .route(
            "/purchases",
            get(invoices::list_purchases).post(invoices::create_purchase),
        )
        .route("/purchases/{id}", get(invoices::get_purchase))
        .route("/dashboard/summary", get(dashboard::summary))
        .route("/dashboard/low-stock", get(dashboard::low_stock))
        .route("/images/upload-url", post(images::upload_url))
        .layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit,
        ))
}

fn cors_layer(cfg: &Config) -> CorsLayer {
    let origin = match cfg.cors_origins() {
        Some(list) => AllowOrigin::list(list.iter().filter_map(|o| {
            HeaderValue::from_str(o)
                .inspect_err(|_| warn!(origin = %o, "ignoring malformed CORS origin"))
                .ok()
        })),
        // credentials forbid a literal `*`
        None => AllowOrigin::mirror_request(),
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .expose_headers([REQUEST_ID_HEADER.clone()])
}

const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-permitted-cross-domain-policies", "none"),
    ("referrer-policy", "no-referrer"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    (
        "strict-transport-security",
        "max-age=15552000; includeSubDomains",
    ),
    (
        "content-security-policy",
        "default-src 'self'; frame-ancestors 'self'; object-src 'none'",
    ),
];

fn with_security_headers(mut router: Router) -> Router {
    for &(name, value) in SECURITY_HEADERS {
        router = router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }
    router
}

pub fn app_router(state: AppState) -> Router {
    let cfg = state.config.clone();

    let router = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .nest("/api/v1", api_routes(&state))
        .fallback(health::not_found)
        .layer(DefaultBodyLimit::max(cfg.request_body_limit))
        .with_state(state);

    with_security_headers(router)
        .layer(CompressionLayer::new())
        .layer(cors_layer(&cfg))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request| {
                let request_id = req
                    .extensions()
                    .get::<RequestId>()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                info_span!(
                    "http.request",
                    request_id = %request_id,
                    method = %req.method(),
                    uri = %req.uri(),
                )
            }),
        )
        .layer(middleware::from_fn(assign_request_id))
}
