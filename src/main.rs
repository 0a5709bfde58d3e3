mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::envelope::{envelope_middleware, not_found_fallback, panic_response};
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware};
use crate::features::admin::{routes as admin_routes, AdminUserService};
use crate::features::appointments::{routes as appointments_routes, AppointmentService};
use crate::features::auth;
use crate::features::auth::routes as auth_routes;
use crate::features::documents::{routes as documents_routes, DocumentService};
use crate::features::faqs::{routes as faqs_routes, FaqService};
use crate::features::payments::{routes as payments_routes, PaymentService};
use crate::features::service_requests::{routes as service_requests_routes, ServiceRequestService};
use crate::features::service_types::{routes as service_types_routes, ServiceTypeService};
use crate::modules::payments::{create_provider, PaymentProvider};
use crate::modules::storage::ObjectStorage;
use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    let available_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    tracing::info!(
        "System info: available_cpus={}, tokio_worker_threads={}, pid={}",
        available_cpus,
        worker_threads,
        std::process::id()
    );

    tracing::info!("Configuration loaded successfully");

    // Create database connection pool
    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    tracing::info!("Running database migrations...");
    database::run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    // Initialize auth
    let jwks_client = Arc::new(auth::JwksClient::new(
        &config.auth.jwks_url,
        config.auth.jwks_cache_ttl,
    ));
    let jwt_validator = Arc::new(auth::JwtValidator::new(
        jwks_client,
        config.auth.issuer.clone(),
        config.auth.audience.clone(),
        config.auth.roles_claim.clone(),
        config.auth.jwt_leeway,
    ));
    tracing::info!(
        "Auth configuration initialized (issuer: {}, roles claim: {})",
        config.auth.issuer,
        config.auth.roles_claim
    );

    // Object storage for documents
    let storage = Arc::new(
        ObjectStorage::new(&config.storage)
            .map_err(|e| anyhow::anyhow!("Failed to initialize object storage: {}", e))?,
    );
    tracing::info!(
        "Object storage initialized ({:?}, bucket: {})",
        storage.provider(),
        config.storage.bucket
    );

    // Payment provider
    let payment_provider: Arc<dyn PaymentProvider> = Arc::from(create_provider(&config.payment));
    tracing::info!("Payment provider initialized: {}", payment_provider.name());

    // Feature services
    let service_type_service = Arc::new(ServiceTypeService::new(pool.clone()));
    let faq_service = Arc::new(FaqService::new(pool.clone()));
    let service_request_service = Arc::new(ServiceRequestService::new(
        pool.clone(),
        Arc::clone(&service_type_service),
    ));
    let document_service = Arc::new(DocumentService::new(
        pool.clone(),
        Arc::clone(&storage),
        Arc::clone(&service_type_service),
        Arc::clone(&service_request_service),
    ));
    let payment_service = Arc::new(PaymentService::new(
        pool.clone(),
        Arc::clone(&payment_provider),
        Arc::clone(&service_type_service),
    ));
    let appointment_service = Arc::new(AppointmentService::new(
        pool.clone(),
        Arc::clone(&service_request_service),
    ));
    let admin_user_service = Arc::new(AdminUserService::new());
    tracing::info!("Feature services initialized");

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    // Swagger stays outside the envelope so the OpenAPI document is served as-is
    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn_with_state(
                Arc::new(credentials),
                middleware::swagger_basic_auth,
            ))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    // Protected routes (require JWT authentication)
    let protected_routes = Router::new()
        .merge(auth_routes::routes())
        .merge(service_requests_routes::routes(Arc::clone(
            &service_request_service,
        )))
        .merge(documents_routes::routes(document_service))
        .merge(payments_routes::routes(Arc::clone(&payment_service)))
        .merge(appointments_routes::routes(appointment_service))
        .nest("/api/v1/admin", admin_routes::routes(admin_user_service))
        .route_layer(from_fn_with_state(
            jwt_validator.clone(),
            middleware::auth_middleware,
        ));

    // Public reads with admin writes; a bearer token is optional here
    let mixed_routes = Router::new()
        .merge(service_types_routes::routes(service_type_service))
        .merge(faqs_routes::routes(faq_service))
        .route_layer(from_fn_with_state(
            jwt_validator.clone(),
            middleware::optional_auth_middleware,
        ));

    // Public routes (no auth required)
    let public_routes = Router::new().merge(payments_routes::webhook_routes(payment_service));

    let api = Router::new()
        .merge(protected_routes)
        .merge(mixed_routes)
        .merge(public_routes)
        .fallback(not_found_fallback)
        .layer(from_fn(envelope_middleware));

    // Simple health check endpoint (no auth required)
    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", axum::routing::get(health_check));

    let app = Router::new()
        .merge(swagger)
        .merge(health_route)
        .merge(api)
        .layer(
            // Outermost first: request id is set before tracing sees the request
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(middleware::MakeSpanWithRequestId)
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(middleware::cors_layer(
                    config.app.cors_allowed_origins.clone(),
                ))
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(DefaultBodyLimit::max(config.app.max_request_body_size)),
        );

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    axum::serve(listener, app).await?;

    Ok(())
}
