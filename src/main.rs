mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware};
use crate::features::admin::{routes as admin_routes, AdminService, AdminState};
use crate::features::auth::routes as auth_routes;
use crate::features::auth::services::{AuthService, MagicLinkTokenService, PgVerificationTokenStore};
use crate::features::auth::{AccountDirectory, JwtManager};
use crate::features::checkout::{routes as checkout_routes, CheckoutService};
use crate::features::documents::{routes as documents_routes, DocumentService};
use crate::features::meta::{routes as meta_routes, MetaService};
use crate::features::quizzes::{routes as quizzes_routes, QuizGenerationService, QuizService};
use crate::features::reports::{routes as reports_routes, ReportService};
use crate::features::topics::TopicService;
use crate::features::users::{routes as users_routes, UserService};
use crate::modules::billing::StripeClient;
use crate::modules::mail::{HttpMailer, LogMailer, Mailer};
use crate::modules::storage::{MinIOClient, ObjectStore};
use crate::shared::llm::{OpenAiLlmClient, StructuredGenerator};
use axum::{extract::State, http::StatusCode, middleware::from_fn, Router};
use sqlx::PgPool;
use std::sync::Arc;
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

    // Log system info
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

    // Run migrations automatically
    tracing::info!("Running database migrations...");
    database::MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    // Object storage for uploaded documents (bucket is created if missing)
    let store: Arc<dyn ObjectStore> = Arc::new(
        MinIOClient::new(config.minio.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize MinIO client: {}", e))?,
    );

    // Email delivery
    let mailer: Arc<dyn Mailer> = match config.mail.api_key.clone() {
        Some(api_key) => {
            tracing::info!("Mailer initialized (HTTP API: {})", config.mail.api_url);
            Arc::new(
                HttpMailer::new(&config.mail, api_key)
                    .map_err(|e| anyhow::anyhow!("Failed to initialize mailer: {}", e))?,
            )
        }
        None => {
            tracing::warn!("MAIL_API_KEY not set, emails will be written to the log");
            Arc::new(LogMailer)
        }
    };

    // LLM client shared by generation and grading
    let llm_client = OpenAiLlmClient::new(&config.llm);
    tracing::info!("LLM client initialized (model: {})", llm_client.model_name());
    let generator = StructuredGenerator::new(Arc::new(llm_client));

    // Auth
    let jwt_manager = Arc::new(JwtManager::new(&config.auth));
    let token_service = Arc::new(MagicLinkTokenService::new(
        Arc::new(PgVerificationTokenStore::new(pool.clone())),
        config.auth.magic_link_ttl,
    ));
    let user_service = Arc::new(UserService::new(pool.clone(), Arc::clone(&store)));
    let auth_service = Arc::new(AuthService::new(
        token_service,
        Arc::clone(&user_service),
        Arc::clone(&jwt_manager),
        mailer,
        config.app.app_url.clone(),
    ));
    tracing::info!("Auth services initialized");

    // Domain services
    let topic_service = Arc::new(TopicService::new(pool.clone()));
    let document_service = Arc::new(DocumentService::new(pool.clone(), Arc::clone(&store)));
    let quiz_service = Arc::new(QuizService::new(pool.clone(), generator.clone()));
    let generation_service = Arc::new(QuizGenerationService::new(
        pool.clone(),
        generator,
        Arc::clone(&topic_service),
        Arc::clone(&document_service),
    ));
    let report_service = Arc::new(ReportService::new(pool.clone()));
    let meta_service = Arc::new(MetaService::new(pool.clone(), Arc::clone(&topic_service)));
    let admin_service = Arc::new(AdminService::new(pool.clone(), Arc::clone(&user_service)));
    tracing::info!("Domain services initialized");

    // Stripe Checkout
    let stripe_client = Arc::new(
        StripeClient::new(&config.stripe)
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe client: {}", e))?,
    );
    let checkout_service = Arc::new(CheckoutService::new(
        pool.clone(),
        stripe_client,
        config.app.frontend_url.clone(),
    ));
    tracing::info!("Checkout service initialized");

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    // Build swagger router
    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn(middleware::basic_auth_middleware(Arc::new(
                credentials,
            ))))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    let admin_state = AdminState {
        admin_service,
        document_service: Arc::clone(&document_service),
        topic_service,
        report_service: Arc::clone(&report_service),
        meta_service: Arc::clone(&meta_service),
    };

    // Sessions are checked against the live account on every request
    let auth_state = middleware::AuthState {
        jwt: jwt_manager,
        accounts: Arc::clone(&user_service) as Arc<dyn AccountDirectory>,
    };

    // Protected routes (require a session token)
    let protected_routes = Router::new()
        .merge(auth_routes::protected_routes())
        .merge(users_routes::routes(user_service))
        .merge(quizzes_routes::routes(quiz_service, generation_service))
        .merge(documents_routes::routes(document_service))
        .merge(reports_routes::routes(report_service))
        .merge(checkout_routes::routes(Arc::clone(&checkout_service)))
        .nest("/api/admin", admin_routes::routes(admin_state))
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    // Health check pings the database (no auth required)
    async fn health_check(State(pool): State<PgPool>) -> StatusCode {
        match database::ping(&pool).await {
            Ok(()) => StatusCode::OK,
            Err(e) => {
                tracing::error!("Health check failed: {}", e);
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
    let health_route = Router::new()
        .route("/health", axum::routing::get(health_check))
        .with_state(pool);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .merge(auth_routes::public_routes(auth_service))
        .merge(meta_routes::routes(meta_service))
        .merge(checkout_routes::webhook_routes(checkout_service));

    let app = Router::new()
        .merge(swagger)
        .merge(protected_routes)
        .merge(public_routes)
        .merge(health_route)
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

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

    socket.set_recv_buffer_size(256 * 1024)?;
    socket.set_send_buffer_size(256 * 1024)?;

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
    socket.listen(65535)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    axum::serve(listener, app).await?;

    Ok(())
}
