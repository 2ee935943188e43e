use crate::cli::{CreateAdminArgs, ServeArgs};
use crate::infra::{AppState, LogNotifier};
use crate::routes::with_operational_routes;
use axum::extract::DefaultBodyLimit;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use talent_onboarding::accounts::{
    account_router, AccountService, NewAdmin, SqliteCredentialStore,
};
use talent_onboarding::auth::SessionIssuer;
use talent_onboarding::config::AppConfig;
use talent_onboarding::error::AppError;
use talent_onboarding::store::{self, SqlitePool};
use talent_onboarding::telemetry;
use talent_onboarding::workflows::onboarding::{
    onboarding_router, FsBlobStore, OnboardingService, SqliteApplicantRepository,
};
use tower_http::services::ServeDir;
use tracing::info;

type Accounts = AccountService<SqliteCredentialStore, LogNotifier>;

async fn account_service(config: &AppConfig) -> Result<(Arc<Accounts>, SqlitePool), AppError> {
    let pool = store::connect(&config.database).await?;
    store::bootstrap(&pool).await?;

    let issuer = Arc::new(SessionIssuer::new(&config.auth));
    let accounts = Arc::new(AccountService::new(
        Arc::new(SqliteCredentialStore::new(pool.clone())),
        Arc::new(LogNotifier),
        issuer,
        config.auth.otp_ttl,
    ));
    Ok((accounts, pool))
}

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let (accounts, pool) = account_service(&config).await?;
    tokio::fs::create_dir_all(&config.uploads.root).await?;
    let onboarding = Arc::new(OnboardingService::new(
        Arc::new(SqliteApplicantRepository::new(pool)),
        Arc::new(FsBlobStore::new(config.uploads.root.clone())),
        accounts.issuer(),
    ));

    let api = account_router(accounts)
        .merge(onboarding_router(onboarding))
        .nest_service("/uploads", ServeDir::new(&config.uploads.root));

    let app = with_operational_routes(api)
        .layer(DefaultBodyLimit::max(config.uploads.max_body_bytes))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        uploads = %config.uploads.root.display(),
        "talent onboarding api ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

pub(crate) async fn create_admin(args: CreateAdminArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let (accounts, _) = account_service(&config).await?;
    let admin = accounts
        .create_admin(NewAdmin {
            username: args.username,
            email: args.email,
            full_name: args.full_name,
            password: args.password,
        })
        .await?;

    info!(admin_id = %admin.id.0, username = %admin.username, "administrator created");
    Ok(())
}
