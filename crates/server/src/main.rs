//! Nagare server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware};
use nagare_api::{AppState, router as api_router};
use nagare_common::{AppResult, Config, Identity};
use nagare_core::{
    CommentService, EventPublisherService, ModerationService, NewPost, PostService,
    ProfileService, ReactionService,
};
use nagare_db::{
    entities::{post::Category, reaction::ReactionKind},
    repositories::{
        AdminKeyRepository, CommentRepository, PostRepository, ReactionRepository, ReactionTarget,
        ReportRepository, UserProfileRepository,
    },
};
use nagare_queue::{
    FanoutBus, IntentTarget, OfflineJournal, QueuedWrite, RedisPubSub, RetryConfig, WriteIntent,
};
use sea_orm::ActiveEnum;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Rebuild the identity a journal entry was queued under.
fn identity_for(user_id: &str) -> Identity {
    let username = user_id.strip_prefix("user_").unwrap_or(user_id);
    Identity::plain(user_id, username)
}

fn reaction_target(target: IntentTarget) -> ReactionTarget {
    match target {
        IntentTarget::Post { id } => ReactionTarget::Post(id),
        IntentTarget::Comment { id } => ReactionTarget::Comment(id),
    }
}

/// Replay one journaled write against the live services.
async fn resubmit(
    entry: QueuedWrite,
    profiles: &ProfileService,
    posts: &PostService,
    comments: &CommentService,
    reactions: &ReactionService,
    moderation: &ModerationService,
) -> AppResult<()> {
    let caller = identity_for(&entry.user_id);
    profiles.ensure_profile(&caller).await?;

    match entry.intent {
        WriteIntent::SubmitPost {
            content,
            category,
            image_url,
            link_url,
        } => {
            let category = Category::try_from_value(&category)
                .map_err(|e| nagare_common::AppError::Validation(e.to_string()))?;
            posts
                .submit(
                    &caller,
                    NewPost {
                        content,
                        category,
                        image_url,
                        link_url,
                    },
                )
                .await
                .map(|_| ())
        }
        WriteIntent::CreateComment {
            post_id,
            parent_id,
            content,
        } => comments
            .create(&caller, &post_id, &content, parent_id.as_deref())
            .await
            .map(|_| ()),
        WriteIntent::ToggleReaction { target, kind } => {
            let kind = ReactionKind::try_from_value(&kind)
                .map_err(|e| nagare_common::AppError::Validation(e.to_string()))?;
            reactions
                .toggle(&caller, reaction_target(target), kind)
                .await
                .map(|_| ())
        }
        WriteIntent::FileReport { target, reason } => moderation
            .file_report(&caller, reaction_target(target), &reason)
            .await
            .map(|_| ()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nagare=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting nagare server...");

    // Load configuration
    let config = Config::load()?;
    let op_deadline = config.community.op_deadline();

    // Connect to database and run migrations
    let db = nagare_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    nagare_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let post_repo = PostRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let reaction_repo = ReactionRepository::new(Arc::clone(&db));
    let report_repo = ReportRepository::new(Arc::clone(&db));
    let profile_repo = UserProfileRepository::new(Arc::clone(&db));
    let admin_key_repo = AdminKeyRepository::new(Arc::clone(&db));

    // Initialize fan-out bus and Redis Pub/Sub transport
    let fanout = FanoutBus::new();
    let pubsub = RedisPubSub::new(&config.redis.url, &config.redis.prefix, fanout.clone()).await?;
    pubsub.start().await?;
    let event_publisher: EventPublisherService = Arc::new(pubsub.clone());

    // Initialize services
    let mut post_service = PostService::new(post_repo.clone());
    post_service.set_event_publisher(event_publisher.clone());
    post_service.set_op_deadline(op_deadline);

    let mut comment_service = CommentService::new(comment_repo.clone(), post_repo.clone());
    comment_service.set_event_publisher(event_publisher.clone());
    comment_service.set_op_deadline(op_deadline);

    let mut reaction_service =
        ReactionService::new(reaction_repo, post_repo.clone(), comment_repo.clone());
    reaction_service.set_event_publisher(event_publisher.clone());
    reaction_service.set_op_deadline(op_deadline);

    let mut moderation_service = ModerationService::new(post_repo, comment_repo, report_repo);
    moderation_service.set_event_publisher(event_publisher);
    moderation_service.set_op_deadline(op_deadline);

    let mut profile_service = ProfileService::new(profile_repo, admin_key_repo);
    profile_service.set_op_deadline(op_deadline);

    // Drain any writes journaled while the store was unreachable
    let journal = Arc::new(OfflineJournal::new(config.community.offline_journal.clone()));
    let drain_journal = Arc::clone(&journal);
    let drain_services = (
        profile_service.clone(),
        post_service.clone(),
        comment_service.clone(),
        reaction_service.clone(),
        moderation_service.clone(),
    );
    tokio::spawn(async move {
        let retry = RetryConfig::default();
        let result = drain_journal
            .drain(&retry, |entry| {
                let (profiles, posts, comments, reactions, moderation) = drain_services.clone();
                async move {
                    resubmit(entry, &profiles, &posts, &comments, &reactions, &moderation).await
                }
            })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "Offline journal drain failed");
        }
    });

    // Create app state
    let state = AppState {
        post_service,
        comment_service,
        reaction_service,
        moderation_service,
        profile_service,
        fanout,
        journal,
        feed_page_size: config.community.feed_page_size,
    };

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            nagare_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pubsub.shutdown().await?;
    info!("Server shutdown complete");
    Ok(())
}
