//! Application Startup
//!
//! Application building, service wiring and server lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::services::{
    ChatService, ChatServiceImpl, FriendService, FriendServiceImpl, MessageService,
    MessageServiceImpl, UserService, UserServiceImpl,
};
use crate::config::Settings;
use crate::domain::services::{ChatProvisioner, FriendshipService};
use crate::infrastructure::database::{self, PgUnitOfWork};
use crate::infrastructure::repositories::{
    PgChatRepository, PgFriendRequestRepository, PgMessageRepository, PgUserRepository,
};
use crate::presentation::http::{handlers, routes};
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::{ConnectionRegistry, RelayContext};
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub snowflake: Arc<SnowflakeGenerator>,
    pub registry: Arc<ConnectionRegistry>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(db: PgPool, settings: Settings) -> Self {
        let snowflake = Arc::new(SnowflakeGenerator::new(
            settings.snowflake.machine_id as u64,
            settings.snowflake.epoch,
        ));
        Self {
            db,
            snowflake,
            registry: Arc::new(ConnectionRegistry::new()),
            settings: Arc::new(settings),
        }
    }

    pub fn friend_service(&self) -> impl FriendService {
        let provisioner = ChatProvisioner::new(self.snowflake.clone());
        FriendServiceImpl::new(
            Arc::new(PgUserRepository::new(self.db.clone())),
            Arc::new(PgFriendRequestRepository::new(self.db.clone())),
            Arc::new(PgUnitOfWork::new(self.db.clone())),
            FriendshipService::new(provisioner),
            self.snowflake.clone(),
        )
    }

    pub fn user_service(&self) -> impl UserService {
        UserServiceImpl::new(Arc::new(PgUserRepository::new(self.db.clone())))
    }

    pub fn chat_service(&self) -> impl ChatService {
        ChatServiceImpl::new(
            Arc::new(PgChatRepository::new(self.db.clone())),
            Arc::new(PgMessageRepository::new(self.db.clone())),
        )
    }

    pub fn message_service(&self) -> Arc<dyn MessageService> {
        Arc::new(MessageServiceImpl::new(
            Arc::new(PgMessageRepository::new(self.db.clone())),
            Arc::new(PgChatRepository::new(self.db.clone())),
            self.snowflake.clone(),
            self.settings.websocket.max_content_length,
        ))
    }

    pub fn relay_context(&self) -> RelayContext {
        RelayContext::new(
            self.registry.clone(),
            self.message_service(),
            &self.settings.websocket,
        )
    }
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    registry: Arc<ConnectionRegistry>,
    shutdown_grace: Duration,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        let db = database::create_pool(&settings.database)
            .await
            .context("Failed to create database pool")?;
        tracing::info!("Database connection pool created");

        if settings.database.run_migrations {
            database::run_migrations(&db)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");
        }

        let addr = settings.server.socket_addr().context("Invalid server address")?;
        let shutdown_grace = Duration::from_millis(settings.websocket.shutdown_grace_ms);
        let cors_layer = cors::create_cors_layer(&settings.cors);
        let state = AppState::new(db, settings);
        let registry = state.registry.clone();

        handlers::health::init_server_start();

        // Router::layer wraps the previous layers, so cors stays outermost.
        let router = routes::create_router(state)
            .layer(logging::create_trace_layer())
            .layer(cors_layer);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self {
            listener,
            router,
            registry,
            shutdown_grace,
        })
    }

    /// Run the server until a shutdown signal arrives. Once the listener has
    /// stopped accepting, every live connection is closed and the relay loops
    /// get the configured grace period to finish their teardown.
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async {
                shutdown_signal().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        self.registry.shutdown(self.shutdown_grace).await;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
