use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info, warn};

use parking_allocator::config::database::DatabaseConfig;
use parking_allocator::config::{EnvironmentConfig, StorageBackend};
use parking_allocator::database::DatabaseConnection;
use parking_allocator::repositories::{InMemoryStore, Repositories};
use parking_allocator::{create_app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    let config = EnvironmentConfig::from_env()?;

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    info!("🅿️ Parking Allocator - API de tickets y plazas");
    info!("================================================");
    info!("🌍 Entorno: {}", config.environment);
    if config.cors_origins.is_empty() && !config.is_development() {
        warn!("⚠️ CORS_ORIGINS vacío fuera de desarrollo: se aceptan todos los orígenes");
    }

    let repositories = match config.storage_backend {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL es obligatorio con STORAGE_BACKEND=postgres"))?;
            let connection = match DatabaseConnection::connect(&DatabaseConfig::new(url)).await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    return Err(anyhow::anyhow!("Error de base de datos: {}", e));
                }
            };
            info!("✅ PostgreSQL conectado");
            Repositories::postgres(connection.pool().clone())
        }
        StorageBackend::Memory => {
            warn!("⚠️ Usando almacén en memoria con datos de ejemplo; nada se persiste");
            Repositories::in_memory(InMemoryStore::with_demo_data().await)
        }
    };

    let addr: SocketAddr = config.server_url().parse()?;
    let app = create_app(AppState::new(repositories, config));

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("🎫 Tickets:");
    info!("   GET  /api/tickets?status=&search= - Listar tickets");
    info!("   GET  /api/tickets/stats - Estadísticas");
    info!("   GET  /api/tickets/:id - Obtener ticket");
    info!("   POST /api/tickets - Emitir ticket");
    info!("   PUT  /api/tickets/:id - Extender / anular / renovar / editar");
    info!("   DELETE /api/tickets/:id - Eliminar ticket");
    info!("🅿️ Plazas:");
    info!("   GET  /api/parking-spots - Listar plazas");
    info!("   GET  /api/parking-spots/summary - Ocupación");
    info!("   GET  /api/parking-spots/available?spot_type= - Primera plaza libre por tipo");
    info!("   GET  /api/parking-spots/:id - Obtener plaza");
    info!("   POST /api/parking-spots - Crear plaza");
    info!("   PUT  /api/parking-spots/:id - Liberar / reservar / mantenimiento / editar");
    info!("   DELETE /api/parking-spots/:id - Eliminar plaza");
    info!("🚗 Catálogo:");
    info!("   GET  /api/vehicles, /api/vehicles/:plate");
    info!("   GET  /api/services, /api/services/:id");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
