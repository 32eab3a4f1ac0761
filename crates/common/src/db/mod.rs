//! Database layer for Finsheet
//!
//! Provides:
//! - SeaORM entity models
//! - Repository for reads, unit of work for transactional writes
//! - Connection pool management
//! - Table creation at start-up

pub mod models;
mod repository;
mod unit_of_work;

pub use repository::Repository;
pub use unit_of_work::{NewCompany, StatementPayload, UnitOfWork};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use models::{CompanyEntity, FinancialStatementEntity, UploadedFileEntity};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    /// Primary connection (for writes)
    pub primary: DatabaseConnection,

    /// Read replica connection (optional)
    pub replica: Option<DatabaseConnection>,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to primary database...");

        let primary = Database::connect(connect_options(&config.url, config))
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect to primary: {}", e)
            })?;

        // Connect to replica if configured
        let replica = if let Some(ref read_url) = config.read_url {
            info!("Connecting to read replica...");

            let replica_conn = Database::connect(connect_options(read_url, config))
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Failed to connect to replica: {}", e)
                })?;

            Some(replica_conn)
        } else {
            None
        };

        info!("Database connections established");

        Ok(Self { primary, replica })
    }

    /// Get the connection for reads (replica if available, otherwise primary)
    pub fn read(&self) -> &DatabaseConnection {
        self.replica.as_ref().unwrap_or(&self.primary)
    }

    /// Get the connection for writes (always primary)
    pub fn write(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Primary ping failed: {}", e),
            })?;

        if let Some(ref replica) = self.replica {
            replica
                .execute_unprepared("SELECT 1")
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Replica ping failed: {}", e),
                })?;
        }

        Ok(())
    }
}

fn connect_options(url: &str, config: &DatabaseConfig) -> ConnectOptions {
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(true);
    opts
}

/// Create the company, uploaded_file and financial_statement tables if missing.
///
/// Unique constraints on `company.name` and `uploaded_file.filename` come from
/// the entity definitions; ingestion relies on them under concurrency.
pub async fn create_schema(conn: &DatabaseConnection) -> Result<()> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements = [
        schema.create_table_from_entity(CompanyEntity),
        schema.create_table_from_entity(UploadedFileEntity),
        schema.create_table_from_entity(FinancialStatementEntity),
    ];

    for statement in statements.iter_mut() {
        statement.if_not_exists();
        conn.execute(backend.build(&*statement)).await?;
    }

    info!("Database schema ready");
    Ok(())
}

/// In-memory stores for tests in this and dependent crates
#[cfg(any(test, feature = "test-util"))]
#[doc(hidden)]
pub mod test_support {
    use super::*;

    /// Single-connection in-memory SQLite pool with the schema applied
    pub async fn memory_pool() -> DbPool {
        let mut config = DatabaseConfig::with_url("sqlite::memory:");
        config.max_connections = 1;
        config.min_connections = 1;

        let pool = DbPool::new(&config).await.expect("in-memory SQLite pool");
        create_schema(pool.write()).await.expect("schema on in-memory SQLite");
        pool
    }

    /// Repository over [`memory_pool`]
    pub async fn memory_repository() -> Repository {
        Repository::new(memory_pool().await)
    }
}
