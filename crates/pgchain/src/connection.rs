//! Lazily established database handle.
//!
//! ```ignore
//! let provider = ConnectionProvider::new(ConnectionConfig::from_env()?);
//! // Nothing is dialed until the first statement runs.
//! let db = Database::new(provider);
//! let users = db.from("users").select_all(&[]).await?;
//! ```

use crate::client::GenericClient;
use crate::config::ConnectionConfig;
use crate::error::{ChainError, ChainResult};
use crate::row::Record;
use crate::value::Value;
use tokio::sync::OnceCell;
use tokio_postgres::{Client, NoTls};

/// Owns one physical connection, created on first use and reused afterwards.
///
/// A failed attempt is remembered: every later call reports the same
/// [`ChainError::Connection`] until [`ConnectionProvider::reconfigure`] is called.
pub struct ConnectionProvider {
    config: ConnectionConfig,
    slot: OnceCell<Result<Client, String>>,
}

impl ConnectionProvider {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            slot: OnceCell::new(),
        }
    }

    /// Build a provider from the `DB_*` environment variables.
    pub fn from_env() -> ChainResult<Self> {
        Ok(Self::new(ConnectionConfig::from_env()?))
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Whether a connection attempt has succeeded.
    pub fn is_connected(&self) -> bool {
        matches!(self.slot.get(), Some(Ok(client)) if !client.is_closed())
    }

    /// Replace the configuration and forget the current handle (or remembered failure).
    pub fn reconfigure(&mut self, config: ConnectionConfig) {
        self.config = config;
        self.slot = OnceCell::new();
    }

    /// The handle, connecting first if needed.
    pub async fn client(&self) -> ChainResult<&Client> {
        let slot = self
            .slot
            .get_or_init(|| async { self.connect().await.map_err(connection_message) })
            .await;
        slot.as_ref()
            .map_err(|message| ChainError::Connection(message.clone()))
    }

    async fn connect(&self) -> ChainResult<Client> {
        let pg_config = self.config.to_pg_config()?;
        let (client, connection) = match pg_config.connect(NoTls).await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!(
                    target: "pgchain.connection",
                    host = %self.config.host,
                    port = self.config.port,
                    database = %self.config.name,
                    error = %e,
                    "connection failed"
                );
                return Err(ChainError::Connection(e.to_string()));
            }
        };

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: "pgchain.connection", error = %e, "connection task ended");
            }
        });

        tracing::info!(
            target: "pgchain.connection",
            host = %self.config.host,
            port = self.config.port,
            database = %self.config.name,
            "connected"
        );
        Ok(client)
    }
}

fn connection_message(err: ChainError) -> String {
    match err {
        ChainError::Connection(message) => message,
        other => other.to_string(),
    }
}

impl GenericClient for ConnectionProvider {
    async fn query(&self, sql: &str, params: &[Value]) -> ChainResult<Vec<Record>> {
        GenericClient::query(self.client().await?, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> ChainResult<u64> {
        GenericClient::execute(self.client().await?, sql, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bad_driver_is_sticky_until_reconfigured() {
        let mut provider =
            ConnectionProvider::new(ConnectionConfig::new("shop").with_driver("mysql"));

        let first = provider.client().await.unwrap_err();
        assert!(first.is_connection_error());
        let second = provider.query("SELECT 1", &[]).await.unwrap_err();
        assert_eq!(first.to_string(), second.to_string());
        assert!(!provider.is_connected());

        provider.reconfigure(ConnectionConfig::new("shop").with_charset("latin1"));
        let third = provider.client().await.unwrap_err();
        assert!(third.is_connection_error());
        assert!(third.to_string().contains("charset"));
    }
}
