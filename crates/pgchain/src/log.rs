//! `tracing` output for executed statements.

use crate::config::QueryConfig;
use crate::qb::BuiltStatement;
use tracing::Level;

/// Emits one `pgchain.sql` event per statement, before it is sent.
#[derive(Debug, Clone)]
pub struct SqlLogger {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLogger {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl From<&QueryConfig> for SqlLogger {
    fn from(config: &QueryConfig) -> Self {
        Self {
            level: config.sql_log_level,
            max_sql_length: config.max_sql_length,
        }
    }
}

impl SqlLogger {
    pub fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    pub fn log(&self, statement: &BuiltStatement) {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.truncate_sql(&statement.compiled.sql);
        let named_sql = self.truncate_sql(&statement.named_sql);
        emit_at_level!(
            self.level,
            target: "pgchain.sql",
            tag = statement.tag,
            param_count = statement.compiled.params.len(),
            placeholders = ?statement.compiled.names,
            sql = %sql,
            named_sql = %named_sql,
        );
    }
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
