//! List the `users` table.
//!
//! Run with: cargo run --example default -p pgchain
//!
//! Connection settings come from the environment (or a `.env` file):
//! DB_HOST=localhost DB_PORT=5432 DB_NAME=your_database DB_USER=postgres DB_PASS=
//!
//! Set `RUST_LOG=pgchain=debug` to see the SQL that is sent.

use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use pgchain::prelude::*;
use tracing_subscriber::EnvFilter;

fn records_table(records: &[Record]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    if let Some(first) = records.first() {
        table.set_header(first.columns().iter().map(|c| {
            Cell::new(c)
                .add_attribute(Attribute::Bold)
                .fg(Color::Cyan)
        }));
    }
    for record in records {
        table.add_row(record.values().iter().map(|v| match v {
            Value::Null => Cell::new("(null)").fg(Color::DarkGrey),
            other => Cell::new(other.to_string()),
        }));
    }
    table
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let db = Database::new(ConnectionProvider::from_env()?);

    let users = db.from("users").select_all(&[]).await?;

    println!("{}", serde_json::to_string_pretty(&users)?);
    println!("{}", records_table(&users));
    println!("{} row(s)", users.len());
    Ok(())
}
