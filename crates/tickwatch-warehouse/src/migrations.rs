use ::duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

// Timestamps are stored as RFC3339 UTC text and dates as YYYY-MM-DD text:
// both are fixed width, so lexicographic ORDER BY is chronological.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_quote_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS intraday_snapshots (
    symbol TEXT NOT NULL,
    refreshed_at TEXT NOT NULL,
    price DOUBLE NOT NULL,
    currency TEXT NOT NULL,
    price_change DOUBLE,
    price_change_percent DOUBLE,
    PRIMARY KEY(symbol, refreshed_at)
);

CREATE TABLE IF NOT EXISTS daily_bars (
    symbol TEXT NOT NULL,
    bar_date TEXT NOT NULL,
    open_price DOUBLE NOT NULL,
    close_price DOUBLE NOT NULL,
    currency TEXT NOT NULL,
    day_change_percent DOUBLE NOT NULL,
    volume BIGINT,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY(symbol, bar_date)
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_intraday_snapshots_symbol_at ON intraday_snapshots(symbol, refreshed_at);
CREATE INDEX IF NOT EXISTS idx_daily_bars_symbol_date ON daily_bars(symbol, bar_date);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let query = format!(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = '{}'",
            escape_sql_string(migration.version)
        );
        let applied: i64 = connection.query_row(query.as_str(), [], |row| row.get(0))?;

        if applied == 0 {
            connection.execute_batch(migration.sql)?;
            let insert = format!(
                "INSERT INTO schema_migrations (version) VALUES ('{}')",
                escape_sql_string(migration.version)
            );
            connection.execute_batch(insert.as_str())?;
        }
    }

    Ok(())
}

fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}
