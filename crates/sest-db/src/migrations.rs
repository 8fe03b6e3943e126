use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                nick                TEXT NOT NULL,
                registration_time   TEXT NOT NULL
            );

            CREATE TABLE channels (
                id                  INTEGER PRIMARY KEY,
                user_id             INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                write_key           TEXT NOT NULL UNIQUE,
                last_update         TEXT NOT NULL,
                number_fields       INTEGER NOT NULL CHECK (number_fields >= 1),
                notification_email  TEXT
            );

            CREATE INDEX idx_channels_user ON channels(user_id);

            CREATE TABLE field_encodings (
                channel_id  INTEGER NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
                field_no    INTEGER NOT NULL CHECK (field_no >= 1),
                encoding    TEXT NOT NULL,
                PRIMARY KEY (channel_id, field_no)
            );

            CREATE TABLE records (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                channel_id  INTEGER NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_records_channel ON records(channel_id, created_at);

            CREATE TABLE fields (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                record_id   INTEGER NOT NULL REFERENCES records(id) ON DELETE CASCADE,
                field_no    INTEGER NOT NULL,
                raw_value   TEXT NOT NULL,
                UNIQUE (record_id, field_no)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
