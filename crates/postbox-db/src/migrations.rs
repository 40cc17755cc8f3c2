use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            subject     TEXT NOT NULL,
            body        TEXT NOT NULL,
            sender_id   TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS deliveries (
            id          TEXT PRIMARY KEY,
            message_id  TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id),
            role        TEXT NOT NULL CHECK (role IN ('sender', 'recipient', 'both')),
            is_read     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(message_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_deliveries_user
            ON deliveries(user_id);

        CREATE INDEX IF NOT EXISTS idx_deliveries_message
            ON deliveries(message_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
