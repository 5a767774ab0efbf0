use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id           TEXT PRIMARY KEY,
            name         TEXT NOT NULL UNIQUE,
            total_points INTEGER NOT NULL DEFAULT 0 CHECK (total_points >= 0),
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS claims (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            points      INTEGER NOT NULL CHECK (points BETWEEN 1 AND 10),
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_claims_user
            ON claims(user_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
