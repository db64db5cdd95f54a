use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            role        TEXT NOT NULL CHECK (role IN ('donor', 'ngo', 'admin')),
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS ngos (
            id                   INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id              INTEGER NOT NULL UNIQUE REFERENCES users(id),
            organization_name    TEXT NOT NULL,
            description          TEXT,
            mission              TEXT,
            location             TEXT NOT NULL,
            verified             INTEGER NOT NULL DEFAULT 0,
            impact_score         REAL NOT NULL DEFAULT 0,
            focus_areas          TEXT NOT NULL DEFAULT '[]',
            registration_number  TEXT,
            website              TEXT,
            phone                TEXT,
            created_at           TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS donations (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            donor_id          INTEGER NOT NULL REFERENCES users(id),
            ngo_id            INTEGER REFERENCES ngos(id),
            title             TEXT NOT NULL,
            description       TEXT,
            type              TEXT NOT NULL,
            quantity          TEXT NOT NULL,
            amount            REAL,
            status            TEXT NOT NULL DEFAULT 'pending',
            urgency           TEXT NOT NULL DEFAULT 'medium',
            pickup_address    TEXT NOT NULL,
            pickup_time       TEXT,
            estimated_impact  INTEGER,
            actual_impact     INTEGER,
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_donations_donor ON donations(donor_id);
        CREATE INDEX IF NOT EXISTS idx_donations_ngo ON donations(ngo_id);
        CREATE INDEX IF NOT EXISTS idx_donations_status ON donations(status);

        CREATE TABLE IF NOT EXISTS messages (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            sender_id     INTEGER NOT NULL REFERENCES users(id),
            receiver_id   INTEGER NOT NULL REFERENCES users(id),
            donation_id   INTEGER REFERENCES donations(id),
            content       TEXT NOT NULL,
            message_type  TEXT NOT NULL DEFAULT 'text',
            read          INTEGER NOT NULL DEFAULT 0,
            created_at    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_pair
            ON messages(sender_id, receiver_id, created_at);

        CREATE TABLE IF NOT EXISTS donation_updates (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            donation_id  INTEGER NOT NULL REFERENCES donations(id),
            status       TEXT NOT NULL,
            message      TEXT,
            updated_by   INTEGER NOT NULL REFERENCES users(id),
            created_at   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_donation_updates_donation
            ON donation_updates(donation_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
