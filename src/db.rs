use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Relay jobs. Credentials are stored as submitted; the automation
    // engine replays them verbatim into the platform login form.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS pending_logins (
            id TEXT PRIMARY KEY NOT NULL,
            platform TEXT NOT NULL,
            username TEXT NOT NULL,
            password TEXT NOT NULL,
            otp TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            note TEXT,
            profile_ref TEXT,
            requires_otp INTEGER NOT NULL DEFAULT 0,
            job_error TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Append-only audit trail, one row per committed transition
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS audit_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            pending_login_id TEXT NOT NULL,
            actor_kind TEXT NOT NULL,
            from_status TEXT,
            to_status TEXT NOT NULL,
            meta TEXT,
            created_at TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        "CREATE INDEX IF NOT EXISTS idx_audit_events_login ON audit_events (pending_login_id)"
            .to_owned(),
    ))
    .await?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        "CREATE INDEX IF NOT EXISTS idx_pending_logins_status ON pending_logins (status)"
            .to_owned(),
    ))
    .await?;

    Ok(())
}
