use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn execute(db: &DatabaseConnection, sql: &str) -> Result<(), DbErr> {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        sql.to_owned(),
    ))
    .await?;
    Ok(())
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    execute(db, "PRAGMA foreign_keys = ON").await?;

    // Projects (donation targets, versioned content)
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            slug TEXT NOT NULL,
            title_en TEXT NOT NULL,
            title_ms TEXT,
            description_en TEXT NOT NULL,
            description_ms TEXT,
            cover_image_url TEXT,
            goal_amount INTEGER,
            total_raised INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS blog_posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            slug TEXT NOT NULL,
            title_en TEXT NOT NULL,
            title_ms TEXT,
            excerpt_en TEXT,
            excerpt_ms TEXT,
            body_en TEXT NOT NULL,
            body_ms TEXT,
            cover_image_url TEXT,
            category TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            published_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS site_content (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            section_key TEXT NOT NULL,
            title_en TEXT,
            title_ms TEXT,
            body_en TEXT NOT NULL,
            body_ms TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS forms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            slug TEXT NOT NULL,
            title_en TEXT NOT NULL,
            title_ms TEXT,
            description_en TEXT,
            description_ms TEXT,
            fields TEXT NOT NULL DEFAULT '[]',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    // Donations. No foreign key on project_id: a deleted project can be
    // restored under the same id.
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS donations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            amount INTEGER NOT NULL,
            donor_name TEXT NOT NULL,
            donor_email TEXT NOT NULL,
            donor_phone TEXT,
            payment_status TEXT NOT NULL DEFAULT 'pending',
            payment_reference TEXT NOT NULL UNIQUE,
            bill_code TEXT,
            transaction_id TEXT,
            completed_at TEXT,
            receipt_number TEXT UNIQUE,
            failure_reason TEXT,
            project_id INTEGER,
            environment TEXT NOT NULL DEFAULT 'sandbox',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        "CREATE INDEX IF NOT EXISTS idx_donations_bill_code ON donations(bill_code)",
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS donation_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            donation_id INTEGER NOT NULL,
            event_type TEXT NOT NULL,
            event_data TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (donation_id) REFERENCES donations(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS receipt_sequences (
            year INTEGER PRIMARY KEY,
            last_value INTEGER NOT NULL
        )
        "#,
    )
    .await?;

    // Versioning store. content_id has no foreign key: the live row may be gone.
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS content_versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content_type TEXT NOT NULL,
            content_id INTEGER NOT NULL,
            version_number INTEGER NOT NULL,
            data TEXT NOT NULL,
            previous_data TEXT,
            restored_from_version INTEGER,
            change_type TEXT NOT NULL,
            created_by TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (content_type, content_id, version_number)
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS activity_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            action TEXT NOT NULL,
            description TEXT NOT NULL,
            content_type TEXT,
            content_id INTEGER,
            content_title TEXT,
            actor TEXT,
            metadata TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        "CREATE INDEX IF NOT EXISTS idx_activity_logs_content ON activity_logs(content_type, content_id)",
    )
    .await?;

    Ok(())
}
