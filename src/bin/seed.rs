//! 向数据库写入演示数据, 可重复执行。
//! 用法: DATABASE_URL=postgres://... cargo run --bin seed

use anyhow::{Context, Result};
use eventpass_backend::config::Config;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_toml().map_err(|e| anyhow::anyhow!("failed to load config: {e}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database.url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    println!("Seeding database...");

    let test_user = upsert_user(
        &pool,
        "test-user-firebase-uid-12345",
        "+911234567890",
        "Test User",
        false,
    )
    .await?;
    println!("Created test user: {test_user}");

    let test_admin = upsert_user(
        &pool,
        "test-admin-firebase-uid-67890",
        "+919876543210",
        "Test Admin",
        true,
    )
    .await?;
    println!("Created test admin: {test_admin}");

    let event_id = find_or_create_event(
        &pool,
        "Test Event 2025",
        "This is a test event for demonstration purposes",
    )
    .await?;
    println!("Created test event: {event_id}");

    let ticket_numbers = ["TEST001", "TEST002", "TEST003", "TEST004", "TEST005"];
    for number in ticket_numbers {
        sqlx::query(
            r#"
            INSERT INTO tickets (ticket_number, event_id)
            VALUES ($1, $2)
            ON CONFLICT (ticket_number) DO NOTHING
            "#,
        )
        .bind(number)
        .bind(event_id)
        .execute(&pool)
        .await?;
    }
    println!("Created test tickets: {ticket_numbers:?}");

    // 把第一张票绑定到测试用户
    let ticket_id: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM tickets WHERE ticket_number = 'TEST001'")
            .fetch_optional(&pool)
            .await?;

    if let Some(ticket_id) = ticket_id {
        sqlx::query(
            r#"
            INSERT INTO user_tickets (user_id, ticket_id)
            VALUES ($1, $2)
            ON CONFLICT (ticket_id) DO NOTHING
            "#,
        )
        .bind(test_user)
        .bind(ticket_id)
        .execute(&pool)
        .await?;
        println!("Linked TEST001 to test user");
    }

    // 演示用优惠券模板
    let template_exists: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM coupon_templates WHERE event_id = $1 AND title = 'Welcome Drink'",
    )
    .bind(event_id)
    .fetch_optional(&pool)
    .await?;

    if template_exists.is_none() {
        sqlx::query(
            r#"
            INSERT INTO coupon_templates (event_id, title, description, discount, terms)
            VALUES ($1, 'Welcome Drink', 'One free welcome drink at the venue bar', 100.0,
                    'Valid only during the event. Not exchangeable for cash.')
            "#,
        )
        .bind(event_id)
        .execute(&pool)
        .await?;
        println!("Created demo coupon template");
    }

    println!("Seeding complete.");
    Ok(())
}

async fn upsert_user(
    pool: &PgPool,
    firebase_uid: &str,
    phone_number: &str,
    name: &str,
    is_admin: bool,
) -> Result<Uuid> {
    let id = sqlx::query_scalar(
        r#"
        INSERT INTO users (firebase_uid, phone_number, name, is_admin)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (phone_number) DO UPDATE SET updated_at = now()
        RETURNING id
        "#,
    )
    .bind(firebase_uid)
    .bind(phone_number)
    .bind(name)
    .bind(is_admin)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

async fn find_or_create_event(pool: &PgPool, name: &str, description: &str) -> Result<Uuid> {
    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM events WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let id = sqlx::query_scalar("INSERT INTO events (name, description) VALUES ($1, $2) RETURNING id")
        .bind(name)
        .bind(description)
        .fetch_one(pool)
        .await?;

    Ok(id)
}
