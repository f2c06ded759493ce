use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::Parser;
use postboard::{
    config::Settings,
    db,
    domain::{CreateAnnouncementRequest, CreateUserRequest, EventRequest, UserRole},
    service::ServiceContext,
};

/// Fills a database with sample announcements, events and admin accounts.
#[derive(Parser, Debug)]
#[command(name = "seed", version)]
struct Args {
    /// Database to seed. Defaults to the configured database.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Password for the seeded super administrator.
    #[arg(long, default_value = "admin123")]
    admin_password: String,

    /// Seed even when announcements already exist.
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    println!("🌱 Starting database seeding...");

    let mut settings = Settings::new().unwrap_or_default();
    if let Some(url) = args.database_url {
        settings.database.url = url;
    }

    let db_pool = db::connect(&settings.database).await?;

    println!("📋 Running migrations...");
    db::run_migrations(&db_pool).await?;

    let ctx = Arc::new(ServiceContext::new(db_pool.clone(), &settings));

    if !args.force && !ctx.announcement_repo.list_all().await?.is_empty() {
        println!("⚠️  Database already has announcements, use --force to seed anyway");
        return Ok(());
    }

    // Admin accounts
    println!("👥 Creating admin accounts...");
    ctx.admin_service
        .ensure_super_admin(&settings.auth.bootstrap_username, Some(&args.admin_password))
        .await?;
    println!(
        "  ✅ Super administrator ({} / {})",
        settings.auth.bootstrap_username, args.admin_password
    );

    if ctx.user_repo.find_by_username("academic-office").await?.is_none() {
        ctx.user_repo.create(CreateUserRequest {
            username: "academic-office".to_string(),
            password: "office123".to_string(),
            role: UserRole::Admin,
        }).await?;
        println!("  ✅ Admin (academic-office / office123)");
    }

    // Announcements
    println!("📢 Creating announcements...");
    let welcome = ctx.announcement_service.create(CreateAnnouncementRequest {
        title: "Welcome to the school bulletin board".to_string(),
        content: "# Welcome\n\nThis board is where the school publishes notices.\n\n\
                  ## Features\n\n- Markdown content\n- Categories\n- Search\n- Pinned posts\n\n\
                  Please follow the posting guidelines."
            .to_string(),
        category: "System".to_string(),
        author: "Administrator".to_string(),
        is_published: true,
        is_pinned: true,
        ..Default::default()
    }).await?;
    println!("  ✅ {}", welcome.title);

    let term_start = ctx.announcement_service.create(CreateAnnouncementRequest {
        title: "Spring term start".to_string(),
        content: "# Spring term start\n\nThe spring term begins on February 20.\n\n\
                  ## Registration\n\n- Undergraduates: February 19\n- Postgraduates: February 20\n\n\
                  1. Bring your student card\n2. Check your dormitory utilities\n3. Attend the opening ceremony"
            .to_string(),
        category: "School".to_string(),
        author: "Academic Office".to_string(),
        is_published: true,
        priority: Some(3),
        ..Default::default()
    }).await?;
    println!("  ✅ {}", term_start.title);

    let scheduled = ctx.announcement_service.create(CreateAnnouncementRequest {
        title: "Library closed for inventory".to_string(),
        content: "The library will be closed next Monday for the annual inventory.".to_string(),
        category: "Facilities".to_string(),
        author: "Library".to_string(),
        scheduled_publish_at: Some(Utc::now() + Duration::days(1)),
        ..Default::default()
    }).await?;
    println!("  ✅ {} ({})", scheduled.title, scheduled.publish_status.as_str());

    let draft = ctx.announcement_service.create(CreateAnnouncementRequest {
        title: "Sports day volunteers".to_string(),
        content: "Draft: call for sports day volunteers.".to_string(),
        category: "Activities".to_string(),
        author: "Student Union".to_string(),
        ..Default::default()
    }).await?;
    println!("  ✅ {} ({})", draft.title, draft.publish_status.as_str());

    // Events
    println!("📅 Creating events...");
    let today = Utc::now().date_naive();
    let events = [
        ("Opening ceremony", "Main hall", today + Duration::days(7), today + Duration::days(7), Some("09:00"), Some("11:00")),
        ("Sports day", "Athletics field", today + Duration::days(21), today + Duration::days(22), None, None),
        ("Parent-teacher meeting", "Classrooms", today + Duration::days(30), today + Duration::days(30), Some("14:00"), Some("17:30")),
    ];

    for (title, description, start, end, start_time, end_time) in events {
        let event = ctx.event_service.create(EventRequest {
            title: title.to_string(),
            description: description.to_string(),
            start_date: start.format("%Y-%m-%d").to_string(),
            end_date: end.format("%Y-%m-%d").to_string(),
            start_time: start_time.map(str::to_string),
            end_time: end_time.map(str::to_string),
        }).await?;
        println!("  ✅ {} on {}", event.title, event.start_date);
    }

    db_pool.close().await;
    println!("🎉 Seeding complete");

    Ok(())
}
