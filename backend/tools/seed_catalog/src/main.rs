use std::env;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use dotenvy::dotenv;
use tracing::info;

use muslimsdeen::config::AppConfig;
use muslimsdeen::db::{self, SqliteBackend};
use muslimsdeen::models::{CoursePayload, LecturePayload};
use muslimsdeen::repository::DataBackend;
use muslimsdeen::storage::LocalStorage;

const COURSE_TITLE: &str = "সহজ সূত্রে কুরআন শিখি";
const COURSE_SLUG: &str = "quran-shikhi";
const INSTRUCTOR: &str = "আস-সুন্নাহ ফাউন্ডেশন";
const DESCRIPTION: &str = "কুরআন সহজভাবে শিখুন আস-সুন্নাহ ফাউন্ডেশনের এই কোর্সে। ২৭টি ভিডিও লেকচার এবং পিডিএফ নোটসের মাধ্যমে কুরআনের মূল বিষয়গুলো জানুন।";
const LECTURE_COUNT: i32 = 27;
const FREE_LECTURES: i32 = 5;

/// Seeds the local database with the first course and its lectures.
#[derive(Parser, Debug)]
#[command(name = "seed_catalog")]
struct Args {
    /// Write to the database. Without it nothing is changed.
    #[arg(long)]
    apply: bool,

    /// User id to grant the admin role.
    #[arg(long)]
    admin: Option<String>,

    /// Profile name for the admin.
    #[arg(long, requires = "admin")]
    name: Option<String>,

    /// Profile email for the admin.
    #[arg(long, requires = "admin")]
    email: Option<String>,
}

fn bengali_number(n: i32) -> String {
    const DIGITS: [char; 10] = ['০', '১', '২', '৩', '৪', '৫', '৬', '৭', '৮', '৯'];
    n.to_string()
        .chars()
        .map(|c| c.to_digit(10).map_or(c, |d| DIGITS[d as usize]))
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "seed_catalog=info,muslimsdeen=info".to_string()),
        ))
        .init();

    let args = Args::parse();
    let config = AppConfig::new_from_env()?;
    let admin = args.admin;

    if !args.apply {
        println!("[DRY RUN] Would seed into {}", config.database_url);
        println!("[DRY RUN] Would create course {} ({})", COURSE_TITLE, COURSE_SLUG);
        println!(
            "[DRY RUN] Would create {} lectures, first {} public",
            LECTURE_COUNT, FREE_LECTURES
        );
        if let Some(user_id) = &admin {
            println!("[DRY RUN] Would grant admin to {}", user_id);
        }
        println!("Run again with --apply to write.");
        return Ok(());
    }

    let pool = db::connect(&config.database_url).await?;
    let storage = Arc::new(LocalStorage::new(&config.storage_dir, &config.site_url));
    let backend = SqliteBackend::new(pool, storage);
    let repos = backend.scoped(None);

    if let Some(user_id) = &admin {
        backend
            .grant_admin(user_id, args.name.as_deref(), args.email.as_deref())
            .await?;
        println!("Granted admin to {}", user_id);
    }

    let existing = repos.courses.list().await?;
    if existing.iter().any(|c| c.slug == COURSE_SLUG) {
        println!("Course {} already present, nothing to seed", COURSE_SLUG);
        return Ok(());
    }

    let course = repos
        .courses
        .create(&CoursePayload {
            title: COURSE_TITLE.to_string(),
            slug: COURSE_SLUG.to_string(),
            description: Some(DESCRIPTION.to_string()),
            thumbnail_url: None,
            instructor: Some(INSTRUCTOR.to_string()),
            is_published: true,
            updated_at: Utc::now(),
        })
        .await?;
    info!("created course {}", course.id);

    for n in 1..=LECTURE_COUNT {
        repos
            .lectures
            .create(&LecturePayload {
                course_id: course.id.clone(),
                title: format!("লেকচার {}", bengali_number(n)),
                youtube_url: None,
                pdf_url: None,
                thumbnail_url: None,
                sort_order: n,
                is_public: n <= FREE_LECTURES,
                updated_at: Utc::now(),
            })
            .await?;
    }

    println!("Course created: {} with {} lectures", course.slug, LECTURE_COUNT);

    Ok(())
}
