use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use progress_core::model::{Course, CourseDraft, CourseId, CourseStatus, LessonId, ModuleId};
use services::{Clock, CourseService, DEFAULT_STORAGE_KEY};
use storage::repository::Storage;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArg { name: &'static str },
    UnknownArg(String),
    InvalidId { name: &'static str, raw: String },
    InvalidStatus { raw: String },
    InvalidDate { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArg { name } => write!(f, "missing <{name}> argument"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { name, raw } => write!(f, "invalid {name}: {raw}"),
            ArgsError::InvalidStatus { raw } => write!(
                f,
                "invalid status (expected completed, in-progress or paused): {raw}"
            ),
            ArgsError::InvalidDate { raw } => {
                write!(f, "invalid --start value (expected YYYY-MM-DD): {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app list");
    eprintln!("  app show <course-id>");
    eprintln!("  app add --title <title> [--description <text>] [--start <YYYY-MM-DD>]");
    eprintln!("  app lesson <course-id> <module-id> <lesson-id> [--undo]");
    eprintln!("  app status <course-id> <completed|in-progress|paused>");
    eprintln!("  app remove <course-id>");
    eprintln!("  app seed");
    eprintln!();
    eprintln!("Options (any command):");
    eprintln!("  --db <sqlite_url>   default sqlite:progress.sqlite3");
    eprintln!("  --key <name>        default {DEFAULT_STORAGE_KEY}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PROGRESS_DB_URL, PROGRESS_STORAGE_KEY, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    List,
    Show,
    Add,
    Lesson,
    Status,
    Remove,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "list" => Some(Self::List),
            "show" => Some(Self::Show),
            "add" => Some(Self::Add),
            "lesson" => Some(Self::Lesson),
            "status" => Some(Self::Status),
            "remove" => Some(Self::Remove),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

/// Parsed command line: storage targeting plus the requested action.
struct Args {
    db_url: String,
    key: String,
    action: Action,
}

enum Action {
    List,
    Show(CourseId),
    Add(CourseDraft),
    Lesson {
        course: CourseId,
        module: ModuleId,
        lesson: LessonId,
        completed: bool,
    },
    Status(CourseId, CourseStatus),
    Remove(CourseId),
    Seed,
}

impl Args {
    fn parse(cmd: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = normalize_sqlite_url(
            std::env::var("PROGRESS_DB_URL").unwrap_or_else(|_| "sqlite:progress.sqlite3".into()),
        );
        let mut key =
            std::env::var("PROGRESS_STORAGE_KEY").unwrap_or_else(|_| DEFAULT_STORAGE_KEY.into());
        let mut positional = Vec::new();
        let mut title = None;
        let mut description = None;
        let mut start = None;
        let mut undo = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--key" => key = require_value(args, "--key")?,
                "--title" if cmd == Command::Add => title = Some(require_value(args, "--title")?),
                "--description" if cmd == Command::Add => {
                    description = Some(require_value(args, "--description")?);
                }
                "--start" if cmd == Command::Add => {
                    let value = require_value(args, "--start")?;
                    let parsed = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                        .map_err(|_| ArgsError::InvalidDate { raw: value.clone() })?;
                    start = Some(parsed);
                }
                "--undo" if cmd == Command::Lesson => undo = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other if other.starts_with("--") => {
                    return Err(ArgsError::UnknownArg(other.to_owned()));
                }
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let action = match cmd {
            Command::List => Action::List,
            Command::Seed => Action::Seed,
            Command::Show => Action::Show(parse_id(positional.next(), "course-id")?),
            Command::Remove => Action::Remove(parse_id(positional.next(), "course-id")?),
            Command::Add => {
                let title = title.ok_or(ArgsError::MissingValue { flag: "--title" })?;
                let mut draft =
                    CourseDraft::new(title).with_description(description.unwrap_or_default());
                if let Some(start) = start {
                    draft = draft.with_start_date(start);
                }
                Action::Add(draft)
            }
            Command::Lesson => Action::Lesson {
                course: parse_id(positional.next(), "course-id")?,
                module: parse_id(positional.next(), "module-id")?,
                lesson: parse_id(positional.next(), "lesson-id")?,
                completed: !undo,
            },
            Command::Status => {
                let course = parse_id(positional.next(), "course-id")?;
                let raw = positional
                    .next()
                    .ok_or(ArgsError::MissingArg { name: "status" })?;
                let status = raw
                    .parse::<CourseStatus>()
                    .map_err(|_| ArgsError::InvalidStatus { raw: raw.clone() })?;
                Action::Status(course, status)
            }
        };

        if let Some(extra) = positional.next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        Ok(Self {
            db_url,
            key,
            action,
        })
    }
}

fn parse_id<T: std::str::FromStr>(
    raw: Option<String>,
    name: &'static str,
) -> Result<T, ArgsError> {
    let raw = raw.ok_or(ArgsError::MissingArg { name })?;
    raw.parse().map_err(|_| ArgsError::InvalidId { name, raw })
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn print_summary(course: &Course) {
    let progress = course.progress();
    println!(
        "{:>16}  {:<11}  {:>3}% ({}/{})  {}",
        course.id(),
        course.status(),
        progress.percent,
        progress.completed_lessons,
        progress.total_lessons,
        course.title()
    );
}

fn print_details(course: &Course) {
    println!("{} [{}]", course.title(), course.status());
    if !course.description().is_empty() {
        println!("  {}", course.description());
    }
    match course.end_date() {
        Some(end) => println!("  {} .. {}", course.start_date(), end),
        None => println!("  started {}", course.start_date()),
    }
    for module in course.modules() {
        println!(
            "  {} {} ({}/{} lessons, {}%)",
            module.id(),
            module.title(),
            module.completed_lessons(),
            module.total_lessons(),
            module.percent_complete()
        );
        for lesson in module.lessons() {
            let mark = if lesson.is_completed() { 'x' } else { ' ' };
            println!("    [{mark}] {} {}", lesson.id(), lesson.title());
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::List,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::List,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Storage is opened here so the library crates never touch the filesystem.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let courses = CourseService::new(Clock::default_clock(), Arc::clone(&storage.kv))
        .with_key(parsed.key);
    tracing::debug!(db = %parsed.db_url, key = courses.storage_key(), "storage ready");

    match parsed.action {
        Action::List => {
            let collection = courses.load_all().await;
            if collection.is_empty() {
                println!("no courses yet; try `app add --title <title>` or `app seed`");
            }
            for course in &collection {
                print_summary(course);
            }
        }
        Action::Show(id) => match courses.find_course(id).await {
            Some(course) => print_details(&course),
            None => return Err(services::CourseServiceError::CourseNotFound(id).into()),
        },
        Action::Add(draft) => {
            let course = courses.create_course(draft).await?;
            print_summary(&course);
        }
        Action::Lesson {
            course,
            module,
            lesson,
            completed,
        } => {
            let updated = courses
                .mark_lesson_completed(course, module, &lesson, completed)
                .await?;
            print_summary(&updated);
        }
        Action::Status(course, status) => {
            let updated = courses.set_course_status(course, status).await?;
            print_summary(&updated);
        }
        Action::Remove(id) => {
            let remaining = courses.remove_course(id).await?;
            println!("removed course {id}; {} remaining", remaining.len());
        }
        Action::Seed => {
            if courses.load_all().await.is_empty() {
                let course = courses
                    .create_course(
                        CourseDraft::new("Getting Started")
                            .with_description("Sample course with the starter curriculum"),
                    )
                    .await?;
                print_summary(&course);
            } else {
                println!("collection already has courses; nothing seeded");
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
