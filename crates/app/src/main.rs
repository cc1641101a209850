use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use sentence_core::catalog::InMemoryCatalog;
use sentence_core::model::{AutoPlaySpeed, Grade, SentenceId, UserPreferencesDraft};
use services::{AppServices, CalendarZone, Clock};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { what: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidQuota { raw: String },
    InvalidOffset { raw: String },
    InvalidGrade { raw: String },
    InvalidValue { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { what } => write!(f, "missing {what}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidQuota { raw } => write!(f, "invalid --quota value: {raw}"),
            ArgsError::InvalidOffset { raw } => write!(f, "invalid --utc-offset value: {raw}"),
            ArgsError::InvalidGrade { raw } => write!(f, "unknown grade: {raw}"),
            ArgsError::InvalidValue { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
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
    eprintln!("  app [options] status");
    eprintln!("  app [options] study <grade> <sentence-id>...");
    eprintln!("  app [options] studied <grade>");
    eprintln!("  app [options] reset [<grade>]");
    eprintln!("  app [options] important [<sentence-id>]");
    eprintln!("  app [options] prefs [--speed slow|normal|fast] [--voice <n>] [--sound on|off] [--animations on|off]");
    eprintln!("  app [options] backup | backups | restore <backup-id>");
    eprintln!("  app [options] export | import <file>");
    eprintln!("  app [options] clear");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>       default sqlite://sentence-cards.sqlite3");
    eprintln!("  --catalog <json_file>   grade -> sentence ids");
    eprintln!("  --quota <bytes>         storage capacity ceiling");
    eprintln!("  --utc-offset <hours>    calendar zone for streaks (default: system local)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SENTENCE_DB_URL, SENTENCE_CATALOG, SENTENCE_QUOTA_BYTES, SENTENCE_UTC_OFFSET, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Status,
    Study { grade: Grade, ids: Vec<String> },
    Studied { grade: Grade },
    Reset { grade: Option<Grade> },
    Important { id: Option<String> },
    Prefs { draft: PrefsArgs },
    Backup,
    Backups,
    Restore { id: String },
    Export,
    Import { path: String },
    Clear,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PrefsArgs {
    speed: Option<AutoPlaySpeed>,
    voice: Option<u32>,
    sound: Option<bool>,
    animations: Option<bool>,
}

impl PrefsArgs {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn into_draft(self) -> UserPreferencesDraft {
        UserPreferencesDraft {
            auto_play_speed: self.speed,
            tts_voice_index: self.voice,
            sound_enabled: self.sound,
            animations_enabled: self.animations,
        }
    }
}

struct Args {
    db_url: String,
    catalog_path: Option<String>,
    quota_bytes: Option<usize>,
    zone: CalendarZone,
    command: Command,
}

fn parse_grade(raw: &str) -> Result<Grade, ArgsError> {
    Grade::parse(raw).map_err(|_| ArgsError::InvalidGrade {
        raw: raw.to_string(),
    })
}

fn parse_switch(raw: &str, flag: &'static str) -> Result<bool, ArgsError> {
    match raw {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(ArgsError::InvalidValue {
            flag,
            raw: raw.to_string(),
        }),
    }
}

fn parse_quota(raw: &str) -> Result<usize, ArgsError> {
    raw.trim().parse().map_err(|_| ArgsError::InvalidQuota {
        raw: raw.to_string(),
    })
}

fn parse_zone(raw: &str) -> Result<CalendarZone, ArgsError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .and_then(CalendarZone::east_hours)
        .ok_or_else(|| ArgsError::InvalidOffset {
            raw: raw.to_string(),
        })
}

impl Args {
    fn parse(argv: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("SENTENCE_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://sentence-cards.sqlite3".into(), normalize_sqlite_url);
        let mut catalog_path = std::env::var("SENTENCE_CATALOG").ok();
        let mut quota_bytes = match std::env::var("SENTENCE_QUOTA_BYTES") {
            Ok(raw) => Some(parse_quota(&raw)?),
            Err(_) => None,
        };
        let mut zone = match std::env::var("SENTENCE_UTC_OFFSET") {
            Ok(raw) => parse_zone(&raw)?,
            Err(_) => CalendarZone::Local,
        };

        let mut args = argv.into_iter();
        let mut positional = Vec::new();
        let mut prefs = PrefsArgs::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--catalog" => catalog_path = Some(require_value(&mut args, "--catalog")?),
                "--quota" => quota_bytes = Some(parse_quota(&require_value(&mut args, "--quota")?)?),
                "--utc-offset" => zone = parse_zone(&require_value(&mut args, "--utc-offset")?)?,
                "--speed" => {
                    let value = require_value(&mut args, "--speed")?;
                    prefs.speed = Some(AutoPlaySpeed::parse(&value).ok_or(
                        ArgsError::InvalidValue {
                            flag: "--speed",
                            raw: value.clone(),
                        },
                    )?);
                }
                "--voice" => {
                    let value = require_value(&mut args, "--voice")?;
                    prefs.voice = Some(value.parse().map_err(|_| ArgsError::InvalidValue {
                        flag: "--voice",
                        raw: value.clone(),
                    })?);
                }
                "--sound" => {
                    prefs.sound = Some(parse_switch(&require_value(&mut args, "--sound")?, "--sound")?);
                }
                "--animations" => {
                    prefs.animations = Some(parse_switch(
                        &require_value(&mut args, "--animations")?,
                        "--animations",
                    )?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let command = Self::parse_command(positional, prefs)?;
        Ok(Self {
            db_url,
            catalog_path,
            quota_bytes,
            zone,
            command,
        })
    }

    fn parse_command(positional: Vec<String>, prefs: PrefsArgs) -> Result<Command, ArgsError> {
        let mut words = positional.into_iter();
        let Some(name) = words.next() else {
            return Ok(Command::Status);
        };

        let command = match name.as_str() {
            "status" => Command::Status,
            "study" => {
                let grade = words.next().ok_or(ArgsError::MissingArgument { what: "grade" })?;
                let ids: Vec<String> = words.by_ref().collect();
                if ids.is_empty() {
                    return Err(ArgsError::MissingArgument { what: "sentence id" });
                }
                Command::Study {
                    grade: parse_grade(&grade)?,
                    ids,
                }
            }
            "studied" => {
                let grade = words.next().ok_or(ArgsError::MissingArgument { what: "grade" })?;
                Command::Studied {
                    grade: parse_grade(&grade)?,
                }
            }
            "reset" => Command::Reset {
                grade: words.next().as_deref().map(parse_grade).transpose()?,
            },
            "important" => Command::Important { id: words.next() },
            "prefs" => Command::Prefs { draft: prefs.clone() },
            "backup" => Command::Backup,
            "backups" => Command::Backups,
            "restore" => Command::Restore {
                id: words
                    .next()
                    .ok_or(ArgsError::MissingArgument { what: "backup id" })?,
            },
            "export" => Command::Export,
            "import" => Command::Import {
                path: words.next().ok_or(ArgsError::MissingArgument { what: "file" })?,
            },
            "clear" => Command::Clear,
            other => return Err(ArgsError::UnknownCommand(other.to_string())),
        };

        if let Some(extra) = words.next() {
            return Err(ArgsError::UnknownArg(extra));
        }
        if !prefs.is_empty() && !matches!(command, Command::Prefs { .. }) {
            return Err(ArgsError::UnknownArg("preference flags outside `prefs`".into()));
        }
        Ok(command)
    }
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

/// Read a `{ "<grade>": ["<sentence id>", ...] }` catalog file.
fn load_catalog(path: Option<&str>) -> Result<InMemoryCatalog, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        warn!("no sentence catalog configured, completion rates will be 0");
        return Ok(InMemoryCatalog::new());
    };

    let text = std::fs::read_to_string(path)?;
    let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(&text)?;

    let mut catalog = InMemoryCatalog::new();
    for (key, ids) in raw {
        let Ok(grade) = Grade::parse(&key) else {
            warn!(grade = %key, "skipping unknown grade in catalog");
            continue;
        };
        let ids = ids.iter().filter_map(|id| SentenceId::new(id).ok());
        catalog = catalog.with_sentences(grade, ids);
    }
    Ok(catalog)
}

async fn execute(services: &AppServices, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let progress = services.progress();
    match command {
        Command::Status => {
            let overall = progress.overall_progress();
            for (grade, p) in &overall.grade_progress {
                let last = p
                    .last_study_date
                    .map_or_else(|| "-".to_string(), |d| d.to_string());
                println!(
                    "{:<8} {:<14} {:>4}/{:<4} {:>3}%  last {}",
                    grade.as_str(),
                    grade.label(),
                    p.studied_sentences,
                    p.total_sentences,
                    p.completion_rate,
                    last
                );
            }
            println!(
                "overall  {}/{} ({}%)",
                overall.total_studied_sentences,
                overall.total_sentences,
                overall.overall_completion_rate
            );
            let streak = progress.streak_info();
            println!(
                "streak   current {} / longest {}",
                streak.current_streak, streak.longest_streak
            );
        }
        Command::Study { grade, ids } => {
            for id in &ids {
                progress.record_study_event(grade, id);
            }
            let p = progress.grade_progress(grade);
            println!(
                "{grade}: {}/{} studied ({}%), streak {}",
                p.studied_sentences,
                p.total_sentences,
                p.completion_rate,
                progress.current_streak()
            );
        }
        Command::Studied { grade } => {
            for id in progress.studied_sentence_ids(grade) {
                println!("{id}");
            }
        }
        Command::Reset { grade: Some(grade) } => {
            progress.reset_grade_progress(grade);
            println!("reset {grade}");
        }
        Command::Reset { grade: None } => {
            progress.reset_all_progress();
            println!("reset all progress");
        }
        Command::Important { id: Some(id) } => {
            let now = services.important().toggle(&id);
            println!("{id}: {}", if now { "important" } else { "not important" });
        }
        Command::Important { id: None } => {
            for id in services.important().list() {
                println!("{id}");
            }
        }
        Command::Prefs { draft } => {
            let prefs = if draft.is_empty() {
                services.preferences().preferences()
            } else {
                services.preferences().update(draft.into_draft())?
            };
            println!("{prefs:?}");
        }
        Command::Backup => match services.data().create_backup().await {
            Some(id) => println!("{id}"),
            None => return Err("backup could not be written".into()),
        },
        Command::Backups => {
            for backup in services.data().list_backups().await {
                println!(
                    "{}  {}  {} bytes",
                    backup.id,
                    backup.timestamp.to_rfc3339(),
                    backup.size_bytes
                );
            }
        }
        Command::Restore { id } => {
            if !services.data().restore_from_backup(&id).await {
                return Err(format!("could not restore backup {id}").into());
            }
            println!("restored {id}");
        }
        Command::Export => println!("{}", services.data().export_as_text().await),
        Command::Import { path } => {
            let text = std::fs::read_to_string(&path)?;
            if !services.data().import_from_text(&text).await {
                return Err(format!("{path} is not a valid export").into());
            }
            println!("imported {path}");
        }
        Command::Clear => {
            services.data().clear_all_data().await;
            println!("cleared all study data");
        }
    }

    services.flush().await;
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let catalog = Arc::new(load_catalog(parsed.catalog_path.as_deref())?);

    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(
        &parsed.db_url,
        parsed.quota_bytes,
        catalog,
        Clock::default_clock(),
        parsed.zone,
    )
    .await?;

    execute(&services, parsed.command).await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
