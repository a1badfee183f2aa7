//! Tandem CLI - the client side of the two-person vibe tracker
//!
//! Register, pair up with an invite code, submit a daily vibe (captured
//! offline when the store is unreachable), and read the shared 7-day
//! history. The offline queue lives on this device and is replayed with
//! `tandem queue sync`.

use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::aot::Generator;
use clap_complete::{generate, shells};
use serde::Serialize;
use thiserror::Error;

use tandem_core::db::Database;
use tandem_core::offline::OfflineQueue;
use tandem_core::services::{
    insight, AccountService, Insight, MoodEntry, PairingService, SubmitVibes,
    VibeAggregationService, VibeHistory, VibeSubmissionService,
};
use tandem_core::{RelationshipId, UserId, VibeId};

#[derive(Parser)]
#[command(name = "tandem")]
#[command(about = "Track daily vibes with your partner from the command line")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    db_path: Option<PathBuf>,

    /// Optional path to the offline queue file
    #[arg(long, global = true, value_name = "PATH")]
    queue_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new user account
    Register {
        /// Display name
        #[arg(long)]
        name: String,
        /// Contact email (unique)
        #[arg(long)]
        email: String,
    },
    /// Look up your user id by email
    ///
    /// The password is accepted but never verified; this build has no real
    /// authentication.
    Login {
        /// Account email
        #[arg(long)]
        email: String,
        /// Account password (ignored)
        #[arg(long, default_value = "")]
        password: String,
    },
    /// Create or join a relationship
    Pair {
        #[command(subcommand)]
        command: PairCommands,
    },
    /// Submit or review vibes
    Vibe {
        #[command(subcommand)]
        command: VibeCommands,
    },
    /// Inspect or replay the offline queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum PairCommands {
    /// Create a relationship and print the invite code to share
    Create {
        /// Your user id
        #[arg(long)]
        user: String,
    },
    /// Join a relationship with a shared invite code
    Join {
        /// Your user id
        #[arg(long)]
        user: String,
        /// Invite code from your partner
        #[arg(long)]
        code: String,
    },
}

#[derive(Subcommand)]
enum VibeCommands {
    /// Submit today's vibe
    Submit {
        /// Relationship id
        #[arg(long)]
        relationship: String,
        /// Your user id
        #[arg(long)]
        user: String,
        /// Mood score, 1 (low) to 5 (high)
        #[arg(long)]
        mood: i64,
        /// Optional note, at most 140 characters
        #[arg(long)]
        note: Option<String>,
        /// Capture offline instead of submitting now
        #[arg(long)]
        offline: bool,
    },
    /// Show the shared 7-day history and trend insight
    History {
        /// Relationship id
        #[arg(long)]
        relationship: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum QueueCommands {
    /// List vibes captured offline, in capture order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replay captured vibes against the store
    Sync,
    /// Drop every captured vibe
    Clear,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] tandem_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid user id: {0}")]
    InvalidUserId(String),
    #[error("Invalid relationship id: {0}")]
    InvalidRelationshipId(String),
}

impl CliError {
    /// Whether the failure is a transient store/IO problem
    ///
    /// Covers both transient core errors and IO failures raised before the
    /// store is even reached (an unopenable database path). Validation and
    /// conflict errors are never transient.
    const fn is_transient(&self) -> bool {
        match self {
            Self::Core(error) => error.is_transient(),
            Self::Io(_) => true,
            _ => false,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tandem=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let queue_path = resolve_queue_path(cli.queue_path);

    match cli.command {
        Commands::Register { name, email } => run_register(&name, &email, &db_path).await?,
        Commands::Login { email, password } => run_login(&email, &password, &db_path).await?,
        Commands::Pair { command } => match command {
            PairCommands::Create { user } => run_pair_create(&user, &db_path).await?,
            PairCommands::Join { user, code } => run_pair_join(&user, &code, &db_path).await?,
        },
        Commands::Vibe { command } => match command {
            VibeCommands::Submit {
                relationship,
                user,
                mood,
                note,
                offline,
            } => {
                run_submit(
                    &relationship,
                    &user,
                    mood,
                    note,
                    offline,
                    &db_path,
                    &queue_path,
                )
                .await?;
            }
            VibeCommands::History { relationship, json } => {
                run_history(&relationship, json, &db_path).await?;
            }
        },
        Commands::Queue { command } => match command {
            QueueCommands::List { json } => run_queue_list(json, &queue_path)?,
            QueueCommands::Sync => run_queue_sync(&db_path, &queue_path).await?,
            QueueCommands::Clear => run_queue_clear(&queue_path)?,
        },
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}

async fn run_register(name: &str, email: &str, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let user = AccountService::new(db.connection())
        .register(name, email)
        .await?;

    println!("{}", user.id);
    Ok(())
}

async fn run_login(email: &str, password: &str, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let session = AccountService::new(db.connection())
        .login(email, password)
        .await?;

    println!("{}", session.user_id);
    Ok(())
}

async fn run_pair_create(user: &str, db_path: &Path) -> Result<(), CliError> {
    let user_id = parse_user_id(user)?;
    let db = open_database(db_path).await?;
    let paired = PairingService::new(db.connection())
        .create_relationship(&user_id)
        .await?;

    println!("{}", paired.relationship_id);
    println!("Invite code: {}", paired.code);
    Ok(())
}

async fn run_pair_join(user: &str, code: &str, db_path: &Path) -> Result<(), CliError> {
    let user_id = parse_user_id(user)?;
    let db = open_database(db_path).await?;
    let relationship_id = PairingService::new(db.connection())
        .join_relationship(&user_id, code.trim())
        .await?;

    println!("{relationship_id}");
    Ok(())
}

async fn run_submit(
    relationship: &str,
    user: &str,
    mood: i64,
    note: Option<String>,
    offline: bool,
    db_path: &Path,
    queue_path: &Path,
) -> Result<(), CliError> {
    let relationship_id = parse_relationship_id(relationship)?;
    let user_id = parse_user_id(user)?;
    let queue = OfflineQueue::new(queue_path);

    if offline {
        let entry = queue.enqueue(relationship_id, user_id, mood, note)?;
        println!("Captured offline: {}", entry.id);
        return Ok(());
    }

    match submit_direct(&relationship_id, &user_id, mood, note.clone(), db_path).await {
        Ok(vibe_id) => println!("{vibe_id}"),
        // Only transient store failures fall back to offline capture;
        // validation and conflict errors surface immediately.
        Err(error) if error.is_transient() => {
            tracing::warn!(%error, "Store unreachable, capturing vibe offline");
            let entry = queue.enqueue(relationship_id, user_id, mood, note)?;
            println!("Store unreachable; captured offline: {}", entry.id);
        }
        Err(error) => return Err(error),
    }

    Ok(())
}

async fn submit_direct(
    relationship_id: &RelationshipId,
    user_id: &UserId,
    mood: i64,
    note: Option<String>,
    db_path: &Path,
) -> Result<VibeId, CliError> {
    let db = open_database(db_path).await?;
    let vibe_id = VibeSubmissionService::new(db.connection())
        .submit(relationship_id, user_id, mood, note)
        .await?;
    Ok(vibe_id)
}

#[derive(Debug, Serialize)]
struct HistoryOutput {
    history: VibeHistory,
    insight: Insight,
    message: &'static str,
}

async fn run_history(relationship: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let relationship_id = parse_relationship_id(relationship)?;
    let db = open_database(db_path).await?;
    let history = VibeAggregationService::new(db.connection())
        .history(&relationship_id)
        .await?;
    let trend = insight(&history.days);

    if as_json {
        let output = HistoryOutput {
            insight: trend,
            message: trend.message(),
            history,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for line in format_history_lines(&history) {
            println!("{line}");
        }
        println!();
        println!("{}", trend.message());
    }

    Ok(())
}

fn run_queue_list(as_json: bool, queue_path: &Path) -> Result<(), CliError> {
    let queue = OfflineQueue::new(queue_path);
    let pending = queue.list_pending()?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&pending)?);
    } else if pending.is_empty() {
        println!("Offline queue is empty");
    } else {
        for entry in pending {
            let note = entry.note.as_deref().unwrap_or("-");
            println!("{}  mood {}  {}", entry.id, entry.mood, note);
        }
    }

    Ok(())
}

async fn run_queue_sync(db_path: &Path, queue_path: &Path) -> Result<(), CliError> {
    let queue = OfflineQueue::new(queue_path);
    let db = open_database(db_path).await?;
    let submitter = VibeSubmissionService::new(db.connection());

    let report = queue.reconcile(&submitter).await?;
    if report.already_running {
        println!("Reconciliation already running");
    } else {
        println!(
            "Reconciled: {} submitted, {} still queued",
            report.submitted, report.remaining
        );
    }

    Ok(())
}

fn run_queue_clear(queue_path: &Path) -> Result<(), CliError> {
    OfflineQueue::new(queue_path).clear_all()?;
    println!("Offline queue cleared");
    Ok(())
}

fn run_completions(shell: CompletionShell, output_path: Option<&Path>) -> Result<(), CliError> {
    let mut command = Cli::command();
    let mut buffer = Vec::new();

    match shell {
        CompletionShell::Bash => generate_for_shell(shells::Bash, &mut command, &mut buffer),
        CompletionShell::Zsh => generate_for_shell(shells::Zsh, &mut command, &mut buffer),
        CompletionShell::Fish => generate_for_shell(shells::Fish, &mut command, &mut buffer),
    }

    if let Some(path) = output_path {
        std::fs::write(path, &buffer)?;
        println!("{}", path.display());
    } else {
        io::stdout().write_all(&buffer)?;
    }

    Ok(())
}

fn generate_for_shell<G: Generator>(
    generator: G,
    command: &mut clap::Command,
    buffer: &mut Vec<u8>,
) {
    generate(generator, command, "tandem", buffer);
}

fn format_history_lines(history: &VibeHistory) -> Vec<String> {
    let name_a = history
        .users
        .first()
        .map_or("user A", |user| user.name.as_str());
    let name_b = history
        .users
        .get(1)
        .map_or("user B", |user| user.name.as_str());

    let mut lines = vec![format!("{:<12}  {:<24}  {:<24}", "date", name_a, name_b)];
    for day in &history.days {
        lines.push(format!(
            "{:<12}  {:<24}  {:<24}",
            day.date.to_string(),
            format_entry(day.user_a.as_ref()),
            format_entry(day.user_b.as_ref()),
        ));
    }
    lines
}

fn format_entry(entry: Option<&MoodEntry>) -> String {
    entry.map_or_else(
        || "no vibe yet".to_string(),
        |entry| match &entry.note {
            Some(note) => format!("{} {}", mood_stars(entry.mood), note),
            None => mood_stars(entry.mood),
        },
    )
}

fn mood_stars(mood: i64) -> String {
    let filled = usize::try_from(mood.clamp(0, 5)).unwrap_or(0);
    format!("{}{}", "*".repeat(filled), ".".repeat(5 - filled))
}

fn parse_user_id(raw: &str) -> Result<UserId, CliError> {
    raw.trim()
        .parse()
        .map_err(|_| CliError::InvalidUserId(raw.to_string()))
}

fn parse_relationship_id(raw: &str) -> Result<RelationshipId, CliError> {
    raw.trim()
        .parse()
        .map_err(|_| CliError::InvalidRelationshipId(raw.to_string()))
}

fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("TANDEM_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tandem")
        .join("tandem.db")
}

fn resolve_queue_path(cli_queue_path: Option<PathBuf>) -> PathBuf {
    cli_queue_path
        .or_else(|| env::var_os("TANDEM_QUEUE_PATH").map(PathBuf::from))
        .unwrap_or_else(default_queue_path)
}

fn default_queue_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tandem")
        .join("offline-vibes.json")
}

async fn open_database(path: &Path) -> Result<Database, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Database::open(path).await?)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tandem_core::services::{AccountService, PairingService};
    use tempfile::{tempdir, TempDir};

    use super::{
        format_entry, format_history_lines, mood_stars, open_database, parse_relationship_id,
        parse_user_id, resolve_db_path, run_completions, run_queue_sync, run_submit, CliError,
        CompletionShell, MoodEntry, OfflineQueue, RelationshipId, UserId, VibeAggregationService,
    };

    struct TestPaths {
        _dir: TempDir,
        db: PathBuf,
        queue: PathBuf,
    }

    fn test_paths() -> TestPaths {
        let dir = tempdir().unwrap();
        let db = dir.path().join("tandem.db");
        let queue = dir.path().join("offline-vibes.json");
        TestPaths {
            _dir: dir,
            db,
            queue,
        }
    }

    async fn paired_fixture(paths: &TestPaths) -> (String, String) {
        let db = open_database(&paths.db).await.unwrap();
        let user = AccountService::new(db.connection())
            .register("Test", "cli@example.com")
            .await
            .unwrap();
        let paired = PairingService::new(db.connection())
            .create_relationship(&user.id)
            .await
            .unwrap();
        (paired.relationship_id.to_string(), user.id.to_string())
    }

    #[test]
    fn parse_ids_reject_garbage() {
        assert!(matches!(
            parse_user_id("not-a-uuid"),
            Err(CliError::InvalidUserId(_))
        ));
        assert!(matches!(
            parse_relationship_id(""),
            Err(CliError::InvalidRelationshipId(_))
        ));
        assert!(parse_user_id(" 018f6b2a-1111-7111-8111-111111111111 ").is_ok());
    }

    #[test]
    fn resolve_db_path_prefers_cli_flag() {
        let flag = PathBuf::from("/tmp/explicit.db");
        assert_eq!(resolve_db_path(Some(flag.clone())), flag);
    }

    #[test]
    fn mood_stars_renders_range() {
        assert_eq!(mood_stars(1), "*....");
        assert_eq!(mood_stars(5), "*****");
    }

    #[test]
    fn format_entry_handles_missing_submission() {
        assert_eq!(format_entry(None), "no vibe yet");
        let entry = MoodEntry {
            mood: 3,
            note: Some("fine".to_string()),
        };
        assert_eq!(format_entry(Some(&entry)), "***.. fine");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn submit_then_history_renders_seven_rows() {
        let paths = test_paths();
        let (relationship, user) = paired_fixture(&paths).await;

        run_submit(
            &relationship,
            &user,
            4,
            Some("good".to_string()),
            false,
            &paths.db,
            &paths.queue,
        )
        .await
        .unwrap();

        let db = open_database(&paths.db).await.unwrap();
        let history = VibeAggregationService::new(db.connection())
            .history(&relationship.parse().unwrap())
            .await
            .unwrap();

        let lines = format_history_lines(&history);
        // Header plus one row per history day
        assert_eq!(lines.len(), 8);
        assert!(lines[1].contains("good"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_capture_then_sync_round_trip() {
        let paths = test_paths();
        let (relationship, user) = paired_fixture(&paths).await;

        run_submit(
            &relationship,
            &user,
            2,
            None,
            true,
            &paths.db,
            &paths.queue,
        )
        .await
        .unwrap();

        let queue = OfflineQueue::new(&paths.queue);
        assert_eq!(queue.list_pending().unwrap().len(), 1);

        run_queue_sync(&paths.db, &paths.queue).await.unwrap();
        assert!(queue.list_pending().unwrap().is_empty());

        let db = open_database(&paths.db).await.unwrap();
        let history = VibeAggregationService::new(db.connection())
            .history(&relationship.parse().unwrap())
            .await
            .unwrap();
        assert_eq!(history.days[0].user_a.as_ref().unwrap().mood, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_store_falls_back_to_offline_capture() {
        let dir = tempdir().unwrap();

        // A regular file where the database directory should be makes the
        // open fail with an IO error before the store is ever reached.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let db = blocker.join("tandem.db");
        let queue = dir.path().join("offline-vibes.json");

        run_submit(
            &RelationshipId::new().to_string(),
            &UserId::new().to_string(),
            3,
            Some("from the road".to_string()),
            false,
            &db,
            &queue,
        )
        .await
        .unwrap();

        let pending = OfflineQueue::new(&queue).list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].mood, 3);
        assert_eq!(pending[0].note.as_deref(), Some("from the road"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn same_day_resubmission_surfaces_conflict() {
        let paths = test_paths();
        let (relationship, user) = paired_fixture(&paths).await;

        run_submit(&relationship, &user, 3, None, false, &paths.db, &paths.queue)
            .await
            .unwrap();

        let error = run_submit(&relationship, &user, 5, None, false, &paths.db, &paths.queue)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            CliError::Core(tandem_core::Error::DuplicateSubmission { .. })
        ));

        // The conflict must not leak into the offline queue
        assert!(OfflineQueue::new(&paths.queue)
            .list_pending()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn run_completions_writes_bash_script_file() {
        let dir = tempdir().unwrap();
        let output_path = dir.path().join("tandem.bash");

        run_completions(CompletionShell::Bash, Some(&output_path)).unwrap();

        let script = std::fs::read_to_string(&output_path).unwrap();
        assert!(script.contains("_tandem()"));
        assert!(script.contains("complete -F _tandem"));
    }
}
