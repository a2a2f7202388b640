use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kb::config::ensure_database_directory;
use kb::{
    Config, DEFAULT_CATEGORY, Database, Note, NoteId, NoteStore, SUGGESTED_CATEGORIES,
    is_suggested_category,
};
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::EnvFilter;

/// kb - personal knowledge base with full-text search
#[derive(Parser)]
#[command(name = "kb")]
#[command(about = "A personal note store with stemmed full-text search")]
#[command(version)]
struct Cli {
    /// Database file (overrides KB_DB_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Add a new note
    Add(AddCommand),
    /// Edit an existing note; omitted fields keep their current value, empty ones are cleared
    Edit(EditCommand),
    /// Delete a note
    Rm {
        /// Id of the note to delete
        id: i64,
    },
    /// Show one note
    Show {
        /// Id of the note to show
        id: i64,
    },
    /// List notes, newest first
    List(ListCommand),
    /// Full-text search over titles and content
    Search {
        /// Query; stemmed, all terms must match. Quotes, OR, NOT, NEAR and prefix* are supported
        query: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// List every tag in use
    Tags,
    /// Export all notes to a JSON file
    Export {
        /// Destination file
        file: PathBuf,
    },
    /// Verify that the search index matches the stored notes
    Check {
        /// Rebuild the index when drift is found
        #[arg(long)]
        repair: bool,
    },
}

/// Add a new note
#[derive(Args)]
struct AddCommand {
    /// The title of the note
    #[arg(value_name = "TITLE")]
    title: String,

    /// Markdown body
    #[arg(short, long)]
    content: Option<String>,

    /// Comma-separated tags to apply to the note
    #[arg(short, long, value_name = "TAGS")]
    tags: Option<String>,

    /// Category label
    #[arg(long, default_value = DEFAULT_CATEGORY)]
    category: String,
}

/// Edit an existing note
#[derive(Args)]
struct EditCommand {
    /// Id of the note to edit
    id: i64,

    /// New title
    #[arg(long)]
    title: Option<String>,

    /// New markdown body (pass "" to clear it)
    #[arg(short, long)]
    content: Option<String>,

    /// New comma-separated tags (pass "" to clear them)
    #[arg(short, long, value_name = "TAGS")]
    tags: Option<String>,

    /// New category label (pass "" to clear it)
    #[arg(long)]
    category: Option<String>,
}

/// List notes
#[derive(Args)]
struct ListCommand {
    /// Only notes carrying this exact tag
    #[arg(short, long, conflicts_with = "category")]
    tag: Option<String>,

    /// Only notes in this exact category
    #[arg(long)]
    category: Option<String>,
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let result = run(cli);

    if let Err(e) = result {
        // Determine exit code based on error type
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(path) = cli.db {
        config.db_path = path;
    }
    init_tracing(&config, cli.verbose);

    ensure_database_directory(&config.db_path)?;
    let db = Database::open(&config.db_path).context("Failed to open database")?;
    let mut store = NoteStore::new(db);

    let stdout = std::io::stdout();
    execute(&cli.command, &mut store, &mut stdout.lock())
}

fn init_tracing(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(&config.log_filter)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are validation failures, unknown ids and bad queries.
/// Everything else (database, I/O) is internal.
fn is_user_error(error: &anyhow::Error) -> bool {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<kb::Error>())
        .is_some_and(kb::Error::is_user_error)
}

/// Executes one command against the store, writing human-readable output.
///
/// Separated from `run` to allow testing with in-memory databases.
fn execute(command: &Commands, store: &mut NoteStore, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Add(cmd) => {
            let id = store.add(
                &cmd.title,
                cmd.content.as_deref(),
                cmd.tags.as_deref(),
                Some(cmd.category.as_str()),
            )?;
            writeln!(out, "Note created (id: {id})")?;
            if !is_suggested_category(&cmd.category) {
                writeln!(
                    out,
                    "Custom category '{}' (suggested: {})",
                    cmd.category,
                    SUGGESTED_CATEGORIES.join(", ")
                )?;
            }
        }
        Commands::Edit(cmd) => {
            let id = NoteId::new(cmd.id);
            let current = require_note(store, id)?;
            store.update(
                id,
                cmd.title.as_deref().unwrap_or(&current.title),
                edited(cmd.content.as_deref(), current.content.as_deref()),
                edited(cmd.tags.as_deref(), current.tags.as_deref()),
                edited(cmd.category.as_deref(), current.category.as_deref()),
            )?;
            writeln!(out, "Note updated (id: {id})")?;
        }
        Commands::Rm { id } => {
            let id = NoteId::new(*id);
            store.delete(id)?;
            writeln!(out, "Note deleted (id: {id})")?;
        }
        Commands::Show { id } => {
            let note = require_note(store, NoteId::new(*id))?;
            write_note_detail(out, &note)?;
        }
        Commands::List(cmd) => {
            let notes = match (&cmd.tag, &cmd.category) {
                (Some(tag), _) => store.filter_by_tag(tag)?,
                (None, Some(category)) => store.list_by_category(category)?,
                (None, None) => store.list_all()?,
            };
            write_note_lines(out, &notes)?;
        }
        Commands::Search { query, limit } => {
            let results = store.search_ranked(query, *limit)?;
            if results.is_empty() {
                writeln!(out, "No notes match '{query}'")?;
            }
            for result in &results {
                writeln!(out, "{}", format_note_line(&result.note))?;
            }
        }
        Commands::Tags => {
            for tag in store.list_tags()? {
                writeln!(out, "{tag}")?;
            }
        }
        Commands::Export { file } => {
            let notes = store.list_all()?;
            let json = serde_json::to_string_pretty(&notes)?;
            std::fs::write(file, json)
                .with_context(|| format!("Failed to write export file: {}", file.display()))?;
            writeln!(out, "Exported {} notes to {}", notes.len(), file.display())?;
        }
        Commands::Check { repair } => {
            let report = store.check_sync()?;
            if report.is_consistent() {
                writeln!(out, "Index is in sync ({} notes)", store.count()?)?;
            } else {
                writeln!(
                    out,
                    "Index drift: {} notes missing from index, {} orphaned index entries",
                    report.missing_from_index.len(),
                    report.orphaned_in_index.len()
                )?;
                if *repair {
                    let written = store.rebuild_index()?;
                    writeln!(out, "Index rebuilt ({written} entries)")?;
                }
            }
        }
    }

    Ok(())
}

fn require_note(store: &NoteStore, id: NoteId) -> Result<Note> {
    let note = store.get(id)?.ok_or(kb::Error::NotFound(id))?;
    Ok(note)
}

fn write_note_lines(out: &mut impl Write, notes: &[Note]) -> Result<()> {
    if notes.is_empty() {
        writeln!(out, "No notes")?;
    }
    for note in notes {
        writeln!(out, "{}", format_note_line(note))?;
    }
    Ok(())
}

/// One-line summary: id, title, then category and tags when present.
/// Value for an optional field after `edit`: omitted keeps, empty clears.
fn edited<'a>(new: Option<&'a str>, current: Option<&'a str>) -> Option<&'a str> {
    match new {
        Some("") => None,
        Some(value) => Some(value),
        None => current,
    }
}

fn format_note_line(note: &Note) -> String {
    let mut line = format!("{:>4}  {}", note.id, note.title);
    if let Some(category) = note.category.as_deref().filter(|c| !c.is_empty()) {
        line.push_str(&format!("  ({category})"));
    }
    let tags = note.tag_list();
    if !tags.is_empty() {
        line.push_str(&format!("  [{}]", tags.join(", ")));
    }
    line
}

fn write_note_detail(out: &mut impl Write, note: &Note) -> Result<()> {
    writeln!(out, "# {}", note.title)?;
    writeln!(out, "id:       {}", note.id)?;
    writeln!(out, "created:  {}", note.created_at.format(&Rfc3339)?)?;
    if let Some(category) = &note.category {
        writeln!(out, "category: {category}")?;
    }
    let tags = note.tag_list();
    if !tags.is_empty() {
        writeln!(out, "tags:     {}", tags.join(", "))?;
    }
    if let Some(content) = &note.content {
        writeln!(out)?;
        writeln!(out, "{content}")?;
    }
    Ok(())
}
