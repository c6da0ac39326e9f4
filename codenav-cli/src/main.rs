//! Codenav CLI - Answer code-navigation lookups for one request

mod request;

use clap::{Parser, Subcommand};
use codenav_core::{Position, Range, RepositoryCommit, RequestState, Upload};
use colored::Colorize;
use request::RequestOptions;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "codenav")]
#[command(about = "Per-request upload, position and commit lookups", long_about = None)]
struct Cli {
    /// Repository working tree
    #[arg(long, global = true, default_value = ".")]
    root: std::path::PathBuf,

    /// JSON file with the uploads visible to the request
    #[arg(long, global = true, env = "CODENAV_UPLOADS")]
    uploads: Option<std::path::PathBuf>,

    /// Config file (TOML)
    #[arg(long, global = true, env = "CODENAV_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Repository id used by uploads and commit lookups
    #[arg(long, global = true, default_value_t = 1)]
    repo_id: i32,

    /// Repository name (defaults to the root directory name)
    #[arg(long, global = true)]
    repo_name: Option<String>,

    /// Commit the request is made at (defaults to HEAD)
    #[arg(long, global = true)]
    commit: Option<String>,

    /// Repo-relative path the request is made for
    #[arg(long, global = true, default_value = "")]
    path: String,

    /// Override maximum upload ids per moniker search
    #[arg(long, global = true)]
    max_indexes: Option<usize>,

    /// Override number of diffs retained for translation
    #[arg(long, global = true)]
    hunk_cache_size: Option<usize>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List uploads in store order
    Uploads,

    /// Show the upload at a position in store order
    At {
        index: usize,
    },

    /// Show the upload with an id
    Lookup {
        id: i32,
    },

    /// Translate a position from another commit to the request commit
    Translate {
        /// Commit the position was recorded at
        from: String,
        /// Zero-indexed line
        line: u32,
        /// Zero-indexed character
        #[arg(default_value_t = 0)]
        character: u32,
        /// Translate from the request commit to `from` instead
        #[arg(long)]
        reverse: bool,
        /// Translate in a different file than --path
        #[arg(long)]
        file: Option<String>,
    },

    /// Check whether commits exist in the repository
    Resolvable {
        commits: Vec<String>,
    },

    /// Check whether one commit is an ancestor of another
    Ancestor {
        ancestor: String,
        descendant: String,
    },

    /// Split upload ids into moniker search batches (all uploads if omitted)
    Batches {
        ids: Vec<i32>,
    },
}

fn main() {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    let options = RequestOptions {
        root: cli.root,
        uploads: cli.uploads,
        config: cli.config,
        repo_id: cli.repo_id,
        repo_name: cli.repo_name,
        commit: cli.commit,
        path: cli.path,
        max_indexes: cli.max_indexes,
        hunk_cache_size: cli.hunk_cache_size,
    };

    let result = request::build(options).and_then(|state| run(&state, cli.command, json));

    if let Err(e) = result {
        if json {
            let envelope = e.envelope();
            match serde_json::to_string_pretty(&envelope) {
                Ok(body) => eprintln!("{}", body),
                Err(_) => eprintln!("Error: {}", e),
            }
        } else {
            eprintln!("{}: {}", "Error".red(), e);
        }
        std::process::exit(1);
    }
}

fn run(state: &RequestState, command: Commands, json: bool) -> codenav_core::Result<()> {
    match command {
        Commands::Uploads => cmd_uploads(state, json),
        Commands::At { index } => print_upload(state.get_cache_uploads_at_index(index), json),
        Commands::Lookup { id } => print_upload(state.get_upload_from_cache_map(id), json),
        Commands::Translate {
            from,
            line,
            character,
            reverse,
            file,
        } => cmd_translate(state, &from, Position::new(line, character), reverse, file, json),
        Commands::Resolvable { commits } => cmd_resolvable(state, &commits, json),
        Commands::Ancestor {
            ancestor,
            descendant,
        } => cmd_ancestor(state, &ancestor, &descendant, json),
        Commands::Batches { ids } => cmd_batches(state, ids, json),
    }
}

fn cmd_uploads(state: &RequestState, json: bool) -> codenav_core::Result<()> {
    let uploads = state.get_cache_uploads();
    if json {
        println!("{}", serde_json::to_string_pretty(uploads.as_slice())?);
        return Ok(());
    }

    let path = &state.args().path;
    for upload in uploads.iter() {
        let readable = state
            .auth_checker()
            .can_read(&upload.repository_name, upload.root.trim_end_matches('/'));
        let marker = if !readable {
            "hidden".red()
        } else if upload.covers_path(path) {
            "covers".green()
        } else {
            "other".normal()
        };
        println!(
            "{} {:>6}  {}  {}  {}@{}  [{}]",
            marker,
            upload.id,
            short(&upload.commit),
            display_root(&upload.root),
            upload.indexer,
            upload.indexer_version,
            upload.state
        );
    }
    println!("{}: {} uploads", "Total".blue(), uploads.len());
    Ok(())
}

fn print_upload(upload: Option<Upload>, json: bool) -> codenav_core::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&upload)?);
        return Ok(());
    }

    match upload {
        Some(upload) => {
            println!("{}: {}", "Upload".green(), upload.id);
            println!("  commit:     {}", upload.commit);
            println!("  root:       {}", display_root(&upload.root));
            println!("  indexer:    {} {}", upload.indexer, upload.indexer_version);
            println!("  state:      {}", upload.state);
            println!("  repository: {} ({})", upload.repository_name, upload.repository_id);
            println!("  visible:    {}", upload.visible_at_tip);
            if let Some(message) = &upload.failure_message {
                println!("  failure:    {}", message);
            }
            if let Some(index_id) = upload.associated_index_id {
                println!("  index job:  {}", index_id);
            }
        }
        None => println!("{}", "Not found".yellow()),
    }
    Ok(())
}

fn cmd_translate(
    state: &RequestState,
    from: &str,
    position: Position,
    reverse: bool,
    file: Option<String>,
    json: bool,
) -> codenav_core::Result<()> {
    let translator = state.git_tree_translator();
    let translated = match file {
        Some(file) => translator
            .get_target_commit_range_from_source_range(
                from,
                &file,
                Range {
                    start: position,
                    end: position,
                },
                reverse,
            )?
            .map(|range| range.start),
        None => {
            translator.get_target_commit_position_from_source_position(from, position, reverse)?
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&translated)?);
        return Ok(());
    }

    match translated {
        Some(p) => println!(
            "{}: {}:{} -> {}:{}",
            "Translated".green(),
            position.line,
            position.character,
            p.line,
            p.character
        ),
        None => println!("{}: line changed between commits", "Untranslatable".yellow()),
    }
    Ok(())
}

fn cmd_resolvable(
    state: &RequestState,
    commits: &[String],
    json: bool,
) -> codenav_core::Result<()> {
    let repository_id = state.args().repo.id;
    let batch: Vec<RepositoryCommit> = commits
        .iter()
        .map(|c| RepositoryCommit::new(repository_id, c.as_str()))
        .collect();
    let answers = state.commit_cache().are_commits_resolvable(&batch)?;

    if json {
        let body: Vec<_> = commits
            .iter()
            .zip(&answers)
            .map(|(commit, exists)| serde_json::json!({ "commit": commit, "exists": exists }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    for (commit, exists) in commits.iter().zip(answers) {
        let label = if exists { "exists".green() } else { "missing".red() };
        println!("{} {}", label, commit);
    }
    Ok(())
}

fn cmd_ancestor(
    state: &RequestState,
    ancestor: &str,
    descendant: &str,
    json: bool,
) -> codenav_core::Result<()> {
    let answer = state
        .commit_cache()
        .is_ancestor(state.args().repo.id, ancestor, descendant)?;

    if json {
        println!("{}", serde_json::json!({ "is_ancestor": answer }));
    } else if answer {
        println!("{} is an ancestor of {}", short(ancestor).green(), short(descendant));
    } else {
        println!("{} is not an ancestor of {}", short(ancestor).yellow(), short(descendant));
    }
    Ok(())
}

fn cmd_batches(state: &RequestState, ids: Vec<i32>, json: bool) -> codenav_core::Result<()> {
    let ids = if ids.is_empty() {
        state.get_cache_uploads().iter().map(|u| u.id).collect()
    } else {
        ids
    };
    let batches = state.moniker_search_batches(&ids);

    if json {
        println!("{}", serde_json::to_string_pretty(&batches)?);
        return Ok(());
    }

    println!(
        "{}: {} batches (max {} ids each)",
        "Moniker search".blue(),
        batches.len(),
        state.maximum_indexes_per_moniker_search()
    );
    for (i, batch) in batches.iter().enumerate() {
        let ids: Vec<String> = batch.iter().map(|id| id.to_string()).collect();
        println!("  {}: {}", i, ids.join(", "));
    }
    Ok(())
}

fn short(commit: &str) -> &str {
    commit.get(..12).unwrap_or(commit)
}

fn display_root(root: &str) -> &str {
    if root.is_empty() {
        "/"
    } else {
        root
    }
}
