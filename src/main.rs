use std::io;
use std::path::{Path, PathBuf};
use std::process;

use clap::{CommandFactory, Parser};
use clap_complete::Shell;

use scriptmark::config::Config;
use scriptmark::engine::Engine;
use scriptmark::error::ScriptmarkError;
use scriptmark::host::FsHost;
use scriptmark::types::{Location, Position};

/// scriptmark: go-to-definition, member completion and find-references for
/// script embedded in markup pages and for standalone script files.
#[derive(Parser)]
#[command(name = "scriptmark", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Workspace folder. Repeat for multi-root workspaces.
    #[arg(long = "root", value_name = "DIR", default_value = ".", global = true)]
    roots: Vec<PathBuf>,

    /// Machine-readable JSON output.
    #[arg(long, global = true)]
    json: bool,

    /// Files looked up concurrently per batch (overrides scriptmark.toml).
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Cap on enumerated workspace files (overrides scriptmark.toml).
    #[arg(long = "max-files", global = true)]
    max_files: Option<usize>,

    /// Run as a JSON-RPC server on stdio.
    #[arg(long)]
    serve: bool,

    /// Debug logging on stderr. SCRIPTMARK_LOG overrides.
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Print shell completions for the given shell.
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

/// Positions are zero-based; columns count UTF-16 code units.
#[derive(clap::Subcommand)]
enum Command {
    /// Where the identifier at the position is declared.
    Definition(QueryArgs),
    /// Members offered after `object.` at the position.
    Complete(QueryArgs),
    /// Usages of the identifier at the position in markup script regions.
    References(QueryArgs),
}

#[derive(clap::Args)]
struct QueryArgs {
    file: PathBuf,
    line: u32,
    column: u32,
}

fn main() {
    let cli = Cli::parse();
    scriptmark::logging::init(cli.verbose);

    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "scriptmark", &mut io::stdout());
        return;
    }

    let engine = match build_engine(&cli) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("{e}");
            process::exit(e.exit_code());
        }
    };

    if cli.serve {
        if let Err(e) = scriptmark::server::run(&engine) {
            eprintln!("server error: {e}");
            process::exit(1);
        }
        return;
    }

    let Some(command) = cli.command else {
        eprintln!("usage: scriptmark <definition|complete|references> <FILE> <LINE> <COLUMN>");
        process::exit(3);
    };

    if let Err(e) = run_query(&engine, &command, cli.json) {
        eprintln!("{e}");
        process::exit(e.exit_code());
    }
}

fn build_engine(cli: &Cli) -> Result<Engine<FsHost>, ScriptmarkError> {
    let roots: Vec<PathBuf> = cli
        .roots
        .iter()
        .map(|r| r.canonicalize().map_err(|e| ScriptmarkError::io(r, e)))
        .collect::<Result<_, _>>()?;

    let mut config = match roots.first() {
        Some(root) => Config::load(root)?,
        None => Config::default(),
    };
    if let Some(n) = cli.batch_size {
        if n == 0 {
            return Err(ScriptmarkError::InvalidQuery {
                query: "--batch-size".into(),
                reason: "must be at least 1".into(),
            });
        }
        config.batch_size = n;
    }
    if let Some(n) = cli.max_files {
        config.max_workspace_files = n;
    }

    Ok(Engine::new(FsHost::new(roots), config))
}

fn run_query(
    engine: &Engine<FsHost>,
    command: &Command,
    json: bool,
) -> Result<(), ScriptmarkError> {
    let (Command::Definition(args) | Command::Complete(args) | Command::References(args)) =
        command;
    let path = resolve_file(&args.file)?;
    let document = engine.document(&path)?;
    let position = Position::new(args.line, args.column);

    match command {
        Command::Definition(_) => {
            print_locations(&engine.provide_definition(&document, position), json);
        }
        Command::References(_) => {
            print_locations(&engine.provide_references(&document, position), json);
        }
        Command::Complete(_) => {
            let items = engine.provide_completion_items(&document, position);
            if json {
                print_json(&items);
            } else {
                for item in &items {
                    println!(
                        "{}\t{}\t{}",
                        item.label,
                        item.detail,
                        format_location(&item.location)
                    );
                }
            }
        }
    }
    Ok(())
}

fn resolve_file(file: &Path) -> Result<PathBuf, ScriptmarkError> {
    file.canonicalize().map_err(|e| ScriptmarkError::io(file, e))
}

fn print_locations(locations: &[Location], json: bool) {
    if json {
        print_json(&locations);
    } else {
        for l in locations {
            println!("{}", format_location(l));
        }
    }
}

fn format_location(l: &Location) -> String {
    format!("{}:{}:{}", l.path.display(), l.line, l.column)
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => {
            eprintln!("json error: {e}");
            process::exit(1);
        }
    }
}
