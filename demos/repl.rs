use std::path::PathBuf;
use std::sync::atomic::{self, AtomicBool};
use std::sync::Arc;
use std::time::Instant;

use riblog::solver::{QueryError, SolverConfig};
use riblog::textual::{LoadError, TextualUniverse};
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Editor, Helper};

const HEADER: &str = "
#====================#
# Riblog REPL v0.1.0 #
#====================#
";

fn main() {
    // install global collector configured based on RUST_LOG env var.
    tracing_subscriber::fmt::init();

    println!("{}", HEADER);

    let mut rl = Editor::<AppState, DefaultHistory>::new().expect("Failed to initialize REPL");

    // ================= SETUP HISTORY ========================
    let history_path = get_history_path();
    if let Some(history_path) = history_path.as_ref() {
        match rl.load_history(history_path.as_path()) {
            Ok(()) => tracing::debug!("History loaded"),
            Err(ReadlineError::Io(ioerr)) if ioerr.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No previous history")
            }
            Err(err) => tracing::error!("Failed to load history: {}", err),
        }
    }

    // ================= CTRL-C HANDLING ========================

    // rustyline also handles Ctrl-C, but only during prompts. For cancelling long running
    // evaluations, we need our own handling.
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_in_handler = interrupted.clone();
    if let Err(err) =
        ctrlc::set_handler(move || interrupted_in_handler.store(true, atomic::Ordering::SeqCst))
    {
        tracing::error!(
            "Could not install Ctrl-C handler, evaluations cannot be interrupted: {}",
            err
        );
    }

    // ================= INITIALIZE STATE ========================

    rl.set_helper(Some(AppState::new(interrupted)));

    // ================= ACTUAL REPL ========================

    loop {
        match rl.readline("?- ") {
            Ok(line) => {
                rl.add_history_entry(&line).expect("Couldn't add history");
                dispatch(rl.helper_mut().expect("helper is set"), line.trim())
            }
            Err(ReadlineError::Interrupted) => {
                // Intentionally silenced to prevent accidentally closing the REPL due to poor
                // timing, because Ctrl-C is also used for interrupting computations.
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                tracing::error!("readline: {}", err);
                break;
            }
        }
    }

    // ================= CLEANUP ========================

    if let Some(history_path) = history_path.as_ref() {
        if let Err(err) = rl.save_history(history_path) {
            tracing::error!("Failed to save history: {}", err);
        } else {
            tracing::debug!("History saved");
        }
    }
}

struct AppState {
    universe: TextualUniverse,
    config: SolverConfig,
    interrupted: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(interrupted: Arc<AtomicBool>) -> Self {
        Self {
            universe: TextualUniverse::new(),
            config: SolverConfig::new().with_interrupt(interrupted.clone()),
            interrupted,
        }
    }
}

impl Helper for AppState {}
impl Validator for AppState {}
impl Highlighter for AppState {}
impl Hinter for AppState {
    type Hint = String;
}
impl Completer for AppState {
    type Candidate = String;
}

fn dispatch(state: &mut AppState, line: &str) {
    if line.is_empty() {
        return;
    }
    if line.starts_with(':') {
        let (command, args) = line.split_once(' ').unwrap_or((line, ""));
        for cmd in COMMANDS {
            if command == cmd.name {
                return (cmd.run)(state, args.trim());
            }
        }
        println!("No such command: {}", command);
    } else {
        query(state, line);
    }
}

fn query(state: &mut AppState, args: &str) {
    state.interrupted.store(false, atomic::Ordering::SeqCst);
    let query = match state.universe.prepare_query(args) {
        Ok(query) => query,
        Err(err) => {
            let (line, col) = err.line_col(args);
            println!("Failed to parse: {} (line {}, column {})", err.kind, line, col);
            return;
        }
    };

    let pretty = state.universe.pretty();
    let result = state.universe.universe.evaluate_query_with(
        &state.config,
        &query,
        |solution| {
            println!("Found solution:");
            for (index, var) in solution.values().into_iter().enumerate() {
                match solution.name(index) {
                    Some(name) => print!("  {} = ", name),
                    None => print!("  _{} = ", index),
                }
                match var {
                    Some(term) => println!("{}", pretty.term_to_string(&term, None)),
                    None => println!("<any>"),
                }
            }
            // keep going to list every solution
            false
        },
        || println!("No more solutions."),
    );
    match result {
        Ok(_) => {}
        Err(QueryError::Interrupted) => println!("Interrupted!"),
        Err(err) => println!("Query aborted: {}", err),
    }
}

fn report_load(result: Result<(), LoadError>, success: &str) {
    match result {
        Ok(()) => println!("{}", success),
        Err(LoadError::Query(QueryError::Interrupted)) => println!("Interrupted!"),
        Err(err) => println!("Failed to load: {}", err),
    }
}

static COMMANDS: &[Command] = &[
    Command {
        name: ":define",
        args: "<source>",
        help: "Insert definitions from the literal source text.",
        run: &|state, args| {
            if args.is_empty() {
                println!("Usage:\n\t:define <source>");
                return;
            }
            report_load(state.universe.load_str(args), "Defined!");
        },
    },
    Command {
        name: ":depth",
        args: "[<limit>]",
        help: "Limit the number of nested rule invocations, or lift the limit.",
        run: &|state, args| {
            if args.is_empty() {
                state.config.max_depth = None;
                println!("Depth limit lifted.");
                return;
            }
            match args.parse::<usize>() {
                Ok(limit) => {
                    state.config.max_depth = Some(limit);
                    println!("Depth limit set to {}.", limit);
                }
                Err(err) => println!("Invalid limit {:?}: {}", args, err),
            }
        },
    },
    Command {
        name: ":help",
        args: "",
        help: "Show this help message.",
        run: &|_state, _args| {
            println!("Available commands:");
            let max_width = COMMANDS
                .iter()
                .map(|cmd| cmd.name.len() + cmd.args.len() + 1)
                .max()
                .unwrap_or(0);
            let spaces: String = " ".repeat(max_width + 2);
            for cmd in COMMANDS {
                let width = cmd.name.len() + cmd.args.len() + 1;
                let num_spaces = max_width - width + 2;
                println!(
                    "  {} {}{}{}",
                    cmd.name,
                    cmd.args,
                    &spaces[0..num_spaces],
                    cmd.help
                );
            }
        },
    },
    Command {
        name: ":load",
        args: "<filename>",
        help: "Run a program from the given file, answering the queries it contains.",
        run: &|state, args| {
            if args.is_empty() {
                println!("Usage:\n\t:load <filename>");
                return;
            }
            match std::fs::read_to_string(args) {
                Ok(contents) => {
                    state.interrupted.store(false, atomic::Ordering::SeqCst);
                    let result = state.universe.run_program_with(
                        &state.config,
                        &contents,
                        &mut std::io::stdout(),
                    );
                    report_load(result, "Loaded!");
                }
                Err(err) => {
                    println!("Failed to load: {}", err);
                }
            }
        },
    },
    Command {
        name: ":reset",
        args: "",
        help: "Forget all previously loaded facts and rules.",
        run: &|state, _args| {
            state.universe = TextualUniverse::new();
        },
    },
    Command {
        name: ":time",
        args: "<query>",
        help: "Time the duration of the query execution.",
        run: &|state, args| {
            let start = Instant::now();
            query(state, args);
            let duration = start.elapsed();
            println!("Took {:.4}s", duration.as_secs_f64());
        },
    },
];

struct Command {
    name: &'static str,
    args: &'static str,
    help: &'static str,
    run: &'static (dyn Fn(&mut AppState, &str) + Sync + Send + 'static),
}

fn get_history_path() -> Option<PathBuf> {
    if let Some(mut config_path) = dirs::config_dir() {
        config_path.push("riblog");
        match std::fs::create_dir_all(&config_path) {
            Ok(()) => (),
            Err(other) => {
                tracing::error!(
                    "Failed to create config dir {}: {}",
                    config_path.display(),
                    other
                );
                return None;
            }
        };
        config_path.push("history.txt");
        tracing::info!("Using history file: {}", config_path.display());
        Some(config_path)
    } else {
        tracing::error!("Could not determine config folder, history will not be persisted");
        None
    }
}
