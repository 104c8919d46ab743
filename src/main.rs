use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use search_query::{CompiledQuery, CompilerConfig, QueryCompiler, QueryError, QueryInfo, SearchType};

/// Interactive explorer for search queries.
#[derive(Debug, ClapParser)]
#[command(name = "search_query", version)]
struct Args {
    /// Default pattern interpretation: regexp, literal or structural.
    #[arg(long)]
    search_type: Option<SearchType>,

    /// JSON file overriding the validation rules.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print compiled queries as JSON.
    #[arg(long)]
    json: bool,

    /// Compile this query and exit instead of starting the prompt.
    query: Option<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn load_compiler(args: &Args) -> Result<QueryCompiler> {
    let mut config = match &args.config {
        Some(path) => {
            let config = CompilerConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?;
            info!(path = %path.display(), "loaded config");
            config
        }
        None => CompilerConfig::default(),
    };
    if let Some(search_type) = args.search_type {
        config.search_type = search_type;
    }
    Ok(QueryCompiler::from_config(config))
}

fn print_compiled(compiled: &CompiledQuery, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(compiled)?);
        return Ok(());
    }

    println!("query: {}", compiled.query);
    println!("search type: {:?}", compiled.search_type);
    for (i, basic) in compiled.basics.iter().enumerate() {
        println!("[{i}] {basic}");
        for (field, values) in basic.fields()? {
            let name = if field.is_empty() { "(pattern)" } else { field.as_str() };
            let values: Vec<String> = values.iter().map(ToString::to_string).collect();
            println!("    {name}: {}", values.join(", "));
        }
        if basic.is_case_sensitive() {
            println!("    case sensitive");
        }
    }
    Ok(())
}

fn print_error(input: &str, err: &QueryError) {
    println!("error: {err}");
    if let QueryError::Parse(parse_err) = err {
        let span = parse_err.span();
        let offset = input.get(..span.start).unwrap_or_default().chars().count();
        let width = span.slice(input).chars().count().max(1);
        println!("  {input}");
        println!("  {}{}", " ".repeat(offset), "^".repeat(width));
    }
}

fn run(compiler: &QueryCompiler, input: &str, json: bool) -> Result<bool> {
    match compiler.compile(input) {
        Ok(compiled) => {
            print_compiled(&compiled, json)?;
            Ok(true)
        }
        Err(err) => {
            print_error(input, &err);
            Ok(false)
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let compiler = load_compiler(&args)?;

    if let Some(query) = &args.query {
        if !run(&compiler, query, args.json)? {
            std::process::exit(1);
        }
        return Ok(());
    }

    let mut editor = DefaultEditor::new()?;
    println!("search_query ({:?}); Ctrl-D to quit", compiler.config().search_type);
    loop {
        match editor.readline("query> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;
                run(&compiler, line, args.json)?;
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}
