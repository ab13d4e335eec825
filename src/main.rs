use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

mod actions;
mod config;
mod exec;
mod history;
mod llm;
mod render;
mod respond;

use crate::render as render_mod;
use anyhow::Context as _;
use config::SettingsOverride;
use exec::ExecOutcome;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "cmate", version, about = "CLI coding mate for local generation endpoints", long_about = None)]
struct Cli {
    /// Active profile name
    #[arg(short = 'p', long = "profile", global = true)]
    profile: Option<String>,

    /// Default model override
    #[arg(short = 'm', long = "model", global = true)]
    model: Option<String>,

    /// Output JSON instead of human-readable text
    #[arg(long = "json", global = true)]
    json: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Timeout (seconds) for network requests
    #[arg(long = "timeout", global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// First-time setup of endpoint and model
    Init(InitArgs),

    /// Send a prompt and apply the model response
    Ask(AskArgs),

    /// Run a saved raw response through the pipeline (no network)
    Process(ProcessArgs),

    /// Inspect recorded exchanges
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
}

#[derive(Args, Debug, Clone)]
struct InitArgs {
    /// Non-interactive: provider name (ollama or mock)
    #[arg(long)]
    provider: Option<String>,
    /// Non-interactive: generation endpoint base URL
    #[arg(long)]
    endpoint: Option<String>,
    /// Non-interactive: default model
    #[arg(long)]
    default_model: Option<String>,
    /// Default language id for annotation comments
    #[arg(long)]
    language: Option<String>,
    /// Profile name to create or update (default: "default")
    #[arg(long, default_value = "default")]
    profile: String,
}

/// Where a processed response lands.
#[derive(Args, Debug, Clone)]
struct ApplyOpts {
    /// File buffer receiving inserted code (cursor at end of file)
    #[arg(long)]
    target: Option<PathBuf>,
    /// Sandbox root for file actions (default: current directory)
    #[arg(long)]
    root: Option<PathBuf>,
    /// Language id for the annotation comment (default: from target extension)
    #[arg(long)]
    language: Option<String>,
    /// Precede inserted code with a comment naming the prompt
    #[arg(long)]
    annotate: bool,
}

#[derive(Args, Debug, Clone)]
struct AskArgs {
    /// Prompt to send
    #[arg(required = true, num_args = 1.., value_name = "PROMPT...")]
    prompt: Vec<String>,
    /// Stream output tokens as they arrive
    #[arg(long)]
    stream: bool,
    /// Provider to use (ollama, mock)
    #[arg(long)]
    provider: Option<String>,
    /// Generation endpoint base URL (overrides profile)
    #[arg(long)]
    endpoint: Option<String>,
    #[command(flatten)]
    apply: ApplyOpts,
}

#[derive(Args, Debug, Clone)]
struct ProcessArgs {
    /// Raw response file (reads stdin when omitted)
    #[arg(long)]
    file: Option<PathBuf>,
    #[command(flatten)]
    apply: ApplyOpts,
}

#[derive(Subcommand, Debug, Clone)]
enum HistoryCommands {
    /// Show recent exchanges
    List {
        /// Maximum number of records
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Delete the history file
    Clear,
}

#[derive(Debug, Clone)]
struct GlobalOpts {
    profile: Option<String>,
    model: Option<String>,
    json: bool,
    verbose: u8,
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Cli { profile, model, json, verbose, timeout_secs, command } = cli;

    let globals = GlobalOpts { profile, model, json, verbose, timeout_secs };

    let result = match command {
        Commands::Init(args) => cmd_init(&globals, args).await,
        Commands::Ask(args) => cmd_ask(&globals, args).await,
        Commands::Process(args) => cmd_process(&globals, args).await,
        Commands::History { command } => cmd_history(&globals, command).await,
    };

    if let Err(e) = result {
        if globals.json {
            let (code, hint) = classify_error(&e);
            render_mod::print_json_error(&code, &e.to_string(), hint.as_deref());
        } else {
            eprintln!("{}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn classify_error(e: &anyhow::Error) -> (String, Option<String>) {
    let msg = e.to_string().to_lowercase();
    if msg.contains("timed out") || msg.contains("timeout") {
        return ("timeout".to_string(), Some("try increasing --timeout or check network".to_string()));
    }
    if msg.contains("connection refused") || msg.contains("network") || msg.contains("dns")
        || msg.contains("error sending request")
    {
        return ("network_error".to_string(), Some("is the generation endpoint running?".to_string()));
    }
    if msg.contains("unsupported provider") {
        return ("provider_unsupported".to_string(), None);
    }
    if msg.contains("generate endpoint") {
        return ("backend_error".to_string(), None);
    }
    if msg.contains("empty prompt") || msg.contains("empty response input") {
        return ("missing_input".to_string(), None);
    }
    if msg.contains("reading response file") {
        return ("file_not_found".to_string(), Some("check the file path".to_string()));
    }
    ("unknown".to_string(), None)
}

async fn cmd_init(_globals: &GlobalOpts, mut args: InitArgs) -> anyhow::Result<()> {
    use config::{default_config_path, load_config_if_exists, write_config, Profile};
    use std::io::{IsTerminal as _, Write};

    let path = default_config_path()?;
    let mut cfg = load_config_if_exists(&path)?.unwrap_or_default();

    let interactive = std::io::stdin().is_terminal() && std::io::stdout().is_terminal();

    if args.endpoint.is_none() && interactive {
        print!("Generation endpoint (default: {}): ", config::DEFAULT_ENDPOINT);
        std::io::stdout().flush().ok();
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            args.endpoint = Some(trimmed.to_string());
        }
    }

    if args.default_model.is_none() && interactive {
        print!("Model (default: {}): ", config::DEFAULT_MODEL);
        std::io::stdout().flush().ok();
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            args.default_model = Some(trimmed.to_string());
        }
    }

    let profile = Profile {
        provider: args.provider.clone(),
        endpoint: args.endpoint.clone(),
        model: args.default_model.clone(),
        language: args.language.clone(),
    };
    cfg.profiles.insert(args.profile.clone(), profile);
    if cfg.default_profile.is_none() {
        cfg.default_profile = Some(args.profile.clone());
    }
    write_config(&path, &cfg)?;
    println!("config written: {}", path.display());
    Ok(())
}

async fn cmd_ask(globals: &GlobalOpts, args: AskArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let prompt = args.prompt.join(" ");
    if prompt.trim().is_empty() {
        anyhow::bail!("empty prompt; provide text, e.g. cmate ask \"write a fizzbuzz in ts\"");
    }

    let eff = config::resolve_effective_settings(&SettingsOverride {
        profile: globals.profile.clone(),
        provider: args.provider.clone(),
        endpoint: args.endpoint.clone(),
        model: globals.model.clone(),
    })?;
    if globals.verbose > 0 {
        eprintln!("provider={} endpoint={} model={}", eff.provider, eff.endpoint, eff.model);
    }

    let backend = llm::backend_for(
        &eff.provider,
        Duration::from_secs(globals.timeout_secs.unwrap_or(60)),
    )?;
    let req = llm::GenerateRequest {
        model: eff.model.clone(),
        prompt: prompt.clone(),
        endpoint: eff.endpoint.clone(),
    };

    // In JSON mode, force non-streaming to produce a single JSON object output
    let streamed = args.stream && !globals.json;
    let raw = if streamed {
        use futures_util::StreamExt;
        use std::io::Write as _;
        let mut stream = backend.send_stream(&req).await?;
        let mut full = String::new();
        while let Some(chunk) = stream.next().await {
            let piece = chunk?;
            print!("{}", piece);
            std::io::stdout().flush().ok();
            full.push_str(&piece);
        }
        println!();
        full
    } else {
        backend.send(&req).await?
    };

    let (outcome_code, hard) = if streamed {
        // Raw text already went to the terminal; only an action needs work.
        match actions::parse_action(&raw) {
            Some(action) => {
                let outcome = run_action(&action, &args.apply)?;
                render_mod::print_outcome(&outcome, globals.json);
                let hard = hard_refusal(&outcome);
                (outcome.code().to_string(), hard)
            }
            None => ("text".to_string(), false),
        }
    } else {
        apply_response(globals, &raw, &args.apply, Some(&prompt), eff.language.as_deref())?
    };

    history::append_record(&history::HistoryRecord {
        timestamp: chrono::Utc::now(),
        prompt,
        model: eff.model.clone(),
        outcome: outcome_code,
    })?;

    if hard {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_process(globals: &GlobalOpts, args: ProcessArgs) -> anyhow::Result<()> {
    let raw = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading response file: {}", path.display()))?,
        None => {
            use std::io::Read as _;
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading response from stdin")?;
            buf
        }
    };
    if raw.trim().is_empty() {
        anyhow::bail!("empty response input");
    }

    let eff = config::resolve_effective_settings(&SettingsOverride {
        profile: globals.profile.clone(),
        ..Default::default()
    })?;
    let (_code, hard) = apply_response(globals, &raw, &args.apply, None, eff.language.as_deref())?;
    if hard {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_history(globals: &GlobalOpts, cmd: HistoryCommands) -> anyhow::Result<()> {
    match cmd {
        HistoryCommands::List { limit } => {
            let records = history::load_recent(limit)?;
            if globals.json {
                render_mod::print_json(&records);
            } else if records.is_empty() {
                println!("no recorded exchanges");
            } else {
                for r in &records {
                    println!(
                        "{}  {}  {}  {}",
                        r.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        r.model,
                        r.outcome,
                        r.prompt
                    );
                }
            }
        }
        HistoryCommands::Clear => {
            history::clear()?;
            println!("history cleared");
        }
    }
    Ok(())
}

/// Route a raw response: an embedded action goes to the executor, anything
/// else lands as cleaned text in the target buffer or on stdout. Returns the
/// outcome tag and whether the run should end with a failure status.
fn apply_response(
    globals: &GlobalOpts,
    raw: &str,
    opts: &ApplyOpts,
    prompt: Option<&str>,
    cfg_language: Option<&str>,
) -> anyhow::Result<(String, bool)> {
    match respond::process_response(raw) {
        respond::ProcessedResponse::Action(action) => {
            let outcome = run_action(&action, opts)?;
            render_mod::print_outcome(&outcome, globals.json);
            let hard = hard_refusal(&outcome);
            Ok((outcome.code().to_string(), hard))
        }
        respond::ProcessedResponse::Text(code) => {
            if code.is_empty() {
                render_mod::print_outcome(&ExecOutcome::EmptyContent, globals.json);
                return Ok(("empty_content".to_string(), false));
            }
            match &opts.target {
                Some(tpath) => {
                    let body = annotate_body(&code, opts, prompt, tpath, cfg_language);
                    let mut buf = exec::FileBuffer::open(tpath)?;
                    let outcome = exec::insert_at_cursors(&mut buf, &body)?;
                    buf.save()?;
                    render_mod::print_outcome(&outcome, globals.json);
                    Ok((outcome.code().to_string(), false))
                }
                None => {
                    if globals.json {
                        #[derive(serde::Serialize)]
                        struct Out<'a> {
                            outcome: &'a str,
                            code: &'a str,
                        }
                        render_mod::print_json(&Out { outcome: "text", code: &code });
                    } else {
                        println!("{}", code);
                    }
                    Ok(("text".to_string(), false))
                }
            }
        }
    }
}

fn run_action(action: &actions::ModelAction, opts: &ApplyOpts) -> anyhow::Result<ExecOutcome> {
    let root = match &opts.root {
        Some(r) => r.clone(),
        None => std::env::current_dir().context("resolving current directory")?,
    };
    let ws = exec::DiskWorkspace::new(Some(root));
    match &opts.target {
        Some(tpath) => {
            let mut buf = exec::FileBuffer::open(tpath)?;
            let outcome = exec::execute(action, &mut buf, &ws)?;
            if matches!(outcome, ExecOutcome::Inserted { .. }) {
                buf.save()?;
            }
            Ok(outcome)
        }
        None => exec::execute(action, &mut exec::NullEditor, &ws),
    }
}

fn hard_refusal(outcome: &ExecOutcome) -> bool {
    outcome.is_refusal() && !matches!(outcome, ExecOutcome::EmptyContent)
}

fn annotate_body(
    code: &str,
    opts: &ApplyOpts,
    prompt: Option<&str>,
    target: &Path,
    cfg_language: Option<&str>,
) -> String {
    if !opts.annotate {
        return code.to_string();
    }
    let language = match &opts.language {
        Some(l) => l.clone(),
        None => {
            let detected = respond::detect_language_from_path(target);
            if detected.is_empty() {
                cfg_language.unwrap_or_default().to_string()
            } else {
                detected
            }
        }
    };
    let label = match prompt {
        Some(p) => summarize_prompt(p),
        None => "generated by codemate".to_string(),
    };
    format!(
        "{}{}{}\n{}",
        respond::comment_prefix_for(&language),
        label,
        respond::comment_suffix_for(&language),
        code
    )
}

fn summarize_prompt(prompt: &str) -> String {
    let one_line = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    if one_line.chars().count() > 72 {
        let cut: String = one_line.chars().take(69).collect();
        format!("{}...", cut)
    } else {
        one_line
    }
}
