use anyhow::{Context, Result};
use clap::{Args, ColorChoice, CommandFactory, FromArgMatches, Parser, Subcommand};
use colored::Colorize;
use pantrysense::aggregate::{AggregateOptions, Aggregator, Profile};
use pantrysense::catalog::Vocabulary;
use pantrysense::config::{DetectionConfig, PantryConfig};
use pantrysense::frame::FrameInput;
use pantrysense::resolver::index::TokenSet;
use pantrysense::resolver::{Resolution, Resolver};
use pantrysense::schema::{SCHEMA_VERSION, frame_result_schema};
use serde_json::{Value, json};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "pantrysense",
    about = "Map object-detection labels onto pantry ingredients",
    arg_required_else_help = true
)]
struct Cli {
    /// Disable color
    #[arg(long = "no-color", global = true)]
    no_color: bool,

    /// Config file to use instead of the user config
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Vocabulary TOML replacing the embedded pantry catalog
    #[arg(long, global = true, value_name = "PATH")]
    vocabulary: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve raw labels to pantry items
    Resolve(ResolveArgs),
    /// Aggregate one frame of detections into ingredients
    Aggregate(AggregateArgs),
    /// List the pantry catalog
    Catalog(CatalogArgs),
    /// Print the JSON schema of aggregate output
    Schema,
    /// Show or initialise the configuration
    Config(ConfigArgs),
}

#[derive(Args, Clone)]
struct ResolveArgs {
    /// Labels to resolve
    #[arg(value_name = "LABEL", required = true)]
    labels: Vec<String>,

    /// Output JSON
    #[arg(long)]
    json: bool,

    /// Show which matching tier decided each label
    #[arg(short, long)]
    explain: bool,

    /// Exit with status 1 if any label is unresolved
    #[arg(long)]
    strict: bool,
}

#[derive(Args, Clone)]
struct AggregateArgs {
    /// Frame JSON file, or `-` for stdin
    #[arg(value_name = "FILE", default_value = "-")]
    input: String,

    /// Output profile
    #[arg(long, value_enum)]
    profile: Option<ProfileArg>,

    /// Minimum confidence for a detection to count
    #[arg(long, value_name = "CONFIDENCE")]
    threshold: Option<f32>,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Clone)]
struct CatalogArgs {
    /// Output JSON
    #[arg(long)]
    json: bool,

    /// Include the alias table
    #[arg(long)]
    aliases: bool,
}

#[derive(Args, Clone)]
struct ConfigArgs {
    /// Print the config file location
    #[arg(long, conflicts_with = "init")]
    path: bool,

    /// Write the default configuration to the config file
    #[arg(long)]
    init: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ProfileArg {
    Pantry,
    Legacy,
}

impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Pantry => Profile::Pantry,
            ProfileArg::Legacy => Profile::Legacy,
        }
    }
}

fn load_config(cli: &Cli) -> Result<PantryConfig> {
    let mut config = match &cli.config {
        Some(path) => PantryConfig::load_from(path)?,
        None => PantryConfig::load()?,
    };
    if let Some(path) = &cli.vocabulary {
        config.vocabulary.path = Some(path.clone());
    }
    Ok(config)
}

fn load_vocabulary(config: &PantryConfig) -> Result<Vocabulary> {
    config.vocabulary().context("failed to load vocabulary")
}

fn report(err: &anyhow::Error) {
    eprintln!("Error: {:#}", err);
}

fn explain_json(label: &str, resolution: &Resolution) -> Value {
    json!({
        "label": label,
        "mappedLabel": resolution.item().map(|item| item.as_str()).unwrap_or(""),
        "match": resolution.match_kind(),
        "tokens": TokenSet::from_text(&label.trim().to_lowercase()),
    })
}

fn render_resolution(label: &str, resolution: &Resolution, explain: bool, color: bool) -> String {
    let mapped = match resolution.item() {
        Some(item) if color => item.as_str().green().to_string(),
        Some(item) => item.to_string(),
        None if color => "unresolved".red().to_string(),
        None => "unresolved".to_string(),
    };
    let mut out = format!("{} -> {}", label, mapped);
    if explain {
        let tokens = TokenSet::from_text(&label.trim().to_lowercase());
        let via = resolution
            .match_kind()
            .map(|kind| kind.to_string())
            .unwrap_or_else(|| "no match".to_string());
        out.push_str(&format!("\n  via {}, tokens {}", via, tokens));
    }
    out
}

fn run_resolve(args: ResolveArgs, config: &PantryConfig, color: bool) -> Result<(), i32> {
    let vocabulary = load_vocabulary(config).map_err(|e| {
        report(&e);
        2
    })?;
    let resolver = Resolver::new(&vocabulary);

    let resolutions: Vec<(&str, Resolution)> = args
        .labels
        .iter()
        .map(|label| (label.as_str(), resolver.resolve(label)))
        .collect();

    if args.json {
        let out: Vec<Value> = resolutions
            .iter()
            .map(|(label, resolution)| explain_json(label, resolution))
            .collect();
        match serde_json::to_string_pretty(&out) {
            Ok(s) => println!("{}", s),
            Err(_) => return Err(3),
        }
    } else {
        for (label, resolution) in &resolutions {
            println!("{}", render_resolution(label, resolution, args.explain, color));
        }
    }

    let all_resolved = resolutions.iter().all(|(_, r)| r.is_resolved());
    if args.strict && !all_resolved {
        return Err(1);
    }
    Ok(())
}

fn read_frame(input: &str) -> Result<FrameInput> {
    let content = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read frame from stdin")?;
        buf
    } else {
        std::fs::read_to_string(Path::new(input))
            .with_context(|| format!("failed to read frame {}", input))?
    };
    serde_json::from_str(&content).context("failed to parse frame JSON")
}

fn prepare_frame(
    detection: &DetectionConfig,
    config: &PantryConfig,
    input: &str,
) -> Result<(AggregateOptions, Vocabulary, FrameInput)> {
    let options = detection.options()?;
    let vocabulary = load_vocabulary(config)?;
    let frame = read_frame(input)?;
    Ok((options, vocabulary, frame))
}

fn run_aggregate(args: AggregateArgs, config: &PantryConfig) -> Result<(), i32> {
    let mut detection = config.detection.clone();
    if let Some(profile) = args.profile {
        detection.profile = profile.into();
    }
    if let Some(threshold) = args.threshold {
        detection.confidence_threshold = Some(threshold);
    }

    let (options, vocabulary, frame) = match prepare_frame(&detection, config, &args.input) {
        Ok(prepared) => prepared,
        Err(e) => {
            report(&e);
            return Err(2);
        }
    };

    let aggregator = Aggregator::new(Arc::new(Resolver::new(&vocabulary)), options);
    let result = match aggregator.aggregate(&frame.detections, &frame.classes, frame.image) {
        Ok(result) => result,
        Err(e) => {
            report(&anyhow::Error::from(e).context("invalid frame"));
            return Err(2);
        }
    };

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&result)
    } else {
        serde_json::to_string(&result)
    };
    match rendered {
        Ok(s) => println!("{}", s),
        Err(_) => return Err(3),
    }
    Ok(())
}

fn run_catalog(args: CatalogArgs, config: &PantryConfig, color: bool) -> Result<(), i32> {
    let vocabulary = load_vocabulary(config).map_err(|e| {
        report(&e);
        2
    })?;
    let resolver = Resolver::new(&vocabulary);

    if args.json {
        let items: Vec<Value> = resolver
            .index()
            .iter()
            .map(|(item, tokens)| json!({"item": item, "tokens": tokens}))
            .collect();
        let mut out = json!({ "items": items });
        if args.aliases {
            let aliases: serde_json::Map<String, Value> = resolver
                .aliases()
                .entries()
                .into_iter()
                .map(|(alias, item)| (alias.to_string(), json!(item)))
                .collect();
            out["aliases"] = Value::Object(aliases);
        }
        match serde_json::to_string_pretty(&out) {
            Ok(s) => println!("{}", s),
            Err(_) => return Err(3),
        }
        return Ok(());
    }

    let heading = |text: &str| {
        if color {
            text.bold().cyan().to_string()
        } else {
            text.to_string()
        }
    };
    println!("{}", heading("Items:"));
    for (item, tokens) in resolver.index().iter() {
        println!("  {} {}", item, tokens);
    }
    if args.aliases {
        println!("{}", heading("Aliases:"));
        for (alias, item) in resolver.aliases().entries() {
            println!("  {} -> {}", alias, item);
        }
    }
    Ok(())
}

fn run_schema() -> Result<(), i32> {
    let mut schema = match serde_json::to_value(frame_result_schema()) {
        Ok(v) => v,
        Err(_) => return Err(3),
    };
    schema["$comment"] = json!(format!("pantrysense frame result schema {}", SCHEMA_VERSION));
    match serde_json::to_string_pretty(&schema) {
        Ok(s) => println!("{}", s),
        Err(_) => return Err(3),
    }
    Ok(())
}

fn run_config(args: ConfigArgs, config: &PantryConfig) -> Result<(), i32> {
    if args.path {
        match PantryConfig::config_file_path() {
            Some(path) => println!("{}", path.display()),
            None => {
                eprintln!("Error: no config directory on this platform");
                return Err(2);
            }
        }
        return Ok(());
    }
    if args.init {
        if let Err(e) = PantryConfig::default().save() {
            eprintln!("Error: failed to write config: {}", e);
            return Err(2);
        }
        return Ok(());
    }
    match toml::to_string_pretty(config) {
        Ok(s) => print!("{}", s),
        Err(_) => return Err(3),
    }
    Ok(())
}

fn detect_color_choice() -> ColorChoice {
    // Scan args before clap so help/errors honor `--no-color`.
    // Mirror clap's parsing by stopping at `--` which terminates flags.
    let mut args = std::env::args_os();
    args.next();
    let mut flag = false;
    for arg in args {
        if arg == "--" {
            break;
        }
        if arg == "--no-color" {
            flag = true;
            break;
        }
    }
    if flag || std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()) {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("PANTRYSENSE_LOG", "warn"))
        .format_timestamp(None)
        .init();
}

fn main() {
    init_logging();
    let color = detect_color_choice();
    let matches = Cli::command().color(color).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    let want_color = !matches!(color, ColorChoice::Never)
        && supports_color::on(supports_color::Stream::Stdout).is_some();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            report(&e);
            std::process::exit(2);
        }
    };

    let outcome = match cli.command {
        Some(Commands::Resolve(args)) => run_resolve(args, &config, want_color),
        Some(Commands::Aggregate(args)) => run_aggregate(args, &config),
        Some(Commands::Catalog(args)) => run_catalog(args, &config, want_color),
        Some(Commands::Schema) => run_schema(),
        Some(Commands::Config(args)) => run_config(args, &config),
        None => Ok(()),
    };
    if let Err(code) = outcome {
        std::process::exit(code);
    }
}
