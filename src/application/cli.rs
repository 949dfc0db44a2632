use std::io;
use std::path;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgGroup;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use yansi::Paint;

use crate::application::ui;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::BackendName;
use crate::domain::models::DesignId;
use crate::domain::models::ImageState;
use crate::domain::models::Preset;
use crate::domain::services::ChatService;
use crate::domain::services::GenerationOutcome;
use crate::domain::services::Orchestrator;
use crate::domain::services::SessionStore;
use crate::infrastructure::backends::BackendManager;
use crate::infrastructure::storage::FileStorage;

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(&config_file_path).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

async fn build_orchestrator() -> Result<Arc<Orchestrator>> {
    let backend = BackendManager::get(BackendName::Gemini)?;
    let store = SessionStore::open(Box::<FileStorage>::default()).await;
    let timeout = Duration::from_millis(Config::get(ConfigKey::RequestTimeout).parse::<u64>()?);

    let orchestrator = Orchestrator::new(backend, store, timeout);
    orchestrator.restore().await;

    return Ok(Arc::new(orchestrator));
}

/// Resolves `--prompt` or `--preset` to the text sent to the model.
fn prompt_from_matches(matches: &ArgMatches) -> Result<String> {
    if let Some(prompt) = matches.get_one::<String>("prompt") {
        if prompt.trim().is_empty() {
            bail!("The prompt cannot be empty.");
        }
        return Ok(prompt.to_string());
    }

    if let Some(key) = matches.get_one::<String>("preset") {
        if let Some(preset) = Preset::find(key) {
            return Ok(preset.prompt.to_string());
        }
        bail!(format!("Unknown preset '{key}'"));
    }

    bail!("Either --prompt or --preset is required.");
}

/// Runs one generation round. Ctrl-C cancels the request while it is in
/// flight and exits once nothing is left to cancel. Returns false when no
/// design came out of it.
async fn run_generation(orchestrator: Arc<Orchestrator>, prompt: &str) -> Result<bool> {
    // Installing the handler replaces the default SIGINT exit for the rest of
    // the process, so the watcher has to exit itself.
    let watcher = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if orchestrator.cancel().await {
                    tracing::info!("Cancelled generation");
                    continue;
                }

                tracing::info!("Interrupted");
                process::exit(130);
            }
        })
    };

    println!("{}", Paint::new("Generating your new garden...").dimmed());
    let outcome = orchestrator.submit_prompt(prompt).await;

    let view = orchestrator.view().await;
    let res =
        ui::print_outcome(&outcome, &view, &path::PathBuf::from(Config::get(ConfigKey::OutputDir)))
            .await;
    watcher.abort();
    res?;

    match outcome {
        GenerationOutcome::Failed(_) | GenerationOutcome::Rejected(_) => return Ok(false),
        _ => return Ok(true),
    }
}

fn arg_prompt() -> Arg {
    return Arg::new("prompt")
        .short('p')
        .long("prompt")
        .num_args(1)
        .help("Describe the garden you want.");
}

fn arg_preset() -> Arg {
    return Arg::new("preset")
        .long("preset")
        .num_args(1)
        .help("Use one of the built in design styles instead of a prompt.")
        .value_parser(PossibleValuesParser::new(Preset::keys()));
}

fn group_prompt(required: bool) -> ArgGroup {
    return ArgGroup::new("prompt-args")
        .args(["prompt", "preset"])
        .required(required);
}

fn arg_id(help: &'static str, required: bool) -> Arg {
    return Arg::new("id")
        .short('i')
        .long("id")
        .help(help)
        .num_args(1)
        .value_parser(value_parser!(u64))
        .required(required);
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_debug() -> Command {
    return Command::new("debug")
        .about("Debug helpers for Gardenia")
        .hide(true)
        .subcommand(
            Command::new("log-path").about("Output path to debug log file generated when running Gardenia with environment variable RUST_LOG=gardenia")
        )
        .subcommand(
            Command::new("enum-config").about("List all config keys as strings.")
        );
}

fn subcommand_design() -> Command {
    return Command::new("design")
        .about("Start a new design session from a photo of your garden and generate the first design.")
        .arg(
            Arg::new("image")
                .long("image")
                .num_args(1)
                .help("Path to a photo of your garden (png, jpg, webp, gif).")
                .value_parser(value_parser!(path::PathBuf))
                .required(true),
        )
        .arg(arg_prompt())
        .arg(arg_preset())
        .group(group_prompt(true));
}

fn subcommand_generate() -> Command {
    return Command::new("generate")
        .about("Generate another design for the active session from its original photo. Use 'sessions branch' to build on a past design instead.")
        .arg(arg_prompt())
        .arg(arg_preset())
        .group(group_prompt(true));
}

fn subcommand_sessions() -> Command {
    return Command::new("sessions")
        .about("Browse past design sessions.")
        .arg_required_else_help(true)
        .subcommand(Command::new("dir").about("Print the directory sessions are stored in."))
        .subcommand(Command::new("list").about("List all design sessions, newest first. The active session is marked with '*'."))
        .subcommand(
            Command::new("show")
                .about("Show every design in a session. Defaults to the active session.")
                .arg(arg_id("Session ID", false)),
        )
        .subcommand(
            Command::new("open")
                .about("Make a past session the active one. Omit passing any session ID to load an interactive selection.")
                .arg(arg_id("Session ID", false))
                .arg(arg_prompt())
                .arg(arg_preset())
                .group(group_prompt(false)),
        )
        .subcommand(
            Command::new("branch")
                .about("Generate a new design starting from a past design instead of the latest one.")
                .arg(arg_id("Design ID, as shown by 'sessions show'", true))
                .arg(arg_prompt())
                .arg(arg_preset())
                .group(group_prompt(true)),
        );
}

fn global_arg(key: ConfigKey, env: &'static str, help: &str) -> Arg {
    return Arg::new(key.to_string())
        .long(key.to_string())
        .env(env)
        .num_args(1)
        .help(help.to_string())
        .global(true);
}

pub fn build() -> Command {
    let about = format!(
        "{}\n\nVersion: {}\nCommit: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    );

    return Command::new("gardenia")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(true)
        .subcommand(Command::new("chat").about("Chat with Bloom, the gardening assistant. Type /quit to leave."))
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_debug())
        .subcommand(subcommand_design())
        .subcommand(subcommand_generate())
        .subcommand(Command::new("manpages").about("Generates manpages and outputs to stdout."))
        .subcommand(Command::new("presets").about("List the built in design styles."))
        .subcommand(subcommand_sessions())
        .subcommand(Command::new("start-over").about("Clear the active session. Past sessions are kept."))
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("GARDENIA_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true)
        )
        .arg(global_arg(
            ConfigKey::GeminiURL,
            "GARDENIA_GEMINI_URL",
            &format!("Gemini API URL. Can be swapped to a compatible proxy. [default: {}]", Config::default(ConfigKey::GeminiURL)),
        ))
        .arg(global_arg(
            ConfigKey::GeminiToken,
            "GARDENIA_GEMINI_TOKEN",
            "Gemini API key.",
        ))
        .arg(global_arg(
            ConfigKey::ImageModel,
            "GARDENIA_IMAGE_MODEL",
            &format!("Model used to generate garden designs. [default: {}]", Config::default(ConfigKey::ImageModel)),
        ))
        .arg(global_arg(
            ConfigKey::TextModel,
            "GARDENIA_TEXT_MODEL",
            &format!("Model used to identify plants and to chat. [default: {}]", Config::default(ConfigKey::TextModel)),
        ))
        .arg(global_arg(
            ConfigKey::RequestTimeout,
            "GARDENIA_REQUEST_TIMEOUT",
            &format!("Time to wait in milliseconds for each request to the model before giving up. [default: {}]", Config::default(ConfigKey::RequestTimeout)),
        ))
        .arg(global_arg(
            ConfigKey::StorageDir,
            "GARDENIA_STORAGE_DIR",
            &format!("Directory design sessions are saved to. [default: {}]", Config::default(ConfigKey::StorageDir)),
        ))
        .arg(global_arg(
            ConfigKey::OutputDir,
            "GARDENIA_OUTPUT_DIR",
            &format!("Directory generated designs are written to. [default: {}]", Config::default(ConfigKey::OutputDir)),
        ));
}

async fn open_session(orchestrator: &Orchestrator, session_id: Option<DesignId>) -> Result<bool> {
    let session_id = match session_id {
        Some(session_id) => session_id,
        None => {
            let sessions = orchestrator.sessions().await;
            let active_session_id = orchestrator.active_session().await.map(|e| return e.id);
            match ui::select_session(&sessions, active_session_id)? {
                Some(session_id) => session_id,
                None => return Ok(false),
            }
        }
    };

    let session = orchestrator.resume_session(session_id).await?;
    println!("Opened session {}", session.id);
    ui::print_view(&orchestrator.view().await);

    return Ok(true);
}

async fn parse_sessions(matches: &ArgMatches, subcmd_matches: &ArgMatches) -> Result<bool> {
    match subcmd_matches.subcommand() {
        Some(("dir", dir_matches)) => {
            Config::load(vec![matches, subcmd_matches, dir_matches]).await?;
            println!("{}", Config::get(ConfigKey::StorageDir));
        }
        Some(("list", list_matches)) => {
            Config::load(vec![matches, subcmd_matches, list_matches]).await?;
            let orchestrator = build_orchestrator().await?;
            let active_session_id = orchestrator.active_session().await.map(|e| return e.id);
            ui::print_sessions(&orchestrator.sessions().await, active_session_id);
        }
        Some(("show", show_matches)) => {
            Config::load(vec![matches, subcmd_matches, show_matches]).await?;
            let orchestrator = build_orchestrator().await?;
            let session = match show_matches.get_one::<u64>("id") {
                Some(session_id) => orchestrator
                    .sessions()
                    .await
                    .into_iter()
                    .find(|e| return e.id == *session_id),
                None => orchestrator.active_session().await,
            };

            match session {
                Some(session) => ui::print_session(&session),
                None => bail!("There is no session to show. Pass --id or open a session first."),
            }
        }
        Some(("open", open_matches)) => {
            Config::load(vec![matches, subcmd_matches, open_matches]).await?;
            let orchestrator = build_orchestrator().await?;
            let session_id = open_matches.get_one::<u64>("id").copied();
            if !open_session(&orchestrator, session_id).await? {
                return Ok(true);
            }

            if open_matches.contains_id("prompt") || open_matches.contains_id("preset") {
                let prompt = prompt_from_matches(open_matches)?;
                return run_generation(orchestrator, &prompt).await;
            }
        }
        Some(("branch", branch_matches)) => {
            Config::load(vec![matches, subcmd_matches, branch_matches]).await?;
            let prompt = prompt_from_matches(branch_matches)?;
            let orchestrator = build_orchestrator().await?;

            let item_id = branch_matches.get_one::<u64>("id").copied().unwrap_or_default();
            orchestrator.branch_from_item(item_id).await?;
            return run_generation(orchestrator, &prompt).await;
        }
        _ => {
            subcommand_sessions().print_long_help()?;
        }
    }

    return Ok(true);
}

/// Parses the command line and runs the chosen command. Returns false when
/// the command ran but did not succeed, such as a failed generation.
pub async fn parse() -> Result<bool> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("debug", debug_matches)) => match debug_matches.subcommand() {
            Some(("log-path", _)) => {
                let log_path = Config::log_dir().join("debug.log");
                println!("{}", log_path.to_string_lossy());
            }
            Some(("enum-config", _)) => {
                println!("{}", ConfigKey::VARIANTS.join("\n"));
            }
            _ => {
                subcommand_debug().print_long_help()?;
            }
        },
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
            }
            _ => {
                subcommand_config().print_long_help()?;
            }
        },
        Some(("manpages", _)) => {
            clap_mangen::Man::new(build()).render(&mut io::stdout())?;
        }
        Some(("presets", _)) => {
            ui::print_presets();
        }
        Some(("chat", subcmd_matches)) => {
            Config::load(vec![&matches, subcmd_matches]).await?;
            let backend = BackendManager::get(BackendName::Gemini)?;
            backend.health_check().await?;
            ui::run_chat(ChatService::new(backend)).await?;
        }
        Some(("design", subcmd_matches)) => {
            Config::load(vec![&matches, subcmd_matches]).await?;
            let prompt = prompt_from_matches(subcmd_matches)?;
            let image_path = match subcmd_matches.get_one::<path::PathBuf>("image") {
                Some(image_path) => image_path,
                None => bail!("--image is required."),
            };
            let image = ImageState::from_file(image_path).await?;

            let orchestrator = build_orchestrator().await?;
            orchestrator.backend().health_check().await?;
            let session = orchestrator.upload_image(image).await;
            println!("Started session {}", session.id);

            return run_generation(orchestrator, &prompt).await;
        }
        Some(("generate", subcmd_matches)) => {
            Config::load(vec![&matches, subcmd_matches]).await?;
            let prompt = prompt_from_matches(subcmd_matches)?;
            let orchestrator = build_orchestrator().await?;
            orchestrator.backend().health_check().await?;

            return run_generation(orchestrator, &prompt).await;
        }
        Some(("sessions", subcmd_matches)) => {
            return parse_sessions(&matches, subcmd_matches).await;
        }
        Some(("start-over", subcmd_matches)) => {
            Config::load(vec![&matches, subcmd_matches]).await?;
            let orchestrator = build_orchestrator().await?;
            orchestrator.start_over().await;
            println!("Cleared the active session. Upload a new photo with 'gardenia design' to start again.");
        }
        _ => {
            build().print_long_help()?;
        }
    }

    return Ok(true);
}
