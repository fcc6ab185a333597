#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use std::io;
use std::path;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::Result;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::DocumentIdentity;
use crate::domain::services::IdentityResolver;
use crate::domain::services::SelectionGesture;

/// What the binary should do once configuration has been loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Task {
    Serve,
    Upload {
        files: Vec<PathBuf>,
        gesture: SelectionGesture,
        open_chat: bool,
    },
    Chat {
        identity: DocumentIdentity,
    },
}

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
        )
        .subcommand(
            Command::new("keys").about("List all config keys as strings.")
        );
}

fn subcommand_serve() -> Command {
    return Command::new("serve")
        .about("Runs the gateway, forwarding uploads and queries to the document service.");
}

fn subcommand_upload() -> Command {
    return Command::new("upload")
        .about("Uploads a document and prints the chat link for it. Only the first accepted file is uploaded.")
        .arg(
            Arg::new("files")
                .value_name("FILE")
                .help("PDF or image files (PNG, JPEG, TIFF, BMP) under 5MB.")
                .num_args(1..)
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new("drag-and-drop")
                .long("drag-and-drop")
                .help("Treat the files as dropped onto the page rather than chosen with the file picker.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("chat")
                .long("chat")
                .help("Start chatting with the document once the upload completes.")
                .action(ArgAction::SetTrue),
        );
}

fn subcommand_chat() -> Command {
    return Command::new("chat")
        .about("Chat with a previously uploaded document.")
        .arg(
            Arg::new("target")
                .value_name("TARGET")
                .help("Chat link printed by the upload command, such as /chat?docId=abc&file=report.pdf")
                .num_args(1),
        )
        .arg(
            Arg::new("doc-id")
                .long("doc-id")
                .help("Document identifier, overrides the one in TARGET.")
                .num_args(1),
        )
        .arg(
            Arg::new("file")
                .long("file")
                .help("Display name of the document, overrides the one in TARGET.")
                .num_args(1),
        );
}

fn arg_global(key: ConfigKey, env: &'static str, help: &str) -> Arg {
    return Arg::new(key.to_string())
        .long(key.to_string())
        .env(env)
        .num_args(1)
        .help(format!("{help} [default: {}]", Config::default(key)))
        .global(true);
}

pub fn build() -> Command {
    let about = format!(
        "{}\n\nVersion: {}\nCommit: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    );

    return Command::new("docchat")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(true)
        .subcommand(subcommand_chat())
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_serve())
        .subcommand(subcommand_upload())
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("DOCCHAT_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true)
        )
        .arg(arg_global(
            ConfigKey::GatewayURL,
            "DOCCHAT_GATEWAY_URL",
            "Gateway URL used by the upload and chat commands.",
        ))
        .arg(arg_global(
            ConfigKey::Listen,
            "DOCCHAT_LISTEN",
            "Address the gateway listens on when serving.",
        ))
        .arg(arg_global(
            ConfigKey::RequestTimeout,
            "DOCCHAT_REQUEST_TIMEOUT",
            "Time to wait in milliseconds for an upload or an answer before giving up.",
        ))
        .arg(arg_global(
            ConfigKey::UpstreamURL,
            "DOCCHAT_UPSTREAM_URL",
            "Document service the gateway forwards requests to.",
        ))
        .arg(arg_global(
            ConfigKey::UserAgent,
            "DOCCHAT_USER_AGENT",
            "User agent reported to the gateway. Safari user agents cannot upload by drag and drop.",
        ));
}

fn chat_identity(chat_matches: &ArgMatches) -> DocumentIdentity {
    let resolved = chat_matches
        .get_one::<String>("target")
        .map(|target| return IdentityResolver::resolve(target))
        .unwrap_or_else(|| return DocumentIdentity::unscoped(""));

    let document_id = chat_matches
        .get_one::<String>("doc-id")
        .map(|id| return id.to_string())
        .or_else(|| return resolved.document_id().map(|id| return id.to_string()))
        .unwrap_or_default();
    let display_name = chat_matches
        .get_one::<String>("file")
        .map(|name| return name.to_string())
        .unwrap_or_else(|| return resolved.display_name().to_string());

    return DocumentIdentity::new(&document_id, &display_name);
}

/// Interprets already parsed arguments. Returns `None` when the command was
/// fully handled here.
pub async fn run(matches: ArgMatches) -> Result<Option<Task>> {
    match matches.subcommand() {
        Some(("serve", subcmd_matches)) => {
            Config::load(vec![&matches, subcmd_matches]).await?;
            return Ok(Some(Task::Serve));
        }
        Some(("upload", subcmd_matches)) => {
            Config::load(vec![&matches, subcmd_matches]).await?;

            let files = subcmd_matches
                .get_many::<PathBuf>("files")
                .map(|files| return files.cloned().collect::<Vec<PathBuf>>())
                .unwrap_or_default();
            let gesture = if subcmd_matches.get_flag("drag-and-drop") {
                SelectionGesture::DragAndDrop
            } else {
                SelectionGesture::FilePicker
            };

            return Ok(Some(Task::Upload {
                files,
                gesture,
                open_chat: subcmd_matches.get_flag("chat"),
            }));
        }
        Some(("chat", subcmd_matches)) => {
            Config::load(vec![&matches, subcmd_matches]).await?;
            return Ok(Some(Task::Chat {
                identity: chat_identity(subcmd_matches),
            }));
        }
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
            Some(("keys", _)) => {
                println!("{}", ConfigKey::VARIANTS.join("\n"));
            }
            _ => {
                subcommand_config().print_long_help()?;
            }
        },
        _ => {
            build().print_long_help()?;
        }
    }

    return Ok(None);
}

pub async fn parse() -> Result<Option<Task>> {
    return run(build().get_matches()).await;
}
