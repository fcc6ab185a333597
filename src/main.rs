#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

mod application;
mod configuration;
mod domain;
mod infrastructure;

use std::env;
use std::process;
use std::sync::Arc;

use anyhow::Error;
use anyhow::Result;
use owo_colors::OwoColorize;
use owo_colors::Stream;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::application::chat;
use crate::application::cli;
use crate::application::cli::Task;
use crate::application::server;
use crate::application::upload;
use crate::domain::models::GatewayRef;
use crate::domain::services::IdentityResolver;
use crate::infrastructure::gateway::client::GatewayClient;

fn handle_error(err: Error) {
    eprintln!(
        "{}",
        format!(
            "Oh no! docchat has failed with the following app version and error.\n\nVersion: {}\nCommit: {}\nError: {}",
            env!("CARGO_PKG_VERSION"),
            env!("VERGEN_GIT_DESCRIBE"),
            err
        )
        .if_supports_color(Stream::Stderr, |text| return text.red())
    );

    let backtrace = err.backtrace();
    if backtrace.to_string() == "disabled backtrace" {
        let args = env::args().collect::<Vec<String>>().join(" ");
        eprintln!("\nRunning the following can help explain further what the issue is:");
        eprintln!("\nRUST_BACKTRACE=1 {args}");
    } else {
        eprintln!("\n{}", backtrace);
    }

    process::exit(1);
}

/// The gateway logs to stdout. Interactive commands keep the terminal clean
/// and only write a debug log when `RUST_LOG` asks for one.
fn init_logging(task: &Task) -> Option<WorkerGuard> {
    if *task == Task::Serve {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| return EnvFilter::new("info,docchat=debug")),
            )
            .with_target(true)
            .init();

        return None;
    }

    if !env::var("RUST_LOG")
        .unwrap_or_else(|_| return "".to_string())
        .contains("docchat")
    {
        return None;
    }

    let debug_log_dir = env::var("DOCCHAT_LOG_DIR").unwrap_or_else(|_| {
        return dirs::cache_dir()
            .unwrap_or_else(env::temp_dir)
            .join("docchat")
            .to_string_lossy()
            .to_string();
    });

    let file_appender = tracing_appender::rolling::never(debug_log_dir, "debug.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .json()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(writer)
        .init();

    return Some(guard);
}

async fn run(task: Task) -> Result<()> {
    match task {
        Task::Serve => {
            return server::start().await;
        }
        Task::Upload {
            files,
            gesture,
            open_chat,
        } => {
            let gateway: GatewayRef = Arc::new(GatewayClient::from_config()?);
            let target = upload::start(&files, gesture, &gateway).await?;
            if open_chat {
                println!();
                return chat::start(IdentityResolver::resolve(&target), gateway).await;
            }

            return Ok(());
        }
        Task::Chat { identity } => {
            let gateway: GatewayRef = Arc::new(GatewayClient::from_config()?);
            return chat::start(identity, gateway).await;
        }
    }
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let task = match cli::parse().await {
        Ok(Some(task)) => task,
        Ok(None) => process::exit(0),
        Err(err) => {
            handle_error(err);
            return;
        }
    };

    let guard = init_logging(&task);
    let res = run(task).await;
    drop(guard);

    if let Err(err) = res {
        handle_error(err);
    }

    // Stdin reads run on a blocking thread that would hold up runtime shutdown.
    process::exit(0);
}
