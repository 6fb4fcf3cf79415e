//! `cliptrim` -- terminal front end for the download-and-trim backend.
//!
//! Reads one command per line from stdin: download remote videos, pick a
//! stored video, set trim times, edit the screen and webcam crop regions,
//! and submit processing jobs. Job progress is printed as it arrives.
//!
//! # Environment variables
//!
//! | Variable                        | Default                 | Description                              |
//! |---------------------------------|-------------------------|------------------------------------------|
//! | `CLIPTRIM_BACKEND_URL`          | `http://127.0.0.1:5000` | Backend base URL                         |
//! | `CLIPTRIM_TRANSPORT`            | `poll`                  | `poll` or `stream` progress updates      |
//! | `CLIPTRIM_POLL_INTERVAL_MS`     | `1000`                  | Milliseconds between progress polls      |
//! | `CLIPTRIM_REQUEST_TIMEOUT_SECS` | `30`                    | Timeout for non-streaming requests       |
//! | `CLIPTRIM_FRAME_PATH`           | --                      | Image used as the current video frame    |

use anyhow::Context;
use cliptrim::command::{parse_command, Command, CommandError};
use cliptrim::config::CliConfig;
use cliptrim::session::Session;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cliptrim=info,cliptrim_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = CliConfig::from_env().context("Invalid configuration")?;

    tracing::info!(
        backend_url = %config.backend_url,
        transport = %config.transport,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        "Starting cliptrim",
    );

    let (mut session, mut events) =
        Session::from_config(&config).context("Failed to create backend client")?;

    println!("Type `help` for a list of commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(command) => {
                        let quit = command == Command::Quit;
                        print_lines(session.dispatch(command).await);
                        if quit {
                            break;
                        }
                    }
                    Err(CommandError::Empty) => {}
                    Err(e) => println!("{e}"),
                }
            }
            Some(event) = events.recv() => {
                print_lines(session.handle_event(event).await);
            }
        }
    }

    tracing::info!("Session ended");
    Ok(())
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}
