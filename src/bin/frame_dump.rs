use anyhow::Result;
use leap_controller::{Controller, Event, EventKind};
use log::*;
use simplelog::{Config, LevelFilter, TermLogger, TerminalMode};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<()> {
    TermLogger::init(LevelFilter::Info, Config::default(), TerminalMode::Mixed)?;

    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("127.0.0.1:6437"));

    let mut controller = Controller::new();
    controller.subscribe(
        EventKind::Frame,
        Arc::new(|event: &Event| {
            if let Event::Frame(frame) = event {
                info!(
                    "frame {} at {}us: {} hands, {} pointables, {} gestures",
                    frame.id,
                    frame.timestamp,
                    frame.hands.len(),
                    frame.pointables.len(),
                    frame.gestures.len()
                );
            }
        }),
    );

    let stream = TcpStream::connect(&address).await?;
    info!("Connected to device at {}", address);
    controller.on_init();
    controller.on_connected();

    let mut lines = BufReader::new(stream).lines();
    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            continue;
        }
        if let Err(error) = controller.process_message(&line) {
            warn!("Failed to decode message: {}", error);
        }
    }

    controller.on_disconnected();
    controller.on_exit();
    Ok(())
}
