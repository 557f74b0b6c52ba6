use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use log::{error, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Mutex};

use smartcart::cart::CartStore;
use smartcart::checkout::{controller::SharedLink, CheckoutController};
use smartcart::detection::{ChannelSource, DetectionController, DetectionEvent};
use smartcart::events::{self, AppEvent};
use smartcart::notify::SmtpDispatcher;
use smartcart::pricing::HttpPriceOracle;
use smartcart::serial::{DeviceLink, SerialDeviceLink};
use smartcart::settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("smartcart starting up...");

    let settings_path = std::env::var("SMARTCART_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("settings.json"));
    let settings = Settings::load(settings_path)?;

    let (event_tx, mut event_rx) = events::channel();

    let oracle = Arc::new(HttpPriceOracle::new(
        settings.pricing.base_url.clone(),
        Duration::from_secs(settings.pricing.request_timeout_secs),
    )?);
    let cart = CartStore::new(oracle, event_tx.clone());

    let link: Box<dyn DeviceLink> =
        Box::new(SerialDeviceLink::open(&settings.serial.port, settings.serial.baud_rate)?);
    let link: SharedLink = Arc::new(Mutex::new(link));

    let password = settings.smtp_password().unwrap_or_else(|| {
        warn!(
            "{} not set; receipt dispatch will fail open",
            settings.receipt.password_env
        );
        String::new()
    });
    let receipts = Arc::new(SmtpDispatcher::new(settings.receipt.clone(), password));

    let checkout = CheckoutController::new(
        link,
        cart.clone(),
        receipts,
        event_tx.clone(),
        &settings.checkout,
    );

    // The external camera/model pipeline feeds this channel; the console's
    // `detect` command stands in for it here.
    let (detect_tx, source) = ChannelSource::new(64);
    let mut detection = DetectionController::new();
    detection.start(
        Arc::new(source),
        cart.clone(),
        event_tx.clone(),
        &settings.detection,
    )?;

    // Event printer: the stand-in for the rendering surface.
    tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(AppEvent::CartChanged { total }) => println!("  [cart] total: {total:.2} EUR"),
                Ok(AppEvent::ItemDetected { label }) => println!("  [feed] detected {label}"),
                Ok(AppEvent::CheckoutResolved { outcome }) => {
                    println!("  [checkout] resolved: {outcome:?}")
                }
                Err(_) => break,
            }
        }
    });

    run_console(cart, checkout, detect_tx).await;

    detection.stop().await?;
    log::info!("smartcart shut down");
    Ok(())
}

/// Line-oriented operator console standing in for the button surface. No
/// command ever propagates an error to the operator beyond a printed note.
async fn run_console(
    cart: CartStore,
    checkout: CheckoutController,
    detect_tx: mpsc::Sender<DetectionEvent>,
) {
    println!("smartcart console - commands: add/plus/minus/info <name>, detect <label> <conf>,");
    println!("                              list, total, clear, checkout, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            continue;
        };
        let arg = parts.next();

        match (command, arg) {
            ("add", Some(name)) => cart.add_item(name).await,
            ("plus", Some(name)) | ("+", Some(name)) => cart.increment(name).await,
            ("minus", Some(name)) | ("-", Some(name)) => cart.decrement(name).await,
            ("clear", _) => cart.remove_all().await,
            ("list", _) => {
                for item in cart.snapshot().await {
                    println!(
                        "  {} x {} @ {:.2} EUR = {:.2} EUR",
                        item.name, item.quantity, item.unit_price, item.line_total
                    );
                }
            }
            ("total", _) => println!("  Total: {:.2} EUR", cart.total().await),
            ("info", Some(name)) => {
                let info = cart.product_info(name).await;
                println!(
                    "  {name}: {:.2} EUR | fats {} | proteins {} | carbohydrates {}",
                    info.price, info.fats, info.proteins, info.carbohydrates
                );
            }
            ("detect", Some(label)) => {
                let confidence = parts
                    .next()
                    .and_then(|raw| raw.parse::<f32>().ok())
                    .unwrap_or(0.9);
                let event = DetectionEvent {
                    label: label.to_string(),
                    confidence,
                    timestamp: Utc::now(),
                };
                if detect_tx.send(event).await.is_err() {
                    println!("  detection feed is not running");
                }
            }
            ("checkout", _) => {
                if let Err(err) = checkout.begin_checkout().await {
                    println!("  {err}");
                }
            }
            ("quit", _) | ("exit", _) => break,
            _ => {
                error!("unknown command: {line}");
                println!("  unknown command: {line}");
            }
        }
    }
}
