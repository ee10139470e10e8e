use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use autobill::{
    BillRecorder, FeedController, FinalizeOutcome, FixedClassifier, KioskConfig, KioskController,
    KioskEvent, PriceCatalog, SerialSensorPort, StepOutcome, StillFrameSource, WeightSampler,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("autobill.json"));
    let config = KioskConfig::load(&config_path)?;

    info!("autobill starting up (config: {})", config_path.display());

    // No session can run without prices; bail out before touching hardware.
    let catalog = match PriceCatalog::load(&config.price_file) {
        Ok(catalog) => Arc::new(catalog),
        Err(err) => {
            error!("cannot start without a price list: {err}");
            std::process::exit(1);
        }
    };
    if catalog.is_empty() {
        warn!(
            "price list {} has a header but no items; every sale will bill at zero",
            config.price_file.display()
        );
    }
    info!(
        "loaded {} priced items from {}",
        catalog.len(),
        config.price_file.display()
    );

    let port = Arc::new(SerialSensorPort::new(
        config.sensor_port.clone(),
        config.sensor_baud,
        config.sensor_settle(),
        config.sensor_read_timeout(),
    ));
    let sampler = Arc::new(WeightSampler::new(port, config.sample_count));
    let sink = Arc::new(BillRecorder::new(
        config.ledger_file.clone(),
        config.receipt_dir.clone(),
    ));
    let classifier = Arc::new(FixedClassifier::new(
        config.stub_label.clone(),
        config.stub_confidence,
    ));

    let mut feed = FeedController::start(
        Box::new(StillFrameSource::new(config.feed_frame.clone())),
        config.feed_interval(),
    );

    let kiosk = KioskController::new(catalog, classifier, sampler, sink, feed.handle());

    let printer = spawn_event_printer(&kiosk);

    println!("Ready. Commands: capture | weigh | finalize | reset | status | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => {}
            "capture" => report_step(kiosk.capture().await),
            "weigh" => report_step(kiosk.weigh().await),
            "finalize" => report_finalize(kiosk.finalize().await),
            "reset" => {
                kiosk.reset().await;
                println!("System reset. Ready for new item.");
            }
            "status" => {
                let snapshot = kiosk.snapshot().await;
                println!(
                    "session {} status {:?} item {:?} weight {:?} actions {:?}",
                    snapshot.id,
                    snapshot.status,
                    snapshot.item.map(|item| item.label),
                    snapshot.weight_kg,
                    snapshot.actions
                );
            }
            "quit" | "exit" => break,
            other => {
                println!("unknown command `{other}`; try capture | weigh | finalize | reset | status | quit")
            }
        }
    }

    feed.stop().await?;
    printer.abort();
    Ok(())
}

fn spawn_event_printer(kiosk: &KioskController) -> tokio::task::JoinHandle<()> {
    let mut events = kiosk.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(KioskEvent::BillFinalized { bill }) => {
                    println!("{}", bill.render_text());
                    println!("Press RESET to begin a new scan.");
                }
                Ok(KioskEvent::PriceNotFound { item_id }) => {
                    println!("! no price listed for '{item_id}'; billing at zero");
                }
                Ok(KioskEvent::RecordFailed { message }) => {
                    println!("! recording failed: {message} (type `finalize` to retry)");
                }
                Ok(KioskEvent::SessionChanged { snapshot }) => {
                    info!("session {} -> {:?}", snapshot.id, snapshot.status);
                }
                Err(RecvError::Lagged(skipped)) => {
                    info!("event printer lagged, skipped {skipped} events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn report_step(result: Result<StepOutcome>) {
    match result {
        Ok(StepOutcome::Applied(snapshot)) => {
            println!("ok: status {:?}, next: {:?}", snapshot.status, snapshot.actions)
        }
        Ok(StepOutcome::Discarded) => println!("reading arrived after a reset; discarded"),
        Err(err) => println!("error: {err:#}"),
    }
}

fn report_finalize(outcome: FinalizeOutcome) {
    match outcome {
        FinalizeOutcome::Finalized(bill) => {
            println!("recorded: {}", bill.ledger_row().trim_end())
        }
        FinalizeOutcome::AlreadyFinalized => println!("bill already recorded; reset to continue"),
        FinalizeOutcome::NotReady => println!("need both an item and a weight first"),
        FinalizeOutcome::Failed { errors } => {
            for err in errors {
                println!("error: {err}");
            }
        }
    }
}
