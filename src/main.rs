//! Hitta Demo
//!
//! Plays a full two-device game in one process. Each device has its own
//! session and store; challenges travel between them as links, the way
//! players would send them over a messaging app.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use hitta::{
    game::{machine::SubmitOutcome, Phase},
    session::{FixedDetector, GameSession},
    share::{Delivery, Messenger, MessengerError, ShareConfig, ShareMessage},
    storage::FileStore,
    GameConfig, VERSION,
};

/// Labels the originators take turns photographing.
const TARGETS: &[&str] = &["bottle", "car", "book", "cup", "chair", "laptop", "apple", "dog", "bicycle", "vase"];

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Hitta v{}", VERSION);

    let config = match std::env::var_os("HITTA_CONFIG") {
        Some(path) => GameConfig::from_json_file(&path)
            .with_context(|| format!("loading config from {}", PathBuf::from(&path).display()))?,
        None => GameConfig::default(),
    };
    config.validate()?;
    info!("Rounds: {} s, win at {}", config.round_seconds, config.win_threshold);

    let data_dir = std::env::var_os("HITTA_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./hitta-data"));

    demo_game(config, data_dir).await
}

/// Messenger that hands the link straight to the other device.
#[derive(Default)]
struct Courier {
    link: Mutex<Option<String>>,
}

impl Courier {
    fn take(&self) -> Option<String> {
        self.link.lock().ok().and_then(|mut link| link.take())
    }
}

#[async_trait]
impl Messenger for Courier {
    fn name(&self) -> &'static str {
        "courier"
    }

    async fn send(&self, message: &ShareMessage) -> Result<Delivery, MessengerError> {
        let url = message.url.clone().ok_or(MessengerError::Failed {
            mechanism: "courier",
            reason: "message has no link".to_string(),
        })?;
        let mut slot = self.link.lock().map_err(|_| MessengerError::Unavailable("courier"))?;
        *slot = Some(url);
        Ok(Delivery::Shared {
            via: "courier".to_string(),
        })
    }
}

struct Device {
    name: &'static str,
    session: GameSession<FileStore>,
}

/// Play until someone wins.
async fn demo_game(config: GameConfig, data_dir: PathBuf) -> Result<()> {
    info!("=== Starting Demo Game ===");
    info!("Data directory: {}", data_dir.display());

    let share = ShareConfig::default();
    let mut originator = Device {
        name: "Alice",
        session: GameSession::open(FileStore::new(data_dir.join("alice")), config.clone(), share.clone()),
    };
    let mut finder = Device {
        name: "Bob",
        session: GameSession::open(FileStore::new(data_dir.join("bob")), config, share),
    };
    originator.session.start_new_game(originator.name).await?;

    let courier = Courier::default();
    for (round, label) in TARGETS.iter().cycle().enumerate().take(100) {
        info!("--- Round {}: {} challenges {} ---", round + 1, originator.name, finder.name);

        let target = originator
            .session
            .capture_target(&FixedDetector::seeing(label, 0.88), b"photo")
            .await?;
        let delivery = originator.session.send_challenge(target, &courier).await?;
        let link = match (delivery, courier.take()) {
            (Delivery::Shared { .. }, Some(link)) => link,
            (other, _) => bail!("challenge was not handed over: {other:?}"),
        };
        info!("Link: {}", link);

        // A round the finder never resolved is still running on their device.
        if finder.session.snapshot().await.phase == Phase::AwaitingMatch {
            finder.session.timeout().await?;
        }
        finder.session.join_from_link(&link, finder.name).await?;

        // Every third round the first photo shows the wrong thing.
        if round % 3 == 2 {
            let outcome = finder
                .session
                .capture_and_submit(&FixedDetector::seeing("umbrella", 0.9), b"photo")
                .await?;
            info!("{} photographed an umbrella: {:?}", finder.name, outcome);
        }

        let outcome = finder
            .session
            .capture_and_submit(&FixedDetector::seeing(label, 0.8), b"photo")
            .await?;
        match outcome {
            SubmitOutcome::Won { score, .. } => {
                info!("=== {} wins with {} ===", finder.name, score);
                break;
            }
            SubmitOutcome::Found { new_score, .. } => info!("{} now has {}", finder.name, new_score),
            SubmitOutcome::Rejected { .. } => bail!("{} failed to find a {}", finder.name, label),
        }
        std::mem::swap(&mut originator, &mut finder);
    }

    let state = finder.session.snapshot().await;
    info!("=== Final Score ===");
    info!("{}: {}", state.player1.name, state.player1.score);
    info!("{}: {}", state.player2.name, state.player2.score);

    finder.session.shutdown();
    originator.session.shutdown();
    Ok(())
}
