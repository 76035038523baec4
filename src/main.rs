use std::path::PathBuf;
use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use faces_input::config::{FacesConfig, LinkBackend};
use faces_input::face::keyboard::{CR, LF};
use faces_input::face::{FaceEvent, FaceKind, Faces, GamepadReport};
use faces_input::link::{BoxedLink, I2cLink, ScriptedLink};
use faces_input::session::{InputSession, SessionSettings};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

// How long the scripted demo runs before shutting itself down.
const DEMO_DURATION: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = FacesConfig::load(config_path.as_deref())
        .map_err(|e| eyre!("Failed to load config: {}", e))?;
    setup(config.level()?)?;

    info!("Starting {} face over {:?} link", config.kind, config.link.backend);
    let cancel = CancellationToken::new();

    let link = open_link(&config, &cancel)?;
    let mut session = InputSession::create(
        Faces::new(config.kind, link),
        Some(SessionSettings {
            poll_interval_ms: config.poll_interval_ms,
        }),
    );
    if let Some(pad) = session.gamepad_mut() {
        config
            .gamepad
            .apply(pad)
            .map_err(|e| eyre!("Invalid gamepad config: {}", e))?;
    }

    let session = match session.begin() {
        Ok(session) => session,
        Err(_) => {
            error!("Faces not found, is a {} attached?", config.kind);
            return Err(eyre!("{} not found", config.kind));
        }
    };

    let mut snapshots = session.subscribe();
    tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            if let Some(event) = snapshot.event {
                info!(
                    "{} {}",
                    snapshot.timestamp.format("%H:%M:%S.%3f"),
                    describe(event)
                );
            }
        }
    });

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Unable to listen for Ctrl-C: {}", e);
            return;
        }
        info!("Ctrl-C received, shutting down");
        shutdown.cancel();
    });

    if config.link.backend == LinkBackend::Scripted {
        let stop = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(DEMO_DURATION).await;
            stop.cancel();
        });
    }

    let faces = session.run(cancel).await;
    info!("{} session finished", faces.kind());
    Ok(())
}

fn setup(level: Level) -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    setup_logging_env(level);
    Ok(())
}

fn setup_logging_env(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

fn open_link(config: &FacesConfig, cancel: &CancellationToken) -> Result<BoxedLink> {
    match config.link.backend {
        LinkBackend::Scripted => Ok(Box::new(demo_script(config.kind))),
        LinkBackend::I2c => {
            let link = I2cLink::open(config.link.i2c.clone())
                .map_err(|e| eyre!("Failed to open I2C link: {}", e))?;
            Ok(Box::new(link))
        }
        #[cfg(feature = "gilrs")]
        LinkBackend::Gilrs => {
            let link = faces_input::link::GilrsLink::spawn(cancel.clone())
                .map_err(|e| eyre!("Failed to start gamepad backend: {}", e))?;
            Ok(Box::new(link))
        }
        #[cfg(not(feature = "gilrs"))]
        LinkBackend::Gilrs => {
            let _ = cancel;
            Err(eyre!("Built without the gilrs feature"))
        }
    }
}

// Canned input standing in for a real face.
fn demo_script(kind: FaceKind) -> ScriptedLink {
    let mut link = ScriptedLink::new();
    // begin() drains up to the first idle poll.
    link.push_idle();
    match kind {
        FaceKind::Keyboard => {
            link.push_bytes(b"Hello").push_bytes(&[CR, LF]).push_byte(0xB7);
        }
        FaceKind::Calculator => {
            link.push_bytes(b"12+34=").push_byte(0x01).push_byte(b'A');
        }
        FaceKind::Gamepad => {
            link.push_bitmask(0x10);
            for _ in 0..30 {
                link.push_idle();
            }
            link.push_bitmask(0x11);
            for _ in 0..10 {
                link.push_idle();
            }
            link.push_bitmask(0x00);
        }
    }
    link
}

fn describe(event: FaceEvent) -> String {
    match event {
        FaceEvent::Key(key) => format!("key {:?}", key),
        FaceEvent::Calculator(input) => format!("calculator {:?}", input),
        FaceEvent::Gamepad(GamepadReport {
            now,
            edge,
            release_edge,
            hold,
            hold_edge,
            repeat,
            ..
        }) => format!(
            "[{:02x}] [{:02x}] [{:02x}] [{:02x}] [{:02x}] [{:02x}]",
            now.bits(),
            edge.bits(),
            release_edge.bits(),
            hold.bits(),
            hold_edge.bits(),
            repeat.bits()
        ),
    }
}
