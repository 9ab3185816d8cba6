//! Runs a primary and a companion in one process over an in-process link.
//!
//! Usage: skyclock-pair [--json] [--config <path>] [--seconds <n>] [--area <id>]

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use skyclock_core::{AreaId, SkyError, SkyResult};
use skyclock_runtime::{
    init_tracing, run_role, Companion, Primary, RoleEvent, RoleInputs, RuntimeConfig,
    StaticProvider,
};
use skyclock_state::MemoryStore;
use skyclock_time::{SystemWallClock, WallClock};
use skyclock_transport::PeerLink;

struct Args {
    json: bool,
    config: Option<PathBuf>,
    seconds: u64,
    area: i32,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> SkyResult<Self> {
        let mut parsed = Args {
            json: false,
            config: None,
            seconds: 10,
            area: 4,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--json" => parsed.json = true,
                "--config" => parsed.config = Some(PathBuf::from(value(&mut args, &arg)?)),
                "--seconds" => parsed.seconds = number(&mut args, &arg)?,
                "--area" => parsed.area = number(&mut args, &arg)?,
                other => return Err(SkyError::Config(format!("unknown argument {}", other))),
            }
        }
        Ok(parsed)
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> SkyResult<String> {
    args.next()
        .ok_or_else(|| SkyError::Config(format!("{} needs a value", flag)))
}

fn number<T: std::str::FromStr>(args: &mut impl Iterator<Item = String>, flag: &str) -> SkyResult<T> {
    let raw = value(args, flag)?;
    raw.parse()
        .map_err(|_| SkyError::Config(format!("{}: not a number: {}", flag, raw)))
}

/// Wall hour and minute of `now_millis` in UTC. Time zones stay with the
/// host platform.
fn utc_hour_minute(now_millis: i64) -> (u32, u32) {
    let since_epoch = Duration::from_millis(now_millis.max(0) as u64);
    let minutes = since_epoch.as_secs() / 60;
    ((minutes / 60 % 24) as u32, (minutes % 60) as u32)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1))?;
    init_tracing(args.json)?;

    let config = match &args.config {
        Some(path) => RuntimeConfig::from_path(path)?,
        None => RuntimeConfig::default(),
    };
    info!(?config, "configuration loaded");

    let store = MemoryStore::new();
    let (companion_end, primary_end) = PeerLink::pair();

    let mut companion = Companion::new(&config, store.clone(), companion_end.link);
    let mut primary = Primary::new(&config, store, primary_end.link, StaticProvider::new(24));

    if let Err(e) = companion
        .protocol()
        .ensure_connected(config.connect_timeout())
        .await
    {
        warn!(error = %e, "starting without a reachable primary");
    }

    let (companion_tx, companion_rx) = mpsc::unbounded_channel();
    let (primary_tx, primary_rx) = mpsc::unbounded_channel();

    let companion_inputs = RoleInputs {
        inbox: companion_end.inbox,
        changes: companion.subscribe(),
        control: companion_rx,
    };
    let primary_inputs = RoleInputs {
        inbox: primary_end.inbox,
        changes: primary.subscribe(),
        control: primary_rx,
    };

    let companion_task = tokio::spawn(async move {
        let stats = run_role(&mut companion, &SystemWallClock, companion_inputs).await;
        (companion, stats)
    });
    let primary_task = tokio::spawn(async move {
        let stats = run_role(&mut primary, &SystemWallClock, primary_inputs).await;
        (primary, stats)
    });

    primary_tx.send(RoleEvent::AreaSelected(AreaId::new(args.area)))?;
    tokio::time::sleep(Duration::from_secs(args.seconds)).await;

    companion_tx.send(RoleEvent::Shutdown)?;
    primary_tx.send(RoleEvent::Shutdown)?;
    let (companion, companion_stats) = companion_task.await?;
    let (primary, primary_stats) = primary_task.await?;

    let now = SystemWallClock.now_millis();
    let (local_hour, local_minute) = utc_hour_minute(now);
    let face = companion.face(now, local_hour, local_minute);

    info!(
        world = %face.world_readout,
        local = %face.local_readout,
        windows = ?face.window_ids,
        forecast = ?companion.visible_forecast(now),
        area = %companion.area(),
        "final face"
    );
    info!(?companion_stats, stats = ?companion.stats(), "companion done");
    info!(?primary_stats, stats = ?primary.stats(), "primary done");
    Ok(())
}
