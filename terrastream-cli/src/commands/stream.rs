//! `stream` command: select tiles for a camera and download them through one
//! layer until it settles.

use clap::Args;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use terrastream::config::{LayerSettings, StreamingConfig};
use terrastream::coord::TileAddress;
use terrastream::decode::ResourceKind;
use terrastream::layer::{
    ChannelListener, Layer, LayerDaemon, LayerEvent, LayerId, LayerStats,
    DEFAULT_COMMAND_CHANNEL_CAPACITY,
};
use terrastream::lod::{LodSelector, Wishlist};
use terrastream::provider::AsyncReqwestClient;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{load_config, CameraArgs};
use crate::error::CliError;

/// Failures listed individually before the rest are summarized.
const MAX_LISTED_FAILURES: usize = 5;

/// Arguments for the stream command.
#[derive(Debug, Args)]
pub struct StreamArgs {
    #[command(flatten)]
    pub camera: CameraArgs,

    /// Stream a `[layer.<name>]` section from the config file
    #[arg(long, conflicts_with = "template")]
    pub layer: Option<String>,

    /// URL template with {x}, {y}, {z}, {quadkey} or {resolution} tokens
    #[arg(long)]
    pub template: Option<String>,

    /// Resource kind served by --template
    #[arg(long, default_value = "imagery")]
    pub kind: ResourceKind,

    /// Samples per side for elevation tiles, or pixel size for imagery
    #[arg(long)]
    pub resolution: Option<u32>,

    /// Finest level to select (overrides [lod] max_level)
    #[arg(long)]
    pub max_level: Option<u8>,

    /// Give up after this many seconds
    #[arg(long, default_value = "120")]
    pub timeout: u64,
}

/// Run the stream command.
pub fn run(args: StreamArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let settings = resolve_layer(&args, &config)?;
    let camera = args.camera.camera()?;

    let mut lod = config.lod_config();
    if let Some(max_level) = args.max_level {
        let min_level = lod.min_level.min(max_level);
        lod = lod.with_levels(min_level, max_level);
    }
    let mut selector = LodSelector::new(lod);
    let wishlist = selector.select(&camera);

    println!(
        "Streaming {} layer '{}' from {}",
        settings.kind, settings.name, settings.url_template
    );
    println!("Selected {} tiles", wishlist.len());

    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
    runtime.block_on(stream(&config, &settings, wishlist, args.timeout))
}

/// Picks the layer to stream: a named config section or an ad-hoc template.
pub fn resolve_layer(
    args: &StreamArgs,
    config: &StreamingConfig,
) -> Result<LayerSettings, CliError> {
    let mut settings = match (&args.layer, &args.template) {
        (Some(name), _) => config.layer(name).cloned().ok_or_else(|| {
            CliError::Usage(format!("No [layer.{}] section in the config file", name))
        })?,
        (None, Some(template)) => LayerSettings::new("cli", args.kind, template.clone()),
        (None, None) => config.layers.first().cloned().ok_or_else(|| {
            CliError::Usage(
                "No layer configured. Pass --template or add a [layer.<name>] section."
                    .to_string(),
            )
        })?,
    };

    if let Some(resolution) = args.resolution {
        if resolution == 0 {
            return Err(CliError::Usage("--resolution must be at least 1".to_string()));
        }
        settings.resolution = resolution;
    }
    Ok(settings)
}

async fn stream(
    config: &StreamingConfig,
    settings: &LayerSettings,
    wishlist: Wishlist,
    timeout_secs: u64,
) -> Result<(), CliError> {
    let client = Arc::new(AsyncReqwestClient::with_timeout(
        config.scheduler.timeout_secs,
    )?);
    let mut layer = Layer::new(LayerId(0), config.layer_config(settings), client)?;
    let (listener, mut events) = ChannelListener::new();
    layer.add_listener(Box::new(listener));

    let (daemon, handle) = LayerDaemon::new(layer, DEFAULT_COMMAND_CHANNEL_CAPACITY);
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(daemon.run(shutdown.clone()));

    let started = Instant::now();
    handle.request(wishlist).await?;
    let settled = tokio::time::timeout(Duration::from_secs(timeout_secs), handle.settle()).await;

    shutdown.cancel();
    if let Err(e) = task.await {
        warn!(error = %e, "Layer daemon task failed");
    }
    let elapsed = started.elapsed();

    let stats = match settled {
        Ok(result) => result?,
        Err(_) => {
            print!("{}", format_stats(&handle.latest_stats(), elapsed));
            return Err(CliError::Timeout {
                secs: timeout_secs,
            });
        }
    };
    info!(elapsed_ms = elapsed.as_millis() as u64, "Layer settled");

    let tally = EventTally::drain(&mut events);
    print!("{}", format_stats(&stats, elapsed));
    print!("{}", tally.summary());
    Ok(())
}

/// Counts of the events a layer reported.
#[derive(Debug, Default)]
pub struct EventTally {
    pub done: usize,
    pub bytes: usize,
    pub released: usize,
    pub failures: Vec<(TileAddress, String)>,
}

impl EventTally {
    pub fn drain(events: &mut mpsc::UnboundedReceiver<LayerEvent>) -> Self {
        let mut tally = Self::default();
        while let Ok(event) = events.try_recv() {
            tally.record(&event);
        }
        tally
    }

    pub fn record(&mut self, event: &LayerEvent) {
        match event {
            LayerEvent::Done { data, .. } => {
                self.done += 1;
                self.bytes += data.byte_size();
            }
            LayerEvent::Failed { address, error } => {
                self.failures.push((*address, error.to_string()));
            }
            LayerEvent::Released { .. } => self.released += 1,
        }
    }

    pub fn summary(&self) -> String {
        let mut out = format!(
            "Downloaded {} tiles ({} bytes), {} failed, {} released\n",
            self.done,
            self.bytes,
            self.failures.len(),
            self.released
        );
        for (address, error) in self.failures.iter().take(MAX_LISTED_FAILURES) {
            out.push_str(&format!("  {}: {}\n", address, error));
        }
        if self.failures.len() > MAX_LISTED_FAILURES {
            out.push_str(&format!(
                "  ... {} more failures\n",
                self.failures.len() - MAX_LISTED_FAILURES
            ));
        }
        out
    }
}

fn format_stats(stats: &LayerStats, elapsed: Duration) -> String {
    let s = &stats.scheduler;
    format!(
        "Elapsed:    {:.2}s\n\
         Dispatched: {} (completed {}, failed {}, cancelled {})\n\
         Pending:    {} queued, {} in flight\n\
         Cache:      {}/{} tiles, {} evictions\n",
        elapsed.as_secs_f64(),
        s.dispatched,
        s.completed,
        s.failed,
        s.cancelled,
        s.queued,
        s.in_flight,
        stats.cache.entries,
        stats.cache.capacity,
        stats.cache.evictions,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrastream::lod::DEFAULT_FOV_Y_DEGREES;
    use terrastream::loader::FetchError;
    use terrastream::provider::ProviderError;

    fn args() -> StreamArgs {
        StreamArgs {
            camera: CameraArgs {
                lat: 0.0,
                lon: 0.0,
                height: 1_000_000.0,
                fov: DEFAULT_FOV_Y_DEGREES,
                aspect: 1.5,
            },
            layer: None,
            template: None,
            kind: ResourceKind::Imagery,
            resolution: None,
            max_level: None,
            timeout: 10,
        }
    }

    #[test]
    fn test_resolve_template_layer() {
        let mut a = args();
        a.template = Some("https://t/{z}/{x}/{y}".to_string());
        a.kind = ResourceKind::Elevation;
        a.resolution = Some(33);
        let layer = resolve_layer(&a, &StreamingConfig::default()).unwrap();
        assert_eq!(layer.kind, ResourceKind::Elevation);
        assert_eq!(layer.resolution, 33);
    }

    #[test]
    fn test_resolve_named_layer() {
        let mut config = StreamingConfig::default();
        config
            .layers
            .push(LayerSettings::new("dem", ResourceKind::Elevation, "https://d/{z}/{x}/{y}"));

        let mut a = args();
        a.layer = Some("dem".to_string());
        assert_eq!(resolve_layer(&a, &config).unwrap().name, "dem");

        a.layer = Some("osm".to_string());
        assert!(matches!(resolve_layer(&a, &config), Err(CliError::Usage(_))));
    }

    #[test]
    fn test_resolve_without_any_layer() {
        assert!(matches!(
            resolve_layer(&args(), &StreamingConfig::default()),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn test_tally_summary() {
        let mut tally = EventTally::default();
        tally.record(&LayerEvent::Released {
            address: TileAddress::new(0, 0, 1),
        });
        for x in 0..7 {
            tally.record(&LayerEvent::Failed {
                address: TileAddress::new(x, 0, 3),
                error: FetchError::Network(ProviderError::HttpError("refused".into())),
            });
        }

        let summary = tally.summary();
        assert!(summary.starts_with("Downloaded 0 tiles (0 bytes), 7 failed, 1 released"));
        assert!(summary.contains("3/0/0: Network failure"));
        assert!(summary.contains("... 2 more failures"));
    }
}
