//! Plays one track of a YAML catalog on a Chromecast.
//!
//! Usage:
//!   cargo run -p pmocast --example cast_play -- <catalog.yaml> <media_id> [chromecast_ip]
//!
//! Without an IP, `receiver.host` from the pmocast configuration is used.
//! Events are printed until the track completes or an error occurs.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use crossbeam_channel::RecvTimeoutError;
use pmocast::media_id::extract_music_id;
use pmocast::{
    CastConfig, CastPlayback, InMemoryCatalog, MusicCatalog, Playback, PlaybackEvent,
    PlaybackEventBus, QueueItem, RustCastClient,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pmocast=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <catalog.yaml> <media_id> [chromecast_ip]", args[0]);
        std::process::exit(1);
    }

    let mut config = CastConfig::load("")?;
    if let Some(host) = args.get(3) {
        config.receiver.host = Some(host.clone());
    }

    let catalog = Arc::new(InMemoryCatalog::from_yaml_file(&args[1])?);
    println!("Catalog: {} tracks", catalog.len());

    let client = Arc::new(RustCastClient::from_config(&config)?);
    client.connect().context("Cannot reach the Chromecast")?;

    let playback = CastPlayback::from_config(client.clone(), catalog.clone(), &config);
    let bus = PlaybackEventBus::new();
    let events = bus.subscribe();
    playback.set_callback(Arc::new(bus));
    playback.start();

    let media_id = args[2].as_str();
    let mut item = QueueItem::new(media_id);
    if let Some(track) = catalog.music(extract_music_id(media_id)) {
        item = item.with_title(track.title.unwrap_or_default());
    }
    println!("Playing {}", item.title.as_deref().unwrap_or(media_id));
    playback.play(&item);

    let outcome = loop {
        match events.recv_timeout(Duration::from_secs(1)) {
            Ok(PlaybackEvent::StatusChanged(state)) => {
                println!(
                    "[{}] position {} ms",
                    state,
                    playback.current_stream_position()
                );
            }
            Ok(PlaybackEvent::MediaIdChanged(id)) => println!("Receiver switched to {id}"),
            Ok(PlaybackEvent::Completed) => break Ok(()),
            Ok(PlaybackEvent::Error(message)) => break Err(message),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break Ok(()),
        }
    };

    playback.stop(false);
    client.disconnect();

    match outcome {
        Ok(()) => {
            println!("Playback completed");
            Ok(())
        }
        Err(message) => bail!("Playback failed: {message}"),
    }
}
