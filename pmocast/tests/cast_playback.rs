mod common;

use std::sync::Arc;
use std::thread;

use common::{Failure, Harness};
use pmocast::cast_media::item_id_from;
use pmocast::{
    IdleReason, Playback, PlaybackEvent, PlaybackEventBus, PlaybackState, QueueItem,
    RemotePlayerState, UNKNOWN_POSITION,
};

#[test]
fn test_play_then_remote_playing() {
    let h = Harness::new();
    h.playback.start();

    h.playback.play(&QueueItem::new("track-42"));
    assert_eq!(h.playback.state(), PlaybackState::Buffering);
    assert_eq!(
        h.drain(),
        vec![PlaybackEvent::StatusChanged(PlaybackState::Buffering)]
    );

    let load = h.client.with(|s| s.loads.last().cloned()).unwrap();
    assert!(load.autoplay);
    assert_eq!(load.position_ms, 0);
    assert_eq!(load.info.content_id, "http://music.local/track-42.mp3");

    h.client.emit_status(RemotePlayerState::Playing, IdleReason::None);
    assert_eq!(h.playback.state(), PlaybackState::Playing);
    // Même media id côté receiver : pas de set_current_media_id
    assert_eq!(
        h.drain(),
        vec![PlaybackEvent::StatusChanged(PlaybackState::Playing)]
    );
}

#[test]
fn test_current_media_id_follows_last_successful_load() {
    let h = Harness::new();

    h.playback.play(&QueueItem::new("__BY_GENRE__/Jazz|track-7"));
    h.playback.play(&QueueItem::new("track-8"));
    assert_eq!(h.playback.current_media_id().as_deref(), Some("track-8"));

    h.playback.play(&QueueItem::new("unknown"));
    assert_eq!(h.playback.current_media_id().as_deref(), Some("track-8"));

    h.client.with(|s| s.failure = Some(Failure::Transient));
    h.playback.play(&QueueItem::new("track-42"));
    assert_eq!(h.playback.current_media_id().as_deref(), Some("track-8"));

    let events = h.drain();
    assert!(events.contains(&PlaybackEvent::Error("Invalid mediaId unknown".to_string())));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, PlaybackEvent::Error(_)))
            .count(),
        2
    );
    assert_eq!(h.client.with(|s| s.loads.len()), 2);
}

#[test]
fn test_failed_play_leaves_state_untouched() {
    let h = Harness::new();
    h.client.with(|s| s.failure = Some(Failure::NoConnection));

    h.playback.play(&QueueItem::new("track-42"));

    assert_eq!(h.playback.state(), PlaybackState::Idle);
    assert_eq!(
        h.drain(),
        vec![PlaybackEvent::Error(
            "No connection to the cast device".to_string()
        )]
    );
}

#[test]
fn test_position_while_disconnected_is_cached() {
    let h = Harness::new();
    h.client.with(|s| {
        s.connected = false;
        s.position_ms = 99_000;
    });

    h.playback.set_current_stream_position(12_345);
    assert_eq!(h.playback.current_stream_position(), 12_345);

    h.playback.update_last_known_stream_position();
    assert_eq!(h.playback.current_stream_position(), 12_345);
    assert_eq!(h.client.with(|s| s.position_queries), 0);
}

#[test]
fn test_position_while_connected_is_live() {
    let h = Harness::new();
    h.client.with(|s| s.position_ms = 31_000);
    assert_eq!(h.playback.current_stream_position(), 31_000);

    h.playback.update_last_known_stream_position();
    h.client.with(|s| s.connected = false);
    assert_eq!(h.playback.current_stream_position(), 31_000);
}

#[test]
fn test_position_query_failure_is_unknown() {
    let h = Harness::new();
    h.client.with(|s| s.failure = Some(Failure::Transient));
    assert_eq!(h.playback.current_stream_position(), UNKNOWN_POSITION);
    assert!(h.drain().is_empty());
}

#[test]
fn test_seek_without_media_id() {
    let h = Harness::new();
    h.playback.set_current_stream_position(500);

    h.playback.seek_to(10_000);

    assert_eq!(
        h.drain(),
        vec![PlaybackEvent::Error(
            "seekTo cannot be called in the absence of mediaId.".to_string()
        )]
    );
    assert_eq!(h.playback.state(), PlaybackState::Idle);
    assert_eq!(h.playback.current_media_id(), None);
    h.client.with(|s| {
        s.connected = false;
        assert!(s.seeks.is_empty());
        assert!(s.loads.is_empty());
    });
    assert_eq!(h.playback.current_stream_position(), 500);
}

#[test]
fn test_seek_on_loaded_media() {
    let h = Harness::new();
    h.playback.play(&QueueItem::new("track-42"));
    h.drain();

    h.playback.seek_to(42_000);

    h.client.with(|s| {
        assert_eq!(s.seeks, vec![42_000]);
        assert_eq!(s.loads.len(), 1);
        s.connected = false;
    });
    assert_eq!(h.playback.current_stream_position(), 42_000);
    assert!(h.drain().is_empty());
}

#[test]
fn test_seek_reloads_when_nothing_loaded() {
    let h = Harness::new();
    h.playback.set_current_media_id("track-7");

    h.playback.seek_to(65_000);

    let load = h.client.with(|s| s.loads.last().cloned()).unwrap();
    assert!(!load.autoplay);
    assert_eq!(load.position_ms, 65_000);
    assert_eq!(
        item_id_from(&load.custom_data).unwrap().as_deref(),
        Some("track-7")
    );
    assert!(h.drain().is_empty());
}

#[test]
fn test_pause_loaded_media_snapshots_position() {
    let h = Harness::new();
    h.playback.play(&QueueItem::new("track-42"));
    h.client.with(|s| s.position_ms = 7_500);

    h.playback.pause();

    h.client.with(|s| {
        assert_eq!(s.pauses, 1);
        s.connected = false;
    });
    assert_eq!(h.playback.current_stream_position(), 7_500);
}

#[test]
fn test_pause_reloads_without_autoplay() {
    let h = Harness::new();
    h.playback.set_current_media_id("track-8");
    h.playback.set_current_stream_position(3_000);

    h.playback.pause();

    let load = h.client.with(|s| s.loads.last().cloned()).unwrap();
    assert!(!load.autoplay);
    assert_eq!(load.position_ms, 3_000);
    assert_eq!(h.client.with(|s| s.pauses), 0);
}

#[test]
fn test_pause_errors_are_reported() {
    let h = Harness::new();

    h.playback.pause();
    assert_eq!(
        h.drain(),
        vec![PlaybackEvent::Error(
            "pause cannot be called in the absence of mediaId.".to_string()
        )]
    );

    h.playback.set_current_media_id("track-42");
    h.client.with(|s| s.failure = Some(Failure::Transient));
    h.playback.pause();
    assert_eq!(
        h.drain(),
        vec![PlaybackEvent::Error(
            "Transient network disconnection: socket closed".to_string()
        )]
    );
}

#[test]
fn test_remote_metadata_adopts_other_media_id() {
    let h = Harness::new();
    h.playback.start();
    h.playback.play(&QueueItem::new("track-42"));
    h.drain();

    // Un autre sender a chargé track-7 sur le receiver
    let other = h.client.with(|s| {
        let mut info = s.remote_info.clone().unwrap();
        info.custom_data = Some(serde_json::json!({"itemId": "track-7"}));
        s.remote_info = Some(info.clone());
        s.position_ms = 20_000;
        info
    });
    assert_eq!(other.custom_data.unwrap()["itemId"], "track-7");

    h.client.emit_metadata();

    assert_eq!(
        h.drain(),
        vec![PlaybackEvent::MediaIdChanged("track-7".to_string())]
    );
    assert_eq!(h.playback.current_media_id().as_deref(), Some("track-7"));
    h.client.with(|s| s.connected = false);
    assert_eq!(h.playback.current_stream_position(), 20_000);

    h.client.emit_metadata();
    assert!(h.drain().is_empty());
}

#[test]
fn test_remote_metadata_without_item_id_is_ignored() {
    let h = Harness::new();
    h.playback.start();
    h.playback.set_current_media_id("track-42");

    h.client.emit_metadata();
    h.client.with(|s| {
        s.remote_info = Some(pmocast::RemoteMediaInfo {
            content_id: "http://elsewhere/x.mp3".to_string(),
            content_type: "audio/mpeg".to_string(),
            stream_type: pmocast::remote::StreamType::Buffered,
            duration: None,
            metadata: None,
            custom_data: Some(serde_json::json!({"other": "value"})),
        })
    });
    h.client.emit_metadata();
    h.client.with(|s| {
        s.remote_info.as_mut().unwrap().custom_data = Some(serde_json::json!({"itemId": {"id": 3}}))
    });
    h.client.emit_metadata();

    assert!(h.drain().is_empty());
    assert_eq!(h.playback.current_media_id().as_deref(), Some("track-42"));
}

#[test]
fn test_remote_metadata_reads_numeric_item_id() {
    let h = Harness::new();
    h.playback.start();
    h.playback.play(&QueueItem::new("track-42"));
    h.drain();

    h.client.with(|s| {
        s.remote_info.as_mut().unwrap().custom_data = Some(serde_json::json!({"itemId": 7}))
    });
    h.client.emit_metadata();

    assert_eq!(
        h.drain(),
        vec![PlaybackEvent::MediaIdChanged("7".to_string())]
    );
    assert_eq!(h.playback.current_media_id().as_deref(), Some("7"));
}

#[test]
fn test_remote_paused_adopts_other_media_id() {
    let h = Harness::new();
    h.playback.start();
    h.playback.play(&QueueItem::new("track-42"));
    h.drain();

    h.client.with(|s| {
        s.remote_info.as_mut().unwrap().custom_data =
            Some(serde_json::json!({"itemId": "track-7"}));
        s.position_ms = 15_000;
    });
    h.client.emit_status(RemotePlayerState::Paused, IdleReason::None);

    assert_eq!(h.playback.state(), PlaybackState::Paused);
    assert_eq!(
        h.drain(),
        vec![
            PlaybackEvent::MediaIdChanged("track-7".to_string()),
            PlaybackEvent::StatusChanged(PlaybackState::Paused),
        ]
    );
    assert_eq!(h.playback.current_media_id().as_deref(), Some("track-7"));
    h.client.with(|s| s.connected = false);
    assert_eq!(h.playback.current_stream_position(), 15_000);
}

#[test]
fn test_remote_playing_adopts_other_media_id() {
    let h = Harness::new();
    h.playback.start();
    h.playback.set_current_media_id("track-8");
    h.client.with(|s| {
        s.remote_info = Some(pmocast::to_cast_media_info(
            &common::track("track-7"),
            &serde_json::json!({"itemId": "track-7"}),
            None,
        ));
        s.position_ms = 4_000;
    });

    h.client.emit_status(RemotePlayerState::Playing, IdleReason::None);

    assert_eq!(h.playback.state(), PlaybackState::Playing);
    assert_eq!(
        h.drain(),
        vec![
            PlaybackEvent::MediaIdChanged("track-7".to_string()),
            PlaybackEvent::StatusChanged(PlaybackState::Playing),
        ]
    );
    h.client.with(|s| s.connected = false);
    assert_eq!(h.playback.current_stream_position(), 4_000);
}

#[test]
fn test_idle_finished_signals_completion_only() {
    let h = Harness::new();
    h.playback.start();
    h.playback.set_state(PlaybackState::Playing);

    h.client.emit_status(RemotePlayerState::Idle, IdleReason::Finished);

    assert_eq!(h.drain(), vec![PlaybackEvent::Completed]);
    assert_eq!(h.playback.state(), PlaybackState::Playing);

    h.client.emit_status(RemotePlayerState::Idle, IdleReason::Cancelled);
    h.client.emit_status(RemotePlayerState::Unknown(42), IdleReason::None);
    assert!(h.drain().is_empty());
    assert_eq!(h.playback.state(), PlaybackState::Playing);
}

#[test]
fn test_remote_buffering_and_paused() {
    let h = Harness::new();
    h.playback.start();

    h.client.emit_status(RemotePlayerState::Buffering, IdleReason::None);
    assert_eq!(h.playback.state(), PlaybackState::Buffering);

    h.client.emit_status(RemotePlayerState::Paused, IdleReason::None);
    assert_eq!(h.playback.state(), PlaybackState::Paused);

    assert_eq!(
        h.drain(),
        vec![
            PlaybackEvent::StatusChanged(PlaybackState::Buffering),
            PlaybackEvent::StatusChanged(PlaybackState::Paused),
        ]
    );
}

#[test]
fn test_start_and_stop() {
    let h = Harness::new();
    h.playback.start();
    h.playback.start();
    assert_eq!(h.client.listener_count(), 1);
    assert!(h.playback.is_started());

    h.playback.stop(false);
    assert_eq!(h.client.listener_count(), 0);
    assert_eq!(h.playback.state(), PlaybackState::Stopped);
    assert!(h.drain().is_empty());

    // Plus de notifications après stop
    h.client.emit_status(RemotePlayerState::Playing, IdleReason::None);
    assert_eq!(h.playback.state(), PlaybackState::Stopped);

    h.playback.start();
    h.playback.stop(true);
    assert_eq!(
        h.drain(),
        vec![PlaybackEvent::StatusChanged(PlaybackState::Stopped)]
    );
}

#[test]
fn test_connectivity_queries() {
    let h = Harness::new();
    assert!(h.playback.is_connected());
    assert!(!h.playback.is_playing());

    h.playback.play(&QueueItem::new("track-42"));
    assert!(h.playback.is_playing());

    h.client.with(|s| s.failure = Some(Failure::Transient));
    assert!(!h.playback.is_playing());

    h.client.with(|s| {
        s.failure = None;
        s.connected = false;
    });
    assert!(!h.playback.is_connected());
    assert!(!h.playback.is_playing());
}

#[test]
fn test_set_callback_replaces_previous() {
    let h = Harness::new();
    let bus = PlaybackEventBus::new();
    let second = bus.subscribe();
    h.playback.set_callback(Arc::new(bus));

    h.playback.stop(true);

    assert!(h.drain().is_empty());
    assert_eq!(
        second.try_recv().unwrap(),
        PlaybackEvent::StatusChanged(PlaybackState::Stopped)
    );
}

#[test]
fn test_concurrent_host_calls_and_notifications() {
    let h = Harness::new();
    h.playback.start();

    let notifier = {
        let client = h.client.clone();
        thread::spawn(move || {
            for i in 0..200 {
                let state = if i % 2 == 0 {
                    RemotePlayerState::Playing
                } else {
                    RemotePlayerState::Paused
                };
                client.emit_status(state, IdleReason::None);
            }
        })
    };

    for i in 0..100 {
        h.playback.play(&QueueItem::new("track-42"));
        h.playback.seek_to(i * 1_000);
    }
    notifier.join().unwrap();

    assert_eq!(h.playback.current_media_id().as_deref(), Some("track-42"));
    h.client.with(|s| s.connected = false);
    assert_eq!(h.playback.current_stream_position(), 99_000);
}
