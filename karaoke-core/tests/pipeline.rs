use async_trait::async_trait;
use karaoke_core::audio::mock::{AudioCall, MockAudioDriver};
use karaoke_core::{
    resolve_audio_file, shared, AudioSettings, ClockState, CoreError, Frame, FrameSink,
    KaraokeConfig, LyricsLoader, NullAudioDriver, PlaybackController, SyncEvent, SyncLoop,
    SyncOutcome,
};
use parking_lot::Mutex;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const SONG_JSON: &str = r#"{
    "title": "Twinkle Twinkle",
    "artist": "Traditional",
    "sentences": {
        "1": [
            { "time": 0, "text": "Twinkle" },
            { "time": 500, "text": "twinkle" },
            { "time": 1000, "text": "little" },
            { "time": 1500, "text": "star" }
        ],
        "2": [
            { "time": 3000, "text": "How" },
            { "time": 3500, "text": "I" },
            { "time": 4000, "text": "wonder" }
        ]
    }
}"#;

#[derive(Clone, Default)]
struct Recorder {
    frames: Arc<Mutex<Vec<Frame>>>,
}

#[async_trait]
impl FrameSink for Recorder {
    async fn render(&mut self, frame: &Frame) -> karaoke_core::Result<()> {
        self.frames.lock().push(frame.clone());
        Ok(())
    }
}

fn lyrics_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("twinkle.json"), SONG_JSON).unwrap();
    dir
}

#[tokio::test(start_paused = true)]
async fn test_visual_only_song_plays_to_the_end() {
    let dir = lyrics_dir();
    let config = KaraokeConfig::default();
    let song = Arc::new(LyricsLoader::new(dir.path()).load_song("twinkle").unwrap());
    assert_eq!(song.total_duration(), 5000);

    let controller = Arc::new(PlaybackController::new(
        shared(NullAudioDriver::default()),
        AudioSettings::default(),
    ));
    controller.play(Duration::ZERO).unwrap();

    let sync = SyncLoop::new(
        song,
        controller.clone(),
        config.timing(),
        config.playback.refresh_rate_hz,
        None,
    );
    let mut events = sync.subscribe();
    let recorder = Recorder::default();

    let outcome = sync.start(Box::new(recorder.clone())).join().await;
    assert_eq!(outcome, SyncOutcome::Finished);
    assert_eq!(controller.state(), ClockState::Stopped);

    assert!(matches!(events.try_recv(), Ok(SyncEvent::Started { .. })));
    assert!(matches!(events.try_recv(), Ok(SyncEvent::Finished { .. })));
    assert!(events.try_recv().is_err());

    let frames = recorder.frames.lock();
    let key_at = |ms: u64| {
        frames
            .iter()
            .find(|f| f.elapsed_ms() >= ms)
            .and_then(|f| f.current.as_ref().map(|s| s.key().to_string()))
    };
    assert_eq!(key_at(1000).as_deref(), Some("1"));
    // Between sentence 1's tail (2500) and sentence 2 (3000)
    assert_eq!(key_at(2700), None);
    assert_eq!(key_at(3200).as_deref(), Some("2"));

    let gap = frames.iter().find(|f| f.elapsed_ms() >= 2700).unwrap();
    assert_eq!(gap.next.as_ref().map(|s| s.key()), Some("2"));
    assert_eq!(gap.previous.as_ref().map(|s| s.key()), Some("1"));
}

#[tokio::test(start_paused = true)]
async fn test_audio_follows_pause_seek_and_quit() {
    let lyrics = lyrics_dir();
    let audio_dir = TempDir::new().unwrap();
    fs::write(audio_dir.path().join("twinkle.ogg"), b"").unwrap();
    let audio_path = resolve_audio_file(audio_dir.path(), "twinkle").unwrap();

    let driver = MockAudioDriver::working();
    let log = driver.log();
    let controller = Arc::new(PlaybackController::new(
        shared(driver),
        AudioSettings {
            enabled: true,
            volume: 0.5,
        },
    ));
    controller.load_audio(&audio_path).unwrap();
    controller.play(Duration::from_millis(1000)).unwrap();

    let song = Arc::new(LyricsLoader::new(lyrics.path()).load_song("twinkle").unwrap());
    let sync = SyncLoop::new(song, controller.clone(), Default::default(), 10, None);
    let handle = sync.start(Box::new(Recorder::default()));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(controller.toggle_pause().await.unwrap(), ClockState::Paused);
    assert_eq!(controller.seek_by(2000).unwrap(), Duration::from_millis(3500));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(sync.is_running());
    assert_eq!(controller.elapsed(), Duration::from_millis(3500));

    assert_eq!(handle.stop().await, SyncOutcome::Cancelled);
    assert!(!controller.is_polling());

    assert_eq!(
        log.calls(),
        vec![
            AudioCall::Load(audio_path),
            AudioCall::SetVolume(0.5),
            AudioCall::Play(Duration::from_millis(1000)),
            AudioCall::Pause,
            AudioCall::Seek(Duration::from_millis(3500)),
            AudioCall::Stop,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_failing_audio_keeps_lyrics_running() {
    let lyrics = lyrics_dir();
    let controller = Arc::new(PlaybackController::new(
        shared(MockAudioDriver::failing()),
        AudioSettings {
            enabled: true,
            volume: 0.7,
        },
    ));
    controller.load_audio(std::path::Path::new("twinkle.mp3")).unwrap();

    let err = controller.play(Duration::ZERO).unwrap_err();
    assert!(matches!(err, CoreError::Audio(_)));
    assert_eq!(controller.state(), ClockState::Playing);

    let song = Arc::new(LyricsLoader::new(lyrics.path()).load_song("twinkle").unwrap());
    let sync = SyncLoop::new(song, controller, Default::default(), 10, None);
    assert_eq!(
        sync.start(Box::new(Recorder::default())).join().await,
        SyncOutcome::Finished
    );
}

#[test]
fn test_missing_song_is_reported() {
    let dir = lyrics_dir();
    let loader = LyricsLoader::new(dir.path());
    assert_eq!(loader.list_available_songs().unwrap(), vec!["twinkle"]);

    let err = loader.load_song("missing").unwrap_err();
    assert!(matches!(err, CoreError::LyricsNotFound { .. }));
}
