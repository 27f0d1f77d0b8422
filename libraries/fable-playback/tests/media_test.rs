//! Video and background music integration tests
//!
//! Tests:
//! - Delayed video load, two-cycle completion, stop on last frame
//! - Fallback timer and load failure
//! - Auto-advance waits for both narration and video
//! - Resume nudge after video start
//! - Language change keeps the page's video
//! - Background music lifetime, toggles and volume ceiling

mod common;

use common::*;
use fable_core::{Language, MediaRef, Page};
use fable_playback::{MediaEvent, MediaKind, PlaybackConfig, PlaybackEvent, Track};

fn video_page(index: usize) -> Page {
    Page::new(index).with_video(MediaRef::new(format!("p{index}.mp4")))
}

// ============================================================================
// Video
// ============================================================================

#[test]
fn test_video_load_is_delayed() {
    let mut h = HarnessBuilder::new(vec![video_page(0), Page::new(1)]).open();

    h.advance_to(499);
    assert!(h.platform.loads_of(MediaKind::Video).is_empty());

    h.advance_to(500);
    assert_eq!(h.platform.loads_of(MediaKind::Video), vec!["p0.mp4"]);
    assert!(!h.session.is_video_visible());

    h.advance_to(600);
    h.ready("p0.mp4");
    assert!(h.session.is_video_visible());
    assert!(h.has_event(&PlaybackEvent::VideoVisibilityChanged { visible: true }));
}

#[test]
fn test_video_completes_after_first_cycle_and_stops_after_second() {
    let mut h = HarnessBuilder::new(vec![video_page(0), Page::new(1)]).open();
    h.advance_to(600);
    h.ready("p0.mp4");

    h.advance_to(3000);
    h.end("p0.mp4");
    assert!(h.has_event(&PlaybackEvent::VideoCompleted { page: 0 }));
    assert!(h.platform.is_playing("p0.mp4"));
    assert_eq!(h.session.pending_advance(), Some(h.ms(3400)));

    h.advance_to(3200);
    h.end("p0.mp4");
    assert!(!h.platform.is_playing("p0.mp4"));
    let completions = h
        .events
        .iter()
        .filter(|e| matches!(e, PlaybackEvent::VideoCompleted { .. }))
        .count();
    assert_eq!(completions, 1);

    let clip = h.platform.clip_for("p0.mp4");
    h.advance_to(3400);
    assert_eq!(h.session.current_page(), 1);
    assert!(h.platform.clip(clip).released);
}

#[test]
fn test_video_fallback_forces_completion() {
    let mut h = HarnessBuilder::new(vec![video_page(0), Page::new(1)]).open();

    // Loads but never becomes ready
    h.advance_to(9999);
    assert_eq!(h.session.pending_advance(), None);

    h.advance_to(10_000);
    assert!(h.has_event(&PlaybackEvent::VideoCompleted { page: 0 }));
    assert_eq!(h.session.pending_advance(), Some(h.ms(10_400)));
}

#[test]
fn test_video_failure_completes_immediately() {
    let mut h = HarnessBuilder::new(vec![video_page(0), Page::new(1)]).open();
    h.advance_to(700);

    h.fail("p0.mp4");
    assert!(!h.session.is_video_visible());
    assert!(h.has_event(&PlaybackEvent::VideoCompleted { page: 0 }));
    assert_eq!(h.session.pending_advance(), Some(h.ms(3400)));
}

#[test]
fn test_advance_waits_for_narration_and_video() {
    let page = narrated_page(0, 1).with_video(MediaRef::new("p0.mp4"));
    let mut h = HarnessBuilder::new(vec![page, Page::new(1)]).open();

    h.ready("p0s0.ko.mp3");
    h.advance_to(600);
    h.ready("p0.mp4");
    h.advance_to(1000);
    h.end("p0s0.ko.mp3");
    assert!(h.has_event(&PlaybackEvent::NarrationCompleted { page: 0 }));
    assert_eq!(h.session.pending_advance(), None);

    h.advance_to(6000);
    h.end("p0.mp4");
    assert_eq!(h.session.pending_advance(), Some(h.ms(6400)));

    // Fallback was cancelled by the natural completion
    h.advance_to(10_000);
    assert_eq!(h.session.current_page(), 1);
}

#[test]
fn test_video_start_nudges_paused_audio() {
    let page = narrated_page(0, 1).with_video(MediaRef::new("p0.mp4"));
    let mut h = HarnessBuilder::new(vec![page, Page::new(1)])
        .bgm("bgm.mp3")
        .open();
    h.ready("p0s0.ko.mp3");
    h.advance_to(600);
    h.ready("p0.mp4");

    // Starting the video stole the media session
    h.platform.interrupt("p0s0.ko.mp3");
    h.platform.interrupt("bgm.mp3");

    h.advance_to(800);
    assert!(h.platform.is_playing("p0s0.ko.mp3"));
    assert!(h.platform.is_playing("bgm.mp3"));
}

#[test]
fn test_page_change_hides_video() {
    let mut h = HarnessBuilder::new(vec![video_page(0), video_page(1)]).open();
    h.advance_to(600);
    h.ready("p0.mp4");
    let old = h.platform.clip_for("p0.mp4");

    h.with_session(|s, now| s.next(now));
    assert!(!h.session.is_video_visible());

    // Late event for the old clip changes nothing
    h.deliver(MediaEvent::ended(old));
    assert!(!h.has_event(&PlaybackEvent::VideoCompleted { page: 0 }));

    h.advance_to(1099);
    assert_eq!(h.platform.loads_of(MediaKind::Video).len(), 1);
    h.advance_to(1100);
    assert_eq!(h.platform.loads_of(MediaKind::Video), vec!["p0.mp4", "p1.mp4"]);
}

#[test]
fn test_language_change_keeps_finished_video() {
    let mut h = HarnessBuilder::new(vec![video_page(0), Page::new(1)]).open();
    h.advance_to(600);
    h.ready("p0.mp4");
    h.advance_to(1000);
    h.end("p0.mp4");
    assert_eq!(h.session.pending_advance(), Some(h.ms(3400)));

    h.advance_to(1500);
    h.with_session(|s, now| s.set_language(Language::En, now));
    assert_eq!(h.session.pending_advance(), Some(h.ms(3400)));
    assert_eq!(h.platform.loads_of(MediaKind::Video), vec!["p0.mp4"]);
    assert!(h.session.is_video_visible());

    // Second cycle still stops on the last frame
    h.advance_to(2000);
    h.end("p0.mp4");
    assert!(!h.platform.is_playing("p0.mp4"));

    h.advance_to(4000);
    assert_eq!(h.session.current_page(), 1);
}

#[test]
fn test_language_change_keeps_loading_video() {
    let mut h = HarnessBuilder::new(vec![video_page(0), Page::new(1)]).open();
    h.advance_to(200);
    h.with_session(|s, now| s.set_language(Language::En, now));

    h.advance_to(500);
    assert_eq!(h.platform.loads_of(MediaKind::Video), vec!["p0.mp4"]);
    h.advance_to(700);
    h.ready("p0.mp4");
    assert!(h.session.is_video_visible());

    // Fallback still counts from page entry
    h.advance_to(10_000);
    assert!(h.has_event(&PlaybackEvent::VideoCompleted { page: 0 }));
    assert_eq!(h.session.pending_advance(), Some(h.ms(10_400)));
}

// ============================================================================
// Background music
// ============================================================================

#[test]
fn test_music_starts_under_ceiling() {
    let h = HarnessBuilder::new(vec![Page::new(0)]).bgm("bgm.mp3").open();

    let clip = h.platform.clip_for("bgm.mp3");
    let music = h.platform.clip(clip);
    assert!(music.playing);
    // 30% of the 0.2 ceiling
    assert!((music.volume - 0.06).abs() < 1e-6);
}

#[test]
fn test_music_survives_page_changes() {
    let mut h = HarnessBuilder::new(vec![Page::new(0), Page::new(1)])
        .bgm("bgm.mp3")
        .open();
    let clip = h.platform.clip_for("bgm.mp3");

    h.with_session(|s, now| s.next(now));
    h.with_session(|s, now| s.previous(now));

    assert_eq!(h.platform.clip_for("bgm.mp3"), clip);
    assert!(h.platform.clip(clip).playing);
    assert_eq!(h.platform.loads_of(MediaKind::Music).len(), 1);
}

#[test]
fn test_music_toggle() {
    let mut h = HarnessBuilder::new(vec![Page::new(0)]).bgm("bgm.mp3").open();

    h.with_session(|s, now| s.toggle_track(Track::Music, now));
    assert!(!h.platform.is_playing("bgm.mp3"));
    assert!(h.has_event(&PlaybackEvent::TrackToggled {
        track: Track::Music,
        enabled: false
    }));

    h.with_session(|s, now| s.toggle_track(Track::Music, now));
    assert!(h.platform.is_playing("bgm.mp3"));
}

#[test]
fn test_music_disabled_by_config_stays_silent() {
    let config = PlaybackConfig {
        music_enabled: false,
        ..Default::default()
    };
    let h = HarnessBuilder::new(vec![Page::new(0)])
        .config(config)
        .bgm("bgm.mp3")
        .open();

    assert!(!h.platform.is_playing("bgm.mp3"));
    assert!(!h.session.snapshot().music_enabled);
}

#[test]
fn test_gesture_resumes_interrupted_music() {
    let mut h = HarnessBuilder::new(vec![Page::new(0)]).bgm("bgm.mp3").open();
    h.platform.interrupt("bgm.mp3");

    h.gesture();
    assert!(h.platform.is_playing("bgm.mp3"));
}

#[test]
fn test_music_failure_is_not_fatal() {
    let mut h = HarnessBuilder::new(vec![Page::new(0), Page::new(1)])
        .bgm("bgm.mp3")
        .open();
    let clip = h.platform.clip_for("bgm.mp3");

    h.fail("bgm.mp3");
    assert!(h.platform.clip(clip).released);

    h.advance_to(3400);
    assert_eq!(h.session.current_page(), 1);
}
