mod common;

use std::time::Duration;

use common::{editor, garbage, tone};
use tokio::sync::broadcast;
use voxline::playback::AudioSink;
use voxline::{PlaybackEvent, PlaybackState};

fn drain(rx: &mut broadcast::Receiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn positions(events: &[PlaybackEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::Position(p) => Some(*p),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_play_from_zero_runs_to_completion() {
    let (editor, sink) = editor();
    let a = editor.append(tone(0.1, 3.0, true)).await.unwrap();
    let b = editor.append(tone(0.2, 2.0, true)).await.unwrap();
    let mut rx = editor.subscribe();

    let start = editor.play(0.0).await.expect("session starts");
    assert_eq!(start.total_duration, 5.0);
    assert_eq!(start.scheduled, vec![a.id, b.id]);
    assert_eq!(editor.state(), PlaybackState::Playing);

    let voices = sink.scheduled();
    assert_eq!(voices.len(), 2);
    let (va, vb) = (&voices[0].0, &voices[1].0);
    assert_eq!(va.offset, 0.0);
    assert_eq!(vb.offset, 0.0);
    assert!((vb.start_at - va.start_at - 3.0).abs() < 1e-9, "both clips share one zero-time");

    tokio::time::sleep(Duration::from_secs(2)).await;
    let mid = editor.position();
    assert!((mid - 2.0).abs() < 1e-6, "position follows the clock, got {mid}");

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(editor.state(), PlaybackState::Idle);
    assert_eq!(editor.position(), 0.0);

    let events = drain(&mut rx);
    assert!(matches!(events.first(), Some(PlaybackEvent::Started { from, .. }) if *from == 0.0));
    assert_eq!(events.last(), Some(&PlaybackEvent::Finished));

    let reported = positions(&events);
    assert!(reported.windows(2).all(|w| w[0] <= w[1]), "positions never go backwards");
    assert_eq!(reported.first(), Some(&0.0));
    assert_eq!(reported.last(), Some(&5.0));
    assert!(voices.iter().all(|(_, handle)| handle.is_stopped()));
}

#[tokio::test(start_paused = true)]
async fn test_play_mid_timeline_offsets_running_clip() {
    let (editor, sink) = editor();
    let a = editor.append(tone(0.1, 3.0, true)).await.unwrap();
    let b = editor.append(tone(0.2, 2.0, true)).await.unwrap();

    let start = editor.play(4.0).await.unwrap();
    assert_eq!(start.from, 4.0);
    assert_eq!(start.scheduled, vec![b.id]);
    assert!(!start.scheduled.contains(&a.id), "A ended before the start point");

    let voices = sink.scheduled();
    assert_eq!(voices.len(), 1);
    let voice = &voices[0].0;
    assert_eq!(voice.clip, b.id);
    assert_eq!(voice.offset, 1.0);
    assert_eq!(voice.start_at, sink.current_time(), "running clip starts immediately");

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(editor.state(), PlaybackState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_future_clips_start_at_their_offset() {
    let (editor, sink) = editor();
    editor.insert_at(tone(0.1, 2.0, true), 0.0).await.unwrap();
    let late = editor.insert_at(tone(0.1, 1.0, true), 5.0).await.unwrap();

    editor.play(1.0).await.unwrap();
    let now = sink.current_time();
    let voices = sink.scheduled();
    let (voice, _) = voices.iter().find(|(v, _)| v.clip == late.id).unwrap();
    assert_eq!(voice.offset, 0.0);
    assert!((voice.start_at - (now + 4.0)).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_from_offset_is_clamped() {
    let (editor, _) = editor();
    editor.append(tone(0.1, 1.0, true)).await.unwrap();

    assert_eq!(editor.play(-3.0).await.unwrap().from, 0.0);
    assert_eq!(editor.play(99.0).await.unwrap().from, 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_halts_everything() {
    let (editor, sink) = editor();
    editor.append(tone(0.1, 3.0, true)).await.unwrap();
    let mut rx = editor.subscribe();

    editor.play(0.0).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    editor.stop();

    assert_eq!(editor.state(), PlaybackState::Idle);
    assert_eq!(editor.position(), 0.0);
    assert!(sink.scheduled().iter().all(|(_, h)| h.is_stopped()));
    assert_eq!(drain(&mut rx).last(), Some(&PlaybackEvent::Stopped));

    // The polling loop is gone: no further position reports arrive.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(drain(&mut rx).is_empty());

    editor.stop();
    assert_eq!(editor.state(), PlaybackState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_seek_while_playing_restarts_session() {
    let (editor, sink) = editor();
    editor.append(tone(0.1, 3.0, true)).await.unwrap();
    let b = editor.append(tone(0.2, 2.0, true)).await.unwrap();

    editor.play(0.0).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    let first_session = sink.scheduled();
    sink.clear();

    let restarted = editor.seek(4.0).await.expect("seek restarts playback");
    assert_eq!(restarted.scheduled, vec![b.id]);
    assert!(first_session.iter().all(|(_, h)| h.is_stopped()));
    assert_eq!(sink.scheduled()[0].0.offset, 1.0);
    assert_eq!(editor.state(), PlaybackState::Playing);
    assert!((editor.position() - 4.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_seek_during_pending_play_wins() {
    let (editor, sink) = editor();
    let clip = editor.append(tone(0.1, 3.0, true)).await.unwrap();

    // The first play is still decoding when the seek arrives.
    let (_, sought) = tokio::join!(editor.play(0.0), editor.seek(2.0));
    let sought = sought.expect("seek supersedes the pending play");
    assert_eq!(sought.from, 2.0);
    assert_eq!(sought.scheduled, vec![clip.id]);

    let voices = sink.scheduled();
    let (last, _) = voices.last().unwrap();
    assert_eq!(last.offset, 2.0);
    assert!(voices[..voices.len() - 1].iter().all(|(_, h)| h.is_stopped()));
    assert_eq!(editor.state(), PlaybackState::Playing);
    assert!((editor.position() - 2.0).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn test_seek_while_idle_moves_cursor_only() {
    let (editor, sink) = editor();
    editor.append(tone(0.1, 3.0, true)).await.unwrap();

    assert!(editor.seek(2.5).await.is_none());
    assert_eq!(editor.state(), PlaybackState::Idle);
    assert_eq!(editor.position(), 2.5);
    assert!(sink.scheduled().is_empty());

    editor.seek(10.0).await;
    assert_eq!(editor.position(), 3.0);
}

#[tokio::test(start_paused = true)]
async fn test_empty_timeline_play_is_noop() {
    let (editor, sink) = editor();
    assert!(editor.play(0.0).await.is_none());
    assert_eq!(editor.state(), PlaybackState::Idle);
    assert!(sink.scheduled().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_clips_added_mid_session_do_not_extend_it() {
    let (editor, _) = editor();
    editor.append(tone(0.1, 1.0, true)).await.unwrap();
    let mut rx = editor.subscribe();

    editor.play(0.0).await.unwrap();
    editor.insert_at(tone(0.1, 1.0, true), 10.0).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(editor.state(), PlaybackState::Idle);
    let events = drain(&mut rx);
    assert_eq!(positions(&events).last(), Some(&1.0));
    assert_eq!(events.last(), Some(&PlaybackEvent::Finished));
}

#[tokio::test(start_paused = true)]
async fn test_undecodable_clip_is_skipped() {
    let (editor, sink) = editor();
    let good = editor.append(tone(0.1, 2.0, true)).await.unwrap();
    let bad = editor.insert_at(garbage(Some(1.0)), 0.5).await.unwrap();

    let start = editor.play(0.0).await.unwrap();
    assert_eq!(start.scheduled, vec![good.id]);
    assert_eq!(start.skipped, vec![bad.id]);
    assert_eq!(sink.scheduled().len(), 1);
}
