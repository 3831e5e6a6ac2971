use super::*;
use crate::fakes::{clip, FakeBackend, FakeHaptics};
use playback_backend::NoHaptics;
use shared::domain::{Intensity, Trigger};

fn level(v: u32) -> Intensity {
    Intensity::saturating(v)
}

fn spawn(profile: ReactionProfile, backend: &Arc<FakeBackend>) -> ReactionSessionHandle {
    ReactionSession::spawn(
        profile,
        Arc::clone(backend) as Arc<dyn PlaybackBackend>,
        Arc::new(NoHaptics),
    )
}

fn profile(kind: ProfileKind) -> ReactionProfile {
    ReactionProfile::build(kind).expect("profile")
}

fn custom_profile(triggers: Vec<Trigger>, policy: DecayPolicy) -> ReactionProfile {
    let mut profile = profile(ProfileKind::Misophonia);
    profile.triggers = triggers;
    profile.decay = DecayTimer::new(policy, decay::DEFAULT_DECAY_TICK).expect("timer");
    profile
}

async fn advance(ms: u64) {
    time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn released_trigger_decays_back_to_idle() {
    let backend = FakeBackend::new();
    let session = spawn(profile(ProfileKind::Misophonia), &backend);

    let snapshot = session.start("chewing").await.expect("start");
    assert_eq!(snapshot.intensity, level(30));
    assert_eq!(snapshot.phase, ReactionPhase::Rising);

    let snapshot = session.stop("chewing").await.expect("stop");
    assert_eq!(snapshot.phase, ReactionPhase::Decaying);
    assert_eq!(snapshot.active_trigger, None);

    advance(150 * 10 + 75).await;
    assert_eq!(session.snapshot().intensity, level(20));

    advance(150 * 20).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.intensity, Intensity::ZERO);
    assert_eq!(snapshot.phase, ReactionPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn stress_meter_freezes_until_clip_ends() {
    let backend = FakeBackend::new();
    let session = spawn(profile(ProfileKind::Misophonia), &backend);

    session.start("chewing").await.expect("start");
    advance(1000).await;
    assert_eq!(session.snapshot().intensity, level(30));
    assert_eq!(session.snapshot().phase, ReactionPhase::Rising);

    backend.handle("chewing").finish_naturally();
    advance(10).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.active_trigger, None);
    assert_eq!(snapshot.phase, ReactionPhase::Decaying);
    assert_eq!(backend.log.count("stop:chewing"), 1);

    advance(150 * 31).await;
    assert_eq!(session.snapshot().phase, ReactionPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn interrupt_adds_to_partially_decayed_level() {
    let backend = FakeBackend::new();
    let session = spawn(
        custom_profile(
            vec![clip("a", 40), clip("b", 40)],
            DecayPolicy::Unconditional,
        ),
        &backend,
    );

    session.start("a").await.expect("start a");
    advance(150 * 5 + 75).await;
    assert_eq!(session.snapshot().intensity, level(35));

    let snapshot = session.start("b").await.expect("start b");
    assert_eq!(snapshot.intensity, level(75));
    assert_eq!(snapshot.active_trigger, Some(TriggerId::from("b")));
    assert_eq!(
        backend.log.entries(),
        vec!["acquire:a", "start:a", "stop:a", "acquire:b", "start:b"]
    );
}

#[tokio::test(start_paused = true)]
async fn new_start_while_decaying_jumps_instead_of_resetting() {
    let backend = FakeBackend::new();
    let session = spawn(profile(ProfileKind::Misophonia), &backend);

    session.start("chewing").await.expect("start");
    session.stop("chewing").await.expect("stop");
    advance(150 * 4 + 75).await;
    assert_eq!(session.snapshot().phase, ReactionPhase::Decaying);

    let snapshot = session.start("keyboard").await.expect("start");
    assert_eq!(snapshot.phase, ReactionPhase::Rising);
    assert_eq!(snapshot.intensity, level(26 + 15));
}

#[tokio::test(start_paused = true)]
async fn held_tone_auto_stops_after_two_seconds() {
    let backend = FakeBackend::new();
    let session = spawn(profile(ProfileKind::AuditoryTactile), &backend);

    session.start("tone-120").await.expect("start");
    advance(1900).await;
    assert_eq!(
        session.snapshot().active_trigger,
        Some(TriggerId::from("tone-120"))
    );

    advance(200).await;
    assert_eq!(session.snapshot().active_trigger, None);
    assert_eq!(backend.log.count("stop:tone-120"), 1);

    advance(5000).await;
    assert_eq!(backend.log.count("stop:tone-120"), 1);
}

#[tokio::test(start_paused = true)]
async fn superseded_auto_stop_never_fires() {
    let backend = FakeBackend::new();
    let session = spawn(profile(ProfileKind::AuditoryTactile), &backend);

    session.start("tone-120").await.expect("start");
    advance(500).await;
    session.stop("tone-120").await.expect("release");
    session.start("tone-130").await.expect("start");

    advance(1600).await;
    assert_eq!(
        session.snapshot().active_trigger,
        Some(TriggerId::from("tone-130"))
    );
    assert_eq!(backend.log.count("stop:tone-130"), 0);

    advance(500).await;
    assert_eq!(session.snapshot().active_trigger, None);
    assert_eq!(backend.log.count("stop:tone-120"), 1);
    assert_eq!(backend.log.count("stop:tone-130"), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_releases_everything_and_silences_callbacks() {
    let backend = FakeBackend::new();
    let haptics = Arc::new(FakeHaptics::default());
    let session = ReactionSession::spawn(
        profile(ProfileKind::AuditoryTactile),
        Arc::clone(&backend) as Arc<dyn PlaybackBackend>,
        Arc::clone(&haptics) as Arc<dyn HapticBackend>,
    );

    session.start("tone-150").await.expect("start");
    session.shutdown().await.expect("shutdown");

    let log_at_shutdown = backend.log.entries();
    assert_eq!(log_at_shutdown.last().map(String::as_str), Some("stop:tone-150"));
    assert_eq!(haptics.log.entries().last().map(String::as_str), Some("cancel"));
    assert_eq!(session.snapshot().active_trigger, None);

    backend.handle("tone-150").finish_naturally();
    advance(5000).await;
    assert_eq!(backend.log.entries(), log_at_shutdown);

    assert_eq!(
        session.start("tone-150").await,
        Err(SessionError::Closed)
    );
}

#[tokio::test(start_paused = true)]
async fn dropping_last_handle_tears_down() {
    let backend = FakeBackend::new();
    let session = spawn(profile(ProfileKind::Misophonia), &backend);
    session.start("sniffling").await.expect("start");

    drop(session);
    advance(10).await;
    assert_eq!(backend.log.count("stop:sniffling"), 1);
    assert_eq!(backend.on_air(), 0);
}

#[tokio::test(start_paused = true)]
async fn reaction_message_rearms_on_each_start() {
    let backend = FakeBackend::new();
    let session = spawn(profile(ProfileKind::Misophonia), &backend);

    assert!(session.start("chewing").await.expect("start").reaction_visible);
    advance(1000).await;
    session.start("keyboard").await.expect("start");

    advance(1500).await;
    assert!(session.snapshot().reaction_visible);

    advance(600).await;
    assert!(!session.snapshot().reaction_visible);
}

#[tokio::test(start_paused = true)]
async fn tone_panel_shows_no_reaction_message() {
    let backend = FakeBackend::new();
    let session = spawn(profile(ProfileKind::AuditoryTactile), &backend);
    let snapshot = session.start("tone-190").await.expect("start");
    assert!(!snapshot.reaction_visible);
    assert_eq!(snapshot.intensity, Intensity::ZERO);
}

#[tokio::test(start_paused = true)]
async fn failed_acquisition_keeps_session_usable() {
    let backend = FakeBackend::new();
    backend.refuse("chewing");
    let session = spawn(profile(ProfileKind::Misophonia), &backend);

    let snapshot = session.start("chewing").await.expect("start");
    assert_eq!(snapshot, ReactionSnapshot::default());

    let snapshot = session.start("keyboard").await.expect("start");
    assert_eq!(snapshot.intensity, level(15));
}

#[tokio::test(start_paused = true)]
async fn unknown_trigger_is_rejected_up_front() {
    let backend = FakeBackend::new();
    let session = spawn(profile(ProfileKind::Misophonia), &backend);
    assert_eq!(
        session.start("tone-120").await,
        Err(SessionError::UnknownTrigger(TriggerId::from("tone-120")))
    );
    assert_eq!(backend.acquisitions(), 0);
}

#[tokio::test(start_paused = true)]
async fn keys_resolve_through_the_validated_map() {
    let backend = FakeBackend::new();
    let session = spawn(profile(ProfileKind::Chromesthesia), &backend);

    let snapshot = session.press_key('A').await.expect("key");
    assert_eq!(snapshot.active_trigger, Some(TriggerId::from("note-60")));

    let snapshot = session.press_key('7').await.expect("key");
    assert_eq!(snapshot.active_trigger, Some(TriggerId::from("note-60")));

    session
        .apply(&Gesture::Key { key: '!' })
        .await
        .expect("gesture");
    assert_eq!(
        session.snapshot().active_trigger,
        Some(TriggerId::from("note-87"))
    );
    assert_eq!(backend.log.count("stop:note-60"), 1);
}

#[tokio::test(start_paused = true)]
async fn subscribers_observe_transitions() {
    let backend = FakeBackend::new();
    let session = spawn(profile(ProfileKind::Misophonia), &backend);
    let mut updates = session.subscribe();

    session.start("pen-clicking").await.expect("start");
    updates.changed().await.expect("update");
    assert_eq!(
        updates.borrow_and_update().active_trigger,
        Some(TriggerId::from("pen-clicking"))
    );

    session.apply(&Gesture::ReleaseAll).await.expect("release");
    updates.changed().await.expect("update");
    assert_eq!(updates.borrow_and_update().phase, ReactionPhase::Decaying);
}

#[tokio::test(start_paused = true)]
async fn mirror_touch_sets_the_level_and_fades_on_its_own_tick() {
    let backend = FakeBackend::new();
    let session = spawn(profile(ProfileKind::MirrorTouch), &backend);

    let snapshot = session.start("touch-cheek").await.expect("touch");
    assert_eq!(snapshot.intensity, level(35));
    assert_eq!(snapshot.reaction_trigger, Some(TriggerId::from("touch-cheek")));

    advance(200 * 5 + 100).await;
    assert_eq!(session.snapshot().intensity, level(30));

    let snapshot = session.start("touch-back").await.expect("touch");
    assert_eq!(snapshot.intensity, level(20));
    assert_eq!(backend.log.count("stop:touch-cheek"), 1);
    assert_eq!(snapshot.reaction_trigger, Some(TriggerId::from("touch-back")));

    advance(4900).await;
    assert!(session.snapshot().reaction_visible);

    advance(200).await;
    let snapshot = session.snapshot();
    assert!(!snapshot.reaction_visible);
    assert_eq!(snapshot.reaction_trigger, None);
}

#[tokio::test(start_paused = true)]
async fn reaction_message_outlives_a_clip_that_ends_first() {
    let backend = FakeBackend::new();
    let session = spawn(profile(ProfileKind::Misophonia), &backend);

    session.start("chewing").await.expect("start");
    advance(1500).await;
    backend.handle("chewing").finish_naturally();
    advance(10).await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.active_trigger, None);
    assert!(snapshot.reaction_visible);
    assert_eq!(snapshot.reaction_trigger, Some(TriggerId::from("chewing")));

    advance(600).await;
    let snapshot = session.snapshot();
    assert!(!snapshot.reaction_visible);
    assert_eq!(snapshot.reaction_trigger, None);
}

#[tokio::test(start_paused = true)]
async fn note_bursts_expire_independently() {
    let backend = FakeBackend::new();
    let session = spawn(profile(ProfileKind::Chromesthesia), &backend);

    session.press_key('a').await.expect("key");
    advance(1000).await;
    let snapshot = session.press_key('b').await.expect("key");
    assert_eq!(
        snapshot.bursts,
        vec![TriggerId::from("note-60"), TriggerId::from("note-61")]
    );
    assert_eq!(snapshot.reaction_trigger, Some(TriggerId::from("note-61")));

    advance(2100).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.bursts, vec![TriggerId::from("note-61")]);
    assert!(snapshot.reaction_visible);

    advance(1000).await;
    let snapshot = session.snapshot();
    assert!(snapshot.bursts.is_empty());
    assert!(!snapshot.reaction_visible);
}
