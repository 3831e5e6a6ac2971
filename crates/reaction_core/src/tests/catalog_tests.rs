use super::*;

#[test]
fn every_profile_builds() {
    for kind in ProfileKind::ALL {
        let profile = ReactionProfile::build(kind).expect("profile");
        assert!(!profile.triggers.is_empty(), "{kind} has triggers");
    }
}

#[test]
fn misophonia_table_matches_meter_contributions() {
    let profile = ReactionProfile::build(ProfileKind::Misophonia).expect("profile");
    let chewing = profile
        .trigger(&TriggerId::from("chewing"))
        .expect("chewing");
    assert_eq!(chewing.intensity, Intensity::saturating(30));
    assert_eq!(profile.decay.policy(), DecayPolicy::FreezeWhilePlaying);
    assert_eq!(profile.reaction_display, Some(REACTION_DISPLAY));
}

#[test]
fn tone_ids_are_frequency_keyed() {
    let ids: Vec<String> = tone_triggers().into_iter().map(|t| t.id.0).collect();
    assert_eq!(ids.first().map(String::as_str), Some("tone-120"));
    assert_eq!(ids.last().map(String::as_str), Some("tone-190"));
    assert_eq!(ids.len(), 8);
}

#[test]
fn duplicate_ids_are_rejected() {
    let mut triggers = misophonia_triggers().expect("catalog");
    triggers.push(triggers[0].clone());
    assert_eq!(
        validate_triggers(&triggers),
        Err(CatalogError::DuplicateTrigger(TriggerId::from("chewing")))
    );
    assert_eq!(validate_triggers(&[]), Err(CatalogError::Empty));
}

#[test]
fn key_map_covers_letters_space_and_bang() {
    let profile = ReactionProfile::build(ProfileKind::Chromesthesia).expect("profile");
    let key_map = profile.key_map.as_ref().expect("key map");
    assert_eq!(key_map.len(), 28);
    assert_eq!(key_map.resolve('a'), Some(&note_trigger_id(60)));
    assert_eq!(key_map.resolve('A'), Some(&note_trigger_id(60)));
    assert_eq!(key_map.resolve(' '), Some(&note_trigger_id(86)));
    assert_eq!(key_map.resolve('!'), Some(&note_trigger_id(87)));
    assert_eq!(key_map.resolve('7'), None);
}

#[test]
fn key_map_rejects_unknown_targets_and_repeats() {
    let triggers = note_triggers();
    let err = KeyMap::new([('a', TriggerId::from("note-200"))], &triggers).unwrap_err();
    assert_eq!(
        err,
        CatalogError::UnknownKeyTarget {
            key: 'a',
            target: TriggerId::from("note-200"),
        }
    );

    let err = KeyMap::new(
        [('a', note_trigger_id(60)), ('A', note_trigger_id(61))],
        &triggers,
    )
    .unwrap_err();
    assert_eq!(err, CatalogError::DuplicateKey { key: 'a' });
}

#[test]
fn note_hue_spans_the_wheel() {
    assert_eq!(note_hue(60), 0.0);
    assert!((note_hue(87) - 360.0).abs() < f32::EPSILON * 360.0);
}

#[test]
fn profile_names_parse() {
    assert_eq!(
        "misophonia".parse::<ProfileKind>(),
        Ok(ProfileKind::Misophonia)
    );
    assert_eq!(
        "Auditory_Tactile".parse::<ProfileKind>(),
        Ok(ProfileKind::AuditoryTactile)
    );
    assert!("number-form".parse::<ProfileKind>().is_err());
}

#[test]
fn overrides_apply() {
    let profile = ReactionProfile::build(ProfileKind::Misophonia)
        .expect("profile")
        .with_decay_tick(Duration::from_millis(200))
        .expect("tick")
        .with_reaction_display(Some(Duration::from_millis(500)));
    assert_eq!(profile.decay.interval(), Duration::from_millis(200));
    assert_eq!(profile.reaction_display, Some(Duration::from_millis(500)));

    let tones = ReactionProfile::build(ProfileKind::AuditoryTactile)
        .expect("profile")
        .with_reaction_display(Some(Duration::from_millis(500)));
    assert_eq!(tones.reaction_display, None);

    assert!(ReactionProfile::build(ProfileKind::Misophonia)
        .expect("profile")
        .with_decay_tick(Duration::ZERO)
        .is_err());
}

#[test]
fn out_of_range_table_intensity_is_rejected() {
    let err = Trigger::clip("loud", "Loud", "/sounds/loud.mp3", 250, "#000000").unwrap_err();
    assert_eq!(
        err,
        CatalogError::IntensityOutOfRange {
            id: TriggerId::from("loud"),
            intensity: 250,
        }
    );
}

#[test]
fn mirror_touch_profile_replaces_and_fades_slowly() {
    let profile = ReactionProfile::build(ProfileKind::MirrorTouch).expect("profile");
    assert_eq!(profile.triggers.len(), 8);
    let cheek = profile
        .trigger(&TriggerId::from("touch-cheek"))
        .expect("cheek");
    assert_eq!(cheek.intensity, Intensity::saturating(35));
    assert_eq!(
        cheek.resource,
        ResourceDescriptor::Touch {
            sensation: "Gentle brush against your cheek".into()
        }
    );
    assert!(profile
        .triggers
        .iter()
        .all(|t| (20..=35).contains(&t.intensity.value())));
    assert_eq!(profile.controller.intensity_rule, IntensityRule::Set);
    assert_eq!(profile.decay.policy(), DecayPolicy::Unconditional);
    assert_eq!(profile.decay.interval(), TOUCH_DECAY_TICK);
    assert_eq!(profile.reaction_display, Some(TOUCH_REACTION_DISPLAY));
    assert_eq!(profile.reaction_mode, ReactionMode::Message);
    assert_eq!(
        "mirror_touch".parse::<ProfileKind>(),
        Ok(ProfileKind::MirrorTouch)
    );
}

#[test]
fn chromesthesia_acknowledges_with_bursts() {
    let profile = ReactionProfile::build(ProfileKind::Chromesthesia).expect("profile");
    assert_eq!(profile.reaction_mode, ReactionMode::Bursts);
    assert_eq!(profile.reaction_display, Some(NOTE_BURST_DISPLAY));
}
