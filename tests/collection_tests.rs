//! Integration tests for StripCollection

mod common;
use common::*;

use embassy_futures::block_on;
use ws2812_dma_stream::{
    Animation, AnimationDescriptor, CollectionError, StripAction, StripCollection, StripCommand,
    StripConfig, StripError, StripId, StripResponse, StripState,
};

type TestCollection<'a> = StripCollection<'a, MockHarness, MockDma, LEDS, ANIMATIONS, 4>;

fn uninitialized(led_count: usize) -> (TestStrip, SharedLog) {
    let log = new_log();
    let strip = TestStrip::new(
        MockHarness::new(&log),
        MockDma::new(&log),
        StripConfig::new(led_count),
    );
    (strip, log)
}

#[test]
fn add_strip_registers_by_id() {
    let (a, _) = strip(4);
    let (b, _) = strip(6);
    let mut collection = TestCollection::new();

    assert!(collection.is_empty());
    collection.add_strip(StripId(0), &a).unwrap();
    collection.add_strip(StripId(3), &b).unwrap();

    assert_eq!(collection.len(), 2);
    assert!(collection.contains(StripId(3)));
    assert!(!collection.contains(StripId(1)));
    assert_eq!(collection.led_count(StripId(3)), Ok(6));
}

#[test]
fn add_strip_rejects_duplicate_and_out_of_bounds_ids() {
    let (a, _) = strip(4);
    let (b, _) = strip(4);
    let mut collection = TestCollection::new();
    collection.add_strip(StripId(1), &a).unwrap();

    assert_eq!(
        collection.add_strip(StripId(1), &b),
        Err(CollectionError::DuplicateStripId(StripId(1)))
    );
    assert_eq!(
        collection.add_strip(StripId(4), &b),
        Err(CollectionError::StripIdOutOfBounds {
            id: StripId(4),
            capacity: 4
        })
    );
    assert_eq!(collection.len(), 1);
}

#[test]
fn unknown_id_is_reported() {
    let collection = TestCollection::new();

    assert_eq!(
        collection.led_count(StripId(2)),
        Err(CollectionError::InvalidStripId(StripId(2)))
    );
    assert_eq!(
        collection.get_state(StripId(9)),
        Err(CollectionError::InvalidStripId(StripId(9)))
    );
    assert_eq!(
        block_on(collection.handle_action(StripId(0), StripAction::GetLedCount)),
        Err(CollectionError::InvalidStripId(StripId(0)))
    );
}

#[test]
fn init_all_initializes_every_strip() {
    let (a, _) = uninitialized(4);
    let (b, _) = uninitialized(8);
    let mut collection = TestCollection::new();
    collection.add_strip(StripId(0), &a).unwrap();
    collection.add_strip(StripId(1), &b).unwrap();

    collection.init_all().unwrap();

    assert!(a.is_initialized());
    assert!(b.is_initialized());
}

#[test]
fn init_all_attempts_every_strip_and_reports_first_failure() {
    let (bad, _) = uninitialized(0);
    let (good, _) = uninitialized(4);
    let mut collection = TestCollection::new();
    collection.add_strip(StripId(0), &bad).unwrap();
    collection.add_strip(StripId(1), &good).unwrap();

    let result = collection.init_all();

    assert!(matches!(
        result,
        Err(CollectionError::Strip(StripError::Config(_)))
    ));
    assert!(good.is_initialized());
    assert!(!bad.is_initialized());
}

#[test]
fn descriptors_reach_only_their_strip() {
    let (a, _) = strip(4);
    let (b, _) = strip(4);
    let mut collection = TestCollection::new();
    collection.add_strip(StripId(0), &a).unwrap();
    collection.add_strip(StripId(1), &b).unwrap();

    collection
        .add_animation(AnimationDescriptor::new(
            StripId(1),
            Animation::SolidColor(GREEN),
            255,
        ))
        .unwrap();

    assert_eq!(a.pixel(0), Some(BLACK));
    assert_eq!(b.pixel(0), Some(GREEN));
    assert_eq!(
        collection.add_animation(AnimationDescriptor::new(
            StripId(2),
            Animation::SolidColor(GREEN),
            255,
        )),
        Err(CollectionError::InvalidStripId(StripId(2)))
    );
}

#[test]
fn strip_errors_are_wrapped() {
    let (a, _) = strip(4);
    let mut collection = TestCollection::new();
    collection.add_strip(StripId(0), &a).unwrap();

    let result = block_on(collection.handle_action(
        StripId(0),
        StripAction::SetColor {
            index: 4,
            color: RED,
        },
    ));

    assert!(matches!(
        result,
        Err(CollectionError::Strip(StripError::Pixel(_)))
    ));
}

#[test]
fn commands_are_routed_and_answered() {
    let (a, _) = strip(4);
    let (b, log_b) = strip(6);
    let mut collection = TestCollection::new();
    collection.add_strip(StripId(0), &a).unwrap();
    collection.add_strip(StripId(1), &b).unwrap();

    assert_eq!(
        block_on(collection.handle_command(StripCommand::new(StripId(1), StripAction::GetLedCount))),
        Ok(StripResponse::LedCount(6))
    );
    assert_eq!(
        block_on(collection.handle_command(StripCommand::new(StripId(1), StripAction::FillColor(RED)))),
        Ok(StripResponse::Done)
    );

    let (result, pumped) = block_on(embassy_futures::join::join(
        collection.handle_command(StripCommand::new(StripId(1), StripAction::Start)),
        pump_transfer(&b, &log_b),
    ));

    assert_eq!(result, Ok(StripResponse::Done));
    assert!(pumped);
    assert_eq!(collection.get_state(StripId(1)), Ok(StripState::Idle));
    assert_eq!(a.pixel(0), Some(BLACK));
}

#[test]
fn clear_animations_targets_one_strip() {
    let (a, _) = strip(4);
    let mut collection = TestCollection::new();
    collection.add_strip(StripId(0), &a).unwrap();

    assert_eq!(collection.clear_animations(StripId(0)), Ok(()));
    assert_eq!(
        collection.clear_animations(StripId(1)),
        Err(CollectionError::InvalidStripId(StripId(1)))
    );
}
