// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Selection and dispatch through `Uploader`, with recording strategies in
//! place of real loaders.

use std::cell::RefCell;
use std::rc::Rc;

use nvm_upload::{
    ErrorKind, Family, Image, Result, Speed, StrategyRegistry, TargetId, TransferOptions,
    TransferStrategy, UploadError, Uploader, KEY_CTBOT, KEY_NVC1, KEY_NVC2,
};

// ============================================================================
// Test doubles
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct Call {
    strategy: &'static str,
    device: String,
    target: TargetId,
    speed: u32,
    image: Vec<u8>,
}

type CallLog = Rc<RefCell<Vec<Call>>>;

/// Records every transfer and answers with a fixed outcome.
struct RecordingStrategy {
    name: &'static str,
    family: Family,
    calls: CallLog,
    timeout: bool,
}

impl RecordingStrategy {
    fn succeeding(name: &'static str, calls: &CallLog) -> Box<Self> {
        Box::new(Self {
            name,
            family: Family::Nvc1,
            calls: calls.clone(),
            timeout: false,
        })
    }

    fn timing_out(name: &'static str, calls: &CallLog) -> Box<Self> {
        Box::new(Self {
            name,
            family: Family::Nvc1,
            calls: calls.clone(),
            timeout: true,
        })
    }
}

impl TransferStrategy for RecordingStrategy {
    fn family(&self) -> Family {
        self.family
    }

    fn description(&self) -> &'static str {
        self.name
    }

    fn transfer(&self, device: &str, target: TargetId, speed: Speed, image: &Image) -> Result<()> {
        self.calls.borrow_mut().push(Call {
            strategy: self.name,
            device: device.to_string(),
            target,
            speed: speed.get(),
            image: image.as_bytes().to_vec(),
        });
        if self.timeout {
            return Err(UploadError::DeviceTimeout {
                device: device.to_string(),
                waiting_for: "sync acknowledgement",
            });
        }
        Ok(())
    }
}

fn speed(value: u32) -> Speed {
    Speed::new(value).unwrap()
}

fn recording_uploader(calls: &CallLog) -> Uploader {
    let mut registry = StrategyRegistry::new();
    registry.register("variantA", RecordingStrategy::succeeding("A", calls));
    registry.register("variantB", RecordingStrategy::succeeding("B", calls));
    Uploader::new(registry)
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_select_then_current_for_every_key() {
    let calls = CallLog::default();
    let mut uploader = recording_uploader(&calls);

    for (key, name) in [("variantA", "A"), ("variantB", "B"), ("variantA", "A")] {
        uploader.select(key).unwrap();
        assert_eq!(uploader.current().unwrap().description(), name);
        assert_eq!(uploader.registry().active_key(), Some(key));
    }
}

#[test]
fn test_select_builtin_keys() {
    let mut uploader = Uploader::new(StrategyRegistry::builtin(TransferOptions::default()));
    for (key, family) in [
        (KEY_NVC1, Family::Nvc1),
        (KEY_NVC2, Family::Nvc2),
        (KEY_CTBOT, Family::CtBot),
    ] {
        uploader.select(key).unwrap();
        assert_eq!(uploader.current().unwrap().family(), family);
    }
}

#[test]
fn test_unknown_key_keeps_previous_selection() {
    let calls = CallLog::default();
    let mut uploader = recording_uploader(&calls);

    uploader.select("variantB").unwrap();
    let err = uploader.select("nonexistent").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnknownStrategy);
    assert_eq!(err.exit_code(), 4);
    assert_eq!(uploader.current().unwrap().description(), "B");
}

#[test]
fn test_unknown_key_with_nothing_selected() {
    let calls = CallLog::default();
    let mut uploader = recording_uploader(&calls);

    assert!(uploader.select("nonexistent").is_err());
    assert_eq!(
        uploader.current().err().map(|e| e.kind()),
        Some(ErrorKind::NoStrategySelected)
    );
}

#[test]
fn test_reregistering_selected_key_replaces_strategy() {
    let calls = CallLog::default();
    let mut registry = StrategyRegistry::new();
    registry.register("variantA", RecordingStrategy::succeeding("old", &calls));
    registry.select("variantA").unwrap();
    registry.register("variantA", RecordingStrategy::succeeding("new", &calls));

    assert_eq!(registry.keys().count(), 1);
    assert_eq!(registry.current().unwrap().description(), "new");
}

// ============================================================================
// Upload dispatch
// ============================================================================

#[test]
fn test_upload_without_selection_invokes_nothing() {
    let calls = CallLog::default();
    let uploader = recording_uploader(&calls);

    let err = uploader
        .upload("/dev/ttyS0", TargetId::new(1), speed(9600), &Image::new(vec![1]))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoStrategySelected);
    assert!(calls.borrow().is_empty());
}

#[test]
fn test_upload_forwards_arguments_once() {
    let calls = CallLog::default();
    let mut uploader = recording_uploader(&calls);
    uploader.select("variantA").unwrap();

    // "uart" is the nvc1 target the recording strategy claims
    let target = Family::Nvc1.lookup("uart").unwrap().id;
    assert_eq!(target.raw(), 1);

    uploader
        .upload("/dev/ttyS0", target, speed(9600), &Image::new(vec![1, 2, 3]))
        .unwrap();

    assert_eq!(
        *calls.borrow(),
        vec![Call {
            strategy: "A",
            device: "/dev/ttyS0".to_string(),
            target: TargetId::new(1),
            speed: 9600,
            image: vec![1, 2, 3],
        }]
    );
}

#[test]
fn test_upload_goes_to_latest_selection_only() {
    let calls = CallLog::default();
    let mut uploader = recording_uploader(&calls);
    uploader.select("variantA").unwrap();
    uploader.select("variantB").unwrap();

    uploader
        .upload("/dev/ttyUSB0", TargetId::new(2), speed(2400), &Image::new(vec![9]))
        .unwrap();

    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].strategy, "B");
}

#[test]
fn test_strategy_error_is_returned_unchanged() {
    let calls = CallLog::default();
    let mut registry = StrategyRegistry::new();
    registry.register("slow", RecordingStrategy::timing_out("slow", &calls));
    let mut uploader = Uploader::new(registry);
    uploader.select("slow").unwrap();

    let err = uploader
        .upload("/dev/ttyS1", TargetId::new(1), speed(9600), &Image::new(vec![1]))
        .unwrap_err();

    match err {
        UploadError::DeviceTimeout {
            ref device,
            waiting_for,
        } => {
            assert_eq!(device, "/dev/ttyS1");
            assert_eq!(waiting_for, "sync acknowledgement");
        }
        other => panic!("expected DeviceTimeout, got {:?}", other),
    }
    assert_eq!(err.exit_code(), 6);
    assert_eq!(calls.borrow().len(), 1);
}

#[test]
fn test_empty_image_is_passed_through() {
    let calls = CallLog::default();
    let mut uploader = recording_uploader(&calls);
    uploader.select("variantA").unwrap();

    uploader
        .upload("/dev/ttyS0", TargetId::new(1), speed(9600), &Image::new(Vec::new()))
        .unwrap();

    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].image.is_empty());
}

#[test]
fn test_repeated_uploads_are_independent() {
    let calls = CallLog::default();
    let mut uploader = recording_uploader(&calls);
    uploader.select("variantA").unwrap();

    for byte in [0x10, 0x20] {
        uploader
            .upload("/dev/ttyS0", TargetId::new(1), speed(9600), &Image::new(vec![byte]))
            .unwrap();
    }

    let images: Vec<Vec<u8>> = calls.borrow().iter().map(|c| c.image.clone()).collect();
    assert_eq!(images, vec![vec![0x10], vec![0x20]]);
}
