use std::fs;
use std::path::Path;
use std::sync::{mpsc, Mutex};

use image::{GrayImage, RgbImage};
use magic_mask::{
    mocks::{render_mask, MaskPattern, MockMattingModel},
    BatchController, BatchRequest, Eta, MattingModel, ProcessingConfig, ProgressEvent,
    WorkerState,
};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Blocks every prediction until the test releases it.
struct GatedModel {
    gate: Mutex<mpsc::Receiver<()>>,
}

impl GatedModel {
    fn new() -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (Self { gate: Mutex::new(rx) }, tx)
    }
}

impl MattingModel for GatedModel {
    fn predict_mask(&self, image: &RgbImage) -> magic_mask::Result<GrayImage> {
        let _ = self.gate.lock().unwrap().recv();
        Ok(render_mask(MaskPattern::Constant(255), image))
    }

    fn input_size(&self) -> u32 {
        384
    }
}

fn write_inputs(dir: &Path, count: usize) -> TestResult {
    fs::create_dir_all(dir)?;
    for i in 0..count {
        RgbImage::new(8, 8).save(dir.join(format!("img_{i}.png")))?;
    }
    Ok(())
}

#[test]
fn test_event_sequence_for_successful_batch() -> TestResult {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("input");
    write_inputs(&input, 3)?;

    let controller = BatchController::new();
    let request = BatchRequest::new(&input, temp_dir.path().join("out"), ProcessingConfig::default());
    let handle = controller
        .start(request, |_| Ok(MockMattingModel::default()))?
        .expect("controller was idle");

    let events: Vec<ProgressEvent> = handle.events().iter().collect();
    handle.join()?;

    assert_eq!(events.len(), 8);
    assert_eq!(events[0], ProgressEvent::Started { total: 3 });
    assert_eq!(
        events[1],
        ProgressEvent::Progress {
            index: 1,
            total: 3,
            eta: Eta::Calculating
        }
    );
    for (i, event) in events[1..7].chunks(2).enumerate() {
        assert!(matches!(event[0], ProgressEvent::Progress { index, total: 3, .. } if index == i + 1));
        assert!(matches!(event[1], ProgressEvent::Saved { index, .. } if index == i + 1));
    }
    assert!(matches!(
        events[3],
        ProgressEvent::Progress {
            eta: Eta::Remaining(_),
            ..
        }
    ));
    assert_eq!(events[7], ProgressEvent::Completed { processed: 3 });
    assert_eq!(controller.state(), WorkerState::Idle);
    Ok(())
}

#[test]
fn test_second_start_while_running_is_ignored() -> TestResult {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("input");
    write_inputs(&input, 2)?;
    let output = temp_dir.path().join("out");

    let controller = BatchController::new();
    let (model, gate) = GatedModel::new();
    let handle = controller
        .start(
            BatchRequest::new(&input, &output, ProcessingConfig::default()),
            move |_| Ok(model),
        )?
        .expect("controller was idle");
    assert_eq!(controller.state(), WorkerState::Running);

    let second = controller.start(
        BatchRequest::new(&input, &output, ProcessingConfig::default()),
        |_| Ok(MockMattingModel::default()),
    )?;
    assert!(second.is_none());

    drop(gate);
    assert_eq!(handle.wait()?, ProgressEvent::Completed { processed: 2 });
    assert_eq!(controller.state(), WorkerState::Idle);

    let third = controller.start(
        BatchRequest::new(&input, &output, ProcessingConfig::default()),
        |_| Ok(MockMattingModel::default()),
    )?;
    assert_eq!(
        third.expect("controller is idle again").wait()?,
        ProgressEvent::Completed { processed: 2 }
    );
    Ok(())
}

#[test]
fn test_cancel_stops_between_files() -> TestResult {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("input");
    write_inputs(&input, 3)?;
    let output = temp_dir.path().join("out");

    let controller = BatchController::new();
    let (model, gate) = GatedModel::new();
    let handle = controller
        .start(
            BatchRequest::new(&input, &output, ProcessingConfig::default()),
            move |_| Ok(model),
        )?
        .expect("controller was idle");

    // the worker is now blocked inside the first prediction
    let first = handle
        .events()
        .iter()
        .find(|event| matches!(event, ProgressEvent::Progress { index: 1, .. }));
    assert!(first.is_some());

    handle.cancel();
    gate.send(())?;

    assert_eq!(handle.wait()?, ProgressEvent::Cancelled { processed: 1 });
    assert!(output.join("img_0_masked.png").exists());
    assert!(!output.join("img_1_masked.png").exists());
    assert!(!controller.is_running());
    Ok(())
}

#[test]
fn test_failed_batch_reports_message_and_can_restart() -> TestResult {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("input");
    write_inputs(&input, 1)?;
    fs::write(input.join("zz_broken.png"), b"garbage")?;
    let output = temp_dir.path().join("out");

    let controller = BatchController::new();
    let handle = controller
        .start(
            BatchRequest::new(&input, &output, ProcessingConfig::default()),
            |_| Ok(MockMattingModel::default()),
        )?
        .expect("controller was idle");

    match handle.wait()? {
        ProgressEvent::Failed { message } => {
            assert!(message.contains("load image"), "{message}");
            assert!(message.contains("zz_broken.png"), "{message}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(output.join("img_0_masked.png").exists());

    fs::remove_file(input.join("zz_broken.png"))?;
    let retry = controller.start(
        BatchRequest::new(&input, &output, ProcessingConfig::default()),
        |_| Ok(MockMattingModel::default()),
    )?;
    assert_eq!(
        retry.expect("controller is idle").wait()?,
        ProgressEvent::Completed { processed: 1 }
    );
    Ok(())
}
