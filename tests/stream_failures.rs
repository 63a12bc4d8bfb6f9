use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Sender, unbounded};
use headway::{
    BufferFence, CommandStream, DevicePhase, DeviceQueue, DeviceWorker, EncodedOp, PressureGauge,
    StreamError, StreamOptions, SubmissionPolicy, SubmitError, SubmittedBuffer, WorkerQueue,
};

/// Queue that refuses every submission.
struct ClosedQueue;

impl DeviceQueue for ClosedQueue {
    fn submit(&self, _work: SubmittedBuffer) -> Result<(), SubmitError> {
        Err(SubmitError::Closed)
    }
}

/// Queue that accepts buffers but resolves them as failed.
struct FaultyQueue;

impl DeviceQueue for FaultyQueue {
    fn submit(&self, work: SubmittedBuffer) -> Result<(), SubmitError> {
        work.fence.fail("device lost");
        Ok(())
    }
}

/// Queue that parks accepted buffers for the test to resolve by hand.
struct ParkingQueue {
    parked: Sender<SubmittedBuffer>,
}

impl DeviceQueue for ParkingQueue {
    fn submit(&self, work: SubmittedBuffer) -> Result<(), SubmitError> {
        self.parked.send(work).map_err(|_| SubmitError::Closed)
    }
}

/// Queue that rejects the first submission and accepts the rest.
struct FlakyQueue {
    failed_once: AtomicBool,
    accepted: Sender<SubmittedBuffer>,
}

impl DeviceQueue for FlakyQueue {
    fn submit(&self, work: SubmittedBuffer) -> Result<(), SubmitError> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(SubmitError::Rejected("transient reject".to_string()));
        }
        work.fence.complete();
        self.accepted.send(work).map_err(|_| SubmitError::Closed)
    }
}

/// Forwards to the real worker queue while keeping every fence in view.
struct TeeQueue {
    inner: WorkerQueue,
    seen: Sender<Arc<BufferFence>>,
}

impl DeviceQueue for TeeQueue {
    fn submit(&self, work: SubmittedBuffer) -> Result<(), SubmitError> {
        let _ = self.seen.send(work.fence.clone());
        self.inner.submit(work)
    }
}

fn stream_over(queue: impl DeviceQueue + 'static) -> CommandStream {
    CommandStream::new(
        Box::new(queue),
        Arc::new(PressureGauge::new()),
        StreamOptions::default(),
    )
}

#[test]
fn submission_failure_abandons_the_buffer() {
    let mut stream = stream_over(ClosedQueue);
    for _ in 0..2 {
        stream.encode(EncodedOp::new());
        stream
            .synchronize(SubmissionPolicy::Adaptive)
            .expect("below threshold defers");
    }
    assert_eq!(stream.pending_ops(), 2);

    let err = stream.commit().expect_err("submission must fail");
    assert!(matches!(err, StreamError::Submission { buffer: 0, .. }));
    // No replacement buffer was opened and the counter stayed put.
    assert_eq!(stream.current_buffer_id(), None);
    assert_eq!(stream.pending_ops(), 2);
}

#[test]
fn encode_recovers_after_a_failed_submission() {
    let (accepted_tx, accepted) = unbounded();
    let mut stream = stream_over(FlakyQueue {
        failed_once: AtomicBool::new(false),
        accepted: accepted_tx,
    });

    stream.encode(EncodedOp::named("lost"));
    stream.commit().expect_err("first submission fails");

    // A fresh epoch: replacement buffer, counter restarted.
    stream.encode(EncodedOp::named("retry"));
    assert_eq!(stream.current_buffer_id(), Some(1));
    assert_eq!(stream.pending_ops(), 0);
    stream
        .synchronize(SubmissionPolicy::Adaptive)
        .expect("defer");
    assert_eq!(stream.pending_ops(), 1);

    stream.commit().expect("second submission succeeds");
    let works: Vec<SubmittedBuffer> = accepted.try_iter().collect();
    assert_eq!(works.len(), 1);
    assert_eq!(works[0].id, 1);
    assert_eq!(works[0].ops.len(), 1);
    assert_eq!(works[0].ops[0].debug_name(), Some("retry"));
}

#[test]
fn wait_failure_is_surfaced_to_the_waiter() {
    let mut stream = stream_over(FaultyQueue);
    stream.encode(EncodedOp::new());
    let err = stream.commit_and_wait().expect_err("wait must fail");
    match err {
        StreamError::Wait { buffer, fault } => {
            assert_eq!(buffer, 0);
            assert!(fault.contains("device lost"), "fault={fault}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn lost_device_fails_waits_instead_of_completing() {
    let (mut worker, queue) = DeviceWorker::spawn().expect("spawn device worker");
    let control = worker.control();
    let mut stream = stream_over(queue);

    stream.encode(EncodedOp::new());
    stream.commit_and_wait().expect("healthy device completes");

    control.set_phase(DevicePhase::Lost);
    stream.encode(EncodedOp::new());
    let err = stream.commit_and_wait().expect_err("lost device fails");
    assert!(matches!(err, StreamError::Wait { .. }));

    drop(stream);
    worker.join();
}

#[test]
fn wait_is_not_satisfied_by_unrelated_completions() {
    let (parked_tx, parked) = unbounded();
    let mut stream = stream_over(ParkingQueue { parked: parked_tx });

    // An unrelated buffer that stays pending.
    stream.encode(EncodedOp::named("unrelated"));
    stream.commit().expect("submit unrelated buffer");
    let unrelated = parked.recv().expect("unrelated buffer parked");

    stream.encode(EncodedOp::named("awaited"));
    let waited = AtomicBool::new(false);
    thread::scope(|scope| {
        scope.spawn(|| {
            stream.commit_and_wait().expect("awaited buffer completes");
            waited.store(true, Ordering::SeqCst);
        });

        let awaited = parked.recv().expect("awaited buffer parked");
        assert_eq!(awaited.id, 1);

        unrelated.fence.complete();
        thread::sleep(Duration::from_millis(100));
        assert!(
            !waited.load(Ordering::SeqCst),
            "wait released by an unrelated completion"
        );

        awaited.fence.complete();
    });
    assert!(waited.load(Ordering::SeqCst));
}

#[test]
fn a_wait_covers_every_buffer_submitted_before_it() {
    let (mut worker, queue) = DeviceWorker::spawn().expect("spawn device worker");
    let (seen_tx, seen) = unbounded();
    let mut stream = stream_over(TeeQueue {
        inner: queue,
        seen: seen_tx,
    });

    for i in 0..3 {
        stream.encode(EncodedOp::named(format!("op{i}")));
        stream.commit().expect("pipelined submit");
    }
    stream.commit_and_wait().expect("drain");

    let fences: Vec<Arc<BufferFence>> = seen.try_iter().collect();
    assert_eq!(fences.len(), 3);
    for fence in &fences {
        assert!(
            fence.is_complete(),
            "buffer {} incomplete after the wait",
            fence.buffer_id()
        );
    }

    drop(stream);
    worker.join();
}
