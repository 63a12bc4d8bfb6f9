use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::device::{DeviceControl, DevicePhase, DeviceQueue, SubmitError, SubmittedBuffer};

/// Channel-backed [`DeviceQueue`] feeding the loopback executor thread.
pub struct WorkerQueue {
    tx: Sender<SubmittedBuffer>,
}

impl DeviceQueue for WorkerQueue {
    fn submit(&self, work: SubmittedBuffer) -> Result<(), SubmitError> {
        self.tx.send(work).map_err(|_| SubmitError::Closed)
    }
}

/// Drains submitted buffers in FIFO order and resolves their fences. A
/// lost device fails fences instead of completing them.
pub fn device_thread(
    submit_rx: Receiver<SubmittedBuffer>,
    control: Arc<DeviceControl>,
) -> anyhow::Result<()> {
    let mut executed = 0u64;
    for work in submit_rx.iter() {
        if control.phase() == DevicePhase::Lost {
            log::warn!("Device: lost, abandoning buffer {}", work.id);
            work.fence.fail("device lost");
            continue;
        }

        #[cfg(feature = "tracing")]
        let _span = tracy_client::span!("execute_buffer");

        for op in &work.ops {
            log::trace!(
                "Device: buffer {} op {}",
                work.id,
                op.debug_name().unwrap_or("<unnamed>")
            );
        }
        work.fence.complete();
        executed += 1;
    }
    log::debug!("Device thread shutting down after {} buffers", executed);
    Ok(())
}

/// Owns the executor thread spawned for a [`WorkerQueue`].
pub struct DeviceWorker {
    control: Arc<DeviceControl>,
    handle: Option<thread::JoinHandle<()>>,
}

impl DeviceWorker {
    /// Spawns the executor and returns it together with the queue handle a
    /// stream submits through.
    pub fn spawn() -> anyhow::Result<(Self, WorkerQueue)> {
        let (tx, rx) = unbounded();
        let control = Arc::new(DeviceControl::new());

        let handle = {
            let control = control.clone();
            thread::Builder::new()
                .name("device".to_string())
                .spawn(move || {
                    if let Err(e) = device_thread(rx, control) {
                        log::error!("Thread device failed: {:?}", e);
                    }
                })?
        };

        Ok((
            Self {
                control,
                handle: Some(handle),
            },
            WorkerQueue { tx },
        ))
    }

    pub fn control(&self) -> Arc<DeviceControl> {
        self.control.clone()
    }

    /// Blocks until the executor exits. The queue side must be dropped
    /// first or the channel never disconnects.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}
