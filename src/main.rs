use std::sync::Arc;

use anyhow::Context;
use crossbeam_channel::unbounded;

use headway::{
    CommandStream, DeviceWorker, EncodedOp, PressureGauge, PressureLevel, StreamOptions,
    SubmissionPolicy,
};

fn main() -> anyhow::Result<()> {
    log4rs::init_file("log4rs.yml", Default::default())
        .context("failed to load logging config file")?;

    let (mut worker, queue) = DeviceWorker::spawn().context("failed to spawn device worker")?;
    let pressure = Arc::new(PressureGauge::new());
    let (event_tx, event_rx) = unbounded();

    let mut stream = CommandStream::new(
        Box::new(queue),
        pressure.clone(),
        StreamOptions {
            submit_events: Some(event_tx),
            ..Default::default()
        },
    );

    // Synthetic workload: 128 ops under the adaptive policy, with the
    // allocator signaling scarce headroom around op 70.
    for i in 0..128u32 {
        if i == 70 {
            pressure.set_level(PressureLevel::Elevated);
        } else if i == 71 {
            pressure.set_level(PressureLevel::Relaxed);
        }
        stream.encode(EncodedOp::named(format!("op{}", i)));
        stream
            .synchronize(SubmissionPolicy::Adaptive)
            .context("synchronize failed")?;
    }

    stream.commit_and_wait().context("final wait failed")?;
    log::info!("Workload drained, pending ops: {}", stream.pending_ops());

    for event in event_rx.try_iter() {
        log::info!(
            "Submitted buffer {} ({} ops, {:?})",
            event.buffer,
            event.ops,
            event.reason
        );
    }

    drop(stream);
    worker.join();
    Ok(())
}
