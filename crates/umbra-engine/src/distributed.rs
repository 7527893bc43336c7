//! Coordinator/worker ray tracing over typed request/response channels.
//!
//! The protocol is the closed tag vocabulary of the multi-process
//! deployment: workers announce `ready`; the coordinator answers
//! `give_task` with a pixel range (carrying `impactcoords` or
//! `noimpactcoords`); workers answer `raytrace_done` with the filled
//! pixels; the coordinator issues `terminate` at drain. A worker that
//! dies holding a task has its range reissued to a later `ready` worker;
//! partial results are never merged.
//!
//! Workers here run as threads sharing the scenery; the protocol types
//! carry everything a process boundary would need, so swapping the
//! transport does not touch them.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Select, Sender};
use log::{debug, warn};

use umbra_core::{PixelProps, Quantity, TraceBuffer};

use crate::metrics::TraceMetrics;
use crate::scenery::Scenery;
use crate::trace::{PixelRange, TraceError};

// ── Protocol ────────────────────────────────────────────────────

/// Messages from the coordinator to a worker.
#[derive(Clone, Debug)]
pub enum CoordinatorMessage {
    /// `give_task`: trace a pixel range. `impactcoords` carries 16 slots
    /// per pixel in range order (the `impactcoords` tag); `None` is the
    /// `noimpactcoords` tag.
    GiveTask {
        /// The rectangle to trace.
        range: PixelRange,
        /// Pre-computed impact coordinates, 16 per pixel.
        impactcoords: Option<Vec<f64>>,
    },
    /// `read_scenery`: re-synchronize the worker's scenery view.
    ReadScenery,
    /// `raytrace`: enter ray-tracing mode.
    Raytrace,
    /// `terminate`: shut down.
    Terminate,
}

/// Messages from a worker to the coordinator.
#[derive(Clone, Debug)]
pub enum WorkerMessage {
    /// `ready`: idle and willing to take a task.
    Ready,
    /// `raytrace_done`: a completed task with its filled pixels.
    RaytraceDone {
        /// The completed rectangle.
        range: PixelRange,
        /// Per-pixel accumulators, `(i, j, props)`.
        pixels: Vec<(usize, usize, PixelProps)>,
    },
}

/// Channel pair joining the coordinator to one worker.
pub struct WorkerLink {
    /// Coordinator → worker.
    pub tx: Sender<CoordinatorMessage>,
    /// Worker → coordinator.
    pub rx: Receiver<WorkerMessage>,
}

/// The coordinator lost every worker with tasks still pending.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DistributedError {
    /// Tasks that could not be completed.
    pub pending: usize,
}

impl fmt::Display for DistributedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "all workers lost with {} task(s) still pending",
            self.pending
        )
    }
}

impl Error for DistributedError {}

// ── Worker ──────────────────────────────────────────────────────

/// Worker main loop: `ready` → (`give_task` → trace → `raytrace_done`)*
/// → `terminate`.
///
/// A trace failure drops the channels; the coordinator observes the
/// disconnect and reissues the pending range.
pub fn worker_loop(
    scenery: &Scenery,
    rx: Receiver<CoordinatorMessage>,
    tx: Sender<WorkerMessage>,
) {
    if tx.send(WorkerMessage::Ready).is_err() {
        return;
    }
    while let Ok(msg) = rx.recv() {
        match msg {
            CoordinatorMessage::GiveTask {
                range,
                impactcoords,
            } => {
                let mut pixels = Vec::with_capacity(range.width() * range.height());
                for (offset, (i, j)) in range.iter().enumerate() {
                    let mut props =
                        PixelProps::new(scenery.quantities(), scenery.n_spectral());
                    let ic = impactcoords
                        .as_deref()
                        .map(|data| &data[offset * 16..offset * 16 + 16]);
                    match scenery.trace_pixel(i, j, &mut props, ic) {
                        Ok(_) => pixels.push((i, j, props)),
                        Err(e) => {
                            warn!("worker abandoning task {range:?}: {e}");
                            return;
                        }
                    }
                }
                if tx
                    .send(WorkerMessage::RaytraceDone { range, pixels })
                    .is_err()
                {
                    return;
                }
                if tx.send(WorkerMessage::Ready).is_err() {
                    return;
                }
            }
            CoordinatorMessage::ReadScenery => {
                // In-process deployment shares the scenery; nothing to
                // refresh.
            }
            CoordinatorMessage::Raytrace => {
                if tx.send(WorkerMessage::Ready).is_err() {
                    return;
                }
            }
            CoordinatorMessage::Terminate => break,
        }
    }
}

// ── Coordinator ─────────────────────────────────────────────────

struct WorkerSlot {
    link: WorkerLink,
    outstanding: Option<PixelRange>,
    alive: bool,
}

/// Distribute `tasks` over the linked workers and collect every filled
/// pixel.
///
/// `impact_for` supplies the `impactcoords` payload of a task (or `None`
/// for `noimpactcoords`). Returns once every task completed; errs when
/// all workers are gone with tasks pending.
pub fn coordinate(
    tasks: Vec<PixelRange>,
    links: Vec<WorkerLink>,
    impact_for: impl Fn(&PixelRange) -> Option<Vec<f64>>,
) -> Result<Vec<(usize, usize, PixelProps)>, DistributedError> {
    let mut pending: VecDeque<PixelRange> = tasks.into();
    let mut slots: Vec<WorkerSlot> = links
        .into_iter()
        .map(|link| WorkerSlot {
            link,
            outstanding: None,
            alive: true,
        })
        .collect();
    let mut results = Vec::new();

    loop {
        let done = pending.is_empty() && slots.iter().all(|s| s.outstanding.is_none());
        if done {
            for slot in slots.iter().filter(|s| s.alive) {
                let _ = slot.link.tx.send(CoordinatorMessage::Terminate);
            }
            return Ok(results);
        }
        if !slots.iter().any(|s| s.alive) {
            let lost = pending.len()
                + slots.iter().filter(|s| s.outstanding.is_some()).count();
            return Err(DistributedError { pending: lost });
        }

        // Wait for any live worker to speak.
        let (idx, message) = {
            let mut select = Select::new();
            let mut indexed = Vec::new();
            for (idx, slot) in slots.iter().enumerate() {
                if slot.alive {
                    select.recv(&slot.link.rx);
                    indexed.push(idx);
                }
            }
            let oper = select.select();
            let idx = indexed[oper.index()];
            (idx, oper.recv(&slots[idx].link.rx))
        };

        match message {
            Ok(WorkerMessage::Ready) => {
                if let Some(task) = pending.pop_front() {
                    let msg = CoordinatorMessage::GiveTask {
                        range: task,
                        impactcoords: impact_for(&task),
                    };
                    if slots[idx].link.tx.send(msg).is_ok() {
                        slots[idx].outstanding = Some(task);
                    } else {
                        warn!("worker {idx} gone before task handoff; requeueing");
                        slots[idx].alive = false;
                        pending.push_front(task);
                    }
                } else {
                    // Drained: this worker is no longer needed.
                    let _ = slots[idx].link.tx.send(CoordinatorMessage::Terminate);
                    slots[idx].alive = false;
                }
            }
            Ok(WorkerMessage::RaytraceDone { range, pixels }) => {
                debug!("task {range:?} done: {} pixels", pixels.len());
                slots[idx].outstanding = None;
                results.extend(pixels);
            }
            Err(_) => {
                // Worker disconnected. Reissue anything it held; its
                // partial output is never merged.
                slots[idx].alive = false;
                if let Some(task) = slots[idx].outstanding.take() {
                    warn!("worker {idx} lost; reissuing {task:?}");
                    pending.push_front(task);
                }
            }
        }
    }
}

// ── Scenery entry point ─────────────────────────────────────────

impl Scenery {
    /// Ray-trace a rectangle through the coordinator/worker protocol.
    ///
    /// Spawns `n_workers` protocol workers (at least one), distributes
    /// row tasks, and merges completed tasks into `buffer`. Semantics
    /// match [`ray_trace`](Scenery::ray_trace); only the dispatch
    /// transport differs.
    pub fn ray_trace_distributed(
        &self,
        range: &PixelRange,
        buffer: &mut TraceBuffer,
        impactcoords: Option<&TraceBuffer>,
        n_workers: usize,
    ) -> Result<TraceMetrics, TraceError> {
        let start = Instant::now();
        if buffer.width() != range.width() || buffer.height() != range.height() {
            return Err(umbra_core::InvariantError::new(format!(
                "buffer is {}x{} but range is {}x{}",
                buffer.width(),
                buffer.height(),
                range.width(),
                range.height()
            ))
            .into());
        }
        if let Some(ic) = impactcoords {
            if ic.block(Quantity::ImpactCoords, 0, 0).is_none() {
                return Err(umbra_core::InvariantError::new(
                    "impactcoords buffer does not hold the ImpactCoords quantity",
                )
                .into());
            }
        }
        let n_workers = n_workers.max(1);
        let tasks: Vec<PixelRange> = range.rows().collect();

        let mut links = Vec::with_capacity(n_workers);
        let mut worker_ends = Vec::with_capacity(n_workers);
        for _ in 0..n_workers {
            let (coord_tx, worker_rx) = unbounded();
            let (worker_tx, coord_rx) = unbounded();
            links.push(WorkerLink {
                tx: coord_tx,
                rx: coord_rx,
            });
            worker_ends.push((worker_rx, worker_tx));
        }

        let impact_for = |task: &PixelRange| {
            impactcoords.map(|ic| {
                let mut data = Vec::with_capacity(task.width() * task.height() * 16);
                for (i, j) in task.iter() {
                    let block = ic
                        .block(Quantity::ImpactCoords, i - range.imin, j - range.jmin)
                        .expect("validated impactcoords buffer");
                    data.extend_from_slice(block);
                }
                data
            })
        };

        let outcome = std::thread::scope(|scope| {
            for (worker_rx, worker_tx) in worker_ends {
                scope.spawn(move || worker_loop(self, worker_rx, worker_tx));
            }
            coordinate(tasks, links, impact_for)
        });

        let pixels = outcome.map_err(TraceError::from)?;
        let mut metrics = TraceMetrics {
            pixels: pixels.len(),
            ..TraceMetrics::default()
        };
        for (i, j, props) in &pixels {
            metrics.hits += props.hit as usize;
            buffer.merge(i - range.imin, j - range.jmin, props);
        }
        metrics.elapsed = start.elapsed();
        Ok(metrics)
    }
}
