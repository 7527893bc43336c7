//! Ray-trace dispatchers: single pixel, inline rectangle, shared-memory
//! worker pool.
//!
//! One pixel is one independent unit of work: a photon clone integrated
//! backward, then walked against the emitter segment by segment. Output
//! determinism is structural — every pixel computes identically whatever
//! the worker count, and each output slot is written by exactly one
//! owner.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crossbeam_channel::unbounded;
use log::{debug, warn};

use umbra_astrobj::hit::TRANSMISSION_FLOOR;
use umbra_astrobj::AstrobjError;
use umbra_core::{CoordKind, InvariantError, PixelProps, Quantity, TraceBuffer};
use umbra_photon::StopReason;

use crate::distributed::DistributedError;
use crate::metrics::TraceMetrics;
use crate::scenery::Scenery;
use crate::screen::ScreenError;

// ── PixelRange ──────────────────────────────────────────────────

/// An inclusive pixel rectangle on the screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRange {
    /// First column.
    pub imin: usize,
    /// Last column (inclusive).
    pub imax: usize,
    /// First row.
    pub jmin: usize,
    /// Last row (inclusive).
    pub jmax: usize,
}

impl PixelRange {
    /// The full screen of a given resolution.
    pub fn full(resolution: usize) -> Self {
        Self {
            imin: 0,
            imax: resolution - 1,
            jmin: 0,
            jmax: resolution - 1,
        }
    }

    /// Columns in the rectangle.
    pub fn width(&self) -> usize {
        self.imax - self.imin + 1
    }

    /// Rows in the rectangle.
    pub fn height(&self) -> usize {
        self.jmax - self.jmin + 1
    }

    /// Pixels, column-major (`i` fastest).
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let range = *self;
        (range.jmin..=range.jmax)
            .flat_map(move |j| (range.imin..=range.imax).map(move |i| (i, j)))
    }

    /// One single-row subrange per row, for task distribution.
    pub fn rows(&self) -> impl Iterator<Item = PixelRange> + '_ {
        let range = *self;
        (range.jmin..=range.jmax).map(move |j| PixelRange {
            imin: range.imin,
            imax: range.imax,
            jmin: j,
            jmax: j,
        })
    }
}

// ── TraceError ──────────────────────────────────────────────────

/// Fatal ray-trace failures. Pixel-local conditions (stalls, horizon,
/// escape) are not errors; they land in [`PixelOutcome`].
#[derive(Debug)]
pub enum TraceError {
    /// Pixel index outside the screen.
    Screen(ScreenError),
    /// Emitter failure; a coordinate-kind mismatch aborts the run.
    Astrobj(AstrobjError),
    /// Buffer or range inconsistency.
    Invariant(InvariantError),
    /// The distributed pool lost every worker.
    Distributed(DistributedError),
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Screen(e) => write!(f, "{e}"),
            Self::Astrobj(e) => write!(f, "{e}"),
            Self::Invariant(e) => write!(f, "{e}"),
            Self::Distributed(e) => write!(f, "{e}"),
        }
    }
}

impl Error for TraceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Screen(e) => Some(e),
            Self::Astrobj(e) => Some(e),
            Self::Invariant(e) => Some(e),
            Self::Distributed(e) => Some(e),
        }
    }
}

impl From<ScreenError> for TraceError {
    fn from(e: ScreenError) -> Self {
        Self::Screen(e)
    }
}

impl From<AstrobjError> for TraceError {
    fn from(e: AstrobjError) -> Self {
        Self::Astrobj(e)
    }
}

impl From<InvariantError> for TraceError {
    fn from(e: InvariantError) -> Self {
        Self::Invariant(e)
    }
}

impl From<DistributedError> for TraceError {
    fn from(e: DistributedError) -> Self {
        Self::Distributed(e)
    }
}

// ── PixelOutcome ────────────────────────────────────────────────

/// How one pixel's trace ended.
#[derive(Clone, Copy, Debug)]
pub struct PixelOutcome {
    /// Why the photon stopped (`None` on the impactcoords path).
    pub stop: Option<StopReason>,
    /// Whether the ray met the emitter.
    pub hit: bool,
    /// Accepted integrator steps.
    pub steps: usize,
}

// ── Dispatch ────────────────────────────────────────────────────

impl Scenery {
    /// Trace one pixel into a fresh accumulator.
    ///
    /// With `impactcoords` (16 slots recorded by a previous trace) the
    /// integrator is skipped and only the radiative fold at the recorded
    /// impact runs — the optically-thick re-render path.
    pub fn trace_pixel(
        &self,
        i: usize,
        j: usize,
        props: &mut PixelProps,
        impactcoords: Option<&[f64]>,
    ) -> Result<PixelOutcome, TraceError> {
        let metric = self.metric();
        let (pos, p) = self.screen().pixel_ray(i, j, &**metric)?;
        let obs = self.obs_info(&pos, &p);

        if let Some(block) = impactcoords {
            if block[0].is_nan() {
                return Ok(PixelOutcome {
                    stop: None,
                    hit: false,
                    steps: 0,
                });
            }
            let mut coord_ph = [0.0; 8];
            let mut coord_obj = [0.0; 8];
            coord_ph.copy_from_slice(&block[..8]);
            coord_obj.copy_from_slice(&block[8..16]);
            self.astrobj().process_at(&coord_ph, &coord_obj, &obs, props);
            return Ok(PixelOutcome {
                stop: None,
                hit: true,
                steps: 0,
            });
        }

        let mut photon = self.clone_photon();
        photon.seed(pos, p);
        let stop = photon
            .integrate()
            .map_err(TraceError::Invariant)?;

        if props.requested.contains(Quantity::NbCrossEqPlane) {
            let kind = metric.coord_kind();
            props.nb_cross_eq_plane = photon.worldline().count_sign_changes(|s| match kind {
                CoordKind::Spherical => s[1] * s[2].cos(),
                CoordKind::Cartesian => s[3],
            }) as f64;
        }

        let primary_only = self.tuning().primary_only;
        let mut hit = false;
        let segments = photon.worldline().len().saturating_sub(1);
        for segment in 0..segments {
            if self
                .astrobj()
                .impact(&**metric, &photon, segment, &obs, props)?
            {
                hit = true;
                if primary_only {
                    break;
                }
            }
            if props.max_transmission() < TRANSMISSION_FLOOR {
                break;
            }
        }

        Ok(PixelOutcome {
            stop: Some(stop),
            hit,
            steps: photon.steps(),
        })
    }

    /// Ray-trace a pixel rectangle into a caller-owned buffer.
    ///
    /// `impactcoords`, when given, must be a buffer holding the
    /// `ImpactCoords` quantity for the same rectangle; the integrator is
    /// then skipped for every pixel. `cancel` is checked between pixels;
    /// on cancellation the already-completed pixels stay merged.
    ///
    /// With more than one configured thread (and thread-safe metric and
    /// emitter) pixels are traced by a worker pool; output is identical
    /// to the single-threaded result whatever the worker count.
    pub fn ray_trace(
        &self,
        range: &PixelRange,
        buffer: &mut TraceBuffer,
        impactcoords: Option<&TraceBuffer>,
        cancel: Option<&AtomicBool>,
    ) -> Result<TraceMetrics, TraceError> {
        let start = Instant::now();
        if buffer.width() != range.width() || buffer.height() != range.height() {
            return Err(InvariantError::new(format!(
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
                return Err(InvariantError::new(
                    "impactcoords buffer does not hold the ImpactCoords quantity",
                )
                .into());
            }
        }

        let mut workers = self.n_threads().max(1);
        if workers > 1 && !(self.metric().thread_safe() && self.astrobj().thread_safe()) {
            warn!(
                "metric or emitter not declared thread-safe; falling back to 1 worker"
            );
            workers = 1;
        }

        let mut metrics = if workers == 1 {
            self.trace_rows_inline(range, buffer, impactcoords, cancel)?
        } else {
            self.trace_rows_pooled(workers, range, buffer, impactcoords, cancel)?
        };
        metrics.elapsed = start.elapsed();
        debug!(
            "ray_trace: {} pixels, {} hits, {} steps in {:?}",
            metrics.pixels, metrics.hits, metrics.steps, metrics.elapsed
        );
        Ok(metrics)
    }

    fn pixel_impactcoords<'a>(
        &self,
        impactcoords: Option<&'a TraceBuffer>,
        range: &PixelRange,
        i: usize,
        j: usize,
    ) -> Option<&'a [f64]> {
        impactcoords
            .and_then(|ic| ic.block(Quantity::ImpactCoords, i - range.imin, j - range.jmin))
    }

    fn trace_rows_inline(
        &self,
        range: &PixelRange,
        buffer: &mut TraceBuffer,
        impactcoords: Option<&TraceBuffer>,
        cancel: Option<&AtomicBool>,
    ) -> Result<TraceMetrics, TraceError> {
        let mut metrics = TraceMetrics::default();
        for (i, j) in range.iter() {
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                break;
            }
            let mut props = PixelProps::new(self.quantities(), self.n_spectral());
            let ic = self.pixel_impactcoords(impactcoords, range, i, j);
            let outcome = self.trace_pixel(i, j, &mut props, ic)?;
            buffer.merge(i - range.imin, j - range.jmin, &props);
            metrics.pixels += 1;
            metrics.hits += outcome.hit as usize;
            metrics.steps += outcome.steps as u64;
        }
        Ok(metrics)
    }

    fn trace_rows_pooled(
        &self,
        workers: usize,
        range: &PixelRange,
        buffer: &mut TraceBuffer,
        impactcoords: Option<&TraceBuffer>,
        cancel: Option<&AtomicBool>,
    ) -> Result<TraceMetrics, TraceError> {
        type RowResult = (PixelRange, Vec<(usize, usize, PixelProps)>, TraceMetrics);

        let (task_tx, task_rx) = unbounded::<PixelRange>();
        let (result_tx, result_rx) = unbounded::<Result<RowResult, TraceError>>();
        for row in range.rows() {
            task_tx.send(row).expect("receiver alive");
        }
        drop(task_tx);

        let mut first_error = None;
        let mut metrics = TraceMetrics::default();

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    while let Ok(row) = task_rx.recv() {
                        if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                            break;
                        }
                        let mut pixels = Vec::with_capacity(row.width());
                        let mut row_metrics = TraceMetrics::default();
                        let mut failed = None;
                        for (i, j) in row.iter() {
                            let mut props =
                                PixelProps::new(self.quantities(), self.n_spectral());
                            let ic = self.pixel_impactcoords(impactcoords, range, i, j);
                            match self.trace_pixel(i, j, &mut props, ic) {
                                Ok(outcome) => {
                                    row_metrics.pixels += 1;
                                    row_metrics.hits += outcome.hit as usize;
                                    row_metrics.steps += outcome.steps as u64;
                                    pixels.push((i, j, props));
                                }
                                Err(e) => {
                                    failed = Some(e);
                                    break;
                                }
                            }
                        }
                        let msg = match failed {
                            None => Ok((row, pixels, row_metrics)),
                            Some(e) => Err(e),
                        };
                        if result_tx.send(msg).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            for msg in result_rx.iter() {
                match msg {
                    Ok((_row, pixels, row_metrics)) => {
                        for (i, j, props) in &pixels {
                            buffer.merge(i - range.imin, j - range.jmin, props);
                        }
                        metrics.absorb(&row_metrics);
                    }
                    Err(e) => {
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }
        });

        match first_error {
            Some(e) => Err(e),
            None => Ok(metrics),
        }
    }
}
