//! Resumable region scans for transport sources.
//!
//! Newly loaded regions produce no placement events, so sources inside them
//! are found by scanning. A [`ScanCursor`] covers a cube around a center in
//! fixed-size sub-volumes and remembers how far it got, so the scheduler can
//! spread one scan over many ticks.

use conduit_core::catalog::Classifiable;
use conduit_core::coord::{Coord, DimensionId, Location};
use conduit_core::node::Classifier;
use conduit_core::world::{Cell, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanProgress {
    InProgress,
    Finished,
}

/// Continuation state for one region scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCursor {
    dim: DimensionId,
    center: Coord,
    min: Coord,
    max: Coord,
    chunk_size: i32,
    counts: [usize; 3],
    next: usize,
}

impl ScanCursor {
    /// A scan of the cube `center ± radius`, split into `chunk_size`^3
    /// sub-volumes. A zero `chunk_size` is treated as one.
    pub fn new(center: Location, radius: u32, chunk_size: u32) -> Self {
        let r = i32::try_from(radius).unwrap_or(i32::MAX);
        let size = i32::try_from(chunk_size.max(1)).unwrap_or(i32::MAX);
        let c = center.at;
        let min = Coord::new(c.x.saturating_sub(r), c.y.saturating_sub(r), c.z.saturating_sub(r));
        let max = Coord::new(c.x.saturating_add(r), c.y.saturating_add(r), c.z.saturating_add(r));
        let count = |lo: i32, hi: i32| {
            let extent = i64::from(hi) - i64::from(lo) + 1;
            usize::try_from((extent + i64::from(size) - 1) / i64::from(size)).unwrap_or(usize::MAX)
        };
        Self {
            dim: center.dim,
            center: c,
            min,
            max,
            chunk_size: size,
            counts: [count(min.x, max.x), count(min.y, max.y), count(min.z, max.z)],
            next: 0,
        }
    }

    pub fn center(&self) -> Location {
        Location::new(self.dim, self.center)
    }

    pub fn total_chunks(&self) -> usize {
        self.counts[0]
            .saturating_mul(self.counts[1])
            .saturating_mul(self.counts[2])
    }

    pub fn remaining(&self) -> usize {
        self.total_chunks() - self.next
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.total_chunks()
    }

    /// Scan at most `max_chunks` sub-volumes, appending every transport
    /// source found to `found`. Unloaded cells are skipped.
    pub fn advance<W>(
        &mut self,
        classifier: &Classifier<'_>,
        world: &W,
        max_chunks: usize,
        found: &mut Vec<Location>,
    ) -> ScanProgress
    where
        W: World + ?Sized,
    {
        for _ in 0..max_chunks {
            if self.is_finished() {
                break;
            }
            self.scan_chunk(classifier, world, self.next, found);
            self.next += 1;
        }
        if self.is_finished() {
            ScanProgress::Finished
        } else {
            ScanProgress::InProgress
        }
    }

    fn scan_chunk<W>(&self, classifier: &Classifier<'_>, world: &W, index: usize, found: &mut Vec<Location>)
    where
        W: World + ?Sized,
    {
        let [nx, ny, _] = self.counts;
        let ix = index % nx;
        let iy = (index / nx) % ny;
        let iz = index / nx.saturating_mul(ny);

        let lo = |min: i32, i: usize| {
            let step = i32::try_from(i).unwrap_or(i32::MAX);
            min.saturating_add(step.saturating_mul(self.chunk_size))
        };
        let (x0, y0, z0) = (lo(self.min.x, ix), lo(self.min.y, iy), lo(self.min.z, iz));
        let hi = |start: i32, max: i32| start.saturating_add(self.chunk_size - 1).min(max);
        let (x1, y1, z1) = (hi(x0, self.max.x), hi(y0, self.max.y), hi(z0, self.max.z));

        for x in x0..=x1 {
            for z in z0..=z1 {
                for y in y0..=y1 {
                    let loc = Location::new(self.dim, Coord::new(x, y, z));
                    let Cell::Block(block_type) = world.get_cell(loc) else {
                        continue;
                    };
                    let is_source = classifier
                        .catalog()
                        .get(block_type)
                        .is_some_and(|def| def.is_transport_source());
                    if is_source {
                        found.push(loc);
                    }
                }
            }
        }
    }
}
