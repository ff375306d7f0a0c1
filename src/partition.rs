//! Splits a picture into a grid of jobs that decode independently.
//!
//! Each axis is handled on its own: the slices that intersect the output
//! rectangle are divided between jobs, interior job boundaries are widened by
//! an overlap of whole slices so each job can run the inverse transform
//! without its neighbour, and every slice gets an ownership entry saying
//! which job reads it from the stream and which neighbour gets a copy.

use crate::constants::{HORIZONTAL_OVERLAP_PIXELS, MAXIMUM_JOBS, VERTICAL_OVERLAP_SLICES};
use crate::error::Vc2DecoderError;
use crate::params::PartialDecode;

/// Columns by rows for each power-of-two job count.
const GRID_SHAPES: [(usize, usize); 7] = [(1, 1), (2, 1), (2, 2), (4, 2), (4, 4), (8, 4), (8, 8)];

/// Job grid for a thread count: the smallest power of two at least four times
/// the thread count, capped at [`MAXIMUM_JOBS`].
pub fn grid_shape(threads: usize) -> (usize, usize) {
    let jobs = threads.max(1).saturating_mul(4).next_power_of_two().min(MAXIMUM_JOBS);
    GRID_SHAPES[jobs.trailing_zeros() as usize]
}

/// Size in pixels of one slice along an axis. The picture is padded to a
/// multiple of the transform block, which the slice count must divide.
pub fn slice_size(dimension: usize, slices: usize, depth: u32) -> Result<usize, Vc2DecoderError> {
    let block = 1usize << depth;
    let padded = dimension.div_ceil(block) * block;
    if slices == 0 || padded % slices != 0 {
        log::error!(
            "Padded dimension {} is not divisible into {} slices",
            padded,
            slices
        );
        return Err(Vc2DecoderError::NotImplemented);
    }
    Ok(padded / slices)
}

/// Primary owner of a slice along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOwner {
    /// Outside the output rectangle; the slice is skipped.
    Excluded,
    Owned(usize),
    /// Owned by this job and also read by the next job along the axis.
    Shared(usize),
}

/// One job's share of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisJob {
    /// First slice decoded by the job, including its leading overlap.
    pub slice_start: usize,
    /// Slices decoded by the job, including overlaps on both sides.
    pub slices: usize,
    /// Pixel offset of the first output sample inside the job's tile.
    pub output_offset: usize,
    pub output_size: usize,
    /// Pixel offset of the first output sample in the caller's picture.
    pub target: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisLayout {
    pub slice_size: usize,
    pub overlap: usize,
    pub jobs: Vec<AxisJob>,
    pub owners: Vec<AxisOwner>,
}

/// Slices retained for an output range and the pixels cropped off each end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AxisCrop {
    skip: usize,
    count: usize,
    pre: usize,
    post: usize,
}

impl AxisCrop {
    fn new(offset: usize, size: usize, slice_size: usize) -> Self {
        let first = offset / slice_size;
        let last = (offset + size - 1) / slice_size;
        Self {
            skip: first,
            count: last - first + 1,
            pre: offset - first * slice_size,
            post: (last + 1) * slice_size - (offset + size),
        }
    }
}

/// Slices decoded for output by job `index` of `jobs`, before overlaps.
fn core_slices(count: usize, jobs: usize, index: usize) -> usize {
    let per_job = count.div_ceil(jobs);
    if index + 1 == jobs {
        count - (jobs - 1) * per_job
    } else {
        per_job
    }
}

/// Whether `count` slices split into `jobs` leaves every job enough slices to
/// both own some and cover the overlaps it shares with its neighbours.
fn fits(count: usize, jobs: usize, overlap: usize) -> bool {
    if jobs <= 1 {
        return count >= 1;
    }
    let per_job = count.div_ceil(jobs);
    if (jobs - 1) * per_job >= count {
        return false;
    }
    let edge = overlap.max(1);
    let interior = (2 * overlap).max(1);
    let last = core_slices(count, jobs, jobs - 1);
    per_job >= edge && last >= edge && (jobs < 3 || per_job >= interior)
}

impl AxisLayout {
    /// Lays out `jobs` jobs (fewer if the axis is too short) over `total`
    /// slices of `slice_size` pixels, keeping the output range
    /// `offset..offset + size`.
    pub fn new(
        total: usize,
        slice_size: usize,
        offset: usize,
        size: usize,
        jobs: usize,
        overlap: usize,
    ) -> Self {
        let crop = AxisCrop::new(offset, size, slice_size);
        let mut n = jobs.max(1);
        while n > 1 && !fits(crop.count, n, overlap) {
            n /= 2;
        }
        let per_job = crop.count.div_ceil(n);

        let mut layout = Vec::with_capacity(n);
        for index in 0..n {
            let first = index == 0;
            let last = index + 1 == n;
            let core = core_slices(crop.count, n, index);
            let lead = if first { 0 } else { overlap };
            let trail = if last { 0 } else { overlap };
            layout.push(AxisJob {
                slice_start: crop.skip + index * per_job - lead,
                slices: lead + core + trail,
                output_offset: lead * slice_size + if first { crop.pre } else { 0 },
                output_size: core * slice_size
                    - if first { crop.pre } else { 0 }
                    - if last { crop.post } else { 0 },
                target: index * per_job * slice_size - if first { 0 } else { crop.pre },
            });
        }

        let mut owners = vec![AxisOwner::Excluded; total];
        let mut next = crop.skip;
        for (index, job) in layout.iter().enumerate() {
            let lead = if index == 0 { 0 } else { 2 * overlap };
            let trail = if index + 1 == n { 0 } else { 2 * overlap };
            let owned = job.slices - lead - trail;
            for _ in 0..owned {
                owners[next] = AxisOwner::Owned(index);
                next += 1;
            }
            for _ in 0..trail {
                owners[next] = AxisOwner::Shared(index);
                next += 1;
            }
        }

        Self {
            slice_size,
            overlap,
            jobs: layout,
            owners,
        }
    }
}

/// Jobs that receive a copy of a shared slice in addition to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbours {
    ids: [usize; 3],
    count: usize,
}

impl Neighbours {
    fn new(ids: &[usize]) -> Self {
        let mut out = Self {
            ids: [0; 3],
            count: ids.len(),
        };
        out.ids[..ids.len()].copy_from_slice(ids);
        out
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.ids[..self.count]
    }
}

/// Ownership of one slice of the picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceOwner {
    Excluded,
    Owned(usize),
    Shared(usize, Neighbours),
}

/// Pixel geometry of one job in one plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneGeometry {
    pub tile_width: usize,
    pub tile_height: usize,
    pub slice_width: usize,
    pub slice_height: usize,
    pub output_x: usize,
    pub output_y: usize,
    pub output_width: usize,
    pub output_height: usize,
    pub target_x: usize,
    pub target_y: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobGeometry {
    pub slice_start_x: usize,
    pub slice_start_y: usize,
    pub slices_x: usize,
    pub slices_y: usize,
    /// Luma, then the two half-width chroma planes.
    pub planes: [PlaneGeometry; 3],
}

impl JobGeometry {
    fn new(x: &AxisLayout, y: &AxisLayout, jx: usize, jy: usize) -> Self {
        let (ax, ay) = (&x.jobs[jx], &y.jobs[jy]);
        let luma = PlaneGeometry {
            tile_width: ax.slices * x.slice_size,
            tile_height: ay.slices * y.slice_size,
            slice_width: x.slice_size,
            slice_height: y.slice_size,
            output_x: ax.output_offset,
            output_y: ay.output_offset,
            output_width: ax.output_size,
            output_height: ay.output_size,
            target_x: ax.target,
            target_y: ay.target,
        };
        let chroma = PlaneGeometry {
            tile_width: luma.tile_width / 2,
            slice_width: luma.slice_width / 2,
            output_x: luma.output_x / 2,
            output_width: luma.output_width / 2,
            target_x: luma.target_x / 2,
            ..luma
        };
        Self {
            slice_start_x: ax.slice_start,
            slice_start_y: ay.slice_start,
            slices_x: ax.slices,
            slices_y: ay.slices,
            planes: [luma, chroma, chroma],
        }
    }

    pub fn slice_count(&self) -> usize {
        self.slices_x * self.slices_y
    }

    /// Position of slice `(sx, sy)` within this job's slice records.
    pub fn record_index(&self, sx: usize, sy: usize) -> usize {
        (sy - self.slice_start_y) * self.slices_x + (sx - self.slice_start_x)
    }

    pub fn contains(&self, sx: usize, sy: usize) -> bool {
        (self.slice_start_x..self.slice_start_x + self.slices_x).contains(&sx)
            && (self.slice_start_y..self.slice_start_y + self.slices_y).contains(&sy)
    }
}

/// Input to [`Partition::new`]: picture (or field) size, slice grid and the
/// optional output crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionRequest {
    pub width: usize,
    pub height: usize,
    pub slices_x: usize,
    pub slices_y: usize,
    pub depth: u32,
    pub threads: usize,
    pub partial: Option<PartialDecode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub x: AxisLayout,
    pub y: AxisLayout,
    pub jobs: Vec<JobGeometry>,
}

impl Partition {
    pub fn new(request: &PartitionRequest) -> Result<Self, Vc2DecoderError> {
        if request.depth == 0 {
            log::error!("Transform depth 0 is not supported");
            return Err(Vc2DecoderError::NotImplemented);
        }
        if request.width == 0 || request.height == 0 {
            log::error!("Empty picture");
            return Err(Vc2DecoderError::NotImplemented);
        }
        let slice_width = slice_size(request.width, request.slices_x, request.depth)?;
        let slice_height = slice_size(request.height, request.slices_y, request.depth)?;
        let block = 1usize << request.depth;
        if (slice_width / 2) % block != 0 || slice_height % block != 0 {
            log::error!(
                "Slices of {}x{} do not hold whole {}x{} transform blocks in every plane",
                slice_width,
                slice_height,
                block,
                block
            );
            return Err(Vc2DecoderError::NotImplemented);
        }

        let (offset_x, offset_y, width, height) = match request.partial {
            Some(p) => {
                if p.width == 0
                    || p.height == 0
                    || p.offset_x % 2 != 0
                    || p.width % 2 != 0
                    || p.offset_x + p.width > request.width
                    || p.offset_y + p.height > request.height
                {
                    log::error!(
                        "Partial decode {}x{}+{}+{} does not fit a {}x{} picture",
                        p.width,
                        p.height,
                        p.offset_x,
                        p.offset_y,
                        request.width,
                        request.height
                    );
                    return Err(Vc2DecoderError::BadParams);
                }
                (p.offset_x, p.offset_y, p.width, p.height)
            }
            None => (0, 0, request.width, request.height),
        };

        let (grid_x, grid_y) = grid_shape(request.threads);
        let x = AxisLayout::new(
            request.slices_x,
            slice_width,
            offset_x,
            width,
            grid_x,
            HORIZONTAL_OVERLAP_PIXELS / slice_width,
        );
        let y = AxisLayout::new(
            request.slices_y,
            slice_height,
            offset_y,
            height,
            grid_y,
            VERTICAL_OVERLAP_SLICES,
        );

        let mut jobs = Vec::with_capacity(x.jobs.len() * y.jobs.len());
        for jy in 0..y.jobs.len() {
            for jx in 0..x.jobs.len() {
                jobs.push(JobGeometry::new(&x, &y, jx, jy));
            }
        }

        Ok(Self { x, y, jobs })
    }

    pub fn jobs_x(&self) -> usize {
        self.x.jobs.len()
    }

    pub fn jobs_y(&self) -> usize {
        self.y.jobs.len()
    }

    pub fn slices_x(&self) -> usize {
        self.x.owners.len()
    }

    pub fn slices_y(&self) -> usize {
        self.y.owners.len()
    }

    pub fn owner(&self, sx: usize, sy: usize) -> SliceOwner {
        let columns = self.jobs_x();
        let id = |jx: usize, jy: usize| jy * columns + jx;
        match (self.x.owners[sx], self.y.owners[sy]) {
            (AxisOwner::Excluded, _) | (_, AxisOwner::Excluded) => SliceOwner::Excluded,
            (AxisOwner::Owned(jx), AxisOwner::Owned(jy)) => SliceOwner::Owned(id(jx, jy)),
            (AxisOwner::Shared(jx), AxisOwner::Owned(jy)) => {
                SliceOwner::Shared(id(jx, jy), Neighbours::new(&[id(jx + 1, jy)]))
            }
            (AxisOwner::Owned(jx), AxisOwner::Shared(jy)) => {
                SliceOwner::Shared(id(jx, jy), Neighbours::new(&[id(jx, jy + 1)]))
            }
            (AxisOwner::Shared(jx), AxisOwner::Shared(jy)) => SliceOwner::Shared(
                id(jx, jy),
                Neighbours::new(&[id(jx, jy + 1), id(jx + 1, jy), id(jx + 1, jy + 1)]),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(width: usize, height: usize, slices: (usize, usize), threads: usize) -> PartitionRequest {
        PartitionRequest {
            width,
            height,
            slices_x: slices.0,
            slices_y: slices.1,
            depth: 3,
            threads,
            partial: None,
        }
    }

    #[test]
    fn test_grid_shape() {
        assert_eq!(grid_shape(1), (2, 2));
        assert_eq!(grid_shape(2), (4, 2));
        assert_eq!(grid_shape(3), (4, 4));
        assert_eq!(grid_shape(4), (4, 4));
        assert_eq!(grid_shape(8), (8, 4));
        assert_eq!(grid_shape(16), (8, 8));
        assert_eq!(grid_shape(1000), (8, 8));
    }

    #[test]
    fn test_slice_size() {
        assert_eq!(slice_size(1920, 60, 3), Ok(32));
        // 1080 rows do not split into 68 slices
        assert_eq!(slice_size(1080, 68, 3), Err(Vc2DecoderError::NotImplemented));
        assert_eq!(slice_size(1917, 60, 3), Ok(32));
    }

    #[test]
    fn test_axis_with_overlap() {
        let axis = AxisLayout::new(8, 32, 0, 256, 2, 1);
        assert_eq!(axis.jobs.len(), 2);
        assert_eq!(
            axis.jobs[0],
            AxisJob {
                slice_start: 0,
                slices: 5,
                output_offset: 0,
                output_size: 128,
                target: 0,
            }
        );
        assert_eq!(
            axis.jobs[1],
            AxisJob {
                slice_start: 3,
                slices: 5,
                output_offset: 32,
                output_size: 128,
                target: 128,
            }
        );
        use AxisOwner::*;
        assert_eq!(
            axis.owners,
            vec![Owned(0), Owned(0), Owned(0), Shared(0), Shared(0), Owned(1), Owned(1), Owned(1)]
        );
    }

    #[test]
    fn test_axis_shrinks_when_too_short() {
        // Two slices cannot feed four jobs with one slice of overlap
        let axis = AxisLayout::new(2, 16, 0, 32, 4, 1);
        assert_eq!(axis.jobs.len(), 2);
        let axis = AxisLayout::new(1, 16, 0, 16, 8, 1);
        assert_eq!(axis.jobs.len(), 1);
        assert_eq!(axis.owners, vec![AxisOwner::Owned(0)]);
    }

    #[test]
    fn test_axis_crop() {
        // Output 40..140 of ten 32-pixel slices
        let axis = AxisLayout::new(10, 32, 40, 100, 2, 0);
        let total: usize = axis.jobs.iter().map(|j| j.output_size).sum();
        assert_eq!(total, 100);
        assert_eq!(axis.owners[0], AxisOwner::Excluded);
        assert_eq!(axis.owners[5], AxisOwner::Excluded);
        assert_eq!(axis.jobs[0].slice_start, 1);
        assert_eq!(axis.jobs[0].output_offset, 8);
        assert_eq!(axis.jobs[0].target, 0);
        // The second job starts at picture column 3 * 32 = 96, output column 56
        assert_eq!(axis.jobs[1].target, 56);
        assert_eq!(axis.jobs[0].output_size, 56);
        assert_eq!(axis.jobs[1].output_size, 44);
    }

    #[test]
    fn test_output_rectangles_tile_the_picture() {
        let partition = Partition::new(&request(256, 96, (8, 6), 2)).unwrap();
        let (w, h) = (256, 96);
        let mut covered = vec![0u8; w * h];
        for job in &partition.jobs {
            let p = &job.planes[0];
            assert!(p.output_x + p.output_width <= p.tile_width);
            assert!(p.output_y + p.output_height <= p.tile_height);
            for y in p.target_y..p.target_y + p.output_height {
                for x in p.target_x..p.target_x + p.output_width {
                    covered[y * w + x] += 1;
                }
            }
        }
        assert!(covered.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_every_slice_owned_once_and_replicated_at_boundaries() {
        for threads in [1, 2, 4, 8, 16] {
            for (sx, sy) in [(1, 1), (2, 2), (4, 3), (8, 6), (16, 16), (30, 17), (60, 68)] {
                let (width, height) = (sx * 16, sy * 8);
                let partition = Partition::new(&request(width, height, (sx, sy), threads)).unwrap();
                for y in 0..sy {
                    for x in 0..sx {
                        let owner = partition.owner(x, y);
                        let holders: Vec<usize> = partition
                            .jobs
                            .iter()
                            .enumerate()
                            .filter(|(_, j)| j.contains(x, y))
                            .map(|(i, _)| i)
                            .collect();
                        match owner {
                            SliceOwner::Excluded => panic!("slice {},{} excluded", x, y),
                            SliceOwner::Owned(job) => assert_eq!(holders, vec![job]),
                            SliceOwner::Shared(job, neighbours) => {
                                let mut expected = vec![job];
                                expected.extend_from_slice(neighbours.as_slice());
                                expected.sort_unstable();
                                assert!(matches!(expected.len(), 2 | 4));
                                assert_eq!(holders, expected, "slice {},{}", x, y);
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_chroma_geometry_is_half_width() {
        let partition = Partition::new(&request(256, 64, (8, 4), 1)).unwrap();
        for job in &partition.jobs {
            let [luma, cb, cr] = job.planes;
            assert_eq!(cb, cr);
            assert_eq!(cb.tile_width * 2, luma.tile_width);
            assert_eq!(cb.output_width * 2, luma.output_width);
            assert_eq!(cb.target_x * 2, luma.target_x);
            assert_eq!(cb.tile_height, luma.tile_height);
        }
    }

    #[test]
    fn test_rejects_unsupported_geometry() {
        let mut bad = request(256, 64, (8, 4), 1);
        bad.depth = 0;
        assert_eq!(Partition::new(&bad), Err(Vc2DecoderError::NotImplemented));

        // 4-pixel chroma slices cannot hold an 8x8 block at depth 3
        let bad = request(256, 64, (32, 4), 1);
        assert_eq!(Partition::new(&bad), Err(Vc2DecoderError::NotImplemented));

        let mut bad = request(256, 64, (8, 4), 1);
        bad.partial = Some(PartialDecode {
            offset_x: 200,
            offset_y: 0,
            width: 100,
            height: 10,
        });
        assert_eq!(Partition::new(&bad), Err(Vc2DecoderError::BadParams));

        // Chroma is half width, so the crop must start on an even column
        bad.partial = Some(PartialDecode {
            offset_x: 3,
            offset_y: 0,
            width: 100,
            height: 10,
        });
        assert_eq!(Partition::new(&bad), Err(Vc2DecoderError::BadParams));
    }
}
