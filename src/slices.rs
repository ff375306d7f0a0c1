//! Walks the slice data of an HQ picture and hands each slice to the jobs
//! that decode it.
//!
//! Slices are stored in raster order, each as
//! `[prefix][qindex][len Y][Y][len Cb][Cb][len Cr][Cr]` where every length
//! byte is multiplied by the slice size scalar.

use crate::error::Vc2DecoderError;
use crate::partition::{Partition, SliceOwner};
use crate::stream::StreamCursor;

/// Location of one coded slice inside the picture data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodedSlice {
    pub qindex: u8,
    pub offsets: [usize; 3],
    pub lengths: [usize; 3],
}

impl CodedSlice {
    /// Coded bytes of component `c`.
    pub fn component<'a>(&self, data: &'a [u8], c: usize) -> Result<&'a [u8], Vc2DecoderError> {
        let start = self.offsets[c];
        data.get(start..start + self.lengths[c])
            .ok_or(Vc2DecoderError::CoderOverrun)
    }

    pub fn coded_bytes(&self) -> usize {
        self.lengths.iter().sum()
    }
}

/// Layout constants of the slices of one picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceFormat {
    pub prefix_bytes: usize,
    pub size_scalar: usize,
}

fn read_slice(cursor: &mut StreamCursor, format: &SliceFormat) -> Result<CodedSlice, Vc2DecoderError> {
    cursor.skip(format.prefix_bytes)?;
    let mut slice = CodedSlice {
        qindex: cursor.read_u8()?,
        ..Default::default()
    };
    for c in 0..3 {
        let length = usize::from(cursor.read_u8()?) * format.size_scalar;
        slice.offsets[c] = cursor.position();
        slice.lengths[c] = length;
        if cursor.skip(length).is_err() {
            log::error!(
                "Coder overrun: slice component ends at {} of {} bytes",
                cursor.position() + length,
                cursor.source().len()
            );
            return Err(Vc2DecoderError::CoderOverrun);
        }
    }
    Ok(slice)
}

/// Reads every slice of the picture starting at `data[0]`, storing each
/// retained slice in its owner's record list and copying shared slices to the
/// neighbouring jobs. Returns the number of bytes the slices occupy.
pub fn deserialise(
    data: &[u8],
    format: &SliceFormat,
    partition: &Partition,
    records: &mut [Vec<CodedSlice>],
) -> Result<usize, Vc2DecoderError> {
    let mut cursor = StreamCursor::new(data);
    for sy in 0..partition.slices_y() {
        for sx in 0..partition.slices_x() {
            let slice = read_slice(&mut cursor, format)?;
            let ownership = partition.owner(sx, sy);
            let (owner, neighbours) = match &ownership {
                SliceOwner::Excluded => continue,
                SliceOwner::Owned(job) => (*job, &[][..]),
                SliceOwner::Shared(job, neighbours) => (*job, neighbours.as_slice()),
            };
            for &job in std::iter::once(&owner).chain(neighbours) {
                let index = partition.jobs[job].record_index(sx, sy);
                records[job][index] = slice;
            }
        }
    }
    Ok(cursor.position())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::PartitionRequest;

    fn pack(slices: &[(u8, [&[u8]; 3])], prefix: usize, scalar: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for (q, components) in slices {
            out.extend(std::iter::repeat_n(0xEE, prefix));
            out.push(*q);
            for c in components {
                assert_eq!(c.len() % scalar, 0);
                out.push((c.len() / scalar) as u8);
                out.extend_from_slice(c);
            }
        }
        out
    }

    fn partition(slices_x: usize, slices_y: usize, threads: usize) -> Partition {
        Partition::new(&PartitionRequest {
            width: slices_x * 32,
            height: slices_y * 8,
            slices_x,
            slices_y,
            depth: 2,
            threads,
            partial: None,
        })
        .unwrap()
    }

    fn empty_records(partition: &Partition) -> Vec<Vec<CodedSlice>> {
        partition
            .jobs
            .iter()
            .map(|j| vec![CodedSlice::default(); j.slice_count()])
            .collect()
    }

    #[test]
    fn test_single_job_records_every_slice() {
        let p = partition(1, 1, 1);
        let data = pack(&[(7, [&[1, 2], &[3, 4], &[]])], 1, 2);
        let mut records = empty_records(&p);
        let format = SliceFormat {
            prefix_bytes: 1,
            size_scalar: 2,
        };
        let used = deserialise(&data, &format, &p, &mut records).unwrap();
        assert_eq!(used, data.len());
        let slice = records[0][0];
        assert_eq!(slice.qindex, 7);
        assert_eq!(slice.component(&data, 0).unwrap(), &[1, 2]);
        assert_eq!(slice.component(&data, 1).unwrap(), &[3, 4]);
        assert!(slice.component(&data, 2).unwrap().is_empty());
        assert_eq!(slice.coded_bytes(), 4);
    }

    #[test]
    fn test_shared_slices_reach_every_holder() {
        let p = partition(8, 6, 1);
        const EMPTY: &[u8] = &[];
        let slices: Vec<(u8, [&[u8]; 3])> = (0..48).map(|i| (i as u8, [EMPTY; 3])).collect();
        let data = pack(&slices, 0, 1);
        let mut records = empty_records(&p);
        let format = SliceFormat {
            prefix_bytes: 0,
            size_scalar: 1,
        };
        deserialise(&data, &format, &p, &mut records).unwrap();
        for (j, job) in p.jobs.iter().enumerate() {
            for sy in job.slice_start_y..job.slice_start_y + job.slices_y {
                for sx in job.slice_start_x..job.slice_start_x + job.slices_x {
                    let record = records[j][job.record_index(sx, sy)];
                    assert_eq!(
                        usize::from(record.qindex),
                        sy * 8 + sx,
                        "job {} slice {},{}",
                        j,
                        sx,
                        sy
                    );
                }
            }
        }
    }

    #[test]
    fn test_truncated_slice_overruns() {
        let p = partition(1, 1, 1);
        let mut data = pack(&[(7, [&[1, 2], &[3, 4], &[5, 6]])], 0, 1);
        data.truncate(data.len() - 1);
        let mut records = empty_records(&p);
        let format = SliceFormat {
            prefix_bytes: 0,
            size_scalar: 1,
        };
        assert_eq!(
            deserialise(&data, &format, &p, &mut records),
            Err(Vc2DecoderError::CoderOverrun)
        );
        // Missing length byte
        assert_eq!(
            deserialise(&data[..1], &format, &p, &mut records),
            Err(Vc2DecoderError::CoderOverrun)
        );
    }
}
