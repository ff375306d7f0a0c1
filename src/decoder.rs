//! The sequence and picture state machine. A `Vc2Decoder` consumes a stream
//! one data unit at a time through a caller-owned [`StreamCursor`], caches
//! the last sequence header and transform parameters it configured for, and
//! rebuilds its job arena only when either changes.

use crate::backend::Backend;
use crate::constants::{PARSE_INFO_HEADER_SIZE, PICTURE_NUMBER_SIZE};
use crate::error::{DecodeStatus, Vc2DecoderError};
use crate::job::{Job, JobContext, JobOutput};
use crate::params::DecoderParams;
use crate::parse_code::ParseCode;
use crate::partition::{Partition, PartitionRequest};
use crate::quant_matrix::QuantMatrix;
use crate::scheduler::Scheduler;
use crate::sequence_header::SequenceHeader;
use crate::slices::{self, CodedSlice, SliceFormat};
use crate::stream::{StreamCursor, find_next_parse_info, parse_info};
use crate::transform_params::TransformParams;
use crate::video_format::{OutputFormat, VideoFormat};
use crate::wavelet::{self, FilterDef};

/// Caller-owned output planes: luma, then the two half-width chroma planes,
/// each with its own row stride in samples. For interlaced streams each
/// picture is one field, so the caller passes field views.
pub struct PictureBuffer<'a> {
    pub planes: [&'a mut [u16]; 3],
    pub strides: [usize; 3],
}

impl<'a> PictureBuffer<'a> {
    pub fn new(planes: [&'a mut [u16]; 3], strides: [usize; 3]) -> Self {
        Self { planes, strides }
    }

    /// Cuts every plane into the disjoint row segments written by each job.
    fn job_rows(&mut self, partition: &Partition) -> Result<Vec<JobOutput<'_>>, Vc2DecoderError> {
        let (nx, ny) = (partition.jobs_x(), partition.jobs_y());
        let mut outputs: Vec<JobOutput> = (0..nx * ny)
            .map(|_| [Vec::new(), Vec::new(), Vec::new()])
            .collect();

        for (c, (plane, &stride)) in self.planes.iter_mut().zip(&self.strides).enumerate() {
            let width: usize = (0..nx).map(|jx| partition.jobs[jx].planes[c].output_width).sum();
            let height: usize = (0..ny)
                .map(|jy| partition.jobs[jy * nx].planes[c].output_height)
                .sum();
            if stride < width || plane.len() < (height - 1) * stride + width {
                log::error!(
                    "Output plane {} of {} samples at stride {} cannot hold {}x{}",
                    c,
                    plane.len(),
                    stride,
                    width,
                    height
                );
                return Err(Vc2DecoderError::BadParams);
            }

            let mut rows = plane.chunks_mut(stride);
            for jy in 0..ny {
                for _ in 0..partition.jobs[jy * nx].planes[c].output_height {
                    let row = rows.next().ok_or(Vc2DecoderError::BadParams)?;
                    let (mut rest, _) = row.split_at_mut(width);
                    for jx in 0..nx {
                        let w = partition.jobs[jy * nx + jx].planes[c].output_width;
                        let (head, tail) = std::mem::take(&mut rest).split_at_mut(w);
                        outputs[jy * nx + jx][c].push(head);
                        rest = tail;
                    }
                }
            }
        }
        Ok(outputs)
    }
}

/// Header fields and counters of the stream decoded so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceInfo {
    pub sequence_header: Option<SequenceHeader>,
    pub video_format: Option<VideoFormat>,
    pub transform_params: Option<TransformParams>,
    pub sequence_headers_seen: u64,
    pub pictures_decoded: u64,
    pub last_picture_number: u32,
}

/// Everything built from one (sequence header, transform parameters) pair.
/// Replaced as a whole on reconfiguration.
#[derive(Debug)]
struct JobArena {
    partition: Partition,
    matrix: QuantMatrix,
    filter: &'static FilterDef,
    depth: usize,
    slice_format: SliceFormat,
    jobs: Vec<Job>,
    records: Vec<Vec<CodedSlice>>,
}

#[derive(Debug)]
pub struct Vc2Decoder {
    params: DecoderParams,
    detected: Backend,
    backend: Backend,
    scheduler: Scheduler,
    sequence_header_bytes: Vec<u8>,
    transform_params_bytes: Vec<u8>,
    info: SequenceInfo,
    arena: Option<JobArena>,
    rebuilds: usize,
}

impl Vc2Decoder {
    pub fn new() -> Result<Self, Vc2DecoderError> {
        let detected = Backend::detect();
        let params = DecoderParams::default();
        log::info!("Using {} backend", detected.kind());
        Ok(Self {
            scheduler: Scheduler::new(params.threads)?,
            params,
            detected,
            backend: detected,
            sequence_header_bytes: Vec::new(),
            transform_params_bytes: Vec::new(),
            info: SequenceInfo::default(),
            arena: None,
            rebuilds: 0,
        })
    }

    pub fn params(&self) -> &DecoderParams {
        &self.params
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Applies user configuration. A configured decoder rebuilds its jobs and
    /// worker pool straight away.
    pub fn set_params(&mut self, params: DecoderParams) -> Result<(), Vc2DecoderError> {
        params.validate()?;
        if params.numa_first_node >= 0 {
            log::info!(
                "NUMA first node {} requested, worker affinity is left to the OS",
                params.numa_first_node
            );
        }
        self.params = params;
        self.backend = params.backend.map(Backend::new).unwrap_or(self.detected);
        if self.arena.is_some() {
            self.rebuild()?;
        }
        Ok(())
    }

    /// Whether a sequence header and transform parameters have been applied.
    pub fn is_configured(&self) -> bool {
        self.arena.is_some()
    }

    /// Number of times the job arena has been built.
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    pub fn sequence_info(&self) -> &SequenceInfo {
        &self.info
    }

    /// Geometry of the pictures `decode_one_picture` writes, once a sequence
    /// header has been seen.
    pub fn output_format(&self) -> Result<OutputFormat, Vc2DecoderError> {
        let (Some(header), Some(format)) = (&self.info.sequence_header, &self.info.video_format)
        else {
            return Err(Vc2DecoderError::BadParams);
        };
        let interlaced = header.is_interlaced();
        let mut output = OutputFormat::new(format, interlaced);
        if let Some(p) = self.params.partial_decode {
            output.width = p.width as u32;
            output.height = p.height as u32 * if interlaced { 2 } else { 1 };
        }
        Ok(output)
    }

    /// Scans forward to the first sequence header and configures for it.
    /// Stops early at auxiliary data unless `skip_aux` is set.
    pub fn synchronise(
        &mut self,
        cursor: &mut StreamCursor,
        skip_aux: bool,
    ) -> Result<DecodeStatus, Vc2DecoderError> {
        let data = cursor.remaining_data();
        let mut offset = 0;
        let info = loop {
            if offset >= data.len() {
                cursor.seek_to_end();
                return Ok(DecodeStatus::EndOfSequence);
            }
            let info = match parse_info(&data[offset..]) {
                Ok(info) => info,
                Err(Vc2DecoderError::NotParseInfo) => {
                    offset += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            match info.code() {
                Ok(ParseCode::SequenceHeader) => break info,
                Ok(ParseCode::AuxiliaryData) if !skip_aux => {
                    cursor.skip(offset)?;
                    return Ok(DecodeStatus::Auxiliary);
                }
                _ => offset += info.next_header().unwrap_or(PARSE_INFO_HEADER_SIZE),
            }
        };

        let unit = &data[offset + PARSE_INFO_HEADER_SIZE..];
        let length = self.process_sequence_header(unit)?.1;
        cursor.skip(offset + info.next_header().unwrap_or(PARSE_INFO_HEADER_SIZE + length))?;
        Ok(DecodeStatus::Reconfigured)
    }

    /// Decodes data units until one produces a result for the caller: a
    /// changed sequence header, a picture, auxiliary data, an unsupported
    /// picture or the end of the sequence.
    pub fn decode_one_picture(
        &mut self,
        cursor: &mut StreamCursor,
        picture: &mut PictureBuffer,
        skip_aux: bool,
    ) -> Result<DecodeStatus, Vc2DecoderError> {
        let data = cursor.remaining_data();
        let mut offset = 0;
        while offset < data.len() {
            let info = match parse_info(&data[offset..]) {
                Ok(info) => info,
                Err(Vc2DecoderError::NotParseInfo) => {
                    log::error!("No parse info header where one was expected at {}", offset);
                    return Err(Vc2DecoderError::BadStream);
                }
                Err(e) => return Err(e),
            };
            let unit_start = offset + PARSE_INFO_HEADER_SIZE;
            let next = info.next_header().map(|n| offset + n);
            if next.is_some_and(|n| n > data.len()) {
                log::error!("Data unit at {} runs off the end of the input", offset);
                return Err(Vc2DecoderError::CoderOverrun);
            }
            let unit = &data[unit_start..next.unwrap_or(data.len())];

            match info.code() {
                Ok(ParseCode::SequenceHeader) => {
                    let (changed, length) = self.process_sequence_header(unit)?;
                    if changed {
                        cursor.skip(next.unwrap_or(unit_start + length))?;
                        return Ok(DecodeStatus::Reconfigured);
                    }
                }
                Ok(ParseCode::EndOfSequence) => {
                    cursor.skip(unit_start)?;
                    return Ok(DecodeStatus::EndOfSequence);
                }
                Ok(ParseCode::AuxiliaryData) if !skip_aux => {
                    cursor.skip(offset)?;
                    return Ok(DecodeStatus::Auxiliary);
                }
                Ok(ParseCode::AuxiliaryData) | Ok(ParseCode::PaddingData) => {}
                Ok(code) if code.is_unsupported_picture() => {
                    log::warn!("Skipping picture with unsupported parse code {:?}", code);
                    cursor.skip(next.unwrap_or(unit_start))?;
                    return Ok(DecodeStatus::InvalidPicture);
                }
                Ok(ParseCode::HighQualityPicture) => {
                    let used = self.decode_picture(unit, picture)?;
                    let resume = match next {
                        Some(n) => n,
                        None => {
                            let end = unit_start + used;
                            find_next_parse_info(&data[end..]).map_or(data.len(), |k| end + k)
                        }
                    };
                    cursor.skip(resume)?;
                    return Ok(DecodeStatus::Picture);
                }
                _ => log::warn!("Unknown parse code 0x{:02x}", info.parse_code),
            }

            match next {
                Some(n) => offset = n,
                None => {
                    cursor.skip(unit_start)?;
                    return Ok(DecodeStatus::EndOfSequence);
                }
            }
        }

        log::warn!("Premature end of stream");
        cursor.seek_to_end();
        Ok(DecodeStatus::EndOfSequence)
    }

    /// Returns the payload of the auxiliary data unit at the cursor and moves
    /// past it. Valid right after an `Auxiliary` result.
    pub fn extract_aux<'a>(&self, cursor: &mut StreamCursor<'a>) -> Result<&'a [u8], Vc2DecoderError> {
        let data = cursor.remaining_data();
        if data.len() < PARSE_INFO_HEADER_SIZE {
            return Err(Vc2DecoderError::CoderOverrun);
        }
        let info = parse_info(data)?;
        if info.code() != Ok(ParseCode::AuxiliaryData) {
            return Err(Vc2DecoderError::NotParseInfo);
        }
        let end = match info.next_header() {
            Some(n) if n > data.len() => {
                log::error!("Auxiliary data runs {} bytes past the input", n - data.len());
                return Err(Vc2DecoderError::CoderOverrun);
            }
            Some(n) => n,
            None => data.len(),
        };
        cursor.skip(end)?;
        Ok(&data[PARSE_INFO_HEADER_SIZE..end])
    }

    /// Parses a sequence header unless its bytes match the one already
    /// applied. Returns whether it changed and its encoded length.
    fn process_sequence_header(&mut self, data: &[u8]) -> Result<(bool, usize), Vc2DecoderError> {
        self.info.sequence_headers_seen += 1;
        if !self.sequence_header_bytes.is_empty() && data.starts_with(&self.sequence_header_bytes) {
            return Ok((false, self.sequence_header_bytes.len()));
        }

        log::info!("Processing sequence header");
        let header = SequenceHeader::parse(data)?;
        let format = VideoFormat::resolve(&header.video_format)?;
        format.check_supported()?;
        log::info!(
            "Sequence: {}x{} {}, {} active bits, {}/{} fps",
            format.frame_width,
            format.frame_height,
            if header.is_interlaced() { "fields" } else { "frames" },
            format.active_bits(),
            format.frame_rate.numer,
            format.frame_rate.denom
        );

        self.sequence_header_bytes = data[..header.encoded_length].to_vec();
        self.info.sequence_header = Some(header);
        self.info.video_format = Some(format);
        // Job geometry depends on the frame size; the next picture rebuilds.
        self.arena = None;
        self.transform_params_bytes.clear();
        Ok((true, header.encoded_length))
    }

    /// Parses transform parameters unless they match the ones the arena was
    /// built for. Returns their encoded length.
    fn process_transform_params(&mut self, data: &[u8]) -> Result<usize, Vc2DecoderError> {
        if self.arena.is_some()
            && !self.transform_params_bytes.is_empty()
            && data.starts_with(&self.transform_params_bytes)
        {
            return Ok(self.transform_params_bytes.len());
        }

        log::info!("Processing transform parameters");
        let params = TransformParams::parse(data)?;
        self.transform_params_bytes = data[..params.encoded_length].to_vec();
        self.info.transform_params = Some(params);
        self.rebuild()?;
        Ok(params.encoded_length)
    }

    /// Builds the quantisation matrix, worker pool and jobs for the current
    /// sequence header and transform parameters.
    fn rebuild(&mut self) -> Result<(), Vc2DecoderError> {
        self.arena = None;
        let (Some(header), Some(format), Some(transform)) = (
            &self.info.sequence_header,
            &self.info.video_format,
            &self.info.transform_params,
        ) else {
            return Ok(());
        };

        let matrix = QuantMatrix::new(
            transform.wavelet,
            transform.depth,
            transform.custom_quant_matrix.as_ref(),
        )?;

        if self.scheduler.threads() != self.params.threads {
            self.scheduler = Scheduler::new(self.params.threads)?;
        }

        let height = if header.is_interlaced() {
            format.frame_height / 2
        } else {
            format.frame_height
        };
        let partition = Partition::new(&PartitionRequest {
            width: format.frame_width as usize,
            height: height as usize,
            slices_x: transform.slices_x as usize,
            slices_y: transform.slices_y as usize,
            depth: transform.depth,
            threads: self.params.threads,
            partial: self.params.partial_decode,
        })?;

        let sample_size = transform.wavelet.sample_size();
        let jobs: Vec<Job> = partition
            .jobs
            .iter()
            .map(|g| Job::new(g.clone(), sample_size))
            .collect();
        let records = partition
            .jobs
            .iter()
            .map(|g| vec![CodedSlice::default(); g.slice_count()])
            .collect();

        log::info!(
            "Configured {:?} depth {} with {}x{} slices of {}x{}, {}x{} jobs on {} threads ({} backend)",
            transform.wavelet,
            transform.depth,
            transform.slices_x,
            transform.slices_y,
            partition.x.slice_size,
            partition.y.slice_size,
            partition.jobs_x(),
            partition.jobs_y(),
            self.scheduler.threads(),
            self.backend.kind()
        );

        self.arena = Some(JobArena {
            matrix,
            filter: wavelet::filter(transform.wavelet),
            depth: transform.depth as usize,
            slice_format: SliceFormat {
                prefix_bytes: transform.slice_prefix_bytes as usize,
                size_scalar: transform.slice_size_scalar as usize,
            },
            jobs,
            records,
            partition,
        });
        self.rebuilds += 1;
        Ok(())
    }

    /// Decodes the HQ picture data unit `unit` into `picture`, returning the
    /// number of bytes the picture occupied.
    fn decode_picture(
        &mut self,
        unit: &[u8],
        picture: &mut PictureBuffer,
    ) -> Result<usize, Vc2DecoderError> {
        let Some(format) = self.info.video_format else {
            log::error!("Picture received before any sequence header");
            return Err(Vc2DecoderError::BadStream);
        };
        let mut cursor = StreamCursor::new(unit);
        self.info.last_picture_number = cursor.read_u32()?;
        let transform_length = self.process_transform_params(cursor.remaining_data())?;
        cursor.skip(transform_length)?;
        let slice_data = cursor.remaining_data();

        let colourise = self.params.colourise();
        let backend = self.backend;
        let Some(arena) = self.arena.as_mut() else {
            return Err(Vc2DecoderError::NoQuantiser);
        };
        let used = slices::deserialise(
            slice_data,
            &arena.slice_format,
            &arena.partition,
            &mut arena.records,
        )?;
        log::debug!(
            "Picture {}: {} bytes of slices",
            self.info.last_picture_number,
            used
        );

        let outputs = picture.job_rows(&arena.partition)?;
        let ctx = JobContext {
            backend,
            filter: arena.filter,
            matrix: &arena.matrix,
            depth: arena.depth,
            active_bits: format.active_bits(),
            colourise,
            data: slice_data,
        };
        let tasks: Vec<_> = arena
            .jobs
            .iter_mut()
            .zip(&arena.records)
            .zip(outputs)
            .collect();
        self.scheduler
            .run(tasks, |((job, records), out)| job.decode(&ctx, records, out))?;

        self.info.pictures_decoded += 1;
        Ok(PICTURE_NUMBER_SIZE + transform_length + used)
    }
}
