//! vc2decode - VC-2 HQ profile decoder command-line utility.
//!
//! Decodes a whole stream file into planar 4:2:2 16-bit little-endian frames
//! and reports the decode speed and the sequence parameters.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use vc2hqdecode::sequence_header::{PresetOrCustom, SequenceHeader};
use vc2hqdecode::{
    BackendKind, DecodeStatus, DecoderParams, OutputFormat, PictureBuffer, SequenceInfo,
    StreamCursor, Vc2Decoder,
};

/// VC-2 HQ profile decoder
#[derive(Parser)]
#[command(name = "vc2decode")]
#[command(version)]
#[command(about = "VC-2 HQ profile decoder", long_about = None)]
#[command(after_help = "All input files must be VC-2 streams.
All output files are yuv422p with each sample in a 16-bit little-endian word.

EXAMPLES:
    vc2decode -n 50 -t 8 -d stream.vc2
    vc2decode -q stream.vc2 quantisers.yuv")]
struct Cli {
    /// Encoded input file
    input_file: PathBuf,

    /// Output file (defaults to the input file with .yuv appended)
    output_file: Option<PathBuf>,

    /// Number of frames to decode, looping over the input as needed
    #[arg(short, long, default_value = "1")]
    num_frames: usize,

    /// Number of decoder threads
    #[arg(short, long, default_value = "1")]
    threads: usize,

    /// Decode without writing any output
    #[arg(short, long)]
    disable_output: bool,

    /// Replace chroma with a map of slice quantisers
    #[arg(short = 'q', long)]
    colourise_quantiser: bool,

    /// Replace chroma with a map of slice padding
    #[arg(short = 'p', long)]
    colourise_padding: bool,

    /// Replace chroma with a map of slices without padding
    #[arg(short = 'u', long)]
    colourise_unpadded: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Force a kernel set: reference or accelerated
    #[arg(long)]
    backend: Option<BackendKind>,
}

const BASE_VIDEO_FORMAT_NAMES: [&str; 23] = [
    "Custom",
    "QSIF525",
    "QCIF",
    "SIF525",
    "CIF",
    "4SIF525",
    "4CIF",
    "SD480I-60",
    "SD576I-50",
    "HD720P-60",
    "HD720P-50",
    "HD1080I-60",
    "HD1080I-50",
    "HD1080P-60",
    "HD1080P-50",
    "DC2K",
    "DC4K",
    "UHDTV 4K-60",
    "UHDTV 4K-50",
    "UHDTV 8K-60",
    "UHDTV 8K-50",
    "HD1080P-24",
    "SD Pro486",
];

fn main() {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if cli.verbose { "info" } else { "warn" })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Frame buffer laid out as the output file: luma, then Cb, then Cr.
fn picture_view<'a>(frame: &'a mut [u16], fmt: &OutputFormat, field: usize) -> PictureBuffer<'a> {
    let (w, h) = (fmt.width as usize, fmt.height as usize);
    let (y, chroma) = frame.split_at_mut(w * h);
    let (u, v) = chroma.split_at_mut(w * h / 2);
    if fmt.interlaced {
        PictureBuffer::new(
            [
                &mut y[field * w..],
                &mut u[field * w / 2..],
                &mut v[field * w / 2..],
            ],
            [w * 2, w, w],
        )
    } else {
        PictureBuffer::new([y, u, v], [w, w / 2, w / 2])
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let input = fs::read(&cli.input_file)?;
    println!("Read {} bytes of input data", input.len());

    let mut decoder = Vc2Decoder::new()?;
    decoder.set_params(DecoderParams {
        threads: cli.threads,
        colourise_quantiser: cli.colourise_quantiser,
        colourise_padding: cli.colourise_padding,
        colourise_unpadded: cli.colourise_unpadded,
        backend: cli.backend,
        ..Default::default()
    })?;

    let mut format: Option<OutputFormat> = None;
    let mut frames: Vec<Vec<u16>> = Vec::new();
    let mut total_frames = 0;
    let mut frames_from_sequence = 0;
    let mut time_taken = Duration::ZERO;

    while total_frames < cli.num_frames {
        let mut cursor = StreamCursor::new(&input);
        if decoder.synchronise(&mut cursor, true)? != DecodeStatus::Reconfigured {
            return Err("no sequence header in input".into());
        }

        let fmt = decoder.output_format()?;
        if format.is_none_or(|f| {
            f.width != fmt.width || f.height != fmt.height || f.interlaced != fmt.interlaced
        }) {
            let samples = fmt.width as usize * fmt.height as usize * 2;
            frames = vec![vec![0u16; samples]; cli.num_frames];
            format = Some(fmt);
        }
        let fields = if fmt.interlaced { 2 } else { 1 };

        let mut picture = 0;
        let start = Instant::now();
        while total_frames < cli.num_frames {
            let Some(frame) = frames.get_mut(picture / fields) else {
                break;
            };
            let mut buffer = picture_view(frame, &fmt, picture % fields);
            match decoder.decode_one_picture(&mut cursor, &mut buffer, true)? {
                DecodeStatus::EndOfSequence => break,
                DecodeStatus::Picture => {
                    picture += 1;
                    if picture % fields == 0 {
                        total_frames += 1;
                    }
                    if cursor.is_at_end() {
                        eprintln!("Premature end of stream");
                        break;
                    }
                }
                DecodeStatus::Reconfigured => {
                    eprintln!("Warning: this sequence changes parameters part way through");
                    break;
                }
                other => {
                    eprintln!("Unexpected decoder result: {:?}", other);
                    break;
                }
            }
        }
        time_taken += start.elapsed();

        if picture == 0 {
            return Err("no pictures in sequence".into());
        }
        frames_from_sequence = frames_from_sequence.max(picture / fields);
    }

    let seconds = time_taken.as_secs_f64();
    println!("--------------------------------------------------");
    println!("  {} frames decoded in {:5.3}s", total_frames, seconds);
    println!("  {:5.3}fps", total_frames as f64 / seconds.max(f64::EPSILON));
    println!("--------------------------------------------------");
    print_sequence_info(decoder.sequence_info());

    if !cli.disable_output {
        let output = cli.output_file.clone().unwrap_or_else(|| {
            let mut name = cli.input_file.clone().into_os_string();
            name.push(".yuv");
            PathBuf::from(name)
        });
        let mut writer = BufWriter::new(File::create(&output)?);
        for frame in &frames[..frames_from_sequence] {
            for sample in frame {
                writer.write_all(&sample.to_le_bytes())?;
            }
        }
        writer.flush()?;
        println!("Wrote out {} frames to {:?}", frames_from_sequence, output);
    }
    Ok(())
}

fn print_header_overrides(header: &SequenceHeader) {
    let vf = &header.video_format;
    if let Some((w, h)) = vf.dimensions {
        println!("      + Dimension                      : {}x{}", w, h);
    }
    if let Some(index) = vf.color_diff_format {
        println!("      + Colour Diff                    : {}", index);
    }
    if let Some(index) = vf.scan_format {
        println!("      + Scan Format                    : {}", index);
    }
    match vf.frame_rate {
        Some(PresetOrCustom::Custom((n, d))) => {
            println!("      + Frame Rate                     : {}/{} fps", n, d)
        }
        Some(PresetOrCustom::Preset(index)) => {
            println!("      + Frame Rate                     : preset {}", index)
        }
        None => {}
    }
    match vf.pixel_aspect_ratio {
        Some(PresetOrCustom::Custom((n, d))) => {
            println!("      + Pixel Aspect Ratio             : {}:{}", n, d)
        }
        Some(PresetOrCustom::Preset(index)) => {
            println!("      + Pixel Aspect Ratio             : preset {}", index)
        }
        None => {}
    }
    if let Some(area) = vf.clean_area {
        println!(
            "      + Clean Area                     : ({} - {})x({} - {})",
            area.left_offset,
            area.left_offset + area.width,
            area.top_offset,
            area.top_offset + area.height
        );
    }
    if let Some(range) = &vf.signal_range {
        println!("      + Signal Range                   : index {}", range.index());
    }
    if let Some(spec) = &vf.color_spec {
        println!("      + Colour Spec                    : index {}", spec.index());
    }
}

fn print_sequence_info(info: &SequenceInfo) {
    println!("--------------------------------------------------------------------------------");
    println!("  Sequence Headers: {}", info.sequence_headers_seen);
    println!();
    if let Some(header) = &info.sequence_header {
        let base = header.video_format.base_video_format;
        let name = BASE_VIDEO_FORMAT_NAMES
            .get(base as usize)
            .copied()
            .unwrap_or("Unknown");
        println!("    Video Format:");
        println!("      Base format                      : {} ({:2})", name, base);
        print_header_overrides(header);
        println!();
        println!(
            "    Picture Coding Mode              : {}",
            if header.is_interlaced() { "Pictures are fields" } else { "Pictures are frames" }
        );
    }
    if let Some(format) = &info.video_format {
        let range = &format.signal_range;
        println!(
            "    Resolved                         : {}x{} {}/{} fps, {}-bit",
            format.frame_width,
            format.frame_height,
            format.frame_rate.numer,
            format.frame_rate.denom,
            range.luma_active_bits
        );
    }
    if let Some(t) = &info.transform_params {
        println!();
        println!("    Transform Parameters:");
        println!("      Wavelet                          : {:?}", t.wavelet);
        println!("      Depth                            : {}", t.depth);
        println!("      Slices                           : {}x{}", t.slices_x, t.slices_y);
        println!("      Slice Prefix Bytes               : {}", t.slice_prefix_bytes);
        println!("      Slice Size Scalar                : {}", t.slice_size_scalar);
        if t.custom_quant_matrix.is_some() {
            println!("      Custom Quantisation Matrix       : yes");
        }
    }
    println!();
    println!("  Pictures Decoded: {}", info.pictures_decoded);
    println!("  Last Picture Number: {}", info.last_picture_number);
    println!("--------------------------------------------------------------------------------");
}
