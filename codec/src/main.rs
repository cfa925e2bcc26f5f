use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use codec_lib::{Decoder, DirSink, GifSink, Source, Stats, SIZE_FIELD_BYTES};
use indicatif::ParallelProgressIterator;
use log::{error, info};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Encodes 320x200 16-color videos into the chunked delta format (and back).
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Encodes an animated GIF (or a directory of frames) into a stream
    Encode { input: PathBuf, output: PathBuf },

    /// Decodes a stream into an animated GIF
    Decode {
        input: PathBuf,
        output: PathBuf,

        /// Writes a directory of PNG frames instead of a GIF
        #[arg(long)]
        frames: bool,
    },

    /// Encodes every GIF of a directory
    Batch {
        src_dir: PathBuf,
        dest_dir: PathBuf,

        /// Re-encodes videos even if their output is up to date
        #[arg(long)]
        force: bool,
    },

    /// Prints the chunks of a stream
    Info { input: PathBuf },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Args::parse().cmd {
        Command::Encode { input, output } => {
            let stats = encode(&input, &output)?;
            eprintln!("{:#?}", stats);
        }

        Command::Decode {
            input,
            output,
            frames,
        } => decode(&input, &output, frames)?,

        Command::Batch {
            src_dir,
            dest_dir,
            force,
        } => batch(&src_dir, &dest_dir, force)?,

        Command::Info { input } => print_info(&read_stream(&input)?, &mut io::stdout().lock())?,
    }

    Ok(())
}

fn encode(input: &Path, output: &Path) -> Result<Stats> {
    let source = Source::open(input)?;

    info!("Loaded {} frame(s) from {}", source.len(), input.display());

    let (stats, stream) = codec_lib::encode(source.frames())
        .with_context(|| format!("Couldn't encode video: {}", input.display()))?;

    fs::write(output, stream)
        .with_context(|| format!("Couldn't write stream: {}", output.display()))?;

    Ok(stats)
}

fn decode(input: &Path, output: &Path, frames: bool) -> Result<()> {
    let stream = read_stream(input)?;

    if frames {
        let written = codec_lib::decode(&stream, DirSink::new(output)?)?;
        info!("Wrote {} frame(s) into {}", written, output.display());
    } else {
        let mut gif = Vec::new();
        codec_lib::decode(&stream, GifSink::new(&mut gif))?;

        fs::write(output, gif)
            .with_context(|| format!("Couldn't write animation: {}", output.display()))?;
    }

    Ok(())
}

fn batch(src_dir: &Path, dest_dir: &Path, force: bool) -> Result<()> {
    let pattern = src_dir.join("*.gif");

    let videos = glob::glob(&pattern.to_string_lossy())
        .context("Couldn't find videos")?
        .collect::<Result<Vec<_>, _>>()
        .context("Couldn't find video")?;

    fs::create_dir_all(dest_dir)
        .with_context(|| format!("Couldn't create directory: {}", dest_dir.display()))?;

    let jobs: Vec<_> = videos
        .into_iter()
        .filter_map(|video| {
            let output = dest_dir.join(video.file_stem()?);
            Some((video, output))
        })
        .filter(|(video, output)| force || !is_up_to_date(video, output))
        .collect();

    info!("{} video(s) to encode", jobs.len());

    let failures = jobs
        .par_iter()
        .progress_count(jobs.len() as u64)
        .filter(|(video, output)| match encode(video, output) {
            Ok(stats) => {
                info!("{}: {} frame(s), {} bytes", video.display(), stats.frames, stats.bytes);
                false
            }

            Err(err) => {
                error!("{:?}", err);
                true
            }
        })
        .count();

    if failures > 0 {
        bail!("{} video(s) couldn't be encoded", failures);
    }

    Ok(())
}

fn is_up_to_date(input: &Path, output: &Path) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|meta| meta.modified()).ok();

    match (modified(input), modified(output)) {
        (Some(input), Some(output)) => output >= input,
        _ => false,
    }
}

/// Prints one line per chunk of `stream`, followed by totals.
fn print_info(stream: &[u8], out: &mut impl Write) -> Result<()> {
    let mut decoder = Decoder::new(stream);
    let mut stats = Stats::default();

    while let Some(frame) = decoder.next_frame()? {
        let chunk = frame.chunk;

        match chunk.flags {
            Some(flags) => writeln!(
                out,
                "#{:<5} @{:<8} {:>6} bytes  {:#04x}{}{}",
                frame.index,
                chunk.offset,
                chunk.size,
                flags.to_u8(),
                if flags.keyframe { "  key" } else { "  delta" },
                if flags.palette { " +palette" } else { "" },
            )?,

            None => writeln!(
                out,
                "#{:<5} @{:<8} {:>6} bytes  repeat",
                frame.index, chunk.offset, chunk.size
            )?,
        }

        stats.record(chunk.size, chunk.flags);
    }

    stats.bytes += SIZE_FIELD_BYTES;

    if stats.bytes < stream.len() {
        writeln!(
            out,
            "({} byte(s) after the end-of-stream marker)",
            stream.len() - stats.bytes
        )?;
    }

    writeln!(out)?;
    writeln!(out, "frames:   {}", stats.frames)?;
    writeln!(out, "bytes:    {}", stats.bytes)?;
    writeln!(out, "palettes: {}", stats.palettes)?;
    writeln!(out, "repeats:  {}", stats.repeats())?;

    for (ty, count) in &stats.chunks {
        writeln!(out, "{:#04x}:     {}", ty, count)?;
    }

    Ok(())
}

fn read_stream(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Couldn't read stream: {}", path.display()))
}
