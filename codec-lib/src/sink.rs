use crate::prelude::*;
use ::image::{Rgb, Rgba, RgbImage};
use anyhow::Context;
use log::debug;
use std::borrow::Cow;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Receives decoded frames, in order.
pub trait Sink {
    type Output;

    fn add(&mut self, frame: &DecodedFrame<'_>) -> anyhow::Result<()>;

    fn finish(self) -> anyhow::Result<Self::Output>;
}

/// Writes an animated GIF; the container is set up by the first frame.
pub struct GifSink<W: Write> {
    writer: Option<W>,
    encoder: Option<gif::Encoder<W>>,
}

impl<W: Write> GifSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
            encoder: None,
        }
    }

    fn start(&mut self, palette: &Palette) -> anyhow::Result<&mut gif::Encoder<W>> {
        if let Some(writer) = self.writer.take() {
            let mut encoder =
                gif::Encoder::new(writer, WIDTH as u16, HEIGHT as u16, &palette.to_rgb())
                    .context("Couldn't start animation")?;

            encoder.set_repeat(gif::Repeat::Infinite)?;
            self.encoder = Some(encoder);
        }

        self.encoder
            .as_mut()
            .context("Animation has already been finished")
    }
}

impl<W: Write> Sink for GifSink<W> {
    type Output = ();

    fn add(&mut self, frame: &DecodedFrame<'_>) -> anyhow::Result<()> {
        let encoder = self.start(frame.palette)?;

        let out = gif::Frame {
            width: WIDTH as u16,
            height: HEIGHT as u16,
            delay: FRAME_DELAY,
            palette: Some(frame.palette.to_rgb()),
            buffer: Cow::Owned(frame.screen.to_indices()),
            ..gif::Frame::default()
        };

        encoder.write_frame(&out)?;

        Ok(())
    }

    fn finish(mut self) -> anyhow::Result<()> {
        // An empty stream still makes for a valid (empty) animation
        self.start(&Palette::default())?;

        self.encoder
            .take()
            .map(gif::Encoder::into_inner)
            .transpose()
            .context("Couldn't finish animation")?;

        Ok(())
    }
}

/// Writes every frame as a separate `frame_NNNN.png` file.
///
/// Frames land in a staging directory next to `dir`, which is moved into
/// place by `finish`; a sink dropped before that leaves nothing behind.
#[derive(Debug)]
pub struct DirSink {
    dir: PathBuf,
    staging: TempDir,
    frames: usize,
}

impl DirSink {
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();

        let parent = match dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        fs::create_dir_all(parent)
            .with_context(|| format!("Couldn't create directory: {}", parent.display()))?;

        let staging = tempfile::Builder::new()
            .prefix(".frames-")
            .tempdir_in(parent)
            .with_context(|| format!("Couldn't create directory in: {}", parent.display()))?;

        Ok(Self {
            dir,
            staging,
            frames: 0,
        })
    }
}

impl Sink for DirSink {
    type Output = usize;

    fn add(&mut self, frame: &DecodedFrame<'_>) -> anyhow::Result<()> {
        let path = self
            .staging
            .path()
            .join(format!("frame_{:04}.png", frame.index));

        let pixels = frame.screen.to_indices();

        let img = RgbImage::from_fn(WIDTH, HEIGHT, |x, y| {
            let Rgba([r, g, b, _]) = frame.palette.color(pixels[(y * WIDTH + x) as usize]);
            Rgb([r, g, b])
        });

        img.save(&path)
            .with_context(|| format!("Couldn't save frame: {}", path.display()))?;

        debug!("Saved {}", path.display());
        self.frames += 1;

        Ok(())
    }

    fn finish(self) -> anyhow::Result<usize> {
        // Only an empty directory may be replaced
        if self.dir.is_dir() {
            fs::remove_dir(&self.dir).with_context(|| {
                format!("Output directory isn't empty: {}", self.dir.display())
            })?;
        }

        fs::rename(self.staging.path(), &self.dir)
            .with_context(|| format!("Couldn't create directory: {}", self.dir.display()))?;

        Ok(self.frames)
    }
}

/// Collects frames in memory.
impl Sink for Vec<SourceFrame> {
    type Output = Self;

    fn add(&mut self, frame: &DecodedFrame<'_>) -> anyhow::Result<()> {
        self.push(SourceFrame::new(
            frame.palette.clone(),
            frame.screen.to_indices(),
        ));

        Ok(())
    }

    fn finish(self) -> anyhow::Result<Self> {
        Ok(self)
    }
}
