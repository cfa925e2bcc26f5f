use crate::prelude::*;
use ::image::{io::Reader as ImageReader, RgbImage};
use anyhow::{ensure, Context};
use log::{debug, warn};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// One frame as the outside world sees it: an 8-bit index per pixel plus
/// the palette those indices refer to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFrame {
    pub palette: Palette,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl SourceFrame {
    pub fn new(palette: Palette, pixels: Vec<u8>) -> Self {
        Self {
            palette,
            width: WIDTH,
            height: HEIGHT,
            pixels,
        }
    }
}

#[derive(Debug)]
pub struct Source {
    frames: Vec<SourceFrame>,
}

impl Source {
    /// Loads a directory of frames or an animated GIF, depending on what
    /// `path` points at.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        if path.is_dir() {
            Self::from_dir(path)
        } else {
            Self::from_gif(path)
        }
    }

    pub fn from_gif(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        let file = File::open(path)
            .with_context(|| format!("Couldn't open video: {}", path.display()))?;

        Self::from_gif_reader(BufReader::new(file))
            .with_context(|| format!("Couldn't decode video: {}", path.display()))
    }

    pub fn from_gif_reader(reader: impl Read) -> anyhow::Result<Self> {
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::Indexed);

        let mut decoder = options.read_info(reader)?;
        check_geometry(decoder.width() as u32, decoder.height() as u32)?;

        let global_palette = decoder.global_palette().map(<[u8]>::to_vec);
        let mut canvas = vec![0; FRAME_BYTES * PIXELS_PER_BYTE];
        let mut frames = Vec::new();
        let mut masked = false;

        while let Some(frame) = decoder.read_next_frame()? {
            let rgb = frame
                .palette
                .as_deref()
                .or_else(|| global_palette.as_deref())
                .with_context(|| format!("Frame #{} has no palette", frames.len()))?;

            draw(&mut canvas, frame)?;

            if !masked && canvas.iter().any(|&idx| idx > 0x0F) {
                warn!("Frame #{} uses colors past the 16th one", frames.len());
                masked = true;
            }

            debug!(
                "Frame #{}: {}x{}+{}+{}",
                frames.len(),
                frame.width,
                frame.height,
                frame.left,
                frame.top
            );

            frames.push(SourceFrame::new(Palette::from_rgb(rgb), canvas.clone()));

            if frame.dispose == gif::DisposalMethod::Background {
                clear(&mut canvas, frame);
            }
        }

        Ok(Self { frames })
    }

    /// Loads every image of a directory, in alphabetical order; each image
    /// may use at most 16 distinct colors.
    pub fn from_dir(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let pattern = path.as_ref().join("*.*");
        let paths = glob::glob(&*pattern.to_string_lossy()).context("Couldn't find frames")?;

        let frames = paths.into_iter().map(|frame| {
            let path = frame.context("Couldn't find frame")?;

            let image = ImageReader::open(&path)
                .with_context(|| format!("Couldn't open frame: {}", path.display()))?
                .decode()
                .with_context(|| format!("Couldn't decode frame: {}", path.display()))?;

            frame_from_rgb(&image.to_rgb8())
                .with_context(|| format!("Couldn't convert frame: {}", path.display()))
        });

        Ok(Self {
            frames: frames.collect::<anyhow::Result<_>>()?,
        })
    }

    pub fn frames(&self) -> impl Iterator<Item = &SourceFrame> {
        self.frames.iter()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn into_frames(self) -> Vec<SourceFrame> {
        self.frames
    }
}

/// Indexes a true-color image, building its palette out of the colors in
/// order of first appearance.
pub fn frame_from_rgb(img: &RgbImage) -> anyhow::Result<SourceFrame> {
    check_geometry(img.width(), img.height())?;

    let mut colors: Vec<[u8; 3]> = Vec::with_capacity(PALETTE_COLORS);
    let mut pixels = Vec::with_capacity((WIDTH * HEIGHT) as usize);

    for pixel in img.pixels() {
        let idx = match colors.iter().position(|color| *color == pixel.0) {
            Some(idx) => idx,

            None => {
                ensure!(
                    colors.len() < PALETTE_COLORS,
                    "Frame uses more than {} colors",
                    PALETTE_COLORS
                );

                colors.push(pixel.0);
                colors.len() - 1
            }
        };

        pixels.push(idx as u8);
    }

    let rgb: Vec<u8> = colors.iter().flatten().copied().collect();

    Ok(SourceFrame::new(Palette::from_rgb(&rgb), pixels))
}

fn frame_rect(frame: &gif::Frame<'_>) -> (usize, usize, usize, usize) {
    (
        frame.left as usize,
        frame.top as usize,
        frame.width as usize,
        frame.height as usize,
    )
}

fn draw(canvas: &mut [u8], frame: &gif::Frame<'_>) -> anyhow::Result<()> {
    let (left, top, width, height) = frame_rect(frame);

    ensure!(
        left + width <= WIDTH as usize && top + height <= HEIGHT as usize,
        "Frame {}x{}+{}+{} doesn't fit the screen",
        width,
        height,
        left,
        top
    );

    if width == 0 {
        return Ok(());
    }

    for (y, row) in frame.buffer.chunks_exact(width).take(height).enumerate() {
        let start = (top + y) * WIDTH as usize + left;

        for (dst, &src) in canvas[start..start + width].iter_mut().zip(row) {
            if frame.transparent != Some(src) {
                *dst = src;
            }
        }
    }

    Ok(())
}

fn clear(canvas: &mut [u8], frame: &gif::Frame<'_>) {
    let (left, top, width, height) = frame_rect(frame);

    for y in top..top + height {
        let start = y * WIDTH as usize + left;
        canvas[start..start + width].fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::Rgb;
    use std::borrow::Cow;

    fn gif_with(frames: &[gif::Frame<'_>], width: u16, height: u16) -> Vec<u8> {
        let mut out = Vec::new();

        {
            let global: Vec<u8> = (0..16).flat_map(|i| [i * 16, 0, 0]).collect();
            let mut encoder = gif::Encoder::new(&mut out, width, height, &global).unwrap();

            for frame in frames {
                encoder.write_frame(frame).unwrap();
            }
        }

        out
    }

    fn full_frame(fill: u8) -> gif::Frame<'static> {
        gif::Frame {
            width: WIDTH as u16,
            height: HEIGHT as u16,
            buffer: Cow::Owned(vec![fill; (WIDTH * HEIGHT) as usize]),
            ..gif::Frame::default()
        }
    }

    #[test]
    fn reads_gif_frames_with_palettes() {
        let mut second = full_frame(2);
        second.palette = Some((0..16).flat_map(|i| [0, i * 16, 0]).collect());

        let gif = gif_with(&[full_frame(1), second], 320, 200);
        let source = Source::from_gif_reader(&gif[..]).unwrap();
        let frames: Vec<_> = source.frames().collect();

        assert_eq!(frames.len(), 2);
        assert!(frames[0].pixels.iter().all(|&p| p == 1));
        assert_eq!(frames[0].palette.colors()[1].0, [16, 0, 0, 0xFF]);
        assert!(frames[1].pixels.iter().all(|&p| p == 2));
        assert_eq!(frames[1].palette.colors()[1].0, [0, 16, 0, 0xFF]);
    }

    #[test]
    fn composites_partial_frames() {
        let patch = gif::Frame {
            left: 10,
            top: 1,
            width: 2,
            height: 2,
            transparent: Some(0),
            buffer: Cow::Owned(vec![5, 0, 6, 7]),
            ..gif::Frame::default()
        };

        let gif = gif_with(&[full_frame(3), patch], 320, 200);
        let frames = Source::from_gif_reader(&gif[..]).unwrap().into_frames();
        let pixels = &frames[1].pixels;

        assert_eq!(&pixels[320 + 9..320 + 13], &[3, 5, 3, 3]);
        assert_eq!(&pixels[640 + 9..640 + 13], &[3, 6, 7, 3]);
    }

    #[test]
    fn rejects_wrong_screen_size() {
        let gif = gif_with(&[], 160, 100);
        let err = Source::from_gif_reader(&gif[..]).unwrap_err();

        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::GeometryMismatch {
                width: 160,
                height: 100
            })
        );
    }

    #[test]
    fn indexes_rgb_frames() {
        let img = RgbImage::from_fn(WIDTH, HEIGHT, |x, _| {
            if x < 100 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });

        let frame = frame_from_rgb(&img).unwrap();

        assert_eq!(frame.palette.colors()[0].0, [255, 0, 0, 0xFF]);
        assert_eq!(frame.palette.colors()[1].0, [0, 0, 255, 0xFF]);
        assert_eq!(frame.pixels[99], 0);
        assert_eq!(frame.pixels[100], 1);
    }

    #[test]
    fn rejects_too_many_colors() {
        let img = RgbImage::from_fn(WIDTH, HEIGHT, |x, _| Rgb([(x % 17) as u8, 0, 0]));

        assert!(frame_from_rgb(&img).is_err());
    }

    #[test]
    fn loads_frame_directory_in_order() {
        let dir = tempfile::tempdir().unwrap();

        for (name, shade) in [("b.png", 200), ("a.png", 100)] {
            RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([shade, shade, shade]))
                .save(dir.path().join(name))
                .unwrap();
        }

        let source = Source::open(dir.path()).unwrap();
        let shades: Vec<_> = source
            .frames()
            .map(|frame| frame.palette.colors()[0].0[0])
            .collect();

        assert_eq!(shades, vec![100, 200]);
        assert_eq!(source.len(), 2);
    }
}
