use codec_lib::*;
use image::Rgba;
use std::fs;
use std::io::{self, Write};

fn palette(tint: u8) -> Palette {
    let mut colors = [Rgba([0, 0, 0, 0xFF]); PALETTE_COLORS];

    for (idx, color) in colors.iter_mut().enumerate() {
        let level = idx as u8 * 17;
        *color = Rgba([level, tint, 255 - level, 0xFF]);
    }

    Palette::new(colors)
}

fn frames() -> Vec<SourceFrame> {
    (0..4u32)
        .map(|step| {
            let pixels = (0..WIDTH * HEIGHT)
                .map(|i| ((i % WIDTH / 20 + step + i / WIDTH / 50) % 16) as u8)
                .collect();

            SourceFrame::new(palette(if step < 2 { 0x20 } else { 0xC0 }), pixels)
        })
        .collect()
}

#[test]
fn gif_output_reads_back_as_the_same_frames() {
    let frames = frames();
    let (_, stream) = encode(&frames).unwrap();

    let mut gif = Vec::new();
    codec_lib::decode(&stream, GifSink::new(&mut gif)).unwrap();

    let source = Source::from_gif_reader(&gif[..]).unwrap();

    assert_eq!(source.len(), frames.len());

    for (src, dst) in frames.iter().zip(source.frames()) {
        assert_eq!(dst.pixels, src.pixels);
        assert_eq!(dst.palette, src.palette.pack().unpack());
    }
}

/// Accepts up to `limit` bytes, then fails every write.
struct ShortWriter {
    written: usize,
    limit: usize,
}

impl Write for ShortWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written + buf.len() > self.limit {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }

        self.written += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn failed_gif_trailer_is_reported() {
    let (_, stream) = encode(&frames()).unwrap();

    let mut gif = Vec::new();
    codec_lib::decode(&stream, GifSink::new(&mut gif)).unwrap();

    assert_eq!(gif.last(), Some(&0x3B));

    // Everything but the trailer fits
    let mut writer = ShortWriter {
        written: 0,
        limit: gif.len() - 1,
    };

    let err = codec_lib::decode(&stream, GifSink::new(&mut writer)).unwrap_err();

    assert!(format!("{:#}", err).contains("Couldn't finish animation"));
    assert_eq!(writer.written, gif.len() - 1);
}

#[test]
fn empty_stream_makes_an_empty_gif() {
    let (_, stream) = encode(&Vec::<SourceFrame>::new()).unwrap();

    let mut gif = Vec::new();
    codec_lib::decode(&stream, GifSink::new(&mut gif)).unwrap();

    assert!(gif.starts_with(b"GIF89a"));
    assert!(Source::from_gif_reader(&gif[..]).unwrap().is_empty());
}

#[test]
fn dir_output_writes_one_png_per_frame() {
    let frames = frames();
    let (_, stream) = encode(&frames).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frames");

    let written = codec_lib::decode(&stream, DirSink::new(&out).unwrap()).unwrap();

    assert_eq!(written, frames.len());

    for idx in 0..frames.len() {
        assert!(out.join(format!("frame_{:04}.png", idx)).is_file());
    }

    let img = image::open(out.join("frame_0003.png")).unwrap().to_rgb8();
    let expected = frames[3].palette.pack().unpack().color(frames[3].pixels[0]);

    assert_eq!(img.get_pixel(0, 0).0, [expected.0[0], expected.0[1], expected.0[2]]);

    // Colors are re-indexed on load, but the picture stays the same
    let reloaded = Source::from_dir(&out).unwrap();

    assert_eq!(reloaded.len(), frames.len());

    for (src, dst) in frames.iter().zip(reloaded.frames()) {
        let src_palette = src.palette.pack().unpack();

        assert!(src
            .pixels
            .iter()
            .zip(&dst.pixels)
            .all(|(&a, &b)| src_palette.color(a) == dst.palette.color(b)));
    }
}

#[test]
fn truncated_stream_leaves_no_frames_behind() {
    let (_, stream) = encode(&frames()).unwrap();
    let cut = &stream[..stream.len() - 4];
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frames");

    assert!(codec_lib::decode(cut, DirSink::new(&out).unwrap()).is_err());
    assert!(!out.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn empty_output_directory_is_replaced() {
    let (_, stream) = encode(&frames()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frames");

    fs::create_dir(&out).unwrap();

    assert_eq!(
        codec_lib::decode(&stream, DirSink::new(&out).unwrap()).unwrap(),
        4
    );
    assert!(out.join("frame_0000.png").is_file());
}

#[test]
fn non_empty_output_directory_is_kept() {
    let (_, stream) = encode(&frames()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frames");

    fs::create_dir(&out).unwrap();
    fs::write(out.join("notes.txt"), "keep me").unwrap();

    assert!(codec_lib::decode(&stream, DirSink::new(&out).unwrap()).is_err());
    assert_eq!(fs::read_dir(&out).unwrap().count(), 1);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}
