use image::RgbImage;
use sensor::{FrameSource, ImageSequenceDevice, SensorError, VideoDevice};
use tempfile::tempdir;

fn write_png(dir: &std::path::Path, name: &str, shade: u8) {
    RgbImage::from_pixel(8, 6, image::Rgb([shade, shade, shade]))
        .save(dir.join(name))
        .unwrap();
}

#[test]
fn plays_files_in_lexical_order() {
    let dir = tempdir().unwrap();
    write_png(dir.path(), "b.png", 20);
    write_png(dir.path(), "a.png", 10);
    write_png(dir.path(), "c.png", 30);
    let pattern = format!("{}/*.png", dir.path().display());

    let mut device = ImageSequenceDevice::new(pattern);
    device.open(0).unwrap();
    assert_eq!(device.len(), 3);
    let shades: Vec<u8> = (0..3)
        .map(|_| device.read().unwrap().unwrap().rgb_at(0, 0)[0])
        .collect();
    assert_eq!(shades, [10, 20, 30]);
    assert!(device.read().unwrap().is_none());
}

#[test]
fn looping_wraps_around() {
    let dir = tempdir().unwrap();
    write_png(dir.path(), "only.png", 42);
    let mut device =
        ImageSequenceDevice::new(format!("{}/*.png", dir.path().display())).looping(true);
    device.open(3).unwrap();
    for _ in 0..4 {
        let frame = device.read().unwrap().unwrap();
        assert_eq!((frame.width(), frame.height()), (8, 6));
    }
}

#[test]
fn empty_pattern_fails_to_open() {
    let dir = tempdir().unwrap();
    let mut device = ImageSequenceDevice::new(format!("{}/*.jpg", dir.path().display()));
    assert!(matches!(device.open(0), Err(SensorError::NoMatches(_))));
}

#[test]
fn undecodable_file_is_a_device_error() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("bad.png"), b"not an image").unwrap();
    let mut device = ImageSequenceDevice::new(format!("{}/*.png", dir.path().display()));
    device.open(0).unwrap();
    assert!(matches!(device.read(), Err(SensorError::Decode { .. })));
}

#[test]
fn frame_source_absorbs_failures() {
    let dir = tempdir().unwrap();
    let mut source = FrameSource::new(Box::new(ImageSequenceDevice::new(format!(
        "{}/*.png",
        dir.path().display()
    ))));
    assert!(!source.open(0));
    assert!(!source.is_open());
    assert!(source.read_frame().is_none());
    source.close();
    source.close();
}

#[test]
fn frame_source_lifecycle() {
    let dir = tempdir().unwrap();
    write_png(dir.path(), "f.png", 7);
    std::fs::write(dir.path().join("g.png"), b"garbage").unwrap();
    let mut source = FrameSource::new(Box::new(ImageSequenceDevice::new(format!(
        "{}/*.png",
        dir.path().display()
    ))));
    assert!(source.open(0));
    assert!(source.read_frame().is_some());
    // decode failure and end of stream both read as None
    assert!(source.read_frame().is_none());
    assert!(source.read_frame().is_none());
    source.close();
    assert!(!source.is_open());
    assert!(source.read_frame().is_none());
    assert!(source.open(0));
}
