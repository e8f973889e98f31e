use image::RgbImage;
use vision::{ChannelOrder, Frame, ImageEnhancer};

fn luma_range(frame: &Frame) -> u8 {
    let luma = frame.to_luma();
    let min = luma.pixels().map(|p| p.0[0]).min().unwrap();
    let max = luma.pixels().map(|p| p.0[0]).max().unwrap();
    max - min
}

#[test]
fn enhance_preserves_dimensions_and_order() {
    let data = (0..97u32 * 61 * 3).map(|i| (i * 7 % 251) as u8).collect();
    let frame = Frame::new(97, 61, ChannelOrder::Bgr, data).unwrap();
    let out = ImageEnhancer::default().enhance(&frame);
    assert_eq!((out.width(), out.height()), (97, 61));
    assert_eq!(out.order(), ChannelOrder::Bgr);
    assert_eq!(out.data().len(), frame.data().len());
}

#[test]
fn enhance_is_deterministic_and_leaves_input_alone() {
    let img = RgbImage::from_fn(80, 60, |x, y| image::Rgb([(x * 3) as u8, (y * 4) as u8, 77]));
    let frame = Frame::from_rgb(img.clone()).unwrap();
    let enhancer = ImageEnhancer::default();
    let a = enhancer.enhance(&frame);
    let b = enhancer.enhance(&frame);
    assert_eq!(a.data(), b.data());
    assert_eq!(frame.data(), img.as_raw().as_slice());
}

#[test]
fn uniform_frame_stays_uniform() {
    let frame = Frame::from_rgb(RgbImage::from_pixel(64, 48, image::Rgb([120, 120, 120]))).unwrap();
    let out = ImageEnhancer::default().enhance(&frame);
    let first = out.rgb_at(0, 0);
    for y in 0..out.height() {
        for x in 0..out.width() {
            assert_eq!(out.rgb_at(x, y), first);
        }
    }
}

#[test]
fn low_contrast_gradient_is_stretched() {
    let img = RgbImage::from_fn(256, 256, |x, _| {
        let v = 100 + (x * 40 / 255) as u8;
        image::Rgb([v, v, v])
    });
    let frame = Frame::from_rgb(img).unwrap();
    let out = ImageEnhancer::default().enhance(&frame);
    assert!(luma_range(&out) > luma_range(&frame));
}

#[test]
fn tiny_frames_are_handled() {
    let frame = Frame::from_rgb(RgbImage::from_pixel(1, 1, image::Rgb([10, 200, 30]))).unwrap();
    let out = ImageEnhancer::default().enhance(&frame);
    assert_eq!((out.width(), out.height()), (1, 1));
}
