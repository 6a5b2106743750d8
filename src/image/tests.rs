use super::*;
use crate::image::draw;

#[test]
fn channel_count_is_determined_by_format() {
    assert_eq!(PixelFormat::Rgb888.channels(), 3);
    assert_eq!(PixelFormat::Rgba8888.channels(), 4);
    assert_eq!(PixelFormat::Gray8.channels(), 1);
}

#[test]
fn new_buffer_is_sized_by_format() {
    for format in [PixelFormat::Rgb888, PixelFormat::Rgba8888, PixelFormat::Gray8] {
        let image = ImageBuffer::new(7, 5, format);
        assert_eq!(image.data().len(), 7 * 5 * format.channels());
        assert_eq!(image.get(0, 0), Color::BLACK);
    }
}

#[test]
fn set_then_get_round_trips_color_formats() {
    let mut image = ImageBuffer::new(4, 4, PixelFormat::Rgb888);
    image.set(1, 2, Color::YELLOW);
    assert_eq!(image.get(1, 2), Color::YELLOW);
    assert_eq!(image.get(2, 1), Color::BLACK);

    let mut image = ImageBuffer::new(4, 4, PixelFormat::Rgba8888);
    let translucent = Color([10, 20, 30, 40]);
    image.set(3, 0, translucent);
    assert_eq!(image.get(3, 0), translucent);
}

#[test]
fn gray_buffers_store_luminance() {
    let mut image = ImageBuffer::new(2, 2, PixelFormat::Gray8);
    image.set(0, 0, Color::WHITE);
    image.set(1, 0, Color::RED);

    assert_eq!(image.get(0, 0), Color::from_rgb8(255, 255, 255));
    // Rec. 601: red contributes 29.9% luminance.
    assert_eq!(image.get(1, 0), Color::from_rgb8(76, 76, 76));
}

#[test]
fn png_round_trip_is_lossless() {
    let dir = tempfile::tempdir().unwrap();

    for format in [PixelFormat::Rgb888, PixelFormat::Rgba8888, PixelFormat::Gray8] {
        let mut image = ImageBuffer::new(9, 6, format);
        image.set(0, 0, Color::WHITE);
        image.set(8, 5, Color::RED);
        image.set(4, 3, Color([10, 20, 30, 40]));

        let path = dir.path().join(format!("{format:?}.png"));
        image.save(&path).unwrap();

        let reloaded = ImageBuffer::load(&path).unwrap();
        assert_eq!(reloaded.format(), format);
        assert_eq!(reloaded.width(), 9);
        assert_eq!(reloaded.height(), 6);
        assert_eq!(reloaded.data(), image.data());
    }
}

#[test]
fn decode_failure_reports_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"not a png").unwrap();

    let err = ImageBuffer::load(&path).unwrap_err();
    assert!(err.to_string().contains("broken.png"));
}

#[test]
fn drawing_clips_at_the_buffer_edge() {
    let mut image = ImageBuffer::new(8, 8, PixelFormat::Rgb888);
    draw::line(&mut image, -10, 4, 20, 4).color(Color::GREEN);
    draw::circle(&mut image, 7, 7, 9).color(Color::RED).filled();

    assert_eq!(image.get(0, 4), Color::GREEN);
    assert_eq!(image.get(7, 7), Color::RED);
}

#[test]
fn rect_strokes_its_outline() {
    let mut image = ImageBuffer::new(20, 20, PixelFormat::Rgb888);
    draw::rect(&mut image, 2, 2, 10, 10).color(Color::BLUE);

    assert_eq!(image.get(2, 2), Color::BLUE);
    assert_eq!(image.get(11, 2), Color::BLUE);
    assert_eq!(image.get(2, 11), Color::BLUE);
    // Interior stays untouched.
    assert_eq!(image.get(6, 6), Color::BLACK);
}

#[test]
fn text_renders_in_the_requested_color() {
    let mut image = ImageBuffer::new(64, 16, PixelFormat::Rgb888);
    draw::text(&mut image, 0, 0, "hi")
        .color(Color::YELLOW)
        .align_left()
        .align_top();

    let lit = (0..16)
        .flat_map(|y| (0..64).map(move |x| (x, y)))
        .filter(|&(x, y)| image.get(x, y) == Color::YELLOW)
        .count();
    assert!(lit > 0, "text drew no pixels");
}
