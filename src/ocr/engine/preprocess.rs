use image::{DynamicImage, GrayImage};

/// Grayscale, upscale and contrast-stretch a crop before OCR.
pub(super) fn prepare_for_ocr(image: &DynamicImage, scale: u32) -> DynamicImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut luma = GrayImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let r = r as f32 * alpha + 255.0 * (1.0 - alpha);
        let g = g as f32 * alpha + 255.0 * (1.0 - alpha);
        let b = b as f32 * alpha + 255.0 * (1.0 - alpha);
        let value = (0.299 * r + 0.587 * g + 0.114 * b).round() as u8;
        luma.put_pixel(x, y, image::Luma([value]));
    }

    let resized = if scale > 1 {
        image::imageops::resize(
            &luma,
            width.saturating_mul(scale),
            height.saturating_mul(scale),
            image::imageops::FilterType::Lanczos3,
        )
    } else {
        luma
    };

    DynamicImage::ImageLuma8(contrast_stretch(resized))
}

/// Integer upscale factor so that small crops reach a readable size.
pub(super) fn ocr_scale(width: u32) -> u32 {
    let max_width = 4000u32;
    let mut scale = 3u32;
    while width.saturating_mul(scale) > max_width && scale > 1 {
        scale -= 1;
    }
    scale
}

fn contrast_stretch(mut image: GrayImage) -> GrayImage {
    let (min, max) = image
        .pixels()
        .fold((255u8, 0u8), |(min, max), pixel| (min.min(pixel[0]), max.max(pixel[0])));
    if max <= min {
        return image;
    }

    let scale = 255.0 / (max as f32 - min as f32);
    for pixel in image.pixels_mut() {
        pixel[0] = ((pixel[0] - min) as f32 * scale).round() as u8;
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_shrinks_for_wide_crops() {
        assert_eq!(ocr_scale(400), 3);
        assert_eq!(ocr_scale(1500), 2);
        assert_eq!(ocr_scale(3000), 1);
        assert_eq!(ocr_scale(10_000), 1);
    }

    #[test]
    fn prepared_image_is_scaled_and_stretched() {
        let mut gray = GrayImage::new(4, 2);
        gray.put_pixel(0, 0, image::Luma([100]));
        gray.put_pixel(1, 0, image::Luma([200]));
        for x in 2..4 {
            gray.put_pixel(x, 0, image::Luma([150]));
        }
        for x in 0..4 {
            gray.put_pixel(x, 1, image::Luma([150]));
        }
        let prepared = prepare_for_ocr(&DynamicImage::ImageLuma8(gray), 1).to_luma8();
        assert_eq!(prepared.dimensions(), (4, 2));
        assert_eq!(prepared.get_pixel(0, 0)[0], 0);
        assert_eq!(prepared.get_pixel(1, 0)[0], 255);

        let scaled = prepare_for_ocr(&DynamicImage::new_luma8(5, 3), 2);
        assert_eq!((scaled.width(), scaled.height()), (10, 6));
    }
}
