use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::Array4;
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// ImageNet channel means in BGR order, as used by the ResNet50 backbone.
const CAFFE_MEAN_BGR: [f32; 3] = [103.939, 116.779, 123.68];

pub type ModelInput = Array4<f32>;

/// Axis order of the batched input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[1, height, width, 3]`, the Keras default.
    Nhwc,
    /// `[1, 3, height, width]`.
    Nchw,
}

impl FromStr for TensorLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nhwc" => Ok(TensorLayout::Nhwc),
            "nchw" => Ok(TensorLayout::Nchw),
            other => Err(format!("expected `nhwc` or `nchw`, got `{}`", other)),
        }
    }
}

impl fmt::Display for TensorLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorLayout::Nhwc => f.write_str("nhwc"),
            TensorLayout::Nchw => f.write_str("nchw"),
        }
    }
}

/// Turns uploaded bytes into the tensor the classifier expects.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    size: u32,
    layout: TensorLayout,
}

impl Preprocessor {
    pub fn new(size: u32, layout: TensorLayout) -> Self {
        Self { size, layout }
    }

    pub fn input_shape(&self) -> [usize; 4] {
        let side = self.size as usize;
        match self.layout {
            TensorLayout::Nhwc => [1, side, side, 3],
            TensorLayout::Nchw => [1, 3, side, side],
        }
    }

    pub fn prepare(&self, bytes: &[u8]) -> Result<(ImageFormat, ModelInput), AppError> {
        let (format, img) = decode(bytes)?;
        Ok((format, self.to_tensor(&img)))
    }

    pub fn to_tensor(&self, img: &DynamicImage) -> ModelInput {
        let resized = img.resize_exact(self.size, self.size, FilterType::Nearest);
        let rgb = to_rgb(&resized);

        let mut input = Array4::zeros(self.input_shape());
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                // output channel c is BGR, so read the RGB pixel back to front
                let value = pixel[2 - c] as f32 - CAFFE_MEAN_BGR[c];
                match self.layout {
                    TensorLayout::Nhwc => input[[0, y, x, c]] = value,
                    TensorLayout::Nchw => input[[0, c, y, x]] = value,
                }
            }
        }
        input
    }
}

/// Sniffs the image format from the content, ignoring the client filename.
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, AppError> {
    image::guess_format(bytes)
        .map_err(|_| AppError::UnsupportedImageFormat("file is not a recognised image".into()))
}

pub fn decode(bytes: &[u8]) -> Result<(ImageFormat, DynamicImage), AppError> {
    let format = detect_format(bytes)?;
    let img = image::load_from_memory_with_format(bytes, format).map_err(|e| {
        AppError::UnsupportedImageFormat(format!("could not decode {:?} image: {}", format, e))
    })?;
    Ok((format, img))
}

fn to_rgb(img: &DynamicImage) -> RgbImage {
    if img.color().has_color() {
        return img.to_rgb8();
    }
    let luma = img.to_luma8();
    RgbImage::from_fn(luma.width(), luma.height(), |x, y| {
        let v = luma.get_pixel(x, y)[0];
        Rgb([v, v, v])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageOutputFormat, Luma};
    use std::io::Cursor;

    fn encode_png(img: DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    fn gradient(x: u32, y: u32) -> u8 {
        ((x * 7 + y * 13) % 256) as u8
    }

    #[test]
    fn grayscale_matches_replicated_rgb() {
        let gray = GrayImage::from_fn(300, 260, |x, y| Luma([gradient(x, y)]));
        let rgb = RgbImage::from_fn(300, 260, |x, y| {
            let v = gradient(x, y);
            Rgb([v, v, v])
        });

        let pre = Preprocessor::new(224, TensorLayout::Nhwc);
        let (_, from_gray) = pre.prepare(&encode_png(DynamicImage::ImageLuma8(gray))).unwrap();
        let (_, from_rgb) = pre.prepare(&encode_png(DynamicImage::ImageRgb8(rgb))).unwrap();

        assert_eq!(from_gray.shape(), &[1, 224, 224, 3]);
        assert_eq!(from_gray, from_rgb);
    }

    #[test]
    fn applies_bgr_mean_subtraction() {
        let img = RgbImage::from_pixel(4, 4, Rgb([200, 100, 50]));
        let pre = Preprocessor::new(4, TensorLayout::Nhwc);
        let input = pre.to_tensor(&DynamicImage::ImageRgb8(img));

        assert!((input[[0, 0, 0, 0]] - (50.0 - 103.939)).abs() < 1e-4);
        assert!((input[[0, 0, 0, 1]] - (100.0 - 116.779)).abs() < 1e-4);
        assert!((input[[0, 0, 0, 2]] - (200.0 - 123.68)).abs() < 1e-4);
    }

    #[test]
    fn nchw_is_a_transpose_of_nhwc() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(16, 9, |x, y| {
            Rgb([gradient(x, y), gradient(y, x), 42])
        }));
        let nhwc = Preprocessor::new(8, TensorLayout::Nhwc).to_tensor(&img);
        let nchw = Preprocessor::new(8, TensorLayout::Nchw).to_tensor(&img);

        assert_eq!(nchw.shape(), &[1, 3, 8, 8]);
        assert_eq!(nhwc.permuted_axes([0, 3, 1, 2]), nchw);
    }

    #[test]
    fn drops_alpha_channel() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            2,
            2,
            image::Rgba([10, 20, 30, 0]),
        ));
        let input = Preprocessor::new(2, TensorLayout::Nhwc).to_tensor(&img);
        assert!((input[[0, 1, 1, 0]] - (30.0 - 103.939)).abs() < 1e-4);
    }

    #[test]
    fn rejects_non_image_bytes() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedImageFormat(_)));
    }

    #[test]
    fn rejects_truncated_image() {
        let mut bytes = encode_png(DynamicImage::ImageRgb8(RgbImage::new(32, 32)));
        bytes.truncate(40);
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedImageFormat(_)));
    }

    #[test]
    fn parses_layout_names() {
        assert_eq!("NHWC".parse::<TensorLayout>(), Ok(TensorLayout::Nhwc));
        assert_eq!("nchw".parse::<TensorLayout>(), Ok(TensorLayout::Nchw));
        assert!("hwc".parse::<TensorLayout>().is_err());
    }
}
