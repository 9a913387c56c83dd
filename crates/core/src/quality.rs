//! Technical quality metrics of a single frame.
//!
//! Labels come from fixed thresholds and are only a rough characterization of
//! the scalar metrics.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::{error::DecodeError, types::Frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityCategory {
    Good,
    Average,
    Bad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureCategory {
    Neutral,
    ProbablyWarm,
    Warm,
    ProbablyCold,
    Cold,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorDistribution {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityCategories {
    pub clarity: QualityCategory,
    pub contrast: QualityCategory,
    pub brightness: QualityCategory,
    pub sharpness: QualityCategory,
    pub saturation: QualityCategory,
    pub color_temperature: TemperatureCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameQuality {
    /// Variance of the Laplacian of the grayscale frame.
    pub clarity: f64,
    /// Standard deviation of grayscale intensity (0..255).
    pub contrast: f64,
    /// Mean grayscale intensity, normalized to [0, 1].
    pub brightness: f64,
    /// Variance of the diagonal Sobel response.
    pub sharpness: f64,
    /// Mean HSV saturation in [0, 1].
    pub saturation: f64,
    pub color_balance: f64,
    pub color_distribution: ColorDistribution,
    /// `(R - B) / (R + B)` over channel means; positive is warm.
    pub color_temperature: f64,
    pub categories: QualityCategories,
}

impl FrameQuality {
    pub fn analyze(frame: &Frame) -> Result<Self, DecodeError> {
        let image = image::load_from_memory(&frame.data)
            .map_err(|e| DecodeError::new(format!("frame is not a readable image: {e}")))?
            .to_rgb8();
        if image.width() == 0 || image.height() == 0 {
            return Err(DecodeError::new("frame has no pixels"));
        }
        Ok(Self::from_rgb(&image))
    }

    pub fn from_rgb(image: &RgbImage) -> Self {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let pixel_count = (width * height) as f64;

        let mut gray = Vec::with_capacity(width * height);
        let mut channel_sums = [0.0f64; 3];
        let mut saturation_sum = 0.0;

        for pixel in image.pixels() {
            let [r, g, b] = pixel.0.map(f64::from);
            gray.push(0.299 * r + 0.587 * g + 0.114 * b);
            channel_sums[0] += r;
            channel_sums[1] += g;
            channel_sums[2] += b;

            let max = r.max(g).max(b);
            let min = r.min(g).min(b);
            if max > 0.0 {
                saturation_sum += (max - min) / max;
            }
        }

        let (gray_mean, gray_variance) = mean_and_variance(&gray);
        let [r_mean, g_mean, b_mean] = channel_sums.map(|sum| sum / pixel_count);
        let overall = (r_mean + g_mean + b_mean) / 3.0;
        let color_balance = if overall > 0.0 {
            ((r_mean - g_mean).abs() + (g_mean - b_mean).abs() + (b_mean - r_mean).abs())
                / overall
                / 6.0
        } else {
            0.0
        };

        let clarity = convolve_variance(&gray, width, height, &LAPLACIAN);
        let sharpness = convolve_variance(&gray, width, height, &SOBEL_XY);
        let contrast = gray_variance.sqrt();
        let brightness = gray_mean / 255.0;
        let saturation = saturation_sum / pixel_count;
        let color_temperature = (r_mean - b_mean) / (r_mean + b_mean + 1e-8);

        Self {
            clarity,
            contrast,
            brightness,
            sharpness,
            saturation,
            color_balance,
            color_distribution: ColorDistribution {
                r: r_mean / 255.0,
                g: g_mean / 255.0,
                b: b_mean / 255.0,
            },
            color_temperature,
            categories: QualityCategories {
                clarity: edge_category(clarity),
                contrast: contrast_category(contrast),
                brightness: brightness_category(brightness),
                sharpness: edge_category(sharpness),
                saturation: saturation_category(saturation),
                color_temperature: temperature_category(color_temperature),
            },
        }
    }
}

const LAPLACIAN: [[f64; 3]; 3] = [[0.0, 1.0, 0.0], [1.0, -4.0, 1.0], [0.0, 1.0, 0.0]];
const SOBEL_XY: [[f64; 3]; 3] = [[1.0, 0.0, -1.0], [0.0, 0.0, 0.0], [-1.0, 0.0, 1.0]];

fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}

/// Reflect an out-of-range index back into `0..n` without repeating the edge
/// pixel (`gfedcb|abcdefgh|gfedcba`).
fn reflect_101(i: isize, n: usize) -> usize {
    let last = n as isize - 1;
    if last == 0 {
        return 0;
    }
    let reflected = if i < 0 {
        -i
    } else if i > last {
        2 * last - i
    } else {
        i
    };
    reflected.clamp(0, last) as usize
}

/// Variance of a 3x3 kernel response over every pixel, with reflect-101 borders.
fn convolve_variance(gray: &[f64], width: usize, height: usize, kernel: &[[f64; 3]; 3]) -> f64 {
    if width == 0 || height == 0 {
        return 0.0;
    }
    let mut responses = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for (ky, row) in kernel.iter().enumerate() {
                let sy = reflect_101(y as isize + ky as isize - 1, height);
                for (kx, weight) in row.iter().enumerate() {
                    let sx = reflect_101(x as isize + kx as isize - 1, width);
                    acc += weight * gray[sy * width + sx];
                }
            }
            responses.push(acc);
        }
    }
    mean_and_variance(&responses).1
}

fn edge_category(value: f64) -> QualityCategory {
    if value > 400.0 {
        QualityCategory::Good
    } else if value > 200.0 {
        QualityCategory::Average
    } else {
        QualityCategory::Bad
    }
}

fn contrast_category(value: f64) -> QualityCategory {
    if value > 40.0 {
        QualityCategory::Good
    } else if value > 20.0 {
        QualityCategory::Average
    } else {
        QualityCategory::Bad
    }
}

fn brightness_category(value: f64) -> QualityCategory {
    if (0.3..=0.7).contains(&value) {
        QualityCategory::Good
    } else if (0.2..0.3).contains(&value) || (value > 0.7 && value <= 0.8) {
        QualityCategory::Average
    } else {
        QualityCategory::Bad
    }
}

fn saturation_category(value: f64) -> QualityCategory {
    if (0.4..=0.7).contains(&value) {
        QualityCategory::Good
    } else if (0.2..0.4).contains(&value) {
        QualityCategory::Average
    } else {
        QualityCategory::Bad
    }
}

fn temperature_category(value: f64) -> TemperatureCategory {
    if (-0.2..=0.2).contains(&value) {
        TemperatureCategory::Neutral
    } else if value > 0.2 && value <= 0.3 {
        TemperatureCategory::ProbablyWarm
    } else if value > 0.3 {
        TemperatureCategory::Warm
    } else if (-0.3..-0.2).contains(&value) {
        TemperatureCategory::ProbablyCold
    } else {
        TemperatureCategory::Cold
    }
}
