//! Pixel filters offered by the Filter menu.
//!
//! Every function here is pure: same input image and parameter, same output
//! bytes. RGB channels are transformed, alpha is carried through.

pub mod adjust;
pub mod blur;
pub mod histogram;
pub mod paint;

use image::RgbaImage;

/// Default upper bound for blur kernel sizes when the config does not set one.
pub const DEFAULT_MAX_KERNEL: i32 = 31;
const MIN_ODD_KERNEL: i32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Brightness,
    Sepia,
    HistogramEqualization,
    HomogeneousBlur,
    GaussianBlur,
    MedianBlur,
    BilateralBlur,
}

impl EffectKind {
    pub const ALL: [EffectKind; 7] = [
        EffectKind::Brightness,
        EffectKind::Sepia,
        EffectKind::HistogramEqualization,
        EffectKind::HomogeneousBlur,
        EffectKind::GaussianBlur,
        EffectKind::MedianBlur,
        EffectKind::BilateralBlur,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EffectKind::Brightness => "Brightness",
            EffectKind::Sepia => "Sepia",
            EffectKind::HistogramEqualization => "Histogram Equalization",
            EffectKind::HomogeneousBlur => "Homogeneous Blur",
            EffectKind::GaussianBlur => "Gaussian Blur",
            EffectKind::MedianBlur => "Median Blur",
            EffectKind::BilateralBlur => "Bilateral Blur",
        }
    }

    pub fn is_blur(self) -> bool {
        matches!(
            self,
            EffectKind::HomogeneousBlur
                | EffectKind::GaussianBlur
                | EffectKind::MedianBlur
                | EffectKind::BilateralBlur
        )
    }

    /// The adjustable parameter this effect exposes, if any.
    pub fn param_range(self, max_kernel: i32) -> Option<ParamRange> {
        match self {
            EffectKind::Brightness => Some(ParamRange {
                min: 0,
                max: 100,
                default: 0,
                odd_kernel: false,
            }),
            EffectKind::Sepia | EffectKind::HistogramEqualization => None,
            _ => Some(ParamRange {
                min: 2,
                max: max_kernel.max(MIN_ODD_KERNEL),
                default: MIN_ODD_KERNEL,
                odd_kernel: true,
            }),
        }
    }
}

/// Bounds of an effect parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamRange {
    pub min: i32,
    pub max: i32,
    pub default: i32,
    /// Kernel sizes must be odd and at least 3.
    pub odd_kernel: bool,
}

impl ParamRange {
    /// Clamp `value` into range, then round kernel sizes up to the next odd value.
    pub fn coerce(&self, value: i32) -> i32 {
        let v = value.clamp(self.min, self.max);
        if !self.odd_kernel {
            return v;
        }
        let v = v.max(MIN_ODD_KERNEL);
        let v = if v % 2 == 0 { v + 1 } else { v };
        if v > self.max {
            let top = if self.max % 2 == 0 { self.max - 1 } else { self.max };
            top.max(MIN_ODD_KERNEL)
        } else {
            v
        }
    }
}

/// Run `kind` over `img`. `param` is ignored by parameterless effects and is
/// expected to be coerced already for kernel effects.
pub fn apply(kind: EffectKind, img: &RgbaImage, param: i32) -> RgbaImage {
    if img.width() == 0 || img.height() == 0 {
        return img.clone();
    }
    match kind {
        EffectKind::Brightness => adjust::brightness_contrast(img, adjust::CONTRAST_ALPHA, param),
        EffectKind::Sepia => adjust::sepia(img),
        EffectKind::HistogramEqualization => histogram::equalize(img),
        EffectKind::HomogeneousBlur => blur::homogeneous(img, kernel(param)),
        EffectKind::GaussianBlur => blur::gaussian(img, kernel(param)),
        EffectKind::MedianBlur => blur::median(img, kernel(param)),
        EffectKind::BilateralBlur => blur::bilateral(img, kernel(param)),
    }
}

fn kernel(param: i32) -> u32 {
    param.max(MIN_ODD_KERNEL) as u32
}

#[cfg(test)]
mod tests {
    use image::{ImageBuffer, Rgba, RgbaImage};

    use super::{DEFAULT_MAX_KERNEL, EffectKind, apply};

    fn gradient() -> RgbaImage {
        ImageBuffer::from_fn(12, 9, |x, y| {
            Rgba([(x * 20) as u8, (y * 25) as u8, ((x + y) * 9) as u8, 255])
        })
    }

    #[test]
    fn kernel_sizes_below_three_coerce_to_three() {
        for kind in EffectKind::ALL.into_iter().filter(|k| k.is_blur()) {
            let range = kind.param_range(DEFAULT_MAX_KERNEL).unwrap();
            assert_eq!(range.coerce(0), 3, "{kind:?}");
            assert_eq!(range.coerce(1), 3, "{kind:?}");
            assert_eq!(range.coerce(2), 3, "{kind:?}");
        }
    }

    #[test]
    fn even_kernel_sizes_round_up() {
        let range = EffectKind::GaussianBlur.param_range(DEFAULT_MAX_KERNEL).unwrap();
        assert_eq!(range.coerce(4), 5);
        assert_eq!(range.coerce(10), 11);
        assert_eq!(range.coerce(7), 7);
    }

    #[test]
    fn kernel_sizes_cap_at_odd_maximum() {
        let range = EffectKind::MedianBlur.param_range(20).unwrap();
        assert_eq!(range.coerce(20), 19);
        assert_eq!(range.coerce(500), 19);
    }

    #[test]
    fn brightness_range_is_plain_clamp() {
        let range = EffectKind::Brightness.param_range(DEFAULT_MAX_KERNEL).unwrap();
        assert_eq!(range.coerce(-20), 0);
        assert_eq!(range.coerce(42), 42);
        assert_eq!(range.coerce(400), 100);
    }

    #[test]
    fn parameterless_effects_have_no_range() {
        assert!(EffectKind::Sepia.param_range(DEFAULT_MAX_KERNEL).is_none());
        assert!(
            EffectKind::HistogramEqualization
                .param_range(DEFAULT_MAX_KERNEL)
                .is_none()
        );
    }

    #[test]
    fn every_effect_preserves_dimensions_and_is_deterministic() {
        let img = gradient();
        for kind in EffectKind::ALL {
            let a = apply(kind, &img, 5);
            let b = apply(kind, &img, 5);
            assert_eq!(a.dimensions(), img.dimensions(), "{kind:?}");
            assert_eq!(a, b, "{kind:?}");
        }
    }

    #[test]
    fn empty_images_pass_through() {
        let img = RgbaImage::new(0, 4);
        for kind in EffectKind::ALL {
            assert_eq!(apply(kind, &img, 3).dimensions(), (0, 4));
        }
    }
}
