//! Single-pole exponential low-pass filter.
//!
//! `LowPassFilter` approximates motor inertia: each update moves the estimate a
//! fixed fraction `1 - A` of the way toward the input.
//!
//! # Example
//! ```rust
//! use lfr_core::utils::math::filter::LowPassFilter;
//! let mut lpf = LowPassFilter::new(0.99, 0.0);
//! let y = lpf.update(255.0);
//! assert!((y - 2.55).abs() < 1e-4);
//! ```

/// Exponential smoother `y = y*A + x*(1-A)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowPassFilter {
    /// Pole `A`, expected in `[0, 1)`.
    alpha: f32,
    value: f32,
}

impl LowPassFilter {
    /// Instantiate with pole `alpha` and starting estimate `initial`.
    pub fn new(
        alpha: f32,
        initial: f32,
    ) -> Self {
        Self {
            alpha,
            value: initial,
        }
    }

    /// Feed one sample and return the new estimate.
    pub fn update(
        &mut self,
        input: f32,
    ) -> f32 {
        self.value = self.value * self.alpha + input * (1.0 - self.alpha);
        self.value
    }

    /// Current estimate.
    pub fn value(&self) -> f32 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_point_is_input() {
        let mut lpf = LowPassFilter::new(0.99, 127.0);
        for _ in 0..100 {
            assert!((lpf.update(127.0) - 127.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_converges_monotonically_from_below() {
        let mut lpf = LowPassFilter::new(0.99, 0.0);
        let mut prev = lpf.value();
        for _ in 0..2000 {
            let y = lpf.update(200.0);
            assert!(y + 1e-4 >= prev, "estimate went backwards: {} < {}", y, prev);
            assert!(y <= 200.0 + 1e-3);
            prev = y;
        }
        assert!((prev - 200.0).abs() < 0.01);
    }

    #[test]
    fn test_converges_monotonically_from_above() {
        let mut lpf = LowPassFilter::new(0.99, 255.0);
        let mut prev = lpf.value();
        for _ in 0..2000 {
            let y = lpf.update(63.0);
            assert!(y <= prev + 1e-4);
            assert!(y >= 63.0 - 1e-3);
            prev = y;
        }
        assert!((prev - 63.0).abs() < 0.01);
    }

    #[test]
    fn test_never_exceeds_bound() {
        for initial in [0.0f32, 1.0, 90.0, 255.0] {
            for input in [0.0f32, 63.0, 127.0, 255.0] {
                let mut lpf = LowPassFilter::new(0.99, initial);
                let bound = initial.max(input) + 1e-3;
                for _ in 0..500 {
                    assert!(lpf.update(input) <= bound);
                }
            }
        }
    }

    #[test]
    fn test_zero_alpha_tracks_input() {
        let mut lpf = LowPassFilter::new(0.0, 10.0);
        assert_eq!(lpf.update(42.0), 42.0);
    }
}
