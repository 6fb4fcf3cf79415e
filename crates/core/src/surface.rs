//! Headless crop overlay.
//!
//! [`BoundedSurface`] stands in for the pointer-driven rectangle widget
//! when there is no rendering surface. It keeps the rectangle inside the
//! reference image and honours a locked aspect ratio, which makes it the
//! single place where clamping happens.

use crate::crop_editor::CropSurface;
use crate::types::Rectangle;

#[derive(Debug, Default)]
pub struct BoundedSurface {
    bounds: Option<(f64, f64)>,
    rect: Option<Rectangle>,
    aspect_ratio: Option<f64>,
}

impl BoundedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.bounds.is_some()
    }

    pub fn aspect_ratio(&self) -> Option<f64> {
        self.aspect_ratio
    }

    fn fit(&self, rect: Rectangle) -> Rectangle {
        let mut r = Rectangle::new(
            finite_or_zero(rect.x),
            finite_or_zero(rect.y),
            finite_or_zero(rect.width),
            finite_or_zero(rect.height),
        );
        let Some((max_w, max_h)) = self.bounds else {
            return r;
        };

        if let Some(ratio) = self.aspect_ratio {
            r.height = r.width / ratio;
        }

        r.x = r.x.clamp(0.0, max_w);
        r.y = r.y.clamp(0.0, max_h);
        r.width = r.width.clamp(0.0, max_w - r.x);
        r.height = r.height.clamp(0.0, max_h - r.y);

        // Clamping may have cut one side; shrink the other to keep the ratio.
        if let Some(ratio) = self.aspect_ratio {
            let width = r.width.min(r.height * ratio);
            r.width = width;
            r.height = width / ratio;
        }
        r
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

impl CropSurface for BoundedSurface {
    fn open(
        &mut self,
        image_width: u32,
        image_height: u32,
        initial: Rectangle,
        aspect_ratio: Option<f64>,
    ) {
        self.bounds = Some((image_width as f64, image_height as f64));
        self.aspect_ratio = aspect_ratio.filter(|r| r.is_finite() && *r > 0.0);
        self.rect = Some(self.fit(initial));
    }

    fn data(&self) -> Rectangle {
        self.rect.unwrap_or(Rectangle::new(0.0, 0.0, 0.0, 0.0))
    }

    fn set_data(&mut self, rect: Rectangle) -> Rectangle {
        let fitted = self.fit(rect);
        self.rect = Some(fitted);
        fitted
    }

    fn set_aspect_ratio(&mut self, ratio: Option<f64>) {
        self.aspect_ratio = ratio.filter(|r| r.is_finite() && *r > 0.0);
    }

    fn close(&mut self) {
        self.bounds = None;
        self.rect = None;
        self.aspect_ratio = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(surface: &mut BoundedSurface, rect: Rectangle, ratio: Option<f64>) {
        surface.open(1920, 1080, rect, ratio);
    }

    #[test]
    fn clamps_into_image_bounds() {
        let mut s = BoundedSurface::new();
        open(&mut s, Rectangle::new(1800.0, -20.0, 400.0, 200.0), None);
        let r = s.data();
        assert_eq!(r, Rectangle::new(1800.0, 0.0, 120.0, 200.0));
    }

    #[test]
    fn non_finite_components_become_zero() {
        let mut s = BoundedSurface::new();
        open(&mut s, Rectangle::new(10.0, 10.0, 100.0, 50.0), None);
        let r = s.set_data(Rectangle::new(f64::NAN, 0.0, 10.0, 10.0));
        assert_eq!(r, Rectangle::new(0.0, 0.0, 10.0, 10.0));

        let r = s.set_data(Rectangle::new(5.0, f64::INFINITY, f64::NAN, f64::NEG_INFINITY));
        assert_eq!(r, Rectangle::new(5.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn non_finite_width_with_locked_ratio_does_not_panic() {
        let mut s = BoundedSurface::new();
        open(&mut s, Rectangle::new(10.0, 10.0, 100.0, 50.0), Some(2.0));
        let r = s.set_data(Rectangle::new(10.0, 10.0, f64::NAN, 10.0));
        assert_eq!(r, Rectangle::new(10.0, 10.0, 0.0, 0.0));
    }

    #[test]
    fn locked_ratio_follows_width() {
        let mut s = BoundedSurface::new();
        open(&mut s, Rectangle::new(10.0, 10.0, 100.0, 50.0), Some(2.0));
        let r = s.set_data(Rectangle::new(10.0, 10.0, 300.0, 10.0));
        assert_eq!(r.width, 300.0);
        assert_eq!(r.height, 150.0);
    }

    #[test]
    fn locked_ratio_survives_clamping() {
        let mut s = BoundedSurface::new();
        open(&mut s, Rectangle::new(0.0, 980.0, 100.0, 50.0), Some(2.0));
        let r = s.data();
        // Height was cut to 100 px at most; 100 * 2 is still wider than the input.
        assert_eq!(r.width, 100.0);
        assert_eq!(r.height, 50.0);

        let r = s.set_data(Rectangle::new(0.0, 980.0, 400.0, 200.0));
        assert_eq!(r.height, 100.0);
        assert_eq!(r.width, 200.0);
    }

    #[test]
    fn close_resets_state() {
        let mut s = BoundedSurface::new();
        open(&mut s, Rectangle::new(0.0, 0.0, 10.0, 10.0), Some(1.0));
        assert!(s.is_open());
        s.close();
        assert!(!s.is_open());
        assert!(s.aspect_ratio().is_none());
        assert_eq!(s.data().width, 0.0);
    }
}
