/// Axis-aligned bounding box in XYXY pixel coordinates.
///
/// Detectors in this crate report boxes as (x1, y1, x2, y2); the constructors
/// convert from the other common layouts:
/// - TLWH: Top-Left X, Top-Left Y, Width, Height
/// - XYWH: Center X, Center Y, Width, Height
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    #[inline]
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Create a box from TLWH format (top-left x, top-left y, width, height).
    #[inline]
    pub fn from_tlwh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Create a box from XYWH format (center x, center y, width, height).
    #[inline]
    pub fn from_xywh(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(
            cx - width / 2.0,
            cy - height / 2.0,
            cx + width / 2.0,
            cy + height / 2.0,
        )
    }

    #[inline]
    pub fn to_xyxy(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Scale coordinates, e.g. from the resized input back to the original image.
    pub fn scale(&self, scale_x: f32, scale_y: f32) -> Self {
        Self::new(
            self.x1 * scale_x,
            self.y1 * scale_y,
            self.x2 * scale_x,
            self.y2 * scale_y,
        )
    }

    /// Clip the box to an image of `height` x `width`.
    pub fn clip(&self, height: usize, width: usize) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self::new(
            self.x1.clamp(0.0, w),
            self.y1.clamp(0.0, h),
            self.x2.clamp(0.0, w),
            self.y2.clamp(0.0, h),
        )
    }

    /// Inclusive pixel bounds `(x_min, y_min, x_max, y_max)` inside an image of
    /// `height` x `width`, or `None` when the clipped box is empty.
    pub fn pixel_bounds(&self, height: usize, width: usize) -> Option<(u32, u32, u32, u32)> {
        if height == 0 || width == 0 {
            return None;
        }
        let clipped = self.clip(height, width);
        let x_min = clipped.x1.floor() as u32;
        let y_min = clipped.y1.floor() as u32;
        let x_max = (clipped.x2.ceil() as u32).min(width as u32 - 1);
        let y_max = (clipped.y2.ceil() as u32).min(height as u32 - 1);
        if x_min >= x_max || y_min >= y_max {
            return None;
        }
        Some((x_min, y_min, x_max, y_max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_conversions() {
        let tlwh = BoundingBox::from_tlwh(10.0, 20.0, 30.0, 40.0);
        assert_eq!(tlwh.to_xyxy(), [10.0, 20.0, 40.0, 60.0]);

        let xywh = BoundingBox::from_xywh(25.0, 40.0, 30.0, 40.0);
        assert_eq!(xywh, tlwh);
        assert_eq!(xywh.width(), 30.0);
        assert_eq!(xywh.height(), 40.0);
        assert_eq!(xywh.area(), 1200.0);
    }

    #[test]
    fn test_scale_and_clip() {
        let b = BoundingBox::new(10.0, 10.0, 100.0, 50.0).scale(0.5, 2.0);
        assert_eq!(b.to_xyxy(), [5.0, 20.0, 50.0, 100.0]);
        assert_eq!(b.clip(60, 40).to_xyxy(), [5.0, 20.0, 40.0, 60.0]);
    }

    #[test]
    fn test_pixel_bounds() {
        let b = BoundingBox::new(-5.0, 2.5, 12.2, 200.0);
        assert_eq!(b.pixel_bounds(100, 10), Some((0, 2, 9, 99)));
        assert_eq!(BoundingBox::new(5.0, 5.0, 5.0, 9.0).pixel_bounds(10, 10), None);
        assert_eq!(BoundingBox::new(20.0, 20.0, 30.0, 30.0).pixel_bounds(10, 10), None);
    }
}
