/// Axis-aligned 2D extent in projected map units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    /// Extent of `size` pixels at `resolution` map units per pixel, centred on `center`.
    pub fn from_center(center: [f64; 2], resolution: f64, size: [u32; 2]) -> Self {
        let half_w = resolution * f64::from(size[0]) / 2.0;
        let half_h = resolution * f64::from(size[1]) / 2.0;
        Aabb2 {
            min: [center[0] - half_w, center[1] - half_h],
            max: [center[0] + half_w, center[1] + half_h],
        }
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    pub fn center(&self) -> [f64; 2] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
        ]
    }

    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }
}
