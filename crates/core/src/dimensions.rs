use serde::{Deserialize, Serialize};

/// Intrinsic pixel size of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Used when an image cannot be decoded locally: a 4:3 landscape box.
    pub const PLACEHOLDER: Dimensions = Dimensions {
        width: 800,
        height: 600,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height. Degenerate sizes fall back to the
    /// placeholder ratio so layout code never divides by zero.
    pub fn aspect_ratio(&self) -> f64 {
        if self.width == 0 || self.height == 0 {
            return Self::PLACEHOLDER.aspect_ratio();
        }
        f64::from(self.width) / f64::from(self.height)
    }

    /// Build from nullable database columns, if both are present and positive.
    pub fn from_columns(width: Option<i32>, height: Option<i32>) -> Option<Self> {
        match (width, height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(Self::new(w as u32, h as u32)),
            _ => None,
        }
    }
}
