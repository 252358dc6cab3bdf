//! Seed rectangles and the drawable-canvas payload they come from.

use crate::error::{CutoutError, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Outline color of the selected-region preview
pub const SELECTION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Outline thickness of the selected-region preview, in pixels
pub const SELECTION_THICKNESS: u32 = 2;

/// Rectangle as reported by the canvas, not yet checked against an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl Rect {
    pub fn new(left: i64, top: i64, width: i64, height: i64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Check the rectangle against an image of the given size
    ///
    /// Width and height must be positive and the rectangle must lie fully
    /// inside the image.
    pub fn within(&self, image_width: u32, image_height: u32) -> Result<Region> {
        if self.width <= 0 || self.height <= 0 {
            return Err(CutoutError::invalid_region(format!(
                "{self} has no area"
            )));
        }
        if self.left < 0 || self.top < 0 {
            return Err(CutoutError::invalid_region(format!(
                "{self} starts outside the image"
            )));
        }
        if self.left.saturating_add(self.width) > i64::from(image_width)
            || self.top.saturating_add(self.height) > i64::from(image_height)
        {
            return Err(CutoutError::invalid_region(format!(
                "{self} exceeds {image_width}x{image_height}"
            )));
        }

        Ok(Region {
            x: self.left as u32,
            y: self.top as u32,
            width: self.width as u32,
            height: self.height as u32,
        })
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.left, self.top, self.width, self.height
        )
    }
}

/// Parses `left,top,width,height`
impl FromStr for Rect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|part| part.trim().parse::<i64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid rectangle '{s}': {e}"))?;

        match parts.as_slice() {
            &[left, top, width, height] => Ok(Self::new(left, top, width, height)),
            _ => Err(format!(
                "invalid rectangle '{s}': expected left,top,width,height"
            )),
        }
    }
}

/// Rectangle known to fit inside the image it was checked against
///
/// Only [`Rect::within`] builds one, so the segmenter never sees an empty or
/// out-of-bounds seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl Region {
    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether pixel (x, y) lies inside the rectangle
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Stable byte encoding used in cache keys
    pub fn to_le_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        for (chunk, value) in out
            .chunks_exact_mut(4)
            .zip([self.x, self.y, self.width, self.height])
        {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        out
    }
}

/// Shape object reported by the drawable canvas
///
/// Only the geometry is read; styling keys are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CanvasObject {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CanvasObject {
    /// Truncate the reported geometry to integer pixels
    pub fn to_rect(&self) -> Rect {
        Rect::new(
            self.left as i64,
            self.top as i64,
            self.width as i64,
            self.height as i64,
        )
    }
}

/// JSON payload of the drawable canvas
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CanvasState {
    #[serde(default)]
    pub objects: Vec<CanvasObject>,
}

impl CanvasState {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Rectangle of the first drawn object, if any
    ///
    /// Later objects are left alone; the first one drawn always wins.
    pub fn first_rect(&self) -> Option<Rect> {
        if self.objects.len() > 1 {
            tracing::debug!(
                "Canvas holds {} objects, using the first",
                self.objects.len()
            );
        }
        self.objects.first().map(CanvasObject::to_rect)
    }
}

/// Pick the seed region from a canvas payload
///
/// `Ok(None)` means nothing usable has been drawn yet. An object that does not
/// form a valid rectangle for this image yields `InvalidRegion`, which callers
/// treat as the same waiting state.
pub fn select_region(
    canvas: Option<&CanvasState>,
    image_width: u32,
    image_height: u32,
) -> Result<Option<Region>> {
    let Some(rect) = canvas.and_then(CanvasState::first_rect) else {
        return Ok(None);
    };

    rect.within(image_width, image_height).map(Some)
}

/// Copy of `image` with the selection outline drawn on top
///
/// The innermost ring runs from (left, top) to (left + width, top + height)
/// inclusive; further rings grow outwards. Parts off the image are dropped.
pub fn draw_selection(image: &RgbImage, rect: &Rect) -> RgbImage {
    let mut canvas = image.clone();
    let (width, height) = canvas.dimensions();

    // Pull far-away edges in to just past the border so sizes fit in i32
    let margin = i64::from(SELECTION_THICKNESS) + 1;
    let clamp_x = |x: i64| x.clamp(-margin, i64::from(width) + margin);
    let clamp_y = |y: i64| y.clamp(-margin, i64::from(height) + margin);

    let xa = clamp_x(rect.left);
    let xb = clamp_x(rect.left.saturating_add(rect.width));
    let ya = clamp_y(rect.top);
    let yb = clamp_y(rect.top.saturating_add(rect.height));
    let (x0, x1) = (xa.min(xb), xa.max(xb));
    let (y0, y1) = (ya.min(yb), ya.max(yb));

    for ring in 0..i64::from(SELECTION_THICKNESS) {
        let outline = imageproc::rect::Rect::at((x0 - ring) as i32, (y0 - ring) as i32)
            .of_size((x1 - x0 + 1 + 2 * ring) as u32, (y1 - y0 + 1 + 2 * ring) as u32);
        draw_hollow_rect_mut(&mut canvas, outline, SELECTION_COLOR);
    }

    canvas
}
