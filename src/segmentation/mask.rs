use crate::region::Region;
use image::{Rgb, RgbImage};

/// Working label of one pixel during GrabCut
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Background = 0,
    Foreground = 1,
    ProbableBackground = 2,
    ProbableForeground = 3,
}

impl Label {
    pub fn is_foreground(self) -> bool {
        matches!(self, Self::Foreground | Self::ProbableForeground)
    }

    /// Probable labels may still change; definite ones are fixed
    pub fn is_probable(self) -> bool {
        matches!(self, Self::ProbableBackground | Self::ProbableForeground)
    }

    /// Label for OpenCV's `GC_BGD`..`GC_PR_FGD` mask values
    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Background),
            1 => Some(Self::Foreground),
            2 => Some(Self::ProbableBackground),
            3 => Some(Self::ProbableForeground),
            _ => None,
        }
    }
}

/// Four-label grid owned by one segmentation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    width: u32,
    height: u32,
    labels: Vec<Label>,
}

impl LabelMap {
    pub fn filled(width: u32, height: u32, label: Label) -> Self {
        Self {
            width,
            height,
            labels: vec![label; width as usize * height as usize],
        }
    }

    /// Definite background outside `region`, probable foreground inside
    pub fn from_region(width: u32, height: u32, region: &Region) -> Self {
        let mut map = Self::filled(width, height, Label::Background);
        let x_end = (region.x() + region.width()).min(width);
        let y_end = (region.y() + region.height()).min(height);

        for y in region.y()..y_end {
            let row = y as usize * width as usize;
            for x in region.x()..x_end {
                map.labels[row + x as usize] = Label::ProbableForeground;
            }
        }
        map
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> Label {
        self.labels[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, label: Label) {
        let idx = self.index(x, y);
        self.labels[idx] = label;
    }

    pub fn as_slice(&self) -> &[Label] {
        &self.labels
    }

    /// Raw mask values in row-major order
    pub fn to_bytes(&self) -> Vec<u8> {
        self.labels.iter().map(|&l| l as u8).collect()
    }

    /// Rebuild a map from raw mask values; `None` on a bad value or length
    pub fn from_bytes(width: u32, height: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.len() != width as usize * height as usize {
            return None;
        }
        let labels = bytes
            .iter()
            .map(|&b| Label::from_raw(b))
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            width,
            height,
            labels,
        })
    }

    /// Fold the four labels into foreground/background
    pub fn collapse(&self) -> Mask {
        Mask {
            width: self.width,
            height: self.height,
            foreground: self.labels.iter().map(|l| l.is_foreground()).collect(),
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// Binary foreground/background mask, row-major
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mask {
    width: u32,
    height: u32,
    foreground: Vec<bool>,
}

impl Mask {
    pub fn filled(width: u32, height: u32, foreground: bool) -> Self {
        Self {
            width,
            height,
            foreground: vec![foreground; width as usize * height as usize],
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut foreground = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                foreground.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            foreground,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.foreground[y as usize * self.width as usize + x as usize]
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.foreground
    }

    pub fn foreground_count(&self) -> usize {
        self.foreground.iter().filter(|&&fg| fg).count()
    }

    /// Inclusive (min_x, min_y, max_x, max_y) of the foreground, if any
    pub fn bounding_box(&self) -> Option<(u32, u32, u32, u32)> {
        let width = self.width as usize;
        self.foreground
            .iter()
            .enumerate()
            .filter(|&(_, &fg)| fg)
            .map(|(i, _)| ((i % width) as u32, (i / width) as u32))
            .fold(None, |acc, (x, y)| match acc {
                None => Some((x, y, x, y)),
                Some((x0, y0, x1, y1)) => Some((x0.min(x), y0.min(y), x1.max(x), y1.max(y))),
            })
    }

    /// Black/white rendering for display
    pub fn to_rgb(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let value = if self.is_foreground(x, y) { 255 } else { 0 };
            Rgb([value, value, value])
        })
    }
}
