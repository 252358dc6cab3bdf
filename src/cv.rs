//! Copies between `image` buffers and OpenCV matrices.

use crate::error::Result;
use image::RgbImage;
use opencv::core::{Mat, Scalar, StsUnmatchedSizes, CV_8UC1, CV_8UC3};
use opencv::prelude::*;

/// Owned 8-bit, 3-channel matrix with the image's pixels (channel order kept)
pub fn rgb_to_mat(image: &RgbImage) -> Result<Mat> {
    let (width, height) = image.dimensions();
    let mut mat = Mat::new_rows_cols_with_default(
        height as i32,
        width as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(image.as_raw());
    Ok(mat)
}

/// Owned single-channel 8-bit matrix from row-major bytes
pub fn bytes_to_mat(width: u32, height: u32, bytes: &[u8]) -> Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        height as i32,
        width as i32,
        CV_8UC1,
        Scalar::all(0.0),
    )?;
    let data = mat.data_bytes_mut()?;
    if data.len() != bytes.len() {
        return Err(opencv::Error::new(
            StsUnmatchedSizes,
            format!("{} bytes for a {width}x{height} matrix", bytes.len()),
        )
        .into());
    }
    data.copy_from_slice(bytes);
    Ok(mat)
}

/// Copy an 8-bit, 3-channel matrix back into an `RgbImage`
pub fn mat_to_rgb(mat: &Mat) -> Result<RgbImage> {
    let (width, height) = (mat.cols() as u32, mat.rows() as u32);
    let bytes = mat.data_bytes()?.to_vec();
    let len = bytes.len();
    RgbImage::from_vec(width, height, bytes).ok_or_else(|| {
        opencv::Error::new(
            StsUnmatchedSizes,
            format!("{len} bytes do not form a {width}x{height} RGB image"),
        )
        .into()
    })
}
