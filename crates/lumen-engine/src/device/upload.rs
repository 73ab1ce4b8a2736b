//! Validation for data handed to the GPU by applications.

use super::UploadError;

/// Bytes per texel of the mesh texture format (BGRA8).
pub const TEXTURE_BYTES_PER_TEXEL: u32 = 4;

pub(crate) fn validate_texture(len: usize, width: u32, height: u32, max_dimension: u32) -> Result<(), UploadError> {
    if len == 0 || width == 0 || height == 0 {
        return Err(UploadError::Empty);
    }
    if width > max_dimension || height > max_dimension {
        return Err(UploadError::TextureTooLarge {
            width,
            height,
            max: max_dimension,
        });
    }

    let expected = u64::from(width) * u64::from(height) * u64::from(TEXTURE_BYTES_PER_TEXEL);
    let actual = len as u64;
    if expected != actual {
        return Err(UploadError::SizeMismatch {
            width,
            height,
            expected,
            actual,
        });
    }
    Ok(())
}

pub(crate) fn validate_buffer(len: usize, max_size: u64) -> Result<(), UploadError> {
    if len == 0 {
        return Err(UploadError::Empty);
    }
    let size = len as u64;
    if size > max_size {
        return Err(UploadError::BufferTooLarge { size, max: max_size });
    }
    Ok(())
}
