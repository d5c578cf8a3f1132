use crate::contract::{Record, ValidationError};

/// Splits `records` into fixed-size batches without materializing them.
///
/// Every batch has exactly `batch_size` records except possibly the last.
/// The iterator borrows the input, so re-splitting the same slice always
/// reproduces the same batches. Empty input yields zero batches.
pub fn split_into_batches(
    records: &[Record],
    batch_size: usize,
) -> Result<impl Iterator<Item = &[Record]>, ValidationError> {
    if batch_size == 0 {
        return Err(ValidationError::new("batch_size must be a positive integer"));
    }
    Ok(records.chunks(batch_size))
}

/// Number of batches `split_into_batches` would yield for `record_count`
/// records.
pub fn batch_count(record_count: usize, batch_size: usize) -> Result<usize, ValidationError> {
    if batch_size == 0 {
        return Err(ValidationError::new("batch_size must be a positive integer"));
    }
    Ok(record_count.div_ceil(batch_size))
}
