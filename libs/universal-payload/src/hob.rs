// SPDX-License-Identifier: MPL-2.0

//! Hand-Off Block (HOB) buffer helpers.

use crate::error::{Error, Result};

/// Zero-pads `buf` to `expect_len` bytes.
///
/// HOB lengths are computed from the structure layouts before the HOBs are
/// serialized, so the serialized buffer may come out shorter. Fails without
/// touching `buf` if it is already longer than `expect_len` or if
/// `expect_len` is beyond what a buffer can hold.
pub fn align_hob_length(expect_len: u64, buf: &mut Vec<u8>) -> Result<()> {
    let range_error = || Error::AlignmentRangeError {
        expect_len,
        buf_len: buf.len(),
    };
    if expect_len > isize::MAX as u64 {
        return Err(range_error());
    }
    let expect_len = usize::try_from(expect_len).map_err(|_| range_error())?;
    if expect_len < buf.len() {
        return Err(range_error());
    }

    buf.resize(expect_len, 0);
    Ok(())
}
