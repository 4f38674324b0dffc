// SPDX-License-Identifier: MPL-2.0

//! Base relocation of the payload image.
//!
//! The `.reloc` section of a PE image is a sequence of blocks. Each block
//! starts with an 8-byte header, the page RVA and the block size (header
//! included), followed by 16-bit entries whose high 4 bits are the fixup type
//! and whose low 12 bits are the offset within the page.
//!
//! The directory has no end marker other than running out of bytes, though an
//! all-zero block header is accepted as trailing padding. A stream that stops
//! inside a block is malformed.

use core::mem::size_of;

use bytemuck::{Pod, Zeroable};

use crate::{
    error::{Error, Result},
    fit::PlacementInfo,
    pe::PeImage,
};

/// The fixup types of base relocation entries. Not exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocType {
    /// Padding, the fixup is skipped.
    Absolute,
    /// A 32-bit absolute address.
    HighLow,
    /// A 64-bit absolute address.
    Dir64,
    Unknown(u8),
}

impl RelocType {
    pub const ABSOLUTE: u8 = 0;
    pub const HIGHLOW: u8 = 3;
    pub const DIR64: u8 = 10;

    pub fn bits(self) -> u8 {
        match self {
            RelocType::Absolute => Self::ABSOLUTE,
            RelocType::HighLow => Self::HIGHLOW,
            RelocType::Dir64 => Self::DIR64,
            RelocType::Unknown(bits) => bits,
        }
    }
}

impl From<u8> for RelocType {
    fn from(bits: u8) -> Self {
        match bits {
            Self::ABSOLUTE => RelocType::Absolute,
            Self::HIGHLOW => RelocType::HighLow,
            Self::DIR64 => RelocType::Dir64,
            other => RelocType::Unknown(other),
        }
    }
}

/// A base relocation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocEntry(u16);

impl RelocEntry {
    pub fn new(ty: RelocType, offset: u16) -> Self {
        Self(((ty.bits() as u16) << 12) | (offset & 0xfff))
    }

    pub fn reloc_type(&self) -> RelocType {
        RelocType::from((self.0 >> 12) as u8)
    }

    /// The offset relative to the page RVA of the block.
    pub fn offset(&self) -> u16 {
        self.0 & 0xfff
    }

    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

#[derive(Zeroable, Pod, Clone, Copy)]
#[repr(C)]
struct RelocBlockHeader {
    page_rva: u32,
    block_size: u32,
}

/// Relocates the payload image embedded in `blob` to run at `dst`.
///
/// The image is the `[data_offset, data_offset + data_size)` range of the
/// blob, and the whole blob is expected to be loaded at `dst`. Every 64-bit
/// absolute address in the image is shifted by the distance between where the
/// image will be and its preferred base. On success `info` is rebased to
/// `dst`, keeping the entry at the same offset from the load address.
///
/// Relocation is applied in place and is not transactional: if an entry is
/// found out of bounds, the entries before it stay applied.
pub fn relocate(blob: &mut [u8], info: &mut PlacementInfo, dst: u64) -> Result<()> {
    let start = info.data_offset as usize;
    let end = start
        .checked_add(info.data_size as usize)
        .ok_or(Error::UnsupportedImageFormat)?;
    let image = blob
        .get_mut(start..end)
        .ok_or(Error::UnsupportedImageFormat)?;

    let pe = PeImage::parse(image)?;
    let delta = dst
        .wrapping_add(info.data_offset as u64)
        .wrapping_sub(pe.image_base());
    log::debug!(
        "Relocating UPL image {:#x} -> {:#x}, delta={:#x}",
        pe.image_base(),
        dst.wrapping_add(info.data_offset as u64),
        delta
    );

    for section in pe.sections_named(".reloc") {
        let reloc_data = section
            .raw_data(image)
            .ok_or(Error::RelocSectionReadFailure)?
            .to_vec();
        apply_relocations(&reloc_data, delta, image)?;
    }

    info.entry_start = dst.wrapping_add(info.entry_offset());
    info.load = dst;
    log::info!(
        "UPL relocated: load={:#x}, entry={:#x}",
        info.load,
        info.entry_start
    );

    Ok(())
}

/// Walks the relocation blocks in `reloc_data` and adds `delta` to every
/// 64-bit absolute address they point at in `image`.
///
/// Only [`RelocType::Dir64`] fixups are applied; all the other types are
/// skipped. An all-zero block header terminates the directory early.
pub fn apply_relocations(reloc_data: &[u8], delta: u64, image: &mut [u8]) -> Result<()> {
    let mut cursor = reloc_data;

    while !cursor.is_empty() {
        let header: RelocBlockHeader =
            take_pod(&mut cursor).ok_or(Error::MalformedRelocationHeader)?;
        let page_rva = u32::from_le(header.page_rva);
        let block_size = u32::from_le(header.block_size);
        if page_rva == 0 && block_size == 0 {
            break;
        }
        if (block_size as usize) < size_of::<RelocBlockHeader>() {
            return Err(Error::MalformedRelocationHeader);
        }

        let num_entries = (block_size as usize - size_of::<RelocBlockHeader>()) / 2;
        log::debug!(
            "Relocation block: page RVA={:#x}, {} entries",
            page_rva,
            num_entries
        );

        for _ in 0..num_entries {
            let raw: u16 = take_pod(&mut cursor).ok_or(Error::MalformedRelocationEntry)?;
            let entry = RelocEntry(u16::from_le(raw));
            match entry.reloc_type() {
                RelocType::Dir64 => {
                    let addr = page_rva as u64 + entry.offset() as u64;
                    fixup_dir64(image, addr, delta)?;
                }
                RelocType::Absolute => {}
                other => log::warn!(
                    "Skipping relocation of type {:?} at {:#x}",
                    other,
                    page_rva as u64 + entry.offset() as u64
                ),
            }
        }
    }

    Ok(())
}

fn fixup_dir64(image: &mut [u8], addr: u64, delta: u64) -> Result<()> {
    let out_of_bounds = Error::RelocationOutOfBounds {
        addr,
        image_len: image.len(),
    };
    let start = usize::try_from(addr).map_err(|_| out_of_bounds.clone())?;
    let target: &mut [u8; 8] = image
        .get_mut(start..start.saturating_add(size_of::<u64>()))
        .and_then(|slice| slice.try_into().ok())
        .ok_or(out_of_bounds)?;

    let value = u64::from_le_bytes(*target).wrapping_add(delta);
    *target = value.to_le_bytes();
    Ok(())
}

/// Takes a plain-old-data value off the front of `cursor`.
fn take_pod<T: Pod>(cursor: &mut &[u8]) -> Option<T> {
    if cursor.len() < size_of::<T>() {
        return None;
    }
    let (head, tail) = cursor.split_at(size_of::<T>());
    *cursor = tail;
    Some(bytemuck::pod_read_unaligned(head))
}
