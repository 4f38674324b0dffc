// SPDX-License-Identifier: MPL-2.0

//! PE/COFF header parsing for the image embedded in a Universal Payload.
//!
//! The definition of the PE/COFF header is in the Microsoft PE/COFF specification:
//! <https://learn.microsoft.com/en-us/windows/win32/debug/pe-format>
//!
//! Only what is needed to reach the section table is interpreted: the MS-DOS
//! stub's pointer to the PE header, the COFF file header, the magic and the
//! preferred image base of the optional header.

use core::mem::size_of;

use bytemuck::{Pod, Zeroable};

use crate::error::{Error, Result};

// The MS-DOS header.
pub(crate) const MZ_MAGIC: u16 = 0x5a4d; // "MZ"
// Where the MS-DOS header stores the file offset of the PE header.
pub(crate) const PE_HDR_OFFSET_FIELD: usize = 0x3c;

// The `magic` field in PE header.
pub(crate) const PE_MAGIC: u32 = 0x00004550;

// The `magic` field in the PE32+ optional header.
pub(crate) const PE32PLUS_OPT_HDR_MAGIC: u16 = 0x020b;

// The `flags` field choices in the PE section header.
// Excluding the alignment flags, which is not bitflags.
bitflags::bitflags! {
    pub struct PeSectionFlags: u32 {
        const CNT_CODE                  = 1 << 5;
        const CNT_INITIALIZED_DATA      = 1 << 6;
        const CNT_UNINITIALIZED_DATA    = 1 << 7;
        const MEM_DISCARDABLE           = 1 << 25;
        const MEM_EXECUTE               = 1 << 29;
        const MEM_READ                  = 1 << 30;
        const MEM_WRITE                 = 1 << 31;
    }
}

#[derive(Zeroable, Pod, Clone, Copy)]
#[repr(C, packed)]
pub(crate) struct PeHdr {
    pub(crate) magic: u32,        // PE magic
    pub(crate) machine: u16,      // machine type
    pub(crate) sections: u16,     // number of sections
    pub(crate) timestamp: u32,    // time_t
    pub(crate) symbol_table: u32, // symbol table offset
    pub(crate) symbols: u32,      // number of symbols
    pub(crate) opt_hdr_size: u16, // size of optional header
    pub(crate) flags: u16,        // flags
}

#[derive(Zeroable, Pod, Clone, Copy)]
#[repr(C, packed)]
pub(crate) struct Pe32PlusOptHdr {
    pub(crate) magic: u16,          // file type
    pub(crate) ld_major: u8,        // linker major version
    pub(crate) ld_minor: u8,        // linker minor version
    pub(crate) text_size: u32,      // size of text section(s)
    pub(crate) data_size: u32,      // size of data section(s)
    pub(crate) bss_size: u32,       // size of bss section(s)
    pub(crate) entry_point: u32,    // file offset of entry point
    pub(crate) code_base: u32,      // relative code addr in ram
    pub(crate) image_base: u64,     // preferred load address
    pub(crate) section_align: u32,  // alignment in bytes
    pub(crate) file_align: u32,     // file alignment in bytes
    pub(crate) os_major: u16,       // major OS version
    pub(crate) os_minor: u16,       // minor OS version
    pub(crate) image_major: u16,    // major image version
    pub(crate) image_minor: u16,    // minor image version
    pub(crate) subsys_major: u16,   // major subsystem version
    pub(crate) subsys_minor: u16,   // minor subsystem version
    pub(crate) win32_version: u32,  // reserved, must be 0
    pub(crate) image_size: u32,     // image size
    pub(crate) header_size: u32,    // header size rounded up to file_align
    pub(crate) csum: u32,           // checksum
    pub(crate) subsys: u16,         // subsystem
    pub(crate) dll_flags: u16,      // more flags!
    pub(crate) stack_size_req: u64, // amt of stack requested
    pub(crate) stack_size: u64,     // amt of stack required
    pub(crate) heap_size_req: u64,  // amt of heap requested
    pub(crate) heap_size: u64,      // amt of heap required
    pub(crate) loader_flags: u32,   // reserved, must be 0
    pub(crate) data_dirs: u32,      // number of data dir entries
}

#[derive(Zeroable, Pod, Clone, Copy)]
#[repr(C, packed)]
pub(crate) struct PeSectionHdr {
    pub(crate) name: [u8; 8],        // name or "/12\0" string tbl offset
    pub(crate) virtual_size: u32,    // size of loaded section in RAM
    pub(crate) virtual_address: u32, // relative virtual address
    pub(crate) raw_data_size: u32,   // size of the section
    pub(crate) data_addr: u32,       // file pointer to first page of sec
    pub(crate) relocs: u32,          // file pointer to relocation entries
    pub(crate) line_numbers: u32,    // line numbers!
    pub(crate) num_relocs: u16,      // number of relocations
    pub(crate) num_lin_numbers: u16, // srsly.
    pub(crate) flags: u32,
}

/// A section of a parsed PE image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeSection {
    name: [u8; 8],
    pub virtual_address: u32,
    pub virtual_size: u32,
    /// The file offset of the raw data.
    pub raw_offset: u32,
    pub raw_size: u32,
    pub flags: PeSectionFlags,
}

impl PeSection {
    /// The section name with the NUL padding stripped.
    ///
    /// Long names stored in the string table (`/<offset>`) are returned as is.
    pub fn name(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.name.len());
        core::str::from_utf8(&self.name[..len]).unwrap_or("")
    }

    /// Returns the raw data of the section within `image`.
    pub fn raw_data<'a>(&self, image: &'a [u8]) -> Option<&'a [u8]> {
        let start = self.raw_offset as usize;
        let end = start.checked_add(self.raw_size as usize)?;
        image.get(start..end)
    }
}

/// The headers of a PE32+ image.
///
/// This does not borrow the image bytes, so the image can be mutated after
/// parsing, e.g., to apply relocations.
#[derive(Debug, Clone)]
pub struct PeImage {
    image_base: u64,
    entry_point: u32,
    sections: Vec<PeSection>,
}

impl PeImage {
    pub fn parse(image: &[u8]) -> Result<Self> {
        let mz_magic: u16 = read_pod(image, 0).ok_or(Error::UnsupportedImageFormat)?;
        if mz_magic != MZ_MAGIC {
            return Err(Error::UnsupportedImageFormat);
        }
        let pe_hdr_offset: u32 =
            read_pod(image, PE_HDR_OFFSET_FIELD).ok_or(Error::UnsupportedImageFormat)?;
        let pe_hdr_offset = pe_hdr_offset as usize;

        let pe_hdr: PeHdr = read_pod(image, pe_hdr_offset).ok_or(Error::UnsupportedImageFormat)?;
        if pe_hdr.magic != PE_MAGIC {
            return Err(Error::UnsupportedImageFormat);
        }

        let opt_hdr_offset = pe_hdr_offset + size_of::<PeHdr>();
        let opt_hdr_magic: u16 =
            read_pod(image, opt_hdr_offset).ok_or(Error::UnsupportedImageFormat)?;
        if opt_hdr_magic != PE32PLUS_OPT_HDR_MAGIC {
            log::debug!("PE optional header magic {:#x} is not PE32+", opt_hdr_magic);
            return Err(Error::UnsupportedHeaderLayout);
        }
        if (pe_hdr.opt_hdr_size as usize) < size_of::<Pe32PlusOptHdr>() {
            return Err(Error::UnsupportedImageFormat);
        }
        let opt_hdr: Pe32PlusOptHdr =
            read_pod(image, opt_hdr_offset).ok_or(Error::UnsupportedImageFormat)?;

        let sec_hdrs_offset = opt_hdr_offset + pe_hdr.opt_hdr_size as usize;
        let sections = (0..pe_hdr.sections as usize)
            .map(|i| {
                let sec_hdr: PeSectionHdr =
                    read_pod(image, sec_hdrs_offset + i * size_of::<PeSectionHdr>())
                        .ok_or(Error::UnsupportedImageFormat)?;
                Ok(PeSection::from(&sec_hdr))
            })
            .collect::<Result<Vec<_>>>()?;

        let image_base = opt_hdr.image_base;
        let entry_point = opt_hdr.entry_point;
        log::debug!(
            "PE32+ image: base={:#x}, entry RVA={:#x}, {} sections",
            image_base,
            entry_point,
            sections.len()
        );

        Ok(Self {
            image_base,
            entry_point,
            sections,
        })
    }

    /// The preferred load address of the image.
    pub fn image_base(&self) -> u64 {
        self.image_base
    }

    /// The RVA of the entry point.
    pub fn entry_point(&self) -> u32 {
        self.entry_point
    }

    pub fn sections(&self) -> &[PeSection] {
        &self.sections
    }

    pub fn sections_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a PeSection> {
        self.sections.iter().filter(move |sec| sec.name() == name)
    }
}

impl From<&PeSectionHdr> for PeSection {
    fn from(hdr: &PeSectionHdr) -> Self {
        Self {
            name: hdr.name,
            virtual_address: hdr.virtual_address,
            virtual_size: hdr.virtual_size,
            raw_offset: hdr.data_addr,
            raw_size: hdr.raw_data_size,
            flags: PeSectionFlags::from_bits_truncate(hdr.flags),
        }
    }
}

/// Reads a plain-old-data value at `offset`, if it is in bounds.
fn read_pod<T: Pod>(bytes: &[u8], offset: usize) -> Option<T> {
    let end = offset.checked_add(size_of::<T>())?;
    bytemuck::try_pod_read_unaligned(bytes.get(offset..end)?).ok()
}
