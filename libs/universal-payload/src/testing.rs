// SPDX-License-Identifier: MPL-2.0

//! Fixture builders for FIT blobs and PE32+ images.
//!
//! The builders panic on inputs they cannot lay out; they are meant for
//! tests only.

use core::mem::size_of;

use bytemuck::{Pod, Zeroable};

use crate::{
    fit::PlacementInfo,
    pe::{
        Pe32PlusOptHdr, PeHdr, PeSectionFlags, PeSectionHdr, MZ_MAGIC, PE32PLUS_OPT_HDR_MAGIC,
        PE_HDR_OFFSET_FIELD, PE_MAGIC,
    },
    reloc::RelocEntry,
};

const FDT_MAGIC: u32 = 0xd00d_feed;
const FDT_BEGIN_NODE: u32 = 0x1;
const FDT_END_NODE: u32 = 0x2;
const FDT_PROP: u32 = 0x3;
const FDT_END: u32 = 0x9;
const FDT_HEADER_SIZE: usize = 40;
// A single all-zero terminator entry.
const FDT_RSVMAP_SIZE: usize = 16;

/// A device tree node to be flattened with [`dtb`].
#[derive(Debug, Clone)]
pub struct DtNode {
    name: String,
    props: Vec<(String, Vec<u8>)>,
    children: Vec<DtNode>,
}

impl DtNode {
    /// Creates a node. The root node has an empty name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            props: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn prop(mut self, name: &str, value: &[u8]) -> Self {
        self.props.push((name.to_string(), value.to_vec()));
        self
    }

    pub fn prop_u32(self, name: &str, value: u32) -> Self {
        self.prop(name, &value.to_be_bytes())
    }

    pub fn prop_u64(self, name: &str, value: u64) -> Self {
        self.prop(name, &value.to_be_bytes())
    }

    pub fn without_prop(mut self, name: &str) -> Self {
        self.props.retain(|(prop_name, _)| prop_name != name);
        self
    }

    pub fn child(mut self, child: DtNode) -> Self {
        self.children.push(child);
        self
    }

    /// Replaces the descendant at `path` (child names, from this node) with
    /// the result of `f`.
    pub fn map_node(mut self, path: &[&str], f: impl FnOnce(DtNode) -> DtNode) -> Self {
        let Some((first, rest)) = path.split_first() else {
            return f(self);
        };
        let pos = self
            .children
            .iter()
            .position(|child| child.name == *first)
            .unwrap_or_else(|| panic!("no '{}' under '{}'", first, self.name));
        let child = self.children.remove(pos);
        self.children.insert(pos, child.map_node(rest, f));
        self
    }
}

/// Flattens the tree under `root` into a device tree blob (version 17).
pub fn dtb(root: &DtNode) -> Vec<u8> {
    let mut structs = Vec::new();
    let mut strings = Vec::new();
    flatten_node(root, &mut structs, &mut strings);
    structs.extend_from_slice(&FDT_END.to_be_bytes());

    let off_mem_rsvmap = FDT_HEADER_SIZE;
    let off_dt_struct = off_mem_rsvmap + FDT_RSVMAP_SIZE;
    let off_dt_strings = off_dt_struct + structs.len();
    let total_size = off_dt_strings + strings.len();

    let header = [
        FDT_MAGIC,
        total_size as u32,
        off_dt_struct as u32,
        off_dt_strings as u32,
        off_mem_rsvmap as u32,
        17, // version
        16, // last compatible version
        0,  // boot CPU
        strings.len() as u32,
        structs.len() as u32,
    ];

    let mut blob = Vec::with_capacity(total_size);
    for field in header {
        blob.extend_from_slice(&field.to_be_bytes());
    }
    blob.extend_from_slice(&[0; FDT_RSVMAP_SIZE]);
    blob.extend_from_slice(&structs);
    blob.extend_from_slice(&strings);
    blob
}

fn flatten_node(node: &DtNode, structs: &mut Vec<u8>, strings: &mut Vec<u8>) {
    structs.extend_from_slice(&FDT_BEGIN_NODE.to_be_bytes());
    structs.extend_from_slice(node.name.as_bytes());
    structs.push(0);
    pad_to_4(structs);

    for (name, value) in &node.props {
        let name_offset = strings.len() as u32;
        strings.extend_from_slice(name.as_bytes());
        strings.push(0);

        structs.extend_from_slice(&FDT_PROP.to_be_bytes());
        structs.extend_from_slice(&(value.len() as u32).to_be_bytes());
        structs.extend_from_slice(&name_offset.to_be_bytes());
        structs.extend_from_slice(value);
        pad_to_4(structs);
    }

    for child in &node.children {
        flatten_node(child, structs, strings);
    }
    structs.extend_from_slice(&FDT_END_NODE.to_be_bytes());
}

fn pad_to_4(buf: &mut Vec<u8>) {
    buf.resize(buf.len().next_multiple_of(4), 0);
}

/// The tree of a Universal Payload FIT describing `info`.
pub fn upl_fit_tree(info: &PlacementInfo) -> DtNode {
    let tianocore = DtNode::new("tianocore")
        .prop("description", b"Uefi Universal Payload\0")
        .prop("type", b"flat-binary\0")
        .prop_u32("data-offset", info.data_offset)
        .prop_u32("data-size", info.data_size)
        .prop_u64("entry-start", info.entry_start)
        .prop_u64("load", info.load);

    DtNode::new("")
        .prop("description", b"Uefi OS Loader\0")
        .child(DtNode::new("images").child(tianocore))
}

/// The offset of the payload image in blobs built by [`fit_blob`].
pub const FIT_DATA_OFFSET: u32 = 0x1000;

/// Builds a FIT blob carrying `image` at [`FIT_DATA_OFFSET`].
pub fn fit_blob(load: u64, entry_start: u64, image: &[u8]) -> Vec<u8> {
    let info = PlacementInfo {
        load,
        entry_start,
        data_offset: FIT_DATA_OFFSET,
        data_size: image.len() as u32,
    };
    let mut blob = dtb(&upl_fit_tree(&info));
    assert!(blob.len() <= FIT_DATA_OFFSET as usize);
    blob.resize(FIT_DATA_OFFSET as usize, 0);
    blob.extend_from_slice(image);
    blob
}

/// Encodes one base relocation block.
pub fn reloc_block(page_rva: u32, entries: &[RelocEntry]) -> Vec<u8> {
    let block_size = (8 + entries.len() * size_of::<u16>()) as u32;
    let mut block = Vec::new();
    block.extend_from_slice(&page_rva.to_le_bytes());
    block.extend_from_slice(&block_size.to_le_bytes());
    for entry in entries {
        block.extend_from_slice(&entry.to_le_bytes());
    }
    block
}

const PE32_OPT_HDR_MAGIC: u16 = 0x010b;
const PE_HDR_OFFSET: usize = 0x40;
const SECTION_ALIGN: usize = 0x200;
// Export, import, resource, exception, certificate and base relocation tables.
const NUM_DATA_DIRS: usize = 6;
const BASE_RELOC_DATA_DIR: usize = 5;

/// The file offset, which is also the RVA, of the first section.
pub const FIRST_SECTION_RVA: u32 = 0x400;

/// Builds PE32+ images whose sections have the same file offsets and RVAs.
#[derive(Debug, Clone)]
pub struct PeImageBuilder {
    image_base: u64,
    entry_point: u32,
    opt_hdr_magic: u16,
    sections: Vec<(String, Vec<u8>)>,
}

impl PeImageBuilder {
    pub fn new(image_base: u64) -> Self {
        Self {
            image_base,
            entry_point: FIRST_SECTION_RVA,
            opt_hdr_magic: PE32PLUS_OPT_HDR_MAGIC,
            sections: Vec::new(),
        }
    }

    pub fn entry_point(mut self, rva: u32) -> Self {
        self.entry_point = rva;
        self
    }

    /// Marks the optional header as the 32-bit one.
    pub fn pe32(mut self) -> Self {
        self.opt_hdr_magic = PE32_OPT_HDR_MAGIC;
        self
    }

    /// Appends a section. Section names longer than 8 bytes are truncated.
    pub fn section(mut self, name: &str, data: Vec<u8>) -> Self {
        self.sections.push((name.to_string(), data));
        self
    }

    /// The RVA that the next appended section will get.
    pub fn next_rva(&self) -> u32 {
        self.section_rvas().1 as u32
    }

    fn section_rvas(&self) -> (Vec<usize>, usize) {
        let mut rvas = Vec::new();
        let mut offset = FIRST_SECTION_RVA as usize;
        for (_, data) in &self.sections {
            rvas.push(offset);
            offset = (offset + data.len()).next_multiple_of(SECTION_ALIGN);
        }
        (rvas, offset)
    }

    pub fn build(&self) -> Vec<u8> {
        let (rvas, image_size) = self.section_rvas();
        let opt_hdr_size = size_of::<Pe32PlusOptHdr>() + NUM_DATA_DIRS * 8;
        let sec_hdrs_offset = PE_HDR_OFFSET + size_of::<PeHdr>() + opt_hdr_size;
        assert!(
            sec_hdrs_offset + self.sections.len() * size_of::<PeSectionHdr>()
                <= FIRST_SECTION_RVA as usize,
            "too many sections"
        );

        let mut bin = vec![0u8; image_size];
        write_pod(&mut bin, 0, &MZ_MAGIC);
        write_pod(&mut bin, PE_HDR_OFFSET_FIELD, &(PE_HDR_OFFSET as u32));

        let pe_hdr = PeHdr {
            magic: PE_MAGIC,
            machine: 0x8664,
            sections: self.sections.len() as u16,
            opt_hdr_size: opt_hdr_size as u16,
            flags: 0x22, // executable, large address aware
            ..Zeroable::zeroed()
        };
        write_pod(&mut bin, PE_HDR_OFFSET, &pe_hdr);

        let opt_hdr_offset = PE_HDR_OFFSET + size_of::<PeHdr>();
        let opt_hdr = Pe32PlusOptHdr {
            magic: self.opt_hdr_magic,
            entry_point: self.entry_point,
            image_base: self.image_base,
            section_align: SECTION_ALIGN as u32,
            file_align: SECTION_ALIGN as u32,
            image_size: image_size as u32,
            header_size: FIRST_SECTION_RVA,
            subsys: 10, // EFI application
            data_dirs: NUM_DATA_DIRS as u32,
            ..Zeroable::zeroed()
        };
        write_pod(&mut bin, opt_hdr_offset, &opt_hdr);

        for (i, ((name, data), rva)) in self.sections.iter().zip(&rvas).enumerate() {
            let flags = match name.as_str() {
                ".text" => {
                    PeSectionFlags::CNT_CODE
                        | PeSectionFlags::MEM_EXECUTE
                        | PeSectionFlags::MEM_READ
                }
                ".reloc" => {
                    let data_dir_offset =
                        opt_hdr_offset + size_of::<Pe32PlusOptHdr>() + BASE_RELOC_DATA_DIR * 8;
                    write_pod(&mut bin, data_dir_offset, &(*rva as u32));
                    write_pod(&mut bin, data_dir_offset + 4, &(data.len() as u32));
                    PeSectionFlags::CNT_INITIALIZED_DATA
                        | PeSectionFlags::MEM_READ
                        | PeSectionFlags::MEM_DISCARDABLE
                }
                _ => {
                    PeSectionFlags::CNT_INITIALIZED_DATA
                        | PeSectionFlags::MEM_READ
                        | PeSectionFlags::MEM_WRITE
                }
            };

            let mut sec_name = [0u8; 8];
            let name_len = name.len().min(sec_name.len());
            sec_name[..name_len].copy_from_slice(&name.as_bytes()[..name_len]);

            let sec_hdr = PeSectionHdr {
                name: sec_name,
                virtual_size: data.len() as u32,
                virtual_address: *rva as u32,
                raw_data_size: data.len() as u32,
                data_addr: *rva as u32,
                flags: flags.bits(),
                ..Zeroable::zeroed()
            };
            write_pod(
                &mut bin,
                sec_hdrs_offset + i * size_of::<PeSectionHdr>(),
                &sec_hdr,
            );
            bin[*rva..*rva + data.len()].copy_from_slice(data);
        }

        bin
    }
}

fn write_pod<T: Pod>(bin: &mut [u8], offset: usize, value: &T) {
    let bytes = bytemuck::bytes_of(value);
    bin[offset..offset + bytes.len()].copy_from_slice(bytes);
}
