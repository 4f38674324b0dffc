// SPDX-License-Identifier: MPL-2.0

//! Placement metadata of the payload in a Flattened Image Tree.
//!
//! The device tree blob resides at the start of the FIT binary. The part of
//! it we care about looks like:
//!
//! ```text
//! / {
//!     images {
//!         tianocore {
//!             data-offset = <0x00001000>;
//!             data-size = <0x00010000>;
//!             entry-start = <0x00000000 0x00805ac3>;
//!             load = <0x00000000 0x00800000>;
//!         };
//!     };
//! };
//! ```

use std::{fs, io::Read, path::Path};

use fdt::{
    node::{FdtNode, NodeProperty},
    Fdt,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, FitNode, FitProperty, PropertyDecodeError, Result};

/// Where the payload image lives in the FIT blob and where it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlacementInfo {
    /// The base address the image is loaded at.
    pub load: u64,
    /// The absolute entry address, within the loaded image.
    pub entry_start: u64,
    /// The offset of the image in the FIT blob.
    pub data_offset: u32,
    /// The length of the image in the FIT blob.
    pub data_size: u32,
}

impl PlacementInfo {
    /// Reads the FIT file at `path` and extracts the placement metadata.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let blob = fs::read(path).map_err(|err| {
            Error::BlobReadFailure(format!("fdt file: {}, err: {}", path.display(), err))
        })?;
        Self::from_fit(&blob)
    }

    /// Reads a FIT blob to its end from `reader` and extracts the placement
    /// metadata.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut blob = Vec::new();
        reader
            .read_to_end(&mut blob)
            .map_err(|err| Error::BlobReadFailure(err.to_string()))?;
        Self::from_fit(&blob)
    }

    /// Extracts the placement metadata from an in-memory FIT blob.
    pub fn from_fit(blob: &[u8]) -> Result<Self> {
        let fdt = Fdt::new(blob).map_err(|err| Error::BlobReadFailure(format!("{:?}", err)))?;

        let images = fdt
            .find_node("/images")
            .ok_or(Error::NodeNotFound(FitNode::Images))?;
        let tianocore = images
            .children()
            .find(|node| node.name == FitNode::Tianocore.name())
            .ok_or(Error::NodeNotFound(FitNode::Tianocore))?;

        let info = Self {
            load: read_u64(&tianocore, FitProperty::Load)?,
            entry_start: read_u64(&tianocore, FitProperty::EntryStart)?,
            data_offset: read_u32(&tianocore, FitProperty::DataOffset)?,
            data_size: read_u32(&tianocore, FitProperty::DataSize)?,
        };
        log::info!(
            "UPL placement: load={:#x}, entry={:#x}, data={:#x}+{:#x}",
            info.load,
            info.entry_start,
            info.data_offset,
            info.data_size
        );
        Ok(info)
    }

    /// The offset of the entry point from the image base.
    pub fn entry_offset(&self) -> u64 {
        self.entry_start.wrapping_sub(self.load)
    }
}

fn lookup<'a>(node: &FdtNode<'_, 'a>, prop: FitProperty) -> Result<NodeProperty<'a>> {
    node.property(prop.name()).ok_or(Error::PropertyNotFound(prop))
}

fn read_u64(node: &FdtNode<'_, '_>, prop: FitProperty) -> Result<u64> {
    let value = lookup(node, prop)?.value;
    let cell = value
        .try_into()
        .map_err(|_| decode_error(prop, value.len()))?;
    Ok(u64::from_be_bytes(cell))
}

fn read_u32(node: &FdtNode<'_, '_>, prop: FitProperty) -> Result<u32> {
    let value = lookup(node, prop)?.value;
    let cell = value
        .try_into()
        .map_err(|_| decode_error(prop, value.len()))?;
    Ok(u32::from_be_bytes(cell))
}

fn decode_error(prop: FitProperty, actual: usize) -> Error {
    Error::PropertyConversion(
        prop,
        PropertyDecodeError {
            expected: prop.cell_width(),
            actual,
        },
    )
}
