// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};
use universal_payload::Arch;

/// The manifest from configuration file `UplPrep.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlManifest {
    #[serde(default)]
    pub payload: PayloadSettings,
}

/// Where and for which architecture the payload is prepared.
///
/// Every field may be left out of the manifest and given on the command line
/// instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PayloadSettings {
    pub arch: Option<Arch>,
    pub load_address: Option<u64>,
    pub hob_address: Option<u64>,
}

impl PayloadSettings {
    /// Overrides the settings with those given in `other`.
    pub fn apply(&mut self, other: &PayloadSettings) {
        if other.arch.is_some() {
            self.arch = other.arch;
        }
        if other.load_address.is_some() {
            self.load_address = other.load_address;
        }
        if other.hob_address.is_some() {
            self.hob_address = other.hob_address;
        }
    }
}
