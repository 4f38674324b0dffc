// SPDX-License-Identifier: MPL-2.0

use super::util::exit_on_error;

pub fn execute_phys_bits_command() {
    let bits = exit_on_error(
        universal_payload::physical_address_bits(),
        "Cannot probe the physical address width",
    );
    println!("{}", bits);
}
