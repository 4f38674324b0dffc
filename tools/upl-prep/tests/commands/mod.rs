// SPDX-License-Identifier: MPL-2.0

mod inspect;
mod phys_bits;
mod prepare;
mod relocate;
mod trampoline;
