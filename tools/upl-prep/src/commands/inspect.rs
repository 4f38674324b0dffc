// SPDX-License-Identifier: MPL-2.0

use universal_payload::PlacementInfo;

use super::util::{exit_on_error, print_json, read_input};
use crate::cli::InspectArgs;

pub fn execute_inspect_command(args: &InspectArgs) {
    let blob = read_input(&args.fit);
    let info = exit_on_error(
        PlacementInfo::from_fit(&blob),
        "Cannot extract the payload placement",
    );
    print_json(&info);
}
