// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use libfuzzer_sys::fuzz_target;
use photocull::analysis::parse::parse_reply;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(result) = parse_reply(text) {
            assert!(result.rating <= 5);
            assert!(result.adjustments.exposure.abs() <= 5.0);
            assert!(result.temperature.abs() <= 100.0);
        }
    }
});
