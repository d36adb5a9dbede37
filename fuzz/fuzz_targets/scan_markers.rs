// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use libfuzzer_sys::fuzz_target;
use photocull::extract::jpeg::find_embedded_jpegs;
use photocull::extract::Extractor;

fuzz_target!(|data: &[u8]| {
    for range in find_embedded_jpegs(data) {
        assert!(range.end <= data.len());
        assert!(range.start < range.end);
    }
    let _ = Extractor::new().extract_bytes("fuzz", data);
});
