// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    seconds = { 5, "5s" },
    just_under_minute = { 59, "59s" },
    one_minute = { 60, "1m" },
    minutes = { 150, "2m" },
    hour_exact = { 3600, "1h" },
    hour_with_minutes = { 3600 + 30 * 60, "1h30m" },
    days = { 3 * 86400, "3d" },
)]
fn formats_elapsed(secs: u64, expected: &str) {
    assert_eq!(format_elapsed(secs), expected);
}

#[test]
fn formats_elapsed_ms() {
    assert_eq!(format_elapsed_ms(90_000), "1m");
}
