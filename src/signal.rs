//! Signal strength helpers
//!
//! RSSI is reported in dBm. Survey readings conventionally fall between
//! `RSSI_FLOOR` (barely detectable) and `RSSI_CEILING`.

pub const RSSI_FLOOR: i32 = -100;
pub const RSSI_CEILING: i32 = 0;

/// Whether a reading lies in the conventional `[-100, 0]` dBm range
pub fn is_conventional_rssi(rssi: i32) -> bool {
    (RSSI_FLOOR..=RSSI_CEILING).contains(&rssi)
}

/// Get a human-readable signal quality label
pub fn signal_quality(rssi: i32) -> &'static str {
    match rssi {
        r if r >= -50 => "excellent",
        r if r >= -60 => "good",
        r if r >= -70 => "fair",
        r if r >= -80 => "weak",
        _ => "poor",
    }
}

/// Shade character for text heat maps, densest for the strongest signal
pub fn shade(rssi: i32) -> char {
    match rssi {
        r if r >= -50 => '@',
        r if r >= -60 => '#',
        r if r >= -70 => '+',
        r if r >= -80 => '-',
        _ => '.',
    }
}

/// Quality bands for legends, strongest first
pub const BANDS: [(i32, &str); 5] = [
    (-50, ">= -50 dBm"),
    (-60, "-51 to -60 dBm"),
    (-70, "-61 to -70 dBm"),
    (-80, "-71 to -80 dBm"),
    (RSSI_FLOOR, "< -80 dBm"),
];
