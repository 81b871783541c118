use super::codec::Stage;
use phf::{Map, phf_map};

const DELTA_RLE: &[Stage] = &[Stage::Delta, Stage::RunLength, Stage::IntegerPacking];
const FIXED_POINT_2: &[Stage] = &[
    Stage::FixedPoint { factor: 100.0 },
    Stage::Delta,
    Stage::IntegerPacking,
];
const FIXED_POINT_3: &[Stage] = &[
    Stage::FixedPoint { factor: 1000.0 },
    Stage::Delta,
    Stage::IntegerPacking,
];
const PACK: &[Stage] = &[Stage::IntegerPacking];
const RLE: &[Stage] = &[Stage::RunLength, Stage::IntegerPacking];

/// Named stage chains. `delta-rle` suits monotonic or repetitive integer
/// columns such as ids; the fixed-point presets suit coordinates and B-factors.
pub static PRESETS: Map<&'static str, &'static [Stage]> = phf_map! {
    "delta-rle" => DELTA_RLE,
    "fixed-point-2" => FIXED_POINT_2,
    "fixed-point-3" => FIXED_POINT_3,
    "pack" => PACK,
    "rle" => RLE,
};

pub fn preset(name: &str) -> Option<&'static [Stage]> {
    PRESETS.get(name).copied()
}

pub fn preset_names() -> impl Iterator<Item = &'static str> {
    PRESETS.keys().copied()
}
