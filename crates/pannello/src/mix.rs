//! Generation mix classification: colours per source type and the share of
//! zero-emission generation.

use crate::chart::{ColorMap, FALLBACK_COLOR};

/// Source types with no direct CO2 emissions
pub const GREEN_SOURCES: &[&str] = &[
    "Hydro Pumped Storage",
    "Hydro Run-of-river and poundage",
    "Hydro Water Reservoir",
    "Marine",
    "Nuclear",
    "Other renewable",
    "Solar",
    "Wind Offshore",
    "Wind Onshore",
];

/// Greens for zero emission, yellows for moderate, reds for high
pub const GENERATION_COLORS: ColorMap = ColorMap::new(
    &[
        ("Hydro Pumped Storage", "rgba(0, 128, 0, 1)"),
        ("Hydro Run-of-river and poundage", "rgba(34, 139, 34, 1)"),
        ("Hydro Water Reservoir", "rgba(60, 179, 113, 1)"),
        ("Marine", "rgba(46, 139, 87, 1)"),
        ("Nuclear", "rgba(50, 205, 50, 1)"),
        ("Other renewable", "rgba(144, 238, 144, 1)"),
        ("Solar", "rgba(127, 255, 0, 1)"),
        ("Wind Offshore", "rgba(152, 251, 152, 1)"),
        ("Wind Onshore", "rgba(0, 255, 127, 1)"),
        ("Fossil Coal-derived gas", "rgba(255, 255, 153, 1)"),
        ("Fossil Oil", "rgba(255, 223, 0, 1)"),
        ("Fossil Peat", "rgba(255, 239, 0, 1)"),
        ("Waste", "rgba(255, 255, 153, 1)"),
        ("Geothermal", "rgba(255, 250, 205, 1)"),
        ("Other", "rgba(255, 255, 204, 1)"),
        ("Biomass", "rgba(255, 99, 71, 1)"),
        ("Fossil Brown coal/Lignite", "rgba(178, 34, 34, 1)"),
        ("Fossil Gas", "rgba(255, 69, 0, 1)"),
        ("Fossil Hard coal", "rgba(220, 20, 60, 1)"),
        ("Fossil Oil shale", "rgba(255, 99, 132, 1)"),
    ],
    FALLBACK_COLOR,
);

pub fn is_green(source: &str) -> bool {
    GREEN_SOURCES.contains(&source)
}

/// Share of green generation in `mix`, in percent.
///
/// An empty mix or one summing to zero yields 0.
pub fn green_percentage(mix: &[(String, f64)]) -> f64 {
    let (green, total) = mix
        .iter()
        .filter(|(_, value)| value.is_finite())
        .fold((0.0, 0.0), |(green, total), (source, value)| {
            let green = if is_green(source) { green + value } else { green };
            (green, total + value)
        });

    if total == 0.0 {
        0.0
    } else {
        green / total * 100.0
    }
}
