//! Canonical reporting taxonomy.
//!
//! Upstream feeds report arbitrary program and material codes.  Every rendered
//! report must display the same closed set of categories so legends stay
//! consistent across members and periods, which means normalization has to
//! guarantee completeness (zero rows for absent categories) and must never
//! silently drop a code it does not recognize.

use serde::{Deserialize, Serialize};

/// Canonical program channels in their fixed display order: the primary
/// in-person channel, the mail channel, then the obsolete inventory channel.
pub const PROGRAM_CHANNELS: [&str; 3] = ["In-Store Drop-Off", "Mail-In", "Obsolete Inventory"];

/// Canonical material categories.  Display order is weight-descending, so the
/// order here only fixes the zero-row baseline and legend color assignment.
pub const MATERIALS: [&str; 9] = [
    "PET", "HDPE", "LDPE", "PP", "PS", "Glass", "Metal", "Textile", "Other",
];

/// One raw breakdown row as reported upstream.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawCategoryRow {
    /// Upstream category code, arbitrary casing and punctuation.
    pub code: String,
    /// Collected weight attributed to the code.
    pub weight: f64,
}

/// One normalized breakdown row keyed by canonical category label.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryWeight {
    /// Canonical label, or the verbatim upstream code when unmapped.
    pub category: String,
    /// Collected weight for the category, unrounded.
    pub weight: f64,
}

fn fold_code(code: &str) -> String {
    code.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn canonical_program(code: &str) -> Option<&'static str> {
    match fold_code(code).as_str() {
        "INSTORE" | "DROPOFF" | "INSTOREDROPOFF" | "STORE" | "RETAIL" => Some(PROGRAM_CHANNELS[0]),
        "MAIL" | "MAILIN" | "MAILBACK" => Some(PROGRAM_CHANNELS[1]),
        "OBSOLETE" | "OBSOLETEINVENTORY" | "LEGACY" | "INVENTORY" => Some(PROGRAM_CHANNELS[2]),
        _ => None,
    }
}

fn canonical_material(code: &str) -> Option<&'static str> {
    match fold_code(code).as_str() {
        "PET" | "PETE" | "PET1" => Some("PET"),
        "HDPE" | "HDPE2" => Some("HDPE"),
        "LDPE" | "LDPE4" => Some("LDPE"),
        "PP" | "PP5" => Some("PP"),
        "PS" | "PS6" => Some("PS"),
        "GLASS" => Some("Glass"),
        "METAL" | "ALUMINUM" | "ALUMINIUM" | "STEEL" | "TIN" => Some("Metal"),
        "TEXTILE" | "TEXTILES" | "FABRIC" => Some("Textile"),
        "OTHER" | "MIXED" | "MISC" => Some("Other"),
        _ => None,
    }
}

fn normalize(
    rows: &[RawCategoryRow],
    canonical: &[&'static str],
    map: fn(&str) -> Option<&'static str>,
) -> Vec<CategoryWeight> {
    let mut out: Vec<CategoryWeight> = canonical
        .iter()
        .map(|category| CategoryWeight {
            category: (*category).to_owned(),
            weight: 0.0,
        })
        .collect();

    for row in rows {
        let label = map(&row.code);
        match label {
            Some(label) => {
                if let Some(entry) = out.iter_mut().find(|entry| entry.category == label) {
                    entry.weight += row.weight;
                }
            }
            // Unknown codes pass through verbatim so operators can spot
            // unmapped upstream categories.
            None => match out
                .iter_mut()
                .find(|entry| entry.category == row.code)
            {
                Some(entry) => entry.weight += row.weight,
                None => out.push(CategoryWeight {
                    category: row.code.clone(),
                    weight: row.weight,
                }),
            },
        }
    }

    out
}

/// Normalizes program-channel rows.
///
/// Output keeps the fixed display order of [`PROGRAM_CHANNELS`], with unknown
/// codes appended in first-seen order.  Every canonical channel is present
/// even when the raw feed is empty.
pub fn normalize_programs(rows: &[RawCategoryRow]) -> Vec<CategoryWeight> {
    normalize(rows, &PROGRAM_CHANNELS, canonical_program)
}

/// Normalizes material rows.
///
/// Output contains every canonical material plus verbatim unknown codes,
/// sorted descending by weight (stable, so the canonical baseline order
/// breaks ties).
pub fn normalize_materials(rows: &[RawCategoryRow]) -> Vec<CategoryWeight> {
    let mut out = normalize(rows, &MATERIALS, canonical_material);
    out.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    out
}

/// Sum of the weights in a normalized breakdown.
pub fn total_weight(rows: &[CategoryWeight]) -> f64 {
    rows.iter().map(|row| row.weight).sum()
}

/// Rounds a weight to two decimal places for display.
///
/// Rounding happens at display time only; aggregation works on raw values so
/// rounding error does not compound across steps.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Share of `value` in `total` as a whole percentage.
///
/// A non-positive total yields `0`, never `NaN` and never a panic.
pub fn percentage(value: f64, total: f64) -> u32 {
    if total > 0.0 {
        (value / total * 100.0).round() as u32
    } else {
        0
    }
}

/// Share of `value` in `total` rounded to one decimal place, for legends.
pub fn percentage_precise(value: f64, total: f64) -> f64 {
    if total > 0.0 {
        (value / total * 1000.0).round() / 10.0
    } else {
        0.0
    }
}
