/*! Human-readable byte sizes

Units are decimal: `b` = 1, `k` = 10^3, `m` = 10^6, `g` = 10^9, `t` = 10^12. Both the compact form
(`100m`, `1.5g`) and the spaced form `diskutil` prints (`100 MB`, `512 Bytes`) are accepted, in
any case.
*/
use crate::parse::FormatError;

const UNITS: [(char, u64); 5] = [
    ('b', 1),
    ('k', 1_000),
    ('m', 1_000_000),
    ('g', 1_000_000_000),
    ('t', 1_000_000_000_000),
];

/// Size of a sector as `hdiutil -sectors` counts them
pub const SECTOR_SIZE: u64 = 512;

pub fn to_bytes(input: &str) -> Result<u64, FormatError> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .ok_or_else(|| FormatError::Size(input.to_string()))?;
    let (number, unit) = trimmed.split_at(split);
    let unit = unit.trim_start();

    if number.is_empty() || unit.is_empty() {
        return Err(FormatError::Size(input.to_string()));
    }
    let number: f64 = number
        .parse()
        .map_err(|_| FormatError::Size(input.to_string()))?;
    let factor = unit_factor(unit).ok_or_else(|| FormatError::Unit {
        input: input.to_string(),
        unit: unit.to_string(),
    })?;

    let bytes = (number * factor as f64).round();
    if !bytes.is_finite() || bytes > u64::MAX as f64 {
        return Err(FormatError::Size(input.to_string()));
    }
    Ok(bytes as u64)
}

fn unit_factor(unit: &str) -> Option<u64> {
    let unit = unit.to_ascii_lowercase();
    if unit == "byte" || unit == "bytes" {
        return Some(1);
    }

    let mut chars = unit.chars();
    let letter = chars.next()?;
    match chars.as_str() {
        "" | "b" => UNITS
            .iter()
            .find(|(candidate, _)| *candidate == letter)
            .map(|(_, factor)| *factor),
        _ => None,
    }
}

/// Render `bytes` with one decimal in the largest unit that keeps the number under 1000
pub fn to_human_readable(bytes: u64) -> String {
    let mut value = bytes as f64;
    for (index, (unit, _)) in UNITS.iter().enumerate() {
        if value < 1000.0 || index == UNITS.len() - 1 {
            return format!("{value:.1}{unit}");
        }
        value /= 1000.0;
    }
    unreachable!("the last unit always returns")
}

/// Parse `diskutil`'s `Total Size` value, preferring the exact byte count when it is printed
///
/// `104.9 MB (104857600 Bytes) (exactly 204800 512-Byte-Units)` yields `104857600`.
pub fn from_total_size(total_size: &str) -> Result<u64, FormatError> {
    let exact = total_size
        .split('(')
        .skip(1)
        .filter_map(|group| group.split(')').next())
        .find_map(|group| group.trim().strip_suffix("Bytes"))
        .and_then(|count| count.trim().parse().ok());
    if let Some(exact) = exact {
        return Ok(exact);
    }

    let leading = total_size
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ");
    to_bytes(&leading)
}

/// Number of whole sectors needed to hold `bytes`
pub fn to_sectors(bytes: u64) -> u64 {
    bytes.div_ceil(SECTOR_SIZE)
}
