use thiserror::Error;

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LatencyError {
    #[error("empty latency value")]
    Empty,
    #[error("unsupported latency unit {unit:?} in {value:?}")]
    UnsupportedUnit { value: String, unit: String },
    #[error("invalid latency value {0:?}")]
    InvalidNumber(String),
}

/// Converts a load generator latency cell (`"512.3us"`, `"1.2ms"`, `"7"`) to
/// milliseconds.
///
/// Units are matched as substrings, `us` first, then `ms`; a value without
/// either is already in milliseconds. Any other unit is an error.
pub fn parse_latency(latency: &str) -> Result<f64, LatencyError> {
    let latency = latency.trim();
    if latency.is_empty() {
        return Err(LatencyError::Empty);
    }

    if latency.contains("us") {
        Ok(parse_number(latency, &latency.replace("us", ""))? / 1000.0)
    } else if latency.contains("ms") {
        parse_number(latency, &latency.replace("ms", ""))
    } else {
        parse_number(latency, latency)
    }
}

fn parse_number(original: &str, number: &str) -> Result<f64, LatencyError> {
    let number = number.trim();
    match number.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(_) => Err(LatencyError::InvalidNumber(original.to_owned())),
        Err(_) => {
            // "1.2s", "30ns": a number followed by a unit we don't know
            let unit_start = number.find(|c: char| c.is_ascii_alphabetic());
            match unit_start {
                Some(idx) if idx > 0 && number[..idx].trim().parse::<f64>().is_ok() => {
                    Err(LatencyError::UnsupportedUnit {
                        value: original.to_owned(),
                        unit: number[idx..].to_owned(),
                    })
                }
                _ => Err(LatencyError::InvalidNumber(original.to_owned())),
            }
        }
    }
}

pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Human readable size label using binary units, truncated to an integer.
pub fn format_size(bytes: u64) -> String {
    if bytes < KIB {
        format!("{bytes} B")
    } else if bytes < MIB {
        format!("{} KB", bytes / KIB)
    } else if bytes < GIB {
        format!("{} MB", bytes / MIB)
    } else {
        format!("{} GB", bytes / GIB)
    }
}
