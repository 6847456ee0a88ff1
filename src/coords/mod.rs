//! Right ascension / declination text validation.
//!
//! Two grammars are accepted for either axis: plain decimal degrees
//! (`83.82`, `-5.39`) and sexagesimal `H:MM:SS[.fff]` with an optional sign.
//! Sexagesimal RA is read as hours, sexagesimal Dec as degrees.
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref DECIMAL: Regex = Regex::new(r"^[+-]?\d+(\.\d+)?$").unwrap();
    static ref SEXAGESIMAL: Regex =
        Regex::new(r"^([+-]?)(\d{1,2}):(\d{2}):(\d{2}(?:\.\d+)?)$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Ra,
    Dec,
}

impl Axis {
    pub fn label(&self) -> &'static str {
        match self {
            Axis::Ra => "R.A.",
            Axis::Dec => "Dec.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Parsed {
    Decimal(f64),
    Sexagesimal {
        negative: bool,
        whole: u32,
        minutes: u32,
        seconds: f64,
    },
}

fn parse(text: &str) -> Option<Parsed> {
    let text = text.trim();
    if DECIMAL.is_match(text) {
        return text.parse::<f64>().ok().map(Parsed::Decimal);
    }
    let caps = SEXAGESIMAL.captures(text)?;
    Some(Parsed::Sexagesimal {
        negative: &caps[1] == "-",
        whole: caps[2].parse().ok()?,
        minutes: caps[3].parse().ok()?,
        seconds: caps[4].parse().ok()?,
    })
}

/// Convert a coordinate to decimal degrees, `None` when it is not valid for the axis
pub fn to_degrees(axis: Axis, text: &str) -> Option<f64> {
    match (axis, parse(text)?) {
        (Axis::Ra, Parsed::Decimal(deg)) => (0.0..=360.0).contains(&deg).then_some(deg),
        (Axis::Dec, Parsed::Decimal(deg)) => (-90.0..=90.0).contains(&deg).then_some(deg),
        (
            axis,
            Parsed::Sexagesimal {
                negative,
                whole,
                minutes,
                seconds,
            },
        ) => {
            if minutes >= 60 || seconds >= 60.0 {
                return None;
            }
            let magnitude = whole as f64 + minutes as f64 / 60.0 + seconds / 3600.0;
            match axis {
                Axis::Ra => (!negative && whole <= 23).then_some(magnitude * 15.0),
                Axis::Dec => {
                    if whole > 90 || magnitude > 90.0 {
                        return None;
                    }
                    Some(if negative { -magnitude } else { magnitude })
                }
            }
        }
    }
}

pub fn is_valid(axis: Axis, text: &str) -> bool {
    to_degrees(axis, text).is_some()
}

/// Both coordinates must pass before a visibility query may be issued
pub fn is_valid_pair(ra: &str, dec: &str) -> bool {
    is_valid(Axis::Ra, ra) && is_valid(Axis::Dec, dec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_ra_range() {
        for tenths in -100..=3700 {
            let value = tenths as f64 / 10.0;
            let text = format!("{:.1}", value);
            assert_eq!(
                is_valid(Axis::Ra, &text),
                (0.0..=360.0).contains(&value),
                "ra {}",
                text
            );
        }
    }

    #[test]
    fn test_decimal_dec_range() {
        for tenths in -1000..=1000 {
            let value = tenths as f64 / 10.0;
            let text = format!("{:.1}", value);
            assert_eq!(
                is_valid(Axis::Dec, &text),
                (-90.0..=90.0).contains(&value),
                "dec {}",
                text
            );
        }
    }

    #[test]
    fn test_sexagesimal_ra() {
        assert!(is_valid(Axis::Ra, "05:35:17"));
        assert!(is_valid(Axis::Ra, "23:59:59.99"));
        assert!(is_valid(Axis::Ra, "+00:00:00"));
        assert!(!is_valid(Axis::Ra, "24:00:00"));
        assert!(!is_valid(Axis::Ra, "-05:35:17"));
        assert!(!is_valid(Axis::Ra, "05:60:00"));
        assert!(!is_valid(Axis::Ra, "05:35:60"));
    }

    #[test]
    fn test_sexagesimal_dec_uses_degree_range() {
        assert!(is_valid(Axis::Dec, "-05:23:28"));
        assert!(is_valid(Axis::Dec, "+45:00:00"));
        assert!(is_valid(Axis::Dec, "-89:59:59.9"));
        assert!(is_valid(Axis::Dec, "90:00:00"));
        assert!(!is_valid(Axis::Dec, "90:00:01"));
        assert!(!is_valid(Axis::Dec, "-91:00:00"));
    }

    #[test]
    fn test_rejects_other_grammars() {
        for text in ["", "abc", "5h35m17s", "05 35 17", "1e3", "05:35", "05:35:17:00", "--5", "5.", ".5"] {
            assert!(!is_valid(Axis::Ra, text), "ra {:?}", text);
            assert!(!is_valid(Axis::Dec, text), "dec {:?}", text);
        }
        assert!(!is_valid_pair("05:35:17", "north"));
    }

    #[test]
    fn test_to_degrees() {
        let ra = to_degrees(Axis::Ra, "05:35:17").unwrap();
        assert!((ra - 83.820833).abs() < 1e-5);
        let dec = to_degrees(Axis::Dec, "-05:23:28").unwrap();
        assert!((dec + 5.391111).abs() < 1e-5);
        assert_eq!(to_degrees(Axis::Ra, " 120.5 "), Some(120.5));
    }
}
