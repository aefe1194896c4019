//! GS1 Digital Link parsing.
//!
//! Extracts the GTIN and common item attributes from a GS1 Digital Link
//! URI such as `https://id.gs1.org/01/09506000134352/21/SN-42?17=261231`.
//!
//! Recognized application identifiers:
//!
//! | AI | Meaning | Location |
//! |----|---------|----------|
//! | `01` | GTIN | path (required) |
//! | `21` | serial number | path or query |
//! | `10` | batch/lot | path or query |
//! | `17` | expiry date (`YYMMDD`) | path or query |
//!
//! Other identifiers are ignored.

use std::fmt;
use std::str::FromStr;

use chrono::{Months, NaiveDate};
use thiserror::Error;

const AI_GTIN: &str = "01";
const AI_BATCH: &str = "10";
const AI_EXPIRY: &str = "17";
const AI_SERIAL: &str = "21";

/// Errors raised by [`DigitalLink::parse`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DigitalLinkError {
    /// The input is empty.
    #[error("Digital Link cannot be empty.")]
    Empty,

    /// No `/01/{gtin}` path segment was found.
    #[error("Digital Link '{input}' does not contain a GTIN (AI 01) path segment.")]
    MissingGtin {
        /// The rejected input.
        input: String,
    },

    /// An application identifier in the path has no value.
    #[error("Application identifier '{ai}' has no value.")]
    MissingValue {
        /// The identifier.
        ai: String,
    },

    /// The GTIN is not 8, 12, 13 or 14 digits.
    #[error("Invalid GTIN '{value}'. Expected 8, 12, 13 or 14 digits.")]
    InvalidGtin {
        /// The rejected value.
        value: String,
    },

    /// The GTIN check digit does not match.
    #[error("GTIN '{gtin}' has an invalid check digit (expected {expected}).")]
    InvalidCheckDigit {
        /// The normalized 14-digit GTIN.
        gtin: String,
        /// The correct check digit.
        expected: u32,
    },

    /// The expiry date is not a valid `YYMMDD` date.
    #[error("Invalid expiry date '{value}'. Expected YYMMDD.")]
    InvalidExpiry {
        /// The rejected value.
        value: String,
    },

    /// A value is not valid percent-encoded UTF-8.
    #[error("Value '{value}' is not valid percent-encoded UTF-8.")]
    InvalidEncoding {
        /// The rejected value.
        value: String,
    },
}

/// The identifiers carried by a GS1 Digital Link.
///
/// # Example
///
/// ```rust
/// use tracechain::gs1::DigitalLink;
///
/// let link = DigitalLink::parse(
///     "https://id.gs1.org/01/9506000134352/21/SN-42?10=LOT7&17=261231",
/// )
/// .unwrap();
///
/// assert_eq!(link.gtin, "09506000134352");
/// assert_eq!(link.serial.as_deref(), Some("SN-42"));
/// assert_eq!(link.batch.as_deref(), Some("LOT7"));
/// assert_eq!(link.product_ref().as_deref(), Some("09506000134352:SN-42"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DigitalLink {
    /// GTIN normalized to 14 digits.
    pub gtin: String,
    /// Serial number (AI 21).
    pub serial: Option<String>,
    /// Batch or lot (AI 10).
    pub batch: Option<String>,
    /// Expiry date (AI 17).
    pub expiry: Option<NaiveDate>,
}

impl DigitalLink {
    /// Parses a Digital Link URI or bare path.
    ///
    /// # Errors
    ///
    /// Returns [`DigitalLinkError`] if no valid GTIN is present or a
    /// recognized attribute is malformed.
    pub fn parse(input: &str) -> Result<Self, DigitalLinkError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(DigitalLinkError::Empty);
        }

        let without_scheme = input.split_once("://").map_or(input, |(_, rest)| rest);
        let after_host = if without_scheme.len() == input.len() {
            without_scheme
        } else {
            without_scheme
                .find('/')
                .map_or("", |idx| &without_scheme[idx..])
        };
        let after_host = after_host.split('#').next().unwrap_or_default();
        let (path, query) = after_host.split_once('?').unwrap_or((after_host, ""));

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let start = segments
            .iter()
            .position(|s| *s == AI_GTIN)
            .ok_or_else(|| DigitalLinkError::MissingGtin {
                input: input.to_string(),
            })?;

        let mut gtin = None;
        let mut serial = None;
        let mut batch = None;
        let mut expiry = None;

        for pair in segments[start..].chunks(2) {
            let ai = pair[0];
            let value = pair.get(1).ok_or_else(|| DigitalLinkError::MissingValue {
                ai: ai.to_string(),
            })?;
            let value = decode(value)?;
            match ai {
                AI_GTIN => gtin = Some(value),
                AI_SERIAL => serial = Some(value),
                AI_BATCH => batch = Some(value),
                AI_EXPIRY => expiry = Some(value),
                _ => {}
            }
        }

        for (key, value) in query
            .split('&')
            .filter_map(|param| param.split_once('='))
        {
            let slot = match key {
                AI_SERIAL => &mut serial,
                AI_BATCH => &mut batch,
                AI_EXPIRY => &mut expiry,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(decode(value)?);
            }
        }

        let gtin = gtin.ok_or_else(|| DigitalLinkError::MissingGtin {
            input: input.to_string(),
        })?;

        Ok(Self {
            gtin: normalize_gtin(&gtin)?,
            serial: serial.filter(|s| !s.is_empty()),
            batch: batch.filter(|b| !b.is_empty()),
            expiry: expiry.as_deref().map(parse_expiry).transpose()?,
        })
    }

    /// Returns the `gtin:serial` reference used to list a product's events.
    ///
    /// `None` when the link carries no serial number.
    #[must_use]
    pub fn product_ref(&self) -> Option<String> {
        self.serial
            .as_ref()
            .map(|serial| format!("{}:{serial}", self.gtin))
    }
}

impl FromStr for DigitalLink {
    type Err = DigitalLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DigitalLink {
    /// Formats as a canonical path: `/01/{gtin}[/10/{batch}][/21/{serial}][?17={expiry}]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{AI_GTIN}/{}", self.gtin)?;
        if let Some(batch) = &self.batch {
            write!(f, "/{AI_BATCH}/{}", urlencoding::encode(batch))?;
        }
        if let Some(serial) = &self.serial {
            write!(f, "/{AI_SERIAL}/{}", urlencoding::encode(serial))?;
        }
        if let Some(expiry) = &self.expiry {
            write!(f, "?{AI_EXPIRY}={}", expiry.format("%y%m%d"))?;
        }
        Ok(())
    }
}

fn decode(value: &str) -> Result<String, DigitalLinkError> {
    urlencoding::decode(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|_| DigitalLinkError::InvalidEncoding {
            value: value.to_string(),
        })
}

/// Left-pads a GTIN-8/12/13 to 14 digits and verifies the check digit.
fn normalize_gtin(raw: &str) -> Result<String, DigitalLinkError> {
    if !matches!(raw.len(), 8 | 12 | 13 | 14) || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DigitalLinkError::InvalidGtin {
            value: raw.to_string(),
        });
    }

    let gtin = format!("{raw:0>14}");
    let digits: Vec<u32> = gtin.chars().filter_map(|c| c.to_digit(10)).collect();
    let (body, check) = digits.split_at(13);

    // Weights alternate 3,1,3,... starting from the digit next to the check digit.
    let sum: u32 = body
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d * 3 } else { *d })
        .sum();
    let expected = (10 - sum % 10) % 10;

    if check.first() != Some(&expected) {
        return Err(DigitalLinkError::InvalidCheckDigit { gtin, expected });
    }
    Ok(gtin)
}

/// Parses `YYMMDD`; a day of `00` means the last day of the month.
fn parse_expiry(value: &str) -> Result<NaiveDate, DigitalLinkError> {
    let invalid = || DigitalLinkError::InvalidExpiry {
        value: value.to_string(),
    };
    if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let field =
        |range: std::ops::Range<usize>| value[range].parse::<u32>().map_err(|_| invalid());
    let year = 2000 + i32::try_from(field(0..2)?).map_err(|_| invalid())?;
    let month = field(2..4)?;
    let day = field(4..6)?;

    if day == 0 {
        return NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|first| first.checked_add_months(Months::new(1)))
            .and_then(|next| next.pred_opt())
            .ok_or_else(invalid);
    }

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}
