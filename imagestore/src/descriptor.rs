//! Image descriptor strings
//!
//! Every emulated drive is configured with a descriptor naming its backing
//! medium:
//!
//! - `RAW:<begin>:<end>` maps the inclusive sector range of the SD card
//!   directly. Numbers use C syntax: decimal, `0x` hexadecimal or
//!   leading-zero octal.
//! - `ROM:` selects the image programmed into onboard flash. Anything after
//!   the prefix is ignored.
//! - Anything else is a path on the SD card filesystem.
//!
//! Prefixes are matched case-insensitively.

use core::fmt;

use common::SectorRange;

const RAW_PREFIX: &str = "RAW:";
const ROM_PREFIX: &str = "ROM:";

/// Parsed descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descriptor<'a> {
    Raw(SectorRange),
    Rom,
    Path(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorError {
    /// `RAW:` descriptor without two `:`-separated numbers
    InvalidRawFormat,
    /// Sector number does not fit in 32 bits
    SectorOutOfRange,
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorError::InvalidRawFormat => write!(f, "expected RAW:<begin>:<end>"),
            DescriptorError::SectorOutOfRange => write!(f, "sector number out of range"),
        }
    }
}

impl<'a> Descriptor<'a> {
    pub fn parse(descriptor: &'a str) -> Result<Self, DescriptorError> {
        if let Some(rest) = strip_prefix_ignore_case(descriptor, RAW_PREFIX) {
            parse_raw(rest).map(Descriptor::Raw)
        } else if strip_prefix_ignore_case(descriptor, ROM_PREFIX).is_some() {
            Ok(Descriptor::Rom)
        } else {
            Ok(Descriptor::Path(descriptor))
        }
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

fn parse_raw(s: &str) -> Result<SectorRange, DescriptorError> {
    let (begin, rest) = parse_ulong(s).ok_or(DescriptorError::InvalidRawFormat)?;
    let rest = rest
        .strip_prefix(':')
        .ok_or(DescriptorError::InvalidRawFormat)?;
    let (end, rest) = parse_ulong(rest).ok_or(DescriptorError::InvalidRawFormat)?;

    if !rest.is_empty() {
        return Err(DescriptorError::InvalidRawFormat);
    }

    let begin = u32::try_from(begin).map_err(|_| DescriptorError::SectorOutOfRange)?;
    let end = u32::try_from(end).map_err(|_| DescriptorError::SectorOutOfRange)?;
    Ok(SectorRange::new(begin, end))
}

/// Parse an unsigned number the way `strtoul(s, &end, 0)` does
///
/// Skips leading whitespace and an optional `+`, then picks the base from the
/// prefix. Returns the value and the unparsed remainder, or `None` when no
/// digits were found or the value overflows.
pub(crate) fn parse_ulong(s: &str) -> Option<(u64, &str)> {
    let s = s.trim_start_matches(|c: char| c.is_ascii_whitespace());
    let s = s.strip_prefix('+').unwrap_or(s);
    let bytes = s.as_bytes();

    let (radix, start) = match bytes {
        [b'0', b'x' | b'X', d, ..] if d.is_ascii_hexdigit() => (16, 2),
        [b'0', ..] => (8, 0),
        _ => (10, 0),
    };

    let digits = bytes[start..]
        .iter()
        .take_while(|b| (**b as char).is_digit(radix))
        .count();
    if digits == 0 {
        return None;
    }

    let end = start + digits;
    let value = u64::from_str_radix(&s[start..end], radix).ok()?;
    Some((value, &s[end..]))
}
