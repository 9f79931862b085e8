use std::ops::RangeInclusive;
use std::str::FromStr;

/// A comma-separated list of serial numbers and inclusive ranges,
/// e.g. `0-1,5,7-9`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialRanges(Vec<RangeInclusive<u64>>);

impl SerialRanges {
    /// Every serial number in list order. Overlaps are yielded again.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.iter().flat_map(|range| range.clone())
    }
}

fn parse_serial(s: &str) -> Result<u64, String> {
    s.trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid serial number '{}': {}", s.trim(), e))
}

impl FromStr for SerialRanges {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ranges = Vec::new();

        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(format!("empty entry in serial list '{}'", s));
            }

            let range = match part.split_once('-') {
                Some((start, end)) => {
                    let start = parse_serial(start)?;
                    let end = parse_serial(end)?;
                    if start > end {
                        return Err(format!("descending range '{}'", part));
                    }
                    start..=end
                }
                None => {
                    let sn = parse_serial(part)?;
                    sn..=sn
                }
            };
            ranges.push(range);
        }

        Ok(Self(ranges))
    }
}
