use chrono::{DateTime, Utc};
use sgp4::{Constants, Elements};
use thiserror::Error;

use crate::catalog::CatalogEntry;
use crate::spacetrack::{ElementSource, ProviderError};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("element set for {norad_id} is empty or malformed: {message}")]
    EmptyOrMalformed { norad_id: u32, message: String },
    #[error("element fetch failed: {0}")]
    Network(#[from] ProviderError),
}

/// Latest element set of one catalog object, ready for propagation.
pub struct OrbitalElements {
    pub name: String,
    pub norad_id: u32,
    pub elements: Elements,
    pub constants: Constants,
}

impl OrbitalElements {
    pub fn epoch(&self) -> DateTime<Utc> {
        self.elements.datetime.and_utc()
    }
}

impl std::fmt::Debug for OrbitalElements {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrbitalElements")
            .field("name", &self.name)
            .field("norad_id", &self.norad_id)
            .field("epoch", &self.epoch())
            .finish()
    }
}

/// Request the most recent element set for `entry` and parse it.
pub fn fetch_elements<S: ElementSource + ?Sized>(
    source: &S,
    entry: &CatalogEntry,
) -> Result<OrbitalElements, FetchError> {
    let payload = source.fetch_latest_elements(entry.norad_id)?;
    log::debug!("element set for {}:\n{}", entry.norad_id, payload);

    let elements = parse_element_set(&payload, entry.norad_id, &entry.name)?;
    log::info!(
        "Loaded elements for {} ({}), epoch {}",
        elements.name,
        elements.norad_id,
        elements.epoch()
    );
    Ok(elements)
}

/// Parse one 3LE (or bare 2LE) record for `norad_id`.
///
/// Exactly one record is accepted: a name line followed by lines `1` and `2`,
/// or lines `1` and `2` alone, in which case `fallback_name` is used.
pub fn parse_element_set(
    payload: &str,
    norad_id: u32,
    fallback_name: &str,
) -> Result<OrbitalElements, FetchError> {
    let malformed = |message: String| FetchError::EmptyOrMalformed { norad_id, message };

    let lines: Vec<&str> = payload
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let (name, line1, line2) = match lines.as_slice() {
        [] => return Err(malformed("empty payload".into())),
        [line1, line2] => (fallback_name.to_string(), *line1, *line2),
        [name, line1, line2] => (strip_name_prefix(name).to_string(), *line1, *line2),
        other => {
            return Err(malformed(format!(
                "expected 2 or 3 lines, got {}",
                other.len()
            )))
        }
    };

    if !line1.starts_with("1 ") || !line2.starts_with("2 ") {
        return Err(malformed("data lines must start with '1 ' and '2 '".into()));
    }
    if name.is_empty() {
        return Err(malformed("empty name line".into()));
    }
    for line in [line1, line2] {
        verify_checksum(line).map_err(malformed)?;
    }

    let elements = Elements::from_tle(Some(name.clone()), line1.as_bytes(), line2.as_bytes())
        .map_err(|e| malformed(e.to_string()))?;

    if elements.norad_id != u64::from(norad_id) {
        return Err(malformed(format!(
            "element set is for {}, not {}",
            elements.norad_id, norad_id
        )));
    }

    let constants = Constants::from_elements(&elements).map_err(|e| malformed(e.to_string()))?;

    Ok(OrbitalElements {
        name,
        norad_id,
        elements,
        constants,
    })
}

/// Modulo-10 checksum in column 69: digits count their value, '-' counts 1.
fn verify_checksum(line: &str) -> Result<(), String> {
    let bytes = line.as_bytes();
    if bytes.len() != 69 {
        return Err(format!("line '{}' has {} columns, expected 69", &line[..1], bytes.len()));
    }
    let sum: u32 = bytes[..68]
        .iter()
        .map(|b| match b {
            b'0'..=b'9' => u32::from(b - b'0'),
            b'-' => 1,
            _ => 0,
        })
        .sum();
    let expected = (bytes[68] as char)
        .to_digit(10)
        .ok_or_else(|| format!("line '{}' has no checksum digit", &line[..1]))?;
    if sum % 10 != expected {
        return Err(format!(
            "line '{}' checksum {} does not match {}",
            &line[..1],
            sum % 10,
            expected
        ));
    }
    Ok(())
}

fn strip_name_prefix(line: &str) -> &str {
    line.strip_prefix("0 ").unwrap_or(line).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const LINE1: &str = "1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992";
    const LINE2: &str = "2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008";

    struct FixedPayload {
        payload: Result<String, ()>,
        calls: Cell<u32>,
    }

    impl ElementSource for FixedPayload {
        fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, ProviderError> {
            Ok(Vec::new())
        }

        fn fetch_latest_elements(&self, _norad_id: u32) -> Result<String, ProviderError> {
            self.calls.set(self.calls.get() + 1);
            self.payload
                .clone()
                .map_err(|_| ProviderError::Status(503))
        }
    }

    fn iss_entry() -> CatalogEntry {
        CatalogEntry::new("ISS (ZARYA)", 25544)
    }

    #[test]
    fn test_parses_three_line_record() {
        let payload = format!("0 ISS (ZARYA)\n{}\n{}\n", LINE1, LINE2);
        let elements = parse_element_set(&payload, 25544, "ignored").unwrap();
        assert_eq!(elements.name, "ISS (ZARYA)");
        assert_eq!(elements.norad_id, 25544);
        assert_eq!(elements.epoch().format("%Y-%m-%d").to_string(), "2020-07-12");
    }

    #[test]
    fn test_two_line_record_uses_catalog_name() {
        let payload = format!("{}\r\n{}\r\n", LINE1, LINE2);
        let elements = parse_element_set(&payload, 25544, "ISS (ZARYA)").unwrap();
        assert_eq!(elements.name, "ISS (ZARYA)");
    }

    #[test]
    fn test_empty_payload_is_malformed() {
        let err = parse_element_set("\n \n", 25544, "ISS").unwrap_err();
        assert!(matches!(err, FetchError::EmptyOrMalformed { norad_id: 25544, .. }));
    }

    #[test]
    fn test_short_payload_is_malformed() {
        let err = parse_element_set(LINE1, 25544, "ISS").unwrap_err();
        assert!(matches!(err, FetchError::EmptyOrMalformed { .. }));
    }

    #[test]
    fn test_extra_records_are_malformed() {
        let payload = format!("0 ISS\n{}\n{}\n0 ISS\n{}\n{}", LINE1, LINE2, LINE1, LINE2);
        assert!(parse_element_set(&payload, 25544, "ISS").is_err());
    }

    #[test]
    fn test_swapped_lines_are_malformed() {
        let payload = format!("0 ISS\n{}\n{}", LINE2, LINE1);
        assert!(parse_element_set(&payload, 25544, "ISS").is_err());
    }

    #[test]
    fn test_bad_checksum_is_malformed() {
        let broken = LINE1.replace("9992", "9993");
        let payload = format!("0 ISS\n{}\n{}", broken, LINE2);
        assert!(parse_element_set(&payload, 25544, "ISS").is_err());
    }

    #[test]
    fn test_verify_checksum() {
        assert!(verify_checksum(LINE1).is_ok());
        assert!(verify_checksum(LINE2).is_ok());
        assert!(verify_checksum(&LINE2[..60]).is_err());
    }

    #[test]
    fn test_mismatched_catalog_number_is_malformed() {
        let payload = format!("0 ISS\n{}\n{}", LINE1, LINE2);
        let err = parse_element_set(&payload, 43017, "AO-91").unwrap_err();
        assert!(err.to_string().contains("not 43017"));
    }

    #[test]
    fn test_fetch_elements_parses_provider_payload() {
        let source = FixedPayload {
            payload: Ok(format!("0 ISS (ZARYA)\n{}\n{}", LINE1, LINE2)),
            calls: Cell::new(0),
        };
        let elements = fetch_elements(&source, &iss_entry()).unwrap();
        assert_eq!(elements.norad_id, 25544);
        assert_eq!(source.calls.get(), 1);
    }

    #[test]
    fn test_fetch_elements_surfaces_network_failure() {
        let source = FixedPayload {
            payload: Err(()),
            calls: Cell::new(0),
        };
        let err = fetch_elements(&source, &iss_entry()).unwrap_err();
        assert!(matches!(err, FetchError::Network(ProviderError::Status(503))));
    }
}
