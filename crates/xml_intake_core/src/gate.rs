const ELIGIBLE_SUFFIX: &[u8] = b".xml";

/// Only `.xml` objects (any case) are scanned for a document identifier.
pub fn is_eligible(key: &str) -> bool {
    let bytes = key.as_bytes();
    bytes.len() >= ELIGIBLE_SUFFIX.len()
        && bytes[bytes.len() - ELIGIBLE_SUFFIX.len()..].eq_ignore_ascii_case(ELIGIBLE_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_xml_suffix_in_any_case() {
        assert!(is_eligible("migrate/report.xml"));
        assert!(is_eligible("REPORT.XML"));
        assert!(is_eligible("nested/path/Report.Xml"));
        assert!(is_eligible(".xml"));
    }

    #[test]
    fn rejects_other_keys() {
        for key in [
            "migrate/report.json",
            "report.xml.gz",
            "xml",
            "reportxml",
            "",
            "migrate/",
            "ledger/abc.json",
        ] {
            assert!(!is_eligible(key), "{key} should be ineligible");
        }
    }

    #[test]
    fn handles_multibyte_keys_without_panicking() {
        assert!(is_eligible("документ.xml"));
        assert!(!is_eligible("é"));
        assert!(!is_eligible("документ"));
    }
}
