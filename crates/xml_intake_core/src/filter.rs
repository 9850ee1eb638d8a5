use crate::contract::ObjectRecord;

pub const DEFAULT_INTAKE_PREFIX: &str = "migrate/";

/// Upstream notifications are only republished for keys under the intake path.
pub fn is_intake_key(key: &str, intake_prefix: &str) -> bool {
    key.starts_with(intake_prefix)
}

/// Splits decoded records into (republish, skip) by intake prefix, keeping
/// delivery order within each side.
pub fn partition_intake_records(
    records: Vec<ObjectRecord>,
    intake_prefix: &str,
) -> (Vec<ObjectRecord>, Vec<ObjectRecord>) {
    records
        .into_iter()
        .partition(|record| is_intake_key(&record.key, intake_prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_only_keys_under_prefix() {
        assert!(is_intake_key("migrate/a.xml", DEFAULT_INTAKE_PREFIX));
        assert!(!is_intake_key("a.xml", DEFAULT_INTAKE_PREFIX));
        assert!(!is_intake_key("archive/migrate/a.xml", DEFAULT_INTAKE_PREFIX));
        assert!(!is_intake_key("migrate", DEFAULT_INTAKE_PREFIX));
    }

    #[test]
    fn partition_preserves_delivery_order() {
        let records = vec![
            ObjectRecord::new("b", "migrate/1.xml"),
            ObjectRecord::new("b", "other/2.xml"),
            ObjectRecord::new("b", "migrate/3.xml"),
        ];
        let (kept, skipped) = partition_intake_records(records, "migrate/");
        assert_eq!(
            kept,
            vec![
                ObjectRecord::new("b", "migrate/1.xml"),
                ObjectRecord::new("b", "migrate/3.xml"),
            ]
        );
        assert_eq!(skipped, vec![ObjectRecord::new("b", "other/2.xml")]);
    }
}
