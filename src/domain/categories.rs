//! The closed set of category labels offered by the editor and navigation.
//! Stored posts are not validated against it.

pub const ALL: &str = "Бүгд";
pub const GOSPEL: &str = "Сайн мэдээ";

pub const LABELS: [&str; 6] = [
    GOSPEL,
    "Advent",
    "Сургаалт зүйрлэлүүд",
    "Үхэл ба амилал",
    "Мөнх үгийн ойлголт",
    "Тамын тухай",
];

pub fn is_known(label: &str) -> bool {
    LABELS.contains(&label)
}

/// Interpret a `?category=` value: blank or [`ALL`] means no filter.
pub fn filter_from_query(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|label| !label.is_empty() && *label != ALL)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_label_disables_filter() {
        assert_eq!(filter_from_query(Some(ALL)), None);
        assert_eq!(filter_from_query(Some("  ")), None);
        assert_eq!(filter_from_query(None), None);
        assert_eq!(filter_from_query(Some("Advent")), Some("Advent".to_string()));
    }

    #[test]
    fn known_labels() {
        assert!(is_known(GOSPEL));
        assert!(!is_known(ALL));
    }
}
