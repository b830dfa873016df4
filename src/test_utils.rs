use crate::models::domain::ContentUnit;

#[cfg(test)]
pub mod fixtures {
    use super::*;

    /// Creates `count` units for a document with order indices `0..count`.
    pub fn content_units(document_id: &str, count: usize) -> Vec<ContentUnit> {
        (0..count)
            .map(|i| {
                ContentUnit::new(
                    document_id,
                    i as i64,
                    &format!(
                        "Paragraph {} describes how attention weights are computed. It continues with detail.",
                        i
                    ),
                )
            })
            .collect()
    }

    /// A unit whose text contains a known, quotable sentence.
    pub fn unit_with_sentence(document_id: &str, order_index: i64, sentence: &str) -> ContentUnit {
        ContentUnit::new(
            document_id,
            order_index,
            &format!("Introduction. {} Further discussion follows.", sentence),
        )
    }
}

#[cfg(test)]
pub mod test_helpers {
    use actix_web::http::StatusCode;

    /// Asserts that a status code represents an error (4xx or 5xx)
    pub fn assert_error_status(status: StatusCode) {
        assert!(
            status.is_client_error() || status.is_server_error(),
            "Expected error status, got: {}",
            status
        );
    }

    /// Asserts that a status code represents success (2xx)
    pub fn assert_success_status(status: StatusCode) {
        assert!(
            status.is_success(),
            "Expected success status, got: {}",
            status
        );
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn test_fixtures_content_units() {
        let units = content_units("doc-1", 3);
        assert_eq!(units.len(), 3);
        assert_eq!(units[2].order_index, 2);
        assert!(units.iter().all(|u| u.document_id == "doc-1"));
    }

    #[test]
    fn test_fixtures_unit_with_sentence() {
        let unit = unit_with_sentence("doc-1", 4, "Quoted line here.");
        assert!(unit.text.contains("Quoted line here."));
        assert_eq!(unit.order_index, 4);
    }
}
