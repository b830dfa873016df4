use crate::{
    errors::{AppError, AppResult},
    models::domain::{ContentUnit, OrderRange},
};

/// A contiguous run of content units sent to the generation service together.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    pub units: Vec<ContentUnit>,
    pub range: OrderRange,
}

impl Chunk {
    /// Builds a chunk from units already in document order. Returns `None` for
    /// an empty slice so no empty chunk ever exists.
    pub fn from_units(units: Vec<ContentUnit>) -> Option<Self> {
        let range = OrderRange {
            first: units.first()?.order_index,
            last: units.last()?.order_index,
        };
        Some(Chunk { units, range })
    }

    /// The unit the chunk's artifacts are keyed by.
    pub fn first_unit_id(&self) -> &str {
        // from_units guarantees at least one unit
        &self.units[0].id
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Splits units into ordered chunks of at most `chunk_size` units.
pub fn chunk_units(mut units: Vec<ContentUnit>, chunk_size: usize) -> AppResult<Vec<Chunk>> {
    if chunk_size == 0 {
        return Err(AppError::ValidationError(
            "chunk_size must be greater than zero".to_string(),
        ));
    }

    units.sort_by_key(|u| u.order_index);

    let mut chunks = Vec::with_capacity(units.len().div_ceil(chunk_size));
    let mut rest = units.into_iter().peekable();
    while rest.peek().is_some() {
        let batch: Vec<ContentUnit> = rest.by_ref().take(chunk_size).collect();
        if let Some(chunk) = Chunk::from_units(batch) {
            chunks.push(chunk);
        }
    }

    Ok(chunks)
}

/// Keeps the requested units, in document order. An empty id list selects all.
pub fn select_units(mut units: Vec<ContentUnit>, ids: &[String]) -> Vec<ContentUnit> {
    units.sort_by_key(|u| u.order_index);
    if ids.is_empty() {
        return units;
    }
    units
        .into_iter()
        .filter(|u| ids.iter().any(|id| id == &u.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(count: i64) -> Vec<ContentUnit> {
        (0..count)
            .map(|i| ContentUnit::new("doc-1", i, &format!("Paragraph {}", i)))
            .collect()
    }

    #[test]
    fn twenty_three_units_make_three_chunks() {
        let chunks = chunk_units(units(23), 10).expect("valid chunk size");

        let sizes: Vec<usize> = chunks.iter().map(Chunk::len).collect();
        assert_eq!(sizes, vec![10, 10, 3]);

        let labels: Vec<String> = chunks.iter().map(|c| c.range.label()).collect();
        assert_eq!(labels, vec!["0-9", "10-19", "20-22"]);
    }

    #[test]
    fn chunks_preserve_order_and_first_unit() {
        let mut shuffled = units(12);
        shuffled.reverse();
        let expected_first = shuffled.iter().find(|u| u.order_index == 10).map(|u| u.id.clone());

        let chunks = chunk_units(shuffled, 5).expect("valid chunk size");

        for pair in chunks.windows(2) {
            assert!(pair[1].range.first > pair[0].range.last);
        }
        assert_eq!(Some(chunks[2].first_unit_id().to_string()), expected_first);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(matches!(
            chunk_units(units(3), 0),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunks = chunk_units(Vec::new(), 10).expect("valid chunk size");
        assert!(chunks.is_empty());
        assert!(Chunk::from_units(Vec::new()).is_none());
    }

    #[test]
    fn select_units_filters_and_orders() {
        let all = units(5);
        let wanted = vec![all[3].id.clone(), all[1].id.clone()];

        let selected = select_units(all, &wanted);

        let indices: Vec<i64> = selected.iter().map(|u| u.order_index).collect();
        assert_eq!(indices, vec![1, 3]);
    }

    #[test]
    fn select_units_with_no_ids_keeps_everything() {
        assert_eq!(select_units(units(4), &[]).len(), 4);
    }
}
