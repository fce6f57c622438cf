//! Merge and rank search results from several providers.

use std::collections::HashMap;

use quarry_types::source::SourceRecord;

/// Bonus for a record that carries a non-empty title or non-empty notes.
const FIELD_BONUS: f64 = 0.5;

/// Combined score of one record at position `index` in the concatenated
/// input.
fn combined_score(record: &SourceRecord, index: usize) -> f64 {
    let mut score = record.numeric_score();
    if !record.title.is_empty() {
        score += FIELD_BONUS;
    }
    if !record.notes.is_empty() {
        score += FIELD_BONUS;
    }
    score + 1.0 / (index as f64 + 1.0)
}

/// Merge `primary` and `secondary`, deduplicate by url, and return the best
/// `limit` records.
///
/// Records are scored in `primary ++ secondary` order, so the position decay
/// of a secondary record depends on how many primary records precede it.
/// Records with an empty url are dropped. For a repeated url, a later record
/// replaces the kept one only when its score is strictly greater. The final
/// sort is stable, so equal scores keep first-seen order.
pub fn merge_and_rank(
    primary: Vec<SourceRecord>,
    secondary: Vec<SourceRecord>,
    limit: usize,
) -> Vec<SourceRecord> {
    // url -> slot in `kept`; slots preserve first-seen order of urls.
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<(f64, SourceRecord)> = Vec::new();

    for (index, record) in primary.into_iter().chain(secondary).enumerate() {
        if record.url.is_empty() {
            continue;
        }
        let score = combined_score(&record, index);
        match slots.get(&record.url) {
            Some(&slot) => {
                if score > kept[slot].0 {
                    kept[slot] = (score, record);
                }
            }
            None => {
                slots.insert(record.url.clone(), kept.len());
                kept.push((score, record));
            }
        }
    }

    kept.sort_by(|a, b| b.0.total_cmp(&a.0));
    kept.truncate(limit);
    kept.into_iter().map(|(_, record)| record).collect()
}
