//! Acknowledgment entries for the queue transport

use std::collections::BTreeMap;

/// Everything needed to delete one delivered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcknowledgeEntry {
    pub queue_url: String,
    pub message_id: String,
    pub receipt_handle: String,
}

/// Per-message part of a URL-scoped batch delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteEntry {
    pub id: String,
    pub receipt_handle: String,
}

impl From<AcknowledgeEntry> for DeleteEntry {
    fn from(entry: AcknowledgeEntry) -> Self {
        Self {
            id: entry.message_id,
            receipt_handle: entry.receipt_handle,
        }
    }
}

/// Group entries by queue URL, since deletes are batched per queue.
///
/// Duplicate message ids within one queue are collapsed; a batch delete with repeated
/// ids is rejected by the transport.
pub fn group_by_queue<I>(entries: I) -> BTreeMap<String, Vec<DeleteEntry>>
where
    I: IntoIterator<Item = AcknowledgeEntry>,
{
    let mut grouped: BTreeMap<String, Vec<DeleteEntry>> = BTreeMap::new();
    for entry in entries {
        let bucket = grouped.entry(entry.queue_url.clone()).or_default();
        if bucket.iter().all(|existing| existing.id != entry.message_id) {
            bucket.push(entry.into());
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str, id: &str) -> AcknowledgeEntry {
        AcknowledgeEntry {
            queue_url: url.to_string(),
            message_id: id.to_string(),
            receipt_handle: format!("handle-{id}"),
        }
    }

    #[test]
    fn test_group_by_queue() {
        let grouped = group_by_queue(vec![
            entry("https://q/a", "1"),
            entry("https://q/b", "2"),
            entry("https://q/a", "3"),
        ]);

        assert_eq!(grouped.len(), 2);
        let a = &grouped["https://q/a"];
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].id, "1");
        assert_eq!(a[1].receipt_handle, "handle-3");
        assert_eq!(grouped["https://q/b"].len(), 1);
    }

    #[test]
    fn test_duplicate_ids_are_collapsed() {
        let grouped = group_by_queue(vec![entry("https://q/a", "1"), entry("https://q/a", "1")]);
        assert_eq!(grouped["https://q/a"].len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(group_by_queue(Vec::new()).is_empty());
    }
}
