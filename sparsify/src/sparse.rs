use crate::{Count, DocId, FeatureId};
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};

/// Per-document feature counts, ordered by feature id so serialization is
/// ascending without a separate sort.
pub type SparseVector = BTreeMap<FeatureId, Count>;

/// Count occurrences per feature id. Non-member features are expected to be
/// filtered out before this point.
pub fn aggregate<I: IntoIterator<Item = FeatureId>>(ids: I) -> SparseVector {
    let mut vector = SparseVector::new();
    for id in ids {
        *vector.entry(id).or_insert(0) += 1;
    }
    vector
}

/// Write one sparse line: the document id, then `id:count` pairs ascending by
/// id, each field followed by a single space, newline terminated.
pub fn write_line<W: Write>(w: &mut W, doc_id: DocId, vector: &SparseVector) -> io::Result<()> {
    write!(w, "{doc_id} ")?;
    for (id, count) in vector {
        write!(w, "{id}:{count} ")?;
    }
    writeln!(w)
}

/// Document-name to document-id assignments for one processing run.
/// First-seen names get the previous maximum plus one; ids start at 1.
#[derive(Debug, Default)]
pub struct DocRegistry {
    ids: HashMap<String, DocId>,
    max: DocId,
}

impl DocRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id_for(&mut self, name: &str) -> DocId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        self.max += 1;
        self.ids.insert(name.to_string(), self.max);
        self.max
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_counts_repeats() {
        let v = aggregate([37, 12, 37, 5]);
        assert_eq!(v.get(&37), Some(&2));
        assert_eq!(v.get(&12), Some(&1));
        assert_eq!(v.get(&5), Some(&1));
    }

    #[test]
    fn line_is_ascending_with_no_duplicates() {
        let v = aggregate([900, 3, 900, 41, 3, 3]);
        let mut buf = Vec::new();
        write_line(&mut buf, 7, &v).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "7 3:3 41:1 900:2 \n");
    }

    #[test]
    fn empty_vector_still_writes_the_id() {
        let mut buf = Vec::new();
        write_line(&mut buf, 2, &SparseVector::new()).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "2 \n");
    }

    #[test]
    fn registry_assigns_in_first_encounter_order() {
        let mut registry = DocRegistry::new();
        assert_eq!(registry.id_for("alice.txt"), 1);
        assert_eq!(registry.id_for("bob.txt"), 2);
        assert_eq!(registry.id_for("alice.txt"), 1);
        assert_eq!(registry.len(), 2);
    }
}
