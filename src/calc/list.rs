use std::sync::Arc;

use crate::schema::MemberId;

/// An ordered list of tuples.
///
/// Cross joins stay lazy: a 50 × 50 × 50 product is addressed by index and
/// never expanded unless someone walks it.
#[derive(Debug, Clone, PartialEq)]
pub enum TupleList {
    Materialized(Arc<Vec<Vec<MemberId>>>),
    /// Cartesian product; the last part varies fastest.
    CrossJoin(Arc<Vec<TupleList>>),
}

impl TupleList {
    pub fn empty() -> Self {
        TupleList::Materialized(Arc::new(Vec::new()))
    }

    pub fn from_tuples(tuples: Vec<Vec<MemberId>>) -> Self {
        TupleList::Materialized(Arc::new(tuples))
    }

    pub fn from_members(members: impl IntoIterator<Item = MemberId>) -> Self {
        Self::from_tuples(members.into_iter().map(|m| vec![m]).collect())
    }

    /// Lazy product of `parts`; nested products are flattened.
    pub fn cross_join(parts: Vec<TupleList>) -> Self {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                TupleList::CrossJoin(inner) => flat.extend(inner.iter().cloned()),
                other => flat.push(other),
            }
        }
        TupleList::CrossJoin(Arc::new(flat))
    }

    pub fn len(&self) -> usize {
        match self {
            TupleList::Materialized(tuples) => tuples.len(),
            TupleList::CrossJoin(parts) => parts
                .iter()
                .map(TupleList::len)
                .try_fold(1usize, |acc, n| acc.checked_mul(n))
                .unwrap_or(usize::MAX),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tuple at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<Vec<MemberId>> {
        match self {
            TupleList::Materialized(tuples) => tuples.get(index).cloned(),
            TupleList::CrossJoin(parts) => {
                if index >= self.len() {
                    return None;
                }
                let mut remainder = index;
                let mut pieces = Vec::with_capacity(parts.len());
                for part in parts.iter().rev() {
                    let n = part.len();
                    pieces.push(part.get(remainder % n)?);
                    remainder /= n;
                }
                Some(pieces.into_iter().rev().flatten().collect())
            }
        }
    }

    /// Walk the tuples in order without expanding the list.
    pub fn iter(&self) -> impl Iterator<Item = Vec<MemberId>> + '_ {
        (0..self.len()).map_while(move |i| self.get(i))
    }

    /// Expand into plain tuples.
    pub fn to_vec(&self) -> Vec<Vec<MemberId>> {
        self.iter().collect()
    }
}
