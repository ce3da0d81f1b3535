use std::{iter::Enumerate, marker::PhantomData};

/// `enumerate` yielding typed indices instead of `usize`.
pub struct IndexedIter<I, Idx> {
    inner: Enumerate<I>,
    _marker: PhantomData<Idx>,
}

pub trait EnumerateIdx<Idx>: Iterator + Sized {
    fn enumerate_idx(self) -> IndexedIter<Self, Idx> {
        IndexedIter {
            inner: self.enumerate(),
            _marker: PhantomData,
        }
    }
}

impl<I: Iterator, Idx> EnumerateIdx<Idx> for I {}

impl<I: Iterator, Idx: From<usize>> Iterator for IndexedIter<I, Idx> {
    type Item = (Idx, I::Item);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(index, item)| (Idx::from(index), item))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<I: ExactSizeIterator, Idx: From<usize>> ExactSizeIterator for IndexedIter<I, Idx> {}

#[cfg(test)]
mod tests {
    use crate::problem::bin::BinIdx;

    use super::*;

    #[test]
    fn test_enumerate_idx() {
        let ids = ["a", "b", "c"];
        let indexed = ids
            .iter()
            .enumerate_idx()
            .map(|(index, id): (BinIdx, _)| (index, *id))
            .collect::<Vec<_>>();

        assert_eq!(indexed[2], (BinIdx::new(2), "c"));
        assert_eq!(EnumerateIdx::<BinIdx>::enumerate_idx(ids.iter()).len(), 3);
    }
}
