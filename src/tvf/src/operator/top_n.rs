// Copyright 2025 RisingWave Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bounded selection of the best rows under a [`ComboComparator`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use itertools::Itertools;
use sqs_common::table::RowId;
use sqs_common::util::sort_util::ComboComparator;

/// One candidate in a [`TopNHeap`].
///
/// Ordered by the comparator, then by insertion sequence, so that among equal rows the one
/// offered first is considered better. The heap top is therefore the worst candidate.
pub struct HeapElem<'a> {
    row_id: RowId,
    seq: usize,
    tag: usize,
    comparator: &'a ComboComparator<'a>,
}

impl HeapElem<'_> {
    pub fn row_id(&self) -> RowId {
        self.row_id
    }

    /// Caller data passed to [`TopNHeap::push_tagged`].
    pub fn tag(&self) -> usize {
        self.tag
    }
}

impl Ord for HeapElem<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.comparator
            .compare(self.row_id, other.row_id)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for HeapElem<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapElem<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapElem<'_> {}

/// Keeps the best `limit` rows offered to it, evicting the worst when full.
pub struct TopNHeap<'a> {
    limit: usize,
    heap: BinaryHeap<HeapElem<'a>>,
    comparator: &'a ComboComparator<'a>,
    next_seq: usize,
}

impl<'a> TopNHeap<'a> {
    pub fn new(limit: usize, comparator: &'a ComboComparator<'a>) -> Self {
        Self {
            limit,
            heap: BinaryHeap::with_capacity(limit.min(1024)),
            comparator,
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Offers a row. Returns the row that left the candidate set, if any: either the evicted
    /// worst candidate or `row_id` itself when it did not make it in.
    pub fn push(&mut self, row_id: RowId) -> Option<RowId> {
        self.push_tagged(row_id, 0).map(|(row_id, _)| row_id)
    }

    /// Like [`TopNHeap::push`], carrying `tag` along with the row.
    pub fn push_tagged(&mut self, row_id: RowId, tag: usize) -> Option<(RowId, usize)> {
        let elem = HeapElem {
            row_id,
            seq: self.next_seq,
            tag,
            comparator: self.comparator,
        };
        self.next_seq += 1;

        if self.heap.len() < self.limit {
            self.heap.push(elem);
            return None;
        }
        match self.heap.peek() {
            Some(worst) if elem < *worst => {
                let evicted = self.heap.pop().map(|e| (e.row_id, e.tag));
                self.heap.push(elem);
                evicted
            }
            _ => Some((elem.row_id, elem.tag)),
        }
    }

    /// Candidates best first, as `(row, tag)`.
    pub fn into_sorted_tagged(self) -> Vec<(RowId, usize)> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|e| (e.row_id, e.tag))
            .collect()
    }

    /// Candidates best first.
    pub fn into_sorted_rows(self) -> Vec<RowId> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|e| e.row_id)
            .collect()
    }

    /// Candidates in the order they were offered.
    pub fn into_offered_rows(self) -> Vec<RowId> {
        self.heap
            .into_vec()
            .into_iter()
            .sorted_by_key(|e| e.seq)
            .map(|e| e.row_id)
            .collect()
    }
}

/// Selects the best `limit` of `rows`, best first. `None` keeps every row.
pub fn select_top_n(
    comparator: &ComboComparator<'_>,
    rows: &[RowId],
    limit: Option<usize>,
) -> Vec<RowId> {
    match limit {
        None => {
            let mut rows = rows.to_vec();
            comparator.sort_rows(&mut rows);
            rows
        }
        Some(limit) => {
            let mut heap = TopNHeap::new(limit, comparator);
            for &row_id in rows {
                heap.push(row_id);
            }
            heap.into_sorted_rows()
        }
    }
}

/// Selects the best `limit` of `rows`, keeping their original relative order.
pub fn select_top_n_unordered(
    comparator: &ComboComparator<'_>,
    rows: &[RowId],
    limit: Option<usize>,
) -> Vec<RowId> {
    match limit {
        None => rows.to_vec(),
        Some(limit) if limit >= rows.len() => rows.to_vec(),
        Some(limit) => {
            let mut heap = TopNHeap::new(limit, comparator);
            for &row_id in rows {
                heap.push(row_id);
            }
            heap.into_offered_rows()
        }
    }
}
