//! Operation table iterator.

use crate::error::CowResult;
use crate::format::{CowOperation, OP_SIZE};

/// A single-pass iterator over the operation table.
///
/// The iterator owns the (checksum-verified) op table bytes, so it may
/// outlive the [`crate::CowReader`] that produced it. It delimits
/// records in on-disk order and decodes them on access; it never reads
/// the byte source again.
///
/// The explicit `done`/`get`/`advance` surface mirrors the cursor state
/// machine; the [`Iterator`] impl is the idiomatic way to consume it:
///
/// ```ignore
/// let mut iter = reader.op_iter()?;
/// for op in &mut iter {
///     let op = op?;
///     // Process op in stored order...
/// }
/// ```
pub struct CowOpIter {
    ops: Vec<u8>,
    pos: usize,
    done: bool,
}

impl CowOpIter {
    pub(crate) fn new(ops: Vec<u8>) -> Self {
        let done = ops.len() < OP_SIZE;
        Self { ops, pos: 0, done }
    }

    /// Returns `true` once the table is exhausted.
    #[must_use]
    pub fn done(&self) -> bool {
        self.done
    }

    /// Decodes the record at the cursor.
    ///
    /// # Panics
    ///
    /// Panics if called after [`CowOpIter::done`] returns `true`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CowError::UnknownOpType`] or
    /// [`crate::CowError::UnknownCompression`] if the record carries an
    /// unrecognized enum byte.
    pub fn get(&self) -> CowResult<CowOperation> {
        assert!(!self.done, "get() called on exhausted op iterator");
        CowOperation::decode(&self.ops[self.pos..self.pos + OP_SIZE])
    }

    /// Advances the cursor by one record.
    ///
    /// # Panics
    ///
    /// Panics if called after [`CowOpIter::done`] returns `true`.
    pub fn advance(&mut self) {
        assert!(!self.done, "advance() called on exhausted op iterator");
        self.pos += OP_SIZE;
        if self.ops.len() - self.pos < OP_SIZE {
            self.done = true;
        }
    }
}

impl Iterator for CowOpIter {
    type Item = CowResult<CowOperation>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let op = self.get();
        self.advance();

        match op {
            Ok(op) => Some(Ok(op)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Compression, OpType};

    fn encode_ops(ops: &[CowOperation]) -> Vec<u8> {
        ops.iter().flat_map(|op| op.encode()).collect()
    }

    fn zero_op(new_block: u64) -> CowOperation {
        CowOperation {
            op_type: OpType::Zero,
            compression: Compression::None,
            data_length: 0,
            new_block,
            source: 0,
        }
    }

    #[test]
    fn iter_empty_table_is_done() {
        let iter = CowOpIter::new(Vec::new());
        assert!(iter.done());
    }

    #[test]
    fn iter_walks_records_in_order() {
        let ops = [zero_op(1), zero_op(2), zero_op(3)];
        let mut iter = CowOpIter::new(encode_ops(&ops));

        let mut seen = Vec::new();
        while !iter.done() {
            seen.push(iter.get().unwrap());
            iter.advance();
        }
        assert_eq!(seen, ops);
    }

    #[test]
    fn iter_as_iterator_yields_all_records() {
        let ops = [zero_op(10), zero_op(20)];
        let collected: Vec<_> = CowOpIter::new(encode_ops(&ops))
            .map(|op| op.unwrap())
            .collect();
        assert_eq!(collected, ops);
    }

    #[test]
    fn iter_stops_on_undecodable_record() {
        let mut bytes = encode_ops(&[zero_op(1), zero_op(2)]);
        bytes[OP_SIZE] = 99; // corrupt the second record's type byte

        let mut iter = CowOpIter::new(bytes);
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
        assert!(iter.done());
    }

    #[test]
    #[should_panic(expected = "exhausted op iterator")]
    fn iter_get_after_done_panics() {
        let iter = CowOpIter::new(Vec::new());
        let _ = iter.get();
    }
}
