//! Property tests for memory-backed virtual files.
//!
//! Random write/seek sequences are replayed against a plain `Vec<u8>` model.

use audiofs_vfile::{growth, MemoryFile, VfsBackend, Whence};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Write(Vec<u8>),
    SeekStart(u64),
    SeekCurrent(i64),
    SeekEnd(i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => prop::collection::vec(any::<u8>(), 0..512).prop_map(Op::Write),
        1 => (0u64..8192).prop_map(Op::SeekStart),
        1 => (-256i64..256).prop_map(Op::SeekCurrent),
        1 => (-256i64..256).prop_map(Op::SeekEnd),
    ]
}

/// Reference model: content up to the apparent size plus a cursor.
#[derive(Default)]
struct Model {
    data: Vec<u8>,
    position: u64,
}

impl Model {
    fn write(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let start = self.position as usize;
        let end = start + bytes.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(bytes);
        self.position = end as u64;
    }

    fn seek(&mut self, base: u64, offset: i64) -> Option<u64> {
        let target = base as i64 + offset;
        if target < 0 {
            return None;
        }
        self.position = target as u64;
        Some(self.position)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn memory_file_matches_model(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut file = MemoryFile::new(1024).unwrap();
        let mut model = Model::default();
        let mut last_capacity = file.capacity();

        for op in ops {
            let size_before = model.data.len() as u64;
            match op {
                Op::Write(bytes) => {
                    let position = model.position;
                    prop_assert_eq!(file.write(&bytes).unwrap(), bytes.len());
                    model.write(&bytes);
                    if !bytes.is_empty() {
                        let expected = size_before.max(position + bytes.len() as u64);
                        prop_assert_eq!(file.size().unwrap(), expected);
                    }
                }
                Op::SeekStart(offset) => {
                    let expected = model.seek(0, offset as i64);
                    prop_assert_eq!(file.seek(offset as i64, Whence::Start).ok(), expected);
                }
                Op::SeekCurrent(offset) => {
                    let expected = model.seek(model.position, offset);
                    prop_assert_eq!(file.seek(offset, Whence::Current).ok(), expected);
                }
                Op::SeekEnd(offset) => {
                    let expected = model.seek(size_before, offset);
                    prop_assert_eq!(file.seek(offset, Whence::End).ok(), expected);
                }
            }

            prop_assert_eq!(file.position(), model.position);
            prop_assert_eq!(file.size().unwrap(), model.data.len() as u64);
            prop_assert!(file.capacity() >= last_capacity);
            prop_assert!(file.capacity() >= file.size().unwrap());
            last_capacity = file.capacity();
        }

        prop_assert_eq!(file.into_bytes().unwrap(), model.data);
    }

    #[test]
    fn read_never_passes_apparent_size(
        data in prop::collection::vec(any::<u8>(), 1..2048),
        start in 0u64..4096,
        len in 0usize..4096,
    ) {
        let mut file = MemoryFile::new(1024).unwrap();
        file.write(&data).unwrap();
        file.seek(start as i64, Whence::Start).unwrap();

        let mut out = vec![0u8; len];
        let count = file.read(&mut out).unwrap();

        let available = (data.len() as u64).saturating_sub(start) as usize;
        prop_assert_eq!(count, len.min(available));
        if count > 0 {
            let begin = start as usize;
            prop_assert_eq!(&out[..count], &data[begin..begin + count]);
        }
    }

    #[test]
    fn growth_target_covers_request(current in 0u64..(64 << 20), required in 0u64..(256 << 20)) {
        let target = growth::target_capacity(current, required).unwrap();
        prop_assert!(target >= required);
        prop_assert!(target >= current);
        if required <= current {
            prop_assert_eq!(target, current);
        } else if current < growth::LARGE_CLASS {
            prop_assert!(target == growth::SMALL_CLASS
                || target == growth::MEDIUM_CLASS
                || target % growth::LARGE_CLASS == 0);
        } else {
            prop_assert_eq!((target - current) % growth::LARGE_CLASS, 0);
            prop_assert!(target - current < required - current + growth::LARGE_CLASS);
        }
    }
}
