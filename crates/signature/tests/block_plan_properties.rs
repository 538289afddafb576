//! Property tests for block partitioning and output sizing.

use proptest::prelude::*;
use signature::{BlockPlan, HEADER_LEN, digest_offset};

proptest! {
    #[test]
    fn blocks_cover_the_input_exactly(file_size in 1u64..1_000_000, block_size in 1u32..100_000) {
        let plan = BlockPlan::new(file_size, block_size).expect("valid plan");
        let total: u64 = plan.blocks().map(|(_, len)| u64::from(len)).sum();
        prop_assert_eq!(total, file_size);
        prop_assert_eq!(plan.blocks().count() as u64, plan.block_count());
    }

    #[test]
    fn only_the_last_block_may_be_short(file_size in 1u64..1_000_000, block_size in 1u32..100_000) {
        let plan = BlockPlan::new(file_size, block_size).expect("valid plan");
        let last = plan.block_count() - 1;
        for (index, len) in plan.blocks() {
            prop_assert!(len > 0);
            if index != last {
                prop_assert_eq!(len, block_size);
            }
        }
        prop_assert!(plan.last_block_len() <= block_size);
    }

    #[test]
    fn output_length_matches_record_layout(
        file_size in 1u64..10_000_000,
        block_size in 1u32..1_000_000,
        digest_len in prop::sample::select(vec![4usize, 16]),
    ) {
        let plan = BlockPlan::new(file_size, block_size).expect("valid plan");
        let output_len = plan.output_len(digest_len).expect("fits");
        prop_assert_eq!(output_len, HEADER_LEN as u64 + plan.block_count() * digest_len as u64);
        prop_assert_eq!(digest_offset(plan.block_count(), digest_len), output_len);
    }
}
