//! Call stack inversion: rebuild the stack forest leaf-first.
//!
//! In the inverted view each sample's chain is reversed, so self time
//! aggregates at the roots. Only chains actually referenced by samples are
//! inserted; inverted chains sharing a suffix share nodes through the
//! usual (prefix, frame) dedup.

use log::debug;
use std::collections::HashMap;

use crate::profile::tables::{IndexIntoCategoryList, IndexIntoStackTable, StackTable, Thread};

pub fn invert_callstack(thread: &Thread, default_category: IndexIntoCategoryList) -> Thread {
    debug!(
        "inverting {} stacks / {} samples",
        thread.stack_table.len(),
        thread.samples.len()
    );

    let mut new_stack_table = StackTable::new();
    let mut node_index: HashMap<(Option<IndexIntoStackTable>, usize), IndexIntoStackTable> =
        HashMap::new();
    // Original leaf stack -> inverted leaf stack, since samples share
    // stacks heavily.
    let mut inverted_for_stack: HashMap<IndexIntoStackTable, IndexIntoStackTable> = HashMap::new();

    let mut samples = thread.samples.clone();
    for sample_stack in samples.stack.iter_mut() {
        let Some(leaf) = *sample_stack else { continue };
        if let Some(&inverted) = inverted_for_stack.get(&leaf) {
            *sample_stack = Some(inverted);
            continue;
        }

        // Collect the chain leaf-to-root; that is exactly the insertion
        // order for the inverted tree.
        let mut node = None;
        let mut current = Some(leaf);
        while let Some(stack) = current {
            let frame = thread.stack_table.frame[stack];
            let category = thread.stack_table.category[stack];
            let subcategory = thread.stack_table.subcategory[stack];
            node = Some(match node_index.get(&(node, frame)) {
                Some(&existing) => {
                    if new_stack_table.category[existing] != category {
                        new_stack_table.category[existing] = default_category;
                        new_stack_table.subcategory[existing] = 0;
                    } else if new_stack_table.subcategory[existing] != subcategory {
                        new_stack_table.subcategory[existing] = 0;
                    }
                    existing
                }
                None => {
                    let created = new_stack_table.push(node, frame, category, subcategory);
                    node_index.insert((node, frame), created);
                    created
                }
            });
            current = thread.stack_table.prefix[stack];
        }

        let inverted = node.expect("a non-empty chain always yields a node");
        inverted_for_stack.insert(leaf, inverted);
        *sample_stack = Some(inverted);
    }

    let mut new_thread = thread.clone();
    new_thread.stack_table = new_stack_table;
    new_thread.samples = samples;
    new_thread
}
