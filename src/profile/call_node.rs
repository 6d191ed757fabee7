//! Call nodes: the function-level view of the stack table.
//!
//! A call node is a unique path of functions from a root. Several stacks
//! with different frame-level detail (line numbers, addresses) collapse
//! onto the same call node, which is what the call tree displays. A
//! `CallNodePath` is the ordered list of function indexes identifying one
//! node; it stays meaningful across frame-level churn, so it is what gets
//! serialized into transform parameters.

use std::collections::HashMap;

use crate::profile::tables::{
    FrameTable, IndexIntoCategoryList, IndexIntoFuncTable, IndexIntoStackTable, StackTable,
};

pub type CallNodePath = Vec<IndexIntoFuncTable>;
pub type IndexIntoCallNodeTable = usize;

/// One row = one unique root-to-leaf function path.
#[derive(Debug, Clone, Default)]
pub struct CallNodeTable {
    pub prefix: Vec<Option<IndexIntoCallNodeTable>>,
    pub func: Vec<IndexIntoFuncTable>,
    pub category: Vec<IndexIntoCategoryList>,
    pub subcategory: Vec<IndexIntoCategoryList>,
    pub depth: Vec<usize>,
}

impl CallNodeTable {
    pub fn len(&self) -> usize {
        self.func.len()
    }

    pub fn is_empty(&self) -> bool {
        self.func.is_empty()
    }
}

/// Call node table plus the maps needed to move between stacks, call
/// nodes, and paths.
#[derive(Debug, Clone, Default)]
pub struct CallNodeInfo {
    pub call_node_table: CallNodeTable,
    /// Stack index -> call node index, parallel to the stack table.
    pub stack_index_to_call_node_index: Vec<IndexIntoCallNodeTable>,
    /// (prefix call node, func) -> call node, for path resolution.
    children: HashMap<(Option<IndexIntoCallNodeTable>, IndexIntoFuncTable), IndexIntoCallNodeTable>,
}

impl CallNodeInfo {
    /// Derive the call node table from a stack table. Stacks mapping onto
    /// the same call node with conflicting categories resolve to the
    /// default category, the same tie-break the collapse transforms use.
    pub fn compute(
        stack_table: &StackTable,
        frame_table: &FrameTable,
        default_category: IndexIntoCategoryList,
    ) -> Self {
        let mut table = CallNodeTable::default();
        let mut stack_to_node = Vec::with_capacity(stack_table.len());
        let mut children = HashMap::new();

        for stack in 0..stack_table.len() {
            let func = frame_table.func[stack_table.frame[stack]];
            let prefix_node = stack_table.prefix[stack].map(|p| stack_to_node[p]);
            let category = stack_table.category[stack];
            let subcategory = stack_table.subcategory[stack];

            let node = match children.get(&(prefix_node, func)) {
                Some(&node) => {
                    if table.category[node] != category {
                        table.category[node] = default_category;
                        table.subcategory[node] = 0;
                    } else if table.subcategory[node] != subcategory {
                        table.subcategory[node] = 0;
                    }
                    node
                }
                None => {
                    let node = table.len();
                    table.prefix.push(prefix_node);
                    table.func.push(func);
                    table.category.push(category);
                    table.subcategory.push(subcategory);
                    table
                        .depth
                        .push(prefix_node.map_or(0, |p| table.depth[p] + 1));
                    children.insert((prefix_node, func), node);
                    node
                }
            };
            stack_to_node.push(node);
        }

        Self {
            call_node_table: table,
            stack_index_to_call_node_index: stack_to_node,
            children,
        }
    }

    pub fn call_node_for_stack(
        &self,
        stack: IndexIntoStackTable,
    ) -> IndexIntoCallNodeTable {
        self.stack_index_to_call_node_index[stack]
    }

    /// Resolve a root-to-leaf function path to its call node, if present.
    pub fn call_node_index_from_path(
        &self,
        path: &[IndexIntoFuncTable],
    ) -> Option<IndexIntoCallNodeTable> {
        let mut node = None;
        for &func in path {
            node = Some(*self.children.get(&(node, func))?);
        }
        node
    }

    /// The root-to-leaf function path of a call node.
    pub fn call_node_path_from_index(
        &self,
        index: IndexIntoCallNodeTable,
    ) -> CallNodePath {
        let table = &self.call_node_table;
        let mut path = Vec::with_capacity(table.depth[index] + 1);
        let mut current = Some(index);
        while let Some(node) = current {
            path.push(table.func[node]);
            current = table.prefix[node];
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::tables::StackTable;

    // Stacks: A, A->B (two frame-level variants), A->B->C
    fn fixture() -> (StackTable, FrameTable) {
        let mut frames = FrameTable::default();
        let fa = frames.push(0, None, None);
        let fb1 = frames.push(1, Some(10), None);
        let fb2 = frames.push(1, Some(20), None);
        let fc = frames.push(2, None, None);

        let mut stacks = StackTable::new();
        let a = stacks.push(None, fa, 0, 0);
        let b1 = stacks.push(Some(a), fb1, 0, 0);
        stacks.push(Some(a), fb2, 0, 0);
        stacks.push(Some(b1), fc, 0, 0);
        (stacks, frames)
    }

    #[test]
    fn frame_variants_share_a_call_node() {
        let (stacks, frames) = fixture();
        let info = CallNodeInfo::compute(&stacks, &frames, 0);
        assert_eq!(info.call_node_table.len(), 3);
        assert_eq!(
            info.call_node_for_stack(1),
            info.call_node_for_stack(2)
        );
    }

    #[test]
    fn path_round_trips_through_index() {
        let (stacks, frames) = fixture();
        let info = CallNodeInfo::compute(&stacks, &frames, 0);
        let path = vec![0, 1, 2];
        let node = info.call_node_index_from_path(&path).unwrap();
        assert_eq!(info.call_node_path_from_index(node), path);
        assert_eq!(info.call_node_table.depth[node], 2);
        assert!(info.call_node_index_from_path(&[0, 2]).is_none());
    }
}
