//! Call-tree aggregation: fold samples onto the call node table and
//! compute per-node total and self weight.
//!
//! This is a consumer of the transform core: it runs on whatever thread
//! the pipeline produced, inverted or not.

use log::debug;

use crate::profile::call_node::{CallNodeInfo, IndexIntoCallNodeTable};
use crate::profile::tables::{IndexIntoCategoryList, Thread};

/// Aggregated call tree for one (derived) thread.
pub struct CallTree {
    pub call_node_info: CallNodeInfo,
    /// Weight of each node including its descendants.
    pub total: Vec<f64>,
    /// Weight of samples whose leaf is this node.
    pub self_weight: Vec<f64>,
    pub roots: Vec<IndexIntoCallNodeTable>,
    children: Vec<Vec<IndexIntoCallNodeTable>>,
}

/// Build the call tree for a thread.
pub fn compute_call_tree(thread: &Thread, default_category: IndexIntoCategoryList) -> CallTree {
    let info = CallNodeInfo::compute(
        &thread.stack_table,
        &thread.frame_table,
        default_category,
    );
    let node_count = info.call_node_table.len();
    debug!(
        "call tree: {} call nodes from {} stacks",
        node_count,
        thread.stack_table.len()
    );

    let mut self_weight = vec![0.0; node_count];
    for i in 0..thread.samples.len() {
        if let Some(stack) = thread.samples.stack[i] {
            self_weight[info.call_node_for_stack(stack)] += thread.samples.weight[i];
        }
    }

    // A node's prefix always has a smaller index, so a reverse walk
    // accumulates totals bottom-up in one pass.
    let mut total = self_weight.clone();
    for node in (0..node_count).rev() {
        if let Some(prefix) = info.call_node_table.prefix[node] {
            total[prefix] += total[node];
        }
    }

    let mut roots = Vec::new();
    let mut children = vec![Vec::new(); node_count];
    for node in 0..node_count {
        match info.call_node_table.prefix[node] {
            None => roots.push(node),
            Some(prefix) => children[prefix].push(node),
        }
    }

    CallTree {
        call_node_info: info,
        total,
        self_weight,
        roots,
        children,
    }
}

impl CallTree {
    /// Depth-first rows, heaviest sibling first, skipping zero-weight
    /// nodes (stacks no surviving sample references).
    pub fn rows(&self) -> Vec<IndexIntoCallNodeTable> {
        let mut rows = Vec::new();
        let mut ordered_roots = self.roots.clone();
        self.sort_by_total(&mut ordered_roots);
        let mut pending: Vec<IndexIntoCallNodeTable> = ordered_roots.into_iter().rev().collect();
        while let Some(node) = pending.pop() {
            if self.total[node] == 0.0 {
                continue;
            }
            rows.push(node);
            let mut kids = self.children[node].clone();
            self.sort_by_total(&mut kids);
            pending.extend(kids.into_iter().rev());
        }
        rows
    }

    fn sort_by_total(&self, nodes: &mut [IndexIntoCallNodeTable]) {
        nodes.sort_by(|&a, &b| {
            self.total[b]
                .partial_cmp(&self.total[a])
                .expect("weights must not be NaN")
        });
    }

    /// Render the tree as indented text, at most `max_rows` rows.
    pub fn render_text(&self, thread: &Thread, max_rows: usize) -> String {
        let mut out = String::new();
        out.push_str(&format!("{:>12} {:>12}  name\n", "total", "self"));
        for node in self.rows().into_iter().take(max_rows) {
            let table = &self.call_node_info.call_node_table;
            let name = thread.func_name(table.func[node]);
            out.push_str(&format!(
                "{:>12.1} {:>12.1}  {}{}\n",
                self.total[node],
                self.self_weight[node],
                "  ".repeat(table.depth[node]),
                name
            ));
        }
        out
    }
}

/// Collapsed stack lines ("root;child;leaf weight"), the flamegraph input
/// format. Weights are summed per unique call path and rounded; paths that
/// round to zero are dropped. Sorted heaviest first.
pub fn collapsed_lines(thread: &Thread, default_category: IndexIntoCategoryList) -> Vec<String> {
    let tree = compute_call_tree(thread, default_category);
    let table = &tree.call_node_info.call_node_table;

    let mut lines = Vec::new();
    for node in 0..table.len() {
        let weight = tree.self_weight[node].round() as u64;
        if weight == 0 {
            continue;
        }
        let path = tree.call_node_info.call_node_path_from_index(node);
        let names: Vec<&str> = path.iter().map(|&f| thread.func_name(f)).collect();
        lines.push((names.join(";"), weight));
    }
    lines.sort_by(|a, b| b.1.cmp(&a.1));
    lines
        .into_iter()
        .map(|(stack, weight)| format!("{} {}", stack, weight))
        .collect()
}
