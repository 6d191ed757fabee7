//! Shared fixture builder for integration tests.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::HashMap;

use stacklens::profile::tables::{
    Category, IndexIntoFuncTable, IndexIntoResourceTable, IndexIntoStackTable, ResourceKind,
    Thread,
};

/// Category list used across tests: index 0 is the default (grey).
pub fn test_categories() -> Vec<Category> {
    [("Other", "grey"), ("Layout", "purple"), ("JavaScript", "yellow")]
        .iter()
        .map(|(name, color)| Category {
            name: name.to_string(),
            color: color.to_string(),
            subcategories: vec!["Other".to_string(), "A".to_string(), "B".to_string()],
        })
        .collect()
}

/// Builds a thread incrementally, interning funcs, frames, and stacks the
/// way a profile importer would.
#[derive(Default)]
pub struct ThreadBuilder {
    thread: Thread,
    func_by_name: HashMap<String, IndexIntoFuncTable>,
    frame_by_func: HashMap<IndexIntoFuncTable, usize>,
    stack_by_key: HashMap<(Option<IndexIntoStackTable>, usize), IndexIntoStackTable>,
}

impl ThreadBuilder {
    pub fn new() -> Self {
        let mut builder = Self::default();
        builder.thread.name = "test thread".to_string();
        builder
    }

    /// Intern a function by name. Defaults: native, no resource.
    pub fn func(&mut self, name: &str) -> IndexIntoFuncTable {
        if let Some(&f) = self.func_by_name.get(name) {
            return f;
        }
        let name_index = self.thread.string_table.index_for_string(name);
        let f = self.thread.func_table.push(name_index, None, false, false);
        self.func_by_name.insert(name.to_string(), f);
        f
    }

    pub fn func_js(&mut self, name: &str) -> IndexIntoFuncTable {
        let f = self.func(name);
        self.thread.func_table.is_js[f] = true;
        f
    }

    pub fn resource(&mut self, name: &str) -> IndexIntoResourceTable {
        let name_index = self.thread.string_table.index_for_string(name);
        self.thread
            .resource_table
            .push(name_index, ResourceKind::Library)
    }

    pub fn set_resource(&mut self, func_name: &str, resource: IndexIntoResourceTable) {
        let f = self.func(func_name);
        self.thread.func_table.resource[f] = Some(resource);
    }

    fn frame_for(&mut self, func: IndexIntoFuncTable) -> usize {
        if let Some(&frame) = self.frame_by_func.get(&func) {
            return frame;
        }
        let frame = self.thread.frame_table.push(func, None, None);
        self.frame_by_func.insert(func, frame);
        frame
    }

    /// Intern the stack chain for a path of function names, all rows
    /// category 0.
    pub fn stack(&mut self, path: &[&str]) -> IndexIntoStackTable {
        let with_categories: Vec<(&str, usize, usize)> =
            path.iter().map(|&name| (name, 0, 0)).collect();
        self.stack_with_categories(&with_categories)
    }

    /// Intern a stack chain with per-row (category, subcategory).
    pub fn stack_with_categories(
        &mut self,
        path: &[(&str, usize, usize)],
    ) -> IndexIntoStackTable {
        assert!(!path.is_empty(), "a stack needs at least one frame");
        let mut prefix = None;
        for &(name, category, subcategory) in path {
            let func = self.func(name);
            let frame = self.frame_for(func);
            let key = (prefix, frame);
            let stack = match self.stack_by_key.get(&key) {
                Some(&s) => s,
                None => {
                    let s = self
                        .thread
                        .stack_table
                        .push(prefix, frame, category, subcategory);
                    self.stack_by_key.insert(key, s);
                    s
                }
            };
            prefix = Some(stack);
        }
        prefix.expect("non-empty path")
    }

    /// Add one sample at `time` whose stack is the given path.
    pub fn sample(&mut self, path: &[&str], time: f64) -> &mut Self {
        let stack = self.stack(path);
        self.thread.samples.push(Some(stack), time, 1.0);
        self
    }

    pub fn sample_with_categories(
        &mut self,
        path: &[(&str, usize, usize)],
        time: f64,
    ) -> &mut Self {
        let stack = self.stack_with_categories(path);
        self.thread.samples.push(Some(stack), time, 1.0);
        self
    }

    pub fn marker(
        &mut self,
        name: &str,
        start: Option<f64>,
        end: Option<f64>,
        data: Option<serde_json::Value>,
    ) -> &mut Self {
        let name_index = self.thread.string_table.index_for_string(name);
        self.thread.markers.push(name_index, start, end, data);
        self
    }

    pub fn func_index(&self, name: &str) -> IndexIntoFuncTable {
        self.func_by_name[name]
    }

    pub fn build(self) -> Thread {
        self.thread
    }
}

/// The function-name path ("root;leaf") of each sample, or None for
/// dropped samples.
pub fn sample_paths(thread: &Thread) -> Vec<Option<String>> {
    thread
        .samples
        .stack
        .iter()
        .map(|stack| {
            stack.map(|s| {
                thread
                    .func_path_for_stack(s)
                    .iter()
                    .map(|&f| thread.func_name(f))
                    .collect::<Vec<_>>()
                    .join(";")
            })
        })
        .collect()
}

/// After any transform: every non-null sample stack is a valid index, and
/// every prefix is a valid smaller index.
pub fn assert_referential_integrity(thread: &Thread) {
    let len = thread.stack_table.len();
    for stack in thread.samples.stack.iter().flatten() {
        assert!(*stack < len, "sample references stack {} of {}", stack, len);
    }
    thread
        .stack_table
        .check_invariants()
        .expect("stack table invariants must hold");
    for frame in &thread.stack_table.frame {
        assert!(*frame < thread.frame_table.len());
    }
}
