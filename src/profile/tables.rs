//! In-memory table model for one thread of a sampled profile.
//!
//! The stack table stores the tree of call stacks of a thread. The shape of
//! the tree is encoded in the prefix column: root stacks have `None` as
//! their prefix, and every other stack has the index of its caller as its
//! prefix. Indices are append-only, so a stack's prefix is always smaller
//! than the stack itself; transforms rely on that ordering to visit parents
//! before children in a single pass.
//!
//! Samples refer to stacks by index, and many samples share one stack, so a
//! sample only costs one integer. Everything else is reached through the
//! stack: stack -> frame -> func -> resource, each a row index into the next
//! table.
//!
//! Stack rows carry a category even though it is derivable from the frame:
//! a stack whose frame has no category inherits its prefix's category, and
//! transforms that remove the prefix row would otherwise lose that
//! information.

use std::collections::HashMap;

use crate::utils::error::ProfileError;

pub type IndexIntoStackTable = usize;
pub type IndexIntoFrameTable = usize;
pub type IndexIntoFuncTable = usize;
pub type IndexIntoResourceTable = usize;
pub type IndexIntoCategoryList = usize;
pub type IndexIntoStringTable = usize;

/// Milliseconds since profile start.
pub type Milliseconds = f64;

/// Interned string storage shared by the tables of one thread.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    strings: Vec<String>,
    index: HashMap<String, IndexIntoStringTable>,
}

impl StringTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_strings(strings: Vec<String>) -> Self {
        let index = strings
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i))
            .collect();
        Self { strings, index }
    }

    /// Index of `s`, appending a new row on first sight.
    pub fn index_for_string(&mut self, s: &str) -> IndexIntoStringTable {
        if let Some(&i) = self.index.get(s) {
            return i;
        }
        let i = self.strings.len();
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), i);
        i
    }

    pub fn get(&self, i: IndexIntoStringTable) -> &str {
        &self.strings[i]
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// One row = one unique observed (or transform-synthesized) call stack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackTable {
    pub prefix: Vec<Option<IndexIntoStackTable>>,
    pub frame: Vec<IndexIntoFrameTable>,
    pub category: Vec<IndexIntoCategoryList>,
    pub subcategory: Vec<IndexIntoCategoryList>,
}

impl StackTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }

    /// Append a row, returning its index.
    pub fn push(
        &mut self,
        prefix: Option<IndexIntoStackTable>,
        frame: IndexIntoFrameTable,
        category: IndexIntoCategoryList,
        subcategory: IndexIntoCategoryList,
    ) -> IndexIntoStackTable {
        let index = self.len();
        debug_assert!(
            prefix.map_or(true, |p| p < index),
            "stack prefix must precede the stack itself"
        );
        self.prefix.push(prefix);
        self.frame.push(frame);
        self.category.push(category);
        self.subcategory.push(subcategory);
        index
    }

    /// Check the append-only forest invariant: every prefix points at a
    /// strictly smaller index.
    pub fn check_invariants(&self) -> Result<(), ProfileError> {
        for (i, prefix) in self.prefix.iter().enumerate() {
            if let Some(p) = prefix {
                if *p >= i {
                    return Err(ProfileError::InvalidFormat(format!(
                        "stack {} has prefix {} (must be smaller)",
                        i, p
                    )));
                }
            }
        }
        Ok(())
    }
}

/// One row = one static call site (function plus source location).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTable {
    pub func: Vec<IndexIntoFuncTable>,
    pub line: Vec<Option<u32>>,
    pub column: Vec<Option<u32>>,
    pub address: Vec<Option<u64>>,
    pub category: Vec<Option<IndexIntoCategoryList>>,
    pub subcategory: Vec<Option<IndexIntoCategoryList>>,
}

impl FrameTable {
    pub fn len(&self) -> usize {
        self.func.len()
    }

    pub fn is_empty(&self) -> bool {
        self.func.is_empty()
    }

    pub fn push(
        &mut self,
        func: IndexIntoFuncTable,
        line: Option<u32>,
        category: Option<IndexIntoCategoryList>,
    ) -> IndexIntoFrameTable {
        let index = self.len();
        self.func.push(func);
        self.line.push(line);
        self.column.push(None);
        self.address.push(None);
        self.category.push(category);
        self.subcategory.push(category.map(|_| 0));
        index
    }
}

/// One row = one function.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuncTable {
    pub name: Vec<IndexIntoStringTable>,
    /// `None` means no library or source file, e.g. JIT-generated code.
    pub resource: Vec<Option<IndexIntoResourceTable>>,
    pub is_js: Vec<bool>,
    pub relevant_for_js: Vec<bool>,
    pub file_name: Vec<Option<IndexIntoStringTable>>,
}

impl FuncTable {
    pub fn len(&self) -> usize {
        self.name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    pub fn push(
        &mut self,
        name: IndexIntoStringTable,
        resource: Option<IndexIntoResourceTable>,
        is_js: bool,
        relevant_for_js: bool,
    ) -> IndexIntoFuncTable {
        let index = self.len();
        self.name.push(name);
        self.resource.push(resource);
        self.is_js.push(is_js);
        self.relevant_for_js.push(relevant_for_js);
        self.file_name.push(None);
        index
    }
}

/// Kind of thing a resource row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Library,
    Addon,
    Webhost,
    Otherhost,
    Url,
}

impl Default for ResourceKind {
    fn default() -> Self {
        ResourceKind::Library
    }
}

/// One row = one shared library or JS source that functions belong to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceTable {
    pub name: Vec<IndexIntoStringTable>,
    pub host: Vec<Option<IndexIntoStringTable>>,
    pub kind: Vec<ResourceKind>,
}

impl ResourceTable {
    pub fn len(&self) -> usize {
        self.name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    pub fn push(&mut self, name: IndexIntoStringTable, kind: ResourceKind) -> IndexIntoResourceTable {
        let index = self.len();
        self.name.push(name);
        self.host.push(None);
        self.kind.push(kind);
        index
    }
}

/// One row per sample. `stack` is `None` for idle samples and for samples
/// dropped by a transform; the row itself stays so the time axis is intact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplesTable {
    pub stack: Vec<Option<IndexIntoStackTable>>,
    pub time: Vec<Milliseconds>,
    pub weight: Vec<f64>,
}

impl SamplesTable {
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn push(&mut self, stack: Option<IndexIntoStackTable>, time: Milliseconds, weight: f64) {
        self.stack.push(stack);
        self.time.push(time);
        self.weight.push(weight);
    }
}

/// One profiling category (name plus display color and subcategory names).
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub color: String,
    pub subcategories: Vec<String>,
}

/// Index of the default category: the first grey one. The category list is
/// part of the profile document; a list without a grey category is a
/// profile mismatch the caller has to fix.
pub fn default_category_index(
    categories: &[Category],
) -> Result<IndexIntoCategoryList, ProfileError> {
    categories
        .iter()
        .position(|c| c.color == "grey")
        .ok_or(ProfileError::MissingDefaultCategory)
}

/// All tables of one thread. Transforms never mutate a `Thread` they were
/// given; they build a new one, sharing untouched tables by clone.
#[derive(Debug, Clone, Default)]
pub struct Thread {
    pub name: String,
    pub stack_table: StackTable,
    pub frame_table: FrameTable,
    pub func_table: FuncTable,
    pub resource_table: ResourceTable,
    pub samples: SamplesTable,
    pub markers: crate::profile::markers::MarkerTable,
    pub string_table: StringTable,
}

impl Thread {
    /// The function of a stack's leaf frame.
    pub fn stack_func(&self, stack: IndexIntoStackTable) -> IndexIntoFuncTable {
        self.frame_table.func[self.stack_table.frame[stack]]
    }

    /// The function name of a stack's leaf frame.
    pub fn func_name(&self, func: IndexIntoFuncTable) -> &str {
        self.string_table.get(self.func_table.name[func])
    }

    /// Root-to-leaf function indexes for a stack.
    pub fn func_path_for_stack(&self, stack: IndexIntoStackTable) -> Vec<IndexIntoFuncTable> {
        let mut path = Vec::new();
        let mut current = Some(stack);
        while let Some(s) = current {
            path.push(self.stack_func(s));
            current = self.stack_table.prefix[s];
        }
        path.reverse();
        path
    }
}
