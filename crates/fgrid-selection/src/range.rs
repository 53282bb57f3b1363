//! Shift-click range bookkeeping over row ids.
//!
//! The context remembers an anchor (`root`) and the current extension
//! (`end`). The range between them is resolved lazily against a
//! [`RangeSource`] and cached until either endpoint moves. It never touches
//! selection state: callers apply the returned [`RangePartition`]s.

use tracing::trace;

/// Ordered view of the rows a range can span.
pub trait RangeSource {
    /// Ids between `from` and `to` inclusive, in display order. `None` when
    /// either endpoint is not displayed.
    fn nodes_in_range(&self, from: &str, to: &str) -> Option<Vec<String>>;

    /// Ids of the leaf rows below `id`, depth first.
    fn leaf_descendants(&self, id: &str) -> Vec<String>;
}

/// Result of moving a range endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangePartition {
    /// Rows that take the new selection value.
    pub keep: Vec<String>,
    /// Rows that fell out of the range.
    pub discard: Vec<String>,
}

impl RangePartition {
    fn keep(keep: Vec<String>) -> Self {
        Self {
            keep,
            discard: Vec::new(),
        }
    }
}

/// Anchor/extension pair for range selection.
#[derive(Debug, Clone, Default)]
pub struct RangeSelectionContext {
    root: Option<String>,
    end: Option<String>,
    cached_range: Vec<String>,
}

impl RangeSelectionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget both endpoints.
    pub fn reset(&mut self) {
        self.root = None;
        self.end = None;
        self.cached_range.clear();
    }

    /// Anchor a new range at `id`.
    pub fn set_root(&mut self, id: impl Into<String>) {
        self.root = Some(id.into());
        self.end = None;
        self.cached_range.clear();
    }

    pub fn set_end_range(&mut self, id: impl Into<String>) {
        self.end = Some(id.into());
        self.cached_range.clear();
    }

    #[must_use]
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    #[must_use]
    pub fn end(&self) -> Option<&str> {
        self.end.as_deref()
    }

    /// Ids from anchor to extension in display order; empty until both are set.
    pub fn range<R: RangeSource + ?Sized>(&mut self, source: &R) -> &[String] {
        if self.cached_range.is_empty() {
            if let (Some(root), Some(end)) = (&self.root, &self.end) {
                self.cached_range = source.nodes_in_range(root, end).unwrap_or_default();
            }
        }
        &self.cached_range
    }

    pub fn is_in_range<R: RangeSource + ?Sized>(&mut self, source: &R, id: &str) -> bool {
        self.root.is_some() && self.range(source).iter().any(|n| n == id)
    }

    /// Shrink the range so it ends at `id`. `keep` runs from the anchor
    /// through `id`; `discard` is what lay beyond it.
    pub fn truncate<R: RangeSource + ?Sized>(&mut self, source: &R, id: &str) -> RangePartition {
        let root = self.root.clone();
        let range = self.range(source).to_vec();
        let Some(position) = range.iter().position(|n| n == id) else {
            return RangePartition::keep(range);
        };

        let anchored_first = range.first().map(String::as_str) == root.as_deref();
        let (keep, discard) = if anchored_first {
            let (keep, beyond) = range.split_at(position + 1);
            (keep.to_vec(), beyond.to_vec())
        } else {
            let (beyond, keep) = range.split_at(position);
            (keep.to_vec(), beyond.to_vec())
        };
        self.set_end_range(id);
        trace!(keep = keep.len(), discard = discard.len(), "range truncated");
        RangePartition { keep, discard }
    }

    /// Move the extension to `id`. With no anchor, `id` becomes the anchor
    /// and, when `include_children` is set, its leaf descendants are kept too.
    pub fn extend<R: RangeSource + ?Sized>(
        &mut self,
        source: &R,
        id: &str,
        include_children: bool,
    ) -> RangePartition {
        let Some(root) = self.root.clone() else {
            let mut keep = self.range(source).to_vec();
            if include_children {
                keep.extend(source.leaf_descendants(id));
            }
            keep.push(id.to_owned());
            self.set_root(id);
            return RangePartition::keep(keep);
        };

        let Some(new_range) = source.nodes_in_range(&root, id) else {
            self.set_root(id);
            return RangePartition::keep(vec![id.to_owned()]);
        };

        let grows = self
            .end
            .as_deref()
            .is_some_and(|end| new_range.iter().any(|n| n == end));
        if grows {
            self.set_end_range(id);
            return RangePartition::keep(self.range(source).to_vec());
        }

        let discard = self.range(source).to_vec();
        self.set_end_range(id);
        RangePartition {
            keep: self.range(source).to_vec(),
            discard,
        }
    }
}
