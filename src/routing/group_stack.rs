//! Stack of merged group attributes active during declaration.

use crate::routing::attributes::{merge, GroupAttributes};

/// Each frame holds the fully merged attributes of one open group.
#[derive(Debug, Default)]
pub struct GroupStack {
    frames: Vec<GroupAttributes>,
}

impl GroupStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, attributes: GroupAttributes) {
        self.frames.push(attributes);
    }

    pub fn pop(&mut self) -> Option<GroupAttributes> {
        self.frames.pop()
    }

    /// Attributes inherited by the next declaration; the empty record outside any group.
    pub fn peek(&self) -> &GroupAttributes {
        self.frames.last().unwrap_or(GroupAttributes::empty())
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Merge a declaration onto the current top without pushing it.
    pub fn merge_with_top(&self, attributes: GroupAttributes) -> GroupAttributes {
        merge(attributes, self.peek())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_empty_stack() {
        let stack = GroupStack::new();
        assert!(stack.is_empty());
        assert_eq!(stack.peek(), GroupAttributes::empty());
    }

    #[test]
    fn test_push_merge_pop() {
        let mut stack = GroupStack::new();
        let outer = stack.merge_with_top(GroupAttributes::new().version("v1").prefix("a"));
        stack.push(outer);
        let inner = stack.merge_with_top(GroupAttributes::new().prefix("b"));
        stack.push(inner);

        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.peek().prefix.as_deref(), Some("a/b"));
        assert!(stack.peek().version.contains("v1"));

        stack.pop();
        assert_eq!(stack.peek().prefix.as_deref(), Some("a"));
        stack.pop();
        assert!(stack.pop().is_none());
        assert!(stack.is_empty());
    }
}
