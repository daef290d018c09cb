//! The program-counter (PC) scheme that synchronises peers without
//! explicit message IDs (SPEC_FULL.md §4.3).
//!
//! There is no direct teacher analogue (the teacher pairs sends/receives by
//! blocking call order alone, which this spec explicitly replaces with a
//! PC tag so that resharing protocols can have several in-flight rounds);
//! the hierarchical-counter design follows the spec's own description.

use std::cell::RefCell;
use std::rc::Rc;

/// A snapshot of the PC stack at send/receive time, i.e. the tag that pairs
/// a sent frame with its matching receive (SPEC_FULL.md §3, §4.5).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(Vec<u32>);

impl Tag {
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Encodes the tag as the `pc_size x u32` section of a wire frame
    /// (SPEC_FULL.md §6).
    pub fn to_be_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|c| c.to_be_bytes()).collect()
    }

    pub fn from_parts(parts: Vec<u32>) -> Self {
        Tag(parts)
    }
}

/// A hierarchical counter: a non-empty stack of `u32` counters. Every
/// runtime operation that sends or expects network data calls
/// [`ProgramCounter::increment`] before taking a [`Tag`] snapshot; every
/// compound operation forks before its body and unforks after, so sibling
/// calls get disjoint PC sub-trees regardless of how many sends each issues
/// (SPEC_FULL.md §4.3).
///
/// Single-threaded by design (SPEC_FULL.md §5): the stack lives behind a
/// plain `RefCell`, not a `Mutex`, since it is only ever touched from the
/// one task driving a player's runtime.
#[derive(Debug, Clone)]
pub struct ProgramCounter {
    stack: Rc<RefCell<Vec<u32>>>,
}

impl Default for ProgramCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramCounter {
    pub fn new() -> Self {
        Self {
            stack: Rc::new(RefCell::new(vec![0])),
        }
    }

    pub fn increment(&self) {
        let mut stack = self.stack.borrow_mut();
        let top = stack.last_mut().expect("PC stack is never empty");
        *top += 1;
    }

    pub fn fork(&self) {
        self.stack.borrow_mut().push(0);
    }

    pub fn unfork(&self) {
        let mut stack = self.stack.borrow_mut();
        stack.pop();
        assert!(!stack.is_empty(), "unfork popped the root PC frame");
    }

    /// Snapshots the current stack as a `Tag`.
    pub fn tag(&self) -> Tag {
        Tag(self.stack.borrow().clone())
    }

    /// Convenience for the common "increment then snapshot" sequence that
    /// every sending/receiving operation performs.
    pub fn next_tag(&self) -> Tag {
        self.increment();
        self.tag()
    }

    /// Runs `body` inside a fresh fork, always unforking afterwards (even on
    /// panic via the guard's `Drop`), matching the fork/unfork bracketing
    /// compound operations must apply around their nested sends.
    pub fn scoped<T>(&self, body: impl FnOnce() -> T) -> T {
        struct Unforker(ProgramCounter);
        impl Drop for Unforker {
            fn drop(&mut self) {
                self.0.unfork();
            }
        }
        self.fork();
        let _guard = Unforker(self.clone());
        body()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_produce_distinct_tags() {
        let pc = ProgramCounter::new();
        let t1 = pc.next_tag();
        let t2 = pc.next_tag();
        assert_ne!(t1, t2);
    }

    #[test]
    fn fork_unfork_restores_parent_counter() {
        let pc = ProgramCounter::new();
        pc.increment();
        let before = pc.tag();
        pc.scoped(|| {
            pc.increment();
            pc.increment();
        });
        let after = pc.tag();
        assert_eq!(before, after);
    }

    #[test]
    fn sibling_forks_get_disjoint_subtrees() {
        let pc = ProgramCounter::new();
        let mut tags_a = Vec::new();
        pc.scoped(|| {
            tags_a.push(pc.next_tag());
            tags_a.push(pc.next_tag());
        });
        let mut tags_b = Vec::new();
        pc.scoped(|| {
            tags_b.push(pc.next_tag());
        });
        for a in &tags_a {
            for b in &tags_b {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn two_independent_counters_executing_same_sequence_agree() {
        // Models two players running identical code: their PCs must produce
        // byte-identical tag sequences (SPEC_FULL.md §8 "Runtime determinism").
        let pc_a = ProgramCounter::new();
        let pc_b = ProgramCounter::new();
        let run = |pc: &ProgramCounter| -> Vec<Tag> {
            let mut tags = vec![pc.next_tag()];
            pc.scoped(|| {
                tags.push(pc.next_tag());
                tags.push(pc.next_tag());
            });
            tags.push(pc.next_tag());
            tags
        };
        assert_eq!(run(&pc_a), run(&pc_b));
    }
}
