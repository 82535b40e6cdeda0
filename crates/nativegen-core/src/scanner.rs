//! Declaration tree scanning.
//!
//! ## Algorithm Overview
//!
//! 1. Push the unit's root types onto a work stack in reverse order
//! 2. On first visit, re-push the node as expanded followed by its nested types
//! 3. On the expanded visit, count the node and apply the marker resolver
//!
//! Nested types are therefore resolved before their parent, every
//! declaration is visited exactly once, and an unmarked parent never hides
//! marked children.

use crate::error::Result;
use crate::model::{CompilationUnit, TypeDeclaration, TypeId};
use crate::resolver;
use std::iter::FusedIterator;
use tracing::trace;

/// A marked type paired with its resolved output-name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedType {
    /// The marked declaration
    pub id: TypeId,
    /// The marker's output-name
    pub output_name: String,
}

/// Lazy, single-pass scan over one compilation unit
///
/// Created by [`scan`]. Yields marked types in traversal order; the first
/// error ends the iteration.
#[derive(Debug)]
pub struct Scan<'a> {
    unit: &'a CompilationUnit,
    marker: &'a str,
    stack: Vec<(TypeId, bool)>,
    visited: usize,
    done: bool,
}

/// Starts a scan of `unit` for types carrying `marker`
pub fn scan<'a>(unit: &'a CompilationUnit, marker: &'a str) -> Scan<'a> {
    let stack = unit.roots().iter().rev().map(|&id| (id, false)).collect();
    Scan {
        unit,
        marker,
        stack,
        visited: 0,
        done: false,
    }
}

impl<'a> Scan<'a> {
    /// Number of declarations visited so far
    pub fn visited(&self) -> usize {
        self.visited
    }

    /// The unit being scanned
    pub fn unit(&self) -> &'a CompilationUnit {
        self.unit
    }

    /// Looks up a declaration of the scanned unit
    pub fn declaration(&self, id: TypeId) -> &'a TypeDeclaration {
        self.unit.get(id)
    }
}

impl Iterator for Scan<'_> {
    type Item = Result<MarkedType>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        while let Some((id, expanded)) = self.stack.pop() {
            if !expanded {
                self.stack.push((id, true));
                let nested = &self.unit.get(id).nested;
                self.stack.extend(nested.iter().rev().map(|&child| (child, false)));
                continue;
            }

            self.visited += 1;
            trace!("Visiting {}", self.unit.get(id).binary_name);
            match resolver::resolve(self.unit, id, self.marker) {
                Ok(Some(output_name)) => return Some(Ok(MarkedType { id, output_name })),
                Ok(None) => {}
                Err(e) => {
                    self.done = true;
                    self.stack.clear();
                    return Some(Err(e));
                }
            }
        }
        self.done = true;
        None
    }
}

impl FusedIterator for Scan<'_> {}
