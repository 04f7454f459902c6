//! Flat rendered sequence and the translation between flat positions and
//! logical item indexes.
//!
//! The flat sequence interleaves section headers with item rows:
//!
//! ```text
//! pos  element                    logical
//!  0   Header(high)
//!  1   ItemRef { sb: 1 }           0
//!  2   ItemRef { sb: 1 }           1
//!  3   Header(doing)
//!  4   ItemRef { sb: 2 }           2
//! ```
//!
//! Every item row caches `sections_before`, the number of headers above it,
//! so `logical = pos - sections_before` without scanning.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use super::classify::{SectionClassifier, SectionKey};

/// One row of the flat sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatElement {
    Header(SectionKey),
    ItemRef {
        item_index: usize,
        sections_before: usize,
    },
}

impl FlatElement {
    pub fn is_header(&self) -> bool {
        matches!(self, FlatElement::Header(_))
    }

    /// The section key if this row is a header
    pub fn header(&self) -> Option<&SectionKey> {
        match self {
            FlatElement::Header(key) => Some(key),
            FlatElement::ItemRef { .. } => None,
        }
    }
}

/// A broken structural invariant. Returned by `verify`; the engine asserts
/// on it in debug builds after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("item row at position {0} has no header above it")]
    OrphanItem(usize),
    #[error("consecutive headers at positions {0} and {1}")]
    ConsecutiveHeaders(usize, usize),
    #[error("header for section {0} has no items")]
    TrailingHeader(String),
    #[error("section {section} has a second header at position {pos}")]
    DuplicateHeader { section: String, pos: usize },
    #[error("item row at {pos}: sections_before is {found}, expected {expected}")]
    StaleSectionCount {
        pos: usize,
        found: usize,
        expected: usize,
    },
    #[error("item row at {pos}: item_index is {found}, expected {expected}")]
    StaleItemIndex {
        pos: usize,
        found: usize,
        expected: usize,
    },
    #[error("flat sequence holds {found} items, collection holds {expected}")]
    ItemCountMismatch { found: usize, expected: usize },
    #[error("position round trip failed at flat position {0}")]
    RoundTrip(usize),
    #[error("order keys not strictly increasing in section {section} at item {index}")]
    OrderKeys { section: String, index: usize },
}

/// Where an item row goes when it is inserted at a logical index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Placement {
    /// Flat position of the new item row
    pub item_pos: usize,
    /// Flat position of a header that has to be created with it
    pub new_header: Option<usize>,
}

/// Rows touched by an item removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Removal {
    pub item_pos: usize,
    /// Position of the emptied header, removed along with the item
    pub header_pos: Option<usize>,
}

/// Owner of the flat sequence and its header bookkeeping
#[derive(Debug, Clone, Default)]
pub struct FlatSequenceIndex {
    flat: Vec<FlatElement>,
}

impl FlatSequenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.flat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }

    pub fn elements(&self) -> &[FlatElement] {
        &self.flat
    }

    pub fn get(&self, pos: usize) -> Option<&FlatElement> {
        self.flat.get(pos)
    }

    /// Clear and rebuild from `items`, emitting a header whenever the
    /// section differs from the previous item's. Panics on ungrouped items
    /// like [`append`](Self::append), leaving the old sequence in place.
    pub fn rebuild<T, C>(&mut self, items: &[T], classifier: &C)
    where
        C: SectionClassifier<T> + ?Sized,
    {
        let mut rebuilt = FlatSequenceIndex::new();
        rebuilt.append(items, 0, classifier);
        *self = rebuilt;
    }

    /// Extend the sequence with `items`, whose logical indexes start at
    /// `first_index`, continuing from the last header already present.
    /// Returns the number of rows added, headers included.
    ///
    /// # Panics
    ///
    /// Panics if `items` are not grouped by section: a section may continue
    /// the last one shown, but one that already has a header cannot open
    /// again further down. Nothing is added in that case.
    pub fn append<T, C>(&mut self, items: &[T], first_index: usize, classifier: &C) -> usize
    where
        C: SectionClassifier<T> + ?Sized,
    {
        let keys: Vec<SectionKey> = items.iter().map(|item| classifier.classify(item)).collect();
        let mut shown: HashSet<&SectionKey> =
            self.flat.iter().filter_map(FlatElement::header).collect();
        let mut last = self.last_section();
        for (offset, key) in keys.iter().enumerate() {
            if last != Some(key) {
                assert!(
                    shown.insert(key),
                    "item {} reopens section {}; items must be grouped by section",
                    first_index + offset,
                    key.id
                );
                last = Some(key);
            }
        }

        let before = self.flat.len();
        let mut last = self.last_section().cloned();
        let mut sections = self.headers_before(before);
        for (offset, key) in keys.into_iter().enumerate() {
            if last.as_ref() != Some(&key) {
                self.flat.push(FlatElement::Header(key.clone()));
                sections += 1;
                last = Some(key);
            }
            self.flat.push(FlatElement::ItemRef {
                item_index: first_index + offset,
                sections_before: sections,
            });
        }
        self.flat.len() - before
    }

    /// Logical index for a flat position.
    ///
    /// For a header this is the index the first item below it has, i.e. the
    /// number of items above the header.
    pub fn logical_index_of(&self, pos: usize) -> usize {
        match &self.flat[pos] {
            FlatElement::ItemRef {
                sections_before, ..
            } => pos - sections_before,
            FlatElement::Header(_) => self.flat[..pos]
                .iter()
                .rev()
                .find_map(|e| match e {
                    FlatElement::ItemRef { item_index, .. } => Some(item_index + 1),
                    FlatElement::Header(_) => None,
                })
                .unwrap_or(0),
        }
    }

    /// Flat position of the item row with the given logical index.
    ///
    /// Scans forward from `logical`, since a row can never sit above its own
    /// logical index.
    pub fn flat_position_of(&self, logical: usize) -> Option<usize> {
        (logical..self.flat.len()).find(|&pos| match self.flat[pos] {
            FlatElement::ItemRef {
                sections_before, ..
            } => pos.checked_sub(sections_before) == Some(logical),
            FlatElement::Header(_) => false,
        })
    }

    /// Number of item rows in `flat[..pos]`
    pub fn items_before(&self, pos: usize) -> usize {
        if pos >= self.flat.len() {
            return self.item_count();
        }
        self.logical_index_of(pos)
    }

    /// Number of item rows in the whole sequence
    pub fn item_count(&self) -> usize {
        self.flat.len() - self.headers_before(self.flat.len())
    }

    /// Number of headers in `flat[..pos]`
    pub fn headers_before(&self, pos: usize) -> usize {
        let mut headers = 0;
        for p in (0..pos.min(self.flat.len())).rev() {
            match &self.flat[p] {
                FlatElement::ItemRef {
                    sections_before, ..
                } => return sections_before + headers,
                FlatElement::Header(_) => headers += 1,
            }
        }
        headers
    }

    /// Section that the row at `pos` belongs to (a header belongs to itself)
    pub fn section_at(&self, pos: usize) -> Option<&SectionKey> {
        self.flat[..=pos].iter().rev().find_map(FlatElement::header)
    }

    /// Flat position of the header for `section`
    pub fn header_position(&self, section: &SectionKey) -> Option<usize> {
        self.flat.iter().position(|e| e.header() == Some(section))
    }

    /// Header position and flat item range of the section containing `pos`
    pub fn section_span(&self, pos: usize) -> Option<(usize, Range<usize>)> {
        let header = (0..=pos).rev().find(|&p| self.flat[p].is_header())?;
        let end = (header + 1..self.flat.len())
            .find(|&p| self.flat[p].is_header())
            .unwrap_or(self.flat.len());
        Some((header, header + 1..end))
    }

    /// Logical index range of the items in the section containing `pos`
    pub fn section_logical_range(&self, pos: usize) -> Option<Range<usize>> {
        let (header, items) = self.section_span(pos)?;
        let start = self.logical_index_of(header);
        Some(start..start + items.len())
    }

    /// Sections in display order with their item counts
    pub fn sections(&self) -> Vec<(SectionKey, usize)> {
        let mut out: Vec<(SectionKey, usize)> = Vec::new();
        for element in &self.flat {
            match element {
                FlatElement::Header(key) => out.push((key.clone(), 0)),
                FlatElement::ItemRef { .. } => {
                    if let Some(last) = out.last_mut() {
                        last.1 += 1;
                    }
                }
            }
        }
        out
    }

    /// Resolve a drag frame "the row at `from` now sits at `to`" into the
    /// logical index and section the item ends up in.
    ///
    /// The section is the one of the row directly above the new position.
    /// Returns `None` when there is no row above (`to == 0`).
    pub fn resolve_move(&self, from: usize, to: usize) -> Option<(usize, SectionKey)> {
        if to == 0 {
            return None;
        }
        let above = if to <= from { to - 1 } else { to };
        let section = self.section_at(above)?.clone();
        let logical = if to <= from {
            self.items_before(to)
        } else {
            self.items_before(to + 1) - 1
        };
        Some((logical, section))
    }

    /// Where an item inserted at `logical` in `section` would go.
    ///
    /// The item joins the run of `section` next to its logical neighbours.
    /// When `section` has no header yet, one is created at the boundary
    /// between the neighbours. Returns `None` when the placement would split
    /// another section or put the item outside the existing run of `section`.
    pub(crate) fn placement(&self, logical: usize, section: &SectionKey) -> Option<Placement> {
        let prev = match logical {
            0 => None,
            n => Some(self.flat_position_of(n - 1)?),
        };
        let next = self.flat_position_of(logical);

        if let Some(p) = prev
            && self.section_at(p) == Some(section)
        {
            return Some(Placement {
                item_pos: p + 1,
                new_header: None,
            });
        }
        if let Some(n) = next
            && self.section_at(n) == Some(section)
        {
            return Some(Placement {
                item_pos: n,
                new_header: None,
            });
        }

        if self.header_position(section).is_some() {
            return None;
        }
        let boundary = prev.map_or(0, |p| p + 1);
        // a new section may only start where the next row is a header
        if boundary < self.flat.len() && !self.flat[boundary].is_header() {
            return None;
        }
        Some(Placement {
            item_pos: boundary + 1,
            new_header: Some(boundary),
        })
    }

    /// Insert an item row for `logical` into `section`.
    ///
    /// Later rows are renumbered: item indexes shift up by one and, when a
    /// header was created, section counts too.
    ///
    /// # Panics
    ///
    /// Panics if `placement` rejects the target.
    pub(crate) fn insert_item(&mut self, logical: usize, section: &SectionKey) -> Placement {
        let placement = self.placement(logical, section).unwrap_or_else(|| {
            panic!(
                "cannot place item {} in section {}: not adjacent to its run",
                logical, section.id
            )
        });
        let header_added = usize::from(placement.new_header.is_some());
        if let Some(h) = placement.new_header {
            self.flat.insert(h, FlatElement::Header(section.clone()));
        }
        let sections_before = self.headers_before(placement.item_pos);
        self.flat.insert(
            placement.item_pos,
            FlatElement::ItemRef {
                item_index: logical,
                sections_before,
            },
        );
        for element in &mut self.flat[placement.item_pos + 1..] {
            if let FlatElement::ItemRef {
                item_index,
                sections_before,
            } = element
            {
                *item_index += 1;
                *sections_before += header_added;
            }
        }
        placement
    }

    /// Remove the item row at `pos`, and its header if the section is left
    /// empty. Every later item row has its index decremented, and its
    /// section count too when a header went away.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is not an item row.
    pub(crate) fn remove_item(&mut self, pos: usize) -> Removal {
        assert!(
            !self.flat[pos].is_header(),
            "flat position {} is a header, not an item",
            pos
        );
        self.flat.remove(pos);

        let emptied = pos > 0
            && self.flat[pos - 1].is_header()
            && self.flat.get(pos).is_none_or(FlatElement::is_header);
        let header_pos = if emptied {
            self.flat.remove(pos - 1);
            Some(pos - 1)
        } else {
            None
        };

        let start = header_pos.unwrap_or(pos);
        let header_removed = usize::from(header_pos.is_some());
        for element in &mut self.flat[start..] {
            if let FlatElement::ItemRef {
                item_index,
                sections_before,
            } = element
            {
                *item_index -= 1;
                *sections_before -= header_removed;
            }
        }
        Removal {
            item_pos: pos,
            header_pos,
        }
    }

    /// Check every structural invariant against a collection of
    /// `item_count` items.
    pub fn verify(&self, item_count: usize) -> Result<(), InvariantViolation> {
        let mut headers = 0usize;
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut items = 0usize;
        for (pos, element) in self.flat.iter().enumerate() {
            match element {
                FlatElement::Header(key) => {
                    if pos > 0 && self.flat[pos - 1].is_header() {
                        return Err(InvariantViolation::ConsecutiveHeaders(pos - 1, pos));
                    }
                    if seen.insert(key.id.as_str(), pos).is_some() {
                        return Err(InvariantViolation::DuplicateHeader {
                            section: key.id.clone(),
                            pos,
                        });
                    }
                    headers += 1;
                }
                FlatElement::ItemRef {
                    item_index,
                    sections_before,
                } => {
                    if headers == 0 {
                        return Err(InvariantViolation::OrphanItem(pos));
                    }
                    if *sections_before != headers {
                        return Err(InvariantViolation::StaleSectionCount {
                            pos,
                            found: *sections_before,
                            expected: headers,
                        });
                    }
                    if *item_index != items {
                        return Err(InvariantViolation::StaleItemIndex {
                            pos,
                            found: *item_index,
                            expected: items,
                        });
                    }
                    if self.flat_position_of(self.logical_index_of(pos)) != Some(pos) {
                        return Err(InvariantViolation::RoundTrip(pos));
                    }
                    items += 1;
                }
            }
        }
        if let Some(FlatElement::Header(key)) = self.flat.last() {
            return Err(InvariantViolation::TrailingHeader(key.id.clone()));
        }
        if items != item_count {
            return Err(InvariantViolation::ItemCountMismatch {
                found: items,
                expected: item_count,
            });
        }
        Ok(())
    }

    fn last_section(&self) -> Option<&SectionKey> {
        self.flat.iter().rev().find_map(FlatElement::header)
    }
}
