//! The selector's output: tiles that should currently be resident.

use crate::coord::TileAddress;

/// One tile the viewer wants, with its fetch priority (higher first).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WishlistEntry {
    pub address: TileAddress,
    pub priority: f64,
}

impl WishlistEntry {
    pub const fn new(address: TileAddress, priority: f64) -> Self {
        Self { address, priority }
    }
}

/// Ordered list of wanted tiles, produced once per camera update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wishlist {
    entries: Vec<WishlistEntry>,
}

impl Wishlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, address: TileAddress, priority: f64) {
        self.entries.push(WishlistEntry::new(address, priority));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WishlistEntry> {
        self.entries.iter()
    }

    pub fn addresses(&self) -> impl Iterator<Item = TileAddress> + '_ {
        self.entries.iter().map(|e| e.address)
    }

    /// True if `address` is an ancestor of, or equal to, some entry.
    ///
    /// A pending fetch for a covering tile is still useful as a fallback
    /// while the wanted tile loads; anything else is stale.
    pub fn covers(&self, address: &TileAddress) -> bool {
        self.entries
            .iter()
            .any(|e| address.includes_or_equals(&e.address))
    }

    /// Sorts entries by descending priority, keeping the order of equals.
    pub fn sort_by_priority(&mut self) {
        self.entries
            .sort_by(|a, b| b.priority.total_cmp(&a.priority));
    }
}

impl From<Vec<WishlistEntry>> for Wishlist {
    fn from(entries: Vec<WishlistEntry>) -> Self {
        Self { entries }
    }
}

impl FromIterator<WishlistEntry> for Wishlist {
    fn from_iter<I: IntoIterator<Item = WishlistEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Wishlist {
    type Item = &'a WishlistEntry;
    type IntoIter = std::slice::Iter<'a, WishlistEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
