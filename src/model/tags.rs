use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

use serde::{Deserialize, Serialize};

pub const MAX_TAGS: usize = 31;

/// Bitset over the configured tags: bit `i` is tag `i`.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(transparent)]
pub struct TagMask(u32);

impl TagMask {
    pub const EMPTY: TagMask = TagMask(0);

    pub const fn from_bits(bits: u32) -> Self { TagMask(bits) }

    pub const fn bits(self) -> u32 { self.0 }

    /// Mask with only tag `index` set.
    pub fn single(index: usize) -> Self {
        debug_assert!(index < MAX_TAGS);
        TagMask(1 << index)
    }

    /// All-ones mask over the first `count` tags.
    pub fn all(count: usize) -> Self {
        let count = count.min(MAX_TAGS);
        TagMask(((1u64 << count) - 1) as u32)
    }

    pub fn is_empty(self) -> bool { self.0 == 0 }

    pub fn contains(self, index: usize) -> bool { index < MAX_TAGS && self.0 & (1 << index) != 0 }

    pub fn intersects(self, other: TagMask) -> bool { self.0 & other.0 != 0 }

    pub fn first(self) -> Option<usize> {
        if self.is_empty() {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }

    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..MAX_TAGS).filter(move |i| self.contains(*i))
    }
}

impl BitOr for TagMask {
    type Output = TagMask;

    fn bitor(self, rhs: TagMask) -> TagMask { TagMask(self.0 | rhs.0) }
}

impl BitAnd for TagMask {
    type Output = TagMask;

    fn bitand(self, rhs: TagMask) -> TagMask { TagMask(self.0 & rhs.0) }
}

impl BitXor for TagMask {
    type Output = TagMask;

    fn bitxor(self, rhs: TagMask) -> TagMask { TagMask(self.0 ^ rhs.0) }
}

impl Not for TagMask {
    type Output = TagMask;

    fn not(self) -> TagMask { TagMask(!self.0) }
}

impl fmt::Debug for TagMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagMask({:#b})", self.0)
    }
}

/// Refers to tags in configuration and commands, either by 0-based index or by
/// name. The name `"*"` selects every tag.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Eq)]
#[serde(untagged)]
pub enum TagSelector {
    Index(usize),
    Name(String),
}

pub const ALL_TAGS: &str = "*";

/// The ordered, fixed set of tag names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet {
    names: Vec<String>,
}

impl TagSet {
    /// Truncates to [`MAX_TAGS`] names; an empty list falls back to one tag.
    pub fn new(names: Vec<String>) -> Self {
        let mut names = names;
        names.truncate(MAX_TAGS);
        if names.is_empty() {
            names.push("1".to_string());
        }
        Self { names }
    }

    pub fn len(&self) -> usize { self.names.len() }

    pub fn is_empty(&self) -> bool { self.names.is_empty() }

    pub fn names(&self) -> &[String] { &self.names }

    pub fn name(&self, index: usize) -> Option<&str> { self.names.get(index).map(String::as_str) }

    pub fn all(&self) -> TagMask { TagMask::all(self.names.len()) }

    /// Drops bits that do not correspond to a configured tag.
    pub fn clamp(&self, mask: TagMask) -> TagMask { mask & self.all() }

    pub fn resolve(&self, selector: &TagSelector) -> Option<TagMask> {
        match selector {
            TagSelector::Index(i) if *i < self.len() => Some(TagMask::single(*i)),
            TagSelector::Index(_) => None,
            TagSelector::Name(name) if name == ALL_TAGS => Some(self.all()),
            TagSelector::Name(name) => {
                self.names.iter().position(|n| n == name).map(TagMask::single)
            }
        }
    }
}

impl Default for TagSet {
    fn default() -> Self { Self::new((1..=9).map(|i| i.to_string()).collect()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five() -> TagSet { TagSet::new(["1", "2", "3", "4", "5"].map(String::from).to_vec()) }

    #[test]
    fn all_mask_covers_configured_tags() {
        assert_eq!(five().all(), TagMask::from_bits(0b11111));
        assert_eq!(TagMask::all(MAX_TAGS).bits(), 0x7fff_ffff);
    }

    #[test]
    fn clamp_drops_unknown_bits() {
        assert_eq!(five().clamp(!TagMask::EMPTY), five().all());
        assert!(five().clamp(TagMask::single(7)).is_empty());
    }

    #[test]
    fn resolve_by_index_name_and_wildcard() {
        let tags = five();
        assert_eq!(tags.resolve(&TagSelector::Index(1)), Some(TagMask::single(1)));
        assert_eq!(tags.resolve(&TagSelector::Index(5)), None);
        assert_eq!(tags.resolve(&TagSelector::Name("3".into())), Some(TagMask::single(2)));
        assert_eq!(tags.resolve(&TagSelector::Name("*".into())), Some(tags.all()));
        assert_eq!(tags.resolve(&TagSelector::Name("web".into())), None);
    }

    #[test]
    fn xor_is_self_inverse() {
        let viewed = TagMask::from_bits(0b101);
        let toggle = TagMask::single(1);
        assert_eq!((viewed ^ toggle) ^ toggle, viewed);
    }

    #[test]
    fn iter_and_first() {
        let mask = TagMask::from_bits(0b10100);
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(mask.first(), Some(2));
        assert_eq!(TagMask::EMPTY.first(), None);
    }

    #[test]
    fn empty_tag_list_falls_back_to_one_tag() {
        let tags = TagSet::new(Vec::new());
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.all(), TagMask::single(0));
    }
}
