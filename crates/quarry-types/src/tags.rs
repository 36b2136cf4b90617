//! Event tags.
//!
//! A tag is an ordered list of strings where the first element is the tag
//! key and the second, when present, is the tag value. Anything beyond the
//! value is carried but not interpreted by the store.

use serde::{Deserialize, Serialize};

/// A single event tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(Vec<String>);

impl Tag {
    /// Builds a tag from its elements.
    pub fn new<I, S>(elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Tag(elements.into_iter().map(Into::into).collect())
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the tag has no elements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The tag key (first element).
    pub fn key(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// The tag value (second element).
    pub fn value(&self) -> Option<&str> {
        self.0.get(1).map(String::as_str)
    }

    /// All elements in order.
    pub fn elements(&self) -> &[String] {
        &self.0
    }
}

/// The ordered tag list of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<Tag>);

impl Tags {
    /// Builds a tag list.
    pub fn new(tags: Vec<Tag>) -> Self {
        Tags(tags)
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no tags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the tags in order.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    /// The value of the first tag with the given key.
    pub fn first_value(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|t| t.key() == Some(key))
            .and_then(Tag::value)
    }
}

impl FromIterator<Tag> for Tags {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Tags(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_value_picks_first_occurrence() {
        let tags = Tags::new(vec![
            Tag::new(["d", "alpha"]),
            Tag::new(["d", "beta"]),
            Tag::new(["e"]),
        ]);
        assert_eq!(tags.first_value("d"), Some("alpha"));
        assert_eq!(tags.first_value("e"), None);
        assert_eq!(tags.first_value("p"), None);
    }
}
