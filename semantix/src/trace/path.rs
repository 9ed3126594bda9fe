//! Call-stack listings shared between steps
//!
//! Consecutive steps almost always see the same stack, and a pushed frame
//! only extends its caller's listing, so a listing is a persistent list of
//! labels with the innermost frame at the head.

use serde::{Serialize, Serializer};
use std::fmt;
use std::rc::Rc;

#[derive(Debug)]
struct Node {
    label: String,
    len: usize,
    parent: Option<Rc<Node>>,
}

/// Frame labels of one step, outermost first when listed
#[derive(Clone, Default)]
pub struct CallPath {
    head: Option<Rc<Node>>,
}

impl CallPath {
    /// A listing holding only `label`
    pub fn root(label: impl Into<String>) -> Self {
        CallPath::default().child(label)
    }

    /// This listing with `label` pushed as the innermost frame
    pub fn child(&self, label: impl Into<String>) -> Self {
        CallPath {
            head: Some(Rc::new(Node {
                label: label.into(),
                len: self.len() + 1,
                parent: self.head.clone(),
            })),
        }
    }

    /// This listing without its innermost frame
    pub fn parent(&self) -> Self {
        CallPath {
            head: self.head.as_ref().and_then(|node| node.parent.clone()),
        }
    }

    pub fn len(&self) -> usize {
        self.head.as_ref().map_or(0, |node| node.len)
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn innermost(&self) -> Option<&str> {
        self.head.as_ref().map(|node| node.label.as_str())
    }

    /// Labels from outermost to innermost
    pub fn labels(&self) -> Vec<&str> {
        let mut labels = Vec::with_capacity(self.len());
        let mut node = self.head.as_deref();
        while let Some(n) = node {
            labels.push(n.label.as_str());
            node = n.parent.as_deref();
        }
        labels.reverse();
        labels
    }
}

impl<S: Into<String>> FromIterator<S> for CallPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        iter.into_iter()
            .fold(CallPath::default(), |path, label| path.child(label))
    }
}

impl PartialEq for CallPath {
    fn eq(&self, other: &Self) -> bool {
        match (&self.head, &other.head) {
            (Some(a), Some(b)) if Rc::ptr_eq(a, b) => true,
            _ => self.len() == other.len() && self.labels() == other.labels(),
        }
    }
}

impl PartialEq<Vec<&str>> for CallPath {
    fn eq(&self, other: &Vec<&str>) -> bool {
        self.len() == other.len() && self.labels() == *other
    }
}

impl fmt::Debug for CallPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.labels()).finish()
    }
}

impl Serialize for CallPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.labels())
    }
}

impl Drop for CallPath {
    // Unlink iteratively so dropping a long listing cannot recurse deeply
    fn drop(&mut self) {
        let mut head = self.head.take();
        while let Some(node) = head {
            head = match Rc::try_unwrap(node) {
                Ok(mut node) => node.parent.take(),
                Err(_) => None,
            };
        }
    }
}
