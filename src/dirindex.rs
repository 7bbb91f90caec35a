use crate::cleanpath::parent;
use std::collections::{BTreeMap, BTreeSet};

/// The synthetic directories of a [`ContentStore`].
///
/// Every ancestor directory of every stored path has an entry here.
/// Directories own no data; they exist to answer "is this a
/// directory?" and "what does it contain?".
///
/// [`ContentStore`]: crate::ContentStore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirIndex {
    dirs: BTreeSet<String>,
}

/// A name directly inside a directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Child {
    pub name: String,
    pub is_dir: bool,
}

impl DirIndex {
    /// Create an index containing only the root directory.
    pub fn new() -> Self {
        DirIndex {
            dirs: BTreeSet::from(["/".to_string()]),
        }
    }

    /// Make sure `dir` and all its ancestors exist.
    ///
    /// Stops walking upward as soon as an existing directory is found,
    /// so adding many files in one directory is cheap.
    pub fn ensure(&mut self, dir: &str) {
        let mut dir = dir;
        while self.dirs.insert(dir.to_string()) {
            dir = parent(dir);
        }
    }

    pub fn contains(&self, dir: &str) -> bool {
        self.dirs.contains(dir)
    }

    /// Number of directories, including the root.
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    /// The names of entries directly inside `dir`, sorted by name.
    ///
    /// Both the directories of this index and the `files` (keyed by
    /// clean absolute path) are considered.
    pub fn children<V>(
        &self,
        dir: &str,
        files: &BTreeMap<String, V>,
    ) -> Vec<Child> {
        let prefix = if dir == "/" {
            dir.to_string()
        } else {
            format!("{dir}/")
        };
        let file_names = files.range(prefix.clone()..).map(|(k, _)| k);
        let mut result = immediate(&prefix, self.dirs.range(prefix.clone()..))
            .map(|name| Child {
                name: name.to_string(),
                is_dir: true,
            })
            .chain(immediate(&prefix, file_names).map(|name| Child {
                name: name.to_string(),
                is_dir: false,
            }))
            .collect::<Vec<_>>();
        result.sort();
        result
    }
}

impl Default for DirIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Names of the keys (in sorted order, starting at `prefix`) that are
/// directly below `prefix`.
fn immediate<'a>(
    prefix: &'a str,
    keys: impl Iterator<Item = &'a String> + 'a,
) -> impl Iterator<Item = &'a str> + 'a {
    keys.take_while(move |k| k.starts_with(prefix))
        .map(move |k| &k[prefix.len()..])
        .filter(|rest| !rest.is_empty() && !rest.contains('/'))
}

#[cfg(test)]
mod test {
    use super::*;

    fn names(children: &[Child]) -> Vec<&str> {
        children.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn root_always_exists() {
        let index = DirIndex::new();
        assert!(index.contains("/"));
        assert_eq!(index.len(), 1);
        assert!(index.children("/", &BTreeMap::<String, ()>::new()).is_empty());
    }

    #[test]
    fn ensure_creates_ancestors() {
        let mut index = DirIndex::new();
        index.ensure("/a/b");
        assert!(index.contains("/a"));
        assert!(index.contains("/a/b"));
        assert!(!index.contains("/b"));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn ensure_is_idempotent() {
        let mut index = DirIndex::new();
        index.ensure("/a/b");
        let once = index.clone();
        index.ensure("/a/b");
        index.ensure("/a");
        assert_eq!(index, once);
    }

    #[test]
    fn children_are_immediate() {
        let mut index = DirIndex::new();
        index.ensure("/a/b");
        index.ensure("/ab");
        let files = BTreeMap::from([
            ("/a/b/c.txt".to_string(), ()),
            ("/a/x.css".to_string(), ()),
            ("/top.html".to_string(), ()),
        ]);
        let top_children = index.children("/", &files);
        let top = names(&top_children);
        assert_eq!(top, ["a", "ab", "top.html"]);
        assert_eq!(
            index.children("/a", &files),
            [
                Child {
                    name: "b".into(),
                    is_dir: true
                },
                Child {
                    name: "x.css".into(),
                    is_dir: false
                },
            ],
        );
        assert_eq!(names(&index.children("/a/b", &files)), ["c.txt"]);
        assert!(index.children("/ab", &files).is_empty());
    }
}
