//! Groups a flat file list into a directory tree.
//!
//! Nodes live in a flat arena and refer to their children by index.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

pub type NodeId = usize;

pub const SYNTHETIC_ROOT_NAME: &str = "project";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTreeNode {
    pub name: String,
    pub kind: NodeKind,
    /// Sorted by name.
    pub children: Vec<NodeId>,
    /// Index into the input list, set on file nodes only.
    pub file_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTree {
    nodes: Vec<FileTreeNode>,
    root: NodeId,
}

impl FileTree {
    /// Builds the tree for `paths`. Files sharing one parent directory hang
    /// off that directory; otherwise a synthetic root gets one child per
    /// distinct directory, named relative to the directories' common ancestor.
    pub fn build<P: AsRef<Path>>(paths: &[P]) -> FileTree {
        let mut by_dir: BTreeMap<PathBuf, Vec<(String, usize)>> = BTreeMap::new();
        for (index, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned());
            by_dir.entry(dir).or_default().push((name, index));
        }

        let mut tree = FileTree {
            nodes: Vec::new(),
            root: 0,
        };

        if by_dir.len() == 1 {
            if let Some((dir, files)) = by_dir.into_iter().next() {
                let root = tree.push_directory(directory_label(&dir));
                tree.root = root;
                tree.attach_files(root, files);
            }
            log::debug!("Built file tree with {} node(s) under one directory.", tree.nodes.len());
            return tree;
        }

        let root = tree.push_directory(SYNTHETIC_ROOT_NAME.to_string());
        tree.root = root;
        let ancestor = common_ancestor(by_dir.keys());
        for (dir, files) in by_dir {
            let relative = dir.strip_prefix(&ancestor).unwrap_or(&dir);
            let name = if relative.as_os_str().is_empty() {
                directory_label(&dir)
            } else {
                relative.to_string_lossy().into_owned()
            };
            let child = tree.push_directory(name);
            tree.insert_child(root, child);
            tree.attach_files(child, files);
        }
        log::debug!(
            "Built file tree with {} node(s) under a synthetic root.",
            tree.nodes.len()
        );
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &FileTreeNode {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[FileTreeNode] {
        &self.nodes
    }

    /// File nodes in depth-first order.
    pub fn leaves(&self) -> Vec<&FileTreeNode> {
        let mut out = Vec::new();
        self.walk(self.root, 0, &mut |node, _| {
            if node.kind == NodeKind::File {
                out.push(node);
            }
        });
        out
    }

    /// Two-space indented listing; directories carry a trailing `/`.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        self.walk(self.root, 0, &mut |node, depth| {
            for _ in 0..depth {
                out.push_str("  ");
            }
            out.push_str(&node.name);
            if node.kind == NodeKind::Directory {
                out.push('/');
            }
            out.push('\n');
        });
        out
    }

    fn walk<'a>(&'a self, id: NodeId, depth: usize, visit: &mut dyn FnMut(&'a FileTreeNode, usize)) {
        let node = &self.nodes[id];
        visit(node, depth);
        for &child in &node.children {
            self.walk(child, depth + 1, visit);
        }
    }

    fn push_directory(&mut self, name: String) -> NodeId {
        self.nodes.push(FileTreeNode {
            name,
            kind: NodeKind::Directory,
            children: Vec::new(),
            file_index: None,
        });
        self.nodes.len() - 1
    }

    fn attach_files(&mut self, parent: NodeId, files: Vec<(String, usize)>) {
        for (name, index) in files {
            self.nodes.push(FileTreeNode {
                name,
                kind: NodeKind::File,
                children: Vec::new(),
                file_index: Some(index),
            });
            let id = self.nodes.len() - 1;
            self.insert_child(parent, id);
        }
    }

    fn insert_child(&mut self, parent: NodeId, child: NodeId) {
        let name = self.nodes[child].name.clone();
        let nodes = &self.nodes;
        let position = match self.nodes[parent]
            .children
            .binary_search_by(|&existing| nodes[existing].name.as_str().cmp(name.as_str()))
        {
            Ok(found) => found + 1,
            Err(insertion_point) => insertion_point,
        };
        self.nodes[parent].children.insert(position, child);
    }
}

fn directory_label(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| {
            let display = dir.to_string_lossy();
            if display.is_empty() {
                ".".to_string()
            } else {
                display.into_owned()
            }
        })
}

fn common_ancestor<'a>(mut dirs: impl Iterator<Item = &'a PathBuf>) -> PathBuf {
    let Some(first) = dirs.next() else {
        return PathBuf::new();
    };
    let mut prefix: Vec<Component<'a>> = first.components().collect();
    for dir in dirs {
        let shared = prefix
            .iter()
            .zip(dir.components())
            .take_while(|(a, b)| **a == *b)
            .count();
        prefix.truncate(shared);
    }
    prefix.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_directory_becomes_root() {
        let tree = FileTree::build(&["src/b.rs", "src/a.rs"]);
        let root = tree.node(tree.root());
        assert_eq!(root.name, "src");
        assert_eq!(root.kind, NodeKind::Directory);
        assert_eq!(tree.render_text(), "src/\n  a.rs\n  b.rs\n");
    }

    #[test]
    fn files_without_directory_use_dot_root() {
        let tree = FileTree::build(&["a.py", "b.txt"]);
        assert_eq!(tree.render_text(), "./\n  a.py\n  b.txt\n");
    }

    #[test]
    fn multiple_directories_get_synthetic_root() {
        let tree = FileTree::build(&[
            "/work/app/tests/it.rs",
            "/work/app/src/main.rs",
            "/work/app/src/lib.rs",
        ]);
        assert_eq!(tree.node(tree.root()).name, SYNTHETIC_ROOT_NAME);
        assert_eq!(
            tree.render_text(),
            "project/\n  src/\n    lib.rs\n    main.rs\n  tests/\n    it.rs\n"
        );
    }

    #[test]
    fn leaves_map_onto_inputs_one_to_one() {
        let paths = ["x/one.md", "y/two.md", "x/three.md"];
        let tree = FileTree::build(&paths);
        let mut indices: Vec<usize> = tree
            .leaves()
            .iter()
            .map(|leaf| leaf.file_index.unwrap())
            .collect();
        indices.sort();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn nested_directory_keeps_ancestor_name() {
        let tree = FileTree::build(&["/r/top.rs", "/r/sub/inner.rs"]);
        assert_eq!(tree.render_text(), "project/\n  r/\n    top.rs\n  sub/\n    inner.rs\n");
    }

    #[test]
    fn empty_input_is_an_empty_synthetic_root() {
        let tree = FileTree::build::<&str>(&[]);
        assert_eq!(tree.render_text(), "project/\n");
        assert!(tree.leaves().is_empty());
    }
}
