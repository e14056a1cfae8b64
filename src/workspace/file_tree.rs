use std::collections::HashSet;

/// Errors from file tree edits.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("Invalid name: '{0}'")]
    InvalidName(String),
    #[error("No such file or folder: {0}")]
    NotFound(String),
    #[error("Not a folder: {0}")]
    NotAFolder(String),
    #[error("Not a file: {0}")]
    NotAFile(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    File { content: String },
    Folder { children: Vec<FileNode> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub id: u64,
    pub name: String,
    pub kind: NodeKind,
}

impl FileNode {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }
}

/// In-memory project tree shown beside the editor.
///
/// Nodes are addressed by slash-separated paths relative to the project
/// root (`src/index.js`). Names are unique within a folder. Nothing here
/// touches the sandbox.
pub struct FileExplorer {
    roots: Vec<FileNode>,
    expanded: HashSet<u64>,
    next_id: u64,
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty() && *s != ".").collect()
}

fn locate<'a>(nodes: &'a [FileNode], segments: &[&str]) -> Option<&'a FileNode> {
    let (first, rest) = segments.split_first()?;
    let node = nodes.iter().find(|n| n.name == *first)?;
    if rest.is_empty() {
        return Some(node);
    }
    match node.kind {
        NodeKind::Folder { ref children } => locate(children, rest),
        NodeKind::File { .. } => None,
    }
}

fn locate_mut<'a>(nodes: &'a mut [FileNode], segments: &[&str]) -> Option<&'a mut FileNode> {
    let (first, rest) = segments.split_first()?;
    let node = nodes.iter_mut().find(|n| n.name == *first)?;
    if rest.is_empty() {
        return Some(node);
    }
    match node.kind {
        NodeKind::Folder { ref mut children } => locate_mut(children, rest),
        NodeKind::File { .. } => None,
    }
}

fn collect_ids(node: &FileNode, ids: &mut Vec<u64>) {
    ids.push(node.id);
    if let NodeKind::Folder { ref children } = node.kind {
        for child in children {
            collect_ids(child, ids);
        }
    }
}

impl FileExplorer {
    pub fn new() -> Self {
        Self {
            roots: Vec::new(),
            expanded: HashSet::new(),
            next_id: 1,
        }
    }

    /// The starter project every new workspace opens with.
    pub fn with_sample_project() -> Self {
        let mut explorer = Self::new();
        let seed = [
            ("src", "index.js", "console.log('Hello World!');"),
            (
                "src",
                "App.js",
                "function App() {\n  return <div>Hello React!</div>;\n}",
            ),
            (
                "",
                "package.json",
                "{\n  \"name\": \"my-app\",\n  \"version\": \"1.0.0\"\n}",
            ),
            ("", "README.md", "# My Project\n\nWelcome to my project!"),
        ];
        let _ = explorer.create_folder(None, "src");
        for (folder, name, content) in seed {
            let parent = (!folder.is_empty()).then_some(folder);
            if let Ok(path) = explorer.create_file(parent, name) {
                let _ = explorer.set_content(&path, content);
            }
        }
        let _ = explorer.toggle("src");
        explorer
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn find(&self, path: &str) -> Option<&FileNode> {
        locate(&self.roots, &segments(path))
    }

    /// Flips a folder between expanded and collapsed. Returns the new state.
    pub fn toggle(&mut self, path: &str) -> Result<bool, TreeError> {
        let node = self
            .find(path)
            .ok_or_else(|| TreeError::NotFound(path.to_string()))?;
        if !node.is_folder() {
            return Err(TreeError::NotAFolder(path.to_string()));
        }
        let id = node.id;
        if self.expanded.remove(&id) {
            Ok(false)
        } else {
            self.expanded.insert(id);
            Ok(true)
        }
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.find(path)
            .map(|node| self.expanded.contains(&node.id))
            .unwrap_or(false)
    }

    fn children_mut(&mut self, parent: Option<&str>) -> Result<&mut Vec<FileNode>, TreeError> {
        let Some(parent) = parent else {
            return Ok(&mut self.roots);
        };
        match locate_mut(&mut self.roots, &segments(parent)) {
            Some(FileNode {
                kind: NodeKind::Folder { children },
                ..
            }) => Ok(children),
            Some(_) => Err(TreeError::NotAFolder(parent.to_string())),
            None => Err(TreeError::NotFound(parent.to_string())),
        }
    }

    fn insert(&mut self, parent: Option<&str>, name: &str, kind: NodeKind) -> Result<String, TreeError> {
        let name = name.trim();
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(TreeError::InvalidName(name.to_string()));
        }

        let parent = parent.filter(|p| !segments(p).is_empty());
        let path = match parent {
            Some(parent) => format!("{}/{name}", segments(parent).join("/")),
            None => name.to_string(),
        };

        let id = self.allocate_id();
        let siblings = self.children_mut(parent)?;
        if siblings.iter().any(|n| n.name == name) {
            return Err(TreeError::AlreadyExists(path));
        }
        siblings.push(FileNode {
            id,
            name: name.to_string(),
            kind,
        });
        Ok(path)
    }

    /// Creates an empty file at the root or inside `parent`. Returns its path.
    pub fn create_file(&mut self, parent: Option<&str>, name: &str) -> Result<String, TreeError> {
        self.insert(
            parent,
            name,
            NodeKind::File {
                content: String::new(),
            },
        )
    }

    pub fn create_folder(&mut self, parent: Option<&str>, name: &str) -> Result<String, TreeError> {
        self.insert(parent, name, NodeKind::Folder { children: Vec::new() })
    }

    /// Removes a file or a folder with everything below it.
    pub fn delete(&mut self, path: &str) -> Result<(), TreeError> {
        let segs = segments(path);
        let Some((name, parent)) = segs.split_last() else {
            return Err(TreeError::NotFound(path.to_string()));
        };
        let parent_path = parent.join("/");
        let parent = (!parent.is_empty()).then_some(parent_path.as_str());

        let siblings = self
            .children_mut(parent)
            .map_err(|_| TreeError::NotFound(path.to_string()))?;
        let index = siblings
            .iter()
            .position(|n| n.name == *name)
            .ok_or_else(|| TreeError::NotFound(path.to_string()))?;
        let removed = siblings.remove(index);

        let mut ids = Vec::new();
        collect_ids(&removed, &mut ids);
        for id in ids {
            self.expanded.remove(&id);
        }
        Ok(())
    }

    /// Returns `(path, content)` for a file, normalized path first.
    pub fn select(&self, path: &str) -> Result<(String, String), TreeError> {
        match self.find(path) {
            Some(FileNode {
                kind: NodeKind::File { content },
                ..
            }) => Ok((segments(path).join("/"), content.clone())),
            Some(_) => Err(TreeError::NotAFile(path.to_string())),
            None => Err(TreeError::NotFound(path.to_string())),
        }
    }

    pub fn set_content(&mut self, path: &str, new_content: &str) -> Result<(), TreeError> {
        match locate_mut(&mut self.roots, &segments(path)) {
            Some(FileNode {
                kind: NodeKind::File { content },
                ..
            }) => {
                *content = new_content.to_string();
                Ok(())
            }
            Some(_) => Err(TreeError::NotAFile(path.to_string())),
            None => Err(TreeError::NotFound(path.to_string())),
        }
    }

    /// Every node with its path, parents before children.
    pub fn walk(&self) -> Vec<(String, &FileNode)> {
        fn visit<'a>(nodes: &'a [FileNode], prefix: &str, out: &mut Vec<(String, &'a FileNode)>) {
            for node in nodes {
                let path = if prefix.is_empty() {
                    node.name.clone()
                } else {
                    format!("{prefix}/{}", node.name)
                };
                out.push((path.clone(), node));
                if let NodeKind::Folder { ref children } = node.kind {
                    visit(children, &path, out);
                }
            }
        }

        let mut out = Vec::new();
        visit(&self.roots, "", &mut out);
        out
    }

    /// Indented listing; collapsed folders hide their contents.
    pub fn render(&self) -> Vec<String> {
        fn visit(explorer: &FileExplorer, nodes: &[FileNode], depth: usize, out: &mut Vec<String>) {
            for node in nodes {
                let indent = "  ".repeat(depth);
                match node.kind {
                    NodeKind::Folder { ref children } => {
                        let open = explorer.expanded.contains(&node.id);
                        let marker = if open { "▾" } else { "▸" };
                        out.push(format!("{indent}{marker} {}/", node.name));
                        if open {
                            visit(explorer, children, depth + 1, out);
                        }
                    }
                    NodeKind::File { .. } => out.push(format!("{indent}  {}", node.name)),
                }
            }
        }

        let mut out = Vec::new();
        visit(self, &self.roots, 0, &mut out);
        out
    }
}

impl Default for FileExplorer {
    fn default() -> Self {
        Self::new()
    }
}
