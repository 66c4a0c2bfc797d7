// src/tree/lookup.rs

//! Name and path resolution over the tree.

use crate::tree::{FileId, FolderId, SourceTree};

/// Normalize a relative include path: backslashes become slashes, `.`
/// segments vanish and `..` pops the previous segment.
pub fn normalize(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    out.join("/")
}

impl SourceTree {
    /// Folder at an exact logical path, e.g. `logic/accounts/sqldo`.
    pub fn find_path(&self, folder_path: &str) -> Option<FolderId> {
        let mut segments = folder_path.split('/').filter(|s| !s.is_empty());
        let first = segments.next()?;
        let mut current = self
            .roots
            .iter()
            .copied()
            .find(|r| self.folder(*r).name == first)?;

        for segment in segments {
            current = self.child_named(current, segment)?;
        }
        Some(current)
    }

    pub fn child_named(&self, folder: FolderId, name: &str) -> Option<FolderId> {
        self.folder(folder)
            .children
            .iter()
            .copied()
            .find(|c| self.folder(*c).name == name)
    }

    pub fn file_in_folder(&self, folder: FolderId, name: &str) -> Option<FileId> {
        self.folder(folder)
            .files
            .iter()
            .copied()
            .find(|f| self.file(*f).name == name)
    }

    /// Locate a file by name or by `folder/name`.
    ///
    /// With a folder component the exact folder is tried first, then any
    /// folder whose path ends with that component. A bare name is searched
    /// root by root, depth first.
    pub fn find_file(&self, path: &str) -> Option<FileId> {
        let path = normalize(path);
        match path.rsplit_once('/') {
            Some((dir, name)) => {
                if let Some(found) = self
                    .find_path(dir)
                    .and_then(|folder| self.file_in_folder(folder, name))
                {
                    return Some(found);
                }
                let suffix = format!("/{dir}");
                self.all_folders()
                    .into_iter()
                    .filter(|f| {
                        let p = &self.folder(*f).path;
                        p == dir || p.ends_with(&suffix)
                    })
                    .find_map(|f| self.file_in_folder(f, name))
            }
            None => self
                .all_folders()
                .into_iter()
                .find_map(|f| self.file_in_folder(f, &path)),
        }
    }

    /// Every file whose name ends with `suffix`, in DFS order.
    pub fn find_files_by_type(&self, suffix: &str) -> Vec<FileId> {
        self.all_folders()
            .into_iter()
            .flat_map(|f| self.folder(f).files.iter().copied())
            .filter(|f| self.file(*f).name.ends_with(suffix))
            .collect()
    }

    /// Preorder DFS over the folders below (and including) `root`.
    pub fn walk(&self, root: FolderId) -> Vec<FolderId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.folder(id).children.iter().rev().copied());
        }
        out
    }

    /// All folders, root by root in registration order.
    pub fn all_folders(&self) -> Vec<FolderId> {
        self.roots.iter().flat_map(|r| self.walk(*r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::normalize;

    #[test]
    fn normalize_handles_dots_and_backslashes() {
        assert_eq!(normalize("./a/b.h"), "a/b.h");
        assert_eq!(normalize("a\\..\\b\\c.h"), "b/c.h");
        assert_eq!(normalize("glob/./x.h"), "glob/x.h");
        assert_eq!(normalize("../up.h"), "up.h");
    }
}
