/// Editor state for the workspace: which file is open and its text.
///
/// Edits only change this buffer (and the explorer copy, via the
/// workspace). Nothing is saved anywhere else.
#[derive(Debug, Default, Clone)]
pub struct EditorBuffer {
    selected_file: Option<String>,
    content: String,
}

impl EditorBuffer {
    pub fn open(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.selected_file = Some(path.into());
        self.content = content.into();
    }

    pub fn edit(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn close(&mut self) {
        self.selected_file = None;
        self.content.clear();
    }

    pub fn selected_file(&self) -> Option<&str> {
        self.selected_file.as_deref()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Syntax mode for the open file; javascript when nothing is open.
    pub fn language(&self) -> &'static str {
        self.selected_file
            .as_deref()
            .map(language_for_path)
            .unwrap_or("javascript")
    }
}

/// Guesses the editor language from a file extension.
pub fn language_for_path(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "json" => "json",
        "html" => "html",
        "css" => "css",
        "scss" => "scss",
        "py" => "python",
        "vue" => "vue",
        "md" => "markdown",
        _ => "javascript",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_for_path() {
        assert_eq!(language_for_path("src/App.tsx"), "typescript");
        assert_eq!(language_for_path("index.JS"), "javascript");
        assert_eq!(language_for_path("package.json"), "json");
        assert_eq!(language_for_path("styles/site.scss"), "scss");
        assert_eq!(language_for_path("main.py"), "python");
        assert_eq!(language_for_path("README.md"), "markdown");
        assert_eq!(language_for_path("Makefile"), "javascript");
    }

    #[test]
    fn test_open_edit_close() {
        let mut editor = EditorBuffer::default();
        assert_eq!(editor.language(), "javascript");
        assert!(editor.selected_file().is_none());

        editor.open("README.md", "# Hi");
        assert_eq!(editor.selected_file(), Some("README.md"));
        assert_eq!(editor.language(), "markdown");

        editor.edit("# Hello");
        assert_eq!(editor.content(), "# Hello");

        editor.close();
        assert!(editor.selected_file().is_none());
        assert_eq!(editor.content(), "");
    }
}
