use crate::tree::{FileNode, ROOT_PATH};

/// Path the preview renders.
pub const PREVIEW_ENTRY_PATH: &str = "/src/index.html";

/// Returns the tree a fresh session starts with.
pub fn default_file_system() -> FileNode {
    FileNode::folder(
        ROOT_PATH,
        ROOT_PATH,
        vec![
            FileNode::folder(
                "/src",
                "src",
                vec![
                    FileNode::file("/src/index.html", "index.html", index_html()),
                    FileNode::file("/src/App.tsx", "App.tsx", app_tsx()),
                    FileNode::file("/src/styles.css", "styles.css", styles_css()),
                ],
            ),
            FileNode::file("/package.json", "package.json", package_json()),
            FileNode::file("/README.md", "README.md", readme()),
        ],
    )
}

/// Returns the starter HTML page.
pub fn index_html() -> &'static str {
    r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>My Project</title>
    <link rel="stylesheet" href="styles.css" />
  </head>
  <body>
    <div id="root">
      <h1>Hello from CodeStudio</h1>
      <p>Describe what you want to build and the assistant will generate it.</p>
    </div>
  </body>
</html>
"#
}

/// Returns a minimal React entry component.
pub fn app_tsx() -> &'static str {
    r#"export default function App() {
  return (
    <main>
      <h1>Hello from CodeStudio</h1>
    </main>
  );
}
"#
}

pub fn styles_css() -> &'static str {
    r#"body {
  font-family: system-ui, -apple-system, sans-serif;
  margin: 0;
  padding: 2rem;
}
"#
}

pub fn package_json() -> &'static str {
    r#"{
  "name": "my-project",
  "version": "0.1.0",
  "private": true
}
"#
}

pub fn readme() -> &'static str {
    r#"# My Project

Generated with CodeStudio.
"#
}

/// Returns the system instruction sent with every generation request.
/// The model is asked for a JSON file set; anything else is shown as chat.
pub fn system_prompt() -> &'static str {
    r#"You are an expert web developer. Generate complete, working project code based on user requests.

Your response should be a JSON object with this structure:
{
  "files": [
    {
      "path": "/src/index.html",
      "content": "<!DOCTYPE html>..."
    },
    {
      "path": "/src/App.tsx",
      "content": "import React..."
    }
  ],
  "description": "Brief description of what was created"
}

Every path must be absolute and start with "/". The file at /src/index.html is rendered as the live preview, so it must be a self-contained HTML document.
Generate complete, production-ready code. Include proper HTML, CSS, and JavaScript/TypeScript.
Make the UI beautiful and fully functional."#
}

/// Returns the page shown when the project has no previewable entry document.
pub fn preview_placeholder() -> &'static str {
    r#"<!DOCTYPE html>
<html>
  <head>
    <style>
      body {
        font-family: system-ui, -apple-system, sans-serif;
        display: flex;
        align-items: center;
        justify-content: center;
        min-height: 100vh;
        margin: 0;
        background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
        color: white;
        text-align: center;
        padding: 20px;
      }
      h1 { font-size: 2.5rem; margin-bottom: 1rem; }
      p { font-size: 1.2rem; opacity: 0.9; }
    </style>
  </head>
  <body>
    <div>
      <h1>Ready to Build</h1>
      <p>Generate your project using the AI assistant</p>
    </div>
  </body>
</html>
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_skeleton_is_consistent() {
        let tree = default_file_system();
        tree.validate().unwrap();
        let entry = tree.find_by_path(PREVIEW_ENTRY_PATH).unwrap();
        assert_eq!(entry.content(), Some(index_html()));
    }
}
