use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        Self::with_root(discover_project_root())
    }

    pub fn with_root(project_root: PathBuf) -> Self {
        let log_dir = project_root.join("logs");
        AppPaths {
            project_root,
            log_dir,
        }
    }

    /// Relative paths in the config are anchored at the project root.
    pub fn resolve(&self, raw: &Path) -> PathBuf {
        if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.project_root.join(raw)
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("POLICY_QA_ROOT") {
        return PathBuf::from(root);
    }

    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
