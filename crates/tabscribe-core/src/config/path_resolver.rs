use std::path::{Component, Path, PathBuf};

/// Resolves dataset paths relative to the directory holding the config file.
#[derive(Clone)]
pub struct PathResolver {
    base_dir: PathBuf,
}

impl PathResolver {
    pub fn new(config_path: &Path) -> Self {
        let base_dir = config_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        Self { base_dir }
    }

    pub fn resolve_str(&self, s: &mut String) {
        if s.trim().is_empty() {
            return;
        }
        let pb = PathBuf::from(&*s);
        if pb.is_absolute() {
            return;
        }
        *s = self.join_clean(&pb).to_string_lossy().to_string();
    }

    fn join_clean(&self, rel: &Path) -> PathBuf {
        let joined = self.base_dir.join(rel);

        let mut out = PathBuf::new();
        for c in joined.components() {
            match c {
                Component::CurDir => {}
                Component::ParentDir => {
                    let last = out.components().next_back();
                    let (normal, at_root) = (
                        matches!(last, Some(Component::Normal(_))),
                        matches!(last, Some(Component::RootDir | Component::Prefix(_))),
                    );
                    if normal {
                        out.pop();
                    } else if !at_root {
                        // leading `..` accumulate; `..` at the root stays there
                        out.push("..");
                    }
                }
                Component::RootDir | Component::Prefix(_) | Component::Normal(_) => {
                    out.push(c.as_os_str())
                }
            }
        }
        if out.as_os_str().is_empty() {
            out.push(".");
        }
        out
    }
}
