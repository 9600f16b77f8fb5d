use std::path::{Component, Path, PathBuf};

/// Renders a path for humans: canonical when it exists, otherwise made
/// absolute against the working directory with `.` and `..` folded away.
pub fn best_effort_path_display(path: &Path) -> String {
    match path.canonicalize() {
        Ok(canonical_path) => canonical_path.display().to_string(),
        Err(_) => {
            let absolute_path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
            normalize_path(&absolute_path).display().to_string()
        }
    }
}

fn normalize_path(path: &Path) -> PathBuf {
    path.components()
        .fold(Vec::new(), |mut components, component| {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if matches!(components.last(), Some(Component::Normal(_))) {
                        components.pop();
                    }
                }
                _ => components.push(component),
            }
            components
        })
        .iter()
        .collect()
}

pub trait BestEffortPathExt {
    fn best_effort_path_display(&self) -> String;
}

impl<P: AsRef<Path> + ?Sized> BestEffortPathExt for P {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/missing/./replica", "/missing/replica")]
    #[case("/missing/source/../replica", "/missing/replica")]
    #[case("/missing/../../replica", "/replica")]
    fn folds_dot_components_of_missing_paths(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(input.best_effort_path_display(), expected);
    }

    #[test]
    fn existing_paths_are_canonicalized() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let canonical = temp_dir.path().canonicalize().unwrap();

        let display = temp_dir.path().join(".").best_effort_path_display();

        assert_eq!(display, canonical.display().to_string());
    }
}
