//! Writing type definition files

use std::fs;
use std::io;
use std::path::Path;

use log::debug;

use crate::pipeline::Pipeline;

/// What to do with a type definition file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDecision {
    Write,
    Skip,
    Remove,
}

/// Decide the fate of `artifact` given the freshly generated `candidate`.
///
/// With `update_stale_only`, an existing artifact is kept when the source
/// has not been modified after it, or when its contents already match.
pub fn decide(source: &Path, candidate: Option<&str>, artifact: &Path, update_stale_only: bool) -> io::Result<WriteDecision> {
    let exists = artifact.exists();

    let candidate = match candidate {
        Some(candidate) => candidate,
        None if exists => return Ok(WriteDecision::Remove),
        None => return Ok(WriteDecision::Skip),
    };

    if !update_stale_only || !exists {
        return Ok(WriteDecision::Write);
    }

    let source_modified = fs::metadata(source)?.modified()?;
    let artifact_modified = fs::metadata(artifact)?.modified()?;
    if source_modified <= artifact_modified {
        debug!("{} is up to date", artifact.display());
        return Ok(WriteDecision::Skip);
    }

    if fs::read(artifact)? == candidate.as_bytes() {
        debug!("{} unchanged", artifact.display());
        return Ok(WriteDecision::Skip);
    }

    Ok(WriteDecision::Write)
}

impl Pipeline {
    /// Generate, then write, keep or remove the type definitions of `file`.
    ///
    /// Failures are reported through the alerts; nothing is returned so a
    /// batch carries on with the next file.
    pub fn write_file(&self, file: &Path) {
        let definitions = match self.type_definitions(file) {
            Ok(definitions) => definitions,
            Err(err) => {
                self.alerts().error(&err.to_string());
                return;
            }
        };

        let definition_path = self.definition_path(file);
        let artifact = self.cwd().join(&definition_path);
        let source = self.source_path(file);

        let decision = match decide(&source, definitions.as_deref(), &artifact, self.options().update_stale_only) {
            Ok(decision) => decision,
            Err(err) => {
                self.alerts().error(&err.to_string());
                return;
            }
        };
        debug!("{}: {:?}", file.display(), decision);

        match (decision, definitions) {
            (WriteDecision::Remove, _) => self.remove_type_definition_file(file),
            (WriteDecision::Skip, None) => {
                self.alerts().notice(&format!("[NO GENERATED TYPES] {}", file.display()));
            }
            (WriteDecision::Skip, Some(_)) => {}
            (WriteDecision::Write, Some(text)) => {
                if let Err(err) = write(&artifact, &text) {
                    self.alerts().error(&err.to_string());
                    return;
                }
                self.alerts()
                    .success(&format!("[GENERATED TYPES] {}", definition_path.display()));
            }
            (WriteDecision::Write, None) => {}
        }
    }
}

fn write(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::Severity;
    use crate::options::MainOptions;
    use crate::pipeline::tests::pipeline;
    use std::fs::OpenOptions;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn touch_later(path: &Path) {
        let file = OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(60)).unwrap();
    }

    #[test]
    fn test_decide_without_candidate() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.less");
        let artifact = dir.path().join("a.less.d.ts");
        fs::write(&source, "").unwrap();

        assert_eq!(decide(&source, None, &artifact, false).unwrap(), WriteDecision::Skip);
        fs::write(&artifact, "old").unwrap();
        assert_eq!(decide(&source, None, &artifact, false).unwrap(), WriteDecision::Remove);
    }

    #[test]
    fn test_decide_always_writes_without_stale_check() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.less");
        let artifact = dir.path().join("a.less.d.ts");
        fs::write(&source, "").unwrap();
        fs::write(&artifact, "same").unwrap();

        assert_eq!(decide(&source, Some("same"), &artifact, false).unwrap(), WriteDecision::Write);
    }

    #[test]
    fn test_decide_stale_check() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.less");
        let artifact = dir.path().join("a.less.d.ts");
        fs::write(&source, "").unwrap();

        assert_eq!(decide(&source, Some("new"), &artifact, true).unwrap(), WriteDecision::Write);

        fs::write(&artifact, "old").unwrap();
        let artifact_file = OpenOptions::new().write(true).open(&artifact).unwrap();
        artifact_file.set_modified(SystemTime::now() + Duration::from_secs(30)).unwrap();
        assert_eq!(decide(&source, Some("new"), &artifact, true).unwrap(), WriteDecision::Skip);

        touch_later(&source);
        assert_eq!(decide(&source, Some("new"), &artifact, true).unwrap(), WriteDecision::Write);
        assert_eq!(decide(&source, Some("old"), &artifact, true).unwrap(), WriteDecision::Skip);
    }

    #[test]
    fn test_write_file_generates_types() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("style.less"), ".some-class { color: red; }").unwrap();

        let (pipeline, alerts) = pipeline(dir.path(), MainOptions::default());
        pipeline.write_file(Path::new("style.less"));

        let written = fs::read_to_string(dir.path().join("style.less.d.ts")).unwrap();
        assert_eq!(written, "export declare const someClass: string;\n");
        assert_eq!(alerts.of(Severity::Success), vec!["[GENERATED TYPES] style.less.d.ts"]);
    }

    #[test]
    fn test_write_file_into_output_folder() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/style.less"), ".a { color: red; }").unwrap();

        let options = MainOptions {
            output_folder: Some(PathBuf::from("__generated__")),
            ..Default::default()
        };
        let (pipeline, _) = pipeline(dir.path(), options);
        pipeline.write_file(Path::new("src/style.less"));

        assert!(dir.path().join("__generated__/src/style.less.d.ts").is_file());
    }

    #[test]
    fn test_write_file_is_idempotent_with_stale_check() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("style.less"), ".a { color: red; }").unwrap();

        let options = MainOptions {
            update_stale_only: true,
            ..Default::default()
        };
        let (pipeline, alerts) = pipeline(dir.path(), options);
        let artifact = dir.path().join("style.less.d.ts");

        pipeline.write_file(Path::new("style.less"));
        let contents = fs::read_to_string(&artifact).unwrap();
        let modified = fs::metadata(&artifact).unwrap().modified().unwrap();

        pipeline.write_file(Path::new("style.less"));
        assert_eq!(fs::read_to_string(&artifact).unwrap(), contents);
        assert_eq!(fs::metadata(&artifact).unwrap().modified().unwrap(), modified);
        assert_eq!(alerts.of(Severity::Success).len(), 1);
    }

    #[test]
    fn test_write_file_keeps_matching_artifact_of_touched_source() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("style.less");
        fs::write(&source, ".a { color: red; }").unwrap();

        let options = MainOptions {
            update_stale_only: true,
            ..Default::default()
        };
        let (pipeline, alerts) = pipeline(dir.path(), options);
        let artifact = dir.path().join("style.less.d.ts");

        pipeline.write_file(Path::new("style.less"));
        let modified = fs::metadata(&artifact).unwrap().modified().unwrap();

        touch_later(&source);
        pipeline.write_file(Path::new("style.less"));
        assert_eq!(fs::metadata(&artifact).unwrap().modified().unwrap(), modified);
        assert_eq!(alerts.of(Severity::Success).len(), 1);
    }

    #[test]
    fn test_write_file_without_classes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("empty.less"), "@x: 1px;").unwrap();

        let (pipeline, alerts) = pipeline(dir.path(), MainOptions::default());
        pipeline.write_file(Path::new("empty.less"));

        assert!(!dir.path().join("empty.less.d.ts").exists());
        assert_eq!(alerts.of(Severity::Notice), vec!["[NO GENERATED TYPES] empty.less"]);
    }

    #[test]
    fn test_write_file_removes_obsolete_types() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("empty.less"), "").unwrap();
        fs::write(dir.path().join("empty.less.d.ts"), "export declare const gone: string;\n").unwrap();

        let (pipeline, alerts) = pipeline(dir.path(), MainOptions::default());
        pipeline.write_file(Path::new("empty.less"));

        assert!(!dir.path().join("empty.less.d.ts").exists());
        assert_eq!(alerts.of(Severity::Success), vec!["[REMOVED] empty.less.d.ts"]);
    }

    #[test]
    fn test_write_file_reports_render_errors() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.less"), ".a { color: @missing; }").unwrap();
        fs::write(dir.path().join("broken.less.d.ts"), "keep").unwrap();

        let (pipeline, alerts) = pipeline(dir.path(), MainOptions::default());
        pipeline.write_file(Path::new("broken.less"));

        let errors = alerts.of(Severity::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("variable @missing is undefined ("));
        assert!(errors[0].contains("broken.less[1:"));
        assert_eq!(fs::read_to_string(dir.path().join("broken.less.d.ts")).unwrap(), "keep");
    }
}
