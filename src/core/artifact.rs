//! Locating generated images for a story.
//!
//! Images live at `<images_dir>/<story_id>/story_image_<story_id>_<stamp>.png`.
//! Choosing among candidates is pure; [`ArtifactLinker::scan`] is the only
//! part that touches the filesystem.

use chrono::NaiveDateTime;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

const ARTIFACT_EXTENSION: &str = "png";

/// A file believed to be an image for some story, with its creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCandidate {
    pub path: PathBuf,
    pub created: SystemTime,
}

impl ArtifactCandidate {
    pub fn new(path: impl Into<PathBuf>, created: SystemTime) -> Self {
        Self {
            path: path.into(),
            created,
        }
    }

    fn names_story(&self, story_id: &str) -> bool {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains(story_id))
    }
}

pub struct ArtifactLinker;

impl ArtifactLinker {
    /// The most recently created candidate for `story_id`, or `None`.
    ///
    /// Candidates whose file name does not contain the story id are ignored.
    /// Ties on creation time go to the lexicographically greatest path, so the
    /// choice does not depend on listing order.
    pub fn latest_artifact<'a>(
        story_id: &str,
        candidates: &'a [ArtifactCandidate],
    ) -> Option<&'a Path> {
        candidates
            .iter()
            .filter(|c| c.names_story(story_id))
            .max_by(|a, b| a.created.cmp(&b.created).then_with(|| a.path.cmp(&b.path)))
            .map(|c| c.path.as_path())
    }

    /// Directory that holds every image for `story_id`.
    pub fn story_dir(images_dir: &Path, story_id: &str) -> PathBuf {
        images_dir.join(story_id)
    }

    /// Where a new image generated at `now` should be written.
    pub fn artifact_path(images_dir: &Path, story_id: &str, now: NaiveDateTime) -> PathBuf {
        Self::story_dir(images_dir, story_id).join(format!(
            "story_image_{}_{}.{}",
            story_id,
            now.format("%Y%m%d%H%M%S"),
            ARTIFACT_EXTENSION
        ))
    }

    /// List the `.png` files in the story's directory that carry its id.
    /// A missing directory means no candidates.
    pub fn scan(images_dir: &Path, story_id: &str) -> io::Result<Vec<ArtifactCandidate>> {
        let dir = Self::story_dir(images_dir, story_id);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "no image directory");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXTENSION) {
                continue;
            }
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let created = metadata.created().or_else(|_| metadata.modified())?;
            let candidate = ArtifactCandidate::new(path, created);
            if candidate.names_story(story_id) {
                candidates.push(candidate);
            }
        }

        debug!(dir = %dir.display(), count = candidates.len(), "scanned images");
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::time::Duration;

    const ID: &str = "STORY2025010100001";

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn empty_set_has_no_artifact() {
        assert_eq!(ArtifactLinker::latest_artifact(ID, &[]), None);
    }

    #[test]
    fn latest_of_three() {
        let candidates = vec![
            ArtifactCandidate::new(format!("a/story_image_{ID}_1.png"), at(200)),
            ArtifactCandidate::new(format!("a/story_image_{ID}_2.png"), at(300)),
            ArtifactCandidate::new(format!("a/story_image_{ID}_3.png"), at(100)),
        ];
        assert_eq!(
            ArtifactLinker::latest_artifact(ID, &candidates),
            Some(Path::new(&format!("a/story_image_{ID}_2.png")))
        );
    }

    #[test]
    fn other_stories_are_ignored() {
        let candidates = vec![
            ArtifactCandidate::new(format!("a/story_image_{ID}_1.png"), at(100)),
            ArtifactCandidate::new("a/story_image_STORY2025010100002_1.png", at(900)),
        ];
        assert_eq!(
            ArtifactLinker::latest_artifact(ID, &candidates),
            Some(Path::new(&format!("a/story_image_{ID}_1.png")))
        );
    }

    #[test]
    fn ties_pick_greatest_path() {
        let candidates = vec![
            ArtifactCandidate::new(format!("b/{ID}_b.png"), at(100)),
            ArtifactCandidate::new(format!("b/{ID}_a.png"), at(100)),
        ];
        assert_eq!(
            ArtifactLinker::latest_artifact(ID, &candidates),
            Some(Path::new(&format!("b/{ID}_b.png")))
        );
    }

    #[test]
    fn artifact_path_layout() {
        let now = NaiveDate::from_ymd_opt(2025, 3, 4)
            .unwrap()
            .and_hms_opt(5, 6, 7)
            .unwrap();
        assert_eq!(
            ArtifactLinker::artifact_path(Path::new("imgs"), ID, now),
            PathBuf::from(format!("imgs/{ID}/story_image_{ID}_20250304050607.png"))
        );
    }

    #[test]
    fn scan_filters_by_extension_and_id() {
        let dir = tempfile::TempDir::new().unwrap();
        let story_dir = dir.path().join(ID);
        fs::create_dir_all(&story_dir).unwrap();
        fs::write(story_dir.join(format!("story_image_{ID}_1.png")), b"png").unwrap();
        fs::write(story_dir.join(format!("story_image_{ID}_1.txt")), b"txt").unwrap();
        fs::write(story_dir.join("unrelated.png"), b"png").unwrap();

        let found = ArtifactLinker::scan(dir.path(), ID).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].path.ends_with(format!("story_image_{ID}_1.png")));
    }

    #[test]
    fn scan_missing_dir_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(ArtifactLinker::scan(dir.path(), ID).unwrap().is_empty());
    }
}
