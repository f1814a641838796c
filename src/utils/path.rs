//! Output path helpers

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, TimeZone};

use crate::domain::model::Container;
use crate::error::{ShrinkError, ShrinkResult};

/// Suffix appended to generated output names
pub const OUTPUT_SUFFIX: &str = "_compressed";

/// `<dir>/<stem>_compressed_<YYYYmmdd_HHMMSS>.<ext>`, with `dir` defaulting
/// to the source's own directory
pub fn default_output_path<Tz: TimeZone>(
    source: &Path,
    directory: Option<&Path>,
    container: Container,
    now: DateTime<Tz>,
) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "video".to_string());
    let file_name = format!(
        "{}{}_{}.{}",
        stem,
        OUTPUT_SUFFIX,
        now.format("%Y%m%d_%H%M%S"),
        container.file_extension()
    );

    let directory = directory
        .map(Path::to_path_buf)
        .or_else(|| source.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    directory.join(file_name)
}

/// Container implied by a path's extension, if recognised
pub fn container_for(path: &Path) -> Option<Container> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(Container::from_extension)
}

/// Reject an output name whose extension names another container.
///
/// Names without an extension are accepted as they are.
pub fn check_output_extension(output: &Path, container: Container) -> ShrinkResult<()> {
    let Some(extension) = output.extension().map(|ext| ext.to_string_lossy()) else {
        return Ok(());
    };
    match container_for(output) {
        Some(found) if found == container => Ok(()),
        Some(found) => Err(ShrinkError::config(format!(
            "output extension .{} is a {} container but the target writes {}",
            extension,
            found.file_extension(),
            container.file_extension()
        ))),
        None => Err(ShrinkError::config(format!(
            "unsupported output extension .{}, expected .mp4 or .mov",
            extension
        ))),
    }
}

/// Push `rest` onto `base`, folding `.` and `..` without touching the disk
pub fn append_lexically(mut base: PathBuf, rest: &[Component<'_>]) -> PathBuf {
    for component in rest {
        match component {
            Component::Normal(part) => base.push(part),
            Component::ParentDir => {
                base.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_default_output_next_to_source() {
        let path = default_output_path(
            Path::new("/videos/holiday.MOV"),
            None,
            Container::Mp4,
            fixed_time(),
        );
        assert_eq!(
            path,
            PathBuf::from("/videos/holiday_compressed_20240309_140507.mp4")
        );
    }

    #[test]
    fn test_default_output_in_configured_directory() {
        let path = default_output_path(
            Path::new("/videos/holiday.mp4"),
            Some(Path::new("/tmp/out")),
            Container::Mov,
            fixed_time(),
        );
        assert_eq!(
            path,
            PathBuf::from("/tmp/out/holiday_compressed_20240309_140507.mov")
        );
    }

    #[test]
    fn test_default_output_for_bare_name() {
        let path = default_output_path(Path::new("clip.mp4"), None, Container::Mp4, fixed_time());
        assert_eq!(path, PathBuf::from("clip_compressed_20240309_140507.mp4"));
    }

    #[test]
    fn test_container_for() {
        assert_eq!(container_for(Path::new("a.MP4")), Some(Container::Mp4));
        assert_eq!(container_for(Path::new("a.mov")), Some(Container::Mov));
        assert_eq!(container_for(Path::new("a.mkv")), None);
        assert_eq!(container_for(Path::new("a")), None);
    }

    #[test]
    fn test_check_output_extension() {
        assert!(check_output_extension(Path::new("out/small.MP4"), Container::Mp4).is_ok());
        assert!(check_output_extension(Path::new("small.mov"), Container::Mov).is_ok());
        assert!(check_output_extension(Path::new("small"), Container::Mov).is_ok());

        let mismatch = check_output_extension(Path::new("small.mov"), Container::Mp4);
        assert!(matches!(mismatch, Err(ShrinkError::Config { .. })));
        let unknown = check_output_extension(Path::new("small.mkv"), Container::Mp4);
        assert!(matches!(unknown, Err(ShrinkError::Config { .. })));
    }

    #[test]
    fn test_append_lexically() {
        let rest: Vec<Component<'_>> = Path::new("a/./b/../../c/clip.mp4").components().collect();
        assert_eq!(
            append_lexically(PathBuf::from("/base"), &rest),
            PathBuf::from("/base/c/clip.mp4")
        );
    }
}
