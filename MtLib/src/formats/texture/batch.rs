//! Batch TEX to DDS conversion
//!
//! Finds `.tex` files below a directory and converts them in parallel,
//! mirroring the directory structure under the output directory.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use walkdir::WalkDir;

use super::dds::convert_tex_to_dds;

/// Result of a batch texture conversion
#[derive(Debug, Clone)]
pub struct BatchTextureResult {
    /// Number of successful conversions
    pub success_count: usize,
    /// Number of failed conversions
    pub fail_count: usize,
    /// Messages for each file processed
    pub results: Vec<String>,
}

/// Find all .tex files in a directory recursively, sorted.
pub fn find_tex_files<P: AsRef<Path>>(dir: P) -> Vec<PathBuf> {
    let mut files: Vec<_> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| {
            e.path().is_file()
                && e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("tex"))
        })
        .map(|e| e.path().to_path_buf())
        .collect();

    files.sort();
    files
}

/// Convert TEX files to DDS in parallel.
///
/// Each output lands at `dest_base/<path relative to source_base>.dds`.
/// `progress` receives (current, total, relative path).
pub fn batch_tex_to_dds<F>(
    tex_files: &[PathBuf],
    source_base: &Path,
    dest_base: &Path,
    progress: F,
) -> BatchTextureResult
where
    F: Fn(usize, usize, &str) + Send + Sync,
{
    let success_counter = AtomicUsize::new(0);
    let fail_counter = AtomicUsize::new(0);
    let processed = AtomicUsize::new(0);
    let total = tex_files.len();

    let results: Vec<String> = tex_files
        .par_iter()
        .map(|tex_path| {
            let relative_path = tex_path
                .strip_prefix(source_base)
                .unwrap_or(tex_path.as_path());
            let display_path = relative_path.to_string_lossy();

            let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(current, total, &display_path);

            let dds_path = dest_base.join(relative_path).with_extension("dds");
            if let Some(parent) = dds_path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    fail_counter.fetch_add(1, Ordering::SeqCst);
                    return format!("Failed to create folder for {display_path}: {e}");
                }
            }

            match convert_tex_to_dds(tex_path, &dds_path) {
                Ok(()) => {
                    success_counter.fetch_add(1, Ordering::SeqCst);
                    format!("Converted: {display_path}")
                }
                Err(e) => {
                    fail_counter.fetch_add(1, Ordering::SeqCst);
                    format!("Failed {display_path}: {e}")
                }
            }
        })
        .collect();

    BatchTextureResult {
        success_count: success_counter.load(Ordering::SeqCst),
        fail_count: fail_counter.load(Ordering::SeqCst),
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::texture::types::{Surface, SurfaceFormat, Texture, TextureHeader};
    use crate::formats::texture::write_tex;

    #[test]
    fn test_batch_convert() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("chr/ryu")).unwrap();

        let texture = Texture {
            header: TextureHeader::new(8, 8, 1, SurfaceFormat::BM_OPA),
            faces: Vec::new(),
            surfaces: vec![Surface {
                mips: vec![vec![0x55; 32]],
            }],
        };
        write_tex(&texture, src.path().join("chr/ryu/body_BM.tex")).unwrap();
        std::fs::write(src.path().join("broken.tex"), b"nope").unwrap();
        std::fs::write(src.path().join("notes.txt"), b"skip").unwrap();

        let files = find_tex_files(src.path());
        assert_eq!(files.len(), 2);

        let result = batch_tex_to_dds(&files, src.path(), dst.path(), |_, _, _| {});
        assert_eq!(result.success_count, 1);
        assert_eq!(result.fail_count, 1);
        assert!(dst.path().join("chr/ryu/body_BM.dds").is_file());
    }
}
