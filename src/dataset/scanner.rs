//! Sample Scanner
//!
//! Walks a YOLO-format split (`images/` directory plus sibling `labels/`
//! directory) and emits a flat list of (image path, class name) samples.
//!
//! YOLO annotation files hold one object per line, leading token is the
//! class index. Classification training wants one sample per annotation, so
//! an image whose label file has N valid lines is emitted N times, once per
//! labeled defect. Images without a label file count as the first declared
//! class (the dataset's background/default convention).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::dataset::config::DatasetConfig;

/// Image file extensions recognized by the scanner.
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// One labeled training sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Absolute (or root-relative) path to the image file
    pub image_path: PathBuf,
    /// Class name from the declared vocabulary
    pub label: String,
}

/// All samples for one dataset split, in deterministic file order.
#[derive(Debug, Clone)]
pub struct SampleSet {
    /// Split name ("train", "val", "test")
    pub split: String,
    /// Flat, ordered, non-deduplicated sample list
    pub samples: Vec<Sample>,
}

impl SampleSet {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Count of samples per class name, in declared class order.
    pub fn class_distribution(&self, names: &[String]) -> Vec<(String, usize)> {
        names
            .iter()
            .map(|name| {
                let count = self.samples.iter().filter(|s| &s.label == name).count();
                (name.clone(), count)
            })
            .collect()
    }
}

/// Resolve a split's image directory from the manifest path entry.
///
/// Absolute entries are used as-is; relative entries are joined under the
/// dataset root after stripping leading `.`, `/`, and `\` characters.
fn resolve_image_dir(entry: &str, dataset_root: &Path) -> PathBuf {
    let path = Path::new(entry);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        let trimmed = entry.trim_start_matches(['.', '/', '\\']);
        dataset_root.join(trimmed)
    }
}

/// Derive the labels directory from an image directory path.
///
/// YOLO layouts place `labels/` beside `images/`; the conventional mapping
/// is a textual substitution of every `images` path component.
fn labels_dir_for(image_dir: &Path) -> PathBuf {
    PathBuf::from(image_dir.to_string_lossy().replace("images", "labels"))
}

/// Scan one split and emit its labeled samples.
///
/// Missing directories are recoverable: a warning is logged and an empty
/// set returned. Malformed annotation lines (non-integer leading token, or
/// index outside `[0, nc)`) are skipped without error.
pub fn scan(split: &str, entry: &str, config: &DatasetConfig, dataset_root: &Path) -> SampleSet {
    let image_dir = resolve_image_dir(entry, dataset_root);
    let labels_dir = labels_dir_for(&image_dir);

    if !image_dir.is_dir() {
        warn!(
            split = split,
            "Image directory not found: {}",
            image_dir.display()
        );
        return SampleSet {
            split: split.to_string(),
            samples: Vec::new(),
        };
    }

    let mut samples = Vec::new();

    for dir_entry in WalkDir::new(&image_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let image_path = dir_entry.path();
        if !is_image_file(image_path) {
            continue;
        }

        let stem = match image_path.file_stem() {
            Some(stem) => stem,
            None => continue,
        };
        let label_path = labels_dir.join(stem).with_extension("txt");

        match fs::read_to_string(&label_path) {
            Ok(contents) => {
                for line in contents.lines() {
                    if let Some(label) = parse_annotation_line(line, config) {
                        samples.push(Sample {
                            image_path: image_path.to_path_buf(),
                            label,
                        });
                    }
                }
            }
            Err(_) => {
                // No annotation file: the image belongs to the default
                // (first declared) class.
                if let Some(default) = config.names.first() {
                    samples.push(Sample {
                        image_path: image_path.to_path_buf(),
                        label: default.clone(),
                    });
                }
            }
        }
    }

    debug!(
        split = split,
        samples = samples.len(),
        "Scanned {}",
        image_dir.display()
    );

    SampleSet {
        split: split.to_string(),
        samples,
    }
}

fn is_image_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let lower = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

/// Parse one YOLO annotation line into a class name.
///
/// The leading whitespace-separated token must parse as an integer within
/// `[0, nc)`; anything else yields `None`.
fn parse_annotation_line(line: &str, config: &DatasetConfig) -> Option<String> {
    let token = line.split_whitespace().next()?;
    let class_idx: usize = token.parse().ok()?;
    config.names.get(class_idx).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config(names: &[&str]) -> DatasetConfig {
        DatasetConfig {
            train: "./train/images".to_string(),
            val: "./valid/images".to_string(),
            test: "./test/images".to_string(),
            nc: names.len(),
            names: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn write_file(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut file = fs::File::create(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn test_valid_line_maps_index_to_name() {
        let cfg = config(&["scratch", "dent"]);
        assert_eq!(
            parse_annotation_line("1 0.5 0.5 0.1 0.1", &cfg),
            Some("dent".to_string())
        );
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let cfg = config(&["scratch", "dent"]);
        assert_eq!(parse_annotation_line("x 0.5 0.5", &cfg), None);
        assert_eq!(parse_annotation_line("7 0.5 0.5", &cfg), None);
        assert_eq!(parse_annotation_line("", &cfg), None);
        assert_eq!(parse_annotation_line("-1 0.5", &cfg), None);
    }

    #[test]
    fn test_missing_directory_yields_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&["scratch"]);

        let set = scan("train", "./train/images", &cfg, dir.path());
        assert!(set.is_empty());
        assert_eq!(set.split, "train");
    }

    #[test]
    fn test_multi_line_label_emits_one_sample_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&["a", "b"]);

        write_file(&dir.path().join("train/images/x.jpg"), "not-a-real-image");
        write_file(
            &dir.path().join("train/labels/x.txt"),
            "0 0.1 0.1 0.2 0.2\n1 0.5 0.5 0.2 0.2\n",
        );

        let set = scan("train", "./train/images", &cfg, dir.path());
        assert_eq!(set.len(), 2);
        assert_eq!(set.samples[0].label, "a");
        assert_eq!(set.samples[1].label, "b");
        assert_eq!(set.samples[0].image_path, set.samples[1].image_path);
    }

    #[test]
    fn test_unlabeled_image_defaults_to_first_class() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&["background", "defect"]);

        write_file(&dir.path().join("train/images/y.png"), "stub");

        let set = scan("train", "./train/images", &cfg, dir.path());
        assert_eq!(set.len(), 1);
        assert_eq!(set.samples[0].label, "background");
    }

    #[test]
    fn test_non_image_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&["a"]);

        write_file(&dir.path().join("train/images/readme.txt"), "notes");
        write_file(&dir.path().join("train/images/z.jpeg"), "stub");

        let set = scan("train", "./train/images", &cfg, dir.path());
        assert_eq!(set.len(), 1);
        assert!(set.samples[0]
            .image_path
            .to_string_lossy()
            .ends_with("z.jpeg"));
    }

    #[test]
    fn test_absolute_entry_used_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&["a"]);

        write_file(&dir.path().join("elsewhere/images/w.jpg"), "stub");
        let absolute = dir.path().join("elsewhere/images");

        let set = scan(
            "val",
            absolute.to_str().unwrap(),
            &cfg,
            Path::new("/unused/root"),
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_label_file_with_only_bad_lines_emits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&["a"]);

        write_file(&dir.path().join("train/images/q.jpg"), "stub");
        write_file(&dir.path().join("train/labels/q.txt"), "bad\n9 0.5\n");

        let set = scan("train", "./train/images", &cfg, dir.path());
        assert!(set.is_empty());
    }

    #[test]
    fn test_class_distribution() {
        let set = SampleSet {
            split: "train".to_string(),
            samples: vec![
                Sample {
                    image_path: PathBuf::from("a.jpg"),
                    label: "x".to_string(),
                },
                Sample {
                    image_path: PathBuf::from("b.jpg"),
                    label: "x".to_string(),
                },
                Sample {
                    image_path: PathBuf::from("c.jpg"),
                    label: "y".to_string(),
                },
            ],
        };

        let dist = set.class_distribution(&["x".to_string(), "y".to_string()]);
        assert_eq!(dist, vec![("x".to_string(), 2), ("y".to_string(), 1)]);
    }
}
