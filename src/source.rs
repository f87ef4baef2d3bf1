//! Image acquisition seam.
//!
//! The controller does not care whether images come from a live sensor, a
//! fixture file, or a dataset directory - it asks the source for exactly N
//! decodable images per collection phase.

use crate::error::{AccessError, Result};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::PathBuf;
use tracing::debug;

/// One acquired image: raw encoded bytes plus where they came from
#[derive(Debug, Clone)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    pub origin: String,
}

/// Supplies the images for a collection phase
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Acquire exactly `count` images for one access event
    async fn acquire(&self, count: usize) -> Result<Vec<RawImage>>;
}

/// Fixture source sampling stored step-pattern images from a dataset
/// directory laid out `<root>/<subject>/<n>.png`.
///
/// Picks one subject per collection phase and samples `count` of their
/// stored images, mirroring a real sensor observing a single person.
pub struct DatasetImageSource {
    root: PathBuf,
    /// Enrolled subject directories with their image counts
    subjects: Vec<(String, usize)>,
}

impl DatasetImageSource {
    pub fn new(root: PathBuf, subjects: Vec<(String, usize)>) -> Self {
        Self { root, subjects }
    }

    /// Enumerate subject directories under the dataset root.
    pub fn scan(root: PathBuf) -> Result<Self> {
        let mut subjects = Vec::new();
        for entry in std::fs::read_dir(&root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let count = std::fs::read_dir(entry.path())?
                .filter_map(|e| e.ok())
                .filter(|e| {
                    e.path()
                        .extension()
                        .map(|ext| ext == "png" || ext == "jpg" || ext == "jpeg")
                        .unwrap_or(false)
                })
                .count();
            if count > 0 {
                subjects.push((entry.file_name().to_string_lossy().into_owned(), count));
            }
        }
        if subjects.is_empty() {
            return Err(AccessError::ImageSource(format!(
                "no subject directories under {}",
                root.display()
            )));
        }
        subjects.sort();
        Ok(Self { root, subjects })
    }
}

#[async_trait]
impl ImageSource for DatasetImageSource {
    async fn acquire(&self, count: usize) -> Result<Vec<RawImage>> {
        let (subject, available) = {
            let mut rng = rand::thread_rng();
            self.subjects
                .choose(&mut rng)
                .cloned()
                .ok_or_else(|| AccessError::ImageSource("no subjects configured".to_string()))?
        };
        debug!("Sampling {} images of subject {}", count, subject);

        let mut images = Vec::with_capacity(count);
        for _ in 0..count {
            let index = rand::thread_rng().gen_range(1..=available);
            let path = self.root.join(&subject).join(format!("{}.png", index));
            let bytes = tokio::fs::read(&path).await.map_err(|e| {
                AccessError::ImageSource(format!("read {}: {}", path.display(), e))
            })?;
            images.push(RawImage {
                bytes,
                origin: path.display().to_string(),
            });
        }
        Ok(images)
    }
}
