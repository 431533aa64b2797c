use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

/// Index of a class in the registry. Ids are assigned in insertion order.
pub type ClassId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabel {
    pub id: ClassId,
    pub name: String,
    pub example_count: usize,
}

impl ClassLabel {
    /// Name shown to users and sent to the output channel.
    pub fn display_name(&self) -> String {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            format!("Class {}", self.id + 1)
        } else {
            trimmed.to_string()
        }
    }
}

/// Ordered set of class labels with per-class example counts.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    labels: Vec<ClassLabel>,
}

impl ClassRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::default();
        for name in names {
            registry.add(name);
        }
        registry
    }

    pub fn add(&mut self, name: impl Into<String>) -> ClassId {
        let id = self.labels.len();
        self.labels.push(ClassLabel {
            id,
            name: name.into(),
            example_count: 0,
        });
        id
    }

    pub fn rename(&mut self, id: ClassId, name: impl Into<String>) -> Result<(), DatasetError> {
        let label = self
            .labels
            .get_mut(id)
            .ok_or(DatasetError::UnknownClass(id))?;
        label.name = name.into();
        Ok(())
    }

    pub fn get(&self, id: ClassId) -> Option<&ClassLabel> {
        self.labels.get(id)
    }

    pub fn contains(&self, id: ClassId) -> bool {
        id < self.labels.len()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassLabel> {
        self.labels.iter()
    }

    /// Bump a class count, returning the new value.
    pub fn increment(&mut self, id: ClassId) -> Option<usize> {
        let label = self.labels.get_mut(id)?;
        label.example_count += 1;
        Some(label.example_count)
    }

    pub fn reset_counts(&mut self) {
        for label in &mut self.labels {
            label.example_count = 0;
        }
    }

    pub fn counts(&self) -> Vec<usize> {
        self.labels.iter().map(|label| label.example_count).collect()
    }

    pub fn display_names(&self) -> Vec<String> {
        self.labels.iter().map(ClassLabel::display_name).collect()
    }
}

/// One labelled example.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub features: Vec<f32>,
    pub label: ClassId,
}

/// Features and labels in parallel vectors; the first sample fixes the width.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    features: Vec<Vec<f32>>,
    labels: Vec<ClassId>,
}

impl Dataset {
    pub fn push(&mut self, sample: Sample) -> Result<(), DatasetError> {
        if sample.features.is_empty() {
            return Err(DatasetError::EmptyVector);
        }
        if let Some(expected) = self.dim() {
            if expected != sample.features.len() {
                return Err(DatasetError::Dimension {
                    expected,
                    found: sample.features.len(),
                });
            }
        }
        self.features.push(sample.features);
        self.labels.push(sample.label);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Feature width, once known.
    pub fn dim(&self) -> Option<usize> {
        self.features.first().map(Vec::len)
    }

    pub fn clear(&mut self) {
        self.features.clear();
        self.labels.clear();
    }

    pub fn snapshot(&self) -> DatasetSnapshot {
        DatasetSnapshot {
            features: self.features.clone(),
            labels: self.labels.clone(),
        }
    }
}

/// Owned copy of a dataset handed to a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSnapshot {
    pub features: Vec<Vec<f32>>,
    pub labels: Vec<ClassId>,
}

impl DatasetSnapshot {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }

    /// Shuffle rows, keeping every feature vector with its label.
    pub fn shuffle_pairs<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);
        let mut features = std::mem::take(&mut self.features);
        self.features = order
            .iter()
            .map(|&idx| std::mem::take(&mut features[idx]))
            .collect();
        self.labels = order.iter().map(|&idx| self.labels[idx]).collect();
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatasetError {
    #[error("Unknown class id {0}")]
    UnknownClass(ClassId),
    #[error("Feature vector is empty")]
    EmptyVector,
    #[error("Feature vector has {found} values, dataset expects {expected}")]
    Dimension { expected: usize, found: usize },
}
