//! Headered CSV datasets
//!
//! One column holds the 0/1 label, identifier columns can be dropped, and
//! every remaining column is a numeric feature kept in file order.

use crate::core::{Dataset, DiagnosisError, Result};
use log::debug;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Dense in-memory table of numeric features with a binary label
#[derive(Debug, Clone, PartialEq)]
pub struct TabularDataset {
    feature_names: Vec<String>,
    rows: Vec<Vec<f64>>,
    labels: Vec<u8>,
}

impl TabularDataset {
    /// Load a dataset from a CSV file with a header row
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        label_column: &str,
        drop_columns: &[&str],
    ) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DiagnosisError::SourceMissing(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let dataset = Self::from_reader(file, label_column, drop_columns)?;
        debug!(
            "loaded {} rows x {} features from {}",
            dataset.len(),
            dataset.dim(),
            path.display()
        );
        Ok(dataset)
    }

    /// Load a dataset from any reader producing headered CSV
    pub fn from_reader<R: Read>(
        reader: R,
        label_column: &str,
        drop_columns: &[&str],
    ) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let label_idx = headers
            .iter()
            .position(|h| h == label_column)
            .ok_or_else(|| {
                DiagnosisError::InvalidDataset(format!("label column '{label_column}' not found"))
            })?;

        let feature_idx: Vec<usize> = headers
            .iter()
            .enumerate()
            .filter(|&(i, name)| i != label_idx && !drop_columns.contains(&name))
            .map(|(i, _)| i)
            .collect();
        let feature_names: Vec<String> = feature_idx
            .iter()
            .map(|&i| headers[i].to_string())
            .collect();

        let mut rows = Vec::new();
        let mut labels = Vec::new();

        for (line, record) in reader.records().enumerate() {
            let record = record?;
            // header is line 1
            let line = line + 2;

            let raw_label = parse_field(&record, label_idx, line, label_column)?;
            labels.push(binary_label(raw_label)?);

            let row = feature_idx
                .iter()
                .zip(&feature_names)
                .map(|(&i, name)| parse_field(&record, i, line, name))
                .collect::<Result<Vec<f64>>>()?;
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(DiagnosisError::EmptyDataset);
        }

        Ok(Self {
            feature_names,
            rows,
            labels,
        })
    }

    /// Build a dataset from already parsed rows
    pub fn from_rows(
        feature_names: Vec<String>,
        rows: Vec<Vec<f64>>,
        labels: Vec<u8>,
    ) -> Result<Self> {
        if rows.len() != labels.len() {
            return Err(DiagnosisError::DimensionMismatch {
                expected: rows.len(),
                actual: labels.len(),
            });
        }
        if let Some(row) = rows.iter().find(|r| r.len() != feature_names.len()) {
            return Err(DiagnosisError::DimensionMismatch {
                expected: feature_names.len(),
                actual: row.len(),
            });
        }
        if let Some(&label) = labels.iter().find(|&&l| l > 1) {
            return Err(DiagnosisError::InvalidLabel(f64::from(label)));
        }
        Ok(Self {
            feature_names,
            rows,
            labels,
        })
    }

    /// Reorder the feature columns to `order`, failing if any is absent
    pub fn with_feature_order(self, order: &[&str]) -> Result<Self> {
        let positions = order
            .iter()
            .map(|name| {
                self.feature_names
                    .iter()
                    .position(|n| n == name)
                    .ok_or_else(|| DiagnosisError::InvalidDataset(format!("missing column '{name}'")))
            })
            .collect::<Result<Vec<usize>>>()?;

        if positions.len() != self.feature_names.len() {
            let extra: Vec<&str> = self
                .feature_names
                .iter()
                .filter(|n| !order.contains(&n.as_str()))
                .map(String::as_str)
                .collect();
            return Err(DiagnosisError::InvalidDataset(format!(
                "unexpected columns: {}",
                extra.join(", ")
            )));
        }

        let rows = self
            .rows
            .iter()
            .map(|row| positions.iter().map(|&p| row[p]).collect())
            .collect();
        Ok(Self {
            feature_names: order.iter().map(|s| s.to_string()).collect(),
            rows,
            labels: self.labels,
        })
    }

    /// Rows at `indices`, in that order
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Apply `f` to every feature row, keeping labels
    pub fn map_rows<F>(&self, f: F) -> Result<Self>
    where
        F: Fn(&[f64]) -> Result<Vec<f64>>,
    {
        let rows = self
            .rows
            .iter()
            .map(|r| f(r))
            .collect::<Result<Vec<_>>>()?;
        Self::from_rows(self.feature_names.clone(), rows, self.labels.clone())
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Count of (class 0, class 1) rows
    pub fn class_counts(&self) -> (usize, usize) {
        let positives = self.labels.iter().filter(|&&l| l == 1).count();
        (self.labels.len() - positives, positives)
    }
}

impl Dataset for TabularDataset {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn dim(&self) -> usize {
        self.feature_names.len()
    }

    fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    fn label(&self, i: usize) -> u8 {
        self.labels[i]
    }

    fn labels(&self) -> Vec<u8> {
        self.labels.clone()
    }
}

fn parse_field(record: &csv::StringRecord, idx: usize, line: usize, column: &str) -> Result<f64> {
    let field = record.get(idx).ok_or_else(|| {
        DiagnosisError::ParseError(format!("line {line}: missing value for '{column}'"))
    })?;
    let value = field.parse::<f64>().map_err(|_| {
        DiagnosisError::ParseError(format!("line {line}: invalid value '{field}' for '{column}'"))
    })?;
    if !value.is_finite() {
        return Err(DiagnosisError::ParseError(format!(
            "line {line}: non-finite value '{field}' for '{column}'"
        )));
    }
    Ok(value)
}

fn binary_label(value: f64) -> Result<u8> {
    if value == 0.0 {
        Ok(0)
    } else if value == 1.0 {
        Ok(1)
    } else {
        Err(DiagnosisError::InvalidLabel(value))
    }
}
