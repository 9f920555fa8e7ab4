//! Binary classification metrics

use serde::Serialize;
use std::fmt;

/// Confusion counts for a binary classifier, class 1 being positive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationMetrics {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl EvaluationMetrics {
    pub fn new(tp: usize, tn: usize, fp: usize, fn_: usize) -> Self {
        Self {
            true_positives: tp,
            true_negatives: tn,
            false_positives: fp,
            false_negatives: fn_,
        }
    }

    /// Count outcomes over paired predicted/actual 0/1 labels
    pub fn from_labels(predicted: &[u8], actual: &[u8]) -> Self {
        let mut metrics = Self::default();
        for (&pred, &truth) in predicted.iter().zip(actual) {
            match (pred == 1, truth == 1) {
                (true, true) => metrics.true_positives += 1,
                (false, false) => metrics.true_negatives += 1,
                (true, false) => metrics.false_positives += 1,
                (false, true) => metrics.false_negatives += 1,
            }
        }
        metrics
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// Calculate accuracy: (TP + TN) / (TP + TN + FP + FN)
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    /// Calculate precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_positives,
        )
    }

    /// Calculate recall (sensitivity): TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_negatives,
        )
    }

    pub fn f1_score(&self) -> f64 {
        f1(self.precision(), self.recall())
    }

    /// Calculate specificity: TN / (TN + FP)
    pub fn specificity(&self) -> f64 {
        ratio(
            self.true_negatives,
            self.true_negatives + self.false_positives,
        )
    }

    /// Precision, recall and F1 for class 0 and class 1
    pub fn class_report(&self) -> [ClassMetrics; 2] {
        let negative_precision = ratio(
            self.true_negatives,
            self.true_negatives + self.false_negatives,
        );
        let negative_recall = self.specificity();
        [
            ClassMetrics {
                label: 0,
                precision: negative_precision,
                recall: negative_recall,
                f1: f1(negative_precision, negative_recall),
                support: self.true_negatives + self.false_positives,
            },
            ClassMetrics {
                label: 1,
                precision: self.precision(),
                recall: self.recall(),
                f1: self.f1_score(),
                support: self.true_positives + self.false_negatives,
            },
        ]
    }

    /// Rows are actual classes, columns predicted: `[[TN, FP], [FN, TP]]`
    pub fn confusion_matrix(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negatives, self.false_positives],
            [self.false_negatives, self.true_positives],
        ]
    }
}

/// Per-class row of a classification report
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: u8,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl fmt::Display for EvaluationMetrics {
    /// Classification report followed by the confusion matrix
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>10} {:>10} {:>10} {:>10} {:>10}",
            "class", "precision", "recall", "f1-score", "support"
        )?;
        for class in self.class_report() {
            writeln!(
                f,
                "{:>10} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                class.label, class.precision, class.recall, class.f1, class.support
            )?;
        }
        writeln!(
            f,
            "{:>10} {:>32.2} {:>10}",
            "accuracy",
            self.accuracy(),
            self.total()
        )?;
        writeln!(f)?;
        writeln!(f, "confusion matrix (rows actual, columns predicted)")?;
        let [[tn, fp], [fn_, tp]] = self.confusion_matrix();
        writeln!(f, "{:>10} {:>8} {:>8}", "", "0", "1")?;
        writeln!(f, "{:>10} {:>8} {:>8}", "0", tn, fp)?;
        write!(f, "{:>10} {:>8} {:>8}", "1", fn_, tp)
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}
