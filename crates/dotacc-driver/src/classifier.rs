// SPDX-License-Identifier: AGPL-3.0-only

//! Multinomial logistic regression on the dot-product engine
//!
//! The accelerator was built to score linear classifiers such as the 8×8
//! digits model (64 features, 10 classes). Each class score is one
//! `dot_product` plus an intercept:
//!
//! ```text
//! score_k = engine.dot_product(n, x, coef_k) + intercept_k
//! predict = argmax_k score_k
//! ```
//!
//! Feature counts must be multiples of 4; the engine drops any remainder.
//!
//! ## Model file
//!
//! One class per line, `#` comments, whitespace or comma separated:
//!
//! ```text
//! # intercept coef_0 coef_1 ...
//! 0.12  0.0 -0.3  1.1  0.4
//! -0.5  0.2  0.2 -0.7  0.0
//! ```

use crate::engine::DotProductEngine;
use crate::error::{AccelError, Result};
use dotacc_chip::format::CHUNK_WIDTH;
use std::path::Path;

/// Linear multiclass model scored on a [`DotProductEngine`]
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticModel {
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

impl LogisticModel {
    /// Model from per-class coefficient rows and intercepts
    ///
    /// # Errors
    ///
    /// Returns error if there are no classes, the number of rows and
    /// intercepts differ, or rows have different lengths.
    pub fn new(coefficients: Vec<Vec<f64>>, intercepts: Vec<f64>) -> Result<Self> {
        if coefficients.is_empty() {
            return Err(AccelError::invalid_model("no classes"));
        }
        if coefficients.len() != intercepts.len() {
            return Err(AccelError::invalid_model(format!(
                "{} coefficient rows but {} intercepts",
                coefficients.len(),
                intercepts.len()
            )));
        }
        let n = coefficients[0].len();
        if let Some((k, row)) = coefficients.iter().enumerate().find(|(_, r)| r.len() != n) {
            return Err(AccelError::invalid_model(format!(
                "class {k} has {} coefficients, class 0 has {n}",
                row.len()
            )));
        }
        if n % CHUNK_WIDTH != 0 {
            tracing::warn!(
                "{n} features is not a multiple of {CHUNK_WIDTH}; the last {} are ignored",
                n % CHUNK_WIDTH
            );
        }
        Ok(Self {
            coefficients,
            intercepts,
        })
    }

    /// Parse the text model format
    ///
    /// # Errors
    ///
    /// Returns error on unparsable numbers or an inconsistent model.
    pub fn parse(text: &str) -> Result<Self> {
        let mut coefficients = Vec::new();
        let mut intercepts = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let values = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|t| !t.is_empty())
                .map(str::parse::<f64>)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| AccelError::invalid_model(format!("line {}: {e}", lineno + 1)))?;
            let Some((&intercept, coef)) = values.split_first() else {
                continue;
            };
            intercepts.push(intercept);
            coefficients.push(coef.to_vec());
        }
        Self::new(coefficients, intercepts)
    }

    /// Read and parse a model file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or fails [`Self::parse`].
    pub fn load(path: &Path) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Number of classes
    pub fn classes(&self) -> usize {
        self.intercepts.len()
    }

    /// Number of features per sample
    pub fn features(&self) -> usize {
        self.coefficients[0].len()
    }

    /// Per-class linear scores
    ///
    /// # Panics
    ///
    /// Panics if `features` is shorter than [`Self::features`].
    pub fn decision_function(&self, engine: &mut DotProductEngine, features: &[f64]) -> Vec<f64> {
        let n = self.features();
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(coef, b)| engine.dot_product(n, features, coef) + b)
            .collect()
    }

    /// Index of the highest-scoring class (first on ties)
    ///
    /// # Panics
    ///
    /// Panics if `features` is shorter than [`Self::features`].
    pub fn predict(&self, engine: &mut DotProductEngine, features: &[f64]) -> usize {
        argmax(&self.decision_function(engine, features))
    }

    /// Predicted class and class probabilities from one pass over the engine
    ///
    /// # Panics
    ///
    /// Panics if `features` is shorter than [`Self::features`].
    pub fn classify(&self, engine: &mut DotProductEngine, features: &[f64]) -> (usize, Vec<f64>) {
        let scores = self.decision_function(engine, features);
        (argmax(&scores), softmax(&scores))
    }

    /// Softmax of the class scores
    ///
    /// # Panics
    ///
    /// Panics if `features` is shorter than [`Self::features`].
    pub fn predict_proba(&self, engine: &mut DotProductEngine, features: &[f64]) -> Vec<f64> {
        softmax(&self.decision_function(engine, features))
    }
}

fn argmax(scores: &[f64]) -> usize {
    scores
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best, max), (i, &s)| {
            if s > max {
                (i, s)
            } else {
                (best, max)
            }
        })
        .0
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
