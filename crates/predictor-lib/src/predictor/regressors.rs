//! Regression model implementations
//!
//! Tree ensembles and linear models are stored as JSON documents; the tree
//! layout mirrors a fitted scikit-learn tree (parallel node arrays, leaves
//! marked by a `-1` left child). ONNX graphs run through tract, which only
//! implements the core operator set: `ai.onnx.ml` tree and linear regressors
//! do not load, so forests must be exported as plain tensor ops (for example
//! a tensor-compiled forest) or as JSON.

use super::Regressor;
use crate::models::ModelDescription;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tract_onnx::prelude::*;

/// Marker for "no child" in the node arrays
const LEAF: i64 = -1;

fn empty_parameters() -> Value {
    Value::Object(Default::default())
}

/// A single regression tree in parallel-array form
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<f64>,
}

impl DecisionTree {
    fn node_count(&self) -> usize {
        self.value.len()
    }

    fn is_leaf(&self, node: usize) -> bool {
        self.children_left[node] == LEAF
    }

    /// Check array lengths, child links and feature indices
    fn validate(&self, n_features: usize) -> Result<()> {
        let n = self.node_count();
        if n == 0 {
            bail!("tree has no nodes");
        }
        if self.children_left.len() != n
            || self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
        {
            bail!("tree node arrays have different lengths");
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == LEAF {
                if right != LEAF {
                    bail!("node {} has a right child but no left child", node);
                }
                continue;
            }
            // Children always come after their parent, which rules out cycles
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    bail!("node {} links to invalid child {}", node, child);
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                bail!("node {} splits on invalid feature {}", node, feature);
            }
        }
        Ok(())
    }

    pub fn predict(&self, input: &[f64]) -> f64 {
        let mut node = 0;
        while !self.is_leaf(node) {
            let feature = self.feature[node] as usize;
            // Inputs are rounded to f32 like the fitted estimator, thresholds stay f64
            let x = f64::from(input[feature] as f32);
            node = if x <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        self.value[node]
    }
}

/// Averaging tree ensemble (random forest)
#[derive(Debug, Clone, Deserialize)]
pub struct ForestRegressor {
    pub n_features: usize,
    #[serde(default = "empty_parameters")]
    pub parameters: Value,
    pub trees: Vec<DecisionTree>,
}

impl ForestRegressor {
    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            bail!("forest has no trees");
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .with_context(|| format!("Invalid tree {}", i))?;
        }
        Ok(())
    }
}

impl Regressor for ForestRegressor {
    fn predict(&self, input: &[f64]) -> Result<f64> {
        if input.len() != self.n_features {
            bail!(
                "Model expects {} features, got {}",
                self.n_features,
                input.len()
            );
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(input)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    fn describe(&self) -> ModelDescription {
        ModelDescription {
            model_type: "RandomForestRegressor".to_string(),
            parameters: self.parameters.clone(),
            n_features: Some(self.n_features),
            n_estimators: Some(self.trees.len()),
        }
    }
}

/// Ordinary least squares model: `intercept + coefficients · x`
#[derive(Debug, Clone, Deserialize)]
pub struct LinearRegressor {
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
    #[serde(default = "empty_parameters")]
    pub parameters: Value,
}

impl LinearRegressor {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
            parameters: empty_parameters(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.coefficients.is_empty() {
            bail!("linear model has no coefficients");
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            bail!("linear model has non-finite weights");
        }
        Ok(())
    }
}

impl Regressor for LinearRegressor {
    fn predict(&self, input: &[f64]) -> Result<f64> {
        if input.len() != self.coefficients.len() {
            bail!(
                "Model expects {} features, got {}",
                self.coefficients.len(),
                input.len()
            );
        }
        let dot: f64 = self
            .coefficients
            .iter()
            .zip(input)
            .map(|(w, x)| w * x)
            .sum();
        Ok(self.intercept + dot)
    }

    fn describe(&self) -> ModelDescription {
        ModelDescription {
            model_type: "LinearRegression".to_string(),
            parameters: self.parameters.clone(),
            n_features: Some(self.coefficients.len()),
            n_estimators: None,
        }
    }
}

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX regressor executed with tract
pub struct OnnxRegressor {
    model: TractModel,
    n_features: usize,
}

impl OnnxRegressor {
    /// Load an ONNX model whose single input is `f32[1, n_features]`
    pub fn from_bytes(model_bytes: &[u8], n_features: usize) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, n_features]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(Self { model, n_features })
    }
}

impl Regressor for OnnxRegressor {
    fn predict(&self, input: &[f64]) -> Result<f64> {
        if input.len() != self.n_features {
            bail!(
                "Model expects {} features, got {}",
                self.n_features,
                input.len()
            );
        }
        let data: Vec<f32> = input.iter().map(|v| *v as f32).collect();
        let tensor: Tensor = tract_ndarray::Array2::from_shape_vec((1, self.n_features), data)
            .context("Failed to shape model input")?
            .into();

        let result = self.model.run(tvec!(tensor.into()))?;
        let output = result.first().context("No output from model")?;
        let view = output.to_array_view::<f32>()?;
        let value = view.iter().next().copied().context("Model output is empty")?;
        Ok(value as f64)
    }

    fn describe(&self) -> ModelDescription {
        ModelDescription {
            model_type: "OnnxRegressor".to_string(),
            parameters: json!({ "format": "onnx", "input_shape": [1, self.n_features] }),
            n_features: Some(self.n_features),
            n_estimators: None,
        }
    }
}
