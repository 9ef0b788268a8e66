use std::path::Path;
use tract_onnx::prelude::*;

use crate::error::ModelError;
use crate::preprocess::ModelInput;

/// Anything that can turn a preprocessed image into a tumor probability.
pub trait Classifier: Send + Sync {
    fn predict(&self, input: &ModelInput) -> Result<f64, ModelError>;
}

/// ONNX export of the ResNet50 binary classifier, loaded once at startup.
pub struct OnnxClassifier {
    plan: TypedRunnableModel<TypedModel>,
}

impl OnnxClassifier {
    pub fn load(path: &Path, input_shape: [usize; 4]) -> Result<Self, ModelError> {
        let load_err = |e: TractError| ModelError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(load_err)?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(input_shape[0], input_shape[1], input_shape[2], input_shape[3]),
                ),
            )
            .map_err(load_err)?
            .into_optimized()
            .map_err(load_err)?
            .into_runnable()
            .map_err(load_err)?;

        Ok(Self { plan })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, input: &ModelInput) -> Result<f64, ModelError> {
        let contiguous = input.as_standard_layout();
        let data = contiguous
            .as_slice()
            .ok_or_else(|| ModelError::Inference("input tensor is not contiguous".into()))?;
        let tensor = Tensor::from_shape(input.shape(), data)
            .map_err(|e| ModelError::Inference(e.to_string()))?;

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| ModelError::Inference(e.to_string()))?;

        let output = outputs
            .first()
            .ok_or(ModelError::EmptyOutput)?
            .to_array_view::<f32>()
            .map_err(|e| ModelError::Inference(e.to_string()))?;
        let probability = output.iter().next().copied().ok_or(ModelError::EmptyOutput)? as f64;

        validate_probability(probability)
    }
}

pub fn validate_probability(p: f64) -> Result<f64, ModelError> {
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(ModelError::OutOfRange(p))
    }
}
