use std::fmt;
use std::path::Path;

use crate::{
    config::ModelVariant,
    errors::{MagicMaskError, Result},
    traits::MattingModel,
};
use image::{imageops, imageops::FilterType, GrayImage, ImageBuffer, Luma, RgbImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::{
    execution_providers::{
        CUDAExecutionProvider, ExecutionProvider, ExecutionProviderDispatch,
        TensorRTExecutionProvider,
    },
    session::{builder::SessionBuilder, Session},
    value::TensorRef,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Where inference runs, decided once when a model is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cuda(i32),
    Cpu,
}

impl Device {
    pub fn probe(device_id: i32) -> Self {
        match CUDAExecutionProvider::default()
            .with_device_id(device_id)
            .is_available()
        {
            Ok(true) => Self::Cuda(device_id),
            Ok(false) => Self::Cpu,
            Err(e) => {
                warn!(error = %e, "CUDA availability probe failed, using CPU");
                Self::Cpu
            }
        }
    }

    fn execution_providers(self) -> Vec<ExecutionProviderDispatch> {
        match self {
            Self::Cuda(device_id) => vec![
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ],
            Self::Cpu => Vec::new(),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cuda(id) => write!(f, "cuda:{id}"),
            Self::Cpu => f.write_str("cpu"),
        }
    }
}

fn model_error<E: fmt::Display>(operation: impl Into<String>) -> impl FnOnce(E) -> MagicMaskError {
    let operation = operation.into();
    move |e| MagicMaskError::model(operation, e.to_string())
}

/// ONNX Runtime backed matting network.
pub struct OnnxMattingModel {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    input_size: u32,
}

impl OnnxMattingModel {
    /// Loads `<model_dir>/<variant>.onnx`.
    pub fn load(model_dir: &Path, variant: ModelVariant, device_id: i32) -> Result<Self> {
        let model_path = model_dir.join(variant.file_name());
        if !model_path.is_file() {
            return Err(MagicMaskError::configuration(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }
        Self::new(&model_path, variant, device_id)
    }

    pub fn new(model_path: &Path, variant: ModelVariant, device_id: i32) -> Result<Self> {
        let device = Device::probe(device_id);
        info!(model = %model_path.display(), %variant, %device, "Loading matting model");

        let mut session = SessionBuilder::new()
            .map_err(model_error("session builder init"))?
            .with_execution_providers(device.execution_providers())
            .map_err(model_error("register execution providers"))?
            .with_memory_pattern(true)
            .map_err(model_error("enable memory pattern"))?
            .commit_from_file(model_path)
            .map_err(model_error(format!(
                "load model file: {}",
                model_path.display()
            )))?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| MagicMaskError::model("read model inputs", "model has no inputs"))?;
        let input_name = input.name.clone();
        let input_size = input
            .input_type
            .tensor_shape()
            .and_then(|shape| shape.get(2).copied())
            .filter(|&dim| dim > 0)
            .map_or(variant.default_input_size(), |dim| dim as u32);
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| MagicMaskError::model("read model outputs", "model has no outputs"))?;

        // initialize model
        let data = Array4::<f32>::zeros((1, 3, input_size as usize, input_size as usize));
        session
            .run(ort::inputs![input_name.as_str() => TensorRef::from_array_view(&data)
                .map_err(model_error("warm-up tensor"))?])
            .map_err(model_error("warm-up inference"))?;
        debug!(input_size, %input_name, %output_name, "Matting model ready");

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            input_size,
        })
    }

    /// Runs the network and returns the first prediction plane.
    pub fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array2<f32>> {
        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => TensorRef::from_array_view(&tensor.as_standard_layout())
                .map_err(model_error("input tensor"))?])
            .map_err(model_error("inference"))?;

        let mut plane = outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()
            .map_err(model_error("extract prediction"))?;
        while plane.ndim() > 2 {
            plane = plane.index_axis_move(Axis(0), 0);
        }
        let plane = plane.into_dimensionality::<Ix2>()?.to_owned();
        Ok(plane)
    }
}

impl MattingModel for OnnxMattingModel {
    fn predict_mask(&self, image: &RgbImage) -> Result<GrayImage> {
        let tensor = preprocess(image, self.input_size);
        let prediction = self.predict(tensor.view())?;
        postprocess(&prediction, image.width(), image.height())
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }
}

/// Resizes to the square network input and normalizes with ImageNet statistics.
pub fn preprocess(image: &RgbImage, input_size: u32) -> Array4<f32> {
    let resized = imageops::resize(image, input_size, input_size, FilterType::Lanczos3);
    let mut tensor = resized.as_ndarray3().mapv(|v| f32::from(v) / 255.0);
    for (channel, mut plane) in tensor.outer_iter_mut().enumerate() {
        plane.mapv_inplace(|v| (v - MEAN[channel]) / STD[channel]);
    }
    tensor.insert_axis(Axis(0))
}

/// Scales the prediction back to `width` x `height` and stretches it to `0..=255`.
pub fn postprocess(prediction: &Array2<f32>, width: u32, height: u32) -> Result<GrayImage> {
    let (rows, cols) = prediction.dim();
    let raw: Vec<f32> = prediction.iter().copied().collect();
    let map = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(cols as u32, rows as u32, raw)
        .ok_or_else(|| MagicMaskError::model("wrap prediction", "buffer size mismatch"))?;
    let map = imageops::resize(&map, width, height, FilterType::Triangle);

    let (min, max) = map
        .pixels()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), Luma([v])| {
            (lo.min(*v), hi.max(*v))
        });
    let range = max - min + 1e-8;

    let values = map
        .pixels()
        .map(|Luma([v])| ((v - min) / range * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect();
    GrayImage::from_raw(width, height, values)
        .ok_or_else(|| MagicMaskError::model("build mask", "buffer size mismatch"))
}
