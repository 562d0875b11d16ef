use crate::config::DetectorConfig;
use crate::detector::{Detection, DetectorError, VehicleDetector};
use image::{imageops::FilterType, DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::{s, Array, ArrayD, Axis, Ix4};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::path::Path;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

const INPUT_SIZE: u32 = 640;
const IOU_THRESHOLD: f32 = 0.7;
const BOX_THICKNESS: i64 = 3;

/// COCO class ids counted as vehicles, with the color their boxes are
/// drawn in.
const VEHICLE_CLASSES: [(usize, Rgb<u8>); 4] = [
    (2, Rgb([46, 204, 113])),  // car
    (3, Rgb([52, 152, 219])),  // motorcycle
    (5, Rgb([241, 196, 15])),  // bus
    (7, Rgb([231, 76, 60])),   // truck
];

#[derive(Debug, Clone, Copy)]
struct BoundingBox {
    class_id: usize,
    confidence: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

fn vehicle_color(class_id: usize) -> Option<Rgb<u8>> {
    VEHICLE_CLASSES
        .iter()
        .find(|(id, _)| *id == class_id)
        .map(|(_, color)| *color)
}

fn intersection(box1: &BoundingBox, box2: &BoundingBox) -> f32 {
    (box1.x2.min(box2.x2) - box1.x1.max(box2.x1)) * (box1.y2.min(box2.y2) - box1.y1.max(box2.y1))
}

fn union(box1: &BoundingBox, box2: &BoundingBox) -> f32 {
    ((box1.x2 - box1.x1) * (box1.y2 - box1.y1)) + ((box2.x2 - box2.x1) * (box2.y2 - box2.y1))
        - intersection(box1, box2)
}

fn prepare_input(img: &DynamicImage) -> (Array<f32, Ix4>, u32, u32) {
    let (img_width, img_height) = img.dimensions();
    let resized = img.resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom);

    let mut input = Array::zeros((1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize));
    for pixel in resized.pixels() {
        let x = pixel.0 as usize;
        let y = pixel.1 as usize;
        let [r, g, b, _] = pixel.2 .0;
        input[[0, 0, y, x]] = (r as f32) / 255.;
        input[[0, 1, y, x]] = (g as f32) / 255.;
        input[[0, 2, y, x]] = (b as f32) / 255.;
    }

    (input, img_width, img_height)
}

/// Walks the raw `[1, 4 + classes, candidates]` output and keeps the
/// vehicle-class candidates above the confidence threshold, with
/// coordinates scaled back to the original image.
fn collect_vehicle_boxes(
    outputs: &ArrayD<f32>,
    img_width: u32,
    img_height: u32,
    min_probability: f32,
) -> Vec<BoundingBox> {
    let output = outputs.slice(s![0, .., ..]);
    let mut boxes = Vec::new();

    for candidate in output.axis_iter(Axis(1)) {
        let candidate: Vec<f32> = candidate.iter().copied().collect();
        let Some((class_id, prob)) = candidate
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .reduce(|accum, row| if row.1 > accum.1 { row } else { accum })
        else {
            continue;
        };

        if prob < min_probability || vehicle_color(class_id).is_none() {
            continue;
        }

        let xc = candidate[0] / INPUT_SIZE as f32 * (img_width as f32);
        let yc = candidate[1] / INPUT_SIZE as f32 * (img_height as f32);
        let w = candidate[2] / INPUT_SIZE as f32 * (img_width as f32);
        let h = candidate[3] / INPUT_SIZE as f32 * (img_height as f32);

        boxes.push(BoundingBox {
            class_id,
            confidence: prob,
            x1: xc - w / 2.,
            y1: yc - h / 2.,
            x2: xc + w / 2.,
            y2: yc + h / 2.,
        });
    }

    boxes
}

fn non_maximum_suppression(mut boxes: Vec<BoundingBox>) -> Vec<BoundingBox> {
    boxes.sort_by(|box1, box2| box2.confidence.total_cmp(&box1.confidence));

    let mut result = Vec::new();
    while !boxes.is_empty() {
        result.push(boxes[0]);
        boxes = boxes
            .iter()
            .filter(|other| intersection(&boxes[0], other) / union(&boxes[0], other) < IOU_THRESHOLD)
            .copied()
            .collect();
    }

    result
}

fn draw_box(img: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
    let (width, height) = img.dimensions();
    let clamp_x = |v: f32| (v as i64).clamp(0, width as i64 - 1);
    let clamp_y = |v: f32| (v as i64).clamp(0, height as i64 - 1);
    let (x1, y1) = (clamp_x(bbox.x1), clamp_y(bbox.y1));
    let (x2, y2) = (clamp_x(bbox.x2), clamp_y(bbox.y2));

    for t in 0..BOX_THICKNESS {
        for x in x1..=x2 {
            img.put_pixel(x as u32, clamp_y((y1 + t) as f32) as u32, color);
            img.put_pixel(x as u32, clamp_y((y2 - t) as f32) as u32, color);
        }
        for y in y1..=y2 {
            img.put_pixel(clamp_x((x1 + t) as f32) as u32, y as u32, color);
            img.put_pixel(clamp_x((x2 - t) as f32) as u32, y as u32, color);
        }
    }
}

fn annotate(img: &mut RgbImage, boxes: &[BoundingBox]) {
    for bbox in boxes {
        if let Some(color) = vehicle_color(bbox.class_id) {
            draw_box(img, bbox, color);
        }
    }
}

/// YOLO-family detector backed by a small pool of ONNX sessions, picked
/// round-robin so concurrent requests do not queue on a single session.
pub struct OrtVehicleDetector {
    sessions: Arc<Vec<Arc<Mutex<Session>>>>,
    counter: AtomicUsize,
    min_probability: f32,
}

impl OrtVehicleDetector {
    pub fn new(detector_config: &DetectorConfig) -> anyhow::Result<Self> {
        ort::init().commit()?;

        let num_instances = detector_config.num_instances;
        let sessions = (0..num_instances)
            .map(|_| {
                let session = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .commit_from_file(detector_config.get_model_path())?;
                Ok(Arc::new(Mutex::new(session)))
            })
            .collect::<Result<Vec<_>, ort::Error>>()?;

        tracing::info!("Created {} ONNX sessions", num_instances);

        Ok(Self {
            sessions: Arc::new(sessions),
            counter: AtomicUsize::new(0),
            min_probability: detector_config.min_probability,
        })
    }

    fn run_inference(&self, input: &Array<f32, Ix4>) -> Result<ArrayD<f32>, DetectorError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.sessions.len();
        let session_arc = &self.sessions[index];
        let mut session = session_arc
            .lock()
            .map_err(|e| DetectorError::Inference(format!("session mutex poisoned: {}", e)))?;

        tracing::debug!("Handling detection with session {}", index);
        let tensor_ref = TensorRef::from_array_view(input.view())
            .map_err(|e| DetectorError::Inference(format!("failed to build tensor: {}", e)))?;

        let input_tensor = ort::inputs![tensor_ref];

        let outputs = session
            .run(input_tensor)
            .map_err(|e| DetectorError::Inference(format!("inference failed: {}", e)))?;

        let (shape, data) = outputs["output0"]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::Inference(format!("failed to extract tensor: {}", e)))?;

        let ix = shape.to_ixdyn();
        let array = ArrayD::from_shape_vec(ix, data.to_vec())
            .map_err(|e| DetectorError::Inference(format!("invalid tensor shape: {}", e)))?;

        Ok(array)
    }
}

impl VehicleDetector for OrtVehicleDetector {
    fn detect_vehicles(&self, path: &Path) -> Result<Detection, DetectorError> {
        let bytes = std::fs::read(path).map_err(DetectorError::Io)?;
        let original = image::load_from_memory(&bytes).map_err(DetectorError::InvalidImage)?;

        let (input, img_width, img_height) = prepare_input(&original);
        let outputs = self.run_inference(&input)?;

        let boxes = collect_vehicle_boxes(&outputs, img_width, img_height, self.min_probability);
        let boxes = non_maximum_suppression(boxes);

        let mut annotated = original.to_rgb8();
        annotate(&mut annotated, &boxes);

        Ok(Detection {
            vehicle_count: boxes.len() as u32,
            image: annotated,
        })
    }
}
