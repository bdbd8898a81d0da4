/// One raw model detection: a class id and its confidence.
///
/// Labels are resolved separately via [`crate::classify::LabelTable`];
/// the backend reports whatever numeric class the model emitted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub class_id: u32,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

/// Select the primary detection from a model's output set.
///
/// Deliberately the FIRST entry in the model's native ordering, never
/// re-sorted by confidence: on the belt, the first detection is the item
/// currently in the classification position.
pub fn primary_detection(detections: &[Detection]) -> Option<&Detection> {
    detections.first()
}
