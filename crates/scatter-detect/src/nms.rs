use scatter_model::detection::BBox;

/// Greedy non-maximum suppression: sort by score descending, keep a box,
/// discard any remaining box whose IoU with it exceeds `iou_threshold`.
/// Matches `torchvision.ops.nms`'s behavior.
pub fn non_max_suppression(boxes: &[BBox], scores: &[f32], iou_threshold: f32) -> Vec<usize> {
    assert_eq!(boxes.len(), scores.len());

    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(std::cmp::Ordering::Equal));

    let mut keep = Vec::new();
    let mut suppressed = vec![false; boxes.len()];

    for &i in &order {
        if suppressed[i] {
            continue;
        }
        keep.push(i);
        for &j in &order {
            if j == i || suppressed[j] {
                continue;
            }
            if boxes[i].iou(&boxes[j]) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Indices of boxes whose score meets `score_threshold`.
pub fn score_filter(scores: &[f32], score_threshold: f32) -> Vec<usize> {
    scores
        .iter()
        .enumerate()
        .filter(|&(_, &s)| s >= score_threshold)
        .map(|(i, _)| i)
        .collect()
}
