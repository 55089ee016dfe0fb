//! Skin weight reduction and packing

use crate::converter::intermediate::ImVertex;
use crate::error::{Error, Result};
use crate::formats::vertex::VertexFormat;

/// Weights at or below this are treated as unused.
pub const WEIGHT_EPSILON: f32 = 0.001;

/// Most influences any vertex record can store.
pub const MAX_INFLUENCES: usize = 4;

/// Check that every vertex has one joint index per weight.
pub fn validate_influences(mesh: &str, vertices: &[ImVertex]) -> Result<()> {
    for (i, v) in vertices.iter().enumerate() {
        if v.weights.len() != v.joints.len() {
            return Err(Error::WeightJointMismatch {
                mesh: mesh.to_string(),
                vertex: i,
                weights: v.weights.len(),
                joints: v.joints.len(),
            });
        }
    }
    Ok(())
}

/// Keep the `max` strongest influences and spread the dropped weight equally over them.
pub fn reduce_weights(v: &mut ImVertex, max: usize) {
    if v.weights.len() <= max || max == 0 {
        return;
    }

    let mut pairs: Vec<(f32, u8)> = v.weights.iter().copied().zip(v.joints.iter().copied()).collect();
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));
    pairs.truncate(max);

    let kept: f32 = pairs.iter().map(|p| p.0).sum();
    let step = (1.0 - kept) / pairs.len() as f32;
    v.weights = pairs.iter().map(|p| p.0 + step).collect();
    v.joints = pairs.iter().map(|p| p.1).collect();
}

/// Joints and weights as stored in a record of `format`.
///
/// Weights below [`WEIGHT_EPSILON`] become 0, unused slots repeat the last joint
/// with weight 0 and the rounding residual is spread over the used weights. The
/// one-weight layout stores the strongest influence. A vertex without influences
/// is an error in every skinned layout.
pub fn pack_influences(
    v: &ImVertex,
    format: VertexFormat,
    mesh: &str,
    vertex: usize,
) -> Result<([u8; 4], [f32; 4])> {
    let mut joints = [0u8; 4];
    let mut weights = [0f32; 4];

    let unrigged = || Error::UnriggedVertex {
        mesh: mesh.to_string(),
        vertex,
    };

    match format.max_weights() {
        0 => {}
        1 => {
            let strongest = v
                .weights
                .iter()
                .zip(&v.joints)
                .filter(|(w, _)| **w > WEIGHT_EPSILON)
                .max_by(|a, b| a.0.total_cmp(b.0))
                .ok_or_else(unrigged)?;
            joints[0] = *strongest.1;
            weights[0] = 1.0;
        }
        slots => {
            let mut last_joint = 0;
            let mut sum = 0.0;
            let mut used = [false; 4];
            for j in 0..slots {
                let (Some(&weight), Some(&joint)) = (v.weights.get(j), v.joints.get(j)) else {
                    joints[j] = last_joint;
                    continue;
                };
                let weight = if weight < WEIGHT_EPSILON { 0.0 } else { weight };
                joints[j] = joint;
                weights[j] = weight;
                last_joint = joint;
                sum += weight;
                used[j] = weight > WEIGHT_EPSILON;
            }

            let used_count = used.iter().filter(|&&u| u).count();
            if used_count == 0 {
                return Err(unrigged());
            }
            let step = (1.0 - sum) / used_count as f32;
            for (w, _) in weights.iter_mut().zip(used).filter(|(_, u)| *u) {
                *w += step;
            }
        }
    }
    Ok((joints, weights))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn skinned(influences: &[(u8, f32)]) -> ImVertex {
        let mut v = ImVertex::new(Vec3::ZERO, Vec3::Y);
        for &(j, w) in influences {
            v.add_influence(j, w);
        }
        v
    }

    #[test]
    fn test_reduce_keeps_strongest() {
        let mut v = skinned(&[(0, 0.05), (1, 0.4), (2, 0.1), (3, 0.3), (4, 0.15)]);
        reduce_weights(&mut v, 4);
        assert_eq!(v.joints, vec![1, 3, 4, 2]);
        assert_eq!(v.weights.len(), 4);
        assert!((v.weights.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        assert!((v.weights[0] - 0.4125).abs() < 1e-6);
    }

    #[test]
    fn test_reduce_leaves_small_lists() {
        let mut v = skinned(&[(0, 0.6), (1, 0.4)]);
        reduce_weights(&mut v, 4);
        assert_eq!(v.joints, vec![0, 1]);
        assert_eq!(v.weights, vec![0.6, 0.4]);
    }

    #[test]
    fn test_pack_repeats_last_joint() {
        let v = skinned(&[(5, 0.7), (9, 0.2)]);
        let (joints, weights) = pack_influences(&v, VertexFormat::IASkinTB4wt, "m", 0).unwrap();
        assert_eq!(joints, [5, 9, 9, 9]);
        assert_eq!(weights[2], 0.0);
        assert_eq!(weights[3], 0.0);
        assert!((weights[0] - 0.75).abs() < 1e-6);
        assert!((weights[1] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_pack_drops_tiny_weights() {
        let v = skinned(&[(1, 0.9995), (2, 0.0005)]);
        let (joints, weights) = pack_influences(&v, VertexFormat::IASkinTB2wt, "m", 0).unwrap();
        assert_eq!(joints, [1, 2, 0, 0]);
        assert_eq!(weights[1], 0.0);
        assert!((weights[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pack_unrigged() {
        let v = skinned(&[]);
        assert!(matches!(
            pack_influences(&v, VertexFormat::IASkinTB2wt, "body", 7),
            Err(Error::UnriggedVertex { vertex: 7, .. })
        ));
        assert!(matches!(
            pack_influences(&v, VertexFormat::IASkinTB1wt, "body", 7),
            Err(Error::UnriggedVertex { vertex: 7, .. })
        ));
    }

    #[test]
    fn test_pack_single_weight_takes_strongest() {
        let v = skinned(&[(0, 0.1), (3, 0.9)]);
        let (joints, weights) = pack_influences(&v, VertexFormat::IASkinTB1wt, "m", 0).unwrap();
        assert_eq!(joints[0], 3);
        assert_eq!(weights[0], 1.0);

        let v = skinned(&[(6, 0.0005), (2, 0.0)]);
        assert!(pack_influences(&v, VertexFormat::IASkinTB1wt, "m", 0).is_err());
    }

    #[test]
    fn test_validate_mismatch() {
        let mut v = skinned(&[(1, 1.0)]);
        v.joints.push(2);
        assert!(matches!(
            validate_influences("m", &[v]),
            Err(Error::WeightJointMismatch { weights: 1, joints: 2, .. })
        ));
    }
}
