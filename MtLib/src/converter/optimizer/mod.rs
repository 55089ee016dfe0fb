//! Mesh optimizer
//!
//! Turns one [`ImPrimitive`] into the vertex and index lists a MOD primitive stores:
//!
//! 1. resolve the triangle list and reduce skin weights to four influences
//! 2. pick the smallest vertex layout that holds the influences
//! 3. merge bit-identical vertices and build the index list
//! 4. generate tangents when the mesh has UVs
//! 5. check the per-primitive limits and optionally encode strips
//!
//! Nothing is shared between primitives.

mod bounds;
mod dedup;
mod strips;
mod tangents;
mod weights;

pub use bounds::Bounds;
pub use dedup::deduplicate;
pub use strips::{STRIP_RESTART, fake_strips, list_to_triangles, strip_to_triangles};
pub use tangents::{generate_tangents, repair_tangents, tangent_uv_channel, tangents_finite};
pub use weights::{
    MAX_INFLUENCES, WEIGHT_EPSILON, pack_influences, reduce_weights, validate_influences,
};

use super::intermediate::{ImPrimitive, ImVertex};
use crate::error::{Error, Result};
use crate::formats::vertex::VertexFormat;

/// Most vertices one primitive may hold.
pub const MAX_PRIMITIVE_VERTICES: usize = 26758;
/// Most indices one primitive may hold.
pub const MAX_PRIMITIVE_INDICES: usize = 63762;

/// Optimizer output for one primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedPrimitive {
    pub format: VertexFormat,
    pub vertices: Vec<ImVertex>,
    /// Triangle list, or restart-separated strips
    pub indices: Vec<u16>,
    pub triangle_count: usize,
}

/// Optimize one primitive.
///
/// # Errors
/// Fails on mismatched weight lists, bad indices or when the primitive exceeds
/// [`MAX_PRIMITIVE_VERTICES`] / [`MAX_PRIMITIVE_INDICES`].
pub fn optimize_primitive(
    prim: &ImPrimitive,
    model_has_joints: bool,
    use_tri_strips: bool,
) -> Result<OptimizedPrimitive> {
    validate_influences(&prim.name, &prim.vertices)?;

    let mut corners = prim.triangle_vertices()?;
    for v in &mut corners {
        if v.weights.len() > MAX_INFLUENCES {
            reduce_weights(v, MAX_INFLUENCES);
        }
    }

    let influences = corners
        .iter()
        .map(ImVertex::used_influences)
        .max()
        .unwrap_or(0);
    let has_uv = prim.has_uvs();
    let format = match prim.vertex_format {
        Some(requested) => {
            let format = requested.upgrade_for(influences);
            if format != requested {
                tracing::warn!(
                    "Mesh '{}': {} cannot hold {} influences, using {}",
                    prim.name,
                    requested,
                    influences,
                    format
                );
            }
            format
        }
        None => VertexFormat::select(influences, model_has_joints, has_uv),
    };

    let (mut vertices, indices) = deduplicate(&corners);
    if let Some(channel) = tangent_uv_channel(&vertices) {
        generate_tangents(&mut vertices, &indices, channel);
    }

    if vertices.len() > MAX_PRIMITIVE_VERTICES {
        return Err(Error::PrimitiveLimit {
            mesh: prim.name.clone(),
            what: "vertices",
            count: vertices.len(),
            limit: MAX_PRIMITIVE_VERTICES,
        });
    }

    // bounded by the vertex limit
    let triangle_count = indices.len() / 3;
    let list: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
    let indices = if use_tri_strips { fake_strips(&list) } else { list };

    if indices.len() > MAX_PRIMITIVE_INDICES {
        return Err(Error::PrimitiveLimit {
            mesh: prim.name.clone(),
            what: "indices",
            count: indices.len(),
            limit: MAX_PRIMITIVE_INDICES,
        });
    }

    tracing::debug!(
        "Mesh '{}': {} vertices, {} indices, {}",
        prim.name,
        vertices.len(),
        indices.len(),
        format
    );
    Ok(OptimizedPrimitive {
        format,
        vertices,
        indices,
        triangle_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::intermediate::UvChannel;
    use glam::{Vec2, Vec3};

    fn triangle_pair() -> ImPrimitive {
        let mut prim = ImPrimitive::new("quad", "mat");
        let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        for &(x, y) in &corners {
            let mut v = ImVertex::new(Vec3::new(x, y, 0.0), Vec3::Z);
            v.set_uv(UvChannel::Primary, Vec2::new(x, y));
            prim.vertices.push(v);
        }
        prim.indices = Some(vec![0, 1, 2, 0, 2, 3]);
        prim
    }

    #[test]
    fn test_static_mesh() {
        let out = optimize_primitive(&triangle_pair(), false, false).unwrap();
        assert_eq!(out.format, VertexFormat::IANonSkinTB);
        assert_eq!(out.vertices.len(), 4);
        assert_eq!(out.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(out.triangle_count, 2);
        assert!(tangents_finite(&out.vertices));
    }

    #[test]
    fn test_without_uv_and_with_strips() {
        let mut prim = triangle_pair();
        for v in &mut prim.vertices {
            v.uvs = [None; 4];
        }
        let out = optimize_primitive(&prim, false, true).unwrap();
        assert_eq!(out.format, VertexFormat::IANonSkinB);
        assert_eq!(out.indices, vec![0, 1, 2, 0xFFFF, 0, 2, 3]);
        assert_eq!(out.triangle_count, 2);
    }

    #[test]
    fn test_skinned_format_and_reduction() {
        let mut prim = triangle_pair();
        for v in &mut prim.vertices {
            for j in 0..6 {
                v.add_influence(j, 1.0 / 6.0 + f32::from(j) * 0.01);
            }
        }
        let out = optimize_primitive(&prim, true, false).unwrap();
        assert_eq!(out.format, VertexFormat::IASkinTB4wt);
        for v in &out.vertices {
            assert_eq!(v.weights.len(), 4);
            assert!((v.weights.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_unskinned_mesh_in_skinned_model() {
        let out = optimize_primitive(&triangle_pair(), true, false).unwrap();
        assert_eq!(out.format, VertexFormat::IASkinTB1wt);
    }

    #[test]
    fn test_requested_format_upgrade() {
        let mut prim = triangle_pair();
        prim.vertex_format = Some(VertexFormat::IASkinTB1wt);
        for v in &mut prim.vertices {
            v.add_influence(0, 0.5);
            v.add_influence(1, 0.5);
        }
        let out = optimize_primitive(&prim, true, false).unwrap();
        assert_eq!(out.format, VertexFormat::IASkinTB2wt);
    }

    #[test]
    fn test_vertex_limit() {
        let mut prim = ImPrimitive::new("big", "mat");
        let n = (MAX_PRIMITIVE_VERTICES + 2) / 3 * 3 + 3;
        prim.vertices = (0..n)
            .map(|i| ImVertex::new(Vec3::new(i as f32, 0.0, 0.0), Vec3::Z))
            .collect();
        assert!(matches!(
            optimize_primitive(&prim, false, false),
            Err(Error::PrimitiveLimit { what: "vertices", .. })
        ));
    }

    #[test]
    fn test_index_limit() {
        let mut prim = triangle_pair();
        prim.indices = Some([0, 1, 2].repeat(MAX_PRIMITIVE_INDICES / 3 + 1));
        assert!(matches!(
            optimize_primitive(&prim, false, false),
            Err(Error::PrimitiveLimit { what: "indices", count: 63765, .. })
        ));

        // strips add a separator per triangle
        prim.indices = Some([0, 1, 2].repeat(16_000));
        assert_eq!(optimize_primitive(&prim, false, false).unwrap().indices.len(), 48_000);
        assert!(matches!(
            optimize_primitive(&prim, false, true),
            Err(Error::PrimitiveLimit { what: "indices", count: 63_999, .. })
        ));
    }
}
