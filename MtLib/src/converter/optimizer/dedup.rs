//! Vertex deduplication and index generation

use indexmap::IndexSet;

use crate::converter::intermediate::ImVertex;

/// Exact bit pattern of every attribute that ends up in a vertex record.
#[derive(Debug, PartialEq, Eq, Hash)]
struct VertexKey(Vec<u32>);

impl VertexKey {
    fn new(v: &ImVertex) -> Self {
        let mut bits = Vec::with_capacity(16 + v.weights.len() * 2);
        bits.extend(v.position.to_array().map(f32::to_bits));
        bits.extend(v.normal.to_array().map(f32::to_bits));
        bits.extend(v.tangent.to_array().map(f32::to_bits));
        for uv in &v.uvs {
            match uv {
                Some(uv) => {
                    bits.push(1);
                    bits.extend(uv.to_array().map(f32::to_bits));
                }
                None => bits.push(0),
            }
        }
        // lengths keep differently sized influence lists apart
        bits.push(v.weights.len() as u32);
        bits.extend(v.weights.iter().map(|w| w.to_bits()));
        bits.extend(v.joints.iter().map(|&j| u32::from(j)));
        Self(bits)
    }
}

/// Merge bit-identical vertices of a triangle list.
///
/// Returns the unique vertices in first-occurrence order and one index per input vertex.
pub fn deduplicate(vertices: &[ImVertex]) -> (Vec<ImVertex>, Vec<u32>) {
    let mut seen = IndexSet::with_capacity(vertices.len());
    let mut unique = Vec::new();
    let mut indices = Vec::with_capacity(vertices.len());

    for v in vertices {
        let (index, inserted) = seen.insert_full(VertexKey::new(v));
        if inserted {
            unique.push(v.clone());
        }
        indices.push(index as u32);
    }

    tracing::debug!(
        "Deduplicated {} vertices to {}",
        vertices.len(),
        unique.len()
    );
    (unique, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};

    fn vertex(x: f32) -> ImVertex {
        let mut v = ImVertex::new(Vec3::new(x, 0.0, 0.0), Vec3::Y);
        v.set_uv(crate::converter::UvChannel::Primary, Vec2::new(x, 0.5));
        v
    }

    #[test]
    fn test_first_occurrence_order() {
        let input = vec![vertex(1.0), vertex(2.0), vertex(1.0), vertex(3.0), vertex(2.0)];
        let (unique, indices) = deduplicate(&input);
        assert_eq!(unique.len(), 3);
        assert_eq!(indices, vec![0, 1, 0, 2, 1]);
        assert_eq!(unique[2].position.x, 3.0);
    }

    #[test]
    fn test_idempotent() {
        let input = vec![vertex(1.0), vertex(2.0), vertex(1.0), vertex(4.0)];
        let (unique, _) = deduplicate(&input);
        let (again, indices) = deduplicate(&unique);
        assert_eq!(again, unique);
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_negative_zero_and_weights_are_distinct() {
        let a = vertex(0.0);
        let b = vertex(-0.0);
        let mut c = vertex(0.0);
        c.add_influence(1, 1.0);
        let (unique, _) = deduplicate(&[a, b, c]);
        assert_eq!(unique.len(), 3);
    }
}
