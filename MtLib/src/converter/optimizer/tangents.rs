//! Per-vertex tangent generation

use glam::{Vec2, Vec3, Vec4};

use crate::converter::intermediate::{ImVertex, UvChannel};

/// First UV channel present on the vertices.
pub fn tangent_uv_channel(vertices: &[ImVertex]) -> Option<UvChannel> {
    UvChannel::ALL
        .into_iter()
        .find(|&c| vertices.iter().any(|v| v.uv(c).is_some()))
}

/// Compute tangents from positions and `channel` UVs of an indexed triangle list.
///
/// Triangle contributions are accumulated on their three corners, then made
/// orthogonal to the normal. The handedness goes into `w`. Vertices left with a
/// non-finite tangent take the tangent of the closest vertex that has one.
pub fn generate_tangents(vertices: &mut [ImVertex], indices: &[u32], channel: UvChannel) {
    let mut tangents = vec![Vec3::ZERO; vertices.len()];
    let mut bitangents = vec![Vec3::ZERO; vertices.len()];
    let uv = |v: &ImVertex| v.uv(channel).unwrap_or(Vec2::ZERO);

    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
            continue;
        }
        let dp1 = vertices[c].position - vertices[a].position;
        let dp2 = vertices[b].position - vertices[a].position;
        let duv1 = uv(&vertices[c]) - uv(&vertices[a]);
        let duv2 = uv(&vertices[b]) - uv(&vertices[a]);

        let sign = if duv2.x > 0.0 { 1.0 } else { -1.0 };
        let dir = -(duv1.x * duv2.y - duv1.y * sign);
        let t = (dp1 * duv2.y - dp2 * duv1.y) * dir;
        let bt = (dp2 * duv1.x - dp1 * duv2.x) * dir;

        for i in [a, b, c] {
            tangents[i] += t;
            bitangents[i] += bt;
        }
    }

    for (i, v) in vertices.iter_mut().enumerate() {
        let n = v.normal;
        let t = tangents[i].normalize();
        let b = bitangents[i].normalize();
        let t = (t - n * t.dot(n)).normalize();
        let b = (b - n * b.dot(n)).normalize();
        let handedness = if n.cross(t).normalize().dot(b) > 0.0 { 1.0 } else { -1.0 };
        v.tangent = t.extend(handedness);
    }

    repair_tangents(vertices);
}

fn has_finite_tangent(v: &ImVertex) -> bool {
    v.tangent.truncate().is_finite()
}

/// Replace non-finite tangents with the nearest finite one.
///
/// Falls back to a direction orthogonal to the normal when no vertex has a finite tangent.
pub fn repair_tangents(vertices: &mut [ImVertex]) {
    let broken: Vec<usize> = (0..vertices.len())
        .filter(|&i| !has_finite_tangent(&vertices[i]))
        .collect();
    if broken.is_empty() {
        return;
    }
    tracing::debug!("Repairing {} non-finite tangents", broken.len());

    for i in broken {
        let position = vertices[i].position;
        let nearest = vertices
            .iter()
            .enumerate()
            .filter(|(j, v)| *j != i && has_finite_tangent(v))
            .min_by(|(_, a), (_, b)| {
                position
                    .distance_squared(a.position)
                    .total_cmp(&position.distance_squared(b.position))
            })
            .map(|(_, v)| v.tangent);

        vertices[i].tangent = nearest.unwrap_or_else(|| {
            let n = vertices[i].normal.try_normalize().unwrap_or(Vec3::Z);
            n.any_orthonormal_vector().extend(1.0)
        });
    }
}

/// Whether every tangent component is a finite number.
pub fn tangents_finite(vertices: &[ImVertex]) -> bool {
    vertices.iter().all(|v| Vec4::is_finite(v.tangent))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> (Vec<ImVertex>, Vec<u32>) {
        let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        let vertices = corners
            .iter()
            .map(|&(x, y)| {
                let mut v = ImVertex::new(Vec3::new(x, y, 0.0), Vec3::Z);
                v.set_uv(UvChannel::Primary, Vec2::new(x, y));
                v
            })
            .collect();
        (vertices, vec![0, 1, 2, 0, 2, 3])
    }

    #[test]
    fn test_planar_quad() {
        let (mut vertices, indices) = quad();
        generate_tangents(&mut vertices, &indices, UvChannel::Primary);
        for v in &vertices {
            assert!(v.tangent.truncate().dot(v.normal).abs() < 1e-5);
            assert!((v.tangent.truncate().length() - 1.0).abs() < 1e-5);
            assert!(v.tangent.w == 1.0 || v.tangent.w == -1.0);
            assert!(v.tangent.x.abs() > 0.99);
        }
    }

    #[test]
    fn test_degenerate_uvs_become_finite() {
        let (mut vertices, indices) = quad();
        // collapse the UVs of the second triangle
        for v in &mut vertices[2..] {
            v.set_uv(UvChannel::Primary, Vec2::ZERO);
        }
        vertices.push(ImVertex::new(Vec3::new(5.0, 5.0, 0.0), Vec3::Z));
        generate_tangents(&mut vertices, &indices, UvChannel::Primary);
        assert!(tangents_finite(&vertices));
    }

    #[test]
    fn test_all_broken_falls_back() {
        let mut vertices = vec![ImVertex::new(Vec3::ZERO, Vec3::Y); 3];
        for v in &mut vertices {
            v.tangent = Vec4::NAN;
        }
        repair_tangents(&mut vertices);
        assert!(tangents_finite(&vertices));
    }

    #[test]
    fn test_channel_detection() {
        let (vertices, _) = quad();
        assert_eq!(tangent_uv_channel(&vertices), Some(UvChannel::Primary));
        assert_eq!(tangent_uv_channel(&[ImVertex::default()]), None);
    }
}
