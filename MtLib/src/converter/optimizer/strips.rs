//! Triangle strip encoding and decoding

/// Strip restart marker.
pub const STRIP_RESTART: u16 = 0xFFFF;

/// Encode a triangle list as one strip per triangle, separated by restarts.
pub fn fake_strips(indices: &[u16]) -> Vec<u16> {
    let mut out = Vec::with_capacity(indices.len() / 3 * 4);
    for (i, tri) in indices.chunks_exact(3).enumerate() {
        if i > 0 {
            out.push(STRIP_RESTART);
        }
        out.extend_from_slice(tri);
    }
    out
}

/// Decode a restart-separated strip into triangles with alternating winding.
pub fn strip_to_triangles(indices: &[u16]) -> Vec<[u16; 3]> {
    let mut tris = Vec::new();
    let mut iter = indices.iter().copied();
    let (Some(mut a), Some(mut b)) = (iter.next(), iter.next()) else {
        return tris;
    };
    let mut flip = true;

    while let Some(c) = iter.next() {
        if c == STRIP_RESTART {
            let (Some(na), Some(nb)) = (iter.next(), iter.next()) else {
                break;
            };
            a = na;
            b = nb;
            flip = true;
            continue;
        }
        flip = !flip;
        tris.push(if flip { [c, b, a] } else { [a, b, c] });
        a = b;
        b = c;
    }
    tris
}

/// Split a plain triangle list.
pub fn list_to_triangles(indices: &[u16]) -> Vec<[u16; 3]> {
    indices
        .chunks_exact(3)
        .map(|t| [t[0], t[1], t[2]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_strips() {
        assert_eq!(fake_strips(&[0, 1, 2, 2, 1, 3]), vec![0, 1, 2, 0xFFFF, 2, 1, 3]);
        assert_eq!(fake_strips(&[4, 5, 6]), vec![4, 5, 6]);
        assert!(fake_strips(&[]).is_empty());
    }

    #[test]
    fn test_fake_strips_decode_to_same_triangles() {
        let list = [0, 1, 2, 2, 1, 3, 7, 8, 9];
        assert_eq!(strip_to_triangles(&fake_strips(&list)), list_to_triangles(&list));
    }

    #[test]
    fn test_real_strip_alternates_winding() {
        let tris = strip_to_triangles(&[0, 1, 2, 3, 4]);
        assert_eq!(tris, vec![[0, 1, 2], [3, 2, 1], [2, 3, 4]]);
    }
}
