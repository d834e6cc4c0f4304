// Flattened mesh record: parallel arrays describing one connected component.
// Optional arrays are either absent or fully sized; partial population is rejected.
use std::collections::{HashMap, HashSet};

use crate::core::error::{Error, ErrorKind, try_vec};

/// Marks a vertex or face with no counterpart in the input meshes.
pub const UNDEFINED_INDEX: u32 = u32::MAX;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexArrayMesh {
    vertices: Vec<f64>,
    face_indices: Vec<u32>,
    face_sizes: Vec<u32>,
    triangle_indices: Option<Vec<u32>>,
    vertex_map: Option<Vec<u32>>,
    face_map: Option<Vec<u32>>,
    seam_vertices: Vec<u32>,
    edges: Vec<u32>,
    face_adj_faces: Vec<u32>,
    face_adj_face_sizes: Vec<u32>,
}

impl IndexArrayMesh {
    /// Builds a record from geometry and derives its edge and face-adjacency arrays.
    pub fn from_faces(
        vertices: Vec<f64>,
        face_indices: Vec<u32>,
        face_sizes: Vec<u32>,
    ) -> Result<Self, Error> {
        check_faces(&vertices, &face_indices, &face_sizes)?;
        let edges = derive_edges(&face_indices, &face_sizes)?;
        let (face_adj_faces, face_adj_face_sizes) = derive_adjacency(&face_indices, &face_sizes)?;
        Ok(Self {
            vertices,
            face_indices,
            face_sizes,
            triangle_indices: None,
            vertex_map: None,
            face_map: None,
            seam_vertices: Vec::new(),
            edges,
            face_adj_faces,
            face_adj_face_sizes,
        })
    }

    pub fn with_vertex_map(mut self, map: Vec<u32>) -> Result<Self, Error> {
        if map.len() != self.num_vertices() {
            return Err(Error::new(ErrorKind::InvalidArgument)
                .with_message("vertex map must have one entry per vertex"));
        }
        self.vertex_map = Some(map);
        Ok(self)
    }

    pub fn with_face_map(mut self, map: Vec<u32>) -> Result<Self, Error> {
        if map.len() != self.num_faces() {
            return Err(Error::new(ErrorKind::InvalidArgument)
                .with_message("face map must have one entry per face"));
        }
        self.face_map = Some(map);
        Ok(self)
    }

    pub fn with_seam_vertices(mut self, seam: Vec<u32>) -> Result<Self, Error> {
        let num_vertices = self.num_vertices() as u32;
        if seam.iter().any(|&v| v >= num_vertices) {
            return Err(Error::new(ErrorKind::InvalidArgument)
                .with_message("seam vertex index out of range"));
        }
        self.seam_vertices = seam;
        Ok(self)
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn num_faces(&self) -> usize {
        self.face_sizes.len()
    }

    pub fn vertices(&self) -> &[f64] {
        &self.vertices
    }

    pub fn face_indices(&self) -> &[u32] {
        &self.face_indices
    }

    pub fn face_sizes(&self) -> &[u32] {
        &self.face_sizes
    }

    pub fn vertex_map(&self) -> Option<&[u32]> {
        self.vertex_map.as_deref()
    }

    pub fn face_map(&self) -> Option<&[u32]> {
        self.face_map.as_deref()
    }

    pub fn seam_vertices(&self) -> &[u32] {
        &self.seam_vertices
    }

    pub fn edges(&self) -> &[u32] {
        &self.edges
    }

    pub fn face_adjacent_faces(&self) -> &[u32] {
        &self.face_adj_faces
    }

    pub fn face_adjacent_face_sizes(&self) -> &[u32] {
        &self.face_adj_face_sizes
    }

    pub fn triangle_indices(&self) -> Option<&[u32]> {
        self.triangle_indices.as_deref()
    }

    /// Derives the triangle array on first use and caches it.
    pub fn ensure_triangulation(&mut self) -> Result<&[u32], Error> {
        if self.triangle_indices.is_none() {
            self.triangle_indices = Some(triangulate(
                &self.vertices,
                &self.face_indices,
                &self.face_sizes,
            )?);
        }
        Ok(self.triangle_indices.as_deref().unwrap_or_default())
    }

    /// Iterates faces as slices of `face_indices`.
    pub fn faces(&self) -> impl Iterator<Item = &[u32]> + '_ {
        FaceIter {
            indices: &self.face_indices,
            sizes: self.face_sizes.iter(),
        }
    }
}

struct FaceIter<'a, I> {
    indices: &'a [u32],
    sizes: I,
}

impl<'a, I: Iterator<Item = &'a u32>> Iterator for FaceIter<'a, I> {
    type Item = &'a [u32];

    fn next(&mut self) -> Option<Self::Item> {
        let size = *self.sizes.next()? as usize;
        let (face, rest) = self.indices.split_at(size);
        self.indices = rest;
        Some(face)
    }
}

fn check_faces(vertices: &[f64], face_indices: &[u32], face_sizes: &[u32]) -> Result<(), Error> {
    if vertices.len() % 3 != 0 {
        return Err(Error::new(ErrorKind::InvalidArgument)
            .with_message("vertex array length must be a multiple of 3"));
    }
    if face_sizes.iter().any(|&size| size < 3) {
        return Err(Error::new(ErrorKind::InvalidArgument)
            .with_message("every face needs at least 3 vertices"));
    }
    let total: u64 = face_sizes.iter().map(|&size| u64::from(size)).sum();
    if total != face_indices.len() as u64 {
        return Err(Error::new(ErrorKind::InvalidArgument)
            .with_message("face sizes do not sum to the face index count"));
    }
    let num_vertices = (vertices.len() / 3) as u64;
    if face_indices.iter().any(|&v| u64::from(v) >= num_vertices) {
        return Err(Error::new(ErrorKind::InvalidArgument)
            .with_message("face index out of range"));
    }
    Ok(())
}

fn for_each_face_edge(face: &[u32], mut f: impl FnMut(u32, u32)) {
    for (i, &a) in face.iter().enumerate() {
        let b = face[(i + 1) % face.len()];
        f(a, b);
    }
}

fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

fn derive_edges(face_indices: &[u32], face_sizes: &[u32]) -> Result<Vec<u32>, Error> {
    let mut seen = HashSet::new();
    seen.try_reserve(face_indices.len())?;
    let mut edges = try_vec(face_indices.len())?;
    let faces = FaceIter {
        indices: face_indices,
        sizes: face_sizes.iter(),
    };
    for face in faces {
        for_each_face_edge(face, |a, b| {
            if seen.insert(edge_key(a, b)) {
                edges.push(a);
                edges.push(b);
            }
        });
    }
    Ok(edges)
}

fn derive_adjacency(
    face_indices: &[u32],
    face_sizes: &[u32],
) -> Result<(Vec<u32>, Vec<u32>), Error> {
    let mut edge_faces: HashMap<(u32, u32), Vec<u32>> = HashMap::new();
    edge_faces.try_reserve(face_indices.len())?;
    let faces = || FaceIter {
        indices: face_indices,
        sizes: face_sizes.iter(),
    };
    for (face_id, face) in faces().enumerate() {
        for_each_face_edge(face, |a, b| {
            edge_faces
                .entry(edge_key(a, b))
                .or_default()
                .push(face_id as u32);
        });
    }

    let mut adjacent: Vec<u32> = try_vec(face_indices.len())?;
    let mut sizes: Vec<u32> = try_vec(face_sizes.len())?;
    for (face_id, face) in faces().enumerate() {
        let start = adjacent.len();
        for_each_face_edge(face, |a, b| {
            let Some(shared) = edge_faces.get(&edge_key(a, b)) else {
                return;
            };
            for &other in shared {
                if other != face_id as u32 && !adjacent[start..].contains(&other) {
                    adjacent.push(other);
                }
            }
        });
        sizes.push((adjacent.len() - start) as u32);
    }
    Ok((adjacent, sizes))
}

/// Ear-clipping triangulation of each face, projected onto the plane of its Newell normal.
/// Triangles keep the face winding; a convex face comes out as a fan from its first vertex.
fn triangulate(
    vertices: &[f64],
    face_indices: &[u32],
    face_sizes: &[u32],
) -> Result<Vec<u32>, Error> {
    let triangles: usize = face_sizes.iter().map(|&s| s as usize - 2).sum();
    let mut out = try_vec(triangles * 3)?;
    let faces = FaceIter {
        indices: face_indices,
        sizes: face_sizes.iter(),
    };
    for face in faces {
        if face.len() == 3 {
            out.extend_from_slice(face);
            continue;
        }
        let points = project_face(vertices, face);
        clip_ears(face, &points, &mut out);
    }
    Ok(out)
}

fn position(vertices: &[f64], v: u32) -> [f64; 3] {
    let at = v as usize * 3;
    [vertices[at], vertices[at + 1], vertices[at + 2]]
}

/// 2D coordinates of the face corners, dropping the dominant axis of its normal.
fn project_face(vertices: &[f64], face: &[u32]) -> Vec<[f64; 2]> {
    let mut normal = [0.0f64; 3];
    for (i, &a) in face.iter().enumerate() {
        let p = position(vertices, a);
        let q = position(vertices, face[(i + 1) % face.len()]);
        normal[0] += (p[1] - q[1]) * (p[2] + q[2]);
        normal[1] += (p[2] - q[2]) * (p[0] + q[0]);
        normal[2] += (p[0] - q[0]) * (p[1] + q[1]);
    }
    let abs = normal.map(f64::abs);
    let (x, y) = if abs[2] >= abs[0] && abs[2] >= abs[1] {
        (0, 1)
    } else if abs[0] >= abs[1] {
        (1, 2)
    } else {
        (2, 0)
    };
    face.iter()
        .map(|&v| {
            let p = position(vertices, v);
            [p[x], p[y]]
        })
        .collect()
}

fn cross(o: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

fn clip_ears(face: &[u32], points: &[[f64; 2]], out: &mut Vec<u32>) {
    let twice_area: f64 = (0..points.len())
        .map(|i| cross([0.0, 0.0], points[i], points[(i + 1) % points.len()]))
        .sum();
    // Projected winding; clipping only accepts corners turning the same way.
    let orientation = if twice_area < 0.0 { -1.0 } else { 1.0 };
    let mut ring: Vec<usize> = (0..face.len()).collect();

    while ring.len() > 3 {
        let n = ring.len();
        let ear = (1..n).chain(0..1).find(|&at| {
            let (prev, cur, next) = (ring[(at + n - 1) % n], ring[at], ring[(at + 1) % n]);
            let (a, b, c) = (points[prev], points[cur], points[next]);
            if orientation * cross(a, b, c) <= 0.0 {
                return false;
            }
            !ring.iter().any(|&other| {
                other != prev
                    && other != cur
                    && other != next
                    && points[other] != a
                    && points[other] != b
                    && points[other] != c
                    && in_triangle(points[other], a, b, c, orientation)
            })
        });
        // Degenerate rings have no strict ear; clip the next corner to stay total.
        let at = ear.unwrap_or(1);
        let (prev, cur, next) = (ring[(at + n - 1) % n], ring[at], ring[(at + 1) % n]);
        out.extend_from_slice(&[face[prev], face[cur], face[next]]);
        ring.remove(at);
    }
    out.extend(ring.iter().map(|&i| face[i]));
}

fn in_triangle(p: [f64; 2], a: [f64; 2], b: [f64; 2], c: [f64; 2], orientation: f64) -> bool {
    orientation * cross(a, b, p) >= 0.0
        && orientation * cross(b, c, p) >= 0.0
        && orientation * cross(c, a, p) >= 0.0
}
