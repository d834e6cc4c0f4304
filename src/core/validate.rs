// Dispatch input validation: borrowed client arrays in, owned checked copies out.
// Every check runs before the kernel sees any data.
use crate::core::error::{Error, ErrorKind, try_vec, try_to_vec};

#[derive(Clone, Copy, Debug)]
pub enum VertexArray<'a> {
    Float(&'a [f32]),
    Double(&'a [f64]),
}

impl VertexArray<'_> {
    pub fn len(&self) -> usize {
        match self {
            VertexArray::Float(values) => values.len(),
            VertexArray::Double(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One input mesh as supplied by the client. Omitted face sizes mean all triangles.
#[derive(Clone, Copy, Debug)]
pub struct MeshInput<'a> {
    pub vertices: VertexArray<'a>,
    pub face_indices: &'a [u32],
    pub face_sizes: Option<&'a [u32]>,
}

impl<'a> MeshInput<'a> {
    pub fn triangles(vertices: &'a [f64], face_indices: &'a [u32]) -> Self {
        Self {
            vertices: VertexArray::Double(vertices),
            face_indices,
            face_sizes: None,
        }
    }

    pub fn polygons(vertices: &'a [f64], face_indices: &'a [u32], face_sizes: &'a [u32]) -> Self {
        Self {
            vertices: VertexArray::Double(vertices),
            face_indices,
            face_sizes: Some(face_sizes),
        }
    }
}

/// Validated, owned copy of an input mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct InputMesh {
    pub vertices: Vec<f64>,
    pub face_indices: Vec<u32>,
    pub face_sizes: Vec<u32>,
}

impl InputMesh {
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn num_faces(&self) -> usize {
        self.face_sizes.len()
    }

    pub fn vertex(&self, index: u32) -> [f64; 3] {
        let i = index as usize * 3;
        [self.vertices[i], self.vertices[i + 1], self.vertices[i + 2]]
    }

    /// Start offset of each face within `face_indices`.
    pub fn face_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.face_sizes.len());
        let mut offset = 0usize;
        for &size in &self.face_sizes {
            offsets.push(offset);
            offset += size as usize;
        }
        offsets
    }

    pub fn face(&self, offsets: &[usize], face: usize) -> &[u32] {
        let start = offsets[face];
        &self.face_indices[start..start + self.face_sizes[face] as usize]
    }
}

pub fn validate_mesh(input: &MeshInput<'_>, which: &str) -> Result<InputMesh, Error> {
    let invalid = |message: &str| {
        Error::new(ErrorKind::InvalidArgument).with_message(format!("{which} mesh: {message}"))
    };

    if input.vertices.len() % 3 != 0 {
        return Err(invalid("vertex array length must be a multiple of 3"));
    }
    let num_vertices = input.vertices.len() / 3;
    if num_vertices < 3 {
        return Err(invalid("at least 3 vertices are required"));
    }

    let face_sizes = match input.face_sizes {
        Some(sizes) => {
            if sizes.iter().any(|&size| size < 3) {
                return Err(invalid("every face size must be at least 3"));
            }
            try_to_vec(sizes)?
        }
        None => {
            if input.face_indices.len() % 3 != 0 {
                return Err(invalid("face indices must form triangles when sizes are omitted"));
            }
            let mut sizes = try_vec(input.face_indices.len() / 3)?;
            sizes.resize(input.face_indices.len() / 3, 3u32);
            sizes
        }
    };
    if face_sizes.is_empty() {
        return Err(invalid("at least 1 face is required"));
    }
    let total: u64 = face_sizes.iter().map(|&size| u64::from(size)).sum();
    if total != input.face_indices.len() as u64 {
        return Err(invalid("face sizes do not match the face index count"));
    }
    if input
        .face_indices
        .iter()
        .any(|&index| index as usize >= num_vertices)
    {
        return Err(invalid("face index out of range"));
    }

    let mut vertices = try_vec(input.vertices.len())?;
    match input.vertices {
        VertexArray::Float(values) => vertices.extend(values.iter().map(|&v| f64::from(v))),
        VertexArray::Double(values) => vertices.extend_from_slice(values),
    }
    if vertices.iter().any(|v: &f64| !v.is_finite()) {
        return Err(invalid("vertex coordinates must be finite"));
    }

    Ok(InputMesh {
        vertices,
        face_indices: try_to_vec(input.face_indices)?,
        face_sizes,
    })
}

#[cfg(test)]
mod tests {
    use super::{MeshInput, VertexArray, validate_mesh};
    use crate::core::error::ErrorKind;

    const TRI: [f64; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];

    #[test]
    fn omitted_sizes_mean_triangles() {
        let mesh = validate_mesh(&MeshInput::triangles(&TRI, &[0, 1, 2]), "source").expect("ok");
        assert_eq!(mesh.face_sizes, vec![3]);
        assert_eq!(mesh.num_vertices(), 3);
    }

    #[test]
    fn float_vertices_are_widened() {
        let input = MeshInput {
            vertices: VertexArray::Float(&[0.0, 0.0, 0.0, 1.5, 0.0, 0.0, 0.0, 1.0, 0.0]),
            face_indices: &[0, 1, 2],
            face_sizes: None,
        };
        let mesh = validate_mesh(&input, "cut").expect("ok");
        assert_eq!(mesh.vertex(1), [1.5, 0.0, 0.0]);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        let cases = [
            MeshInput::triangles(&TRI[..6], &[0, 1, 0]),
            MeshInput::triangles(&TRI, &[]),
            MeshInput::triangles(&TRI, &[0, 1]),
            MeshInput::triangles(&TRI, &[0, 1, 3]),
            MeshInput::polygons(&TRI, &[0, 1, 2], &[2]),
            MeshInput::polygons(&TRI, &[0, 1, 2], &[3, 3]),
        ];
        for input in cases {
            let err = validate_mesh(&input, "source").expect_err("invalid");
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn rejects_non_finite_coordinates() {
        let mut vertices = TRI;
        vertices[4] = f64::NAN;
        let err = validate_mesh(&MeshInput::triangles(&vertices, &[0, 1, 2]), "source")
            .expect_err("nan");
        assert!(err.message().unwrap_or_default().contains("finite"));
    }
}
