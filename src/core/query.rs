//! Purpose: Two-phase "ask size, then fill" retrieval for component and context data.
//! Exports: `DataSelector`, `Payload`, `component_payload`, `fill`.
//! Role: Single copy path for every variable-length output of the C ABI and Rust API.
//! Invariants: A size-only call never copies; a short destination copies nothing.
//! Invariants: Selectors are checked against the record's tag before any size is reported.
//! Invariants: Values are written in native byte order; winding order only affects face data.

use crate::core::component::{ComponentKind, ConnectedComponent};
use crate::core::error::{Error, ErrorKind};
use crate::core::flags::WindingOrder;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataSelector {
    VertexFloat,
    VertexDouble,
    Face,
    FaceSize,
    FaceAdjacentFace,
    FaceAdjacentFaceSize,
    Edge,
    FaceTriangulation,
    SeamVertex,
    VertexMap,
    FaceMap,
    Type,
    FragmentLocation,
    FragmentSealType,
    PatchLocation,
    Origin,
}

const SELECTORS: [(u32, DataSelector); 16] = [
    (0x0001, DataSelector::VertexFloat),
    (0x0002, DataSelector::VertexDouble),
    (0x0004, DataSelector::Face),
    (0x0008, DataSelector::FaceSize),
    (0x0010, DataSelector::FaceAdjacentFace),
    (0x0020, DataSelector::FaceAdjacentFaceSize),
    (0x0040, DataSelector::Edge),
    (0x0080, DataSelector::FaceTriangulation),
    (0x0100, DataSelector::SeamVertex),
    (0x0200, DataSelector::VertexMap),
    (0x0400, DataSelector::FaceMap),
    (0x0800, DataSelector::Type),
    (0x1000, DataSelector::FragmentLocation),
    (0x2000, DataSelector::FragmentSealType),
    (0x4000, DataSelector::PatchLocation),
    (0x8000, DataSelector::Origin),
];

impl DataSelector {
    pub const ALL: [DataSelector; 16] = {
        let mut all = [DataSelector::VertexFloat; 16];
        let mut i = 0;
        while i < SELECTORS.len() {
            all[i] = SELECTORS[i].1;
            i += 1;
        }
        all
    };

    pub fn from_raw(raw: u32) -> Result<Self, Error> {
        SELECTORS
            .iter()
            .find(|(value, _)| *value == raw)
            .map(|(_, selector)| *selector)
            .ok_or_else(|| {
                Error::new(ErrorKind::InvalidArgument)
                    .with_message(format!("unknown data selector: {raw:#x}"))
            })
    }

    pub fn to_raw(self) -> u32 {
        SELECTORS
            .iter()
            .find(|(_, selector)| *selector == self)
            .map_or(0, |(value, _)| *value)
    }
}

/// Data ready to be copied; sized without materializing converted arrays.
#[derive(Clone, Copy, Debug)]
pub enum Payload<'a> {
    Bytes(&'a [u8]),
    NarrowedVertices(&'a [f64]),
    ReversedFaces { indices: &'a [u32], sizes: &'a [u32] },
    ReversedTriangles(&'a [u32]),
    Scalar(u32),
}

impl Payload<'_> {
    pub fn len(&self) -> usize {
        match self {
            Payload::Bytes(bytes) => bytes.len(),
            Payload::NarrowedVertices(values) => values.len() * 4,
            Payload::ReversedFaces { indices, .. } => indices.len() * 4,
            Payload::ReversedTriangles(indices) => indices.len() * 4,
            Payload::Scalar(_) => 4,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self, dst: &mut [u8]) {
        match *self {
            Payload::Bytes(bytes) => dst.copy_from_slice(bytes),
            Payload::NarrowedVertices(values) => {
                for (out, value) in dst.chunks_exact_mut(4).zip(values) {
                    out.copy_from_slice(&(*value as f32).to_ne_bytes());
                }
            }
            Payload::ReversedFaces { indices, sizes } => {
                let mut offset = 0usize;
                let mut outs = dst.chunks_exact_mut(4);
                for &size in sizes {
                    let face = &indices[offset..offset + size as usize];
                    for (index, out) in face.iter().rev().zip(outs.by_ref()) {
                        out.copy_from_slice(&index.to_ne_bytes());
                    }
                    offset += size as usize;
                }
            }
            Payload::ReversedTriangles(indices) => {
                let reversed = indices.chunks_exact(3).flat_map(|tri| tri.iter().rev());
                for (out, index) in dst.chunks_exact_mut(4).zip(reversed) {
                    out.copy_from_slice(&index.to_ne_bytes());
                }
            }
            Payload::Scalar(value) => dst.copy_from_slice(&value.to_ne_bytes()),
        }
    }
}

/// Size-only when `dst` is `None`; otherwise copies exactly the required bytes.
pub fn fill(payload: &Payload<'_>, dst: Option<&mut [u8]>) -> Result<usize, Error> {
    let required = payload.len();
    let Some(dst) = dst else {
        return Ok(required);
    };
    if dst.len() < required {
        return Err(Error::new(ErrorKind::BufferTooSmall)
            .with_message(format!("destination holds {} bytes", dst.len()))
            .with_required(required as u64));
    }
    payload.write(&mut dst[..required]);
    Ok(required)
}

/// Resolves a selector against one record.
pub fn component_payload(
    record: &mut ConnectedComponent,
    selector: DataSelector,
    winding: WindingOrder,
) -> Result<Payload<'_>, Error> {
    if selector == DataSelector::FaceTriangulation {
        record.mesh.ensure_triangulation()?;
    }
    let record = &*record;
    let mesh = &record.mesh;
    let reversed = winding == WindingOrder::Reversed;
    let payload = match selector {
        DataSelector::VertexFloat => Payload::NarrowedVertices(mesh.vertices()),
        DataSelector::VertexDouble => Payload::Bytes(bytemuck::cast_slice(mesh.vertices())),
        DataSelector::Face if reversed => Payload::ReversedFaces {
            indices: mesh.face_indices(),
            sizes: mesh.face_sizes(),
        },
        DataSelector::Face => Payload::Bytes(bytemuck::cast_slice(mesh.face_indices())),
        DataSelector::FaceSize => Payload::Bytes(bytemuck::cast_slice(mesh.face_sizes())),
        DataSelector::FaceAdjacentFace => {
            Payload::Bytes(bytemuck::cast_slice(mesh.face_adjacent_faces()))
        }
        DataSelector::FaceAdjacentFaceSize => {
            Payload::Bytes(bytemuck::cast_slice(mesh.face_adjacent_face_sizes()))
        }
        DataSelector::Edge => Payload::Bytes(bytemuck::cast_slice(mesh.edges())),
        DataSelector::FaceTriangulation => {
            let triangles = mesh.triangle_indices().unwrap_or_default();
            if reversed {
                Payload::ReversedTriangles(triangles)
            } else {
                Payload::Bytes(bytemuck::cast_slice(triangles))
            }
        }
        DataSelector::SeamVertex => Payload::Bytes(bytemuck::cast_slice(mesh.seam_vertices())),
        DataSelector::VertexMap => {
            let map = mesh.vertex_map().ok_or_else(|| {
                Error::new(ErrorKind::InvalidArgument)
                    .with_message("vertex map was not requested at dispatch")
            })?;
            Payload::Bytes(bytemuck::cast_slice(map))
        }
        DataSelector::FaceMap => {
            let map = mesh.face_map().ok_or_else(|| {
                Error::new(ErrorKind::InvalidArgument)
                    .with_message("face map was not requested at dispatch")
            })?;
            Payload::Bytes(bytemuck::cast_slice(map))
        }
        DataSelector::Type => Payload::Scalar(record.component_type().to_raw()),
        DataSelector::FragmentLocation => match record.kind {
            ComponentKind::Fragment { location, .. } => Payload::Scalar(location as u32),
            _ => return Err(tag_mismatch(selector, record)),
        },
        DataSelector::FragmentSealType => match record.kind {
            ComponentKind::Fragment { seal, .. } => Payload::Scalar(seal as u32),
            _ => return Err(tag_mismatch(selector, record)),
        },
        DataSelector::PatchLocation => match record.kind {
            ComponentKind::Fragment { patch_location, .. } => Payload::Scalar(patch_location as u32),
            ComponentKind::Patch { location } => Payload::Scalar(location as u32),
            _ => return Err(tag_mismatch(selector, record)),
        },
        DataSelector::Origin => match record.kind {
            ComponentKind::Seam { origin } => Payload::Scalar(origin as u32),
            ComponentKind::Input { origin } => Payload::Scalar(origin as u32),
            _ => return Err(tag_mismatch(selector, record)),
        },
    };
    Ok(payload)
}

fn tag_mismatch(selector: DataSelector, record: &ConnectedComponent) -> Error {
    Error::new(ErrorKind::InvalidArgument).with_message(format!(
        "{selector:?} is not defined for {:?} components",
        record.component_type()
    ))
}
