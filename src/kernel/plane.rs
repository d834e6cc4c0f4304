// Planar cutting kernel: splits the source mesh by the plane of a flat cut mesh.
// Face splitting fans out over the scheduler; stitching and extraction run serially.
// Faces are assumed convex: a face crossing the plane more than twice is rejected.
use std::collections::{BTreeMap, HashMap, HashSet};

use super::{Kernel, KernelError, KernelLog, KernelMesh, KernelOutput, KernelRequest};
use crate::core::component::ComponentKind;
use crate::core::flags::{
    DebugSeverity, DebugType, DispatchFlags, FragmentLocation, InputOrigin, PatchLocation,
    SealType, SeamOrigin,
};
use crate::core::mesh::UNDEFINED_INDEX;
use crate::core::scheduler::{Scheduler, for_each_chunk};
use crate::core::validate::InputMesh;

/// Distances below this fraction of the scene extent count as "on the plane".
const RELATIVE_TOLERANCE: f64 = 1e-9;
const MIN_FACES_PER_TASK: usize = 64;

type Vec3 = [f64; 3];

fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn length(a: Vec3) -> f64 {
    dot(a, a).sqrt()
}

/// Newell normal of a polygon; its length is twice the polygon area.
fn newell_normal(points: impl Iterator<Item = Vec3> + Clone) -> Vec3 {
    let mut normal = [0.0; 3];
    let first = points.clone().next();
    let nexts = points.clone().skip(1).chain(first);
    for (p, q) in points.zip(nexts) {
        normal[0] += (p[1] - q[1]) * (p[2] + q[2]);
        normal[1] += (p[2] - q[2]) * (p[0] + q[0]);
        normal[2] += (p[0] - q[0]) * (p[1] + q[1]);
    }
    normal
}

fn scene_extent(meshes: &[&InputMesh]) -> f64 {
    let mut lo = [f64::INFINITY; 3];
    let mut hi = [f64::NEG_INFINITY; 3];
    for mesh in meshes {
        for p in mesh.vertices.chunks_exact(3) {
            for axis in 0..3 {
                lo[axis] = lo[axis].min(p[axis]);
                hi[axis] = hi[axis].max(p[axis]);
            }
        }
    }
    length(sub(hi, lo))
}

#[derive(Clone, Copy, Debug)]
struct Plane {
    normal: Vec3,
    offset: f64,
    u: Vec3,
    v: Vec3,
}

impl Plane {
    fn through(normal: Vec3, point: Vec3) -> Self {
        let helper = if normal[0].abs() < 0.9 {
            [1.0, 0.0, 0.0]
        } else {
            [0.0, 1.0, 0.0]
        };
        let u = cross(normal, helper);
        let u_len = length(u);
        let u = [u[0] / u_len, u[1] / u_len, u[2] / u_len];
        Self {
            normal,
            offset: dot(normal, point),
            u,
            v: cross(normal, u),
        }
    }

    fn distance(&self, p: Vec3) -> f64 {
        dot(self.normal, p) - self.offset
    }

    fn project(&self, p: Vec3) -> [f64; 2] {
        [dot(self.u, p), dot(self.v, p)]
    }
}

fn cut_plane(cut: &InputMesh, tolerance: f64) -> Result<Plane, KernelError> {
    let offsets = cut.face_offsets();
    let mut plane = None;
    for face in 0..cut.num_faces() {
        let points = cut.face(&offsets, face).iter().map(|&v| cut.vertex(v));
        let normal = newell_normal(points);
        let len = length(normal);
        if len > tolerance * tolerance {
            let normal = [normal[0] / len, normal[1] / len, normal[2] / len];
            let anchor = cut.vertex(cut.face(&offsets, face)[0]);
            plane = Some(Plane::through(normal, anchor));
            break;
        }
    }
    let plane = plane.ok_or_else(|| KernelError::new("cut mesh has no non-degenerate face"))?;
    if cut
        .vertices
        .chunks_exact(3)
        .any(|p| plane.distance([p[0], p[1], p[2]]).abs() > tolerance)
    {
        return Err(KernelError::new("cut mesh is not planar"));
    }
    Ok(plane)
}

fn signed_distances(source: &InputMesh, plane: &Plane) -> Vec<f64> {
    source
        .vertices
        .chunks_exact(3)
        .map(|p| plane.distance([p[0], p[1], p[2]]))
        .collect()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
enum VertexRef {
    Source(u32),
    /// Crossing point on the source edge `(low, high)`.
    Crossing(u32, u32),
}

#[derive(Clone, Debug, Default)]
struct FaceSplit {
    above: Vec<VertexRef>,
    below: Vec<VertexRef>,
    crossings: usize,
}

fn split_face(face: &[u32], distances: &[f64]) -> FaceSplit {
    let mut out = FaceSplit::default();
    for (i, &a) in face.iter().enumerate() {
        let b = face[(i + 1) % face.len()];
        let a_above = distances[a as usize] > 0.0;
        let b_above = distances[b as usize] > 0.0;
        if a_above {
            out.above.push(VertexRef::Source(a));
        } else {
            out.below.push(VertexRef::Source(a));
        }
        if a_above != b_above {
            let crossing = VertexRef::Crossing(a.min(b), a.max(b));
            out.above.push(crossing);
            out.below.push(crossing);
            out.crossings += 1;
        }
    }
    out
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Side {
    Above,
    Below,
}

#[derive(Clone, Debug)]
struct SplitFace {
    side: Side,
    vertices: Vec<u32>,
    source_face: u32,
}

struct VertexTable<'a> {
    source: &'a InputMesh,
    distances: &'a [f64],
    positions: Vec<f64>,
    crossings: HashMap<(u32, u32), u32>,
}

impl VertexTable<'_> {
    fn resolve(&mut self, vertex: VertexRef) -> u32 {
        match vertex {
            VertexRef::Source(v) => v,
            VertexRef::Crossing(a, b) => {
                if let Some(&id) = self.crossings.get(&(a, b)) {
                    return id;
                }
                let (pa, pb) = (self.source.vertex(a), self.source.vertex(b));
                let (da, db) = (self.distances[a as usize], self.distances[b as usize]);
                let t = da / (da - db);
                let id = (self.positions.len() / 3) as u32;
                for axis in 0..3 {
                    self.positions.push(pa[axis] + t * (pb[axis] - pa[axis]));
                }
                self.crossings.insert((a, b), id);
                id
            }
        }
    }
}

struct SeamLoop {
    vertices: Vec<u32>,
    closed: bool,
}

/// Source mesh after splitting: source vertices keep their ids, crossings follow.
struct SplitMesh {
    positions: Vec<f64>,
    num_source_vertices: u32,
    faces: Vec<SplitFace>,
    segments: Vec<[u32; 2]>,
}

impl SplitMesh {
    fn build(
        source: &InputMesh,
        distances: &[f64],
        scheduler: &dyn Scheduler,
    ) -> Result<Self, KernelError> {
        let offsets = source.face_offsets();
        let mut splits = vec![FaceSplit::default(); offsets.len()];
        for_each_chunk(
            scheduler,
            &offsets,
            &mut splits,
            MIN_FACES_PER_TASK,
            |face, _, slot| {
                *slot = split_face(source.face(&offsets, face), distances);
            },
        );
        if let Some(face) = splits.iter().position(|split| split.crossings > 2) {
            return Err(KernelError::new(format!(
                "source face {face} crosses the cut plane more than twice"
            )));
        }

        let mut table = VertexTable {
            source,
            distances,
            positions: source.vertices.clone(),
            crossings: HashMap::new(),
        };
        let mut faces = Vec::new();
        let mut segments = Vec::new();
        for (face_id, split) in splits.iter().enumerate() {
            for (side, refs) in [(Side::Above, &split.above), (Side::Below, &split.below)] {
                if refs.len() >= 3 {
                    let vertices = refs.iter().map(|r| table.resolve(*r)).collect();
                    faces.push(SplitFace {
                        side,
                        vertices,
                        source_face: face_id as u32,
                    });
                }
            }
            if split.crossings == 2 {
                let ends: Vec<u32> = split
                    .above
                    .iter()
                    .filter(|r| matches!(r, VertexRef::Crossing(..)))
                    .map(|r| table.resolve(*r))
                    .collect();
                segments.push([ends[0], ends[1]]);
            }
        }

        Ok(Self {
            positions: table.positions,
            num_source_vertices: source.num_vertices() as u32,
            faces,
            segments,
        })
    }

    fn position(&self, id: u32) -> Vec3 {
        let i = id as usize * 3;
        [self.positions[i], self.positions[i + 1], self.positions[i + 2]]
    }

    fn num_vertices(&self) -> u32 {
        (self.positions.len() / 3) as u32
    }

    /// Finds the cut face under every crossing point; fails on partial cuts.
    fn locate_on_cut(
        &self,
        cut: &InputMesh,
        plane: &Plane,
    ) -> Result<HashMap<u32, u32>, KernelError> {
        let offsets = cut.face_offsets();
        let triangles: Vec<(u32, [[f64; 2]; 3])> = (0..cut.num_faces())
            .flat_map(|face| {
                let corners = cut.face(&offsets, face);
                (1..corners.len() - 1).map(move |i| {
                    (face as u32, [corners[0], corners[i], corners[i + 1]])
                })
            })
            .map(|(face, tri)| (face, tri.map(|v| plane.project(cut.vertex(v)))))
            .collect();

        let mut located = HashMap::new();
        for id in self.num_source_vertices..self.num_vertices() {
            let point = plane.project(self.position(id));
            let face = triangles
                .iter()
                .find(|(_, tri)| contains_point(tri, point))
                .map(|(face, _)| *face)
                .ok_or_else(|| {
                    KernelError::new(
                        "seam point lies outside the cut surface; partial cuts are not supported",
                    )
                })?;
            located.insert(id, face);
        }
        Ok(located)
    }

    /// Edge-connected groups of faces on one side, ordered by first face.
    fn fragments(&self, side: Side) -> Vec<Vec<usize>> {
        let members: Vec<usize> = (0..self.faces.len())
            .filter(|&f| self.faces[f].side == side)
            .collect();
        let mut parent: Vec<usize> = (0..members.len()).collect();
        let mut owner: HashMap<(u32, u32), usize> = HashMap::new();
        for (slot, &face) in members.iter().enumerate() {
            let vertices = &self.faces[face].vertices;
            for (i, &a) in vertices.iter().enumerate() {
                let b = vertices[(i + 1) % vertices.len()];
                let key = (a.min(b), a.max(b));
                match owner.get(&key) {
                    Some(&other) => union(&mut parent, slot, other),
                    None => {
                        owner.insert(key, slot);
                    }
                }
            }
        }
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut root_order: HashMap<usize, usize> = HashMap::new();
        for (slot, &face) in members.iter().enumerate() {
            let root = find(&mut parent, slot);
            let order = *root_order.entry(root).or_insert(slot);
            groups.entry(order).or_default().push(face);
        }
        groups.into_values().collect()
    }

    fn seam_loops(&self) -> Vec<SeamLoop> {
        let mut neighbours: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for &[a, b] in &self.segments {
            neighbours.entry(a).or_default().push(b);
            neighbours.entry(b).or_default().push(a);
        }
        let mut visited: HashSet<u32> = HashSet::new();
        let mut loops = Vec::new();
        let open_starts = neighbours
            .iter()
            .filter(|(_, n)| n.len() == 1)
            .map(|(v, _)| *v);
        let starts: Vec<u32> = open_starts.chain(neighbours.keys().copied()).collect();
        for start in starts {
            if visited.contains(&start) {
                continue;
            }
            let mut vertices = vec![start];
            visited.insert(start);
            let mut current = start;
            while let Some(&next) = neighbours[&current]
                .iter()
                .find(|n| !visited.contains(*n))
            {
                visited.insert(next);
                vertices.push(next);
                current = next;
            }
            let closed = vertices.len() >= 3
                && neighbours[&start].len() == 2
                && neighbours[&current].contains(&start);
            loops.push(SeamLoop { vertices, closed });
        }
        loops
    }

    /// Loop vertices ordered so the polygon normal agrees with `direction`.
    fn oriented(&self, seam: &SeamLoop, direction: Vec3) -> Vec<u32> {
        let normal = newell_normal(seam.vertices.iter().map(|&v| self.position(v)));
        let mut vertices = seam.vertices.clone();
        if dot(normal, direction) < 0.0 {
            vertices.reverse();
        }
        vertices
    }
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let (ra, rb) = (find(parent, a), find(parent, b));
    if ra != rb {
        parent[ra.max(rb)] = ra.min(rb);
    }
}

fn contains_point(tri: &[[f64; 2]; 3], p: [f64; 2]) -> bool {
    let [a, b, c] = *tri;
    let det = (b[1] - c[1]) * (a[0] - c[0]) + (c[0] - b[0]) * (a[1] - c[1]);
    if det.abs() <= f64::EPSILON {
        return false;
    }
    let l1 = ((b[1] - c[1]) * (p[0] - c[0]) + (c[0] - b[0]) * (p[1] - c[1])) / det;
    let l2 = ((c[1] - a[1]) * (p[0] - c[0]) + (a[0] - c[0]) * (p[1] - c[1])) / det;
    let l3 = 1.0 - l1 - l2;
    let slack = -1e-9;
    l1 >= slack && l2 >= slack && l3 >= slack
}

/// Accumulates faces of a split mesh into a compact, locally indexed mesh.
struct MeshBuilder<'a> {
    split: &'a SplitMesh,
    local: HashMap<u32, u32>,
    mesh: KernelMesh,
}

impl<'a> MeshBuilder<'a> {
    fn new(split: &'a SplitMesh, kind: ComponentKind) -> Self {
        Self {
            split,
            local: HashMap::new(),
            mesh: KernelMesh {
                kind,
                vertices: Vec::new(),
                face_indices: Vec::new(),
                face_sizes: Vec::new(),
                vertex_map: Vec::new(),
                face_map: Vec::new(),
                seam_vertices: Vec::new(),
            },
        }
    }

    fn contains(&self, global: u32) -> bool {
        self.local.contains_key(&global)
    }

    fn add_face(&mut self, vertices: &[u32], face_map: u32) -> Result<(), KernelError> {
        let mesh = &mut self.mesh;
        mesh.vertices.try_reserve(vertices.len() * 3)?;
        mesh.vertex_map.try_reserve(vertices.len())?;
        mesh.face_indices.try_reserve(vertices.len())?;
        mesh.face_sizes.try_reserve(1)?;
        mesh.face_map.try_reserve(1)?;
        self.local.try_reserve(vertices.len())?;
        for &global in vertices {
            let local = match self.local.get(&global) {
                Some(&local) => local,
                None => {
                    let local = self.local.len() as u32;
                    self.local.insert(global, local);
                    mesh.vertices.extend_from_slice(&self.split.position(global));
                    if global < self.split.num_source_vertices {
                        mesh.vertex_map.push(global);
                    } else {
                        mesh.vertex_map.push(UNDEFINED_INDEX);
                        mesh.seam_vertices.try_reserve(1)?;
                        mesh.seam_vertices.push(local);
                    }
                    local
                }
            };
            mesh.face_indices.push(local);
        }
        mesh.face_sizes.push(vertices.len() as u32);
        mesh.face_map.push(face_map);
        Ok(())
    }

    fn finish(self) -> KernelMesh {
        self.mesh
    }
}

fn echo(
    mesh: &InputMesh,
    origin: InputOrigin,
    vertex_base: u32,
    face_base: u32,
) -> Result<KernelMesh, KernelError> {
    let copy = |items: &[u32]| -> Result<Vec<u32>, KernelError> {
        let mut out = Vec::new();
        out.try_reserve_exact(items.len())?;
        out.extend_from_slice(items);
        Ok(out)
    };
    let mut vertices = Vec::new();
    vertices.try_reserve_exact(mesh.vertices.len())?;
    vertices.extend_from_slice(&mesh.vertices);
    let mut vertex_map = Vec::new();
    vertex_map.try_reserve_exact(mesh.num_vertices())?;
    vertex_map.extend((0..mesh.num_vertices() as u32).map(|v| v + vertex_base));
    let mut face_map = Vec::new();
    face_map.try_reserve_exact(mesh.num_faces())?;
    face_map.extend((0..mesh.num_faces() as u32).map(|f| f + face_base));
    Ok(KernelMesh {
        kind: ComponentKind::Input { origin },
        vertices,
        face_indices: copy(&mesh.face_indices)?,
        face_sizes: copy(&mesh.face_sizes)?,
        vertex_map,
        face_map,
        seam_vertices: Vec::new(),
    })
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PlanarKernel;

impl PlanarKernel {
    fn resolve_plane(
        request: &KernelRequest<'_>,
        extent: f64,
        log: &mut KernelLog<'_>,
    ) -> Result<(Plane, Vec<f64>), KernelError> {
        let tolerance = RELATIVE_TOLERANCE * extent;
        let mut plane = cut_plane(request.cut, tolerance)?;
        let mut distances = signed_distances(request.source, &plane);
        let mut attempt = 0u32;
        while distances.iter().any(|d| d.abs() <= tolerance) {
            if !request
                .flags
                .contains(DispatchFlags::ENFORCE_GENERAL_POSITION)
            {
                return Err(KernelError::new(
                    "source vertex lies on the cut plane (input not in general position)",
                ));
            }
            if attempt == request.general_position_attempts {
                return Err(KernelError::new(format!(
                    "input still degenerate after {attempt} general-position attempts"
                )));
            }
            attempt += 1;
            plane.offset += request.general_position_constant * extent;
            log(
                DebugType::OTHER,
                DebugSeverity::NOTIFICATION,
                &format!("perturbed cut plane for general position (attempt {attempt})"),
            );
            distances = signed_distances(request.source, &plane);
        }
        Ok((plane, distances))
    }
}

impl Kernel for PlanarKernel {
    fn cut(
        &self,
        request: &KernelRequest<'_>,
        scheduler: &dyn Scheduler,
        log: &mut KernelLog<'_>,
    ) -> Result<KernelOutput, KernelError> {
        let source = request.source;
        let cut = request.cut;
        let flags = request.flags;
        let extent = scene_extent(&[source, cut]);
        let (plane, distances) = Self::resolve_plane(request, extent, log)?;

        let mut meshes = Vec::new();
        let intersects =
            distances.iter().any(|&d| d > 0.0) && distances.iter().any(|&d| d < 0.0);
        if intersects {
            let split = SplitMesh::build(source, &distances, scheduler)?;
            let located = split.locate_on_cut(cut, &plane)?;
            let source_faces = source.num_faces() as u32;
            let patch_face = |seam: &SeamLoop| {
                located
                    .get(&seam.vertices[0])
                    .map_or(UNDEFINED_INDEX, |face| face + source_faces)
            };
            let loops = split.seam_loops();
            let open = loops.iter().filter(|seam| !seam.closed).count();
            if open > 0 {
                log(
                    DebugType::UNDEFINED_BEHAVIOR,
                    DebugSeverity::MEDIUM,
                    &format!("{open} open seam chain(s); affected fragments cannot be sealed"),
                );
            }

            let sides = [
                (
                    Side::Above,
                    FragmentLocation::Above,
                    DispatchFlags::FILTER_FRAGMENT_LOCATION_ABOVE,
                    plane.normal.map(|c| -c),
                ),
                (
                    Side::Below,
                    FragmentLocation::Below,
                    DispatchFlags::FILTER_FRAGMENT_LOCATION_BELOW,
                    plane.normal,
                ),
            ];
            for (side, location, filter, seal_direction) in sides {
                if !flags.contains(filter) {
                    continue;
                }
                for group in split.fragments(side) {
                    let faces = || group.iter().map(|&f| &split.faces[f]);
                    if flags.contains(DispatchFlags::FILTER_FRAGMENT_SEALING_NONE) {
                        let mut builder = MeshBuilder::new(
                            &split,
                            ComponentKind::Fragment {
                                location,
                                seal: SealType::None,
                                patch_location: PatchLocation::Undefined,
                            },
                        );
                        for face in faces() {
                            builder.add_face(&face.vertices, face.source_face)?;
                        }
                        meshes.try_reserve(1)?;
                        meshes.push(builder.finish());
                    }
                    if flags.contains(DispatchFlags::FILTER_FRAGMENT_SEALING_INSIDE) {
                        let mut builder = MeshBuilder::new(
                            &split,
                            ComponentKind::Fragment {
                                location,
                                seal: SealType::Complete,
                                patch_location: PatchLocation::Inside,
                            },
                        );
                        for face in faces() {
                            builder.add_face(&face.vertices, face.source_face)?;
                        }
                        let seals: Vec<&SeamLoop> = loops
                            .iter()
                            .filter(|seam| seam.closed && builder.contains(seam.vertices[0]))
                            .collect();
                        for seam in seals {
                            builder
                                .add_face(&split.oriented(seam, seal_direction), patch_face(seam))?;
                        }
                        meshes.try_reserve(1)?;
                        meshes.push(builder.finish());
                    }
                }
            }

            if flags.contains(DispatchFlags::FILTER_PATCH_INSIDE) {
                for seam in loops.iter().filter(|seam| seam.closed) {
                    let mut builder = MeshBuilder::new(
                        &split,
                        ComponentKind::Patch {
                            location: PatchLocation::Inside,
                        },
                    );
                    builder.add_face(&split.oriented(seam, plane.normal), patch_face(seam))?;
                    meshes.try_reserve(1)?;
                    meshes.push(builder.finish());
                }
            }

            if flags.contains(DispatchFlags::FILTER_SEAM_SRCMESH) {
                let mut builder = MeshBuilder::new(
                    &split,
                    ComponentKind::Seam {
                        origin: SeamOrigin::SrcMesh,
                    },
                );
                for face in &split.faces {
                    builder.add_face(&face.vertices, face.source_face)?;
                }
                meshes.try_reserve(1)?;
                meshes.push(builder.finish());
            }

            if flags.intersects(DispatchFlags::FILTER_PATCH_OUTSIDE | DispatchFlags::FILTER_SEAM_CUTMESH)
            {
                log(
                    DebugType::OTHER,
                    DebugSeverity::LOW,
                    "outside patches and cut-mesh seams are not produced by the planar kernel",
                );
            }
        } else {
            log(
                DebugType::OTHER,
                DebugSeverity::NOTIFICATION,
                "cut plane does not intersect the source mesh",
            );
        }

        meshes.try_reserve(2)?;
        meshes.push(echo(source, InputOrigin::SrcMesh, 0, 0)?);
        meshes.push(echo(
            cut,
            InputOrigin::CutMesh,
            source.num_vertices() as u32,
            source.num_faces() as u32,
        )?);
        Ok(KernelOutput { meshes })
    }
}

#[cfg(test)]
mod tests {
    use super::{PlanarKernel, split_face, VertexRef};
    use crate::core::component::ComponentKind;
    use crate::core::flags::{DispatchFlags, FragmentLocation, SealType};
    use crate::core::scheduler::InlineScheduler;
    use crate::core::validate::{InputMesh, MeshInput, validate_mesh};
    use crate::kernel::{Kernel, KernelRequest};

    const CUBE_VERTICES: [f64; 24] = [
        -1.0, -1.0, 1.0, 1.0, -1.0, 1.0, -1.0, 1.0, 1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, 1.0,
        -1.0, -1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0,
    ];
    const CUBE_FACES: [u32; 36] = [
        0, 3, 2, 0, 1, 3, 1, 7, 3, 1, 5, 7, 5, 6, 7, 5, 4, 6, 4, 2, 6, 4, 0, 2, 2, 7, 6, 2, 3,
        7, 4, 1, 0, 4, 5, 1,
    ];

    fn cube() -> InputMesh {
        validate_mesh(&MeshInput::triangles(&CUBE_VERTICES, &CUBE_FACES), "source").expect("cube")
    }

    fn plane_x(x: f64, half: f64) -> InputMesh {
        let vertices = [
            x, -half, -half, x, half, -half, x, half, half, x, -half, half,
        ];
        validate_mesh(&MeshInput::triangles(&vertices, &[0, 1, 2, 0, 2, 3]), "cut").expect("plane")
    }

    fn run(source: &InputMesh, cut: &InputMesh, flags: DispatchFlags) -> Result<Vec<ComponentKind>, String> {
        let request = KernelRequest {
            source,
            cut,
            flags: flags.effective_filters() | (flags & !DispatchFlags::FILTER_ALL),
            general_position_constant: 1e-4,
            general_position_attempts: 4,
        };
        PlanarKernel
            .cut(&request, &InlineScheduler, &mut |_, _, _| {})
            .map(|out| out.meshes.iter().map(|m| m.kind).collect())
            .map_err(|err| err.to_string())
    }

    #[test]
    fn split_face_inserts_shared_crossings() {
        let split = split_face(&[0, 1, 2], &[1.0, -1.0, 1.0]);
        assert_eq!(split.crossings, 2);
        assert_eq!(
            split.above,
            vec![
                VertexRef::Source(0),
                VertexRef::Crossing(0, 1),
                VertexRef::Crossing(1, 2),
                VertexRef::Source(2)
            ]
        );
        assert_eq!(
            split.below,
            vec![VertexRef::Crossing(0, 1), VertexRef::Source(1), VertexRef::Crossing(1, 2)]
        );
    }

    #[test]
    fn cube_splits_into_two_fragments() {
        let kinds = run(&cube(), &plane_x(0.25, 2.0), DispatchFlags::empty()).expect("cut");
        let fragments: Vec<_> = kinds
            .iter()
            .filter_map(|k| match k {
                ComponentKind::Fragment { location, seal, .. } => Some((*location, *seal)),
                _ => None,
            })
            .collect();
        assert_eq!(
            fragments,
            vec![
                (FragmentLocation::Above, SealType::None),
                (FragmentLocation::Below, SealType::None)
            ]
        );
        let patches = kinds
            .iter()
            .filter(|k| matches!(k, ComponentKind::Patch { .. }))
            .count();
        assert_eq!(patches, 1);
        assert_eq!(kinds.len(), 2 + 1 + 1 + 2);
    }

    #[test]
    fn sealing_adds_complete_fragments() {
        let kinds = run(
            &cube(),
            &plane_x(0.25, 2.0),
            DispatchFlags::FILTER_FRAGMENT_SEALING_INSIDE,
        )
        .expect("cut");
        assert!(kinds.iter().all(|k| !matches!(
            k,
            ComponentKind::Fragment {
                seal: SealType::None,
                ..
            }
        )));
        let sealed = kinds
            .iter()
            .filter(|k| matches!(k, ComponentKind::Fragment { .. }))
            .count();
        assert_eq!(sealed, 2);
    }

    #[test]
    fn missing_plane_echoes_inputs_only() {
        let kinds = run(&cube(), &plane_x(5.0, 2.0), DispatchFlags::empty()).expect("cut");
        assert_eq!(kinds.len(), 2);
        assert!(kinds.iter().all(|k| matches!(k, ComponentKind::Input { .. })));
    }

    #[test]
    fn partial_cut_is_a_kernel_failure() {
        let err = run(&cube(), &plane_x(0.25, 0.5), DispatchFlags::empty()).expect_err("partial");
        assert!(err.contains("partial"));
    }

    #[test]
    fn vertex_on_plane_needs_general_position() {
        let err = run(&cube(), &plane_x(1.0, 2.0), DispatchFlags::empty()).expect_err("degenerate");
        assert!(err.contains("general position"));
        // Nudging the plane off the cube face leaves it clear of the source.
        let kinds = run(
            &cube(),
            &plane_x(1.0, 2.0),
            DispatchFlags::ENFORCE_GENERAL_POSITION,
        )
        .expect("perturbed");
        assert_eq!(kinds.len(), 2);
    }

    #[test]
    fn non_planar_cut_is_rejected() {
        let vertices = [0.0, -2.0, -2.0, 0.0, 2.0, -2.0, 0.5, 2.0, 2.0, 0.0, -2.0, 2.0];
        let cut = validate_mesh(&MeshInput::triangles(&vertices, &[0, 1, 2, 0, 2, 3]), "cut")
            .expect("cut");
        let err = run(&cube(), &cut, DispatchFlags::empty()).expect_err("non planar");
        assert!(err.contains("not planar"));
    }
}
