// Connected component record: a tag-specific payload plus one owned mesh.
use crate::core::flags::{
    ComponentType, FragmentLocation, InputOrigin, PatchLocation, SealType, SeamOrigin,
};
use crate::core::mesh::IndexArrayMesh;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ComponentKind {
    Fragment {
        location: FragmentLocation,
        seal: SealType,
        patch_location: PatchLocation,
    },
    Patch {
        location: PatchLocation,
    },
    Seam {
        origin: SeamOrigin,
    },
    Input {
        origin: InputOrigin,
    },
}

impl ComponentKind {
    pub fn component_type(&self) -> ComponentType {
        match self {
            ComponentKind::Fragment { .. } => ComponentType::Fragment,
            ComponentKind::Patch { .. } => ComponentType::Patch,
            ComponentKind::Seam { .. } => ComponentType::Seam,
            ComponentKind::Input { .. } => ComponentType::Input,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConnectedComponent {
    pub kind: ComponentKind,
    pub mesh: IndexArrayMesh,
}

impl ConnectedComponent {
    pub fn new(kind: ComponentKind, mesh: IndexArrayMesh) -> Self {
        Self { kind, mesh }
    }

    pub fn component_type(&self) -> ComponentType {
        self.kind.component_type()
    }
}

#[cfg(test)]
mod tests {
    use super::{ComponentKind, ConnectedComponent};
    use crate::core::flags::{ComponentType, ComponentTypeFilter, PatchLocation, SeamOrigin};
    use crate::core::mesh::IndexArrayMesh;

    #[test]
    fn tag_follows_payload() {
        let mesh = IndexArrayMesh::from_faces(vec![0.0; 9], vec![0, 1, 2], vec![3]).expect("mesh");
        let patch = ConnectedComponent::new(
            ComponentKind::Patch {
                location: PatchLocation::Inside,
            },
            mesh.clone(),
        );
        let seam = ConnectedComponent::new(
            ComponentKind::Seam {
                origin: SeamOrigin::SrcMesh,
            },
            mesh,
        );
        assert_eq!(patch.component_type(), ComponentType::Patch);
        assert_eq!(seam.component_type().filter_bit(), ComponentTypeFilter::SEAM);
    }
}
