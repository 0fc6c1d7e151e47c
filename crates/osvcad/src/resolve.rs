//! Placement resolution: local node shapes to globally positioned shapes.
//!
//! Resolution is local to one node and never recurses through ancestors:
//! edge transforms are pre-composed by whoever built the edge.

use osvcad_kernel::GeometryKernel;
use tracing::debug;

use crate::assembly::{Assembly, NodeId};
use crate::error::{OsvcadError, Result};

/// Globally positioned shape of `id`.
///
/// - no inbound edge: the local shape, unchanged;
/// - one inbound edge: the local shape transformed by the edge;
/// - more: `AmbiguousPlacement`.
#[tracing::instrument(skip(assembly, kernel), fields(node = %id))]
pub fn resolve_placement<K>(
    assembly: &Assembly<K::Shape>,
    id: NodeId,
    kernel: &K,
) -> Result<K::Shape>
where
    K: GeometryKernel + ?Sized,
{
    let node = assembly.node(id)?;
    let inbound = assembly.in_edges(id)?;
    match inbound.as_slice() {
        [] => {
            debug!("root node, identity placement");
            Ok(node.shape().clone())
        }
        [edge] => {
            debug!(edge = %edge.id, source = %edge.source, "placing from inbound edge");
            Ok(kernel.transform(node.shape(), &edge.placement.transform)?)
        }
        many => Err(OsvcadError::AmbiguousPlacement {
            node: id,
            inbound: many.len(),
        }),
    }
}

/// Resolve every node in id order, stopping at the first failure.
pub fn resolve_all<K>(assembly: &Assembly<K::Shape>, kernel: &K) -> Result<Vec<(NodeId, K::Shape)>>
where
    K: GeometryKernel + ?Sized,
{
    assembly
        .nodes()
        .map(|(id, _)| resolve_placement(assembly, id, kernel).map(|shape| (id, shape)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::AnchorMap;
    use crate::assembly::Metadata;
    use crate::node::GeometryNode;
    use osvcad_kernel::{CsgKernel, CsgShape};
    use osvcad_math::{Point3, Transform};

    fn node(kernel: &CsgKernel, name: &str) -> GeometryNode<CsgShape> {
        let shape = kernel.make_box(2.0, 2.0, 2.0).unwrap();
        GeometryNode::new(name, shape, AnchorMap::new()).unwrap()
    }

    #[test]
    fn root_resolves_to_local_shape() {
        let kernel = CsgKernel::new();
        let mut asm = Assembly::new("single");
        let a = asm.add_node(node(&kernel, "a"));
        let shape = resolve_placement(&asm, a, &kernel).unwrap();
        assert_eq!(&shape, asm.node(a).unwrap().shape());
    }

    #[test]
    fn identity_edge_is_a_no_op() {
        let kernel = CsgKernel::new();
        let mut asm = Assembly::new("pair");
        let a = asm.add_node(node(&kernel, "a"));
        let b = asm.add_node(node(&kernel, "b"));
        asm.add_edge(a, b, Transform::identity(), Metadata::new())
            .unwrap();
        let shape = resolve_placement(&asm, b, &kernel).unwrap();
        assert_eq!(&shape, asm.node(b).unwrap().shape());
    }

    #[test]
    fn single_edge_translates_deterministically() {
        let kernel = CsgKernel::new();
        let mut asm = Assembly::new("pair");
        let a = asm.add_node(node(&kernel, "a"));
        let b = asm.add_node(node(&kernel, "b"));
        let t = Transform::translation(10.0, 0.0, 0.0);
        asm.add_edge(a, b, t.clone(), Metadata::new()).unwrap();

        let first = resolve_placement(&asm, b, &kernel).unwrap();
        let expected = kernel.transform(asm.node(b).unwrap().shape(), &t).unwrap();
        assert_eq!(first, expected);
        let bounds = first.bounds().unwrap();
        assert_eq!(bounds.min, Point3::new(10.0, 0.0, 0.0));
        assert_eq!(bounds.max, Point3::new(12.0, 2.0, 2.0));

        let second = resolve_placement(&asm, b, &kernel).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn two_inbound_edges_are_ambiguous() {
        let kernel = CsgKernel::new();
        let mut asm = Assembly::new("diamond");
        let a = asm.add_node(node(&kernel, "a"));
        let b = asm.add_node(node(&kernel, "b"));
        let c = asm.add_node(node(&kernel, "c"));
        asm.add_edge(a, c, Transform::translation(1.0, 0.0, 0.0), Metadata::new())
            .unwrap();
        asm.add_edge(b, c, Transform::translation(0.0, 1.0, 0.0), Metadata::new())
            .unwrap();

        let err = resolve_placement(&asm, c, &kernel).unwrap_err();
        assert!(matches!(
            err,
            OsvcadError::AmbiguousPlacement { node, inbound: 2 } if node == c
        ));
        assert!(resolve_all(&asm, &kernel).is_err());
    }

    #[test]
    fn resolve_all_in_id_order() {
        let kernel = CsgKernel::new();
        let mut asm = Assembly::new("pair");
        let a = asm.add_node(node(&kernel, "a"));
        let b = asm.add_node(node(&kernel, "b"));
        asm.add_edge(a, b, Transform::translation(0.0, 0.0, 3.0), Metadata::new())
            .unwrap();
        let resolved = resolve_all(&asm, &kernel).unwrap();
        let ids: Vec<NodeId> = resolved.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![a, b]);
        assert!(matches!(resolved[1].1, CsgShape::Transformed { .. }));
    }
}
