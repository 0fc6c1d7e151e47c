//! Viewer capability.

use osvcad_kernel::GeometryKernel;
use osvcad_math::{Point3, Transform, Vec3};
use tracing::debug;

use crate::assembly::Assembly;
use crate::error::Result;
use crate::resolve::resolve_placement;

/// RGB color, components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    /// Red.
    pub r: f64,
    /// Green.
    pub g: f64,
    /// Blue.
    pub b: f64,
}

impl Rgb {
    /// Color from components.
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }
}

/// Something that can show shapes and anchor vectors.
pub trait Viewer<S> {
    /// Queue a shape for display.
    fn display_shape(&mut self, shape: &S, color: Rgb, transparency: f64);

    /// Queue a vector, e.g. an anchor direction.
    fn display_vector(&mut self, origin: &Point3, direction: &Vec3);

    /// Enter the viewer's event loop. Blocks until the viewer closes.
    fn start(&mut self);
}

/// Transparency used for assembly parts.
pub const PART_TRANSPARENCY: f64 = 0.0;

/// Resolve and display every node, draw each anchor in the node's global
/// frame, then start the viewer.
///
/// `colors` is asked for one color per node, in node order.
pub fn display_assembly<K, V, C>(
    assembly: &Assembly<K::Shape>,
    kernel: &K,
    viewer: &mut V,
    mut colors: C,
) -> Result<()>
where
    K: GeometryKernel + ?Sized,
    V: Viewer<K::Shape> + ?Sized,
    C: FnMut() -> Rgb,
{
    for (id, node) in assembly.nodes() {
        let shape = resolve_placement(assembly, id, kernel)?;
        let placement = match assembly.in_edges(id)?.first() {
            Some(edge) => edge.placement.transform.clone(),
            None => Transform::identity(),
        };
        viewer.display_shape(&shape, colors(), PART_TRANSPARENCY);
        for anchor in node.anchors().values() {
            viewer.display_vector(
                &placement.apply_point(anchor.position()),
                &placement.apply_vec(anchor.direction()),
            );
        }
        debug!(node = %id, anchors = node.anchors().len(), "displayed node");
    }
    viewer.start();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::{Anchor, AnchorKey, AnchorMap};
    use crate::assembly::Metadata;
    use crate::node::GeometryNode;
    use osvcad_kernel::{CsgKernel, CsgShape};

    #[derive(Default)]
    struct Recorder {
        shapes: Vec<(CsgShape, Rgb)>,
        vectors: Vec<(Point3, Vec3)>,
        started: bool,
    }

    impl Viewer<CsgShape> for Recorder {
        fn display_shape(&mut self, shape: &CsgShape, color: Rgb, _transparency: f64) {
            self.shapes.push((shape.clone(), color));
        }

        fn display_vector(&mut self, origin: &Point3, direction: &Vec3) {
            self.vectors.push((*origin, *direction));
        }

        fn start(&mut self) {
            self.started = true;
        }
    }

    #[test]
    fn displays_resolved_nodes_and_anchors() {
        let kernel = CsgKernel::new();
        let mut anchors = AnchorMap::new();
        anchors.insert(
            AnchorKey::Index(0),
            Anchor::new(Point3::new(0.0, 0.0, 1.0), Vec3::z(), 1.0, "top"),
        );
        let cube = kernel.make_box(1.0, 1.0, 1.0).unwrap();
        let mut asm = Assembly::new("pair");
        let a = asm.add_node(GeometryNode::new("a", cube.clone(), anchors.clone()).unwrap());
        let b = asm.add_node(GeometryNode::new("b", cube, anchors).unwrap());
        asm.add_edge(a, b, Transform::translation(5.0, 0.0, 0.0), Metadata::new())
            .unwrap();

        let palette = [Rgb::new(1.0, 0.0, 0.0), Rgb::new(0.0, 0.0, 1.0)];
        let mut next = palette.iter().copied().cycle();
        let mut viewer = Recorder::default();
        display_assembly(&asm, &kernel, &mut viewer, || next.next().unwrap_or(palette[0]))
            .unwrap();

        assert!(viewer.started);
        assert_eq!(viewer.shapes.len(), 2);
        assert_eq!(viewer.shapes[1].1, palette[1]);
        assert_eq!(viewer.vectors[0].0, Point3::new(0.0, 0.0, 1.0));
        assert_eq!(viewer.vectors[1].0, Point3::new(5.0, 0.0, 1.0));
        assert_eq!(viewer.vectors[1].1, Vec3::z());
    }
}
