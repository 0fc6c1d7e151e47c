//! Text viewer: prints what a graphical viewer would draw.

use std::io::Write;

use osvcad::{Rgb, Viewer};
use osvcad_kernel::CsgShape;
use osvcad_math::{Point3, Vec3};
use tracing::warn;

/// Colors handed out to parts, in order, wrapping around.
pub const PALETTE: [Rgb; 6] = [
    Rgb::new(0.90, 0.30, 0.25),
    Rgb::new(0.25, 0.55, 0.90),
    Rgb::new(0.35, 0.75, 0.35),
    Rgb::new(0.95, 0.75, 0.20),
    Rgb::new(0.60, 0.40, 0.80),
    Rgb::new(0.30, 0.75, 0.75),
];

/// Cycles through [`PALETTE`].
#[derive(Debug, Default)]
pub struct Palette {
    next: usize,
}

impl Palette {
    pub fn next_color(&mut self) -> Rgb {
        let color = PALETTE[self.next % PALETTE.len()];
        self.next += 1;
        color
    }
}

/// Collects display calls and writes them out on [`Viewer::start`].
pub struct TerminalViewer<W: Write> {
    out: W,
    lines: Vec<String>,
}

impl<W: Write> TerminalViewer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            lines: Vec::new(),
        }
    }
}

fn hex(color: Rgb) -> String {
    let byte = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("#{:02x}{:02x}{:02x}", byte(color.r), byte(color.g), byte(color.b))
}

fn describe(shape: &CsgShape) -> String {
    match shape.bounds() {
        Some(b) => format!(
            "[{:.3}, {:.3}, {:.3}] .. [{:.3}, {:.3}, {:.3}]",
            b.min.x, b.min.y, b.min.z, b.max.x, b.max.y, b.max.z
        ),
        None => match shape {
            CsgShape::StepImport { path, solids } => format!("STEP {path} ({solids} solids)"),
            _ => "unbounded".to_string(),
        },
    }
}

impl<W: Write> Viewer<CsgShape> for TerminalViewer<W> {
    fn display_shape(&mut self, shape: &CsgShape, color: Rgb, transparency: f64) {
        self.lines.push(format!(
            "shape {} alpha={:.2} {}",
            hex(color),
            1.0 - transparency,
            describe(shape)
        ));
    }

    fn display_vector(&mut self, origin: &Point3, direction: &Vec3) {
        self.lines.push(format!(
            "  anchor ({:.3}, {:.3}, {:.3}) -> ({:.3}, {:.3}, {:.3})",
            origin.x, origin.y, origin.z, direction.x, direction.y, direction.z
        ));
    }

    fn start(&mut self) {
        let total = self.lines.len();
        for (written, line) in self.lines.drain(..).enumerate() {
            if let Err(e) = writeln!(self.out, "{line}") {
                warn!(error = %e, written, total, "viewer output failed, dropping remaining lines");
                break;
            }
        }
        if let Err(e) = self.out.flush() {
            warn!(error = %e, "viewer output flush failed");
        }
    }
}
