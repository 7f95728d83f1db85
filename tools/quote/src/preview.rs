//! Wireframe snapshot of a mesh
//!
//! Projects every triangle edge isometrically and rasterizes it with
//! Bresenham lines. Good enough to let a customer recognize their upload.

use image::{ImageBuffer, Rgb, RgbImage};
use nalgebra::{Point2, Point3};
use printquote::Mesh;
use std::path::Path;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const EDGE: Rgb<u8> = Rgb([40, 40, 40]);
const MARGIN: f64 = 20.0;

/// Isometric projection onto the image plane; y grows downward
fn project(p: &Point3<f64>) -> Point2<f64> {
    let (sin30, cos30) = (0.5, 3f64.sqrt() / 2.0);
    Point2::new((p.x - p.y) * cos30, -((p.x + p.y) * sin30 + p.z))
}

/// Render a mesh into a square image `size` pixels wide
pub fn render_wireframe(mesh: &Mesh, size: u32) -> RgbImage {
    let mut img = ImageBuffer::from_pixel(size, size, BACKGROUND);

    let projected: Vec<Point2<f64>> = mesh.positions().map(project).collect();
    let (mut min, mut max) = (projected[0], projected[0]);
    for p in &projected {
        min = min.inf(p);
        max = max.sup(p);
    }

    let range = (max - min).max().max(0.001);
    let scale = (f64::from(size) - 2.0 * MARGIN).max(1.0) / range;
    // Center the drawing on both axes
    let offset = (max - min).map(|extent| (f64::from(size) - extent * scale) / 2.0);
    let to_screen = |p: &Point2<f64>| {
        (
            ((p.x - min.x) * scale + offset.x) as i32,
            ((p.y - min.y) * scale + offset.y) as i32,
        )
    };

    for tri in projected.chunks_exact(3) {
        let [a, b, c] = [to_screen(&tri[0]), to_screen(&tri[1]), to_screen(&tri[2])];
        draw_line(&mut img, a, b, EDGE);
        draw_line(&mut img, b, c, EDGE);
        draw_line(&mut img, c, a, EDGE);
    }

    img
}

/// Render a mesh and save it as PNG
pub fn export_wireframe_preview(
    mesh: &Mesh,
    size: u32,
    output_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    render_wireframe(mesh, size).save(output_path)?;
    Ok(())
}

/// Draw a line using Bresenham's algorithm
fn draw_line(img: &mut RgbImage, p1: (i32, i32), p2: (i32, i32), color: Rgb<u8>) {
    let (mut x0, mut y0) = p1;
    let (x1, y1) = p2;

    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx - dy;

    loop {
        if x0 >= 0 && x0 < img.width() as i32 && y0 >= 0 && y0 < img.height() as i32 {
            img.put_pixel(x0 as u32, y0 as u32, color);
        }

        if x0 == x1 && y0 == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x0 += sx;
        }
        if e2 < dx {
            err += dx;
            y0 += sy;
        }
    }
}
