use super::common::{read_params, typed};
use crate::params::{DisplayVertex, VisualizeParams};
use crate::{BufferView, ColorMap, ComputeError, Texel};

const EDGE_EPSILON: f32 = 1e-6;

fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Color-maps the output image onto the display mesh.
///
/// The mesh is a triangle strip in normalised device coordinates with `+y`
/// up; display row 0 is the top of the viewport. Pixels outside the mesh
/// stay black.
pub fn handle_visualize<T: Texel>(binds: &[BufferView]) -> Result<Vec<Vec<u8>>, ComputeError> {
    if binds.len() < 4 {
        return Err(ComputeError::ShapeMismatch(
            "Visualize kernel expects 4 buffers (image, mesh, display, params)",
        ));
    }
    let p: VisualizeParams =
        read_params(&binds[3], "Params buffer for Visualize has incorrect size or shape")?;
    let (iw, ih) = (p.image_width as usize, p.image_height as usize);
    let (dw, dh) = (p.display_width as usize, p.display_height as usize);
    if iw == 0 || ih == 0 {
        return Err(ComputeError::ShapeMismatch("Visualize requires a non-empty image"));
    }
    let image = typed::<T>(&binds[0], iw * ih, "Visualize image does not match its declared size")?;
    let mesh = typed::<DisplayVertex>(
        &binds[1],
        p.vertex_count as usize,
        "Visualize mesh does not hold vertex_count vertices",
    )?;
    if binds[2].element_size_in_bytes != 3 || binds[2].element_count() != dw * dh {
        return Err(ComputeError::ShapeMismatch(
            "Visualize display must be display_height x display_width RGB8",
        ));
    }

    let color_map = ColorMap::from_index(p.color_map);
    let to_pixel = |v: &DisplayVertex| {
        [
            (v.position[0] + 1.0) * 0.5 * dw as f32,
            (1.0 - v.position[1]) * 0.5 * dh as f32,
        ]
    };
    let mut display = vec![0u8; dw * dh * 3];
    for tri in mesh.windows(3) {
        let [a, b, c] = [to_pixel(&tri[0]), to_pixel(&tri[1]), to_pixel(&tri[2])];
        let area = edge(a, b, c);
        if area.abs() < EDGE_EPSILON {
            continue;
        }
        let min_x = a[0].min(b[0]).min(c[0]).floor().max(0.0) as usize;
        let min_y = a[1].min(b[1]).min(c[1]).floor().max(0.0) as usize;
        let max_x = (a[0].max(b[0]).max(c[0]).ceil().max(0.0) as usize).min(dw);
        let max_y = (a[1].max(b[1]).max(c[1]).ceil().max(0.0) as usize).min(dh);

        for py in min_y..max_y {
            for px in min_x..max_x {
                let centre = [px as f32 + 0.5, py as f32 + 0.5];
                let w0 = edge(b, c, centre) / area;
                let w1 = edge(c, a, centre) / area;
                let w2 = edge(a, b, centre) / area;
                if w0 < -EDGE_EPSILON || w1 < -EDGE_EPSILON || w2 < -EDGE_EPSILON {
                    continue;
                }
                let u = w0 * tri[0].uv[0] + w1 * tri[1].uv[0] + w2 * tri[2].uv[0];
                let v = w0 * tri[0].uv[1] + w1 * tri[1].uv[1] + w2 * tri[2].uv[1];
                let col = ((u.clamp(0.0, 1.0) * iw as f32) as usize).min(iw - 1);
                let row = ((v.clamp(0.0, 1.0) * ih as f32) as usize).min(ih - 1);
                let rgb = color_map.rgb(image[row * iw + col].strength());
                let at = (py * dw + px) * 3;
                display[at..at + 3].copy_from_slice(&rgb);
            }
        }
    }
    Ok(vec![display])
}
