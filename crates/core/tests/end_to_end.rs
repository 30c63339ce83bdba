//! One frame of the viewer against the recording device, from a JPEG on disk
//! to the draw call.

use std::rc::Rc;

use image::{Rgb, RgbImage};
use texquad_core::render::quad::{FLOATS_PER_VERTEX, QUAD_VERTICES};
use texquad_core::render::recording::Call;
use texquad_core::{RecordingContext, Viewer, ViewerConfig};

fn white_jpeg(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("white.jpg");
    RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]))
        .save(&path)
        .unwrap();
    path
}

#[test]
fn one_frame_draws_six_vertices_sampling_the_uploaded_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let gl = Rc::new(RecordingContext::new());
    let config = ViewerConfig {
        image_path: white_jpeg(dir.path()),
        ..ViewerConfig::default()
    };

    let mut viewer = Viewer::new(gl.clone(), &config).unwrap();
    let setup_calls = gl.calls().len();
    viewer.render_frame();

    // Clear precedes the draw within the frame.
    let frame = &gl.calls()[setup_calls..];
    let clear_at = frame
        .iter()
        .position(|c| *c == Call::Clear(glow::COLOR_BUFFER_BIT))
        .expect("frame must clear");
    let draw_at = frame
        .iter()
        .position(|c| matches!(c, Call::DrawArrays { .. }))
        .expect("frame must draw");
    assert!(clear_at < draw_at);

    let draws = gl.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].mode, glow::TRIANGLES);
    assert_eq!(draws[0].count, 6);

    // Every quad corner samples the uploaded white.
    let texture = draws[0].texture.expect("texture bound at draw time");
    for vertex in QUAD_VERTICES.chunks_exact(FLOATS_PER_VERTEX) {
        let (u, v) = (vertex[3], vertex[4]);
        let texel = gl.sample_texture(texture, u, v).unwrap();
        assert!(
            texel[..3].iter().all(|&c| c >= 250) && texel[3] == 255,
            "corner ({u}, {v}) sampled {texel:?}"
        );
    }

    assert!(gl.invalid_operations().is_empty(), "{:?}", gl.invalid_operations());
}

#[test]
fn dropping_the_viewer_releases_every_device_object_once() {
    let dir = tempfile::tempdir().unwrap();
    let gl = Rc::new(RecordingContext::new());
    let config = ViewerConfig {
        image_path: white_jpeg(dir.path()),
        ..ViewerConfig::default()
    };

    let mut viewer = Viewer::new(gl.clone(), &config).unwrap();
    viewer.render_frame();
    drop(viewer);

    assert_eq!(gl.live_programs(), 0);
    assert_eq!(gl.deleted_programs(), 1);
    assert_eq!(gl.live_shaders(), 0);
    assert_eq!(gl.live_textures(), 0);
    assert_eq!(gl.live_vertex_arrays(), 0);
    assert_eq!(gl.live_buffers(), 0);
    assert!(gl.invalid_operations().is_empty(), "{:?}", gl.invalid_operations());
}

#[test]
fn shader_files_on_disk_replace_the_builtin_pair() {
    let dir = tempfile::tempdir().unwrap();
    let vert = dir.path().join("custom.vert");
    let frag = dir.path().join("custom.frag");
    std::fs::write(&vert, texquad_core::render::QUAD_VERTEX_SHADER).unwrap();
    std::fs::write(
        &frag,
        "#version 460 core\nout vec4 FragColor;\nvoid main() { FragColor = vec4(1.0); }\n",
    )
    .unwrap();

    let gl = Rc::new(RecordingContext::new());
    let config = ViewerConfig {
        image_path: white_jpeg(dir.path()),
        vertex_shader_path: Some(vert),
        fragment_shader_path: Some(frag),
        ..ViewerConfig::default()
    };
    let viewer = Viewer::new(gl.clone(), &config).unwrap();

    // No sampler uniform in this program: setup carries on without it.
    assert_eq!(gl.uniform_value(viewer.program().handle(), "ourTexture"), None);
    assert!(viewer.texture_loaded());
}
