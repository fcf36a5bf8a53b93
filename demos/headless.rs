//! Renders a small scene offscreen in every mode and saves the results as
//! `headless-<mode>.png`.
//!
//! cargo run --example headless -- [width] [height]

use std::env;
use std::error::Error;

use log::info;
use wavetrace::{
    gpu, Orbit, RenderConfig, RenderMode, RenderOutcome, Renderer, Scene,
    WgpuDevice,
};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    let mut args = env::args().skip(1).map(|arg| arg.parse::<u32>());
    let width = args.next().transpose()?.unwrap_or(320);
    let height = args.next().transpose()?.unwrap_or(240);

    let device = pollster::block_on(WgpuDevice::request())?;
    let renderer = Renderer::new(device, &scene())?.with_status_callback(
        |status| {
            info!("Status: {status}");
        },
    );

    for (name, mode) in [
        ("all-at-once", RenderMode::AllSamplesAtOnce),
        ("per-sample", RenderMode::PerSample),
        ("coherent", RenderMode::PerSampleCoherent),
    ] {
        let config = RenderConfig {
            mode,
            orbit: Orbit {
                radius: 5.0,
                latitude: 0.3,
                longitude: 0.6,
            },
            use_bounding_boxes: true,
            ..Default::default()
        };

        let outcome =
            pollster::block_on(renderer.render(width, height, &config))?;

        let RenderOutcome::Completed { samples } = outcome else {
            continue;
        };

        let output = pollster::block_on(renderer.read_output())?;
        let path = format!("headless-{name}.png");

        save(&path, width, height, &output, samples)?;

        info!(
            "Saved {path}; average sample time: {:?}",
            renderer.progress().average_sample_time(),
        );
    }

    Ok(())
}

/// Emissive ceiling panel over a floor and two walls.
fn scene() -> Scene {
    let mut triangles = Vec::new();

    let mut quad = |a: [f32; 3], b, c, d, material| {
        triangles.push(gpu::Triangle::new(a, b, c, material));
        triangles.push(gpu::Triangle::new(a, c, d, material));
    };

    // floor
    quad(
        [-2.0, -1.0, -2.0],
        [-2.0, -1.0, 2.0],
        [2.0, -1.0, 2.0],
        [2.0, -1.0, -2.0],
        0,
    );

    // back wall
    quad(
        [-2.0, -1.0, -2.0],
        [2.0, -1.0, -2.0],
        [2.0, 2.0, -2.0],
        [-2.0, 2.0, -2.0],
        1,
    );

    // left wall
    quad(
        [-2.0, -1.0, -2.0],
        [-2.0, 2.0, -2.0],
        [-2.0, 2.0, 2.0],
        [-2.0, -1.0, 2.0],
        2,
    );

    // light
    quad(
        [-0.5, 1.9, -0.5],
        [0.5, 1.9, -0.5],
        [0.5, 1.9, 0.5],
        [-0.5, 1.9, 0.5],
        3,
    );

    let materials = vec![
        gpu::Material::diffuse([0.8, 0.8, 0.8]),
        gpu::Material::diffuse([0.2, 0.6, 0.2]),
        gpu::Material::diffuse([0.7, 0.2, 0.2]),
        gpu::Material::emissive([6.0, 6.0, 5.0]),
    ];

    Scene::new(triangles, materials).with_chunked_bounding_boxes(2)
}

fn save(
    path: &str,
    width: u32,
    height: u32,
    output: &[[f32; 4]],
    samples: u32,
) -> Result<(), Box<dyn Error>> {
    let pixels: Vec<u8> = output
        .iter()
        .flat_map(|&[r, g, b, _]| {
            [r, g, b].map(|channel| {
                let channel = channel / samples as f32;
                let mapped = channel / (1.0 + channel);

                (mapped.powf(1.0 / 2.2) * 255.0).round() as u8
            })
        })
        .collect();

    image::RgbImage::from_raw(width, height, pixels)
        .ok_or("output doesn't match the image size")?
        .save(path)?;

    Ok(())
}
