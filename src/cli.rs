// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for scanner operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Decoding codes from an image file

use qr_scanner::app::confirm::{SystemUrlOpener, UrlOpener};
use qr_scanner::app::detection;
use qr_scanner::app::frame_processor::{RecognizerChain, SymbolRecognizer};
use qr_scanner::app::preview::{PreviewLayer, ScreenRect, VideoGravity};
use qr_scanner::app::session::DiscoverySession;
use qr_scanner::backends::camera::get_backend;
use qr_scanner::backends::camera::still_image::load_image_as_frame;
use qr_scanner::config::Config;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::info;

/// List all cameras the configured backend can see
///
/// Cameras matching the scanner's device type and position are marked.
pub fn list_cameras(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let backend = get_backend(config);
    if !backend.is_available() {
        println!("The {} backend is not available.", backend.backend_type());
        return Ok(());
    }

    let cameras = backend.enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    let usable: Vec<String> =
        DiscoverySession::new(config.device_types.clone(), config.camera_position)
            .devices(backend.as_ref())
            .into_iter()
            .map(|d| d.path)
            .collect();

    println!("Available cameras ({}):", backend.backend_type());
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        let marker = if usable.contains(&camera.path) { "*" } else { " " };
        println!("{} [{}] {}", marker, index, camera.name);
        println!("      Path: {}", camera.path);
        println!(
            "      Position: {}, type: {}",
            camera.position, camera.device_type
        );

        let formats = backend.get_formats(camera);
        if !formats.is_empty() {
            // Group formats by resolution and show best framerate
            let mut resolutions: Vec<(u32, u32, u32)> = Vec::new();
            for format in &formats {
                let fps = format.framerate.map(|f| f.as_int()).unwrap_or(0);
                if let Some(existing) = resolutions
                    .iter_mut()
                    .find(|(w, h, _)| *w == format.width && *h == format.height)
                {
                    existing.2 = existing.2.max(fps);
                } else {
                    resolutions.push((format.width, format.height, fps));
                }
            }

            // Sort by resolution (highest first)
            resolutions.sort_by(|a, b| (b.0 * b.1).cmp(&(a.0 * a.1)));

            let res_strs: Vec<String> = resolutions
                .iter()
                .take(3)
                .map(|(w, h, fps)| format!("{}x{}@{}fps", w, h, fps))
                .collect();

            println!("      Formats: {}", res_strs.join(", "));
        }
        println!();
    }

    println!("* = matches the scanner's camera filter");
    Ok(())
}

/// Recognize codes in an image file
///
/// Prints every symbol found and the status line the scanner would show.
/// With `open`, an openable URL is offered on stdin before being opened.
pub fn decode_image(
    config: &Config,
    path: &Path,
    open: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let frame = load_image_as_frame(path)?;
    info!(path = %path.display(), width = frame.width, height = frame.height, "Decoding image");

    let recognizer = RecognizerChain::standard(config.max_detection_dimension);
    let symbols = recognizer.recognize(&frame, &config.supported_types);

    // An unscaled preview maps regions straight to image pixels
    let mut layer = PreviewLayer::new(VideoGravity::Resize, false);
    layer.set_bounds(ScreenRect::new(
        0.0,
        0.0,
        frame.width as f32,
        frame.height as f32,
    ));
    layer.set_video_size(frame.width, frame.height);

    if symbols.is_empty() {
        println!("No symbols found in {}", path.display());
    }
    for (index, symbol) in symbols.iter().enumerate() {
        let text = symbol.text.as_deref().unwrap_or("<not decoded>");
        match layer.transformed_region(symbol) {
            Some(rect) => println!(
                "[{}] {}: {} at {:.0},{:.0} {:.0}x{:.0}",
                index, symbol.symbology, text, rect.x, rect.y, rect.width, rect.height
            ),
            None => println!("[{}] {}: {}", index, symbol.symbology, text),
        }
    }

    let opener = SystemUrlOpener::new(config.openable_schemes.iter().cloned());
    let outcome = detection::evaluate(&symbols, &config.supported_types, &layer, &opener);
    if let Some(status) = &outcome.status {
        println!("Status: {}", status);
    }

    let Some(decoded) = outcome.url_to_confirm else {
        return Ok(());
    };
    if !open {
        println!("Openable URL: {} (pass --open to open it)", decoded.text);
        return Ok(());
    }

    let prompt = qr_scanner::app::ConfirmationPrompt::new(decoded);
    print!("{}: {} [y/N] ", prompt.title, prompt.message);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    if answer.trim().eq_ignore_ascii_case("y") {
        opener.open(&prompt.url)?;
        println!("Opened {}", prompt.url);
    } else {
        println!("Cancelled");
    }

    Ok(())
}
