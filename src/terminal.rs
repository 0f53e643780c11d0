// SPDX-License-Identifier: GPL-3.0-only

//! Terminal scanner screen
//!
//! Renders the camera preview to the terminal using Unicode half-block
//! characters (two vertical pixels per cell) and draws the highlight, status
//! label, top bar and confirmation prompt on top of it.

use crate::app::confirm::{ConfirmationPrompt, PromptAction, SystemUrlOpener, UrlOpener};
use crate::app::frame_processor::DetectedSymbol;
use crate::app::highlight::HighlightView;
use crate::app::preview::{PreviewLayer, ScreenRect};
use crate::app::screen::{Layer, ScannerScreen};
use crate::app::session::{CaptureSession, MetadataReceiver, configure_session};
use crate::backends::camera::get_backend;
use crate::backends::camera::types::{CameraFrame, FrameReceiver};
use crate::config::Config;
use crate::constants::{APP_TITLE, timing};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph, Widget, Wrap},
};
use std::io::{self, stdout};
use std::sync::Arc;
use tracing::{error, info};

/// Run the scanner screen until the user quits
pub fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Receivers from a running session
///
/// The session is held so dropping this tears capture down.
struct SessionFeed {
    _session: CaptureSession,
    preview: Option<FrameReceiver>,
    metadata: Option<MetadataReceiver>,
}

impl SessionFeed {
    fn latest_frame(&mut self) -> Option<CameraFrame> {
        let receiver = self.preview.as_mut()?;
        let mut latest = None;
        // Drain everything queued; only the newest frame is shown
        while let Ok(frame) = receiver.try_recv() {
            latest = Some(frame);
        }
        latest
    }

    fn pending_detections(&mut self) -> Vec<Vec<DetectedSymbol>> {
        let Some(receiver) = self.metadata.as_mut() else {
            return Vec::new();
        };
        let mut pending = Vec::new();
        while let Ok(symbols) = receiver.try_recv() {
            pending.push(symbols);
        }
        pending
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let supported = Arc::new(config.supported_types.clone());
    let opener: Arc<dyn UrlOpener> =
        Arc::new(SystemUrlOpener::new(config.openable_schemes.iter().cloned()));

    let (mut screen, mut feed) = match configure_session(config, get_backend(config)) {
        Ok(mut session) => {
            let (position, format) = match session.input() {
                Some(input) => (input.device().position, Some(input.format().clone())),
                None => (Default::default(), None),
            };

            let mut screen = ScannerScreen::new(
                supported,
                opener,
                config.video_gravity,
                config.should_mirror(position),
            );
            if let Some(format) = format {
                screen
                    .preview_mut()
                    .set_video_size(format.width, format.height);
            }

            let feed = SessionFeed {
                preview: session.take_preview_receiver(),
                metadata: session.take_metadata_receiver(),
                _session: session,
            };
            (screen, Some(feed))
        }
        Err(e) => {
            error!(error = %e, "Camera setup failed");
            let mut screen =
                ScannerScreen::new(supported, opener, config.video_gravity, false);
            screen.set_top_bar(format!("{} | {}", APP_TITLE, e));
            (screen, None)
        }
    };

    loop {
        if let Some(feed) = feed.as_mut() {
            if let Some(frame) = feed.latest_frame() {
                screen.update_frame(frame);
            }
            for symbols in feed.pending_detections() {
                screen.metadata_output(&symbols);
            }
        }

        terminal.draw(|f| {
            let area = f.area();
            screen.resize(area.width as f32, area.height as f32 * 2.0);

            for layer in screen.views().iter() {
                match layer {
                    Layer::Preview => f.render_widget(
                        FrameWidget {
                            layer: screen.preview(),
                        },
                        area,
                    ),
                    Layer::Highlight => f.render_widget(
                        HighlightWidget {
                            view: screen.highlight(),
                        },
                        area,
                    ),
                    Layer::MessageLabel => f.render_widget(
                        StatusBar {
                            message: screen.message(),
                        },
                        Rect {
                            x: area.x,
                            y: area.y + area.height.saturating_sub(1),
                            width: area.width,
                            height: area.height.min(1),
                        },
                    ),
                    Layer::TopBar => f.render_widget(
                        StatusBar {
                            message: screen.top_bar(),
                        },
                        Rect {
                            x: area.x,
                            y: area.y,
                            width: area.width,
                            height: area.height.min(1),
                        },
                    ),
                }
            }

            // Modal always sits above the view stack
            if let Some(prompt) = screen.modal() {
                f.render_widget(PromptWidget { prompt }, area);
            }
        })?;

        // Handle input with timeout for frame updates
        if event::poll(timing::UI_POLL_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            // Ctrl+C to quit
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                break;
            }

            if screen.modal().is_some() {
                match key.code {
                    KeyCode::Char('y') => screen.confirm_modal(),
                    KeyCode::Char('n') | KeyCode::Esc => screen.cancel_modal(),
                    KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                        if let Some(prompt) = screen.modal_mut() {
                            prompt.toggle_selection();
                        }
                    }
                    KeyCode::Enter => match screen.modal().map(|p| p.selected) {
                        Some(PromptAction::Confirm) => screen.confirm_modal(),
                        _ => screen.cancel_modal(),
                    },
                    _ => {}
                }
                continue;
            }

            if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                break;
            }
        }
    }

    info!("Scanner screen closed");
    Ok(())
}

/// Widget that renders the preview layer using half-block characters
struct FrameWidget<'a> {
    layer: &'a PreviewLayer,
}

impl Widget for FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = self.layer.frame() else {
            // No frame yet - show placeholder
            let msg = "Waiting for camera...";
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };

        // Each cell is two surface pixels tall:
        // - Upper half (▀) colored with fg
        // - Lower half colored with bg
        for ty in 0..area.height {
            for tx in 0..area.width {
                let sx = tx as f32 + 0.5;
                let top = sample_surface(self.layer, frame, sx, ty as f32 * 2.0 + 0.5);
                let bottom = sample_surface(self.layer, frame, sx, ty as f32 * 2.0 + 1.5);

                if let Some(cell) = buf.cell_mut((area.x + tx, area.y + ty)) {
                    cell.set_char('▀');
                    cell.set_fg(top);
                    cell.set_bg(bottom);
                }
            }
        }
    }
}

/// Colour of the frame pixel under a surface point, black outside the video
fn sample_surface(layer: &PreviewLayer, frame: &CameraFrame, sx: f32, sy: f32) -> Color {
    match layer.frame_point_for_surface(sx, sy) {
        Some((nx, ny)) if (0.0..1.0).contains(&nx) && (0.0..1.0).contains(&ny) => {
            let (r, g, b) = frame.rgb_at(
                (nx * frame.width as f32) as u32,
                (ny * frame.height as f32) as u32,
            );
            Color::Rgb(r, g, b)
        }
        _ => Color::Black,
    }
}

/// Cells covered by a surface rectangle inside `area`
///
/// Returns `None` when the rectangle lies outside the area.
fn surface_rect_to_cells(rect: ScreenRect, area: Rect) -> Option<Rect> {
    let surface = ScreenRect::new(0.0, 0.0, area.width as f32, area.height as f32 * 2.0);
    let visible = rect.intersection(&surface)?;

    let left = visible.x.floor() as u16;
    let right = (visible.right().ceil() as u16).min(area.width);
    let top = (visible.y / 2.0).floor() as u16;
    let bottom = ((visible.bottom() / 2.0).ceil() as u16).min(area.height);

    Some(Rect {
        x: area.x + left,
        y: area.y + top,
        width: right.saturating_sub(left).max(1),
        height: bottom.saturating_sub(top).max(1),
    })
}

/// Border around the detected symbol
struct HighlightWidget<'a> {
    view: &'a HighlightView,
}

impl Widget for HighlightWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if !self.view.is_visible() {
            return;
        }
        let Some(cells) = surface_rect_to_cells(self.view.frame(), area) else {
            return;
        };

        Block::bordered()
            .border_type(self.view.border_type())
            .border_style(Style::default().fg(self.view.color()))
            .render(cells, buf);
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        // Decoded text can be any length or script; clip by display width
        buf.set_stringn(
            area.x,
            area.y,
            self.message,
            area.width as usize,
            Style::default().fg(Color::White).bg(Color::DarkGray),
        );
    }
}

/// Centered open-URL confirmation dialog
struct PromptWidget<'a> {
    prompt: &'a ConfirmationPrompt,
}

impl Widget for PromptWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = (self.prompt.message.chars().count() as u16 + 4)
            .clamp(30, 60)
            .min(area.width);
        let height = 7.min(area.height);
        let dialog = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + (area.height - height) / 2,
            width,
            height,
        };

        Clear.render(dialog, buf);

        let block = Block::bordered()
            .title(Line::from(self.prompt.title.as_str()).alignment(Alignment::Center))
            .style(Style::default().fg(Color::White).bg(Color::Black));

        let actions: Vec<Span> = ConfirmationPrompt::actions()
            .into_iter()
            .flat_map(|(action, label)| {
                let style = if action == self.prompt.selected {
                    Style::default().add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                };
                [Span::styled(format!(" {} ", label), style), Span::raw("  ")]
            })
            .collect();

        let text = vec![
            Line::from(self.prompt.message.as_str()),
            Line::default(),
            Line::from(actions),
        ];

        Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(dialog, buf);
    }
}
