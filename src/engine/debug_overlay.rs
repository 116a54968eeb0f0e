use egui::epaint::Shadow;

use super::probe::{BlockedMask, RAY_FAN};
use super::scene::VesselPose;

pub struct DebugStats {
    pub fps: u32,
    pub frame_time_avg_ms: f32,
    pub frame_time_min_ms: f32,
    pub frame_time_max_ms: f32,
    /// Simulation ticks run during the last rendered frame.
    pub ticks_last_frame: u32,
    pub obstacle_count: usize,
    pub resolution: (u32, u32),
    pub camera_distance: f32,
    pub vessels: Vec<VesselPose>,
}

/// Ray-fan readout for one vessel, drawn as an 8-spoke compass rose.
pub struct ProbeRosette {
    /// Rose centre in egui screen points.
    pub center: egui::Pos2,
    /// Spoke length in screen points.
    pub radius: f32,
    pub blocked: BlockedMask,
    pub label: String,
}

pub struct DebugOverlay {
    pub visible: bool,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl DebugOverlay {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let egui_ctx = egui::Context::default();

        // Style: dark, semi-transparent, small monospace white font
        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = egui::Color32::from_rgba_premultiplied(0, 0, 0, 180);
        visuals.window_stroke = egui::Stroke::NONE;
        visuals.window_shadow = Shadow::NONE;
        visuals.override_text_color = Some(egui::Color32::WHITE);
        egui_ctx.set_visuals(visuals);

        let mut style = (*egui_ctx.style()).clone();
        style.override_font_id = Some(egui::FontId::monospace(13.0));
        egui_ctx.set_style(style);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            device,
            surface_format,
            None,  // no depth
            1,     // msaa samples
            false, // no dithering
        );

        Self {
            visible: true,
            egui_ctx,
            egui_state,
            egui_renderer,
        }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.egui_state.on_window_event(window, event)
    }

    /// Render one egui frame: the stats panel and one probe rose per vessel.
    /// Passing `None` for `stats` draws nothing but still flushes egui state.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &winit::window::Window,
        view: &wgpu::TextureView,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
        stats: Option<&DebugStats>,
        rosettes: &[ProbeRosette],
    ) {
        let raw_input = self.egui_state.take_egui_input(window);

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            // ── Probe rosettes ───────────────────────────────────────────────
            if !rosettes.is_empty() {
                let painter = ctx.layer_painter(egui::LayerId::new(
                    egui::Order::Background,
                    egui::Id::new("probe_rosettes"),
                ));
                let clear = egui::Stroke::new(
                    1.5,
                    egui::Color32::from_rgba_unmultiplied(80, 255, 140, 200),
                );
                let blocked = egui::Stroke::new(
                    2.5,
                    egui::Color32::from_rgba_unmultiplied(255, 70, 40, 230),
                );
                for rose in rosettes {
                    for (octant, ray) in RAY_FAN.iter().enumerate() {
                        let is_blocked = rose.blocked.is_blocked(octant);
                        // World +Z is drawn up the screen, +X to the left to
                        // match the default chase view.
                        let tip = rose.center + egui::vec2(-ray.x, -ray.z) * rose.radius;
                        let stroke = if is_blocked { blocked } else { clear };
                        painter.line_segment([rose.center, tip], stroke);
                    }
                    painter.circle_filled(rose.center, 2.5, egui::Color32::WHITE);
                    painter.text(
                        rose.center + egui::vec2(0.0, rose.radius + 10.0),
                        egui::Align2::CENTER_CENTER,
                        &rose.label,
                        egui::FontId::monospace(11.0),
                        egui::Color32::WHITE,
                    );
                }
            }

            // ── Stats panel ──────────────────────────────────────────────────
            if let Some(stats) = stats {
                egui::Area::new(egui::Id::new("debug_overlay"))
                    .fixed_pos(egui::pos2(10.0, 10.0))
                    .show(ctx, |ui| {
                        egui::Frame::none()
                            .fill(egui::Color32::from_rgba_premultiplied(0, 0, 0, 180))
                            .inner_margin(egui::Margin::same(8.0))
                            .rounding(4.0)
                            .show(ui, |ui: &mut egui::Ui| {
                                ui.label(format!("FPS: {}", stats.fps));
                                ui.label(format!(
                                    "Frame: {:.2} ms (min: {:.1} | max: {:.1})",
                                    stats.frame_time_avg_ms,
                                    stats.frame_time_min_ms,
                                    stats.frame_time_max_ms
                                ));
                                ui.label(format!("Ticks/frame: {}", stats.ticks_last_frame));
                                ui.label(format!("Obstacles: {}", stats.obstacle_count));
                                ui.label(format!(
                                    "Resolution: {} x {}",
                                    stats.resolution.0, stats.resolution.1
                                ));
                                ui.label(format!("Camera dist: {:.0}", stats.camera_distance));
                                for pose in &stats.vessels {
                                    ui.separator();
                                    ui.label(format!(
                                        "{:?}: ({:.1}, {:.1})  heading {:.2}",
                                        pose.role, pose.position.x, pose.position.z, pose.facing
                                    ));
                                    let rudder = pose
                                        .rudder
                                        .map(|r| format!("  rudder {r:+.4}"))
                                        .unwrap_or_default();
                                    let throttle = pose
                                        .throttle
                                        .map(|t| format!("  throttle {:.0}%", t * 100.0))
                                        .unwrap_or_default();
                                    ui.label(format!(
                                        "  speed {:.3}{}{}  {}",
                                        pose.speed,
                                        throttle,
                                        rudder,
                                        if pose.moved { "under way" } else { "holding" }
                                    ));
                                    if !pose.blocked.is_clear() {
                                        ui.label(format!("  blocked: {}", pose.blocked.describe()));
                                    }
                                }
                            });
                    });
            }
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, &tris, screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.egui_renderer
                .render(&mut render_pass.forget_lifetime(), &tris, screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}
