// src/app/ui/mod.rs
pub mod grid;
pub mod topbar;

use eframe::egui as eg;

impl crate::app::CatalogApp {
    // Keep splash here; it's tiny and used early.
    pub(crate) fn ui_render_splash(&self, ui: &mut eg::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(48.0);
            ui.heading("Loading movies");
            ui.add(eg::Spinner::new().size(24.0));
            ui.add_space(8.0);
            if !self.status.is_empty() {
                ui.label(&self.status);
            }
            ui.add_space(12.0);
            ui.monospace(format!("Cache: {}", crate::app::cache::cache_dir().display()));
        });
    }

    pub(crate) fn ui_render_error(&self, ui: &mut eg::Ui) {
        let msg = self
            .load_error
            .as_deref()
            .unwrap_or("Could not load movies.");
        ui.add_space(24.0);
        eg::Frame::none()
            .fill(ui.visuals().extreme_bg_color)
            .stroke(eg::Stroke::new(1.0, ui.visuals().error_fg_color))
            .rounding(6.0)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.colored_label(ui.visuals().error_fg_color, eg::RichText::new("Error").strong());
                ui.label(msg);
                ui.label(
                    eg::RichText::new(format!("Backend: {}", self.api.base_url())).weak(),
                );
            });
    }

    pub(crate) fn ui_render_empty(&self, ui: &mut eg::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(48.0);
            ui.heading("No movies found");
            ui.label("Try changing your filter selection");
        });
    }

    pub(crate) fn ui_render_statusbar(&self, ui: &mut eg::Ui) {
        ui.horizontal(|ui| {
            ui.label(self.view.summary());
            ui.separator();
            ui.label(&self.health_line);
            if let Some(p) = self.prefetch_progress() {
                ui.separator();
                ui.label(p);
            }
            if !self.status.is_empty() {
                ui.separator();
                ui.label(eg::RichText::new(&self.status).weak());
            }
        });
    }

    // ---------- GENRE PICKER ----------
    pub(crate) fn ui_render_genre_popup(&mut self, ctx: &eg::Context) {
        if !self.show_genre_popup {
            return;
        }

        let mut open = self.show_genre_popup;
        let mut toggled: Option<String> = None;
        let mut clear = false;

        eg::Window::new("Genres")
            .collapsible(false)
            .resizable(true)
            .default_width(260.0)
            .open(&mut open)
            .show(ctx, |ui| {
                ui.horizontal_wrapped(|ui| {
                    ui.label(eg::RichText::new("Show titles in any of:").strong());
                    if !self.selections.selected_genres().is_empty()
                        && ui.small_button("Clear").clicked()
                    {
                        clear = true;
                    }
                });
                if self.genres_fallback {
                    ui.label(eg::RichText::new("Genre list unavailable; showing defaults.").weak());
                }
                ui.separator();

                eg::ScrollArea::vertical().max_height(360.0).show(ui, |ui| {
                    if self.genre_options.is_empty() {
                        ui.add(eg::Spinner::new());
                    }
                    for opt in &self.genre_options {
                        let mut checked = self.selections.selected_genres().contains(&opt.name);
                        if ui.checkbox(&mut checked, opt.label()).clicked() {
                            toggled = Some(opt.name.clone());
                        }
                    }
                });
            });

        // Apply result after .show
        if clear && self.selections.set_selected_genres(Vec::<String>::new()) {
            self.view_dirty = true;
        }
        if let Some(g) = toggled {
            self.selections.toggle_genre(&g);
            self.view_dirty = true;
        }
        self.show_genre_popup = open;
    }
}
