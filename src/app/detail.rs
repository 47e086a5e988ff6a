// src/app/detail.rs
use eframe::egui as eg;

use crate::app::prefs::DETAIL_W_RANGE;
use crate::app::types::PosterState;
use crate::app::ui::grid::draw_local_placeholder;
use crate::app::utils::{format_runtime, rating_line, star_rating};

enum DetailAction {
    Clear,
    ToggleFavorite(usize),
    ToggleWatchlist(usize),
}

/// Pending and on-disk posters will show up; idle and failed ones never will.
fn poster_still_coming(state: PosterState) -> bool {
    matches!(state, PosterState::Pending | PosterState::Cached)
}

impl crate::app::CatalogApp {
    pub(crate) fn ui_render_detail_panel(&mut self, ctx: &eg::Context) {
        let min_w = *DETAIL_W_RANGE.start();

        // Snap panel width to poster column steps
        let screen_w: f32 = ctx.input(|i| i.screen_rect().width());
        let step: f32 = (self.prefs.poster_w + crate::app::ui::grid::H_SPACING).max(1.0);
        let max_w: f32 = (screen_w * 0.45).clamp(min_w, *DETAIL_W_RANGE.end());
        let snapped_max: f32 = ((max_w / step).floor() * step).max(min_w);
        let snapped_default: f32 =
            ((self.prefs.detail_w / step).round() * step).clamp(min_w, snapped_max);

        let mut action: Option<DetailAction> = None;

        let panel = eg::SidePanel::right("detail_panel")
            .resizable(true)
            .default_width(snapped_default)
            .min_width(min_w)
            .max_width(snapped_max)
            .show(ctx, |ui| {
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    ui.heading("Details");
                    ui.with_layout(eg::Layout::right_to_left(eg::Align::Center), |ui| {
                        if ui.button("Clear").clicked() {
                            action = Some(DetailAction::Clear);
                        }
                    });
                });
                ui.separator();

                let Some(sel) = self.selected_idx else {
                    ui.label("Select a movie from the grid to see details.");
                    return;
                };
                let Some(movie) = self.catalog.get(sel) else {
                    ui.label("Selection is out of range.");
                    return;
                };

                eg::ScrollArea::vertical().auto_shrink([false; 2]).show(ui, |ui| {
                    ui.add_space(4.0);
                    let avail_w = ui.available_width().clamp(120.0, 520.0);
                    let poster_size = eg::vec2(avail_w, avail_w * 1.5);

                    let slot = self.posters.get(sel);
                    match slot.and_then(|s| s.tex.as_ref()) {
                        Some(tex) => {
                            ui.image((tex.id(), poster_size));
                        }
                        None => {
                            let (rect, _resp) =
                                ui.allocate_exact_size(poster_size, eg::Sense::hover());
                            let state = slot.map_or(PosterState::Failed, |s| s.state);
                            if poster_still_coming(state) {
                                ui.painter()
                                    .rect_filled(rect, 8.0, eg::Color32::from_gray(40));
                                ui.painter().text(
                                    rect.center(),
                                    eg::Align2::CENTER_CENTER,
                                    "Poster loading…",
                                    eg::FontId::proportional(14.0),
                                    eg::Color32::WHITE,
                                );
                            } else {
                                draw_local_placeholder(ui.painter(), rect, &movie.title);
                            }
                        }
                    }

                    ui.add_space(8.0);

                    let title = if movie.release_date.is_empty() || movie.release_date == "N/A" {
                        movie.title.clone()
                    } else {
                        format!("{} ({})", movie.title, movie.release_date)
                    };
                    ui.heading(title);
                    ui.label(format!(
                        "{}  {}",
                        star_rating(movie.rating),
                        rating_line(movie.rating, movie.votes)
                    ));
                    if movie.runtime > 0 {
                        ui.label(eg::RichText::new(format_runtime(movie.runtime)).weak());
                    }

                    let marks = self.session.marks();
                    let is_fav = marks.is_favorite(&movie.id);
                    let is_watch = marks.is_watchlisted(&movie.id);

                    ui.add_space(6.0);
                    ui.horizontal(|ui| {
                        let fav = if is_fav { "♥ Favorited" } else { "♡ Favorite" };
                        if ui.button(fav).clicked() {
                            action = Some(DetailAction::ToggleFavorite(sel));
                        }
                        let watch = if is_watch { "✔ On watchlist" } else { "＋ Watchlist" };
                        if ui.button(watch).clicked() {
                            action = Some(DetailAction::ToggleWatchlist(sel));
                        }
                    });

                    ui.add_space(8.0);
                    ui.separator();
                    ui.add_space(8.0);

                    ui.label(eg::RichText::new("Genres").strong());
                    if movie.genres.is_empty() {
                        ui.label("—");
                    } else {
                        ui.label(movie.genres.join(", "));
                    }
                    ui.add_space(6.0);

                    if !movie.description.is_empty() {
                        ui.label(eg::RichText::new("Overview").strong());
                        ui.add(eg::Label::new(&movie.description).wrap());
                        ui.add_space(6.0);
                    }

                    if !movie.actors.is_empty() {
                        ui.label(eg::RichText::new("Cast").strong());
                        ui.add(eg::Label::new(movie.actors.join(", ")).wrap());
                    }
                });
            });

        match action {
            Some(DetailAction::Clear) => self.selected_idx = None,
            Some(DetailAction::ToggleFavorite(idx)) => self.toggle_favorite(idx),
            Some(DetailAction::ToggleWatchlist(idx)) => self.toggle_watchlist(idx),
            None => {}
        }

        // Persist the snapped width
        let actual_w = panel.response.rect.width();
        let snapped_new = ((actual_w / step).round() * step).clamp(min_w, snapped_max);
        if (snapped_new - self.prefs.detail_w).abs() > 0.5 {
            self.prefs.detail_w = snapped_new;
            self.mark_dirty();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_queued_posters_show_loading() {
        assert!(poster_still_coming(PosterState::Pending));
        assert!(poster_still_coming(PosterState::Cached));
        assert!(!poster_still_coming(PosterState::Idle));
        assert!(!poster_still_coming(PosterState::Failed));
        assert!(!poster_still_coming(PosterState::Ready));
    }
}
