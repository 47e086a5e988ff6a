// src/app/ui/grid.rs
use eframe::egui as eg;

use crate::app::utils::{rating_line, star_rating};

pub const H_SPACING: f32 = 4.0;
pub const V_SPACING: f32 = 10.0;
const TEXT_H: f32 = 78.0;

enum CardAction {
    Select(usize),
    ToggleFavorite(usize),
    ToggleWatchlist(usize),
}

fn draw_corner_badge(p: &eg::Painter, rect: eg::Rect, label: &str) {
    if label.is_empty() {
        return;
    }
    let pad = 6.0;
    let r = eg::Rect::from_min_size(
        eg::pos2(rect.left() + pad, rect.top() + pad),
        eg::vec2(40.0, 20.0),
    );

    let visuals = p.ctx().style().visuals.clone();
    let bg = visuals.extreme_bg_color.gamma_multiply(0.92);
    let fg = visuals.strong_text_color();

    p.rect_filled(r, eg::Rounding::same(6.0), bg);
    p.rect_stroke(r, eg::Rounding::same(6.0), eg::Stroke::new(1.0, fg));
    p.text(
        r.center(),
        eg::Align2::CENTER_CENTER,
        label,
        eg::FontId::monospace(12.0),
        fg,
    );
}

/// Drawn when no artwork could be fetched: title on a flat panel.
pub(crate) fn draw_local_placeholder(p: &eg::Painter, rect: eg::Rect, title: &str) {
    p.rect_filled(rect, 6.0, eg::Color32::from_gray(40));
    let short: String = title.chars().take(20).collect();
    p.text(
        rect.center(),
        eg::Align2::CENTER_CENTER,
        short,
        eg::FontId::proportional(13.0),
        eg::Color32::from_gray(200),
    );
}

impl crate::app::CatalogApp {
    pub(crate) fn ui_render_grid(&mut self, ui: &mut eg::Ui, ctx: &eg::Context) {
        let entries = self.view.entries.clone();
        let show_ranks = self.view.show_ranks;

        let card_w: f32 = self.prefs.poster_w;
        let card_h: f32 = card_w * 1.5 + TEXT_H;

        let mut uploads_left = crate::app::MAX_UPLOADS_PER_FRAME;
        let mut action: Option<CardAction> = None;

        eg::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                let avail = ui.available_width();
                let cols = ((avail + H_SPACING) / (card_w + H_SPACING))
                    .floor()
                    .max(1.0) as usize;

                ui.horizontal_wrapped(|ui| {
                    ui.spacing_mut().item_spacing = eg::vec2(H_SPACING, V_SPACING);

                    for (col, entry) in entries.iter().enumerate() {
                        let idx = entry.index;
                        if col > 0 && col % cols == 0 {
                            ui.end_row();
                        }

                        ui.allocate_ui_with_layout(
                            eg::vec2(card_w, card_h),
                            eg::Layout::top_down(eg::Align::Min),
                            |ui| {
                                ui.set_min_size(eg::vec2(card_w, card_h));
                                let rect = ui.max_rect();

                                let id = eg::Id::new(("card_sel", idx));
                                if ui.interact(rect, id, eg::Sense::click()).clicked() {
                                    action = Some(CardAction::Select(idx));
                                }

                                if uploads_left > 0 && self.try_lazy_upload(ctx, idx) {
                                    uploads_left -= 1;
                                }

                                let poster_rect = eg::Rect::from_min_max(
                                    rect.min,
                                    eg::pos2(rect.min.x + card_w, rect.min.y + card_w * 1.5),
                                );
                                let text_rect = eg::Rect::from_min_max(
                                    eg::pos2(rect.min.x, poster_rect.max.y),
                                    rect.max,
                                );

                                let Some(movie) = self.catalog.get(idx) else {
                                    return;
                                };

                                // Poster
                                match self.posters.get(idx).and_then(|s| s.tex.as_ref()) {
                                    Some(tex) => {
                                        ui.painter().image(
                                            tex.id(),
                                            poster_rect,
                                            eg::Rect::from_min_max(
                                                eg::pos2(0.0, 0.0),
                                                eg::pos2(1.0, 1.0),
                                            ),
                                            eg::Color32::WHITE,
                                        );
                                    }
                                    None => draw_local_placeholder(
                                        ui.painter(),
                                        poster_rect,
                                        &movie.title,
                                    ),
                                }

                                if show_ranks {
                                    draw_corner_badge(
                                        ui.painter(),
                                        poster_rect,
                                        &format!("#{}", entry.rank),
                                    );
                                }

                                let marks = self.session.marks();
                                let is_fav = marks.is_favorite(&movie.id);
                                let is_watch = marks.is_watchlisted(&movie.id);

                                ui.allocate_ui_at_rect(text_rect, |ui| {
                                    ui.add(
                                        eg::Label::new(eg::RichText::new(&movie.title).strong())
                                            .truncate(),
                                    );
                                    ui.label(format!(
                                        "{}  {}",
                                        star_rating(movie.rating),
                                        rating_line(movie.rating, movie.votes)
                                    ));
                                    ui.horizontal(|ui| {
                                        ui.label(
                                            eg::RichText::new(movie.first_genre().unwrap_or("—"))
                                                .weak(),
                                        );
                                        ui.with_layout(
                                            eg::Layout::right_to_left(eg::Align::Center),
                                            |ui| {
                                                let watch = if is_watch { "✔" } else { "＋" };
                                                if ui
                                                    .small_button(watch)
                                                    .on_hover_text("Watchlist")
                                                    .clicked()
                                                {
                                                    action = Some(CardAction::ToggleWatchlist(idx));
                                                }
                                                let heart = if is_fav { "♥" } else { "♡" };
                                                if ui
                                                    .small_button(heart)
                                                    .on_hover_text("Favorite")
                                                    .clicked()
                                                {
                                                    action = Some(CardAction::ToggleFavorite(idx));
                                                }
                                            },
                                        );
                                    });
                                });

                                // Selection stroke
                                if self.selected_idx == Some(idx) {
                                    ui.painter().rect_stroke(
                                        rect.shrink(1.0),
                                        6.0,
                                        eg::Stroke::new(2.0, eg::Color32::YELLOW),
                                    );
                                }
                            },
                        );
                    }

                    ui.end_row();
                });
            });

        // Apply after the borrow on self.catalog ends
        match action {
            Some(CardAction::Select(idx)) => self.selected_idx = Some(idx),
            Some(CardAction::ToggleFavorite(idx)) => self.toggle_favorite(idx),
            Some(CardAction::ToggleWatchlist(idx)) => self.toggle_watchlist(idx),
            None => {}
        }
    }
}
