// src/app/filters.rs
//! Catalog + selections -> the list the grid actually draws.
//!
//! Everything here is pure: no I/O, no egui, no clocks. The app re-runs
//! [`derive_view`] whenever the catalog or any selection changes.

use std::collections::BTreeSet;

use itertools::Itertools;

use super::data::Movie;
use super::types::{FormatType, SortBy};

/// The four independent user selections. Any combination is legal, including
/// ones that match nothing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selections {
    search_query: String,
    selected_genres: BTreeSet<String>,
    format: FormatType,
    sort_by: SortBy,
}

impl Selections {
    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    /// Setters return whether anything changed so callers know to re-derive.
    pub fn set_search_query(&mut self, query: impl Into<String>) -> bool {
        let query = query.into();
        if self.search_query == query {
            return false;
        }
        self.search_query = query;
        true
    }

    pub fn selected_genres(&self) -> &BTreeSet<String> {
        &self.selected_genres
    }

    pub fn set_selected_genres<I, S>(&mut self, genres: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let next: BTreeSet<String> = genres.into_iter().map(Into::into).collect();
        if next == self.selected_genres {
            return false;
        }
        self.selected_genres = next;
        true
    }

    pub fn toggle_genre(&mut self, genre: &str) {
        if !self.selected_genres.remove(genre) {
            self.selected_genres.insert(genre.to_string());
        }
    }

    pub fn format(&self) -> FormatType {
        self.format
    }

    pub fn set_format(&mut self, format: FormatType) -> bool {
        let changed = self.format != format;
        self.format = format;
        changed
    }

    pub fn sort_by(&self) -> SortBy {
        self.sort_by
    }

    pub fn set_sort_by(&mut self, sort_by: SortBy) -> bool {
        let changed = self.sort_by != sort_by;
        self.sort_by = sort_by;
        changed
    }
}

/// Id sets the Favorited / Watchlist modes intersect against.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Marks {
    pub favorites: BTreeSet<String>,
    pub watchlist: BTreeSet<String>,
}

impl Marks {
    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.contains(id)
    }

    pub fn is_watchlisted(&self, id: &str) -> bool {
        self.watchlist.contains(id)
    }
}

/// A catalog index plus its 1-based position in the derived list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayEntry {
    pub index: usize,
    pub rank: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayList {
    pub entries: Vec<DisplayEntry>,
    /// False for Favorited / Watchlist, which are unranked collections.
    pub show_ranks: bool,
    pub catalog_len: usize,
}

impl Default for DisplayList {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            show_ranks: true,
            catalog_len: 0,
        }
    }
}

impl DisplayList {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(rank, movie)` pairs in display order.
    pub fn iter<'a>(&'a self, catalog: &'a [Movie]) -> impl Iterator<Item = (usize, &'a Movie)> + 'a {
        self.entries
            .iter()
            .filter_map(move |e| catalog.get(e.index).map(|m| (e.rank, m)))
    }

    pub fn summary(&self) -> String {
        match (self.entries.len(), self.catalog_len) {
            (_, 0) => "No titles loaded".to_string(),
            (n, total) if n == total => format!("{total} titles"),
            (n, total) => format!("{n} of {total} titles"),
        }
    }
}

fn matches_format(movie: &Movie, format_value: Option<&str>) -> bool {
    format_value.map_or(true, |want| movie.kind.to_lowercase() == want.to_lowercase())
}

fn matches_genres(movie: &Movie, selected: &BTreeSet<String>) -> bool {
    selected.is_empty() || movie.genres.iter().any(|g| selected.contains(g))
}

fn matches_search(movie: &Movie, query_lower: &str) -> bool {
    query_lower.is_empty() || movie.title.to_lowercase().contains(query_lower)
}

/// Filter (format, genre, search) then sort/select by mode, then rank.
pub fn derive_view(catalog: &[Movie], selections: &Selections, marks: &Marks) -> DisplayList {
    let format_value = selections.format.kind_value();
    let query = selections.search_query.to_lowercase();

    let mut picked: Vec<usize> = catalog
        .iter()
        .enumerate()
        .filter(|(_, m)| matches_format(m, format_value))
        .filter(|(_, m)| matches_genres(m, &selections.selected_genres))
        .filter(|(_, m)| matches_search(m, &query))
        .map(|(i, _)| i)
        .collect();

    match selections.sort_by {
        SortBy::MostPopular => {}
        // slice::sort_by is stable; ties keep fetch order
        SortBy::TopRated => {
            picked.sort_by(|&a, &b| catalog[b].rating.total_cmp(&catalog[a].rating));
        }
        SortBy::Favorited => picked.retain(|&i| marks.is_favorite(&catalog[i].id)),
        SortBy::Watchlist => picked.retain(|&i| marks.is_watchlisted(&catalog[i].id)),
    }

    DisplayList {
        entries: picked
            .into_iter()
            .enumerate()
            .map(|(pos, index)| DisplayEntry {
                index,
                rank: pos + 1,
            })
            .collect(),
        show_ranks: selections.sort_by.is_ranked(),
        catalog_len: catalog.len(),
    }
}

/// Sorted, de-duplicated genre labels present in the catalog.
pub fn collect_genres(catalog: &[Movie]) -> Vec<String> {
    catalog
        .iter()
        .flat_map(|m| m.genres.iter().cloned())
        .sorted()
        .dedup()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: &str, title: &str, rating: f64, kind: &str, genres: &[&str]) -> Movie {
        Movie {
            id: id.to_string(),
            title: title.to_string(),
            rating,
            kind: kind.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            ..Movie::default()
        }
    }

    fn sample() -> Vec<Movie> {
        vec![
            movie("a", "Alpha", 8.0, "movie", &["Drama"]),
            movie("b", "Beta", 6.0, "short", &["Comedy"]),
            movie("c", "Gamma Ray", 9.0, "movie", &["Sci-Fi", "Action"]),
            movie("d", "Delta Force", 7.5, "Movie", &["Action"]),
            movie("e", "Alpha Returns", 9.0, "movie", &["Drama", "Comedy"]),
        ]
    }

    fn ids(list: &DisplayList, catalog: &[Movie]) -> Vec<String> {
        list.iter(catalog).map(|(_, m)| m.id.clone()).collect()
    }

    fn any_format() -> Selections {
        let mut s = Selections::default();
        s.set_format(FormatType::Any);
        s
    }

    #[test]
    fn movie_format_excludes_shorts() {
        let catalog = vec![
            movie("a", "Alpha", 8.0, "movie", &["Drama"]),
            movie("b", "Beta", 6.0, "short", &["Comedy"]),
        ];
        let mut sel = Selections::default();
        sel.set_format(FormatType::Movie);
        sel.set_sort_by(SortBy::TopRated);

        let view = derive_view(&catalog, &sel, &Marks::default());
        assert_eq!(view.entries, vec![DisplayEntry { index: 0, rank: 1 }]);
        assert!(view.show_ranks);
    }

    #[test]
    fn format_match_is_case_insensitive() {
        let catalog = sample();
        let view = derive_view(&catalog, &Selections::default(), &Marks::default());
        assert_eq!(ids(&view, &catalog), vec!["a", "c", "d", "e"]);
    }

    #[test]
    fn genre_filter_is_or() {
        let catalog = sample();
        let mut sel = any_format();
        sel.set_selected_genres(["Comedy", "Action"]);

        let view = derive_view(&catalog, &sel, &Marks::default());
        assert_eq!(ids(&view, &catalog), vec!["b", "c", "d", "e"]);
    }

    #[test]
    fn unknown_genre_yields_empty_not_error() {
        let catalog = sample();
        let mut sel = any_format();
        sel.set_selected_genres(["Western"]);
        assert!(derive_view(&catalog, &sel, &Marks::default()).is_empty());
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let catalog = sample();
        let mut sel = any_format();
        sel.set_search_query("ALPHA");
        let view = derive_view(&catalog, &sel, &Marks::default());
        assert_eq!(ids(&view, &catalog), vec!["a", "e"]);
    }

    #[test]
    fn empty_search_leaves_other_filters_alone() {
        let catalog = sample();
        let mut with_empty = any_format();
        with_empty.set_selected_genres(["Drama"]);
        with_empty.set_search_query("");

        let mut without = any_format();
        without.set_selected_genres(["Drama"]);

        assert_eq!(
            derive_view(&catalog, &with_empty, &Marks::default()),
            derive_view(&catalog, &without, &Marks::default())
        );
    }

    #[test]
    fn top_rated_is_stable_and_descending() {
        let catalog = vec![
            movie("w", "W", 7.0, "movie", &[]),
            movie("x", "X", 9.0, "movie", &[]),
            movie("y", "Y", 9.0, "movie", &[]),
            movie("z", "Z", 3.0, "movie", &[]),
        ];
        let mut sel = Selections::default();
        sel.set_sort_by(SortBy::TopRated);
        let view = derive_view(&catalog, &sel, &Marks::default());
        assert_eq!(ids(&view, &catalog), vec!["x", "y", "w", "z"]);
    }

    #[test]
    fn most_popular_keeps_fetch_order() {
        let catalog = sample();
        let view = derive_view(&catalog, &any_format(), &Marks::default());
        assert_eq!(ids(&view, &catalog), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn favorited_is_intersection_after_filters_in_prior_order() {
        let catalog = sample();
        let marks = Marks {
            favorites: ["e", "b", "a", "zz-not-in-catalog"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..Marks::default()
        };
        let mut sel = any_format();
        sel.set_sort_by(SortBy::Favorited);
        let view = derive_view(&catalog, &sel, &marks);
        assert_eq!(ids(&view, &catalog), vec!["a", "b", "e"]);
        assert!(!view.show_ranks);

        sel.set_selected_genres(["Comedy"]);
        let view = derive_view(&catalog, &sel, &marks);
        assert_eq!(ids(&view, &catalog), vec!["b", "e"]);
    }

    #[test]
    fn watchlist_mode_intersects_watchlist() {
        let catalog = sample();
        let marks = Marks {
            watchlist: ["d", "c"].iter().map(|s| s.to_string()).collect(),
            favorites: ["a"].iter().map(|s| s.to_string()).collect(),
        };
        let mut sel = Selections::default();
        sel.set_sort_by(SortBy::Watchlist);
        let view = derive_view(&catalog, &sel, &marks);
        assert_eq!(ids(&view, &catalog), vec!["c", "d"]);
        assert!(!view.show_ranks);
    }

    #[test]
    fn ranks_are_dense_and_result_is_subset() {
        let catalog = sample();
        let marks = Marks {
            favorites: ["a", "c"].iter().map(|s| s.to_string()).collect(),
            watchlist: ["e"].iter().map(|s| s.to_string()).collect(),
        };
        for sort in SortBy::ALL {
            for format in [FormatType::Movie, FormatType::Any] {
                for query in ["", "a", "delta", "nothing"] {
                    let mut sel = Selections::default();
                    sel.set_sort_by(sort);
                    sel.set_format(format);
                    sel.set_search_query(query);
                    let view = derive_view(&catalog, &sel, &marks);

                    let ranks: Vec<usize> = view.entries.iter().map(|e| e.rank).collect();
                    assert_eq!(ranks, (1..=view.len()).collect::<Vec<_>>());
                    for (_, m) in view.iter(&catalog) {
                        assert!(catalog.iter().any(|c| c.id == m.id));
                    }
                }
            }
        }
    }

    #[test]
    fn deriving_twice_is_idempotent() {
        let catalog = sample();
        let mut sel = any_format();
        sel.set_selected_genres(["Drama", "Action"]);
        sel.set_sort_by(SortBy::TopRated);

        let once = derive_view(&catalog, &sel, &Marks::default());
        let narrowed: Vec<Movie> = once.iter(&catalog).map(|(_, m)| m.clone()).collect();
        let twice = derive_view(&narrowed, &sel, &Marks::default());
        assert_eq!(ids(&once, &catalog), ids(&twice, &narrowed));
    }

    #[test]
    fn empty_catalog_is_fine() {
        let view = derive_view(&[], &Selections::default(), &Marks::default());
        assert!(view.is_empty());
        assert_eq!(view.summary(), "No titles loaded");
    }

    #[test]
    fn setters_report_changes() {
        let mut sel = Selections::default();
        assert!(!sel.set_sort_by(SortBy::MostPopular));
        assert!(sel.set_sort_by(SortBy::TopRated));
        assert!(sel.set_search_query("x"));
        assert!(!sel.set_search_query("x"));
        sel.toggle_genre("Drama");
        assert!(sel.selected_genres().contains("Drama"));
        sel.toggle_genre("Drama");
        assert!(sel.selected_genres().is_empty());
    }

    #[test]
    fn collect_genres_sorted_unique() {
        assert_eq!(
            collect_genres(&sample()),
            vec!["Action", "Comedy", "Drama", "Sci-Fi"]
        );
    }

    #[test]
    fn summary_reports_counts() {
        let catalog = sample();
        let mut sel = any_format();
        assert_eq!(derive_view(&catalog, &sel, &Marks::default()).summary(), "5 titles");
        sel.set_search_query("alpha");
        assert_eq!(
            derive_view(&catalog, &sel, &Marks::default()).summary(),
            "2 of 5 titles"
        );
    }
}
