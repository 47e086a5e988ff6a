// src/app/session.rs
//! Client-local persisted state: favorites, watchlist, signed-in identity and
//! color scheme. Loaded once at startup, written through on every mutation.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use super::api::AuthUser;
use super::filters::Marks;
use super::types::ColorScheme;

pub mod keys {
    pub const FAVORITES: &str = "movieFavorites";
    pub const WATCHLIST: &str = "movieWatchlist";
    pub const USER_ID: &str = "user_id";
    pub const USERNAME: &str = "username";
    pub const EMAIL: &str = "email";
    pub const PROFILE_IMAGE: &str = "profile_image";
    pub const COLOR_SCHEME: &str = "color-scheme";

    pub const ALL: [&str; 7] = [
        FAVORITES,
        WATCHLIST,
        USER_ID,
        USERNAME,
        EMAIL,
        PROFILE_IMAGE,
        COLOR_SCHEME,
    ];
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o: {0}")]
    Io(#[from] io::Error),

    #[error("store encode: {0}")]
    Json(#[from] serde_json::Error),
}

/// String key/value storage, the desktop stand-in for browser local storage.
pub trait KvStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// One file per key under a directory.
pub struct FileStore {
    dir: PathBuf,
}

const STORE_EXT: &str = "val";

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.{STORE_EXT}"))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let dest = self.path_for(key);
        let tmp = dest.with_extension(format!("{STORE_EXT}.part"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &dest)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(STORE_EXT) {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    map: HashMap<String, String>,
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.map.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.map.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.map.clear();
        Ok(())
    }
}

pub struct Session {
    store: Box<dyn KvStore>,
    marks: Marks,
    user: Option<AuthUser>,
    color_scheme: ColorScheme,
    watchlist_rev: u64,
}

impl Session {
    /// Read everything once. Unreadable entries fall back to empty with a warning.
    pub fn load(store: Box<dyn KvStore>) -> Self {
        let favorites = read_id_list(store.as_ref(), keys::FAVORITES);
        let watchlist = read_id_list(store.as_ref(), keys::WATCHLIST);

        let read = |key: &str| -> Option<String> {
            match store.get(key) {
                Ok(v) => v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
                Err(e) => {
                    warn!("session: failed to read `{key}`: {e}");
                    None
                }
            }
        };

        let user = read(keys::USER_ID).map(|user_id| AuthUser {
            user_id,
            username: read(keys::USERNAME).unwrap_or_default(),
            email: read(keys::EMAIL).unwrap_or_default(),
            profile_image: read(keys::PROFILE_IMAGE).filter(|p| p != "null"),
        });
        let color_scheme = read(keys::COLOR_SCHEME)
            .and_then(|s| ColorScheme::from_str(&s))
            .unwrap_or_default();

        debug!(
            favorites = favorites.len(),
            watchlist = watchlist.len(),
            signed_in = user.is_some(),
            "session loaded"
        );

        Self {
            store,
            marks: Marks {
                favorites,
                watchlist,
            },
            user,
            color_scheme,
            watchlist_rev: 0,
        }
    }

    pub fn marks(&self) -> &Marks {
        &self.marks
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    pub fn color_scheme(&self) -> ColorScheme {
        self.color_scheme
    }

    /// Flip membership and persist. Returns the new membership.
    pub fn toggle_favorite(&mut self, id: &str) -> Result<bool, StoreError> {
        let now = flip(&mut self.marks.favorites, id);
        write_id_list(self.store.as_mut(), keys::FAVORITES, &self.marks.favorites)?;
        Ok(now)
    }

    pub fn toggle_watchlist(&mut self, id: &str) -> Result<bool, StoreError> {
        let now = flip(&mut self.marks.watchlist, id);
        self.watchlist_rev += 1;
        write_id_list(self.store.as_mut(), keys::WATCHLIST, &self.marks.watchlist)?;
        Ok(now)
    }

    /// Bumped on every local watchlist edit.
    pub fn watchlist_revision(&self) -> u64 {
        self.watchlist_rev
    }

    /// Server copy wins after a successful watchlist sync.
    pub fn replace_watchlist<I>(&mut self, ids: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = String>,
    {
        self.marks.watchlist = ids.into_iter().collect();
        self.watchlist_rev += 1;
        write_id_list(self.store.as_mut(), keys::WATCHLIST, &self.marks.watchlist)
    }

    /// Apply a sync result fetched when the watchlist was at `since`. Local
    /// edits made after that win: returns `Ok(false)` and leaves the set alone.
    pub fn apply_synced_watchlist<I>(&mut self, ids: I, since: u64) -> Result<bool, StoreError>
    where
        I: IntoIterator<Item = String>,
    {
        if self.watchlist_rev != since {
            return Ok(false);
        }
        self.replace_watchlist(ids)?;
        Ok(true)
    }

    /// Takes effect in memory even when persisting fails; every key is
    /// attempted and the first error is returned.
    pub fn set_identity(&mut self, user: AuthUser) -> Result<(), StoreError> {
        let entries = [
            (keys::USER_ID, user.user_id.clone()),
            (keys::USERNAME, user.username.clone()),
            (keys::EMAIL, user.email.clone()),
            (keys::PROFILE_IMAGE, user.profile_image.clone().unwrap_or_default()),
        ];
        self.user = Some(user);

        let mut first_err = None;
        for (key, value) in entries {
            if let Err(e) = self.store.set(key, &value) {
                warn!("session: failed to write `{key}`: {e}");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// No-op when signed out.
    pub fn set_profile_image(&mut self, path: &str) -> Result<(), StoreError> {
        let Some(user) = self.user.as_mut() else {
            debug!("session: dropping profile image update while signed out");
            return Ok(());
        };
        user.profile_image = Some(path.to_string()).filter(|p| !p.is_empty());
        self.store.set(keys::PROFILE_IMAGE, path)
    }

    pub fn set_color_scheme(&mut self, scheme: ColorScheme) -> Result<(), StoreError> {
        self.color_scheme = scheme;
        self.store.set(keys::COLOR_SCHEME, scheme.as_str())
    }

    /// Wipes every persisted key, favorites included.
    pub fn sign_out(&mut self) -> Result<(), StoreError> {
        self.marks = Marks::default();
        self.user = None;
        self.color_scheme = ColorScheme::default();
        self.watchlist_rev += 1;
        self.store.clear()
    }
}

fn flip(set: &mut BTreeSet<String>, id: &str) -> bool {
    if set.remove(id) {
        false
    } else {
        set.insert(id.to_string());
        true
    }
}

fn read_id_list(store: &dyn KvStore, key: &str) -> BTreeSet<String> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return BTreeSet::new(),
        Err(e) => {
            warn!("session: failed to read `{key}`: {e}");
            return BTreeSet::new();
        }
    };
    match serde_json::from_str::<Vec<String>>(&raw) {
        Ok(ids) => ids.into_iter().collect(),
        Err(e) => {
            warn!("session: `{key}` is not a JSON id list ({e}); starting empty");
            BTreeSet::new()
        }
    }
}

fn write_id_list(
    store: &mut dyn KvStore,
    key: &str,
    ids: &BTreeSet<String>,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(&ids.iter().collect::<Vec<_>>())?;
    store.set(key, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn user() -> AuthUser {
        AuthUser {
            user_id: "7".into(),
            username: "ripley".into(),
            email: "ripley@nostromo.space".into(),
            profile_image: Some("uploads/7.png".into()),
        }
    }

    #[test]
    fn toggling_twice_restores_original_set() {
        let mut s = Session::load(Box::<MemoryStore>::default());
        s.toggle_favorite("a").unwrap();
        let before = s.marks().favorites.clone();

        assert!(s.toggle_favorite("b").unwrap());
        assert!(!s.toggle_favorite("b").unwrap());
        assert_eq!(s.marks().favorites, before);
    }

    #[test]
    fn writes_through_to_disk() {
        let dir = tempdir().unwrap();
        {
            let mut s = Session::load(Box::new(FileStore::open(dir.path()).unwrap()));
            s.toggle_favorite("tt1").unwrap();
            s.toggle_watchlist("tt2").unwrap();
            s.set_identity(user()).unwrap();
            s.set_color_scheme(ColorScheme::Dark).unwrap();
        }

        let reloaded = Session::load(Box::new(FileStore::open(dir.path()).unwrap()));
        assert!(reloaded.marks().is_favorite("tt1"));
        assert!(reloaded.marks().is_watchlisted("tt2"));
        assert_eq!(reloaded.user(), Some(&user()));
        assert_eq!(reloaded.color_scheme(), ColorScheme::Dark);

        let raw = fs::read_to_string(dir.path().join("movieFavorites.val")).unwrap();
        assert_eq!(raw, r#"["tt1"]"#);
    }

    #[test]
    fn malformed_list_loads_empty() {
        let mut store = MemoryStore::default();
        store.set(keys::FAVORITES, "not json").unwrap();
        store.set(keys::WATCHLIST, r#"["x","y"]"#).unwrap();
        let s = Session::load(Box::new(store));
        assert!(s.marks().favorites.is_empty());
        assert_eq!(s.marks().watchlist.len(), 2);
    }

    #[test]
    fn null_profile_image_is_treated_as_absent() {
        let mut store = MemoryStore::default();
        store.set(keys::USER_ID, "3").unwrap();
        store.set(keys::PROFILE_IMAGE, "null").unwrap();
        let s = Session::load(Box::new(store));
        assert_eq!(s.user().unwrap().profile_image, None);
    }

    #[test]
    fn replace_watchlist_overwrites() {
        let mut s = Session::load(Box::<MemoryStore>::default());
        s.toggle_watchlist("old").unwrap();
        s.replace_watchlist(vec!["n1".to_string(), "n2".to_string()])
            .unwrap();
        assert!(!s.marks().is_watchlisted("old"));
        assert!(s.marks().is_watchlisted("n2"));
    }

    #[test]
    fn sign_out_clears_everything() {
        let dir = tempdir().unwrap();
        let mut s = Session::load(Box::new(FileStore::open(dir.path()).unwrap()));
        s.set_identity(user()).unwrap();
        s.toggle_favorite("a").unwrap();
        s.sign_out().unwrap();
        assert!(s.user().is_none());
        assert!(s.marks().favorites.is_empty());

        let reloaded = Session::load(Box::new(FileStore::open(dir.path()).unwrap()));
        assert!(reloaded.user().is_none());
        assert!(reloaded.marks().favorites.is_empty());
        for key in keys::ALL {
            assert!(!dir.path().join(format!("{key}.val")).exists());
        }
    }

    /// Accepts reads, refuses every write.
    #[derive(Default)]
    struct ReadOnlyStore {
        inner: MemoryStore,
    }

    impl KvStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only").into())
        }

        fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only").into())
        }

        fn clear(&mut self) -> Result<(), StoreError> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    #[test]
    fn failed_writes_still_update_memory() {
        let mut s = Session::load(Box::<ReadOnlyStore>::default());

        assert!(s.toggle_favorite("a").is_err());
        assert!(s.marks().is_favorite("a"));

        assert!(s.set_identity(user()).is_err());
        assert_eq!(s.user(), Some(&user()));

        assert!(s.set_color_scheme(ColorScheme::Dark).is_err());
        assert_eq!(s.color_scheme(), ColorScheme::Dark);
    }

    #[test]
    fn profile_image_after_sign_out_is_not_stored() {
        let dir = tempdir().unwrap();
        let mut s = Session::load(Box::new(FileStore::open(dir.path()).unwrap()));
        s.set_identity(user()).unwrap();
        s.sign_out().unwrap();

        s.set_profile_image("uploads/7.png").unwrap();
        assert!(s.user().is_none());
        assert!(!dir.path().join("profile_image.val").exists());
    }

    #[test]
    fn sync_result_yields_to_local_edits() {
        let mut s = Session::load(Box::<MemoryStore>::default());
        let since = s.watchlist_revision();
        s.toggle_watchlist("picked-during-sync").unwrap();

        let applied = s
            .apply_synced_watchlist(vec!["server".to_string()], since)
            .unwrap();
        assert!(!applied);
        assert!(s.marks().is_watchlisted("picked-during-sync"));
        assert!(!s.marks().is_watchlisted("server"));

        let since = s.watchlist_revision();
        assert!(s
            .apply_synced_watchlist(vec!["server".to_string()], since)
            .unwrap());
        assert!(s.marks().is_watchlisted("server"));
        assert!(!s.marks().is_watchlisted("picked-during-sync"));
    }

    #[test]
    fn profile_image_update_persists() {
        let mut s = Session::load(Box::<MemoryStore>::default());
        s.set_identity(AuthUser {
            profile_image: None,
            ..user()
        })
        .unwrap();
        s.set_profile_image("uploads/new.png").unwrap();
        assert_eq!(
            s.user().and_then(|u| u.profile_image.as_deref()),
            Some("uploads/new.png")
        );
    }
}
