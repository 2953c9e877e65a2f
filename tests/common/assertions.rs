//! Custom test assertions for end-to-end tests

use std::path::Path;
use tokio::sync::broadcast;
use wallpaper_dl::Event;

/// Sorted names of the entries in `dir`
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Fail if any `.part` file was left in `dir`
pub fn assert_no_partial_files(dir: &Path) {
    let partial: Vec<String> = file_names(dir)
        .into_iter()
        .filter(|name| name.ends_with(".part"))
        .collect();
    assert!(partial.is_empty(), "partial files left behind: {partial:?}");
}

/// Drain every event already queued on `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
