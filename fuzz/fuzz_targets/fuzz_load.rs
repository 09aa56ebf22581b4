#![no_main]

use libfuzzer_sys::fuzz_target;

use folio::config::ReaderConfig;
use folio::engine::DisplayTarget;
use folio::engine::scripted::ScriptedEngine;
use folio::session::{Phase, ReadingSession};
use folio::theme;

fuzz_target!(|data: &[u8]| {
    let Some(theme) = theme::get(theme::DEFAULT_THEME) else {
        return;
    };
    let mut session = ReadingSession::new(
        ScriptedEngine::new(),
        DisplayTarget::new("fuzz"),
        ReaderConfig::default(),
        theme,
    );
    // Arbitrary bytes must either load or fail cleanly, never half-load.
    let _ = session.load_bytes(data.to_vec());
    session.pump();

    match session.phase() {
        Phase::Idle => {
            assert_eq!(session.engine().live_books(), 0);
            assert_eq!(session.engine().live_renditions(), 0);
            assert_eq!(session.engine().listener_count(), 0);
            assert!(!session.notices().is_empty());
        }
        Phase::Reading => {
            assert!(session.current_page() >= 1);
            assert!(session.current_page() <= session.total_pages());
        }
        Phase::Preparing => panic!("load did not settle after pump"),
    }
});
