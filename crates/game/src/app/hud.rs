use std::fmt::Write as _;

use escape_engine::GameSnapshot;

pub(crate) const WINDOW_TITLE: &str = "UniversityEscape";
const MAX_LISTED_OPTIONS: usize = 4;

/// Text shown in the window title bar. The renderer only draws shapes, so
/// room names, dialogue and minigame prompts surface here.
pub(crate) fn window_title(snapshot: &GameSnapshot) -> String {
    let mut title = String::from(WINDOW_TITLE);

    if let Some(minigame) = &snapshot.minigame {
        let _ = write!(
            title,
            " | {} ({}s) | {}",
            minigame.name, minigame.elapsed_seconds, minigame.view.prompt
        );
        let view = &minigame.view;
        if view.options.len() <= MAX_LISTED_OPTIONS {
            if let Some(label) = view.selected.and_then(|index| view.options.get(index)) {
                let _ = write!(title, " > {label}");
            }
        }
        return title;
    }

    let _ = write!(
        title,
        " | {} | Score {}",
        snapshot.room_name, snapshot.total_score
    );
    if snapshot.all_rooms_completed {
        title.push_str(" | All rooms completed!");
    } else if let Some(dialogue) = &snapshot.last_dialogue {
        let _ = write!(title, " | {dialogue}");
    }
    title
}
