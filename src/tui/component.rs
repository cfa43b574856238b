use ratatui::Frame;
use ratatui::layout::Rect;

use super::event::TuiEvent;

/// A piece of the screen that knows how to draw itself.
///
/// Props are struct fields; persistent state is borrowed through a
/// `&mut State` field so the component itself can be rebuilt every frame.
/// `render` takes `&mut self` so layout caches and scroll offsets can be
/// updated during the draw pass, the same way a `StatefulWidget` would.
pub trait Component {
    fn render(&mut self, frame: &mut Frame, area: Rect);
}

/// A component that consumes terminal events.
pub trait EventHandler {
    /// The higher-level event this component emits.
    type Event;

    /// Handle a `TuiEvent`, optionally returning a higher-level event.
    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event>;
}
