//! # MessageList Component
//!
//! Scrollable view of the [`RenderTree`].
//!
//! `MessageList` is a transient component (created each frame) that wraps
//! `&'a mut MessageListState` (persistent state) and the tree (props).
//! Since `Component::render` takes `&mut self`, the layout cache and scroll
//! state are updated during the render pass.
//!
//! ## Layout cache
//!
//! Heights are cached per node. The renderer hands back the same
//! `Arc<MessageNode>` for a message whose content has not changed, so a
//! cached height stays valid exactly as long as the node pointer does. While
//! a response streams only the growing tail is re-measured.

use std::ops::Range;
use std::sync::Arc;

use ratatui::Frame;
use ratatui::layout::{Position, Rect, Size};
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::inference::Role;
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::message::MessageView;
use crate::tui::components::typing::{TYPING_HEIGHT, TypingIndicator};
use crate::tui::conversation::{RenderNode, RenderTree};
use crate::tui::event::TuiEvent;

/// Layout and scroll state for the message list.
/// Must be persisted in the parent TuiState.
pub struct MessageListState {
    pub scroll_state: ScrollViewState,
    pub layout: LayoutCache,
    /// When true, auto-scroll to bottom on new content
    pub stick_to_bottom: bool,
    /// Last known viewport height (for scroll clamping between frames)
    pub viewport_height: u16,
}

impl Default for MessageListState {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageListState {
    pub fn new() -> Self {
        Self {
            scroll_state: ScrollViewState::default(),
            layout: LayoutCache::new(),
            stick_to_bottom: true,
            viewport_height: 0,
        }
    }

    fn max_scroll(&self) -> u16 {
        self.layout.total_height().saturating_sub(self.viewport_height)
    }

    /// Clamp scroll offset so it never exceeds the content bounds.
    pub fn clamp_scroll(&mut self) {
        let max_y = self.max_scroll();
        let current = self.scroll_state.offset();
        if current.y > max_y {
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }

    /// Clamp scroll and re-engage auto-scroll if the user has reached the bottom.
    pub fn repin_if_at_bottom(&mut self) {
        let max_y = self.max_scroll();
        let current = self.scroll_state.offset();
        if current.y >= max_y {
            self.stick_to_bottom = true;
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }

    /// Content exists below the viewport (drives the "↓ New" marker).
    pub fn has_unseen_content(&self) -> bool {
        !self.stick_to_bottom && self.scroll_state.offset().y < self.max_scroll()
    }
}

/// Scrollable conversation view component.
/// Created fresh each frame with references to state and data.
pub struct MessageList<'a> {
    pub state: &'a mut MessageListState,
    pub tree: &'a RenderTree,
    pub is_loading: bool,
    pub pulse_value: f32,
    pub spinner_frame: usize,
}

impl<'a> MessageList<'a> {
    pub fn new(
        state: &'a mut MessageListState,
        tree: &'a RenderTree,
        is_loading: bool,
        pulse_value: f32,
        spinner_frame: usize,
    ) -> Self {
        Self {
            state,
            tree,
            is_loading,
            pulse_value,
            spinner_frame,
        }
    }
}

impl Component for MessageList<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let content_width = area.width.saturating_sub(1); // -1 for scrollbar safe area
        let nodes = &self.tree.nodes;

        // 1. Update layout cache
        self.state.layout.refresh(nodes, content_width);
        let total_height = self.state.layout.total_height();

        // 2. Clamp scroll offset to prevent overscrolling past content
        self.state.viewport_height = area.height;
        if !self.state.stick_to_bottom {
            self.state.clamp_scroll();
        }

        let scroll_offset = self.state.scroll_state.offset().y;
        let visible_range = self.state.layout.visible_range(scroll_offset, area.height);

        // 3. Render visible nodes into a ScrollView
        let mut scroll_view = ScrollView::new(Size::new(content_width, total_height))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Always)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);

        let mut y_offset = self.state.layout.top_of(visible_range.start);
        let last = nodes.len().saturating_sub(1);

        for i in visible_range {
            let height = self.state.layout.heights[i];
            let rect = Rect::new(0, y_offset, content_width, height);

            match &nodes[i] {
                RenderNode::Message(node) => {
                    // The assistant message being streamed sits right above the indicator
                    let streaming = self.is_loading
                        && node.role == Role::Assistant
                        && i + 1 >= last;
                    let pulse = if streaming { self.pulse_value } else { 0.0 };
                    scroll_view.render_widget(MessageView::new(node, pulse), rect);
                }
                RenderNode::TypingIndicator => {
                    scroll_view.render_widget(TypingIndicator::new(self.spinner_frame), rect);
                }
            }
            y_offset += height;
        }

        if self.state.stick_to_bottom {
            self.state.scroll_state.scroll_to_bottom();
        }

        frame.render_stateful_widget(scroll_view, area, &mut self.state.scroll_state);
    }
}

/// EventHandler lives on `MessageListState` because `MessageList` is rebuilt
/// every frame and cannot hold the scroll position.
impl EventHandler for MessageListState {
    type Event = ();

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::ScrollUp => {
                self.scroll_state.scroll_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollDown => {
                self.scroll_state.scroll_down();
                self.repin_if_at_bottom();
            }
            TuiEvent::ScrollPageUp => {
                self.scroll_state.scroll_page_up();
                self.stick_to_bottom = false;
            }
            TuiEvent::ScrollPageDown => {
                self.scroll_state.scroll_page_down();
                self.repin_if_at_bottom();
            }
            _ => {}
        }
        None
    }
}

/// Cached layout measurements
pub struct LayoutCache {
    pub heights: Vec<u16>,
    pub prefix_heights: Vec<u16>,
    /// The nodes `heights` were measured for.
    keys: Vec<RenderNode>,
    content_width: u16,
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}

fn same_node(a: &RenderNode, b: &RenderNode) -> bool {
    match (a, b) {
        (RenderNode::Message(a), RenderNode::Message(b)) => Arc::ptr_eq(a, b),
        (RenderNode::TypingIndicator, RenderNode::TypingIndicator) => true,
        _ => false,
    }
}

fn measure(node: &RenderNode, content_width: u16) -> u16 {
    match node {
        RenderNode::Message(node) => MessageView::calculate_height(node, content_width),
        RenderNode::TypingIndicator => TYPING_HEIGHT,
    }
}

impl LayoutCache {
    pub fn new() -> Self {
        Self {
            heights: Vec::new(),
            prefix_heights: Vec::new(),
            keys: Vec::new(),
            content_width: 0,
        }
    }

    /// Number of leading cached heights still valid for `nodes` at `content_width`.
    pub fn reusable_count(&self, nodes: &[RenderNode], content_width: u16) -> usize {
        if self.content_width != content_width {
            return 0;
        }
        self.keys
            .iter()
            .zip(nodes)
            .take_while(|(cached, node)| same_node(cached, node))
            .count()
    }

    /// Re-measure whatever changed since the last frame.
    pub fn refresh(&mut self, nodes: &[RenderNode], content_width: u16) {
        let reusable = self.reusable_count(nodes, content_width);
        self.heights.truncate(reusable);
        self.keys.truncate(reusable);

        for node in &nodes[reusable..] {
            self.heights.push(measure(node, content_width));
            self.keys.push(node.clone());
        }
        self.content_width = content_width;
        self.rebuild_prefix_heights();
    }

    pub fn rebuild_prefix_heights(&mut self) {
        self.prefix_heights = self
            .heights
            .iter()
            .scan(0u16, |acc, &h| {
                *acc = acc.saturating_add(h);
                Some(*acc)
            })
            .collect();
    }

    pub fn total_height(&self) -> u16 {
        self.prefix_heights.last().copied().unwrap_or(0)
    }

    /// Y coordinate where node `index` starts.
    pub fn top_of(&self, index: usize) -> u16 {
        match index {
            0 => 0,
            i => self.prefix_heights.get(i - 1).copied().unwrap_or(0),
        }
    }

    /// Node indices intersecting the viewport plus half a screen either side.
    pub fn visible_range(&self, scroll_offset: u16, viewport_height: u16) -> Range<usize> {
        let buffer = viewport_height / 2;
        let buffered_start = scroll_offset.saturating_sub(buffer);
        let buffered_end = scroll_offset
            .saturating_add(viewport_height)
            .saturating_add(buffer);

        let start = self
            .prefix_heights
            .partition_point(|&end| end <= buffered_start);
        let end = self
            .prefix_heights
            .partition_point(|&end| end < buffered_end)
            .saturating_add(1)
            .min(self.prefix_heights.len());

        start..end
    }
}
