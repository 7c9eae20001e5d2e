/// Rows of slack when deciding whether the viewport sits at the end of the
/// document; absorbs rounding from wrapped markdown lines.
const BOTTOM_SLACK: u16 = 12;

/// Tracks the vertical scroll offset over the rendered document and derives
/// the "user is at the bottom" flag that gates auto-scroll after commits.
///
/// Geometry (viewport height, rendered content height) is captured on every
/// draw, so key handlers can scroll against the most recent layout.
#[derive(Debug)]
pub struct FollowScroll {
    offset: u16,
    follow: bool,
    auto_follow: bool,
    viewport: u16,
    content: u16,
}

impl FollowScroll {
    /// `auto_follow` is the configurable policy: when false, commits never
    /// move the viewport even while the tracker reports "at bottom".
    pub fn new(auto_follow: bool) -> Self {
        Self {
            offset: 0,
            follow: true,
            auto_follow,
            viewport: 0,
            content: 0,
        }
    }

    pub fn offset(&self) -> u16 {
        self.offset
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    /// Whether a viewport at `offset` shows the end of `content` rows, within
    /// [`BOTTOM_SLACK`] tolerance.
    pub fn at_bottom(offset: u16, viewport: u16, content: u16) -> bool {
        offset.saturating_add(viewport) >= content.saturating_sub(BOTTOM_SLACK)
    }

    /// Record the layout of the current draw and apply the follow policy:
    /// jump to the end while following, otherwise keep the user's position
    /// (clamped in case the document shrank via clear).
    pub fn sync(&mut self, viewport: u16, content: u16) {
        self.viewport = viewport;
        self.content = content;
        if self.follow && self.auto_follow {
            self.offset = self.max_offset();
        } else {
            self.offset = self.offset.min(self.max_offset());
        }
    }

    /// Manual scroll by `delta` rows (negative is up). Re-derives the follow
    /// flag from where the user ends up.
    pub fn scroll_by(&mut self, delta: i32) {
        let next = (i32::from(self.offset) + delta).clamp(0, i32::from(self.max_offset()));
        self.offset = next as u16;
        self.follow = Self::at_bottom(self.offset, self.viewport, self.content);
    }

    pub fn page_up(&mut self) {
        self.scroll_by(-i32::from(self.viewport.max(1)));
    }

    pub fn page_down(&mut self) {
        self.scroll_by(i32::from(self.viewport.max(1)));
    }

    pub fn jump_to_top(&mut self) {
        self.offset = 0;
        self.follow = Self::at_bottom(0, self.viewport, self.content);
    }

    /// Jump to the end and resume following.
    pub fn jump_to_bottom(&mut self) {
        self.offset = self.max_offset();
        self.follow = true;
    }

    pub fn reset(&mut self) {
        self.offset = 0;
        self.follow = true;
    }

    fn max_offset(&self) -> u16 {
        self.content.saturating_sub(self.viewport)
    }
}
