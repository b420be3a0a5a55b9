//! View constants (layout/sizing).

pub(crate) const PAGE_PAD: f32 = 24.0;
pub(crate) const CONTENT_W: f32 = 520.0;

pub(crate) const LABEL_W: f32 = 110.0;

pub(crate) const TITLE_TEXT: f32 = 26.0;
pub(crate) const COUNTDOWN_TEXT: f32 = 56.0;
pub(crate) const ROW_TEXT: f32 = 16.0;
pub(crate) const SMALL_TEXT: f32 = 12.0;

pub(crate) const SESSION_ROW_H: f32 = 64.0;
pub(crate) const SESSION_LIST_SPACING: f32 = 8.0;

pub(crate) const COVER_SMALL: f32 = 72.0;
