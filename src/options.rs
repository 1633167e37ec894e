//! Configuration options for the list engine.
//!
//! [`ChatListOptions`] is built with [`ChatListOptionsBuilder`] in library usage and parsed
//! from the command line by the demo binary.

use std::time::Duration;

use derive_builder::Builder;

use crate::dialog::FilterId;

/// Tunables of a [`crate::ChatList`]
///
/// The geometry fields are estimates used before any row is measured; page sizes and
/// eviction margins derive from them.
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(build_fn(name = "final_build"))]
#[builder(default)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct ChatListOptions {
    //  --- Geometry ---
    /// Estimated height of one row, in pixels
    #[cfg_attr(feature = "cli", arg(long, default_value_t = 72, help_heading = "Geometry"))]
    pub row_height: u32,

    /// Height of the scroll viewport, in pixels
    #[cfg_attr(feature = "cli", arg(long, default_value_t = 720, help_heading = "Geometry"))]
    pub viewport_height: u32,

    //  --- Paging ---
    /// Fraction of a screen fetched per page
    ///
    /// Pages hold `viewport-height / row-height * page-overscan` dialogs
    #[cfg_attr(feature = "cli", arg(long, default_value_t = 1.25, help_heading = "Paging"))]
    pub page_overscan: f32,

    /// Fixed page size, overrides the geometry estimate
    #[cfg_attr(feature = "cli", arg(long, help_heading = "Paging"))]
    pub page_size: Option<usize>,

    /// Rows kept on each side of the viewport when slicing
    #[cfg_attr(feature = "cli", arg(long, default_value_t = 10, help_heading = "Paging"))]
    pub retain_margin: usize,

    //  --- Timing ---
    /// Coalescing window of length change notifications, in milliseconds
    #[cfg_attr(feature = "cli", arg(long, default_value_t = 100, help_heading = "Timing"))]
    pub length_debounce_ms: u64,

    /// Scroll inactivity before slicing, in milliseconds
    #[cfg_attr(feature = "cli", arg(long, default_value_t = 200, help_heading = "Timing"))]
    pub slice_throttle_ms: u64,

    //  --- Display ---
    /// Below this many dialogs the All filter suggests contacts
    #[cfg_attr(feature = "cli", arg(long, default_value_t = 10, help_heading = "Display"))]
    pub contacts_threshold: usize,

    /// Filter shown on start, and fallback when the active filter is removed
    #[cfg_attr(feature = "cli", arg(long, default_value_t = FilterId::ALL, help_heading = "Display"))]
    pub default_filter: FilterId,
}

impl Default for ChatListOptions {
    fn default() -> Self {
        Self {
            row_height: 72,
            viewport_height: 720,
            page_overscan: 1.25,
            page_size: None,
            retain_margin: 10,
            length_debounce_ms: 100,
            slice_throttle_ms: 200,
            contacts_threshold: 10,
            default_filter: FilterId::ALL,
        }
    }
}

impl ChatListOptionsBuilder {
    /// Builds the options, normalizing out-of-range values
    pub fn build(&mut self) -> Result<ChatListOptions, ChatListOptionsBuilderError> {
        self.final_build().map(|opts| opts.build())
    }
}

impl ChatListOptions {
    /// Normalizes the options: zero heights become 1, non-finite overscans become 1.0
    pub fn build(mut self) -> Self {
        self.row_height = self.row_height.max(1);
        self.viewport_height = self.viewport_height.max(1);
        if !self.page_overscan.is_finite() || self.page_overscan <= 0.0 {
            self.page_overscan = 1.0;
        }
        self
    }

    /// Number of dialogs requested per page, never below 1
    pub fn page_size(&self) -> usize {
        if let Some(size) = self.page_size {
            return size.max(1);
        }
        let rows = self.viewport_height as f32 / self.row_height.max(1) as f32;
        ((rows * self.page_overscan).floor() as usize).max(1)
    }

    /// Coalescing window of length changes
    pub fn length_debounce(&self) -> Duration {
        Duration::from_millis(self.length_debounce_ms)
    }

    /// Scroll inactivity before slicing
    pub fn slice_throttle(&self) -> Duration {
        Duration::from_millis(self.slice_throttle_ms)
    }
}
